pub mod preview;
pub mod reader;
pub mod searcher;
pub mod watcher;
