//! Background recursive searcher.
//!
//! A `Searcher` is bound to one `(root, hide_hidden)` pair. Its index is
//! built lazily by a walker thread on first use and kept for the lifetime of
//! the searcher, so repeated queries reuse it. Searches run on their own
//! threads and stream `SearchUpdate`s to a sink; starting a new search or
//! calling `cancel` supersedes whatever is still running.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::fuzzy::{prepare_tokens, Matcher};

/// Entries pushed to the shared index per flush.
const INDEX_FLUSH_EVERY: usize = 512;
/// Entries scored per merge step once the index is complete.
const MERGE_CHUNK: usize = 20_000;
/// Completed queries kept per searcher.
const CACHED_QUERIES: usize = 16;

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub path: PathBuf,
    /// Path relative to the search root, used for matching and display.
    pub relative: String,
    pub is_dir: bool,
    pub score: f64,
}

/// One progressive delivery of results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBatch {
    pub results: Vec<SearchHit>,
    /// The index walk has finished.
    pub is_done: bool,
    /// More batches will follow for this search.
    pub in_progress: bool,
}

/// Indexing telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexProgress {
    pub indexed: usize,
    pub done: bool,
}

/// Messages streamed by an asynchronous search.
#[derive(Debug, Clone)]
pub enum SearchUpdate {
    Batch(SearchBatch),
    Progress(IndexProgress),
}

/// Tunables for a searcher.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    pub batch_interval: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: crate::config::DEFAULT_MAX_RESULTS,
            batch_interval: Duration::from_millis(crate::config::DEFAULT_BATCH_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedPath {
    path: PathBuf,
    relative: String,
    folded: String,
    is_dir: bool,
}

struct Inner {
    root: PathBuf,
    hide_hidden: bool,
    options: SearchOptions,
    index: RwLock<Vec<IndexedPath>>,
    indexing_started: AtomicBool,
    indexing_done: AtomicBool,
    indexed: AtomicUsize,
    /// Bumped by every new search and by `cancel`; running searches stop
    /// once it no longer matches the value they started with.
    generation: AtomicU64,
    shut_down: AtomicBool,
    cache: Mutex<ResultCache>,
}

type CacheKey = (String, bool);

/// Results of the most recent completed queries, oldest first.
#[derive(Default)]
struct ResultCache {
    entries: VecDeque<(CacheKey, Vec<SearchHit>)>,
}

impl ResultCache {
    fn get(&self, key: &CacheKey) -> Option<&Vec<SearchHit>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, hits)| hits)
    }

    fn insert(&mut self, key: CacheKey, hits: Vec<SearchHit>) {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push_back((key, hits));
        while self.entries.len() > CACHED_QUERIES {
            self.entries.pop_front();
        }
    }
}

/// Cloneable handle to a background searcher.
#[derive(Clone)]
pub struct Searcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("root", &self.inner.root)
            .field("hide_hidden", &self.inner.hide_hidden)
            .field("progress", &self.progress())
            .finish()
    }
}

impl Searcher {
    /// Create a searcher. No filesystem work happens until the first search.
    pub fn new(root: &Path, hide_hidden: bool, options: SearchOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: root.to_path_buf(),
                hide_hidden,
                options,
                index: RwLock::new(Vec::new()),
                indexing_started: AtomicBool::new(false),
                indexing_done: AtomicBool::new(false),
                indexed: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
                cache: Mutex::new(ResultCache::default()),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn hide_hidden(&self) -> bool {
        self.inner.hide_hidden
    }

    /// Whether this searcher serves the given root and visibility setting.
    pub fn serves(&self, root: &Path, hide_hidden: bool) -> bool {
        self.inner.root == root && self.inner.hide_hidden == hide_hidden
    }

    /// Current indexing telemetry.
    pub fn progress(&self) -> IndexProgress {
        IndexProgress {
            indexed: self.inner.indexed.load(Ordering::Relaxed),
            done: self.inner.indexing_done.load(Ordering::Acquire),
        }
    }

    /// Completed results for `(query, case_sensitive)`, if a previous search
    /// over the full index produced them.
    pub fn cached_results(&self, query: &str, case_sensitive: bool) -> Option<Vec<SearchHit>> {
        let cache = self.inner.cache.lock().ok()?;
        cache.get(&(query.trim().to_string(), case_sensitive)).cloned()
    }

    /// Stop any running search. The index is kept.
    pub fn cancel(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Stop searches and the index walk for good.
    pub fn shutdown(&self) {
        self.cancel();
        self.inner.shut_down.store(true, Ordering::Release);
    }

    /// Search whatever is indexed right now, on the calling thread.
    pub fn search_sync(&self, query: &str, case_sensitive: bool) -> Vec<SearchHit> {
        let matcher = Matcher::new();
        let tokens = prepare_tokens(query, case_sensitive);
        if tokens.is_empty() {
            return Vec::new();
        }
        match self.inner.index.read() {
            Ok(index) => rank(
                &matcher,
                &tokens,
                case_sensitive,
                &index,
                self.inner.options.max_results,
            ),
            Err(_) => Vec::new(),
        }
    }

    /// Run a search on a worker thread, streaming progress and result batches
    /// into `sink`. The sink returns `false` when the receiver is gone.
    pub fn search_async<F>(&self, query: &str, case_sensitive: bool, mut sink: F)
    where
        F: FnMut(SearchUpdate) -> bool + Send + 'static,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.ensure_indexing();

        let inner = Arc::clone(&self.inner);
        let query = query.trim().to_string();
        let spawned = thread::Builder::new()
            .name("dirb-search".into())
            .spawn(move || {
                let searcher = Searcher { inner };
                searcher.run_search(generation, &query, case_sensitive, &mut sink);
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn search thread");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::Acquire) == generation
            && !self.inner.shut_down.load(Ordering::Acquire)
    }

    fn run_search<F>(&self, generation: u64, query: &str, case_sensitive: bool, sink: &mut F)
    where
        F: FnMut(SearchUpdate) -> bool,
    {
        let matcher = Matcher::new();
        let tokens = prepare_tokens(query, case_sensitive);
        let max_results = self.inner.options.max_results;

        // Index phase: rank the partial index at a fixed cadence.
        while !self.progress().done {
            if !self.is_current(generation) {
                return;
            }
            let results = self.search_sync(query, case_sensitive);
            let batch = SearchBatch {
                results,
                is_done: false,
                in_progress: true,
            };
            if !sink(SearchUpdate::Progress(self.progress())) || !sink(SearchUpdate::Batch(batch)) {
                return;
            }
            thread::sleep(self.inner.options.batch_interval);
        }
        if !self.is_current(generation) || !sink(SearchUpdate::Progress(self.progress())) {
            return;
        }

        // Merge phase: score the complete index chunk by chunk, keeping the
        // running top results.
        let index = match self.inner.index.read() {
            Ok(index) => index,
            Err(_) => return,
        };
        let chunks = index.len().div_ceil(MERGE_CHUNK).max(1);
        let mut merged: Vec<SearchHit> = Vec::new();
        for (i, chunk) in index.chunks(MERGE_CHUNK).enumerate() {
            if !self.is_current(generation) {
                return;
            }
            merged.extend(rank(&matcher, &tokens, case_sensitive, chunk, max_results));
            sort_hits(&mut merged);
            merged.truncate(max_results);
            if i + 1 < chunks {
                let batch = SearchBatch {
                    results: merged.clone(),
                    is_done: true,
                    in_progress: true,
                };
                if !sink(SearchUpdate::Batch(batch)) {
                    return;
                }
            }
        }
        drop(index);

        if !self.is_current(generation) {
            return;
        }
        if let Ok(mut cache) = self.inner.cache.lock() {
            cache.insert((query.to_string(), case_sensitive), merged.clone());
        }
        debug!(query, results = merged.len(), "search complete");
        sink(SearchUpdate::Batch(SearchBatch {
            results: merged,
            is_done: true,
            in_progress: false,
        }));
    }

    fn ensure_indexing(&self) {
        if self.inner.indexing_started.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("dirb-index".into())
            .spawn(move || build_index(&inner));
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn index thread");
            self.inner.indexing_done.store(true, Ordering::Release);
        }
    }
}

fn build_index(inner: &Inner) {
    info!(root = %inner.root.display(), hide_hidden = inner.hide_hidden, "indexing started");
    let hide_hidden = inner.hide_hidden;
    let walker = WalkDir::new(&inner.root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(move |entry| {
            !(hide_hidden && entry.file_name().to_string_lossy().starts_with('.'))
        });

    let mut buffer = Vec::with_capacity(INDEX_FLUSH_EVERY);
    for entry in walker.filter_map(|e| e.ok()) {
        if inner.shut_down.load(Ordering::Acquire) {
            debug!(root = %inner.root.display(), "indexing stopped");
            return;
        }
        let path = entry.path().to_path_buf();
        let relative = path
            .strip_prefix(&inner.root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        buffer.push(IndexedPath {
            folded: relative.to_lowercase(),
            relative,
            path,
            is_dir: entry.file_type().is_dir(),
        });
        if buffer.len() >= INDEX_FLUSH_EVERY {
            flush(inner, &mut buffer);
        }
    }
    flush(inner, &mut buffer);
    inner.indexing_done.store(true, Ordering::Release);
    info!(
        root = %inner.root.display(),
        entries = inner.indexed.load(Ordering::Relaxed),
        "indexing finished"
    );
}

fn flush(inner: &Inner, buffer: &mut Vec<IndexedPath>) {
    if buffer.is_empty() {
        return;
    }
    if let Ok(mut index) = inner.index.write() {
        index.append(buffer);
        inner.indexed.store(index.len(), Ordering::Relaxed);
    }
}

fn rank(
    matcher: &Matcher,
    tokens: &[String],
    case_sensitive: bool,
    entries: &[IndexedPath],
    max_results: usize,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = entries
        .iter()
        .filter_map(|entry| {
            let target = if case_sensitive {
                &entry.relative
            } else {
                &entry.folded
            };
            matcher
                .score_tokens(tokens, target)
                .map(|score| SearchHit {
                    path: entry.path.clone(),
                    relative: entry.relative.clone(),
                    is_dir: entry.is_dir,
                    score,
                })
        })
        .collect();
    sort_hits(&mut hits);
    hits.truncate(max_results);
    hits
}

/// Descending score; stable so ties keep index order.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::sync::mpsc;
    use std::time::Instant;
    use tempfile::TempDir;

    fn setup_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/app")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        File::create(dir.path().join("src/main.rs")).unwrap();
        File::create(dir.path().join("src/app/reducer.rs")).unwrap();
        File::create(dir.path().join("README.md")).unwrap();
        File::create(dir.path().join(".git/config")).unwrap();
        dir
    }

    fn options() -> SearchOptions {
        SearchOptions {
            max_results: 100,
            batch_interval: Duration::from_millis(5),
        }
    }

    fn wait_for_index(searcher: &Searcher) {
        searcher.ensure_indexing();
        let start = Instant::now();
        while !searcher.progress().done {
            assert!(start.elapsed() < Duration::from_secs(10), "index timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn collect_final(searcher: &Searcher, query: &str, case_sensitive: bool) -> Vec<SearchBatch> {
        let (tx, rx) = mpsc::channel();
        searcher.search_async(query, case_sensitive, move |update| {
            if let SearchUpdate::Batch(batch) = update {
                return tx.send(batch).is_ok();
            }
            true
        });
        let mut batches = Vec::new();
        while let Ok(batch) = rx.recv_timeout(Duration::from_secs(10)) {
            let last = !batch.in_progress;
            batches.push(batch);
            if last {
                break;
            }
        }
        batches
    }

    #[test]
    fn new_searcher_does_no_work() {
        let dir = setup_tree();
        let searcher = Searcher::new(dir.path(), true, options());
        assert_eq!(searcher.progress(), IndexProgress::default());
        assert!(searcher.serves(dir.path(), true));
        assert!(!searcher.serves(dir.path(), false));
    }

    #[test]
    fn hidden_directories_are_skipped_when_hiding() {
        let dir = setup_tree();
        let searcher = Searcher::new(dir.path(), true, options());
        wait_for_index(&searcher);
        assert!(searcher.search_sync("config", false).is_empty());

        let all = Searcher::new(dir.path(), false, options());
        wait_for_index(&all);
        let hits = all.search_sync("config", false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].relative, format!(".git{}config", std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn async_search_ends_with_complete_batch_and_caches() {
        let dir = setup_tree();
        let searcher = Searcher::new(dir.path(), true, options());
        let batches = collect_final(&searcher, "reducer", false);
        let last = batches.last().expect("at least one batch");
        assert!(last.is_done);
        assert!(!last.in_progress);
        assert_eq!(last.results.len(), 1);
        assert!(last.results[0].path.ends_with("src/app/reducer.rs"));

        let cached = searcher.cached_results("reducer", false).expect("cached");
        assert_eq!(cached, last.results);
        assert!(searcher.cached_results("reducer", true).is_none());
    }

    #[test]
    fn result_cache_keeps_recent_queries_only() {
        let mut cache = ResultCache::default();
        for i in 0..CACHED_QUERIES + 2 {
            cache.insert((format!("q{i}"), false), Vec::new());
        }
        assert_eq!(cache.entries.len(), CACHED_QUERIES);
        assert!(cache.get(&("q0".to_string(), false)).is_none());
        assert!(cache.get(&("q1".to_string(), false)).is_none());
        assert!(cache.get(&(format!("q{}", CACHED_QUERIES + 1), false)).is_some());

        // Re-inserting refreshes the entry instead of duplicating it.
        cache.insert(("q2".to_string(), false), Vec::new());
        cache.insert(("new".to_string(), false), Vec::new());
        assert_eq!(cache.entries.len(), CACHED_QUERIES);
        assert!(cache.get(&("q2".to_string(), false)).is_some());
        assert!(cache.get(&("q3".to_string(), false)).is_none());
    }

    #[test]
    fn case_sensitive_search_respects_case() {
        let dir = setup_tree();
        let searcher = Searcher::new(dir.path(), true, options());
        wait_for_index(&searcher);
        assert_eq!(searcher.search_sync("README", true).len(), 1);
        assert!(searcher.search_sync("readme", true).is_empty());
        assert_eq!(searcher.search_sync("readme", false).len(), 1);
    }

    #[test]
    fn cancelled_search_sends_nothing_more() {
        let dir = setup_tree();
        let searcher = Searcher::new(dir.path(), true, options());
        wait_for_index(&searcher);
        searcher.shutdown();
        let batches = collect_final(&searcher, "main", false);
        assert!(batches.is_empty());
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let hit = |name: &str, score: f64| SearchHit {
            path: PathBuf::from(name),
            relative: name.to_string(),
            is_dir: false,
            score,
        };
        let mut hits = vec![hit("a", 1.0), hit("b", 3.0), hit("c", 1.0)];
        sort_hits(&mut hits);
        let names: Vec<&str> = hits.iter().map(|h| h.relative.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
