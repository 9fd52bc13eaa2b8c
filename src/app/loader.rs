//! Token bookkeeping for asynchronous loads.
//!
//! A `LoadSlot` tracks at most one debounced request and one request in
//! flight for a single logical target (the directory view, or the preview
//! pane). Every request carries a fresh `LoadToken`; completions are only
//! accepted for the token currently in flight, which is what lets superseded
//! results be dropped without further sequencing.

use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of one load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadToken(u64);

impl LoadToken {
    #[cfg(test)]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for LoadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a slot is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    PendingDebounce,
    Loading,
    Applied,
}

/// A request issued by a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest<M> {
    pub token: LoadToken,
    pub path: PathBuf,
    pub meta: M,
}

/// Tokens released by a cancellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cancelled {
    pub pending: Option<LoadToken>,
    pub in_flight: Option<LoadToken>,
}

/// Load state for one target. `M` is per-request metadata, `C` the
/// post-load callbacks queued against the in-flight token.
#[derive(Debug)]
pub struct LoadSlot<M, C> {
    next_token: u64,
    pending: Option<LoadRequest<M>>,
    in_flight: Option<LoadRequest<M>>,
    callbacks: Vec<(LoadToken, C)>,
    phase: LoadPhase,
}

impl<M, C> Default for LoadSlot<M, C> {
    fn default() -> Self {
        Self {
            next_token: 0,
            pending: None,
            in_flight: None,
            callbacks: Vec::new(),
            phase: LoadPhase::Idle,
        }
    }
}

impl<M, C> LoadSlot<M, C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self) -> LoadToken {
        self.next_token += 1;
        LoadToken(self.next_token)
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn pending(&self) -> Option<&LoadRequest<M>> {
        self.pending.as_ref()
    }

    pub fn in_flight(&self) -> Option<&LoadRequest<M>> {
        self.in_flight.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether `token` is the request currently in flight.
    pub fn is_active(&self, token: LoadToken) -> bool {
        self.in_flight.as_ref().is_some_and(|r| r.token == token)
    }

    /// Queue a debounced request, replacing any earlier pending one.
    /// Returns the new token and the token whose timer must be cancelled.
    pub fn schedule(&mut self, path: &Path, meta: M) -> (LoadToken, Option<LoadToken>) {
        let token = self.issue();
        let replaced = self.pending.take().map(|r| r.token);
        self.pending = Some(LoadRequest {
            token,
            path: path.to_path_buf(),
            meta,
        });
        self.phase = LoadPhase::PendingDebounce;
        (token, replaced)
    }

    /// Take the pending request when its debounce timer fires. A timer for a
    /// replaced request yields `None`.
    pub fn take_pending(&mut self, token: LoadToken) -> Option<LoadRequest<M>> {
        if self.pending.as_ref().is_some_and(|r| r.token == token) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Put `request` in flight. The previous in-flight request is superseded
    /// and its callbacks dropped; its token is returned for cancellation.
    pub fn begin(&mut self, request: LoadRequest<M>) -> Option<LoadToken> {
        let superseded = self.cancel_in_flight();
        self.in_flight = Some(request);
        self.phase = LoadPhase::Loading;
        superseded
    }

    /// Issue a token and put a request in flight immediately.
    pub fn start(&mut self, path: &Path, meta: M) -> (LoadToken, Option<LoadToken>) {
        let token = self.issue();
        let superseded = self.begin(LoadRequest {
            token,
            path: path.to_path_buf(),
            meta,
        });
        (token, superseded)
    }

    /// Queue `callback` to run when `token` completes. Ignored unless the
    /// token is in flight.
    pub fn on_complete(&mut self, token: LoadToken, callback: C) {
        if self.is_active(token) {
            self.callbacks.push((token, callback));
        }
    }

    /// Accept the completion of `token`. Returns the request and its
    /// callbacks in registration order, or `None` for a superseded token.
    pub fn complete(&mut self, token: LoadToken) -> Option<(LoadRequest<M>, Vec<C>)> {
        if !self.is_active(token) {
            return None;
        }
        let request = self.in_flight.take()?;
        let (mine, rest): (Vec<_>, Vec<_>) =
            self.callbacks.drain(..).partition(|(t, _)| *t == token);
        self.callbacks = rest;
        self.phase = if self.pending.is_some() {
            LoadPhase::PendingDebounce
        } else {
            LoadPhase::Applied
        };
        Some((request, mine.into_iter().map(|(_, c)| c).collect()))
    }

    /// Drop the in-flight request and its callbacks.
    pub fn cancel_in_flight(&mut self) -> Option<LoadToken> {
        let token = self.in_flight.take().map(|r| r.token)?;
        self.callbacks.retain(|(t, _)| *t != token);
        if self.phase == LoadPhase::Loading {
            self.phase = LoadPhase::Idle;
        }
        Some(token)
    }

    /// Drop everything: pending timer, in-flight request and callbacks.
    pub fn cancel(&mut self) -> Cancelled {
        let pending = self.pending.take().map(|r| r.token);
        let in_flight = self.cancel_in_flight();
        self.callbacks.clear();
        self.phase = LoadPhase::Idle;
        Cancelled { pending, in_flight }
    }
}
