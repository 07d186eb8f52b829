#![forbid(unsafe_code)]

//! Paginated, single-flight content loading.
//!
//! A [`PaginatedLoader`] requests pages from a pluggable [`PageSource`] and
//! hands each completed page to its group during [`PaginatedLoader::pump`].
//! Everything runs on the UI thread; [`ThreadedSource`] is the only place
//! work leaves it, and its results are drained back in `pump`.
//!
//! # Invariants
//!
//! 1. At most one load is in flight. A second [`load`](PaginatedLoader::load)
//!    while loading is rejected, never queued.
//! 2. `has_loaded_all` is monotonic.
//! 3. On completion: `is_loading` clears, the batch is delivered, then
//!    `on_batch_loaded` fires.
//!
//! # Failure Modes
//!
//! - A [`ThreadedSource`] worker that dies without answering is treated as
//!   an empty final page so the group never waits forever.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use crate::card::ContentRef;
use crate::error::LoaderError;
use crate::signal::Signal;

// ---------------------------------------------------------------------------
// Page sources
// ---------------------------------------------------------------------------

/// One delivered page of content.
pub struct Page {
    /// Content in arrival order.
    pub contents: Vec<ContentRef>,
    /// The source has nothing after this page.
    pub last: bool,
}

impl Page {
    /// A page that may be followed by more.
    #[must_use]
    pub fn more(contents: Vec<ContentRef>) -> Self {
        Self {
            contents,
            last: false,
        }
    }

    /// The final page.
    #[must_use]
    pub fn last(contents: Vec<ContentRef>) -> Self {
        Self {
            contents,
            last: true,
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("len", &self.contents.len())
            .field("last", &self.last)
            .finish()
    }
}

/// Where pages come from.
pub trait PageSource {
    /// Begin fetching page `index`. Called only when no request is pending.
    fn request(&mut self, index: u32);

    /// Advance by `dt` and return the pending page if it is ready.
    fn poll(&mut self, dt: Duration) -> Option<Page>;
}

/// Local source that produces each page after a fixed delay.
pub struct SimulatedSource<F> {
    delay: Duration,
    factory: F,
    pending: Option<(u32, Duration)>,
}

impl<F: FnMut(u32) -> Vec<ContentRef>> SimulatedSource<F> {
    /// Pages are built by `factory(index)` once `delay` has elapsed.
    #[must_use]
    pub fn new(delay: Duration, factory: F) -> Self {
        Self {
            delay,
            factory,
            pending: None,
        }
    }
}

impl<F: FnMut(u32) -> Vec<ContentRef>> PageSource for SimulatedSource<F> {
    fn request(&mut self, index: u32) {
        self.pending = Some((index, Duration::ZERO));
    }

    fn poll(&mut self, dt: Duration) -> Option<Page> {
        let (index, elapsed) = self.pending.as_mut()?;
        *elapsed = elapsed.saturating_add(dt);
        if *elapsed < self.delay {
            return None;
        }
        let index = *index;
        self.pending = None;
        Some(Page::more((self.factory)(index)))
    }
}

/// Source serving a prepared list of pages, one per request.
#[derive(Default)]
pub struct FixedSource {
    pages: VecDeque<Vec<ContentRef>>,
    requested: bool,
}

impl FixedSource {
    /// Serve `pages` in order; the last one is marked final.
    #[must_use]
    pub fn new(pages: Vec<Vec<ContentRef>>) -> Self {
        Self {
            pages: pages.into(),
            requested: false,
        }
    }
}

impl PageSource for FixedSource {
    fn request(&mut self, _index: u32) {
        self.requested = true;
    }

    fn poll(&mut self, _dt: Duration) -> Option<Page> {
        if !std::mem::take(&mut self.requested) {
            return None;
        }
        let contents = self.pages.pop_front().unwrap_or_default();
        Some(Page {
            contents,
            last: self.pages.is_empty(),
        })
    }
}

/// A page of raw items produced off the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage<T> {
    pub items: Vec<T>,
    pub last: bool,
}

type FetchFn<T> = Arc<dyn Fn(u32) -> RemotePage<T> + Send + Sync>;

/// Source that fetches on a worker thread.
///
/// `fetch` runs on a spawned thread and returns `Send` items; `convert`
/// turns each item into content back on the UI thread during `poll`.
pub struct ThreadedSource<T, C> {
    fetch: FetchFn<T>,
    convert: C,
    rx: Option<Receiver<RemotePage<T>>>,
}

impl<T, C> ThreadedSource<T, C>
where
    T: Send + 'static,
    C: FnMut(T) -> ContentRef,
{
    /// Create a threaded source.
    #[must_use]
    pub fn new(fetch: impl Fn(u32) -> RemotePage<T> + Send + Sync + 'static, convert: C) -> Self {
        Self {
            fetch: Arc::new(fetch),
            convert,
            rx: None,
        }
    }
}

impl<T, C> PageSource for ThreadedSource<T, C>
where
    T: Send + 'static,
    C: FnMut(T) -> ContentRef,
{
    fn request(&mut self, index: u32) {
        let (tx, rx) = mpsc::channel();
        let fetch = Arc::clone(&self.fetch);
        let spawned = std::thread::Builder::new()
            .name(format!("cardstack-page-{index}"))
            .spawn(move || {
                // The receiver may be gone if the group was dropped.
                let _ = tx.send(fetch(index));
            });
        if let Err(err) = spawned {
            tracing::warn!(target: "cardstack.loader", page = index, %err, "failed to spawn page worker");
        }
        self.rx = Some(rx);
    }

    fn poll(&mut self, _dt: Duration) -> Option<Page> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(remote) => {
                self.rx = None;
                let contents = remote.items.into_iter().map(&mut self.convert).collect();
                Some(Page {
                    contents,
                    last: remote.last,
                })
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                tracing::warn!(target: "cardstack.loader", "page worker disconnected; treating as final page");
                Some(Page::last(Vec::new()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PaginatedLoader
// ---------------------------------------------------------------------------

/// Emitted after each batch is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoaded {
    /// Zero-based page index.
    pub page: u32,
    /// Number of content units in the batch.
    pub count: usize,
    /// Whether this was the final batch.
    pub has_loaded_all: bool,
}

/// Single-flight paginated loader.
pub struct PaginatedLoader {
    source: Box<dyn PageSource>,
    is_loading: bool,
    has_loaded_all: bool,
    batches_loaded: u32,
    batch_budget: Option<u32>,
    on_batch_loaded: Signal<BatchLoaded>,
}

impl std::fmt::Debug for PaginatedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedLoader")
            .field("is_loading", &self.is_loading)
            .field("has_loaded_all", &self.has_loaded_all)
            .field("batches_loaded", &self.batches_loaded)
            .field("batch_budget", &self.batch_budget)
            .finish_non_exhaustive()
    }
}

impl PaginatedLoader {
    /// Create an idle loader over `source`.
    #[must_use]
    pub fn new(source: impl PageSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            is_loading: false,
            has_loaded_all: false,
            batches_loaded: 0,
            batch_budget: None,
            on_batch_loaded: Signal::new(),
        }
    }

    /// Stop after `budget` batches (builder pattern).
    #[must_use]
    pub fn with_batch_budget(mut self, budget: u32) -> Self {
        self.batch_budget = Some(budget);
        self
    }

    /// Whether a load is in flight.
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether every page has been delivered.
    #[inline]
    #[must_use]
    pub fn has_loaded_all(&self) -> bool {
        self.has_loaded_all
    }

    /// Batches delivered so far.
    #[must_use]
    pub fn batches_loaded(&self) -> u32 {
        self.batches_loaded
    }

    /// Fires after each delivered batch.
    #[must_use]
    pub fn on_batch_loaded(&self) -> &Signal<BatchLoaded> {
        &self.on_batch_loaded
    }

    /// Request the next page.
    ///
    /// Callers are expected to check [`is_loading`](Self::is_loading) first;
    /// violations are rejected and logged.
    pub fn load(&mut self) -> Result<(), LoaderError> {
        if self.is_loading {
            tracing::warn!(target: "cardstack.loader", page = self.batches_loaded, "load requested while already loading");
            return Err(LoaderError::AlreadyLoading);
        }
        if self.has_loaded_all {
            return Err(LoaderError::Exhausted);
        }
        self.is_loading = true;
        self.source.request(self.batches_loaded);
        tracing::debug!(target: "cardstack.loader", page = self.batches_loaded, "load started");
        Ok(())
    }

    /// Advance the source. When a page completes, `on_complete` receives the
    /// batch and `on_batch_loaded` fires afterwards.
    pub fn pump(&mut self, dt: Duration, on_complete: impl FnOnce(Vec<ContentRef>)) -> bool {
        if !self.is_loading {
            return false;
        }
        let Some(page) = self.source.poll(dt) else {
            return false;
        };

        let index = self.batches_loaded;
        self.is_loading = false;
        self.batches_loaded += 1;
        let budget_spent = self.batch_budget.is_some_and(|b| self.batches_loaded >= b);
        self.has_loaded_all = self.has_loaded_all || page.last || budget_spent;

        let event = BatchLoaded {
            page: index,
            count: page.contents.len(),
            has_loaded_all: self.has_loaded_all,
        };
        tracing::debug!(
            target: "cardstack.loader",
            page = index,
            count = event.count,
            has_loaded_all = event.has_loaded_all,
            "batch loaded"
        );
        on_complete(page.contents);
        self.on_batch_loaded.emit(&event);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
