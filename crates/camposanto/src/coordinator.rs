//! Stateful search orchestration.
//!
//! The [`SearchCoordinator`] owns the state a search screen renders from and
//! decides when a search actually runs: changes to the free-text term are
//! debounced, every other change (page, sort, filter) runs right away.
//! Executions are numbered in the order they are requested; when a newer one
//! has been requested, the results of an older one are dropped on arrival.

use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};

use camposanto_store::RecordStore;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, instrument, warn};

use crate::{
    clock::{Clock, SystemClock},
    config::PipelineConfig,
    pipeline::search_page,
    query::SearchParams,
    resolve::ResolvedRecord,
};

/// What a search screen renders.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub loading: bool,
    pub results: Vec<ResolvedRecord>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub error: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            loading: false,
            results: Vec::new(),
            total_count: 0,
            current_page: 1,
            total_pages: 0,
            error: None,
        }
    }
}

/// How [`SearchCoordinator::run`] scheduled a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Same search term as the last run; executing now
    Immediate,
    /// New search term; executing once the debounce window passes quietly
    Debounced,
}

#[derive(Debug, Default)]
struct Control {
    active_search_term: String,
    pending: Option<JoinHandle<()>>,
    /// Bumped on every run; a sleeping debounce only fires if it still matches
    generation: u64,
}

impl Control {
    fn supersede(&mut self) -> u64 {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.generation += 1;
        self.generation
    }
}

fn lock(control: &Mutex<Control>) -> MutexGuard<'_, Control> {
    control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Inner<S> {
    store: S,
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    state: watch::Sender<SearchState>,
    control: Mutex<Control>,
    /// Generation of the newest execution; only it may publish or clear `loading`
    current: AtomicU64,
}

/// Clears `loading` when the execution holding it ends, however it ends.
struct LoadingGuard<'a, S> {
    inner: &'a Inner<S>,
    sequence: u64,
}

impl<S> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        if self.inner.is_current(self.sequence) {
            self.inner.state.send_if_modified(|state| {
                let was_loading = state.loading;
                state.loading = false;
                was_loading
            });
        }
    }
}

impl<S> Inner<S> {
    fn is_current(&self, sequence: u64) -> bool {
        self.current.load(Ordering::SeqCst) == sequence
    }

    /// Claim ownership of the state for `sequence`. Must be called with the
    /// control lock held so claims happen in `run` order.
    fn claim(&self, _control: &Control, sequence: u64) {
        self.current.store(sequence, Ordering::SeqCst);
    }
}

impl<S: RecordStore + 'static> Inner<S> {
    #[instrument(name = "Search", level = "debug", skip_all, fields(sequence = sequence))]
    async fn execute(&self, params: SearchParams, sequence: u64) {
        if !self.is_current(sequence) {
            debug!(sequence, "Search overtaken before it started");
            return;
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        let _loading = LoadingGuard {
            inner: self,
            sequence,
        };

        let outcome = search_page(&self.store, &params, self.clock.today(), &self.config).await;
        if !self.is_current(sequence) {
            debug!(sequence, "Discarding results of an overtaken search");
            return;
        }

        match outcome {
            Ok(page) => {
                let total_pages = page.total_pages();
                self.state.send_modify(|state| {
                    state.results = page.records;
                    state.total_count = page.total_count;
                    state.current_page = page.page;
                    state.total_pages = total_pages;
                });
            }
            Err(e) => {
                warn!(error = %e, "Search failed");
                self.state.send_modify(|state| {
                    state.error = Some(e.to_string());
                    state.results.clear();
                    state.total_count = 0;
                    state.total_pages = 0;
                });
            }
        }
    }
}

/// Debounced, self-publishing front of the search pipeline.
///
/// [`run`](Self::run) spawns onto the ambient tokio runtime and must be called
/// from within one.
pub struct SearchCoordinator<S> {
    inner: Arc<Inner<S>>,
}

impl<S: RecordStore + 'static> SearchCoordinator<S> {
    pub fn new(store: S, config: PipelineConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, config: PipelineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                clock,
                state: watch::Sender::new(SearchState::default()),
                control: Mutex::new(Control::default()),
                current: AtomicU64::new(0),
            }),
        }
    }

    /// Schedule a search for `params`.
    ///
    /// A search term different from the last executed one waits for the
    /// debounce window; any later call replaces it. Otherwise the search
    /// starts immediately. Either way a still-waiting debounced search is
    /// cancelled.
    pub fn run(&self, params: SearchParams) -> Dispatch {
        let mut control = lock(&self.inner.control);
        let generation = control.supersede();

        if params.search_term == control.active_search_term {
            self.inner.claim(&control, generation);
            drop(control);
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.execute(params, generation).await });
            return Dispatch::Immediate;
        }

        debug!(
            term = %params.search_term,
            debounce_ms = self.inner.config.debounce.as_millis(),
            "Debouncing search term change"
        );
        let inner = Arc::clone(&self.inner);
        control.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.config.debounce).await;
            {
                let mut control = lock(&inner.control);
                if control.generation != generation {
                    return;
                }
                control.pending = None;
                control.active_search_term.clone_from(&params.search_term);
                inner.claim(&control, generation);
            }
            inner.execute(params, generation).await;
        }));
        Dispatch::Debounced
    }

    /// Run a search now, skipping the debounce, and return the state it left.
    pub async fn run_now(&self, params: SearchParams) -> SearchState {
        let generation = {
            let mut control = lock(&self.inner.control);
            let generation = control.supersede();
            control.active_search_term.clone_from(&params.search_term);
            self.inner.claim(&control, generation);
            generation
        };
        self.inner.execute(params, generation).await;
        self.state()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }
}

impl<S> Drop for SearchCoordinator<S> {
    fn drop(&mut self) {
        if let Some(pending) = lock(&self.inner.control).pending.take() {
            pending.abort();
        }
    }
}
