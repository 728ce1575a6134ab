use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Quiet period after the last domain edit before the API is asked.
pub const DOMAIN_CHECK_DEBOUNCE: Duration = Duration::from_millis(500);

/// Anything that can tell whether a domain already holds a license.
pub trait DomainLookup: Send + Sync + 'static {
    fn domain_exists(&self, domain: &str) -> impl Future<Output = Result<bool>> + Send;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainCheckState {
    /// Value the state refers to
    pub domain: String,
    /// A lookup is scheduled or in flight
    pub checking: bool,
    /// The API reported the domain as taken
    pub exists: bool,
}

impl DomainCheckState {
    pub fn blocks_submit(&self) -> bool {
        self.checking || self.exists
    }
}

/// Debounced duplicate-domain check driven by form edits.
///
/// Every edit cancels the previous pending lookup, so a burst of edits inside
/// the debounce window produces a single lookup for the final value.
pub struct DomainChecker<L> {
    lookup: Arc<L>,
    delay: Duration,
    state: Arc<watch::Sender<DomainCheckState>>,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl<L: DomainLookup> DomainChecker<L> {
    pub fn new(lookup: Arc<L>, delay: Duration) -> Self {
        let (state, _) = watch::channel(DomainCheckState::default());
        Self {
            lookup,
            delay,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    /// Record a new value of the domain field. Must run inside a Tokio runtime.
    pub fn edit(&mut self, value: &str) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        // Bumped before the reset so a lookup finishing concurrently is discarded
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let domain = value.trim().to_string();
        let checking = !domain.is_empty();

        self.state.send_replace(DomainCheckState {
            domain: domain.clone(),
            checking,
            exists: false,
        });

        if !checking {
            return;
        }

        let lookup = self.lookup.clone();
        let state = self.state.clone();
        let current = self.generation.clone();
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let exists = match lookup.domain_exists(&domain).await {
                Ok(exists) => exists,
                Err(e) => {
                    tracing::debug!(domain = %domain, "Domain check failed: {}", e);
                    false
                }
            };

            state.send_if_modified(|s| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                s.checking = false;
                s.exists = exists;
                true
            });
        }));
    }

    pub fn state(&self) -> DomainCheckState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DomainCheckState> {
        self.state.subscribe()
    }

    /// Wait until no lookup is scheduled or running.
    pub async fn settled(&self) -> DomainCheckState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|s| !s.checking).await {
            Ok(state) => state.clone(),
            Err(_) => return self.state(),
        };
        settled
    }

    pub fn blocks_submit(&self) -> bool {
        self.state.borrow().blocks_submit()
    }
}

impl<L> Drop for DomainChecker<L> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
