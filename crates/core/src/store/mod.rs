//! Hosting store for the trackers.
//!
//! All dispatches go through a single write lock, one event at a time.
//! Readers take `Arc` snapshots; a dispatch copies the state before mutating
//! it whenever a snapshot is still held, so a reader never sees an order that
//! has left its old bucket but not yet reached the new one.

pub mod storage;

use crate::clock::{Clock, SystemClock};
use crate::state::{Action, AppState, Outcome};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

pub use storage::{FileStorage, MemoryStorage, StateStorage};

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file to persist state to; in-memory only if unset
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// Save after every event that changed state
    #[serde(default = "default_persist_on_dispatch")]
    pub persist_on_dispatch: bool,
}

fn default_persist_on_dispatch() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            persist_on_dispatch: default_persist_on_dispatch(),
        }
    }
}

/// Serializes events into the trackers and hands out consistent snapshots
pub struct Store {
    state: RwLock<Arc<AppState>>,
    storage: Arc<dyn StateStorage>,
    clock: Arc<dyn Clock>,
    persist_on_dispatch: bool,
}

impl Store {
    /// Creates a store over `storage`, starting from whatever it last saved
    pub async fn open(
        storage: Arc<dyn StateStorage>,
        clock: Arc<dyn Clock>,
        persist_on_dispatch: bool,
    ) -> Result<Self> {
        let state = storage.load().await?.unwrap_or_default();
        info!(
            "Opened store with {} order chains and {} transaction chains",
            state.orders.chain_ids().count(),
            state.transactions.chain_ids().count()
        );

        Ok(Self {
            state: RwLock::new(Arc::new(state)),
            storage,
            clock,
            persist_on_dispatch,
        })
    }

    /// Builds the storage backend described by `config` and opens the store
    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        let storage: Arc<dyn StateStorage> = match &config.state_path {
            Some(path) => Arc::new(FileStorage::new(path.clone())),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::open(storage, Arc::new(SystemClock), config.persist_on_dispatch).await
    }

    /// In-memory store without persistence
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(Arc::new(AppState::default())),
            storage: Arc::new(MemoryStorage::new()),
            clock,
            persist_on_dispatch: false,
        }
    }

    /// Applies one event and saves the result if state changed.
    ///
    /// The transition itself is total. An `Err` only reports that saving
    /// failed: the event has already been applied in memory and the next
    /// successful save (or [`Store::persist`]) writes it out.
    pub async fn dispatch(&self, action: Action) -> Result<Outcome> {
        let mut guard = self.state.write().await;
        let chain_id = action.chain_id();
        let seeds_chain = matches!(action, Action::Order(_)) && !guard.orders.is_seeded(chain_id);
        let outcome = Arc::make_mut(&mut *guard).reduce(action, self.clock.as_ref());
        debug!("Dispatched event on chain {}: {:?}", chain_id, outcome);

        if self.persist_on_dispatch && (outcome.is_applied() || seeds_chain) {
            if let Err(e) = self.storage.save(&guard).await {
                error!("Event on chain {} applied but not saved: {}", chain_id, e);
                return Err(e);
            }
        }
        Ok(outcome)
    }

    /// Applies events in order, stopping at the first persistence failure.
    /// Events before and including the failing one stay applied.
    pub async fn dispatch_all<I>(&self, actions: I) -> Result<Vec<Outcome>>
    where
        I: IntoIterator<Item = Action>,
    {
        let mut outcomes = Vec::new();
        for action in actions {
            outcomes.push(self.dispatch(action).await?);
        }
        Ok(outcomes)
    }

    /// Current state; later dispatches never alter the returned value
    pub async fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&*self.state.read().await)
    }

    pub async fn persist(&self) -> Result<()> {
        let state = self.snapshot().await;
        self.storage.save(&state).await
    }
}
