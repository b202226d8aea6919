//! Client-side state tracking for exchange orders and the blockchain
//! transactions that back them.
//!
//! Two reducers, [`TransactionState`] and [`OrdersState`], consume events
//! dispatched by pollers and submission flows. The [`Store`] serializes those
//! events and hands out consistent snapshots to readers.

pub mod clock;
pub mod domain;
pub mod state;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{ChainId, EnhancedTransaction, HashType, Order, OrderBucket, OrderId, OrderStatus};
pub use state::{Action, AppState, Diagnostic, OrderAction, OrdersState, Outcome, Severity, TransactionAction, TransactionState};
pub use store::{Store, StoreConfig};

/// Core result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
