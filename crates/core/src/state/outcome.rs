use crate::domain::{ChainId, TxHash};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// How loudly a rejected event is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Error,
}

/// Recoverable upstream inconsistency detected while applying an event.
///
/// State is left untouched whenever one of these is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("attempted to add existing transaction {hash} on chain {chain_id}")]
    DuplicateTransaction { chain_id: ChainId, hash: TxHash },

    #[error("unknown safe transaction {safe_tx_hash} on chain {chain_id}")]
    UnknownSafeTransaction { chain_id: ChainId, safe_tx_hash: TxHash },

    #[error("attempted to cancel an unknown transaction {hash} on chain {chain_id}")]
    CancelUnknownTransaction { chain_id: ChainId, hash: TxHash },

    #[error("attempted to replace an unknown transaction {old_hash} on chain {chain_id}")]
    ReplaceUnknownTransaction { chain_id: ChainId, old_hash: TxHash },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::DuplicateTransaction { .. } | Diagnostic::UnknownSafeTransaction { .. } => {
                Severity::Warn
            }
            Diagnostic::CancelUnknownTransaction { .. }
            | Diagnostic::ReplaceUnknownTransaction { .. } => Severity::Error,
        }
    }

    /// Logs the diagnostic at its severity
    pub(crate) fn emit(&self) {
        match self.severity() {
            Severity::Warn => warn!("[state::transactions] {}", self),
            Severity::Error => error!("[state::transactions] {}", self),
        }
    }
}

/// Result of applying one event to a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State changed
    Applied,
    /// Event referenced something absent; benign race, nothing logged
    Ignored,
    /// Event rejected with a logged diagnostic, state unchanged
    Rejected(Diagnostic),
}

impl Outcome {
    pub(crate) fn reject(diagnostic: Diagnostic) -> Self {
        diagnostic.emit();
        Outcome::Rejected(diagnostic)
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Outcome::Rejected(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }

    /// Folds a per-item outcome into a batch outcome
    pub(crate) fn merge(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Applied, _) | (_, Outcome::Applied) => Outcome::Applied,
            (rejected @ Outcome::Rejected(_), _) => rejected,
            (_, other) => other,
        }
    }
}
