pub mod orders;
pub mod outcome;
pub mod transactions;

use crate::clock::Clock;
use crate::domain::ChainId;
use serde::{Deserialize, Serialize};

pub use orders::{FulfilledOrderInfo, OrderAction, OrdersMap, OrdersState, OrdersStateNetwork};
pub use outcome::{Diagnostic, Outcome, Severity};
pub use transactions::{TransactionAction, TransactionState};

/// Both trackers, as read by the UI and persisted by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub transactions: TransactionState,
    #[serde(default)]
    pub orders: OrdersState,
}

/// Any event a tracker consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tracker", content = "action", rename_all = "camelCase")]
pub enum Action {
    Transaction(TransactionAction),
    Order(OrderAction),
}

impl Action {
    pub fn chain_id(&self) -> ChainId {
        match self {
            Action::Transaction(action) => action.chain_id(),
            Action::Order(action) => action.chain_id(),
        }
    }
}

impl From<TransactionAction> for Action {
    fn from(action: TransactionAction) -> Self {
        Action::Transaction(action)
    }
}

impl From<OrderAction> for Action {
    fn from(action: OrderAction) -> Self {
        Action::Order(action)
    }
}

impl AppState {
    /// Routes the event to the tracker that owns it
    pub fn reduce(&mut self, action: Action, clock: &dyn Clock) -> Outcome {
        match action {
            Action::Transaction(action) => self.transactions.reduce(action, clock),
            Action::Order(action) => self.orders.reduce(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn test_routes_to_owning_tracker() {
        let clock = FixedClock::new(0);
        let mut state = AppState::default();

        let outcome = state.reduce(
            OrderAction::UpdateLastCheckedBlock {
                chain_id: ChainId::GOERLI,
                last_checked_block: 8_000_000,
            }
            .into(),
            &clock,
        );

        assert!(outcome.is_applied());
        assert_eq!(state.orders.last_checked_block(ChainId::GOERLI), 8_000_000);
        assert_eq!(state.transactions, TransactionState::default());
    }

    #[test]
    fn test_action_envelope_wire_format() {
        let json = r#"{
            "tracker": "transaction",
            "action": { "type": "cancel", "chainId": 1, "hash": "0xA" }
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.chain_id(), ChainId::MAINNET);
        assert!(matches!(
            action,
            Action::Transaction(TransactionAction::Cancel { .. })
        ));
    }

    #[test]
    fn test_empty_document_loads_as_default() {
        let state: AppState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, AppState::default());
    }
}
