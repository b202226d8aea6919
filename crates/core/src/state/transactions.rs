//! Transaction tracker.
//!
//! Keeps per-chain metadata about submitted transactions: when they were
//! added, the last block the poller checked them against, their receipt once
//! mined and the operation (approval, presignature) they carry out. Safe
//! transactions are tracked under their Safe tx hash until the on-chain hash
//! becomes known.

use crate::clock::Clock;
use crate::domain::{
    Approval, ChainId, EnhancedTransaction, HashType, Presign, SafeMultisigTransaction,
    TransactionReceipt, TxHash,
};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::outcome::{Diagnostic, Outcome};

/// Events handled by the transaction tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransactionAction {
    Add {
        chain_id: ChainId,
        hash: TxHash,
        hash_type: HashType,
        from: Address,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        approval: Option<Approval>,
        #[serde(default)]
        presign: Option<Presign>,
        #[serde(default)]
        safe_transaction: Option<SafeMultisigTransaction>,
    },
    ClearAll {
        chain_id: ChainId,
    },
    Checked {
        chain_id: ChainId,
        hash: TxHash,
        block_number: u64,
    },
    Finalize {
        chain_id: ChainId,
        hash: TxHash,
        receipt: TransactionReceipt,
    },
    Cancel {
        chain_id: ChainId,
        hash: TxHash,
    },
    Replace {
        chain_id: ChainId,
        old_hash: TxHash,
        new_hash: TxHash,
    },
    UpdateSafeTransaction {
        chain_id: ChainId,
        safe_transaction: SafeMultisigTransaction,
        block_number: u64,
    },
}

impl TransactionAction {
    pub fn chain_id(&self) -> ChainId {
        match self {
            TransactionAction::Add { chain_id, .. }
            | TransactionAction::ClearAll { chain_id }
            | TransactionAction::Checked { chain_id, .. }
            | TransactionAction::Finalize { chain_id, .. }
            | TransactionAction::Cancel { chain_id, .. }
            | TransactionAction::Replace { chain_id, .. }
            | TransactionAction::UpdateSafeTransaction { chain_id, .. } => *chain_id,
        }
    }
}

/// chain id => tx hash => transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionState {
    chains: HashMap<ChainId, HashMap<TxHash, EnhancedTransaction>>,
}

impl TransactionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chain_id: ChainId, hash: &str) -> Option<&EnhancedTransaction> {
        self.chains.get(&chain_id)?.get(hash)
    }

    /// All transactions tracked on a chain
    pub fn for_chain(&self, chain_id: ChainId) -> Option<&HashMap<TxHash, EnhancedTransaction>> {
        self.chains.get(&chain_id)
    }

    /// Transactions on a chain still waiting for a receipt
    pub fn pending(&self, chain_id: ChainId) -> Vec<&EnhancedTransaction> {
        self.chains
            .get(&chain_id)
            .map(|txs| txs.values().filter(|tx| tx.is_pending()).collect())
            .unwrap_or_default()
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.chains.keys().copied()
    }

    fn get_mut(&mut self, chain_id: ChainId, hash: &str) -> Option<&mut EnhancedTransaction> {
        self.chains.get_mut(&chain_id)?.get_mut(hash)
    }

    /// Applies one event in place
    pub fn reduce(&mut self, action: TransactionAction, clock: &dyn Clock) -> Outcome {
        match action {
            TransactionAction::Add {
                chain_id,
                hash,
                hash_type,
                from,
                summary,
                approval,
                presign,
                safe_transaction,
            } => {
                if self.get(chain_id, &hash).is_some() {
                    return Outcome::reject(Diagnostic::DuplicateTransaction { chain_id, hash });
                }

                let transaction = EnhancedTransaction {
                    hash: hash.clone(),
                    transaction_hash: match hash_type {
                        HashType::EthereumTx => Some(hash.clone()),
                        HashType::GnosisSafeTx => None,
                    },
                    hash_type,
                    added_time: clock.now_millis(),
                    last_checked_block_number: None,
                    from,
                    summary,
                    confirmed_time: None,
                    receipt: None,
                    approval,
                    presign,
                    safe_transaction,
                };
                debug!("Tracking transaction {} on chain {}", hash, chain_id);
                self.chains
                    .entry(chain_id)
                    .or_default()
                    .insert(hash, transaction);
                Outcome::Applied
            }

            TransactionAction::ClearAll { chain_id } => match self.chains.get_mut(&chain_id) {
                Some(txs) => {
                    txs.clear();
                    Outcome::Applied
                }
                None => Outcome::Ignored,
            },

            TransactionAction::Checked {
                chain_id,
                hash,
                block_number,
            } => match self.get_mut(chain_id, &hash) {
                Some(tx) => {
                    tx.record_checked_block(block_number);
                    Outcome::Applied
                }
                None => Outcome::Ignored,
            },

            TransactionAction::Finalize {
                chain_id,
                hash,
                receipt,
            } => {
                let now = clock.now_millis();
                match self.get_mut(chain_id, &hash) {
                    Some(tx) => {
                        tx.receipt = Some(receipt);
                        tx.confirmed_time = Some(now);
                        debug!("Finalized transaction {} on chain {}", hash, chain_id);
                        Outcome::Applied
                    }
                    None => Outcome::Ignored,
                }
            }

            TransactionAction::Cancel { chain_id, hash } => {
                match self.chains.get_mut(&chain_id).and_then(|txs| txs.remove(&hash)) {
                    Some(_) => Outcome::Applied,
                    None => Outcome::reject(Diagnostic::CancelUnknownTransaction { chain_id, hash }),
                }
            }

            TransactionAction::Replace {
                chain_id,
                old_hash,
                new_hash,
            } => {
                let now = clock.now_millis();
                let Some(txs) = self.chains.get_mut(&chain_id) else {
                    return Outcome::reject(Diagnostic::ReplaceUnknownTransaction {
                        chain_id,
                        old_hash,
                    });
                };
                let Some(mut tx) = txs.remove(&old_hash) else {
                    return Outcome::reject(Diagnostic::ReplaceUnknownTransaction {
                        chain_id,
                        old_hash,
                    });
                };
                debug!(
                    "Replacing transaction {} with {} on chain {}",
                    old_hash, new_hash, chain_id
                );
                tx.hash = new_hash.clone();
                tx.transaction_hash = Some(new_hash.clone());
                tx.added_time = now;
                txs.insert(new_hash, tx);
                Outcome::Applied
            }

            TransactionAction::UpdateSafeTransaction {
                chain_id,
                safe_transaction,
                block_number,
            } => {
                let Some(tx) = self.get_mut(chain_id, &safe_transaction.safe_tx_hash) else {
                    return Outcome::reject(Diagnostic::UnknownSafeTransaction {
                        chain_id,
                        safe_tx_hash: safe_transaction.safe_tx_hash,
                    });
                };

                tx.record_checked_block(block_number);
                if let Some(transaction_hash) = &safe_transaction.transaction_hash {
                    tx.transaction_hash = Some(transaction_hash.clone());
                }
                tx.safe_transaction = Some(safe_transaction);
                Outcome::Applied
            }
        }
    }

    /// Copy-on-write form of [`TransactionState::reduce`]
    pub fn reduced(mut self, action: TransactionAction, clock: &dyn Clock) -> (Self, Outcome) {
        let outcome = self.reduce(action, clock);
        (self, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::state::outcome::Severity;
    use ethers::types::{H256, U256};

    const CHAIN: ChainId = ChainId::MAINNET;

    fn add(hash: &str, hash_type: HashType) -> TransactionAction {
        TransactionAction::Add {
            chain_id: CHAIN,
            hash: hash.to_string(),
            hash_type,
            from: Address::from_low_u64_be(0xaa),
            summary: Some("Approve WETH".to_string()),
            approval: Some(Approval {
                token_address: Address::from_low_u64_be(1),
                spender: Address::from_low_u64_be(2),
            }),
            presign: None,
            safe_transaction: None,
        }
    }

    fn checked(hash: &str, block_number: u64) -> TransactionAction {
        TransactionAction::Checked {
            chain_id: CHAIN,
            hash: hash.to_string(),
            block_number,
        }
    }

    fn receipt(hash: &str, block_number: u64) -> TransactionReceipt {
        TransactionReceipt {
            from: Address::from_low_u64_be(0xaa),
            to: Some(Address::from_low_u64_be(2)),
            contract_address: None,
            transaction_index: 3,
            block_hash: H256::from_low_u64_be(block_number),
            transaction_hash: hash.to_string(),
            block_number,
            status: Some(1),
        }
    }

    fn safe_tx(safe_tx_hash: &str, transaction_hash: Option<&str>) -> SafeMultisigTransaction {
        SafeMultisigTransaction {
            safe: Address::from_low_u64_be(0x5afe),
            to: Address::from_low_u64_be(2),
            value: U256::zero(),
            data: None,
            nonce: 1,
            safe_tx_hash: safe_tx_hash.to_string(),
            transaction_hash: transaction_hash.map(str::to_string),
            submission_date: "2021-11-01T10:00:00Z".to_string(),
            execution_date: None,
            is_executed: transaction_hash.is_some(),
            is_successful: None,
            confirmations_required: Some(2),
            confirmations: vec![],
        }
    }

    #[test]
    fn test_add_ethereum_tx_sets_transaction_hash() {
        let clock = FixedClock::new(1_000);
        let mut state = TransactionState::new();

        let outcome = state.reduce(add("0xA", HashType::EthereumTx), &clock);

        assert_eq!(outcome, Outcome::Applied);
        let tx = state.get(CHAIN, "0xA").unwrap();
        assert_eq!(tx.transaction_hash.as_deref(), Some("0xA"));
        assert_eq!(tx.added_time, 1_000);
        assert!(tx.receipt.is_none());
        assert!(tx.approval.is_some());
    }

    #[test]
    fn test_add_safe_tx_leaves_transaction_hash_empty() {
        let clock = FixedClock::new(1_000);
        let mut state = TransactionState::new();

        state.reduce(add("0xsafe", HashType::GnosisSafeTx), &clock);

        assert!(state.get(CHAIN, "0xsafe").unwrap().transaction_hash.is_none());
    }

    #[test]
    fn test_duplicate_add_is_ignored_with_warning() {
        let clock = FixedClock::new(1_000);
        let mut state = TransactionState::new();
        state.reduce(add("0xA", HashType::EthereumTx), &clock);
        let before = state.clone();

        clock.advance(5_000);
        let outcome = state.reduce(add("0xA", HashType::GnosisSafeTx), &clock);

        assert_eq!(outcome.diagnostic().unwrap().severity(), Severity::Warn);
        assert_eq!(state, before);
    }

    #[test]
    fn test_clear_all_only_touches_one_chain() {
        let clock = FixedClock::new(0);
        let mut state = TransactionState::new();
        state.reduce(add("0xA", HashType::EthereumTx), &clock);
        let mut other = add("0xB", HashType::EthereumTx);
        if let TransactionAction::Add { chain_id, .. } = &mut other {
            *chain_id = ChainId::GNOSIS_CHAIN;
        }
        state.reduce(other, &clock);

        let outcome = state.reduce(TransactionAction::ClearAll { chain_id: CHAIN }, &clock);

        assert_eq!(outcome, Outcome::Applied);
        assert!(state.for_chain(CHAIN).unwrap().is_empty());
        assert!(state.get(ChainId::GNOSIS_CHAIN, "0xB").is_some());
        assert_eq!(
            state.reduce(TransactionAction::ClearAll { chain_id: ChainId(42) }, &clock),
            Outcome::Ignored
        );
    }

    #[test]
    fn test_checked_is_monotonic_for_any_arrival_order() {
        let clock = FixedClock::new(0);
        let blocks = [5u64, 3, 9, 9, 1, 12, 7, 0, 15, 14];

        for rotation in 0..blocks.len() {
            let mut state = TransactionState::new();
            state.reduce(add("0xA", HashType::EthereumTx), &clock);
            let mut previous = 0;

            for block in blocks.iter().cycle().skip(rotation).take(blocks.len()) {
                state.reduce(checked("0xA", *block), &clock);
                let current = state
                    .get(CHAIN, "0xA")
                    .unwrap()
                    .last_checked_block_number
                    .unwrap();
                assert!(current >= previous);
                assert!(current >= *block);
                previous = current;
            }
            assert_eq!(previous, 15);
        }
    }

    #[test]
    fn test_checked_unknown_transaction_is_silent() {
        let clock = FixedClock::new(0);
        let mut state = TransactionState::new();
        assert_eq!(state.reduce(checked("0xA", 10), &clock), Outcome::Ignored);
        assert_eq!(state, TransactionState::new());
    }

    #[test]
    fn test_finalize_sets_receipt_and_confirmed_time() {
        let clock = FixedClock::new(1_000);
        let mut state = TransactionState::new();
        state.reduce(add("0xA", HashType::EthereumTx), &clock);

        clock.set(2_000);
        let finalize = TransactionAction::Finalize {
            chain_id: CHAIN,
            hash: "0xA".to_string(),
            receipt: receipt("0xA", 100),
        };
        assert_eq!(state.reduce(finalize, &clock), Outcome::Applied);

        clock.set(3_000);
        let finalize_again = TransactionAction::Finalize {
            chain_id: CHAIN,
            hash: "0xA".to_string(),
            receipt: receipt("0xA", 101),
        };
        state.reduce(finalize_again, &clock);

        let tx = state.get(CHAIN, "0xA").unwrap();
        assert_eq!(tx.receipt.as_ref().unwrap().block_number, 101);
        assert_eq!(tx.confirmed_time, Some(3_000));
        assert!(state.pending(CHAIN).is_empty());
    }

    #[test]
    fn test_cancel_unknown_transaction_reports_error() {
        let clock = FixedClock::new(0);
        let state = TransactionState::new();

        let (next, outcome) = state.clone().reduced(
            TransactionAction::Cancel {
                chain_id: CHAIN,
                hash: "unknown".to_string(),
            },
            &clock,
        );

        assert_eq!(next, state);
        assert_eq!(outcome.diagnostic().unwrap().severity(), Severity::Error);
    }

    #[test]
    fn test_cancel_removes_transaction() {
        let clock = FixedClock::new(0);
        let mut state = TransactionState::new();
        state.reduce(add("0xA", HashType::EthereumTx), &clock);

        let outcome = state.reduce(
            TransactionAction::Cancel {
                chain_id: CHAIN,
                hash: "0xA".to_string(),
            },
            &clock,
        );

        assert_eq!(outcome, Outcome::Applied);
        assert!(state.get(CHAIN, "0xA").is_none());
    }

    #[test]
    fn test_replace_moves_record_to_new_hash() {
        let clock = FixedClock::new(1_000);
        let mut state = TransactionState::new();
        state.reduce(add("0xold", HashType::EthereumTx), &clock);
        state.reduce(checked("0xold", 50), &clock);

        clock.set(9_000);
        let outcome = state.reduce(
            TransactionAction::Replace {
                chain_id: CHAIN,
                old_hash: "0xold".to_string(),
                new_hash: "0xnew".to_string(),
            },
            &clock,
        );

        assert_eq!(outcome, Outcome::Applied);
        assert!(state.get(CHAIN, "0xold").is_none());
        let tx = state.get(CHAIN, "0xnew").unwrap();
        assert_eq!(tx.hash, "0xnew");
        assert_eq!(tx.transaction_hash.as_deref(), Some("0xnew"));
        assert_eq!(tx.added_time, 9_000);
        assert_eq!(tx.last_checked_block_number, Some(50));
        assert_eq!(tx.summary.as_deref(), Some("Approve WETH"));
    }

    #[test]
    fn test_replace_with_same_hash_keeps_record() {
        let clock = FixedClock::new(1_000);
        let mut state = TransactionState::new();
        state.reduce(add("0xA", HashType::EthereumTx), &clock);

        state.reduce(
            TransactionAction::Replace {
                chain_id: CHAIN,
                old_hash: "0xA".to_string(),
                new_hash: "0xA".to_string(),
            },
            &clock,
        );

        assert!(state.get(CHAIN, "0xA").is_some());
    }

    #[test]
    fn test_replace_unknown_transaction_reports_error() {
        let clock = FixedClock::new(0);
        let mut state = TransactionState::new();
        state.reduce(add("0xA", HashType::EthereumTx), &clock);
        let before = state.clone();

        let outcome = state.reduce(
            TransactionAction::Replace {
                chain_id: CHAIN,
                old_hash: "0xmissing".to_string(),
                new_hash: "0xnew".to_string(),
            },
            &clock,
        );

        assert!(matches!(
            outcome,
            Outcome::Rejected(Diagnostic::ReplaceUnknownTransaction { .. })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_update_safe_transaction() {
        let clock = FixedClock::new(0);
        let mut state = TransactionState::new();
        state.reduce(add("0xsafe", HashType::GnosisSafeTx), &clock);
        state.reduce(checked("0xsafe", 20), &clock);

        let outcome = state.reduce(
            TransactionAction::UpdateSafeTransaction {
                chain_id: CHAIN,
                safe_transaction: safe_tx("0xsafe", None),
                block_number: 10,
            },
            &clock,
        );
        assert_eq!(outcome, Outcome::Applied);
        let tx = state.get(CHAIN, "0xsafe").unwrap();
        assert_eq!(tx.last_checked_block_number, Some(20));
        assert!(tx.transaction_hash.is_none());
        assert!(tx.safe_transaction.is_some());

        state.reduce(
            TransactionAction::UpdateSafeTransaction {
                chain_id: CHAIN,
                safe_transaction: safe_tx("0xsafe", Some("0xmined")),
                block_number: 25,
            },
            &clock,
        );
        let tx = state.get(CHAIN, "0xsafe").unwrap();
        assert_eq!(tx.last_checked_block_number, Some(25));
        assert_eq!(tx.transaction_hash.as_deref(), Some("0xmined"));
        assert!(tx.safe_transaction.as_ref().unwrap().is_executed);
    }

    #[test]
    fn test_update_unknown_safe_transaction_warns() {
        let clock = FixedClock::new(0);
        let mut state = TransactionState::new();

        let outcome = state.reduce(
            TransactionAction::UpdateSafeTransaction {
                chain_id: CHAIN,
                safe_transaction: safe_tx("0xsafe", Some("0xmined")),
                block_number: 10,
            },
            &clock,
        );

        assert_eq!(outcome.diagnostic().unwrap().severity(), Severity::Warn);
        assert_eq!(state, TransactionState::new());
    }

    #[test]
    fn test_action_wire_format() {
        let json = r#"{
            "type": "checked",
            "chainId": 100,
            "hash": "0xA",
            "blockNumber": 77
        }"#;
        let action: TransactionAction = serde_json::from_str(json).unwrap();
        assert_eq!(action, checked_on(ChainId::GNOSIS_CHAIN, "0xA", 77));
        assert_eq!(action.chain_id(), ChainId::GNOSIS_CHAIN);
    }

    fn checked_on(chain_id: ChainId, hash: &str, block_number: u64) -> TransactionAction {
        TransactionAction::Checked {
            chain_id,
            hash: hash.to_string(),
            block_number,
        }
    }
}
