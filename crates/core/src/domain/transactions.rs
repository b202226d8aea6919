use serde::{Deserialize, Serialize};
use ethers::types::{Address, Bytes, H256, U256};

/// Transaction hash or provisional identifier (e.g. a Safe tx hash)
pub type TxHash = String;

/// What kind of identifier a tracked transaction is keyed by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashType {
    /// Regular on-chain transaction hash
    EthereumTx,
    /// Gnosis Safe coordination hash, the on-chain hash arrives later
    GnosisSafeTx,
}

/// Token approval performed by a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub token_address: Address,
    pub spender: Address,
}

/// Order presignature performed by a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Presign {
    pub order_id: String,
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub from: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    pub transaction_index: u64,
    pub block_hash: H256,
    pub transaction_hash: TxHash,
    pub block_number: u64,
    /// 1 on success, 0 on revert (absent before Byzantium)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
}

/// Multisig transaction as reported by the Safe transaction service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SafeMultisigTransaction {
    pub safe: Address,
    pub to: Address,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    pub nonce: u64,
    /// Identifier the transaction is tracked under before execution
    pub safe_tx_hash: TxHash,
    /// On-chain hash, known once the Safe executes the transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    pub submission_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_date: Option<String>,
    pub is_executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_successful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations_required: Option<u32>,
    #[serde(default)]
    pub confirmations: Vec<Address>,
}

/// Transaction tracked by the front end, with polling and operation metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedTransaction {
    /// Key the transaction is tracked under; not necessarily an on-chain hash
    pub hash: TxHash,
    pub hash_type: HashType,
    /// On-chain hash. Known immediately for EOAs, later for Safe wallets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,

    /// Submission time in milliseconds, drives the polling backoff
    pub added_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_block_number: Option<u64>,

    pub from: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<TransactionReceipt>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presign: Option<Presign>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_transaction: Option<SafeMultisigTransaction>,
}

impl EnhancedTransaction {
    /// Whether the transaction is still waiting to be mined
    pub fn is_pending(&self) -> bool {
        self.receipt.is_none()
    }

    /// Raises the last checked block, never lowering it
    pub fn record_checked_block(&mut self, block_number: u64) {
        self.last_checked_block_number = Some(match self.last_checked_block_number {
            Some(current) => current.max(block_number),
            None => block_number,
        });
    }
}
