use serde::{Deserialize, Serialize};
use ethers::types::{Address, U256};
use std::fmt;
use super::tokens::Token;
use super::transactions::SafeMultisigTransaction;

/// Order unique identifier (the order uid returned by the order book API)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        OrderId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        OrderId(id.to_string())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order execution type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Buy order (buy exact amount)
    Buy,
    /// Sell order (sell exact amount)
    Sell,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is open and waiting to be settled
    Pending,
    /// Order waits for an on-chain presignature before it is valid
    #[serde(rename = "presignaturePending")]
    PresignaturePending,
    /// Order has been settled
    Fulfilled,
    /// Order validity ran out
    Expired,
    /// Order has been cancelled
    Cancelled,
}

impl OrderStatus {
    /// Bucket an order with this status belongs in
    pub fn bucket(&self) -> OrderBucket {
        match self {
            OrderStatus::Pending => OrderBucket::Pending,
            OrderStatus::PresignaturePending => OrderBucket::PresignaturePending,
            OrderStatus::Fulfilled => OrderBucket::Fulfilled,
            OrderStatus::Expired => OrderBucket::Expired,
            OrderStatus::Cancelled => OrderBucket::Cancelled,
        }
    }
}

/// One of the mutually exclusive per-chain order partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderBucket {
    Pending,
    PresignaturePending,
    Fulfilled,
    Expired,
    Cancelled,
}

impl OrderBucket {
    /// Order in which buckets are searched when looking an id up
    pub const SEARCH_ORDER: [OrderBucket; 5] = [
        OrderBucket::Pending,
        OrderBucket::PresignaturePending,
        OrderBucket::Cancelled,
        OrderBucket::Fulfilled,
        OrderBucket::Expired,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OrderBucket::Pending => "pending",
            OrderBucket::PresignaturePending => "presignaturePending",
            OrderBucket::Fulfilled => "fulfilled",
            OrderBucket::Expired => "expired",
            OrderBucket::Cancelled => "cancelled",
        }
    }
}

/// Extra order data returned by the order book API once an order settles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiAdditionalInfo {
    pub creation_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_balance: Option<U256>,
    pub executed_buy_amount: U256,
    pub executed_sell_amount: U256,
    pub executed_fee_amount: U256,
    pub invalidated: bool,
    pub signing_scheme: String,
}

/// An exchange order as stored by the order tracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique order identifier
    pub id: OrderId,

    /// Order creator address
    pub owner: Address,

    /// Address receiving the bought tokens, the owner if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,

    /// Token to sell
    pub sell_token: Address,

    /// Token to buy
    pub buy_token: Address,

    /// Token metadata for the sell side. Orders saved before token metadata
    /// was kept with them have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token: Option<Token>,

    /// Token metadata for the buy side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_token: Option<Token>,

    /// Amount of sell token
    pub sell_amount: U256,

    /// Amount of buy token
    pub buy_amount: U256,

    /// Fee amount in sell token
    pub fee_amount: U256,

    /// Order validity timestamp (seconds)
    pub valid_to: u32,

    /// Order type
    pub kind: OrderKind,

    /// Partially fillable flag
    #[serde(default)]
    pub partially_fillable: bool,

    /// When the user placed the order
    pub creation_time: String,

    /// Human readable description shown in activity lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Order status
    pub status: OrderStatus,

    /// A cancellation has been requested but not observed yet
    #[serde(default)]
    pub is_cancelling: bool,

    /// Advisory: the order cannot currently be filled at its limit price
    #[serde(default)]
    pub is_unfillable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfilled_transaction_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_additional_info: Option<ApiAdditionalInfo>,

    /// Safe transaction carrying the presignature, for Safe-owned orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presign_gnosis_safe_tx: Option<SafeMultisigTransaction>,
}

/// Order record keyed by its id in a bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderObject {
    pub id: OrderId,
    pub order: Order,
}

impl OrderObject {
    pub fn new(order: Order) -> Self {
        Self {
            id: order.id.clone(),
            order,
        }
    }
}
