use serde::{Deserialize, Serialize};
use ethers::types::Address;
use super::chains::ChainId;

/// Serializable token as stored alongside an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Token contract address
    pub address: Address,

    /// Chain where token exists
    pub chain_id: ChainId,

    /// Number of decimals
    pub decimals: u8,

    /// Token symbol (e.g., "USDC", "WETH")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// Token name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Token {
    /// Creates a new token
    pub fn new(address: Address, chain_id: ChainId, decimals: u8) -> Self {
        Self {
            address,
            chain_id,
            decimals,
            symbol: None,
            name: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}
