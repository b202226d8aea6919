use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a blockchain network tracked independently.
///
/// Any numeric chain id is accepted; [`SupportedChain`] covers the networks
/// the settlement contract is deployed on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const RINKEBY: ChainId = ChainId(4);
    pub const GOERLI: ChainId = ChainId(5);
    pub const GNOSIS_CHAIN: ChainId = ChainId(100);

    /// Returns the supported network for this id, if any
    pub fn supported(&self) -> Option<SupportedChain> {
        SupportedChain::from_u64(self.0)
    }

    /// Earliest block the settlement contract could have emitted events on
    /// this chain. Unknown chains start from block 0.
    pub fn deployment_block(&self) -> u64 {
        self.supported()
            .map(|chain| chain.deployment_block())
            .unwrap_or(0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Networks with a deployed settlement contract
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SupportedChain {
    Mainnet = 1,
    Rinkeby = 4,
    Goerli = 5,
    GnosisChain = 100,
}

impl SupportedChain {
    /// Returns chain name
    pub fn name(&self) -> &'static str {
        match self {
            SupportedChain::Mainnet => "Ethereum",
            SupportedChain::Rinkeby => "Rinkeby",
            SupportedChain::Goerli => "Goerli",
            SupportedChain::GnosisChain => "Gnosis Chain",
        }
    }

    /// Block the settlement contract was deployed at
    pub fn deployment_block(&self) -> u64 {
        match self {
            SupportedChain::Mainnet => 12_593_265,
            SupportedChain::Rinkeby => 8_727_415,
            SupportedChain::Goerli => 7_020_473,
            SupportedChain::GnosisChain => 16_465_100,
        }
    }

    /// Creates SupportedChain from u64
    pub fn from_u64(id: u64) -> Option<Self> {
        match id {
            1 => Some(SupportedChain::Mainnet),
            4 => Some(SupportedChain::Rinkeby),
            5 => Some(SupportedChain::Goerli),
            100 => Some(SupportedChain::GnosisChain),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_conversion() {
        assert_eq!(ChainId(1).supported(), Some(SupportedChain::Mainnet));
        assert_eq!(ChainId(100).supported(), Some(SupportedChain::GnosisChain));
        assert_eq!(ChainId(999).supported(), None);
        assert_eq!(ChainId::GOERLI.supported(), Some(SupportedChain::Goerli));
    }

    #[test]
    fn test_chain_properties() {
        assert_eq!(SupportedChain::Mainnet.name(), "Ethereum");
        assert_eq!(SupportedChain::GnosisChain.name(), "Gnosis Chain");
    }

    #[test]
    fn test_deployment_block_defaults_to_zero_for_unknown_chain() {
        assert_eq!(ChainId::MAINNET.deployment_block(), 12_593_265);
        assert_eq!(ChainId::GNOSIS_CHAIN.deployment_block(), 16_465_100);
        assert_eq!(ChainId(31337).deployment_block(), 0);
    }

    #[test]
    fn test_chain_id_as_json_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(ChainId(5), "goerli");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"5":"goerli"}"#);
        let back: std::collections::HashMap<ChainId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&ChainId::GOERLI).map(String::as_str), Some("goerli"));
    }
}
