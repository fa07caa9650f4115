// Network profiles of the three-tier topology: local L1, Arbitrum L2 and the
// Bunkerverse Orbit L3.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Error, Formatter};
use strum::{AsRefStr, EnumIter, IntoEnumIterator};

use crate::{
    config::{ARBITRUM_ONE_CHAIN_ID, EXPECTED_L3_CHAIN_ID, GWEI, LOCAL_L1_CHAIN_ID},
    types::ChainIdentity,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Network {
    Ethereum,
    ArbitrumL2,
    #[default]
    BunkerverseL3,
}

/// Tier in the settlement hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    L1,
    L2,
    L3,
}

/// Static connection and gas parameters of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkProfile {
    pub network: Network,
    pub layer: Layer,
    pub name: &'static str,
    pub chain_id: u64,
    pub rpc_url: &'static str,
    pub gas_price_wei: u64,
    // None lets the node pick
    pub gas_limit: Option<u64>,
}

impl Network {
    pub fn profile(&self) -> NetworkProfile {
        match self {
            Self::Ethereum => NetworkProfile {
                network: *self,
                layer: Layer::L1,
                name: "Ethereum (local)",
                chain_id: LOCAL_L1_CHAIN_ID,
                rpc_url: "http://localhost:8545",
                gas_price_wei: GWEI,
                gas_limit: Some(30_000_000),
            },
            Self::ArbitrumL2 => NetworkProfile {
                network: *self,
                layer: Layer::L2,
                name: "Arbitrum One",
                chain_id: ARBITRUM_ONE_CHAIN_ID,
                rpc_url: "http://localhost:8547",
                gas_price_wei: GWEI / 10,
                gas_limit: None,
            },
            Self::BunkerverseL3 => NetworkProfile {
                network: *self,
                layer: Layer::L3,
                name: "Bunkerverse L3",
                chain_id: EXPECTED_L3_CHAIN_ID,
                rpc_url: "http://localhost:8549",
                gas_price_wei: GWEI / 100,
                gas_limit: None,
            },
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::iter().find(|n| n.profile().chain_id == chain_id)
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.as_ref())
    }
}

impl NetworkProfile {
    pub fn identity(&self) -> ChainIdentity {
        ChainIdentity {
            chain_id: self.chain_id,
            name: self.name.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let l3 = Network::BunkerverseL3.profile();
        assert_eq!(l3.chain_id, 33701);
        assert_eq!(l3.layer, Layer::L3);
        assert_eq!(l3.gas_price_wei, 10_000_000);

        assert_eq!(Network::ArbitrumL2.profile().gas_price_wei, 100_000_000);
        assert_eq!(Network::Ethereum.profile().gas_limit, Some(30_000_000));
        assert_eq!(Network::default(), Network::BunkerverseL3);
    }

    #[test]
    fn test_from_chain_id() {
        assert_eq!(Network::from_chain_id(42161), Some(Network::ArbitrumL2));
        assert_eq!(Network::from_chain_id(31337), Some(Network::Ethereum));
        assert_eq!(Network::from_chain_id(5), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(Network::BunkerverseL3.to_string(), "bunkerverse-l3");
        assert_eq!(Network::ArbitrumL2.to_string(), "arbitrum-l2");
        let parsed: Network = serde_json::from_str("\"arbitrum-l2\"").unwrap();
        assert_eq!(parsed, Network::ArbitrumL2);
        assert_eq!(
            Network::BunkerverseL3.profile().identity().to_string(),
            "Bunkerverse L3 (Chain ID: 33701)"
        );
    }
}
