// File: harness/src/poc.rs
//
// Bunkerverse L3 proof-of-concept profile
//
// Static description of the target chain, printed by `validate-poc`.
// Nothing here talks to a chain.

use orbit_common::config::{
    ARBITRUM_ONE_CHAIN_ID, ETHEREUM_MAINNET_CHAIN_ID, EXPECTED_CHAIN_NAME, EXPECTED_L3_CHAIN_ID,
};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRef {
    pub name: &'static str,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTargets {
    pub min_tps: u64,
    pub block_time_ms: u64,
    /// Gas cost reduction compared to L1, in percent
    pub gas_reduction_percent: u8,
    pub settlement_to_l2_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PocProfile {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_gas_token: &'static str,
    pub parent_chain: ChainRef,
    pub settlement_chain: ChainRef,
    pub rpc_url: &'static str,
    pub ws_url: &'static str,
    pub performance: PerformanceTargets,
    pub settlement_path: [&'static str; 3],
}

impl PocProfile {
    pub fn bunkerverse() -> Self {
        Self {
            chain_id: EXPECTED_L3_CHAIN_ID,
            name: EXPECTED_CHAIN_NAME,
            native_gas_token: "NTC",
            parent_chain: ChainRef {
                name: "Arbitrum One",
                chain_id: ARBITRUM_ONE_CHAIN_ID,
            },
            settlement_chain: ChainRef {
                name: "Ethereum Mainnet",
                chain_id: ETHEREUM_MAINNET_CHAIN_ID,
            },
            rpc_url: "http://localhost:8549",
            ws_url: "ws://localhost:8550",
            performance: PerformanceTargets {
                min_tps: 2000,
                block_time_ms: 250,
                gas_reduction_percent: 95,
                settlement_to_l2_minutes: 10,
            },
            settlement_path: ["L3 (Bunkerverse)", "L2 (Arbitrum One)", "L1 (Ethereum)"],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PocProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} proof of concept", self.name)?;
        writeln!(f, "==========================================")?;
        writeln!(f, "Chain ID:          {}", self.chain_id)?;
        writeln!(f, "Native gas token:  {}", self.native_gas_token)?;
        writeln!(
            f,
            "Parent chain:      {} ({})",
            self.parent_chain.name, self.parent_chain.chain_id
        )?;
        writeln!(
            f,
            "Settlement chain:  {} ({})",
            self.settlement_chain.name, self.settlement_chain.chain_id
        )?;
        writeln!(f, "RPC endpoint:      {}", self.rpc_url)?;
        writeln!(f, "WebSocket:         {}", self.ws_url)?;
        writeln!(f)?;
        writeln!(f, "Performance targets")?;
        writeln!(f, "  Throughput:      {}+ TPS", self.performance.min_tps)?;
        writeln!(f, "  Block time:      {}ms", self.performance.block_time_ms)?;
        writeln!(
            f,
            "  Gas cost:        {}% lower than L1",
            self.performance.gas_reduction_percent
        )?;
        writeln!(
            f,
            "  Settlement:      ~{} min to L2",
            self.performance.settlement_to_l2_minutes
        )?;
        writeln!(f)?;
        write!(f, "Settlement path:   {}", self.settlement_path.join(" -> "))
    }
}
