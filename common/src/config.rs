// Chain id every mutating step is gated on
pub const EXPECTED_L3_CHAIN_ID: u64 = 33701;

pub const ARBITRUM_ONE_CHAIN_ID: u64 = 42161;
pub const ETHEREUM_MAINNET_CHAIN_ID: u64 = 1;
// Hardhat / anvil local L1
pub const LOCAL_L1_CHAIN_ID: u64 = 31337;

// Literals the deployed BunkerverseNFT reports from getContractInfo()
pub const EXPECTED_CONTRACT_NAME: &str = "Bunkerverse NFT";
pub const EXPECTED_CONTRACT_SYMBOL: &str = "BVNFT";
pub const EXPECTED_CONTRACT_VERSION: &str = "1.0.0";
pub const EXPECTED_CHAIN_NAME: &str = "Bunkerverse L3";

// Inclusion wait
pub const DEFAULT_INCLUSION_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

// Demonstration mint metadata
pub const DEMO_SINGLE_MINT_URI: &str = "ipfs://QmYourFirstNFTMetadataHash";
pub const DEMO_BATCH_MINT_URIS: [&str; 3] = [
    "ipfs://QmBatchNFT1MetadataHash",
    "ipfs://QmBatchNFT2MetadataHash",
    "ipfs://QmBatchNFT3MetadataHash",
];

pub const GWEI: u64 = 1_000_000_000;
