// File: harness/src/simulator.rs
//
// In-process simulated Orbit L3 chain
//
// `SimulatedL3` implements `ChainClient` over an in-memory ERC721 contract
// so the workflow can run without a node. Calldata goes through the same ABI
// encoding as on a real chain. Every included transaction produces one block.
//
// Faults can be injected to exercise the failure paths:
// - revert the next transaction
// - drop the next transaction (never included)
// - stale ownerOf reads after a transfer

use async_trait::async_trait;
use log::{debug, trace};
use orbit_common::{
    abi::{decode, encode, selector, ContractCall, ParamType, Token},
    client::{ChainClient, Deployment, TxOutcome},
    config::{EXPECTED_CHAIN_NAME, EXPECTED_CONTRACT_NAME, EXPECTED_CONTRACT_SYMBOL,
        EXPECTED_CONTRACT_VERSION, EXPECTED_L3_CHAIN_ID, GWEI},
    contract::{
        ContractInfo, L3ChainView, TransferEvent, BATCH_MINT, GET_CONTRACT_INFO,
        GET_NEXT_TOKEN_ID, OWNER_OF, SAFE_MINT, TOKEN_URI, TOTAL_SUPPLY, TRANSFER_FROM,
        APPROVE, VALIDATE_L3_CHAIN,
    },
    error::ClientError,
    types::{keccak256, Address, BlockSnapshot, LogEntry, TxHash, TxReceipt, H256, U256},
};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::Mutex;

/// Placeholder init code accepted by the simulator
pub const DEMO_BYTECODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

// ArbOS sequencer address, reported as coinbase by Orbit chains
const SEQUENCER_COINBASE: [u8; 20] = [
    0xa4, 0xb0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x73, 0x65, 0x71, 0x75,
    0x65, 0x6e, 0x63, 0x65, 0x72,
];

// Arbitrum reports this as the block gas limit
const ORBIT_BLOCK_GAS_LIMIT: u64 = 0x4000000000000;

const TX_BASE_GAS: u64 = 21_000;
const CALLDATA_BYTE_GAS: u64 = 16;
const DEPLOY_GAS: u64 = 1_250_000;
const MINT_GAS: u64 = 50_000;
const BATCH_ITEM_GAS: u64 = 48_000;
const TRANSFER_GAS: u64 = 35_000;
const APPROVE_GAS: u64 = 24_000;

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub chain_id: u64,
    /// Chain id the contract itself observes; differs only to simulate a
    /// misconfigured endpoint
    pub contract_chain_id: Option<u64>,
    pub gas_limit: u64,
    pub block_interval_ms: u64,
    pub genesis_timestamp: u64,
    pub signer_count: usize,
    pub initial_balance: U256,
    pub gas_price_wei: u64,
    /// Tokens minted to the admin by the constructor
    pub preminted_supply: u64,
    pub name: String,
    pub symbol: String,
    pub version: String,
    pub chain_name: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            chain_id: EXPECTED_L3_CHAIN_ID,
            contract_chain_id: None,
            gas_limit: ORBIT_BLOCK_GAS_LIMIT,
            block_interval_ms: 250,
            genesis_timestamp: 1_700_000_000,
            signer_count: 3,
            initial_balance: U256::from(10_000u64) * U256::exp10(18),
            gas_price_wei: GWEI / 100,
            preminted_supply: 0,
            name: EXPECTED_CONTRACT_NAME.to_owned(),
            symbol: EXPECTED_CONTRACT_SYMBOL.to_owned(),
            version: EXPECTED_CONTRACT_VERSION.to_owned(),
            chain_name: EXPECTED_CHAIN_NAME.to_owned(),
        }
    }
}

impl SimulatorConfig {
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_preminted_supply(mut self, supply: u64) -> Self {
        self.preminted_supply = supply;
        self
    }
}

#[derive(Clone)]
struct NftContract {
    admin: Address,
    next_token_id: u64,
    total_supply: u64,
    owners: BTreeMap<u64, Address>,
    uris: HashMap<u64, String>,
    approvals: HashMap<u64, Address>,
    operators: HashSet<(Address, Address)>,
    // Owner before the last transfer, served while stale reads are enabled
    stale_owners: HashMap<u64, Address>,
}

impl NftContract {
    fn new(admin: Address) -> Self {
        Self {
            admin,
            next_token_id: 1,
            total_supply: 0,
            owners: BTreeMap::new(),
            uris: HashMap::new(),
            approvals: HashMap::new(),
            operators: HashSet::new(),
            stale_owners: HashMap::new(),
        }
    }

    fn mint(&mut self, to: Address, uri: String) -> Result<TransferEvent, String> {
        if to.is_zero() {
            return Err("ERC721InvalidReceiver(0x0)".to_owned());
        }

        let token_id = self.next_token_id;
        self.next_token_id += 1;
        self.total_supply += 1;
        self.owners.insert(token_id, to);
        self.uris.insert(token_id, uri);

        Ok(TransferEvent {
            from: Address::zero(),
            to,
            token_id,
        })
    }

    fn owner_of(&self, token_id: u64) -> Result<Address, String> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or_else(|| format!("ERC721NonexistentToken({token_id})"))
    }

    // Owner, approved address or operator of the owner
    fn is_authorized(&self, caller: &Address, owner: &Address, token_id: u64) -> bool {
        caller == owner
            || self.approvals.get(&token_id) == Some(caller)
            || self.operators.contains(&(*owner, *caller))
    }

    fn only_admin(&self, caller: &Address) -> Result<(), String> {
        if *caller != self.admin {
            return Err(format!("OwnableUnauthorizedAccount({caller:#x})"));
        }
        Ok(())
    }
}

struct ChainState {
    block_number: u64,
    tx_count: u64,
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, U256>,
    contracts: HashMap<Address, NftContract>,
}

/// Result of executing a call against contract state
struct Execution {
    gas_used: u64,
    logs: Vec<LogEntry>,
    status: bool,
}

pub struct SimulatedL3 {
    config: SimulatorConfig,
    signers: Vec<Address>,
    state: Mutex<ChainState>,
    mutating_calls: AtomicU64,
    revert_next: AtomicBool,
    drop_next: AtomicBool,
    stale_owner_reads: AtomicBool,
}

impl Default for SimulatedL3 {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl SimulatedL3 {
    pub fn new(config: SimulatorConfig) -> Self {
        let signers: Vec<Address> = (0..config.signer_count)
            .map(|i| {
                let hash = keccak256(format!("orbit-sim-signer-{i}").as_bytes());
                Address::from_slice(&hash[12..])
            })
            .collect();
        let balances = signers
            .iter()
            .map(|signer| (*signer, config.initial_balance))
            .collect();

        Self {
            signers,
            state: Mutex::new(ChainState {
                block_number: 0,
                tx_count: 0,
                nonces: HashMap::new(),
                balances,
                contracts: HashMap::new(),
            }),
            config,
            mutating_calls: AtomicU64::new(0),
            revert_next: AtomicBool::new(false),
            drop_next: AtomicBool::new(false),
            stale_owner_reads: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    /// Number of deploy / send calls received so far, whatever their result
    pub fn mutating_calls(&self) -> u64 {
        self.mutating_calls.load(Ordering::SeqCst)
    }

    /// The next transaction is included but reverts
    pub fn revert_next_transaction(&self) {
        self.revert_next.store(true, Ordering::SeqCst);
    }

    /// The next transaction is never included
    pub fn drop_next_inclusion(&self) {
        self.drop_next.store(true, Ordering::SeqCst);
    }

    /// ownerOf keeps returning the previous owner of transferred tokens
    pub fn set_stale_owner_reads(&self, enabled: bool) {
        self.stale_owner_reads.store(enabled, Ordering::SeqCst);
    }

    fn timestamp_at(&self, block_number: u64) -> u64 {
        self.config.genesis_timestamp + block_number * self.config.block_interval_ms / 1000
    }

    fn snapshot(&self, state: &ChainState) -> BlockSnapshot {
        BlockSnapshot {
            chain_id: self.config.chain_id,
            block_number: state.block_number,
            timestamp: self.timestamp_at(state.block_number),
            coinbase: Address::from(SEQUENCER_COINBASE),
            gas_limit: self.config.gas_limit,
        }
    }

    fn ensure_signer(&self, from: &Address) -> Result<(), ClientError> {
        if self.signers.contains(from) {
            Ok(())
        } else {
            Err(ClientError::Rpc {
                code: -32000,
                message: format!("unknown account {from:#x}"),
            })
        }
    }

    fn next_tx_hash(state: &mut ChainState, from: &Address, data: &[u8]) -> TxHash {
        state.tx_count += 1;
        let mut preimage = Vec::with_capacity(28 + data.len());
        preimage.extend_from_slice(from.as_bytes());
        preimage.extend_from_slice(&state.tx_count.to_be_bytes());
        preimage.extend_from_slice(data);
        H256::from(keccak256(&preimage))
    }

    // Include a transaction in a new block and charge its gas
    fn include(
        &self,
        state: &mut ChainState,
        tx_hash: TxHash,
        from: &Address,
        execution: Execution,
        contract_address: Option<Address>,
    ) -> TxReceipt {
        state.block_number += 1;
        *state.nonces.entry(*from).or_default() += 1;

        let fee = U256::from(execution.gas_used) * U256::from(self.config.gas_price_wei);
        let balance = state.balances.entry(*from).or_default();
        *balance = balance.saturating_sub(fee);

        trace!(
            "Block {}: tx {:#x} status {} gas {}",
            state.block_number,
            tx_hash,
            execution.status,
            execution.gas_used
        );

        TxReceipt {
            tx_hash,
            block_number: state.block_number,
            gas_used: execution.gas_used,
            status: execution.status,
            contract_address,
            logs: if execution.status {
                execution.logs
            } else {
                Vec::new()
            },
        }
    }

    fn execute(
        &self,
        contract: &mut NftContract,
        contract_address: Address,
        caller: &Address,
        calldata: &[u8],
    ) -> Result<Vec<LogEntry>, String> {
        let (selector, args) = split_calldata(calldata)?;
        let to_log = |event: TransferEvent| event.to_log(contract_address);

        if selector == selector_of(SAFE_MINT) {
            let mut args = decode_args(&[ParamType::Address, ParamType::String], args)?;
            let uri = take(&mut args)?.into_string().map_err(|e| e.to_string())?;
            let to = take(&mut args)?.into_address().map_err(|e| e.to_string())?;
            contract.only_admin(caller)?;
            Ok(vec![to_log(contract.mint(to, uri)?)])
        } else if selector == selector_of(BATCH_MINT) {
            let types = [
                ParamType::Array(Box::new(ParamType::Address)),
                ParamType::Array(Box::new(ParamType::String)),
            ];
            let mut args = decode_args(&types, args)?;
            let uris = take(&mut args)?.into_array().map_err(|e| e.to_string())?;
            let recipients = take(&mut args)?.into_array().map_err(|e| e.to_string())?;
            contract.only_admin(caller)?;
            if recipients.len() != uris.len() {
                return Err("Arrays length mismatch".to_owned());
            }
            if recipients.is_empty() {
                return Err("Empty batch".to_owned());
            }

            let mut logs = Vec::with_capacity(recipients.len());
            for (to, uri) in recipients.into_iter().zip(uris) {
                let to = to.into_address().map_err(|e| e.to_string())?;
                let uri = uri.into_string().map_err(|e| e.to_string())?;
                logs.push(to_log(contract.mint(to, uri)?));
            }
            Ok(logs)
        } else if selector == selector_of(TRANSFER_FROM) {
            let types = [ParamType::Address, ParamType::Address, ParamType::Uint];
            let mut args = decode_args(&types, args)?;
            let token_id = take(&mut args)?.into_u64().map_err(|e| e.to_string())?;
            let to = take(&mut args)?.into_address().map_err(|e| e.to_string())?;
            let from = take(&mut args)?.into_address().map_err(|e| e.to_string())?;

            let owner = contract.owner_of(token_id)?;
            if owner != from {
                return Err(format!(
                    "ERC721IncorrectOwner({from:#x}, {token_id}, {owner:#x})"
                ));
            }
            if !contract.is_authorized(caller, &owner, token_id) {
                return Err(format!(
                    "ERC721InsufficientApproval({caller:#x}, {token_id})"
                ));
            }
            if to.is_zero() {
                return Err("ERC721InvalidReceiver(0x0)".to_owned());
            }

            contract.approvals.remove(&token_id);
            if self.stale_owner_reads.load(Ordering::SeqCst) {
                contract.stale_owners.entry(token_id).or_insert(from);
            }
            contract.owners.insert(token_id, to);
            Ok(vec![to_log(TransferEvent { from, to, token_id })])
        } else if selector == selector_of(APPROVE) {
            let mut args = decode_args(&[ParamType::Address, ParamType::Uint], args)?;
            let token_id = take(&mut args)?.into_u64().map_err(|e| e.to_string())?;
            let spender = take(&mut args)?.into_address().map_err(|e| e.to_string())?;

            let owner = contract.owner_of(token_id)?;
            if *caller != owner && !contract.operators.contains(&(owner, *caller)) {
                return Err(format!("ERC721InvalidApprover({caller:#x})"));
            }
            contract.approvals.insert(token_id, spender);
            Ok(Vec::new())
        } else {
            Err(format!("unknown function selector 0x{}", hex_selector(&selector)))
        }
    }

    fn query(
        &self,
        state: &ChainState,
        contract: &NftContract,
        calldata: &[u8],
    ) -> Result<Vec<Token>, String> {
        let (selector, args) = split_calldata(calldata)?;

        if selector == selector_of(TOTAL_SUPPLY) {
            Ok(vec![Token::Uint(U256::from(contract.total_supply))])
        } else if selector == selector_of(GET_NEXT_TOKEN_ID) {
            Ok(vec![Token::Uint(U256::from(contract.next_token_id))])
        } else if selector == selector_of(OWNER_OF) {
            let mut args = decode_args(&[ParamType::Uint], args)?;
            let token_id = take(&mut args)?.into_u64().map_err(|e| e.to_string())?;
            let stale = self
                .stale_owner_reads
                .load(Ordering::SeqCst)
                .then(|| contract.stale_owners.get(&token_id).copied())
                .flatten();
            let owner = match stale {
                Some(owner) => owner,
                None => contract.owner_of(token_id)?,
            };
            Ok(vec![Token::Address(owner)])
        } else if selector == selector_of(TOKEN_URI) {
            let mut args = decode_args(&[ParamType::Uint], args)?;
            let token_id = take(&mut args)?.into_u64().map_err(|e| e.to_string())?;
            contract.owner_of(token_id)?;
            let uri = contract.uris.get(&token_id).cloned().unwrap_or_default();
            Ok(vec![Token::String(uri)])
        } else if selector == selector_of(GET_CONTRACT_INFO) {
            Ok(ContractInfo {
                name: self.config.name.clone(),
                symbol: self.config.symbol.clone(),
                total_supply: contract.total_supply,
                version: self.config.version.clone(),
                chain_name: self.config.chain_name.clone(),
                chain_id: self.contract_chain_id(),
            }
            .into_tokens())
        } else if selector == selector_of(VALIDATE_L3_CHAIN) {
            let mut view = L3ChainView::from_snapshot(&self.snapshot(state));
            view.chain_id = self.contract_chain_id();
            Ok(view.into_tokens())
        } else {
            Err(format!("unknown function selector 0x{}", hex_selector(&selector)))
        }
    }

    fn contract_chain_id(&self) -> u64 {
        self.config.contract_chain_id.unwrap_or(self.config.chain_id)
    }
}

fn selector_of(signature: &str) -> [u8; 4] {
    selector(signature)
}

fn hex_selector(selector: &[u8; 4]) -> String {
    selector.iter().map(|b| format!("{b:02x}")).collect()
}

fn split_calldata(calldata: &[u8]) -> Result<([u8; 4], &[u8]), String> {
    if calldata.len() < 4 {
        return Err("calldata shorter than a selector".to_owned());
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&calldata[..4]);
    Ok((selector, &calldata[4..]))
}

fn decode_args(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, String> {
    decode(types, data).map_err(|e| format!("invalid calldata: {e}"))
}

// Arguments are popped from the end
fn take(args: &mut Vec<Token>) -> Result<Token, String> {
    args.pop().ok_or_else(|| "missing argument".to_owned())
}

fn execution_gas(calldata: &[u8], base: u64) -> u64 {
    TX_BASE_GAS + CALLDATA_BYTE_GAS * calldata.len() as u64 + base
}

#[async_trait]
impl ChainClient for SimulatedL3 {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(self.config.chain_id)
    }

    async fn get_signer_identities(&self) -> Result<Vec<Address>, ClientError> {
        Ok(self.signers.clone())
    }

    async fn get_balance(&self, address: &Address) -> Result<U256, ClientError> {
        let state = self.state.lock().await;
        Ok(state.balances.get(address).copied().unwrap_or_default())
    }

    async fn get_block_snapshot(&self) -> Result<BlockSnapshot, ClientError> {
        let state = self.state.lock().await;
        Ok(self.snapshot(&state))
    }

    async fn deploy_contract(
        &self,
        from: &Address,
        bytecode: &[u8],
        constructor_args: &[u8],
    ) -> Result<Deployment, ClientError> {
        self.mutating_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_signer(from)?;
        if bytecode.is_empty() {
            return Err(ClientError::Execution("empty init code".to_owned()));
        }

        let mut state = self.state.lock().await;
        let mut data = bytecode.to_vec();
        data.extend_from_slice(constructor_args);
        let tx_hash = Self::next_tx_hash(&mut state, from, &data);

        if self.drop_next.swap(false, Ordering::SeqCst) {
            debug!("Dropping deployment {:#x}", tx_hash);
            return Ok(Deployment {
                address: None,
                outcome: TxOutcome::pending(tx_hash),
            });
        }

        let nonce = state.nonces.get(from).copied().unwrap_or_default();
        let mut preimage = from.as_bytes().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let address = Address::from_slice(&keccak256(&preimage)[12..]);

        let admin = decode(&[ParamType::Address], constructor_args)
            .ok()
            .and_then(|mut tokens| tokens.pop())
            .and_then(|token| token.into_address().ok());

        let gas_used = execution_gas(&data, DEPLOY_GAS);
        let reverted = self.revert_next.swap(false, Ordering::SeqCst);
        let (execution, contract_address) = match admin {
            Some(admin) if !reverted => {
                let mut contract = NftContract::new(admin);
                let mut logs = Vec::new();
                for i in 0..self.config.preminted_supply {
                    let event = contract
                        .mint(admin, format!("ipfs://premint/{}", i + 1))
                        .map_err(ClientError::Execution)?;
                    logs.push(event.to_log(address));
                }
                state.contracts.insert(address, contract);
                (
                    Execution {
                        gas_used,
                        logs,
                        status: true,
                    },
                    Some(address),
                )
            }
            _ => (
                Execution {
                    gas_used,
                    logs: Vec::new(),
                    status: false,
                },
                None,
            ),
        };

        let receipt = self.include(&mut state, tx_hash, from, execution, contract_address);
        Ok(Deployment {
            address: receipt.contract_address,
            outcome: TxOutcome::included(receipt),
        })
    }

    async fn send_transaction(
        &self,
        from: &Address,
        target: &Address,
        call: &ContractCall,
    ) -> Result<TxOutcome, ClientError> {
        self.mutating_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_signer(from)?;

        let calldata = call.calldata();
        let mut state = self.state.lock().await;
        if !state.contracts.contains_key(target) {
            return Err(ClientError::UnknownContract(*target));
        }
        let tx_hash = Self::next_tx_hash(&mut state, from, &calldata);

        if self.drop_next.swap(false, Ordering::SeqCst) {
            debug!("Dropping transaction {:#x} ({})", tx_hash, call.name());
            return Ok(TxOutcome::pending(tx_hash));
        }

        let base_gas = match call.signature {
            SAFE_MINT => MINT_GAS,
            BATCH_MINT => match call.args.first() {
                Some(Token::Array(items)) => BATCH_ITEM_GAS * items.len() as u64,
                _ => BATCH_ITEM_GAS,
            },
            TRANSFER_FROM => TRANSFER_GAS,
            _ => APPROVE_GAS,
        };
        let gas_used = execution_gas(&calldata, base_gas);

        let execution = if self.revert_next.swap(false, Ordering::SeqCst) {
            debug!("Reverting {} on request", call.name());
            Execution {
                gas_used,
                logs: Vec::new(),
                status: false,
            }
        } else {
            let contract = state
                .contracts
                .get_mut(target)
                .ok_or(ClientError::UnknownContract(*target))?;
            // A revert leaves no partial writes behind
            let mut staged = contract.clone();
            match self.execute(&mut staged, *target, from, &calldata) {
                Ok(logs) => {
                    *contract = staged;
                    Execution {
                        gas_used,
                        logs,
                        status: true,
                    }
                }
                Err(reason) => {
                    debug!("{} reverted: {}", call.name(), reason);
                    Execution {
                        gas_used,
                        logs: Vec::new(),
                        status: false,
                    }
                }
            }
        };

        let receipt = self.include(&mut state, tx_hash, from, execution, None);
        Ok(TxOutcome::included(receipt))
    }

    async fn read_state(
        &self,
        target: &Address,
        call: &ContractCall,
    ) -> Result<Vec<Token>, ClientError> {
        let state = self.state.lock().await;
        let contract = state
            .contracts
            .get(target)
            .ok_or(ClientError::UnknownContract(*target))?;

        let tokens = self
            .query(&state, contract, &call.calldata())
            .map_err(|reason| ClientError::Execution(format!("execution reverted: {reason}")))?;

        // Round-trip through the ABI like eth_call results do
        Ok(decode(&call.returns, &encode(&tokens))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_common::contract::{encode_constructor_args, NftCall};

    async fn deployed(sim: &SimulatedL3) -> (Address, Address) {
        let admin = sim.signers()[0];
        let deployment = sim
            .deploy_contract(&admin, DEMO_BYTECODE, &encode_constructor_args(admin))
            .await
            .unwrap();
        (deployment.created_address().unwrap(), admin)
    }

    #[tokio::test]
    async fn test_deploy_produces_block_and_distinct_addresses() {
        let sim = SimulatedL3::default();
        let (first, _) = deployed(&sim).await;
        let (second, _) = deployed(&sim).await;

        assert_ne!(first, second);
        assert!(!first.is_zero());
        assert_eq!(sim.get_block_snapshot().await.unwrap().block_number, 2);
        assert_eq!(sim.mutating_calls(), 2);
    }

    #[tokio::test]
    async fn test_mint_and_read_back() {
        let sim = SimulatedL3::default();
        let (contract, admin) = deployed(&sim).await;
        let user = sim.signers()[1];

        let outcome = sim
            .send_transaction(&admin, &contract, &NftCall::safe_mint(user, "ipfs://one"))
            .await
            .unwrap();
        assert!(outcome.succeeded());
        let events = TransferEvent::collect(outcome.receipt.as_ref().unwrap(), &contract).unwrap();
        assert_eq!(events[0].token_id, 1);

        let owner = sim.read_state(&contract, &NftCall::owner_of(1)).await.unwrap();
        assert_eq!(owner, vec![Token::Address(user)]);
        let uri = sim.read_state(&contract, &NftCall::token_uri(1)).await.unwrap();
        assert_eq!(uri, vec![Token::String("ipfs://one".to_string())]);
    }

    #[tokio::test]
    async fn test_only_admin_can_mint() {
        let sim = SimulatedL3::default();
        let (contract, _) = deployed(&sim).await;
        let user = sim.signers()[1];

        let outcome = sim
            .send_transaction(&user, &contract, &NftCall::safe_mint(user, "ipfs://x"))
            .await
            .unwrap();
        assert!(outcome.confirmed);
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_reads_of_missing_token_revert() {
        let sim = SimulatedL3::default();
        let (contract, _) = deployed(&sim).await;

        let err = sim
            .read_state(&contract, &NftCall::owner_of(42))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Execution(_)));
    }

    #[tokio::test]
    async fn test_faults() {
        let sim = SimulatedL3::default();
        let (contract, admin) = deployed(&sim).await;

        sim.drop_next_inclusion();
        let dropped = sim
            .send_transaction(&admin, &contract, &NftCall::safe_mint(admin, "ipfs://x"))
            .await
            .unwrap();
        assert!(!dropped.confirmed);

        sim.revert_next_transaction();
        let reverted = sim
            .send_transaction(&admin, &contract, &NftCall::safe_mint(admin, "ipfs://x"))
            .await
            .unwrap();
        assert!(reverted.confirmed);
        assert!(!reverted.succeeded());

        // Neither attempt minted anything
        let supply = sim
            .read_state(&contract, &NftCall::total_supply())
            .await
            .unwrap();
        assert_eq!(supply, vec![Token::Uint(U256::zero())]);
    }

    #[tokio::test]
    async fn test_preminted_supply() {
        let sim = SimulatedL3::new(SimulatorConfig::default().with_preminted_supply(5));
        let (contract, _) = deployed(&sim).await;

        let next = sim
            .read_state(&contract, &NftCall::get_next_token_id())
            .await
            .unwrap();
        assert_eq!(next, vec![Token::Uint(U256::from(6u64))]);
    }

    #[tokio::test]
    async fn test_gas_is_charged() {
        let sim = SimulatedL3::default();
        let admin = sim.signers()[0];
        let before = sim.get_balance(&admin).await.unwrap();
        deployed(&sim).await;
        assert!(sim.get_balance(&admin).await.unwrap() < before);
    }

    #[tokio::test]
    async fn test_reverted_batch_leaves_no_tokens() {
        let sim = SimulatedL3::default();
        let (contract, admin) = deployed(&sim).await;
        let (user1, user2) = (sim.signers()[1], sim.signers()[2]);

        let uris: Vec<String> = ["ipfs://a", "ipfs://b", "ipfs://c"]
            .iter()
            .map(|u| u.to_string())
            .collect();
        let outcome = sim
            .send_transaction(
                &admin,
                &contract,
                &NftCall::batch_mint(&[user1, Address::zero(), user2], &uris),
            )
            .await
            .unwrap();
        assert!(outcome.confirmed);
        assert!(!outcome.succeeded());

        let supply = sim
            .read_state(&contract, &NftCall::total_supply())
            .await
            .unwrap();
        assert_eq!(supply, vec![Token::Uint(U256::zero())]);
        assert!(sim
            .read_state(&contract, &NftCall::owner_of(1))
            .await
            .is_err());
        let next = sim
            .read_state(&contract, &NftCall::get_next_token_id())
            .await
            .unwrap();
        assert_eq!(next, vec![Token::Uint(U256::one())]);

        // The next successful mint still starts at id 1
        let minted = sim
            .send_transaction(&admin, &contract, &NftCall::safe_mint(user1, "ipfs://one"))
            .await
            .unwrap();
        let events = TransferEvent::collect(minted.receipt.as_ref().unwrap(), &contract).unwrap();
        assert_eq!(events[0].token_id, 1);
    }
}
