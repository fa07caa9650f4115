// File: common/src/client/rpc.rs
//
// Ethereum JSON-RPC implementation of `ChainClient`
//
// Signing is delegated to the node: transactions are submitted with
// `eth_sendTransaction` from one of the accounts returned by `eth_accounts`
// (Hardhat / anvil / Nitro dev nodes all expose unlocked dev accounts).

use async_trait::async_trait;
use log::{debug, trace, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::time::{sleep, Instant};

use super::{ChainClient, Deployment, TxOutcome};
use crate::{
    abi::{decode, decode_hex, encode_hex, u256_to_u64, ContractCall, Token},
    config::{DEFAULT_INCLUSION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, HTTP_REQUEST_TIMEOUT_SECS},
    error::ClientError,
    types::{format_address, Address, BlockSnapshot, LogEntry, TxHash, TxReceipt, H256, U256},
};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: U256,
    timestamp: U256,
    miner: Address,
    gas_limit: U256,
}

#[derive(Debug, Deserialize)]
struct RpcLog {
    address: Address,
    topics: Vec<H256>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    block_number: U256,
    gas_used: U256,
    #[serde(default)]
    status: Option<U256>,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

impl RpcReceipt {
    fn into_receipt(self) -> Result<TxReceipt, ClientError> {
        let logs = self
            .logs
            .into_iter()
            .map(|log| -> Result<LogEntry, ClientError> {
                Ok(LogEntry {
                    address: log.address,
                    topics: log.topics,
                    data: decode_hex(&log.data)?,
                })
            })
            .collect::<Result<Vec<_>, ClientError>>()?;

        Ok(TxReceipt {
            tx_hash: self.transaction_hash,
            block_number: u256_to_u64(self.block_number)?,
            gas_used: u256_to_u64(self.gas_used)?,
            // Pre-Byzantium receipts carry no status; treat them as success
            status: self.status.map_or(true, |s| !s.is_zero()),
            contract_address: self.contract_address,
            logs,
        })
    }
}

/// JSON-RPC chain client with a bounded inclusion wait
pub struct RpcChainClient {
    url: String,
    client: reqwest::Client,
    request_id: AtomicU64,
    inclusion_timeout: Duration,
    poll_interval: Duration,
}

impl RpcChainClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
            request_id: AtomicU64::new(1),
            inclusion_timeout: Duration::from_millis(DEFAULT_INCLUSION_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        })
    }

    pub fn with_inclusion_wait(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.inclusion_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<Option<T>, ClientError> {
        if log::log_enabled!(log::Level::Debug) {
            debug!("RPC request: {method} with params: {params}");
        }

        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method,
            params,
        };

        let response: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                method,
                reason: e.to_string(),
            })?;

        if let Some(error) = response.error {
            // Nodes report reverts as RPC errors on eth_call / gas estimation
            if error.message.contains("revert") {
                return Err(ClientError::Execution(error.message));
            }
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, ClientError> {
        self.call(method, params)
            .await?
            .ok_or(ClientError::InvalidResponse {
                method,
                reason: "missing result".to_owned(),
            })
    }

    async fn submit(&self, tx: Value) -> Result<TxHash, ClientError> {
        self.call_required("eth_sendTransaction", json!([tx])).await
    }

    // Poll for the receipt until it shows up or the inclusion bound elapses
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, ClientError> {
        let deadline = Instant::now() + self.inclusion_timeout;
        loop {
            let receipt: Option<RpcReceipt> = self
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(receipt) = receipt {
                return receipt.into_receipt().map(Some);
            }

            if Instant::now() >= deadline {
                warn!(
                    "Transaction {:#x} not included within {}ms",
                    tx_hash,
                    self.inclusion_timeout.as_millis()
                );
                return Ok(None);
            }

            trace!("Receipt for {:#x} not available yet", tx_hash);
            sleep(self.poll_interval).await;
        }
    }

    async fn submit_and_wait(&self, tx: Value) -> Result<TxOutcome, ClientError> {
        let tx_hash = self.submit(tx).await?;
        debug!("Submitted transaction {:#x}", tx_hash);

        Ok(match self.wait_for_receipt(tx_hash).await? {
            Some(receipt) => TxOutcome::included(receipt),
            None => TxOutcome::pending(tx_hash),
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        let id: U256 = self.call_required("eth_chainId", json!([])).await?;
        Ok(u256_to_u64(id)?)
    }

    async fn get_signer_identities(&self) -> Result<Vec<Address>, ClientError> {
        self.call_required("eth_accounts", json!([])).await
    }

    async fn get_balance(&self, address: &Address) -> Result<U256, ClientError> {
        self.call_required("eth_getBalance", json!([format_address(address), "latest"]))
            .await
    }

    async fn get_block_snapshot(&self) -> Result<BlockSnapshot, ClientError> {
        let (chain_id, block) = tokio::try_join!(
            self.chain_id(),
            self.call_required::<RpcBlock>("eth_getBlockByNumber", json!(["latest", false]))
        )?;

        Ok(BlockSnapshot {
            chain_id,
            block_number: u256_to_u64(block.number)?,
            timestamp: u256_to_u64(block.timestamp)?,
            coinbase: block.miner,
            gas_limit: u256_to_u64(block.gas_limit)?,
        })
    }

    async fn deploy_contract(
        &self,
        from: &Address,
        bytecode: &[u8],
        constructor_args: &[u8],
    ) -> Result<Deployment, ClientError> {
        let mut data = Vec::with_capacity(bytecode.len() + constructor_args.len());
        data.extend_from_slice(bytecode);
        data.extend_from_slice(constructor_args);

        let outcome = self
            .submit_and_wait(json!({
                "from": format_address(from),
                "data": encode_hex(&data),
            }))
            .await?;

        Ok(Deployment {
            address: outcome.receipt.as_ref().and_then(|r| r.contract_address),
            outcome,
        })
    }

    async fn send_transaction(
        &self,
        from: &Address,
        target: &Address,
        call: &ContractCall,
    ) -> Result<TxOutcome, ClientError> {
        debug!("Sending {} to {:#x}", call, target);
        self.submit_and_wait(json!({
            "from": format_address(from),
            "to": format_address(target),
            "data": encode_hex(&call.calldata()),
        }))
        .await
    }

    async fn read_state(
        &self,
        target: &Address,
        call: &ContractCall,
    ) -> Result<Vec<Token>, ClientError> {
        let result: String = self
            .call_required(
                "eth_call",
                json!([
                    {
                        "to": format_address(target),
                        "data": encode_hex(&call.calldata()),
                    },
                    "latest"
                ]),
            )
            .await?;

        let data = decode_hex(&result)?;
        if data.is_empty() && !call.returns.is_empty() {
            // eth_call against an address without code returns 0x
            return Err(ClientError::UnknownContract(*target));
        }

        Ok(decode(&call.returns, &data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_json_parsing() {
        let raw = json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x1b",
            "gasUsed": "0x5208",
            "status": "0x1",
            "contractAddress": null,
            "logs": [{
                "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
                "topics": ["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
                "data": "0x"
            }]
        });

        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        let receipt = receipt.into_receipt().unwrap();
        assert_eq!(receipt.block_number, 27);
        assert_eq!(receipt.gas_used, 21_000);
        assert!(receipt.status);
        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.logs.len(), 1);
        assert!(receipt.logs[0].data.is_empty());
    }

    #[test]
    fn test_receipt_reverted_status() {
        let raw = json!({
            "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "blockNumber": "0x2",
            "gasUsed": "0x7530",
            "status": "0x0",
            "logs": []
        });

        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        assert!(!receipt.into_receipt().unwrap().status);
    }

    #[test]
    fn test_block_json_parsing() {
        let raw = json!({
            "number": "0x10",
            "timestamp": "0x6553f100",
            "miner": "0xa4b000000000000000000073657175656e636572",
            "gasLimit": "0x4000000000000",
            "hash": "0x3333333333333333333333333333333333333333333333333333333333333333"
        });

        let block: RpcBlock = serde_json::from_value(raw).unwrap();
        assert_eq!(u256_to_u64(block.number).unwrap(), 16);
        assert_eq!(u256_to_u64(block.gas_limit).unwrap(), 0x4000000000000);
    }

    #[test]
    fn test_error_response_parsing() {
        let raw = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "execution reverted" }
        });

        let response: RpcResponse<String> = serde_json::from_value(raw).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32000);
    }

    // Same bound as `call`: any owned result type, Default or not
    fn parse_response<T: DeserializeOwned>(raw: Value) -> RpcResponse<T> {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_response_for_result_type_without_default() {
        let ok: RpcResponse<RpcBlock> = parse_response(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {
                "number": "0x2",
                "timestamp": "0x65",
                "miner": "0xa4b000000000000000000073657175656e636572",
                "gasLimit": "0x4000000000000"
            }
        }));
        assert!(ok.error.is_none());
        assert_eq!(u256_to_u64(ok.result.unwrap().number).unwrap(), 2);

        // Neither field present
        let empty: RpcResponse<RpcBlock> = parse_response(json!({ "jsonrpc": "2.0", "id": 4 }));
        assert!(empty.result.is_none());
        assert!(empty.error.is_none());
    }
}
