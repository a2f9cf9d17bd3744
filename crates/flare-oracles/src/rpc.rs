//! JSON-RPC `eth_call` client for Flare's C-chain.

use crate::abi;
use crate::error::{OracleError, Result};
use ethers_core::abi::{ParamType, Token};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

const GET_CONTRACT_BY_NAME: &str = "getContractAddressByName(string)";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Read-only EVM client.
#[derive(Debug)]
pub struct EvmRpc {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl EvmRpc {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Execute a view call against the latest block and return raw return data.
    #[instrument(skip(self, data))]
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [
                { "to": to, "data": format!("0x{}", hex::encode(data)) },
                "latest"
            ],
        });

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(OracleError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| OracleError::MalformedResponse("missing result".to_string()))?;
        let hex_body = result.strip_prefix("0x").unwrap_or(&result);
        let bytes = hex::decode(hex_body)
            .map_err(|e| OracleError::MalformedResponse(format!("result is not hex: {}", e)))?;

        debug!(bytes = bytes.len(), "eth_call returned");
        Ok(bytes)
    }

    /// Look up a contract address by name in the ContractRegistry.
    pub async fn resolve_contract(&self, registry: &str, name: &str) -> Result<String> {
        let data = abi::encode_call(GET_CONTRACT_BY_NAME, &[Token::String(name.to_string())]);
        let out = self.eth_call(registry, &data).await?;
        let [address] = abi::decode(&[ParamType::Address], &out)?;
        let address = abi::into_address(address)?;

        if address.is_zero() {
            return Err(OracleError::ContractNotFound(name.to_string()));
        }

        let address = format!("{:#x}", address);
        debug!(contract = name, %address, "resolved contract");
        Ok(address)
    }
}

/// A contract address resolved through the registry on first use.
#[derive(Debug)]
pub struct RegistryContract {
    registry: String,
    name: &'static str,
    address: OnceCell<String>,
}

impl RegistryContract {
    pub fn new(registry: impl Into<String>, name: &'static str) -> Self {
        Self {
            registry: registry.into(),
            name,
            address: OnceCell::new(),
        }
    }

    /// Failed lookups are not cached; the next call retries.
    pub async fn address(&self, rpc: &EvmRpc) -> Result<&str> {
        self.address
            .get_or_try_init(|| rpc.resolve_contract(&self.registry, self.name))
            .await
            .map(String::as_str)
    }
}
