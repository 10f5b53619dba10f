//! Network client: balance queries, deployment submission and confirmation.

use std::{convert::Infallible, future::Future, time::Duration};

use alloy_consensus::TxLegacy;
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U64, U256};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    config::DeploymentConfig,
    rpc::{self, RpcError},
    signer::Signer,
};

/// Default bound on the confirmation wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Default safety margin applied to `eth_estimateGas`, in percent.
pub const DEFAULT_GAS_MARGIN_PERCENT: u64 = 120;

/// Errors raised by a [`ChainClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The endpoint could not be reached or answered nonsense.
    #[error(transparent)]
    Network(#[from] RpcError),

    /// The node refused the deployment transaction.
    #[error("deployment rejected: {reason}")]
    Rejected { reason: String },

    /// The transaction was sent but the node's answer was lost, so it may be in the mempool.
    #[error("deployment transaction {tx_hash} may have been broadcast: {source}")]
    Broadcast { tx_hash: B256, source: RpcError },

    /// The transaction was mined but execution failed.
    #[error("deployment transaction reverted")]
    Reverted { tx_hash: Option<B256> },

    /// No confirmation arrived within the configured bound.
    #[error("no confirmation after {}s", waited.as_secs())]
    ConfirmationTimeout {
        tx_hash: Option<B256>,
        waited: Duration,
    },
}

/// Address and balance of the deployer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountState {
    pub address: Address,
    /// Balance in the chain's smallest unit.
    pub balance: U256,
}

/// A contract creation about to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub contract_name: String,
    pub init_code: Bytes,
}

/// A submitted, not yet confirmed, deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    pub contract_name: String,
    /// Hash returned by the node, if any.
    pub tx_hash: Option<B256>,
    pub deployer: Address,
    pub nonce: u64,
}

impl PendingDeployment {
    /// The CREATE address the contract will land at.
    pub fn expected_address(&self) -> Address {
        self.deployer.create(self.nonce)
    }
}

/// A confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    pub contract_name: String,
    pub contract_address: Address,
    /// Some chains do not report it; success does not depend on it.
    pub transaction_hash: Option<B256>,
    pub deployer_address: Address,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

/// Operations the orchestrator needs from the chain.
pub trait ChainClient {
    /// Balance of `address` at the latest block.
    fn balance(&self, address: Address) -> impl Future<Output = Result<U256, ClientError>> + Send;

    /// Sign and submit a contract creation.
    fn send_deployment(
        &self,
        request: DeploymentRequest,
        signer: &Signer,
    ) -> impl Future<Output = Result<PendingDeployment, ClientError>> + Send;

    /// Wait until `pending` is mined.
    fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> impl Future<Output = Result<DeploymentResult, ClientError>> + Send;
}

/// Builds a [`ChainClient`] for a resolved configuration.
///
/// Building must not perform any network I/O.
pub trait Connector {
    type Client: ChainClient;

    fn connect(&self, config: &DeploymentConfig) -> Result<Self::Client, ClientError>;
}

/// Tunables of the JSON-RPC client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Timeout of each individual HTTP request.
    pub request_timeout: Duration,
    /// Upper bound on the confirmation wait.
    pub confirmation_timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// Fixed gas limit. Estimated when `None`.
    pub gas_limit: Option<u64>,
    /// Percentage applied to the gas estimate.
    pub gas_margin_percent: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: rpc::DEFAULT_REQUEST_TIMEOUT,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            gas_limit: None,
            gas_margin_percent: DEFAULT_GAS_MARGIN_PERCENT,
        }
    }
}

/// [`Connector`] producing [`RpcClient`]s.
#[derive(Debug, Clone, Default)]
pub struct RpcConnector {
    pub settings: ClientSettings,
}

impl RpcConnector {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

impl Connector for RpcConnector {
    type Client = RpcClient;

    fn connect(&self, config: &DeploymentConfig) -> Result<RpcClient, ClientError> {
        RpcClient::new(config.rpc_url.clone(), self.settings.clone())
    }
}

/// Receipt fields the deployer cares about.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    #[serde(default)]
    transaction_hash: Option<B256>,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    gas_used: Option<U64>,
}

/// JSON-RPC backed [`ChainClient`].
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Url,
    settings: ClientSettings,
}

impl RpcClient {
    pub fn new(url: Url, settings: ClientSettings) -> Result<Self, ClientError> {
        let http = rpc::create_client(settings.request_timeout).map_err(|source| {
            RpcError::Transport {
                method: "connect".to_string(),
                source,
            }
        })?;

        Ok(Self {
            http,
            url,
            settings,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, RpcError> {
        rpc::json_rpc_call(&self.http, self.url.as_str(), method, params).await
    }

    async fn gas_limit(&self, from: Address, init_code: &Bytes) -> Result<u64, ClientError> {
        if let Some(gas_limit) = self.settings.gas_limit {
            return Ok(gas_limit);
        }

        let estimate: U64 = self
            .call(
                "eth_estimateGas",
                vec![json!({ "from": from, "data": init_code })],
            )
            .await
            .map_err(rejected)?;
        let estimate = estimate.to::<u64>();
        let gas_limit = estimate.saturating_mul(self.settings.gas_margin_percent) / 100;

        tracing::debug!(estimate, gas_limit, "Gas estimated");
        Ok(gas_limit)
    }

    async fn wait_for_receipt(
        &self,
        pending: &PendingDeployment,
        tx_hash: B256,
    ) -> Result<DeploymentResult, ClientError> {
        let polled = rpc::poll_until(
            "deployment receipt",
            self.settings.confirmation_timeout,
            self.settings.poll_interval,
            || async move {
                match self
                    .call::<Option<TransactionReceipt>>(
                        "eth_getTransactionReceipt",
                        vec![json!(tx_hash)],
                    )
                    .await
                {
                    Ok(receipt) => Ok::<_, Infallible>(receipt),
                    Err(e) => {
                        // Poll errors never abort the wait, the confirmation timeout bounds it.
                        tracing::warn!(error = %e, tx_hash = %tx_hash, "Receipt poll failed");
                        Ok(None)
                    }
                }
            },
        )
        .await;

        let receipt = match polled {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(never)) => match never {},
            Err(timeout) => {
                return Err(ClientError::ConfirmationTimeout {
                    tx_hash: Some(tx_hash),
                    waited: timeout.waited,
                });
            }
        };

        let tx_hash = receipt.transaction_hash.unwrap_or(tx_hash);

        if receipt.status.is_some_and(|status| status.is_zero()) {
            return Err(ClientError::Reverted {
                tx_hash: Some(tx_hash),
            });
        }

        let contract_address = receipt.contract_address.unwrap_or_else(|| {
            tracing::debug!("Receipt has no contractAddress, deriving it from sender and nonce");
            pending.expected_address()
        });

        Ok(DeploymentResult {
            contract_name: pending.contract_name.clone(),
            contract_address,
            transaction_hash: Some(tx_hash),
            deployer_address: pending.deployer,
            block_number: receipt.block_number.map(|n| n.to::<u64>()),
            gas_used: receipt.gas_used.map(|n| n.to::<u64>()),
        })
    }

    /// Without a hash the only observable sign of success is code at the CREATE address.
    async fn wait_for_code(
        &self,
        pending: &PendingDeployment,
    ) -> Result<DeploymentResult, ClientError> {
        let address = pending.expected_address();

        let polled = rpc::poll_until(
            "deployed code",
            self.settings.confirmation_timeout,
            self.settings.poll_interval,
            || async move {
                match self
                    .call::<Bytes>("eth_getCode", vec![json!(address), json!("latest")])
                    .await
                {
                    Ok(code) => Ok::<_, Infallible>((!code.is_empty()).then_some(())),
                    Err(e) => {
                        tracing::warn!(error = %e, address = %address, "Code poll failed");
                        Ok(None)
                    }
                }
            },
        )
        .await;

        match polled {
            Ok(Ok(())) => Ok(DeploymentResult {
                contract_name: pending.contract_name.clone(),
                contract_address: address,
                transaction_hash: None,
                deployer_address: pending.deployer,
                block_number: None,
                gas_used: None,
            }),
            Ok(Err(never)) => match never {},
            Err(timeout) => Err(ClientError::ConfirmationTimeout {
                tx_hash: None,
                waited: timeout.waited,
            }),
        }
    }
}

impl ChainClient for RpcClient {
    async fn balance(&self, address: Address) -> Result<U256, ClientError> {
        let balance: U256 = self
            .call("eth_getBalance", vec![json!(address), json!("latest")])
            .await?;

        tracing::debug!(address = %address, balance = %balance, "Balance fetched");
        Ok(balance)
    }

    async fn send_deployment(
        &self,
        request: DeploymentRequest,
        signer: &Signer,
    ) -> Result<PendingDeployment, ClientError> {
        let deployer = signer.address();

        let nonce: U64 = self
            .call("eth_getTransactionCount", vec![json!(deployer), json!("pending")])
            .await?;
        let nonce = nonce.to::<u64>();
        let gas_price: U256 = self.call("eth_gasPrice", vec![]).await?;
        let gas_limit = self.gas_limit(deployer, &request.init_code).await?;

        let tx = TxLegacy {
            nonce,
            gas_price: gas_price.saturating_to::<u128>(),
            gas_limit,
            to: TxKind::Create,
            input: request.init_code,
            ..Default::default()
        };
        let signed = signer
            .sign_transaction(tx)
            .map_err(|e| ClientError::Rejected {
                reason: format!("failed to sign deployment transaction: {e}"),
            })?;
        let local_hash = signed.tx_hash;

        tracing::info!(
            contract = %request.contract_name,
            deployer = %deployer,
            nonce,
            gas_limit,
            gas_price = %gas_price,
            chain_id = signer.chain_id(),
            tx_hash = %local_hash,
            "Sending deployment transaction"
        );

        let returned: Option<B256> = self
            .call("eth_sendRawTransaction", vec![json!(signed.raw)])
            .await
            .map_err(|e| match e {
                RpcError::Response { message, .. } => ClientError::Rejected { reason: message },
                source => ClientError::Broadcast {
                    tx_hash: local_hash,
                    source,
                },
            })?;

        match returned {
            Some(hash) if hash != local_hash => tracing::warn!(
                returned = %hash,
                computed = %local_hash,
                "Node returned an unexpected transaction hash"
            ),
            Some(_) => {}
            None => tracing::warn!(
                computed = %local_hash,
                "Node returned no transaction hash, watching the contract address instead"
            ),
        }

        Ok(PendingDeployment {
            contract_name: request.contract_name,
            tx_hash: returned,
            deployer,
            nonce,
        })
    }

    async fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> Result<DeploymentResult, ClientError> {
        match pending.tx_hash {
            Some(tx_hash) => self.wait_for_receipt(&pending, tx_hash).await,
            None => self.wait_for_code(&pending).await,
        }
    }
}

/// Node-side error responses to a submission are rejections, not connectivity problems.
fn rejected(e: RpcError) -> ClientError {
    match e {
        RpcError::Response { message, .. } => ClientError::Rejected { reason: message },
        other => ClientError::Network(other),
    }
}
