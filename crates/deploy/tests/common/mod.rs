//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy_core::primitives::{Address, B256, U256};
use serde_json::{Value, json};
use skillbridge_deploy::{
    ArtifactError, ArtifactFile, ArtifactSource, ChainClient, ClientError, Connector,
    ContractArtifact, DeploymentConfig, DeploymentRequest, DeploymentResult, PendingDeployment,
    Signer, rpc::RpcError,
};
use tempdir::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use url::Url;

/// First default Hardhat/Anvil account.
pub const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const ABI: &str = r#"[{"inputs":[],"stateMutability":"nonpayable","type":"constructor"},{"inputs":[],"name":"jobCount","outputs":[{"internalType":"uint256","name":"","type":"uint256"}],"stateMutability":"view","type":"function"}]"#;
pub const BYTECODE: &str = "0x6080604052348015600f57600080fd5b50603f80601d6000396000f3fe";

pub fn dev_address() -> Address {
    DEV_ADDRESS.parse().unwrap()
}

pub fn one_hbar() -> U256 {
    U256::from(10u128.pow(18))
}

/// A configuration source from key/value pairs.
pub fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn valid_env(rpc_url: &str) -> HashMap<String, String> {
    env(&[("HEDERA_RPC_URL", rpc_url), ("HEDERA_PRIVATE_KEY", DEV_KEY)])
}

/// Write `body` at the conventional artifact location inside `dir`.
pub fn write_artifact(dir: &Path, body: &str) -> ArtifactFile {
    let file = ArtifactFile::for_contract(dir, "SkillBridge");
    std::fs::create_dir_all(file.path().parent().unwrap()).unwrap();
    std::fs::write(file.path(), body).unwrap();
    file
}

pub fn valid_artifact(dir: &TempDir) -> ArtifactFile {
    write_artifact(
        dir.path(),
        &format!(r#"{{"contractName":"SkillBridge","abi":{ABI},"bytecode":"{BYTECODE}"}}"#),
    )
}

/// [`ArtifactSource`] that counts loads.
#[derive(Debug, Clone)]
pub struct CountingArtifacts {
    pub inner: ArtifactFile,
    pub loads: Arc<AtomicUsize>,
}

impl CountingArtifacts {
    pub fn new(inner: ArtifactFile) -> Self {
        Self {
            inner,
            loads: Arc::default(),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ArtifactSource for CountingArtifacts {
    fn location(&self) -> &Path {
        self.inner.location()
    }

    fn load(&self) -> Result<ContractArtifact, ArtifactError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load()
    }
}

/// Scripted failure of a [`MockChain`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unreachable,
    Rejected(&'static str),
    Reverted,
    Timeout,
}

impl MockFailure {
    fn into_error(self, tx_hash: Option<B256>) -> ClientError {
        match self {
            MockFailure::Unreachable => ClientError::Network(RpcError::Decode {
                method: "eth_getBalance".to_string(),
                reason: "connection refused".to_string(),
            }),
            MockFailure::Rejected(reason) => ClientError::Rejected {
                reason: reason.to_string(),
            },
            MockFailure::Reverted => ClientError::Reverted { tx_hash },
            MockFailure::Timeout => ClientError::ConfirmationTimeout {
                tx_hash,
                waited: Duration::from_secs(120),
            },
        }
    }
}

/// Every call that reached the mocked chain.
#[derive(Debug, Default)]
pub struct Calls {
    pub connects: AtomicUsize,
    pub balances: AtomicUsize,
    pub submissions: AtomicUsize,
    pub confirmations: AtomicUsize,
}

impl Calls {
    /// Calls that would have touched the network.
    pub fn network(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
            + self.balances.load(Ordering::SeqCst)
            + self.submissions.load(Ordering::SeqCst)
            + self.confirmations.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

/// In-memory chain acting as both [`Connector`] and [`ChainClient`].
#[derive(Debug, Clone)]
pub struct MockChain {
    pub balance: U256,
    pub tx_hash: Option<B256>,
    pub fail_balance: Option<MockFailure>,
    pub fail_submit: Option<MockFailure>,
    pub fail_confirm: Option<MockFailure>,
    pub calls: Arc<Calls>,
    /// Chain id of every configuration the connector saw.
    pub chain_ids: Arc<Mutex<Vec<u64>>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            balance: one_hbar(),
            tx_hash: Some(B256::repeat_byte(0x42)),
            fail_balance: None,
            fail_submit: None,
            fail_confirm: None,
            calls: Arc::default(),
            chain_ids: Arc::default(),
        }
    }
}

impl Connector for MockChain {
    type Client = MockChain;

    fn connect(&self, config: &DeploymentConfig) -> Result<MockChain, ClientError> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        self.chain_ids.lock().unwrap().push(config.chain_id());
        Ok(self.clone())
    }
}

impl ChainClient for MockChain {
    async fn balance(&self, _address: Address) -> Result<U256, ClientError> {
        self.calls.balances.fetch_add(1, Ordering::SeqCst);
        match self.fail_balance {
            Some(failure) => Err(failure.into_error(None)),
            None => Ok(self.balance),
        }
    }

    async fn send_deployment(
        &self,
        request: DeploymentRequest,
        signer: &Signer,
    ) -> Result<PendingDeployment, ClientError> {
        self.calls.submissions.fetch_add(1, Ordering::SeqCst);
        assert!(!request.init_code.is_empty());
        match self.fail_submit {
            Some(failure) => Err(failure.into_error(None)),
            None => Ok(PendingDeployment {
                contract_name: request.contract_name,
                tx_hash: self.tx_hash,
                deployer: signer.address(),
                nonce: 0,
            }),
        }
    }

    async fn await_confirmation(
        &self,
        pending: PendingDeployment,
    ) -> Result<DeploymentResult, ClientError> {
        self.calls.confirmations.fetch_add(1, Ordering::SeqCst);
        match self.fail_confirm {
            Some(failure) => Err(failure.into_error(pending.tx_hash)),
            None => Ok(DeploymentResult {
                contract_address: pending.expected_address(),
                contract_name: pending.contract_name,
                transaction_hash: pending.tx_hash,
                deployer_address: pending.deployer,
                block_number: Some(1),
                gas_used: Some(90_000),
            }),
        }
    }
}

/// JSON-RPC error returned by a stub handler.
#[derive(Debug, Clone)]
pub struct StubError {
    pub code: i64,
    pub message: String,
    /// Close the connection without answering at all.
    pub hang_up: bool,
}

impl StubError {
    pub fn new(message: &str) -> Self {
        Self {
            code: -32000,
            message: message.to_string(),
            hang_up: false,
        }
    }

    /// The request is read, then the connection drops before any response.
    pub fn hang_up() -> Self {
        Self {
            hang_up: true,
            ..Self::new("connection dropped")
        }
    }
}

/// A minimal HTTP JSON-RPC server answering one request per connection.
pub struct RpcStub {
    pub url: Url,
    pub methods: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl RpcStub {
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, StubError> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let methods: Arc<Mutex<Vec<String>>> = Arc::default();
        let handler = Arc::new(handler);

        let seen = methods.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, handler.as_ref(), &seen).await;
                });
            }
        });

        Self {
            url,
            methods,
            handle,
        }
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }
}

impl Drop for RpcStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve<F>(
    mut stream: TcpStream,
    handler: &F,
    seen: &Mutex<Vec<String>>,
) -> std::io::Result<()>
where
    F: Fn(&str, &Value) -> Result<Value, StubError>,
{
    let body = read_body(&mut stream).await?;
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();
    seen.lock().unwrap().push(method.clone());

    let response = match handler(&method, &params) {
        Err(error) if error.hang_up => return Ok(()),
        Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
        Err(error) => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": error.code, "message": error.message }
        }),
    }
    .to_string();

    let http = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
        response.len()
    );
    stream.write_all(http.as_bytes()).await?;
    stream.shutdown().await
}

async fn read_body(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Vec::new());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = buf.len().min(header_end + content_length);
    Ok(buf[header_end..end].to_vec())
}
