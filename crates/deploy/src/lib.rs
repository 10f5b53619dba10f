//! skillbridge-deploy - One-shot contract deployment to Hedera's EVM.
//!
//! This crate resolves the deployer configuration, checks that the deployer can
//! pay, loads a compiled artifact, submits the creation transaction and waits
//! for it to be mined. Each step is a typed transition of [`Orchestrator`];
//! every run ends in exactly one [`DeploymentOutcome`].

pub mod artifact;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod report;
pub mod rpc;
pub mod signer;

pub use artifact::{
    ArtifactError, ArtifactFile, ArtifactSource, ContractArtifact, DEFAULT_ARTIFACTS_DIR,
    DEFAULT_CONTRACT_NAME,
};
pub use chain::{ChainProfile, KnownChain};
pub use client::{
    AccountState, ChainClient, ClientError, ClientSettings, Connector, DeploymentRequest,
    DeploymentResult, PendingDeployment, RpcClient, RpcConnector,
};
pub use config::{ConfigError, ConfigSource, DeploymentConfig, EnvSource, PrivateKey};
pub use error::{FailureKind, FailureReason};
pub use factory::{ContractFactory, FactoryError};
pub use orchestrator::{
    DeploymentOutcome, DeploymentReport, NoProgress, Orchestrator, Progress, ProgressSink, Stage,
};
pub use signer::{SignedTransaction, Signer};
