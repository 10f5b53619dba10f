//! The deployment state machine.
//!
//! A run walks `Unconfigured → Configured → Connected → FundsVerified →
//! ArtifactLoaded → Submitted → Confirmed`. The first failing transition ends
//! the run; nothing is retried.

use std::path::PathBuf;

use alloy_core::primitives::{Address, B256};

use crate::{
    artifact::ArtifactSource,
    chain::ChainProfile,
    client::{AccountState, ChainClient, Connector, DeploymentResult},
    config::{ConfigSource, DeploymentConfig},
    error::FailureReason,
    factory::ContractFactory,
    signer::Signer,
};

/// Last state a run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum Stage {
    Unconfigured,
    Configured,
    Connected,
    FundsVerified,
    ArtifactLoaded,
    Submitted,
    Confirmed,
}

/// Progress notifications emitted while a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// About to talk to `endpoint` (origin only).
    Connecting { endpoint: String, chain: ChainProfile },
    Deployer { address: Address },
    Balance { account: AccountState, currency: String },
    LoadingArtifact { path: PathBuf },
    Submitting { contract_name: String },
    Submitted { tx_hash: Option<B256> },
    AwaitingConfirmation,
}

/// Receives [`Progress`] events.
pub trait ProgressSink {
    fn emit(&mut self, event: &Progress);
}

impl<F: FnMut(&Progress)> ProgressSink for F {
    fn emit(&mut self, event: &Progress) {
        (*self)(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&mut self, _event: &Progress) {}
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    Success(DeploymentResult),
    Failure { stage: Stage, reason: FailureReason },
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentOutcome::Success(_))
    }
}

/// A [`DeploymentOutcome`] together with the chain it targeted.
///
/// `chain` is `None` only when the configuration could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub chain: Option<ChainProfile>,
    pub outcome: DeploymentOutcome,
}

/// Runs one deployment of one artifact.
#[derive(Debug, Clone)]
pub struct Orchestrator<N, A> {
    connector: N,
    artifacts: A,
}

impl<N, A> Orchestrator<N, A>
where
    N: Connector,
    A: ArtifactSource,
{
    pub fn new(connector: N, artifacts: A) -> Self {
        Self {
            connector,
            artifacts,
        }
    }

    /// Drive the state machine to completion. Always returns exactly one outcome.
    pub async fn run<S, P>(&self, source: &S, progress: &mut P) -> DeploymentReport
    where
        S: ConfigSource + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let mut run = Run {
            stage: Stage::Unconfigured,
            chain: None,
        };

        let outcome = match self.execute(source, progress, &mut run).await {
            Ok(result) => {
                tracing::info!(
                    contract = %result.contract_name,
                    address = %result.contract_address,
                    tx_hash = ?result.transaction_hash,
                    "Deployment confirmed"
                );
                DeploymentOutcome::Success(result)
            }
            Err(reason) => {
                tracing::error!(
                    stage = %run.stage,
                    kind = %reason.kind(),
                    error = %reason,
                    "Deployment failed"
                );
                DeploymentOutcome::Failure {
                    stage: run.stage,
                    reason,
                }
            }
        };

        DeploymentReport {
            chain: run.chain,
            outcome,
        }
    }

    async fn execute<S, P>(
        &self,
        source: &S,
        progress: &mut P,
        run: &mut Run,
    ) -> Result<DeploymentResult, FailureReason>
    where
        S: ConfigSource + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let config = DeploymentConfig::resolve(source)?;
        run.chain = Some(config.chain.clone());
        run.advance(Stage::Configured);

        progress.emit(&Progress::Connecting {
            endpoint: config.rpc_url.origin().ascii_serialization(),
            chain: config.chain.clone(),
        });
        let signer = Signer::from_private_key(&config.private_key, config.chain_id())?;
        let deployer = signer.address();
        let client = self
            .connector
            .connect(&config)
            .map_err(|e| FailureReason::from_client_error(e, deployer))?;
        progress.emit(&Progress::Deployer { address: deployer });
        run.advance(Stage::Connected);

        let balance = client
            .balance(deployer)
            .await
            .map_err(|e| FailureReason::from_client_error(e, deployer))?;
        progress.emit(&Progress::Balance {
            account: AccountState {
                address: deployer,
                balance,
            },
            currency: config.chain.currency.clone(),
        });
        if balance.is_zero() {
            return Err(FailureReason::InsufficientFunds {
                address: deployer,
                balance: Some(balance),
            });
        }
        run.advance(Stage::FundsVerified);

        progress.emit(&Progress::LoadingArtifact {
            path: self.artifacts.location().to_path_buf(),
        });
        let artifact = self.artifacts.load()?;
        run.advance(Stage::ArtifactLoaded);

        let factory = ContractFactory::new(artifact, &signer)?;
        progress.emit(&Progress::Submitting {
            contract_name: factory.contract_name().to_string(),
        });
        let pending = factory
            .deploy(&client)
            .await
            .map_err(|e| FailureReason::from_client_error(e, deployer))?;
        progress.emit(&Progress::Submitted {
            tx_hash: pending.tx_hash,
        });
        run.advance(Stage::Submitted);

        progress.emit(&Progress::AwaitingConfirmation);
        let result = client
            .await_confirmation(pending)
            .await
            .map_err(|e| FailureReason::from_client_error(e, deployer))?;
        run.advance(Stage::Confirmed);

        Ok(result)
    }
}

/// Mutable bookkeeping of a single run.
struct Run {
    stage: Stage,
    chain: Option<ChainProfile>,
}

impl Run {
    fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "Stage reached");
        self.stage = stage;
    }
}
