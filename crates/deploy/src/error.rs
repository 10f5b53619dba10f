//! Failure classification for a deployment run.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::{Address, B256, U256};

use crate::{artifact::ArtifactError, client::ClientError, config::ConfigError};

/// Node rejection texts that mean the deployer cannot pay for the transaction.
///
/// The last one is Hedera's native status code, relayed verbatim by its JSON-RPC relay.
const INSUFFICIENT_FUNDS_MARKERS: &[&str] = &[
    "insufficient funds",
    "insufficient balance",
    "insufficient_payer_balance",
];

/// Why a deployment failed. Every failure maps to exactly one variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("deployer account {address} has insufficient funds")]
    InsufficientFunds {
        address: Address,
        /// Known when the balance check tripped, unknown when the node refused the transaction.
        balance: Option<U256>,
    },

    #[error("contract artifact not found at {}: {reason}", path.display())]
    ArtifactNotFound { path: PathBuf, reason: String },

    #[error("malformed contract artifact at {}: {reason}", path.display())]
    ArtifactParse { path: PathBuf, reason: String },

    #[error("deployment transaction failed: {reason}")]
    Transaction {
        reason: String,
        tx_hash: Option<B256>,
    },

    #[error("deployment not confirmed after {}s", waited.as_secs())]
    ConfirmationTimeout {
        tx_hash: Option<B256>,
        waited: Duration,
    },
}

/// Discriminant of a [`FailureReason`], as shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum FailureKind {
    #[strum(serialize = "ConfigurationError")]
    Configuration,
    #[strum(serialize = "NetworkError")]
    Network,
    #[strum(serialize = "InsufficientFunds")]
    InsufficientFunds,
    #[strum(serialize = "ArtifactNotFoundError")]
    ArtifactNotFound,
    #[strum(serialize = "ArtifactParseError")]
    ArtifactParse,
    #[strum(serialize = "TransactionError")]
    Transaction,
    #[strum(serialize = "ConfirmationTimeoutError")]
    ConfirmationTimeout,
}

impl FailureReason {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureReason::Configuration(_) => FailureKind::Configuration,
            FailureReason::Network { .. } => FailureKind::Network,
            FailureReason::InsufficientFunds { .. } => FailureKind::InsufficientFunds,
            FailureReason::ArtifactNotFound { .. } => FailureKind::ArtifactNotFound,
            FailureReason::ArtifactParse { .. } => FailureKind::ArtifactParse,
            FailureReason::Transaction { .. } => FailureKind::Transaction,
            FailureReason::ConfirmationTimeout { .. } => FailureKind::ConfirmationTimeout,
        }
    }

    /// Hash of the submitted transaction, when the failure happened after submission.
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            FailureReason::Transaction { tx_hash, .. }
            | FailureReason::ConfirmationTimeout { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }

    /// Classify a network client error raised on behalf of `deployer`.
    pub fn from_client_error(error: ClientError, deployer: Address) -> Self {
        match error {
            ClientError::Network(e) => FailureReason::Network {
                reason: e.to_string(),
            },
            ClientError::Rejected { reason } if is_insufficient_funds(&reason) => {
                FailureReason::InsufficientFunds {
                    address: deployer,
                    balance: None,
                }
            }
            ClientError::Rejected { reason } => FailureReason::Transaction {
                reason,
                tx_hash: None,
            },
            ClientError::Broadcast { tx_hash, source } => FailureReason::Transaction {
                reason: format!(
                    "lost the node's answer after sending, the transaction may have been broadcast: {source}"
                ),
                tx_hash: Some(tx_hash),
            },
            ClientError::Reverted { tx_hash } => FailureReason::Transaction {
                reason: "execution reverted during contract creation".to_string(),
                tx_hash,
            },
            ClientError::ConfirmationTimeout { tx_hash, waited } => {
                FailureReason::ConfirmationTimeout { tx_hash, waited }
            }
        }
    }
}

impl From<ArtifactError> for FailureReason {
    fn from(error: ArtifactError) -> Self {
        match error {
            ArtifactError::NotFound { path, reason } => {
                FailureReason::ArtifactNotFound { path, reason }
            }
            ArtifactError::Parse { path, reason } => FailureReason::ArtifactParse { path, reason },
        }
    }
}

/// Whether an opaque node rejection message is about missing funds.
pub fn is_insufficient_funds(message: &str) -> bool {
    let message = message.to_lowercase();
    INSUFFICIENT_FUNDS_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}
