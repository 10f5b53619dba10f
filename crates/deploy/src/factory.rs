//! Binding an artifact to a signer.

use alloy_core::primitives::Bytes;

use crate::{
    artifact::ContractArtifact,
    client::{ChainClient, ClientError, DeploymentRequest, PendingDeployment},
    error::FailureReason,
    signer::Signer,
};

/// The artifact cannot be deployed as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("constructor of {contract} expects {count} argument(s), constructor arguments are not supported")]
    ConstructorArguments { contract: String, count: usize },
}

impl From<FactoryError> for FailureReason {
    fn from(error: FactoryError) -> Self {
        FailureReason::Transaction {
            reason: error.to_string(),
            tx_hash: None,
        }
    }
}

/// ABI + bytecode + signer, ready to deploy.
#[derive(Debug)]
pub struct ContractFactory<'a> {
    artifact: ContractArtifact,
    signer: &'a Signer,
}

impl<'a> ContractFactory<'a> {
    pub fn new(artifact: ContractArtifact, signer: &'a Signer) -> Result<Self, FactoryError> {
        let count = artifact
            .abi
            .constructor()
            .map_or(0, |constructor| constructor.inputs.len());
        if count > 0 {
            return Err(FactoryError::ConstructorArguments {
                contract: artifact.contract_name,
                count,
            });
        }

        Ok(Self { artifact, signer })
    }

    pub fn contract_name(&self) -> &str {
        &self.artifact.contract_name
    }

    /// Creation code. Without constructor arguments this is the bytecode itself.
    pub fn init_code(&self) -> Bytes {
        self.artifact.bytecode.clone()
    }

    /// Submit the creation transaction through `client`.
    pub async fn deploy<C: ChainClient>(&self, client: &C) -> Result<PendingDeployment, ClientError> {
        let request = DeploymentRequest {
            contract_name: self.artifact.contract_name.clone(),
            init_code: self.init_code(),
        };
        client.send_deployment(request, self.signer).await
    }
}
