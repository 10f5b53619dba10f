//! Loading compiled contract artifacts (ABI + bytecode).

use std::path::{Path, PathBuf};

use alloy_core::{json_abi::JsonAbi, primitives::Bytes};
use serde_json::Value;

/// Default Hardhat build output directory for contract sources.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts/contracts";
/// Contract deployed when none is named.
pub const DEFAULT_CONTRACT_NAME: &str = "SkillBridge";

/// A compiled contract ready to be deployed.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractArtifact {
    /// `contractName` from the artifact, or the file stem.
    pub contract_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode.
    pub bytecode: Bytes,
}

/// The two ways loading an artifact can fail.
///
/// They map to different fixes: a missing file means the contracts were not
/// compiled yet, a malformed one means the build output is corrupted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found or unreadable at {}: {reason}", path.display())]
    NotFound { path: PathBuf, reason: String },

    #[error("malformed artifact at {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Where the orchestrator gets its artifact from.
pub trait ArtifactSource {
    /// Human readable location, for progress output.
    fn location(&self) -> &Path;

    /// Read and validate the artifact.
    fn load(&self) -> Result<ContractArtifact, ArtifactError>;
}

/// An artifact JSON file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    path: PathBuf,
}

impl ArtifactFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional `<dir>/<Name>.sol/<Name>.json` location.
    pub fn for_contract(artifacts_dir: impl AsRef<Path>, contract_name: &str) -> Self {
        Self::new(
            artifacts_dir
                .as_ref()
                .join(format!("{contract_name}.sol"))
                .join(format!("{contract_name}.json")),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSource for ArtifactFile {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ContractArtifact, ArtifactError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ArtifactError::NotFound {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let artifact = parse_artifact(&content, &self.path).map_err(|reason| {
            ArtifactError::Parse {
                path: self.path.clone(),
                reason,
            }
        })?;

        tracing::debug!(
            path = %self.path.display(),
            contract = %artifact.contract_name,
            abi_items = artifact.abi.len(),
            bytecode_len = artifact.bytecode.len(),
            "Artifact loaded"
        );

        Ok(artifact)
    }
}

/// Parse a Hardhat or Foundry artifact.
fn parse_artifact(content: &str, path: &Path) -> Result<ContractArtifact, String> {
    let data: Value =
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))?;

    let abi = match data.get("abi") {
        Some(abi @ Value::Array(items)) if !items.is_empty() => {
            serde_json::from_value::<JsonAbi>(abi.clone())
                .map_err(|e| format!("invalid `abi`: {e}"))?
        }
        Some(Value::Array(_)) => return Err("`abi` is empty".to_string()),
        Some(_) => return Err("`abi` is not a list".to_string()),
        None => return Err("missing `abi` field".to_string()),
    };

    // Hardhat stores a hex string, Foundry nests it under `object`.
    let bytecode = match data.get("bytecode") {
        Some(Value::String(hex)) => hex.as_str(),
        Some(Value::Object(object)) => object
            .get("object")
            .and_then(Value::as_str)
            .ok_or("`bytecode.object` is not a hex string")?,
        Some(_) => return Err("`bytecode` is not a hex string".to_string()),
        None => return Err("missing `bytecode` field".to_string()),
    };
    let bytecode = parse_bytecode(bytecode)?;

    let contract_name = data
        .get("contractName")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| DEFAULT_CONTRACT_NAME.to_string());

    Ok(ContractArtifact {
        contract_name,
        abi,
        bytecode,
    })
}

fn parse_bytecode(hex_code: &str) -> Result<Bytes, String> {
    let hex_code = hex_code.trim();
    let hex_code = hex_code.strip_prefix("0x").unwrap_or(hex_code);

    if hex_code.is_empty() {
        return Err("`bytecode` is empty (abstract contract or interface?)".to_string());
    }
    if hex_code.contains("__") {
        return Err("`bytecode` contains unlinked library placeholders".to_string());
    }

    hex::decode(hex_code)
        .map(Bytes::from)
        .map_err(|e| format!("`bytecode` is not valid hex: {e}"))
}
