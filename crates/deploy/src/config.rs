//! Deployment configuration resolved from a [`ConfigSource`].

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use url::Url;

use crate::chain::{ChainProfile, KnownChain};

/// Environment key holding the JSON-RPC endpoint.
pub const RPC_URL_KEY: &str = "HEDERA_RPC_URL";
/// Environment key holding the deployer's private key.
pub const PRIVATE_KEY_KEY: &str = "HEDERA_PRIVATE_KEY";
/// Optional chain name override (e.g. `hedera-mainnet`).
pub const CHAIN_NAME_KEY: &str = "HEDERA_CHAIN_NAME";
/// Optional chain id override.
pub const CHAIN_ID_KEY: &str = "HEDERA_CHAIN_ID";

/// Older spellings still found in existing `.env` files.
const LEGACY_RPC_URL_KEY: &str = "HADERA_RPC_URL";
const LEGACY_PRIVATE_KEY_KEY: &str = "HADERA_PRIVATE_KEY";

/// A read-only source of configuration values.
pub trait ConfigSource {
    /// Return the raw value for `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Errors raised while building a [`DeploymentConfig`] or the signer derived from it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is not set")]
    Missing { key: &'static str },

    #[error("{key} is not a valid http(s) URL ({value}): {reason}")]
    InvalidRpcUrl {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("HEDERA_CHAIN_ID must be a positive integer, got '{value}'")]
    InvalidChainId { value: String },

    #[error("unknown chain '{name}', set HEDERA_CHAIN_ID to deploy to a custom chain")]
    UnknownChain { name: String },

    #[error("invalid private key: {reason}")]
    InvalidPrivateKey { reason: String },
}

/// A hex-encoded secp256k1 private key.
///
/// Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(hex_key: impl Into<String>) -> Self {
        Self(hex_key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Everything a single deployment run needs to know about its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Deployer key, 64 hex characters.
    pub private_key: PrivateKey,
    /// Chain the deployment is pinned to.
    pub chain: ChainProfile,
}

impl DeploymentConfig {
    /// Resolve the configuration from `source`.
    ///
    /// The two required values are checked before anything else so that no
    /// client is ever built from a half-populated configuration.
    pub fn resolve<S: ConfigSource + ?Sized>(source: &S) -> Result<Self, ConfigError> {
        let (rpc_url_key, rpc_url) = required(source, RPC_URL_KEY, LEGACY_RPC_URL_KEY)?;
        let (_, private_key) = required(source, PRIVATE_KEY_KEY, LEGACY_PRIVATE_KEY_KEY)?;

        let rpc_url = parse_rpc_url(rpc_url_key, &rpc_url)?;
        let chain = resolve_chain(
            optional(source, CHAIN_NAME_KEY),
            optional(source, CHAIN_ID_KEY),
        )?;

        tracing::debug!(
            rpc_host = rpc_url.host_str().unwrap_or_default(),
            chain = %chain.name,
            chain_id = chain.chain_id,
            "Configuration resolved"
        );

        Ok(Self {
            rpc_url,
            private_key: PrivateKey::new(private_key),
            chain,
        })
    }

    pub fn chain_name(&self) -> &str {
        &self.chain.name
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id
    }
}

/// Read a non-blank value, trimmed.
fn optional<S: ConfigSource + ?Sized>(source: &S, key: &str) -> Option<String> {
    source
        .var(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read `key`, falling back to `legacy_key`. Returns the key the value came from.
fn required<S: ConfigSource + ?Sized>(
    source: &S,
    key: &'static str,
    legacy_key: &'static str,
) -> Result<(&'static str, String), ConfigError> {
    if let Some(value) = optional(source, key) {
        return Ok((key, value));
    }

    let value = optional(source, legacy_key).ok_or(ConfigError::Missing { key })?;
    tracing::warn!(key = legacy_key, replacement = key, "Using deprecated key");
    Ok((legacy_key, value))
}

fn parse_rpc_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRpcUrl {
        key,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}

fn resolve_chain(name: Option<String>, id: Option<String>) -> Result<ChainProfile, ConfigError> {
    let id = id
        .map(|value| match value.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(ConfigError::InvalidChainId { value }),
        })
        .transpose()?;

    let profile = match (name, id) {
        (None, None) => ChainProfile::default(),
        (None, Some(id)) => KnownChain::from_chain_id(id)
            .map(|chain| chain.profile())
            .unwrap_or_else(|| ChainProfile::custom(format!("chain-{id}"), id)),
        (Some(name), id) => match name.parse::<KnownChain>() {
            Ok(known) => {
                let mut profile = known.profile();
                if let Some(id) = id {
                    profile.chain_id = id;
                }
                profile
            }
            Err(_) => {
                let id = id.ok_or_else(|| ConfigError::UnknownChain { name: name.clone() })?;
                ChainProfile::custom(name, id)
            }
        },
    };

    Ok(profile)
}
