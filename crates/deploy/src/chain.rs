//! Pinned network metadata for deployment targets.

/// Hedera networks the deployer knows out of the box.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum KnownChain {
    HederaTestnet,
    HederaMainnet,
    HederaPreviewnet,
}

impl KnownChain {
    pub fn to_chain_id(&self) -> u64 {
        match self {
            KnownChain::HederaMainnet => 295,
            KnownChain::HederaTestnet => 296,
            KnownChain::HederaPreviewnet => 297,
        }
    }

    /// Look up a known chain by its numeric id.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        use strum::IntoEnumIterator;

        Self::iter().find(|chain| chain.to_chain_id() == chain_id)
    }

    /// Full metadata for this chain.
    pub fn profile(&self) -> ChainProfile {
        let (display_name, network, faucet_url, public_rpc_url) = match self {
            KnownChain::HederaTestnet => (
                "Hedera Testnet",
                "testnet",
                Some("https://portal.hedera.com"),
                "https://testnet.hashio.io/api",
            ),
            KnownChain::HederaMainnet => (
                "Hedera Mainnet",
                "mainnet",
                None,
                "https://mainnet.hashio.io/api",
            ),
            KnownChain::HederaPreviewnet => (
                "Hedera Previewnet",
                "previewnet",
                Some("https://portal.hedera.com"),
                "https://previewnet.hashio.io/api",
            ),
        };

        ChainProfile {
            name: self.to_string(),
            display_name: display_name.to_string(),
            chain_id: self.to_chain_id(),
            currency: "HBAR".to_string(),
            explorer_url: Some(format!("https://hashscan.io/{network}")),
            faucet_url: faucet_url.map(String::from),
            public_rpc_url: Some(public_rpc_url.to_string()),
        }
    }
}

/// Identity and presentation metadata of the chain a deployment is pinned to.
///
/// The chain id is always taken from here when signing, never from the
/// endpoint's own answer to `eth_chainId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainProfile {
    /// Short machine name, e.g. `hedera-testnet`.
    pub name: String,
    /// Human readable network name.
    pub display_name: String,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Native currency symbol.
    pub currency: String,
    /// Block explorer base URL (without trailing slash).
    pub explorer_url: Option<String>,
    /// Where operators can get test funds.
    pub faucet_url: Option<String>,
    /// A public JSON-RPC endpoint, shown in hints.
    pub public_rpc_url: Option<String>,
}

impl ChainProfile {
    /// A chain the deployer has no metadata for.
    pub fn custom(name: impl Into<String>, chain_id: u64) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            chain_id,
            currency: "ETH".to_string(),
            explorer_url: None,
            faucet_url: None,
            public_rpc_url: None,
        }
    }

    /// Explorer page of a deployed contract.
    pub fn contract_url(&self, address: impl std::fmt::Display) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/contract/{}", base.trim_end_matches('/'), address))
    }

    /// Explorer page of a transaction.
    pub fn transaction_url(&self, tx_hash: impl std::fmt::Display) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/transaction/{}", base.trim_end_matches('/'), tx_hash))
    }
}

impl Default for ChainProfile {
    fn default() -> Self {
        KnownChain::HederaTestnet.profile()
    }
}
