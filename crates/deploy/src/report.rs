//! Human readable rendering of progress and outcomes.
//!
//! Everything here is a pure function of its input.

use std::fmt::Write;

use alloy_core::primitives::{U256, utils::format_ether};

use crate::{
    chain::{ChainProfile, KnownChain},
    config::{ConfigError, PRIVATE_KEY_KEY},
    error::FailureReason,
    orchestrator::{DeploymentOutcome, DeploymentReport, Progress},
};

const BANNER_WIDTH: usize = 60;

/// One console line (or a few) for a progress event.
pub fn progress_line(event: &Progress) -> String {
    match event {
        Progress::Connecting { endpoint, chain } => format!(
            "Connecting to {} (chain id {})...\nRPC endpoint: {endpoint}",
            chain.display_name, chain.chain_id
        ),
        Progress::Deployer { address } => {
            format!("Deploying contracts with the account: {address}")
        }
        Progress::Balance { account, currency } => format!(
            "Account balance: {} {currency}",
            format_balance(account.balance)
        ),
        Progress::LoadingArtifact { path } => {
            format!("Reading artifact from: {}", path.display())
        }
        Progress::Submitting { contract_name } => {
            format!("\nDeploying {contract_name}...\nSending deployment transaction...")
        }
        Progress::Submitted { tx_hash: Some(hash) } => format!("Transaction submitted: {hash}"),
        Progress::Submitted { tx_hash: None } => "Transaction submitted".to_string(),
        Progress::AwaitingConfirmation => "Waiting for deployment confirmation...".to_string(),
    }
}

/// Full summary of a finished run.
pub fn render(report: &DeploymentReport) -> String {
    let chain = report.chain.clone().unwrap_or_default();
    let banner = "=".repeat(BANNER_WIDTH);
    let mut out = String::new();

    match &report.outcome {
        DeploymentOutcome::Success(result) => {
            let _ = writeln!(out, "\n{banner}");
            let _ = writeln!(out, "✅ {} deployed successfully!", result.contract_name);
            let _ = writeln!(out, "{banner}");
            let _ = writeln!(out, "Contract address: {}", result.contract_address);
            let _ = writeln!(out, "Network: {}", chain.display_name);
            if let Some(url) = chain.contract_url(result.contract_address) {
                let _ = writeln!(out, "View on explorer: {url}");
            }
            if let Some(hash) = result.transaction_hash {
                let _ = writeln!(out, "Transaction hash: {hash}");
            }
            if let Some(block) = result.block_number {
                let _ = writeln!(out, "Block number: {block}");
            }
            if let Some(gas) = result.gas_used {
                let _ = writeln!(out, "Gas used: {gas}");
            }
            let _ = writeln!(out, "{banner}\n");
            let _ = writeln!(out, "Save this information for your records:");
            let _ = writeln!(out, "Contract Address: {}", result.contract_address);
            let _ = writeln!(out, "Deployer Address: {}", result.deployer_address);
        }
        DeploymentOutcome::Failure { stage, reason } => {
            let _ = writeln!(out, "\n❌ Deployment failed:");
            let _ = writeln!(out, "Error kind: {}", reason.kind());
            let _ = writeln!(out, "Stage reached: {stage}");
            let _ = writeln!(out, "Error message: {reason}");
            if let FailureReason::InsufficientFunds {
                balance: Some(balance),
                ..
            } = reason
            {
                let _ = writeln!(
                    out,
                    "Balance: {} {}",
                    format_balance(*balance),
                    chain.currency
                );
            }
            if let Some(hash) = reason.tx_hash() {
                let _ = writeln!(out, "Transaction hash: {hash}");
            }
            if let Some(hint) = hint(reason, &chain) {
                let _ = writeln!(out, "\n💡 Solution: {hint}");
            }
        }
    }

    out
}

/// Remediation advice for a failure on `chain`.
pub fn hint(reason: &FailureReason, chain: &ChainProfile) -> Option<String> {
    let rpc_hint = || {
        let mut hint = "Check HEDERA_RPC_URL in your .env file".to_string();
        if let Some(rpc) = &chain.public_rpc_url {
            let _ = write!(hint, "\nShould be: {rpc}");
        }
        hint
    };

    match reason {
        FailureReason::InsufficientFunds { address, .. } => Some(match &chain.faucet_url {
            Some(faucet) => format!("Get test {} from {faucet}", chain.currency),
            None => format!("Fund {address} with {} on {}", chain.currency, chain.display_name),
        }),
        FailureReason::Configuration(
            ConfigError::InvalidPrivateKey { .. } | ConfigError::Missing {
                key: PRIVATE_KEY_KEY,
            },
        ) => Some(
            "Check HEDERA_PRIVATE_KEY in your .env file (should be 64 hex characters, no 0x prefix)"
                .to_string(),
        ),
        FailureReason::Configuration(
            ConfigError::Missing { .. } | ConfigError::InvalidRpcUrl { .. },
        )
        | FailureReason::Network { .. } => Some(rpc_hint()),
        FailureReason::Configuration(
            ConfigError::InvalidChainId { .. } | ConfigError::UnknownChain { .. },
        ) => {
            use strum::IntoEnumIterator;

            let known: Vec<String> = KnownChain::iter().map(|c| c.to_string()).collect();
            Some(format!(
                "Check HEDERA_CHAIN_NAME and HEDERA_CHAIN_ID (known chains: {})",
                known.join(", ")
            ))
        }
        FailureReason::ArtifactNotFound { .. } => {
            Some("Compile your contracts first with: npx hardhat compile".to_string())
        }
        FailureReason::ArtifactParse { .. } => Some(
            "Rebuild the artifacts with: npx hardhat clean && npx hardhat compile".to_string(),
        ),
        FailureReason::ConfirmationTimeout { tx_hash, .. } => {
            let target = tx_hash
                .and_then(|hash| chain.transaction_url(hash))
                .unwrap_or_else(|| "the block explorer".to_string());
            Some(format!(
                "The transaction may still be mined. Check {target} before re-running to avoid a duplicate deployment"
            ))
        }
        FailureReason::Transaction { tx_hash, .. } => tx_hash
            .and_then(|hash| chain.transaction_url(hash))
            .map(|url| format!("Inspect the transaction at {url}")),
    }
}

/// Whole units with trailing zeros trimmed, keeping one decimal.
fn format_balance(balance: U256) -> String {
    let formatted = format_ether(balance);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            let fraction = if fraction.is_empty() { "0" } else { fraction };
            format!("{whole}.{fraction}")
        }
        None => formatted,
    }
}
