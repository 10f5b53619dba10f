//! Local private-key signer for deployment transactions.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

use crate::config::{ConfigError, PrivateKey};

/// Length of a hex-encoded secp256k1 private key, without `0x`.
pub const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Holds the deployer key and signs transactions for a pinned chain.
#[derive(Debug, Clone)]
pub struct Signer {
    inner: PrivateKeySigner,
    chain_id: u64,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// EIP-2718 encoding of the signed transaction.
    pub raw: Bytes,
    pub tx_hash: B256,
}

impl Signer {
    /// Build a signer from a 64 character hex key.
    ///
    /// A `0x` prefix is tolerated. Anything else (wrong length, non-hex
    /// characters, a key outside the curve order) is rejected.
    pub fn from_private_key(key: &PrivateKey, chain_id: u64) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPrivateKey { reason };

        let hex_key = key.expose().trim();
        let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);

        if hex_key.len() != PRIVATE_KEY_HEX_LEN {
            return Err(invalid(format!(
                "expected {PRIVATE_KEY_HEX_LEN} hex characters, got {}",
                hex_key.len()
            )));
        }

        let bytes: [u8; 32] = hex::decode(hex_key)
            .map_err(|e| invalid(format!("not a hex string: {e}")))?
            .try_into()
            .map_err(|_| invalid("private key must be exactly 32 bytes".to_string()))?;

        let inner = PrivateKeySigner::from_bytes(&B256::from(bytes))
            .map_err(|e| invalid(format!("not a valid secp256k1 key: {e}")))?;

        Ok(Self { inner, chain_id })
    }

    /// The deployer address derived from the key.
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// The chain id every signature is bound to.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign `tx` with EIP-155 replay protection for the pinned chain.
    pub fn sign_transaction(
        &self,
        mut tx: TxLegacy,
    ) -> Result<SignedTransaction, alloy_signer::Error> {
        tx.chain_id = Some(self.chain_id);

        let signature = self.inner.sign_hash_sync(&tx.signature_hash())?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));

        Ok(SignedTransaction {
            raw: envelope.encoded_2718().into(),
            tx_hash: *envelope.tx_hash(),
        })
    }
}
