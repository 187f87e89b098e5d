//! Signing contract boundary
//!
//! `SignerTransport` is whatever talks to the chain (RPC, relayer, a test
//! double). `ChainSignaturesContract` shapes requests for it and checks
//! what comes back against locally derived addresses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chainsig_core::{
    derive_bitcoin_address, derive_evm_address, to_rsv, verify, BitcoinAddressType,
    BitcoinNetwork, DerivationPath, DerivedAddress, MpcSignature,
};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::ContractConfig;
use crate::session::SignerSession;

/// Gas attached to every `sign` call (300 Tgas)
pub const NEAR_MAX_GAS: u64 = 300_000_000_000_000;

/// Root key version the contract signs with
pub const KEY_VERSION: u32 = 0;

/// Used when neither the caller nor the contract names a deposit
const FALLBACK_DEPOSIT: u128 = 1;

/// Arguments of the contract's `sign` method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub payload: Vec<u8>,
    pub path: String,
    pub key_version: u32,
}

impl SignRequest {
    pub fn new(payload: [u8; 32], path: &DerivationPath) -> Self {
        Self {
            payload: payload.to_vec(),
            path: path.canonicalize(),
            key_version: KEY_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignArgs {
    pub request: SignRequest,
}

/// A fully shaped `sign` function call
#[derive(Debug)]
pub struct SignCall<'a> {
    pub session: &'a SignerSession,
    pub contract_id: &'a str,
    pub relayer_url: Option<&'a str>,
    pub args: SignArgs,
    pub gas: u64,
    pub deposit: u128,
}

/// Transport to the signing contract
#[async_trait]
pub trait SignerTransport: Send + Sync {
    /// `public_key` view call: root key in `secp256k1:<base58>` form
    async fn public_key(&self, contract_id: &str) -> Result<String>;

    /// `experimental_signature_deposit` view call
    async fn signature_deposit(&self, contract_id: &str) -> Result<Option<u128>>;

    /// Submit `sign` and wait for the signature
    async fn sign(&self, call: SignCall<'_>) -> Result<MpcSignature>;
}

/// What a chain integration needs from the MPC network
#[async_trait]
pub trait ChainSignatures: Send + Sync {
    /// Request a signature over `payload` with the key at `path`
    async fn sign(&self, payload: [u8; 32], path: &DerivationPath) -> Result<MpcSignature>;

    /// Check that `signature` over `payload` comes from the key at `path`
    async fn verify(
        &self,
        payload: &[u8; 32],
        path: &DerivationPath,
        signature: &MpcSignature,
    ) -> Result<bool>;
}

/// [`ChainSignatures`] for one contract deployment and one signer account
pub struct ChainSignaturesContract<T> {
    config: ContractConfig,
    session: SignerSession,
    deposit: Option<u128>,
    transport: T,
    root_public_key: OnceCell<String>,
}

impl<T: SignerTransport> ChainSignaturesContract<T> {
    pub fn new(config: ContractConfig, session: SignerSession, transport: T) -> Self {
        let root_public_key = match &config.root_public_key {
            Some(key) => OnceCell::new_with(Some(key.clone())),
            None => OnceCell::new(),
        };

        Self {
            config,
            session,
            deposit: None,
            transport,
            root_public_key,
        }
    }

    /// Fixed deposit instead of asking the contract for its current fee
    pub fn with_deposit(mut self, deposit: u128) -> Self {
        self.deposit = Some(deposit);
        self
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Account whose derived keys this contract signs with
    pub fn signer_id(&self) -> &str {
        &self.session.account_id
    }

    /// Root key, fetched from the contract on first use
    pub async fn root_public_key(&self) -> Result<&str> {
        let key = self
            .root_public_key
            .get_or_try_init(|| async {
                tracing::info!("Fetching root public key from {}", self.config.contract_id);
                self.transport
                    .public_key(&self.config.contract_id)
                    .await
                    .context("Failed to fetch root public key")
            })
            .await?;
        Ok(key.as_str())
    }

    pub async fn derived_evm_address(&self, path: &DerivationPath) -> Result<DerivedAddress> {
        let root = self.root_public_key().await?;
        let derived = derive_evm_address(root, self.signer_id(), path)
            .context(format!("Failed to derive EVM address for {}", path))?;
        tracing::debug!("Derived EVM address {} for {}", derived.address, path);
        Ok(derived)
    }

    pub async fn derived_bitcoin_address(
        &self,
        path: &DerivationPath,
        network: BitcoinNetwork,
        address_type: BitcoinAddressType,
    ) -> Result<DerivedAddress> {
        let root = self.root_public_key().await?;
        let derived = derive_bitcoin_address(root, self.signer_id(), path, network, address_type)
            .context(format!("Failed to derive Bitcoin address for {}", path))?;
        tracing::debug!(
            "Derived {} {} address {} for {}",
            network,
            address_type,
            derived.address,
            path
        );
        Ok(derived)
    }

    async fn resolve_deposit(&self) -> Result<u128> {
        if let Some(deposit) = self.deposit {
            return Ok(deposit);
        }

        let fee = self
            .transport
            .signature_deposit(&self.config.contract_id)
            .await
            .context("Failed to fetch signature deposit")?;

        Ok(fee.unwrap_or_else(|| {
            tracing::debug!("Contract reports no signature fee, using {}", FALLBACK_DEPOSIT);
            FALLBACK_DEPOSIT
        }))
    }
}

#[async_trait]
impl<T: SignerTransport> ChainSignatures for ChainSignaturesContract<T> {
    async fn sign(&self, payload: [u8; 32], path: &DerivationPath) -> Result<MpcSignature> {
        path.validate()?;

        let deposit = self.resolve_deposit().await?;
        let call = SignCall {
            session: &self.session,
            contract_id: &self.config.contract_id,
            relayer_url: self.config.relayer_url.as_deref(),
            args: SignArgs {
                request: SignRequest::new(payload, path),
            },
            gas: NEAR_MAX_GAS,
            deposit,
        };

        tracing::info!(
            "Requesting signature from {} as {} (path {}, deposit {})",
            self.config.contract_id,
            self.session.account_id,
            path,
            deposit
        );

        let signature = self.transport.sign(call).await.map_err(|e| {
            tracing::error!("Sign request failed: {:#}", e);
            e.context("Signature error, please retry")
        })?;

        tracing::info!("Received signature with recovery_id {}", signature.recovery_id);
        Ok(signature)
    }

    async fn verify(
        &self,
        payload: &[u8; 32],
        path: &DerivationPath,
        signature: &MpcSignature,
    ) -> Result<bool> {
        let expected = self.derived_evm_address(path).await?;
        let verified = verify(payload, &to_rsv(signature), &expected.address)
            .context("Malformed signature from signing contract")?;

        if verified {
            tracing::info!("Signature verified for {}", expected.address);
        } else {
            tracing::warn!("Signature does not recover to {}", expected.address);
        }

        Ok(verified)
    }
}
