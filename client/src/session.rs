use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Account used for view calls when the caller does not bring one
pub const THROWAWAY_ACCOUNT_ID: &str = "dontcare";

/// NEAR network the signing contract lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    Testnet,
}

impl NetworkId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Mainnet => "mainnet",
            NetworkId::Testnet => "testnet",
        }
    }

    /// Public JSON-RPC endpoint; `SignerTransport` implementations that talk
    /// to NEAR directly send their view calls and transactions here
    pub fn rpc_url(&self) -> &'static str {
        match self {
            NetworkId::Mainnet => "https://rpc.mainnet.near.org",
            NetworkId::Testnet => "https://rpc.testnet.near.org",
        }
    }

    /// Production signing contract on this network
    pub fn default_contract(&self) -> &'static str {
        match self {
            NetworkId::Mainnet => "v1.signer",
            NetworkId::Testnet => "v1.signer-prod.testnet",
        }
    }
}

impl FromStr for NetworkId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(NetworkId::Mainnet),
            "testnet" => Ok(NetworkId::Testnet),
            _ => Err(anyhow!("Unsupported NEAR network: {}", s)),
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account and ed25519 access key that submit signing requests
pub struct SignerSession {
    pub network: NetworkId,
    pub account_id: String,
    key: SigningKey,
}

impl SignerSession {
    /// Open a session
    ///
    /// With `account = None` the session uses [`THROWAWAY_ACCOUNT_ID`] and a
    /// fresh key from the OS RNG. That is only good for view calls; signing
    /// requests need a real funded account.
    pub fn new(network: NetworkId, account: Option<(String, SigningKey)>) -> Self {
        let (account_id, key) = account.unwrap_or_else(|| {
            (
                THROWAWAY_ACCOUNT_ID.to_string(),
                SigningKey::generate(&mut OsRng),
            )
        });

        Self {
            network,
            account_id,
            key,
        }
    }

    /// Session for an implicit account: the account id is the hex public key
    pub fn implicit(network: NetworkId, key: SigningKey) -> Self {
        let account_id = hex::encode(key.verifying_key().as_bytes());
        Self::new(network, Some((account_id, key)))
    }

    /// Parse a NEAR `ed25519:<base58>` secret key (64-byte keypair or 32-byte seed)
    pub fn parse_secret_key(encoded: &str) -> Result<SigningKey> {
        let payload = encoded
            .strip_prefix("ed25519:")
            .ok_or_else(|| anyhow!("Secret key must start with 'ed25519:'"))?;
        let bytes = bs58::decode(payload)
            .into_vec()
            .map_err(|e| anyhow!("Invalid base58 secret key: {}", e))?;

        match bytes.len() {
            32 | 64 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes[..32]);
                Ok(SigningKey::from_bytes(&seed))
            }
            n => Err(anyhow!("Invalid ed25519 secret key length: {}", n)),
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    /// Public key in NEAR's `ed25519:<base58>` form
    pub fn public_key(&self) -> String {
        format!(
            "ed25519:{}",
            bs58::encode(self.key.verifying_key().as_bytes()).into_string()
        )
    }

    pub fn is_throwaway(&self) -> bool {
        self.account_id == THROWAWAY_ACCOUNT_ID
    }
}

impl fmt::Debug for SignerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerSession")
            .field("network", &self.network)
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_is_throwaway() {
        let a = SignerSession::new(NetworkId::Testnet, None);
        let b = SignerSession::new(NetworkId::Testnet, None);

        assert!(a.is_throwaway());
        assert_eq!(a.account_id, "dontcare");
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_implicit_account_id() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let session = SignerSession::implicit(NetworkId::Testnet, key);

        assert_eq!(session.account_id.len(), 64);
        assert_eq!(
            session.account_id,
            hex::encode(session.signing_key().verifying_key().as_bytes())
        );
        assert!(!session.is_throwaway());
    }

    #[test]
    fn test_parse_secret_key() {
        let seed = [9u8; 32];
        let key = SigningKey::from_bytes(&seed);
        let mut keypair = seed.to_vec();
        keypair.extend_from_slice(key.verifying_key().as_bytes());

        let encoded = format!("ed25519:{}", bs58::encode(&keypair).into_string());
        let parsed = SignerSession::parse_secret_key(&encoded).unwrap();
        assert_eq!(parsed.to_bytes(), seed);

        assert!(SignerSession::parse_secret_key("secp256k1:abc").is_err());
    }

    #[test]
    fn test_network_defaults() {
        assert_eq!("testnet".parse::<NetworkId>().unwrap(), NetworkId::Testnet);
        assert_eq!(NetworkId::Mainnet.default_contract(), "v1.signer");
        assert_eq!(NetworkId::Testnet.rpc_url(), "https://rpc.testnet.near.org");
        assert!("betanet".parse::<NetworkId>().is_err());
    }
}
