//! Chain-specific address derivation
//!
//! Child keys are curve points only; this module turns them into addresses.
//! EVM addresses use the uncompressed key. Legacy Bitcoin addresses hash
//! whichever encoding the caller hands over; segwit always hashes the
//! compressed one.

use std::fmt;
use std::str::FromStr;

use bitcoin::secp256k1::PublicKey;
use bitcoin::{Address, CompressedPublicKey, Network};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};
use crate::kdf::derive_child_public_key;
use crate::key_format::{decode_root_key, parse_point_hex, to_compressed_hex, to_uncompressed_hex};
use crate::path::DerivationPath;

/// Bitcoin network selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
}

impl BitcoinNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            BitcoinNetwork::Mainnet => "mainnet",
            BitcoinNetwork::Testnet => "testnet",
        }
    }

    /// P2PKH version byte
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            BitcoinNetwork::Mainnet => 0x00,
            BitcoinNetwork::Testnet => 0x6f,
        }
    }

    /// Bech32 human-readable prefix
    pub fn hrp(&self) -> &'static str {
        match self {
            BitcoinNetwork::Mainnet => "bc",
            BitcoinNetwork::Testnet => "tb",
        }
    }

    pub fn network(&self) -> Network {
        match self {
            BitcoinNetwork::Mainnet => Network::Bitcoin,
            BitcoinNetwork::Testnet => Network::Testnet,
        }
    }
}

impl FromStr for BitcoinNetwork {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(BitcoinNetwork::Mainnet),
            "testnet" => Ok(BitcoinNetwork::Testnet),
            _ => Err(Error::UnsupportedNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for BitcoinNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitcoin address format selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinAddressType {
    /// P2PKH, Base58Check
    Legacy,
    /// P2WPKH, Bech32 witness v0
    #[default]
    Segwit,
}

impl BitcoinAddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BitcoinAddressType::Legacy => "legacy",
            BitcoinAddressType::Segwit => "segwit",
        }
    }
}

impl FromStr for BitcoinAddressType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "legacy" | "p2pkh" => Ok(BitcoinAddressType::Legacy),
            "segwit" | "p2wpkh" => Ok(BitcoinAddressType::Segwit),
            _ => Err(Error::UnsupportedAddressType(s.to_string())),
        }
    }
}

impl fmt::Display for BitcoinAddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived address together with the child key it was computed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub address: String,
    pub public_key: String,
}

/// EVM address: last 20 bytes of keccak256(X || Y), lowercase, `0x`-prefixed
pub fn evm_address(point: &PublicKey) -> String {
    let uncompressed = point.serialize_uncompressed();
    let hash = Keccak256::digest(&uncompressed[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// EVM address from a hex point in either encoding
pub fn evm_address_from_hex(point_hex: &str) -> Result<String> {
    parse_point_hex(point_hex).map(|point| evm_address(&point))
}

/// Bitcoin address for a key, honouring the key's compression flag
///
/// Legacy addresses hash whichever encoding the key carries. Segwit v0
/// always commits to the compressed encoding of the point.
pub fn bitcoin_address(
    key: &bitcoin::PublicKey,
    network: BitcoinNetwork,
    address_type: BitcoinAddressType,
) -> Result<String> {
    let address = match address_type {
        BitcoinAddressType::Legacy => Address::p2pkh(key.pubkey_hash(), network.network()),
        BitcoinAddressType::Segwit => {
            Address::p2wpkh(&CompressedPublicKey(key.inner), network.network())
        }
    };

    Ok(address.to_string())
}

/// Bitcoin address from a hex point; the hex encoding picks the compression flag
pub fn bitcoin_address_from_hex(
    point_hex: &str,
    network: BitcoinNetwork,
    address_type: BitcoinAddressType,
) -> Result<String> {
    let point = parse_point_hex(point_hex)?;
    let compressed = point_hex.trim_start_matches("0x").len() == 66;
    let key = bitcoin::PublicKey {
        compressed,
        inner: point,
    };
    bitcoin_address(&key, network, address_type)
}

/// Derive the EVM address controlled by `signer_id` at `path`
pub fn derive_evm_address(
    root_public_key: &str,
    signer_id: &str,
    path: &DerivationPath,
) -> Result<DerivedAddress> {
    let root = decode_root_key(root_public_key)?;
    let child = derive_child_public_key(&root, signer_id, path)?;

    Ok(DerivedAddress {
        address: evm_address(&child),
        public_key: to_uncompressed_hex(&child),
    })
}

/// Derive the Bitcoin address controlled by `signer_id` at `path`
pub fn derive_bitcoin_address(
    root_public_key: &str,
    signer_id: &str,
    path: &DerivationPath,
    network: BitcoinNetwork,
    address_type: BitcoinAddressType,
) -> Result<DerivedAddress> {
    let root = decode_root_key(root_public_key)?;
    let child = derive_child_public_key(&root, signer_id, path)?;
    let address = bitcoin_address(&bitcoin::PublicKey::new(child), network, address_type)?;

    Ok(DerivedAddress {
        address,
        public_key: to_compressed_hex(&child),
    })
}
