//! Root key encodings
//!
//! The signing contract publishes its root key as `secp256k1:<base58(X || Y)>`.
//! Everything downstream works on SEC1 points, either uncompressed
//! (`04 || X || Y`) or compressed (`02/03 || X`).

use bitcoin::secp256k1::PublicKey;

use crate::error::{Error, Result};

/// Curve identifier in the network-native key string
pub const ROOT_KEY_CURVE: &str = "secp256k1";

const CURVE_SEPARATOR: char = ':';
const RAW_POINT_LEN: usize = 64;
const UNCOMPRESSED_LEN: usize = 65;
const COMPRESSED_LEN: usize = 33;
const UNCOMPRESSED_PREFIX: u8 = 0x04;

/// Decode a network-native root key (`secp256k1:<base58>`) into a curve point
pub fn decode_root_key(encoded: &str) -> Result<PublicKey> {
    let (curve, payload) = encoded.split_once(CURVE_SEPARATOR).ok_or_else(|| {
        Error::MalformedKey(format!("missing curve prefix in root key {:?}", encoded))
    })?;

    if curve != ROOT_KEY_CURVE {
        return Err(Error::MalformedKey(format!(
            "unsupported curve {:?}, expected {}",
            curve, ROOT_KEY_CURVE
        )));
    }

    let raw = bs58::decode(payload)
        .into_vec()
        .map_err(|e| Error::MalformedKey(format!("invalid base58 payload: {}", e)))?;

    if raw.len() != RAW_POINT_LEN {
        return Err(Error::MalformedKey(format!(
            "root key payload must be {} bytes, got {}",
            RAW_POINT_LEN,
            raw.len()
        )));
    }

    let mut point = [0u8; UNCOMPRESSED_LEN];
    point[0] = UNCOMPRESSED_PREFIX;
    point[1..].copy_from_slice(&raw);

    PublicKey::from_slice(&point)
        .map_err(|e| Error::InvalidPoint(format!("root key is not on secp256k1: {}", e)))
}

/// Encode a point in the network-native root key format
pub fn encode_root_key(point: &PublicKey) -> String {
    let uncompressed = point.serialize_uncompressed();
    format!(
        "{}{}{}",
        ROOT_KEY_CURVE,
        CURVE_SEPARATOR,
        bs58::encode(&uncompressed[1..]).into_string()
    )
}

/// Network-native root key to an uncompressed hex point (`04...`)
pub fn root_key_to_uncompressed_hex(encoded: &str) -> Result<String> {
    decode_root_key(encoded).map(|point| to_uncompressed_hex(&point))
}

/// Network-native root key to a compressed hex point (`02...` / `03...`)
pub fn root_key_to_compressed_hex(encoded: &str) -> Result<String> {
    decode_root_key(encoded).map(|point| to_compressed_hex(&point))
}

/// Parse a hex SEC1 point, compressed or uncompressed
pub fn parse_point_hex(point_hex: &str) -> Result<PublicKey> {
    let bytes = hex::decode(point_hex.trim_start_matches("0x"))
        .map_err(|e| Error::MalformedKey(format!("invalid point hex: {}", e)))?;

    match (bytes.len(), bytes.first().copied()) {
        (UNCOMPRESSED_LEN, Some(UNCOMPRESSED_PREFIX)) | (COMPRESSED_LEN, Some(0x02 | 0x03)) => {}
        (len, prefix) => {
            return Err(Error::MalformedKey(format!(
                "expected 33-byte compressed or 65-byte uncompressed point, got {} bytes with prefix {:02x?}",
                len, prefix
            )))
        }
    }

    PublicKey::from_slice(&bytes).map_err(|e| Error::InvalidPoint(format!("{}: {}", point_hex, e)))
}

pub fn to_uncompressed_hex(point: &PublicKey) -> String {
    hex::encode(point.serialize_uncompressed())
}

pub fn to_compressed_hex(point: &PublicKey) -> String {
    hex::encode(point.serialize())
}

/// Re-encode an uncompressed hex point as compressed
pub fn compress_hex(uncompressed_hex: &str) -> Result<String> {
    parse_point_hex(uncompressed_hex).map(|point| to_compressed_hex(&point))
}

/// Re-encode a compressed hex point as uncompressed
pub fn decompress_hex(compressed_hex: &str) -> Result<String> {
    parse_point_hex(compressed_hex).map(|point| to_uncompressed_hex(&point))
}
