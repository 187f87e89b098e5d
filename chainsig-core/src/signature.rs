//! MPC signature normalization and verification
//!
//! The signing contract returns `big_r` as a compressed point and `s` as a
//! scalar. Chain verifiers want `(r, s, v)`. `r` is the X coordinate of
//! `big_r`, `v` is the recovery id.

use bitcoin::secp256k1::constants::CURVE_ORDER;
use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use bitcoin::secp256k1::{Message, Secp256k1};
use serde::{Deserialize, Serialize};

use crate::address::evm_address;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinePoint {
    pub affine_point: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableScalar {
    pub scalar: String,
}

/// Signature as returned by the MPC signing contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcSignature {
    pub big_r: AffinePoint,
    pub s: SerializableScalar,
    pub recovery_id: u8,
}

/// Recoverable signature; `r` and `s` are 32-byte hex scalars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

/// How `v` is presented to a downstream verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VConvention {
    /// 0 / 1 (typed transactions, y-parity)
    Parity,
    /// 27 / 28 (`ecrecover`, legacy transactions)
    Legacy,
}

const LEGACY_V_OFFSET: u8 = 27;

/// Representation change only; never fails
pub fn to_rsv(signature: &MpcSignature) -> RsvSignature {
    RsvSignature {
        r: signature
            .big_r
            .affine_point
            .get(2..)
            .unwrap_or_default()
            .to_lowercase(),
        s: signature.s.scalar.to_lowercase(),
        v: signature.recovery_id,
    }
}

impl From<&MpcSignature> for RsvSignature {
    fn from(signature: &MpcSignature) -> Self {
        to_rsv(signature)
    }
}

impl RsvSignature {
    /// Recovery id in {0, 1}, accepting either convention on input
    pub fn recovery_id(&self) -> Result<u8> {
        match self.v {
            0 | 1 => Ok(self.v),
            27 | 28 => Ok(self.v - LEGACY_V_OFFSET),
            v => Err(Error::InvalidSignatureEncoding(format!(
                "v must be 0, 1, 27 or 28, got {}",
                v
            ))),
        }
    }

    pub fn v_for(&self, convention: VConvention) -> Result<u8> {
        let parity = self.recovery_id()?;
        Ok(match convention {
            VConvention::Parity => parity,
            VConvention::Legacy => parity + LEGACY_V_OFFSET,
        })
    }

    /// `r || s || v` as consumed by `ecrecover`-style verifiers
    pub fn to_bytes(&self, convention: VConvention) -> Result<[u8; 65]> {
        let compact = self.compact()?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = self.v_for(convention)?;
        Ok(out)
    }

    fn compact(&self) -> Result<[u8; 64]> {
        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&parse_scalar("r", &self.r)?);
        compact[32..].copy_from_slice(&parse_scalar("s", &self.s)?);
        Ok(compact)
    }
}

/// Recover the EVM address that produced `signature` over `message_hash`
///
/// Returns `Ok(None)` when the signature is well-formed but no key recovers
/// from it.
pub fn recover_address(message_hash: &[u8; 32], signature: &RsvSignature) -> Result<Option<String>> {
    let compact = signature.compact()?;
    let recovery_id = RecoveryId::from_i32(i32::from(signature.recovery_id()?))
        .map_err(|e| Error::InvalidSignatureEncoding(format!("recovery id: {}", e)))?;
    let recoverable = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|e| Error::InvalidSignatureEncoding(e.to_string()))?;

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*message_hash);

    Ok(secp
        .recover_ecdsa(&message, &recoverable)
        .ok()
        .map(|key| evm_address(&key)))
}

/// True iff `signature` over `message_hash` recovers to `expected_address`
pub fn verify(
    message_hash: &[u8; 32],
    signature: &RsvSignature,
    expected_address: &str,
) -> Result<bool> {
    let recovered = recover_address(message_hash, signature)?;
    Ok(recovered
        .map(|address| address.eq_ignore_ascii_case(expected_address.trim()))
        .unwrap_or(false))
}

/// [`verify`] straight from the contract's wire format
pub fn verify_mpc_signature(
    message_hash: &[u8; 32],
    signature: &MpcSignature,
    expected_address: &str,
) -> Result<bool> {
    verify(message_hash, &to_rsv(signature), expected_address)
}

fn parse_scalar(name: &str, scalar_hex: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(scalar_hex.trim_start_matches("0x"))
        .map_err(|e| Error::InvalidSignatureEncoding(format!("{} is not hex: {}", name, e)))?;

    let scalar: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        Error::InvalidSignatureEncoding(format!("{} must be 32 bytes, got {}", name, bytes.len()))
    })?;

    if scalar == [0u8; 32] {
        return Err(Error::InvalidSignatureEncoding(format!("{} is zero", name)));
    }
    if scalar[..] >= CURVE_ORDER[..] {
        return Err(Error::InvalidSignatureEncoding(format!(
            "{} is not below the curve order",
            name
        )));
    }

    Ok(scalar)
}
