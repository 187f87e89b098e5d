//! Epsilon derivation
//!
//! A child key is the parent point shifted by `epsilon * G`, where epsilon is
//! a SHA3-256 hash of the requesting account and its canonical path. The MPC
//! network applies the same shift to its secret shares, so anyone can compute
//! the child public key without talking to the network.

use bitcoin::secp256k1::constants::CURVE_ORDER;
use bitcoin::secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use sha3::{Digest, Sha3_256};

use crate::error::{Error, Result};
use crate::key_format::{parse_point_hex, to_compressed_hex, to_uncompressed_hex};
use crate::path::DerivationPath;

/// Domain separation prefix; must match the MPC network byte for byte
pub const EPSILON_DERIVATION_PREFIX: &str = "near-mpc-recovery v0.1.0 epsilon derivation:";

/// Hash `(signer_id, canonical_path)` into a non-zero scalar mod n
pub fn derive_epsilon(signer_id: &str, canonical_path: &str) -> Result<Scalar> {
    let mut hasher = Sha3_256::new();
    hasher.update(EPSILON_DERIVATION_PREFIX.as_bytes());
    hasher.update(signer_id.as_bytes());
    hasher.update(b",");
    hasher.update(canonical_path.as_bytes());

    let mut bytes: [u8; 32] = hasher.finalize().into();
    reduce_mod_order(&mut bytes);

    if bytes == [0u8; 32] {
        return Err(Error::InvalidScalar);
    }

    Scalar::from_be_bytes(bytes).map_err(|_| Error::InvalidScalar)
}

/// `parent + epsilon(signer_id, path) * G`
pub fn derive_child_public_key(
    parent: &PublicKey,
    signer_id: &str,
    path: &DerivationPath,
) -> Result<PublicKey> {
    path.validate()?;
    derive_child_public_key_raw(parent, signer_id, &path.canonicalize())
}

/// Same as [`derive_child_public_key`] for a path that is already a string
pub fn derive_child_public_key_raw(
    parent: &PublicKey,
    signer_id: &str,
    canonical_path: &str,
) -> Result<PublicKey> {
    let epsilon = derive_epsilon(signer_id, canonical_path)?;
    let secp = Secp256k1::verification_only();

    // Only fails when parent == -epsilon * G
    parent
        .add_exp_tweak(&secp, &epsilon)
        .map_err(|_| Error::DegenerateDerivation)
}

/// Derive from an uncompressed hex parent, returning an uncompressed hex child
pub fn derive_child_public_key_uncompressed(
    parent_uncompressed_hex: &str,
    signer_id: &str,
    path: &DerivationPath,
) -> Result<String> {
    let parent = parse_point_hex(parent_uncompressed_hex)?;
    derive_child_public_key(&parent, signer_id, path).map(|child| to_uncompressed_hex(&child))
}

/// Derive from a compressed hex parent, returning a compressed hex child
pub fn derive_child_public_key_compressed(
    parent_compressed_hex: &str,
    signer_id: &str,
    path: &DerivationPath,
) -> Result<String> {
    let parent = parse_point_hex(parent_compressed_hex)?;
    derive_child_public_key(&parent, signer_id, path).map(|child| to_compressed_hex(&child))
}

/// Private-side twin of [`derive_child_public_key`]: `parent + epsilon mod n`
pub fn derive_child_secret_key(
    parent: &SecretKey,
    signer_id: &str,
    path: &DerivationPath,
) -> Result<SecretKey> {
    path.validate()?;
    let epsilon = derive_epsilon(signer_id, &path.canonicalize())?;
    parent
        .add_tweak(&epsilon)
        .map_err(|_| Error::DegenerateDerivation)
}

/// SHA3 output is below 2^256 < 2n, so a single conditional subtraction reduces it
fn reduce_mod_order(bytes: &mut [u8; 32]) {
    if bytes[..] < CURVE_ORDER[..] {
        return;
    }

    let mut borrow = 0u16;
    for i in (0..32).rev() {
        let lhs = bytes[i] as u16;
        let rhs = CURVE_ORDER[i] as u16 + borrow;
        if lhs >= rhs {
            bytes[i] = (lhs - rhs) as u8;
            borrow = 0;
        } else {
            bytes[i] = (lhs + 0x100 - rhs) as u8;
            borrow = 1;
        }
    }
}
