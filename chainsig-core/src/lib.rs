//! Chain signatures core
//!
//! One long-lived secp256k1 root key held by an MPC network yields a
//! deterministic child key for every `(signer_id, path)` pair. This crate
//! derives those child keys and their chain addresses offline, and checks
//! signatures the network returns against them.
//!
//! Every function is pure: no I/O, no shared state, safe to call from any
//! number of threads. Network and address-type selectors are always explicit
//! arguments.
//!
//! ```
//! use chainsig_core::{derive_evm_address, DerivationPath};
//!
//! let root = "secp256k1:56GEyBH7shhM95SDPWowsz8F3D6oVbdjFHA9jgWhwsWVkPEAWbmCFTxC3NMDgSLdNSCPL4RKiXZLYDZnEQCvrvjb";
//! let path = DerivationPath::new(60).with_domain("m/44'/60'/0'/0/0");
//!
//! let derived = derive_evm_address(root, "alice.testnet", &path).unwrap();
//! assert_eq!(derived.address, "0xce4507294724e23d6ef9064c0a8880ac5b152141");
//! ```

pub mod address;
pub mod error;
pub mod kdf;
pub mod key_format;
pub mod path;
pub mod signature;

pub use address::{
    bitcoin_address, bitcoin_address_from_hex, derive_bitcoin_address, derive_evm_address,
    evm_address, evm_address_from_hex, BitcoinAddressType, BitcoinNetwork, DerivedAddress,
};
pub use error::{Error, Result};
pub use kdf::{
    derive_child_public_key, derive_child_public_key_compressed, derive_child_public_key_raw,
    derive_child_public_key_uncompressed, derive_child_secret_key, derive_epsilon,
    EPSILON_DERIVATION_PREFIX,
};
pub use key_format::{
    compress_hex, decode_root_key, decompress_hex, encode_root_key, parse_point_hex,
    root_key_to_compressed_hex, root_key_to_uncompressed_hex, to_compressed_hex,
    to_uncompressed_hex,
};
pub use path::{slip44, DerivationPath};
pub use signature::{
    recover_address, to_rsv, verify, verify_mpc_signature, AffinePoint, MpcSignature,
    RsvSignature, SerializableScalar, VConvention,
};

// Re-exported so callers share one secp256k1 version with this crate
pub use bitcoin::secp256k1;
