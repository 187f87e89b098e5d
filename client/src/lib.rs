pub mod config;
pub mod contract;
pub mod relayer;
pub mod session;

// Re-export commonly used items

pub use config::{BitcoinConfig, ConfigFile, ContractConfig, NearConfig};
pub use contract::{
    ChainSignatures, ChainSignaturesContract, SignArgs, SignCall, SignRequest, SignerTransport,
    KEY_VERSION, NEAR_MAX_GAS,
};
pub use relayer::parse_sign_outcome;
pub use session::{NetworkId, SignerSession, THROWAWAY_ACCOUNT_ID};

pub use chainsig_core as core;
