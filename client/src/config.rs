use anyhow::{Context, Result};
use chainsig_core::{BitcoinAddressType, BitcoinNetwork};
use serde::Deserialize;
use std::fs;

use crate::session::NetworkId;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub near: NearConfig,
    #[serde(default)]
    pub bitcoin: BitcoinConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NearConfig {
    pub network: String, // "mainnet" or "testnet"

    // Defaults to the production signer of `network`
    #[serde(default)]
    pub contract: Option<String>,

    // Skips the `public_key` view call when set
    #[serde(default)]
    pub root_public_key: Option<String>,

    #[serde(default)]
    pub signer_id: Option<String>,

    #[serde(default)]
    pub relayer_url: Option<String>,

    // yoctoNEAR as a decimal string; TOML integers stop at i64
    #[serde(default)]
    pub deposit: Option<String>,
}

impl NearConfig {
    pub fn network_id(&self) -> Result<NetworkId> {
        self.network.parse()
    }

    pub fn contract_id(&self) -> Result<String> {
        match &self.contract {
            Some(contract) => Ok(contract.clone()),
            None => Ok(self.network_id()?.default_contract().to_string()),
        }
    }

    pub fn deposit_yocto(&self) -> Result<Option<u128>> {
        self.deposit
            .as_deref()
            .map(|d| {
                d.parse::<u128>()
                    .context(format!("Invalid deposit amount: {}", d))
            })
            .transpose()
    }

    pub fn contract_config(&self) -> Result<ContractConfig> {
        Ok(ContractConfig {
            contract_id: self.contract_id()?,
            network: self.network_id()?,
            root_public_key: self.root_public_key.clone(),
            relayer_url: self.relayer_url.clone(),
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BitcoinConfig {
    #[serde(default = "default_bitcoin_network")]
    pub network: String, // "mainnet" or "testnet"
    #[serde(default = "default_address_type")]
    pub address_type: String, // "legacy" or "segwit"
}

impl Default for BitcoinConfig {
    fn default() -> Self {
        Self {
            network: default_bitcoin_network(),
            address_type: default_address_type(),
        }
    }
}

impl BitcoinConfig {
    pub fn network(&self) -> Result<BitcoinNetwork> {
        Ok(self.network.parse()?)
    }

    pub fn address_type(&self) -> Result<BitcoinAddressType> {
        Ok(self.address_type.parse()?)
    }
}

fn default_bitcoin_network() -> String {
    "testnet".to_string()
}

fn default_address_type() -> String {
    "segwit".to_string()
}

/// One target deployment of the signing contract
#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub contract_id: String,
    pub network: NetworkId,
    pub root_public_key: Option<String>,
    pub relayer_url: Option<String>,
}

impl ContractConfig {
    pub fn new(network: NetworkId) -> Self {
        Self {
            contract_id: network.default_contract().to_string(),
            network,
            root_public_key: None,
            relayer_url: None,
        }
    }
}

impl ConfigFile {
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn validate(&self) -> Result<()> {
        self.near.network_id()?;
        self.near.deposit_yocto()?;

        if let Some(root) = &self.near.root_public_key {
            chainsig_core::decode_root_key(root)
                .context("Invalid [near] root_public_key")?;
        }

        self.bitcoin
            .network()
            .context("Invalid [bitcoin] network")?;
        self.bitcoin
            .address_type()
            .context("Invalid [bitcoin] address_type")?;

        Ok(())
    }
}
