use anyhow::{Context, Result};
use chainsig_client::ConfigFile;
use chainsig_core::{
    derive_bitcoin_address, derive_evm_address, root_key_to_compressed_hex,
    root_key_to_uncompressed_hex, to_rsv, verify, BitcoinAddressType, BitcoinNetwork,
    DerivationPath, MpcSignature, RsvSignature, VConvention,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::Path;

const DEFAULT_CONFIG: &str = "chainsig.toml";

#[derive(Parser)]
#[command(name = "chainsig")]
#[command(about = "Offline chain signatures key derivation and signature checks", long_about = None)]
struct Cli {
    /// Config file (falls back to CHAINSIG_CONFIG, then ./chainsig.toml if present)
    #[arg(short, long, global = true, env = "CHAINSIG_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a network-native root key as SEC1 points
    RootKey {
        /// Root key (`secp256k1:<base58>`); defaults to [near] root_public_key
        key: Option<String>,
    },

    /// Derive the address a signer controls at a path
    Derive {
        #[command(flatten)]
        path: PathArgs,

        /// Root key (`secp256k1:<base58>`); defaults to [near] root_public_key
        #[arg(long)]
        root_key: Option<String>,

        /// Requesting account; defaults to [near] signer_id
        #[arg(long)]
        signer: Option<String>,

        #[arg(long, value_enum, default_value = "evm")]
        target: Target,

        /// Bitcoin network; defaults to [bitcoin] network
        #[arg(long)]
        network: Option<String>,

        /// legacy or segwit; defaults to [bitcoin] address_type
        #[arg(long)]
        address_type: Option<String>,
    },

    /// Check an MPC signature against an EVM address
    Verify {
        /// 32-byte message hash (hex)
        #[arg(long)]
        hash: String,

        /// Signature JSON: `{"big_r":..,"s":..,"recovery_id":..}` or `{"r":..,"s":..,"v":..}`
        #[arg(long)]
        signature: String,

        /// Expected EVM address
        #[arg(long)]
        address: String,
    },
}

#[derive(Args)]
struct PathArgs {
    /// SLIP-44 coin type
    #[arg(long, default_value = "60")]
    chain: u32,

    #[arg(long)]
    domain: Option<String>,

    /// JSON object of scalar values
    #[arg(long)]
    meta: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Evm,
    Bitcoin,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::RootKey { key } => root_key(&required(key, &config, root_key_from)?),
        Commands::Derive {
            path,
            root_key,
            signer,
            target,
            network,
            address_type,
        } => {
            let root = required(root_key, &config, root_key_from)?;
            let signer = required(signer, &config, signer_from)?;
            let path = path.into_path()?;

            match target {
                Target::Evm => derive_evm(&root, &signer, &path),
                Target::Bitcoin => {
                    let network = bitcoin_network(network, &config)?;
                    let address_type = bitcoin_address_type(address_type, &config)?;
                    derive_bitcoin(&root, &signer, &path, network, address_type)
                }
            }
        }
        Commands::Verify {
            hash,
            signature,
            address,
        } => verify_signature(&hash, &signature, &address),
    }
}

fn load_config(path: Option<&str>) -> Result<Option<ConfigFile>> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (DEFAULT_CONFIG, false),
    };

    if !explicit && !Path::new(path).exists() {
        tracing::debug!("No config file at {}, using command line only", path);
        return Ok(None);
    }

    tracing::info!("Loading configuration from: {}", path);
    let config = ConfigFile::load(path)?;
    config.validate()?;
    Ok(Some(config))
}

fn root_key_from(config: &ConfigFile) -> Option<String> {
    config.near.root_public_key.clone()
}

fn signer_from(config: &ConfigFile) -> Option<String> {
    config.near.signer_id.clone()
}

fn required(
    value: Option<String>,
    config: &Option<ConfigFile>,
    from_config: fn(&ConfigFile) -> Option<String>,
) -> Result<String> {
    value
        .or_else(|| config.as_ref().and_then(from_config))
        .context("Missing value: pass it on the command line or set it in the config file")
}

fn bitcoin_network(flag: Option<String>, config: &Option<ConfigFile>) -> Result<BitcoinNetwork> {
    match (flag, config) {
        (Some(network), _) => Ok(network.parse()?),
        (None, Some(config)) => config.bitcoin.network(),
        (None, None) => Ok(BitcoinNetwork::Testnet),
    }
}

fn bitcoin_address_type(
    flag: Option<String>,
    config: &Option<ConfigFile>,
) -> Result<BitcoinAddressType> {
    match (flag, config) {
        (Some(address_type), _) => Ok(address_type.parse()?),
        (None, Some(config)) => config.bitcoin.address_type(),
        (None, None) => Ok(BitcoinAddressType::default()),
    }
}

impl PathArgs {
    fn into_path(self) -> Result<DerivationPath> {
        let mut path = DerivationPath::new(self.chain);
        path.domain = self.domain;
        if let Some(meta) = self.meta {
            path.meta = Some(serde_json::from_str(&meta).context("--meta must be a JSON object")?);
        }
        path.validate()?;
        Ok(path)
    }
}

fn root_key(key: &str) -> Result<()> {
    println!("uncompressed: {}", root_key_to_uncompressed_hex(key)?);
    println!("compressed:   {}", root_key_to_compressed_hex(key)?);
    Ok(())
}

fn derive_evm(root: &str, signer: &str, path: &DerivationPath) -> Result<()> {
    tracing::info!("Deriving EVM address for {} at {}", signer, path);
    let derived = derive_evm_address(root, signer, path)?;

    println!("path:       {}", path);
    println!("address:    {}", derived.address);
    println!("public key: {}", derived.public_key);
    Ok(())
}

fn derive_bitcoin(
    root: &str,
    signer: &str,
    path: &DerivationPath,
    network: BitcoinNetwork,
    address_type: BitcoinAddressType,
) -> Result<()> {
    tracing::info!(
        "Deriving {} {} address for {} at {}",
        network,
        address_type,
        signer,
        path
    );
    let derived = derive_bitcoin_address(root, signer, path, network, address_type)?;

    println!("path:       {}", path);
    println!("address:    {}", derived.address);
    println!("public key: {}", derived.public_key);
    Ok(())
}

fn parse_signature(json: &str) -> Result<RsvSignature> {
    if let Ok(mpc) = serde_json::from_str::<MpcSignature>(json) {
        return Ok(to_rsv(&mpc));
    }
    serde_json::from_str::<RsvSignature>(json).context("Signature is neither MPC nor RSV JSON")
}

fn verify_signature(hash_hex: &str, signature: &str, address: &str) -> Result<()> {
    let hash: [u8; 32] = hex::decode(hash_hex.trim_start_matches("0x"))
        .context("Invalid hash hex")?
        .as_slice()
        .try_into()
        .context("Hash must be 32 bytes")?;

    let rsv = parse_signature(signature)?;
    let verified = verify(&hash, &rsv, address)?;

    println!("r: 0x{}", rsv.r);
    println!("s: 0x{}", rsv.s);
    println!(
        "v: {} (ecrecover: {})",
        rsv.v_for(VConvention::Parity)?,
        rsv.v_for(VConvention::Legacy)?
    );

    if verified {
        println!("✅ Signature recovers to {}", address);
        Ok(())
    } else {
        anyhow::bail!("Signature does not recover to {}", address)
    }
}
