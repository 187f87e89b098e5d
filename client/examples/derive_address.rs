// Example: Derive chain addresses without calling the signing contract
// Run with: cargo run --example derive_address

use anyhow::Result;
use chainsig_client::core::{
    derive_bitcoin_address, derive_evm_address, BitcoinAddressType, BitcoinNetwork,
    DerivationPath,
};

fn main() -> Result<()> {
    println!("=== Chain Signatures - Local Address Derivation ===\n");

    // Root key as returned by the contract's `public_key` view call
    let root = "secp256k1:56GEyBH7shhM95SDPWowsz8F3D6oVbdjFHA9jgWhwsWVkPEAWbmCFTxC3NMDgSLdNSCPL4RKiXZLYDZnEQCvrvjb";
    let signer_id = "alice.testnet";

    let eth_path = DerivationPath::new(60).with_domain("m/44'/60'/0'/0/0");
    let btc_path = DerivationPath::new(0).with_domain("m/84'/0'/0'/0/0");

    println!("Signer:   {}", signer_id);
    println!("EVM path: {}", eth_path);
    println!("BTC path: {}\n", btc_path);

    let evm = derive_evm_address(root, signer_id, &eth_path)?;
    println!("EVM address:     {}", evm.address);
    println!("  child key:     {}\n", evm.public_key);

    for address_type in [BitcoinAddressType::Legacy, BitcoinAddressType::Segwit] {
        let btc = derive_bitcoin_address(
            root,
            signer_id,
            &btc_path,
            BitcoinNetwork::Testnet,
            address_type,
        )?;
        println!("BTC {:<7} address: {}", address_type.as_str(), btc.address);
    }
    println!();

    println!("✅ Addresses derived locally from the root key");
    println!("✅ The MPC network signs for exactly these addresses");

    Ok(())
}
