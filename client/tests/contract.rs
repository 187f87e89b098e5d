//! `ChainSignaturesContract` against a transport that signs locally
//!
//! The fixture transport holds the root secret and applies the same epsilon
//! shift the MPC network does, so signatures it returns must verify against
//! addresses derived purely from the public root key.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chainsig_client::core::secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use chainsig_client::core::{
    derive_child_secret_key, encode_root_key, AffinePoint, BitcoinAddressType, BitcoinNetwork,
    DerivationPath, MpcSignature, SerializableScalar,
};
use chainsig_client::{
    ChainSignatures, ChainSignaturesContract, ContractConfig, NetworkId, SignCall, SignRequest,
    SignerSession, SignerTransport, NEAR_MAX_GAS,
};
use ed25519_dalek::SigningKey;

const ROOT_SECRET: &str = "e01a79d4530481763905c87ea5bb7cad0e4a50be8abf457536e7a4f07d243b2d";
const SIGNER: &str = "alice.testnet";

#[derive(Clone, Copy)]
enum Fee {
    Quoted(u128),
    Unset,
    Unavailable,
}

struct LocalSigner {
    root: SecretKey,
    fail: bool,
    fee: Fee,
    public_key_calls: AtomicUsize,
    last_request: Mutex<Option<(SignRequest, u64, u128, String)>>,
}

impl LocalSigner {
    fn new() -> Self {
        Self {
            root: SecretKey::from_slice(&hex::decode(ROOT_SECRET).unwrap()).unwrap(),
            fail: false,
            fee: Fee::Quoted(50),
            public_key_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn with_fee(fee: Fee) -> Self {
        Self { fee, ..Self::new() }
    }
}

#[async_trait]
impl SignerTransport for LocalSigner {
    async fn public_key(&self, _contract_id: &str) -> Result<String> {
        self.public_key_calls.fetch_add(1, Ordering::SeqCst);
        let secp = Secp256k1::new();
        Ok(encode_root_key(&PublicKey::from_secret_key(&secp, &self.root)))
    }

    async fn signature_deposit(&self, _contract_id: &str) -> Result<Option<u128>> {
        match self.fee {
            Fee::Quoted(fee) => Ok(Some(fee)),
            Fee::Unset => Ok(None),
            Fee::Unavailable => bail!("view call timed out"),
        }
    }

    async fn sign(&self, call: SignCall<'_>) -> Result<MpcSignature> {
        if self.fail {
            bail!("receipt failed: Exceeded the prepaid gas");
        }

        *self.last_request.lock().unwrap() = Some((
            call.args.request.clone(),
            call.gas,
            call.deposit,
            call.session.account_id.clone(),
        ));

        let path: DerivationPath = serde_json::from_str(&call.args.request.path)?;
        let child = derive_child_secret_key(&self.root, &call.session.account_id, &path)?;
        let payload: [u8; 32] = call.args.request.payload.as_slice().try_into()?;

        let secp = Secp256k1::new();
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&Message::from_digest(payload), &child)
            .serialize_compact();

        Ok(MpcSignature {
            big_r: AffinePoint {
                affine_point: format!("02{}", hex::encode_upper(&compact[..32])),
            },
            s: SerializableScalar {
                scalar: hex::encode_upper(&compact[32..]),
            },
            recovery_id: recovery_id.to_i32() as u8,
        })
    }
}

fn session() -> SignerSession {
    SignerSession::new(
        NetworkId::Testnet,
        Some((SIGNER.to_string(), SigningKey::from_bytes(&[3u8; 32]))),
    )
}

fn eth_path() -> DerivationPath {
    DerivationPath::new(60).with_domain("m/44'/60'/0'/0/0")
}

#[tokio::test]
async fn test_sign_then_verify() {
    let contract =
        ChainSignaturesContract::new(ContractConfig::new(NetworkId::Testnet), session(), LocalSigner::new());

    let payload = [0x24u8; 32];
    let signature = contract.sign(payload, &eth_path()).await.unwrap();

    assert!(contract.verify(&payload, &eth_path(), &signature).await.unwrap());
}

#[tokio::test]
async fn test_signature_for_other_path_is_rejected() {
    let contract =
        ChainSignaturesContract::new(ContractConfig::new(NetworkId::Testnet), session(), LocalSigner::new());

    let payload = [0x24u8; 32];
    let other = DerivationPath::new(60).with_domain("m/44'/60'/1'/0/0");
    let signature = contract.sign(payload, &other).await.unwrap();

    assert!(!contract.verify(&payload, &eth_path(), &signature).await.unwrap());
}

#[tokio::test]
async fn test_request_shape_and_deposit() {
    let contract =
        ChainSignaturesContract::new(ContractConfig::new(NetworkId::Testnet), session(), LocalSigner::new());

    contract.sign([0x01u8; 32], &eth_path()).await.unwrap();

    let (request, gas, deposit, account) = contract_last_request(&contract);
    assert_eq!(request.path, r#"{"chain":60,"domain":"m/44'/60'/0'/0/0"}"#);
    assert_eq!(request.payload, vec![0x01u8; 32]);
    assert_eq!(request.key_version, 0);
    assert_eq!(gas, NEAR_MAX_GAS);
    assert_eq!(deposit, 50);
    assert_eq!(account, SIGNER);
}

#[tokio::test]
async fn test_explicit_deposit_wins() {
    let contract =
        ChainSignaturesContract::new(ContractConfig::new(NetworkId::Testnet), session(), LocalSigner::new())
            .with_deposit(200_000_000_000_000_000_000_000);

    contract.sign([0x01u8; 32], &eth_path()).await.unwrap();

    let (_, _, deposit, _) = contract_last_request(&contract);
    assert_eq!(deposit, 200_000_000_000_000_000_000_000);
}

#[tokio::test]
async fn test_missing_fee_falls_back_to_one_yocto() {
    let contract = ChainSignaturesContract::new(
        ContractConfig::new(NetworkId::Testnet),
        session(),
        LocalSigner::with_fee(Fee::Unset),
    );

    contract.sign([0x01u8; 32], &eth_path()).await.unwrap();

    let (_, _, deposit, _) = contract_last_request(&contract);
    assert_eq!(deposit, 1);
}

#[tokio::test]
async fn test_failed_fee_lookup_aborts_sign() {
    let contract = ChainSignaturesContract::new(
        ContractConfig::new(NetworkId::Testnet),
        session(),
        LocalSigner::with_fee(Fee::Unavailable),
    );

    let err = contract.sign([0x01u8; 32], &eth_path()).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.starts_with("Failed to fetch signature deposit"));
    assert!(message.contains("view call timed out"));
    assert!(contract.transport().last_request.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_explicit_deposit_skips_fee_lookup() {
    let contract = ChainSignaturesContract::new(
        ContractConfig::new(NetworkId::Testnet),
        session(),
        LocalSigner::with_fee(Fee::Unavailable),
    )
    .with_deposit(7);

    contract.sign([0x01u8; 32], &eth_path()).await.unwrap();

    let (_, _, deposit, _) = contract_last_request(&contract);
    assert_eq!(deposit, 7);
}

#[tokio::test]
async fn test_root_key_is_fetched_once() {
    let contract =
        ChainSignaturesContract::new(ContractConfig::new(NetworkId::Testnet), session(), LocalSigner::new());

    let a = contract.derived_evm_address(&eth_path()).await.unwrap();
    let b = contract.derived_evm_address(&eth_path()).await.unwrap();

    assert_eq!(a.address, "0xce4507294724e23d6ef9064c0a8880ac5b152141");
    assert_eq!(a, b);
    assert_eq!(contract_public_key_calls(&contract), 1);
}

#[tokio::test]
async fn test_configured_root_key_skips_view_call() {
    let mut config = ContractConfig::new(NetworkId::Testnet);
    config.root_public_key = Some("secp256k1:56GEyBH7shhM95SDPWowsz8F3D6oVbdjFHA9jgWhwsWVkPEAWbmCFTxC3NMDgSLdNSCPL4RKiXZLYDZnEQCvrvjb".to_string());
    let contract = ChainSignaturesContract::new(config, session(), LocalSigner::new());

    let btc = contract
        .derived_bitcoin_address(&eth_path(), BitcoinNetwork::Testnet, BitcoinAddressType::Segwit)
        .await
        .unwrap();

    assert_eq!(btc.address, "tb1q6hh4s3qxnktds394kygr6nva3sund2sj4fkg6e");
    assert_eq!(contract_public_key_calls(&contract), 0);
}

#[tokio::test]
async fn test_transport_failure_is_reported() {
    let contract =
        ChainSignaturesContract::new(ContractConfig::new(NetworkId::Testnet), session(), LocalSigner::failing());

    let err = contract.sign([0x01u8; 32], &eth_path()).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.starts_with("Signature error, please retry"));
    assert!(message.contains("Exceeded the prepaid gas"));
}

fn contract_last_request(
    contract: &ChainSignaturesContract<LocalSigner>,
) -> (SignRequest, u64, u128, String) {
    transport(contract).last_request.lock().unwrap().clone().unwrap()
}

fn contract_public_key_calls(contract: &ChainSignaturesContract<LocalSigner>) -> usize {
    transport(contract).public_key_calls.load(Ordering::SeqCst)
}

fn transport(contract: &ChainSignaturesContract<LocalSigner>) -> &LocalSigner {
    contract.transport()
}
