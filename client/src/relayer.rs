//! Relayed signing requests
//!
//! When a sign call goes through a meta-transaction relayer, the signature
//! comes back buried in the receipt outcomes of the relayed transaction as a
//! base64 `SuccessValue` holding `{"Ok": <MpcSignature>}`.

use anyhow::{Context, Result};
use base64::prelude::*;
use chainsig_core::MpcSignature;
use serde::Deserialize;

#[derive(Deserialize)]
enum SignOutcome {
    Ok(MpcSignature),
}

/// Pull the signature out of a relayed transaction's receipt outcomes
///
/// `success_values` are the receipts' `SuccessValue` fields in execution
/// order; the first non-empty one carries the contract's return value.
pub fn parse_sign_outcome<'a, I>(success_values: I) -> Result<MpcSignature>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let encoded = success_values
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .context("Signature error, please retry: no receipt returned a value")?;

    let decoded = BASE64_STANDARD
        .decode(encoded)
        .context("Failed to decode receipt SuccessValue")?;

    let SignOutcome::Ok(signature) =
        serde_json::from_slice::<SignOutcome>(&decoded).context("Failed to parse sign outcome")?;

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTCOME: &str = r#"{"Ok":{"big_r":{"affine_point":"02AB"},"s":{"scalar":"CD"},"recovery_id":1}}"#;

    #[test]
    fn test_first_non_empty_value_wins() {
        let encoded = BASE64_STANDARD.encode(OUTCOME);
        let values = [None, Some(""), Some(encoded.as_str()), Some("bm9pc2U=")];

        let signature = parse_sign_outcome(values).unwrap();
        assert_eq!(signature.big_r.affine_point, "02AB");
        assert_eq!(signature.s.scalar, "CD");
        assert_eq!(signature.recovery_id, 1);
    }

    #[test]
    fn test_no_value_is_an_error() {
        assert!(parse_sign_outcome([None, Some("")]).is_err());
    }

    #[test]
    fn test_error_outcome_is_rejected() {
        let encoded = BASE64_STANDARD.encode(r#"{"Err":"timeout"}"#);
        assert!(parse_sign_outcome([Some(encoded.as_str())]).is_err());
    }
}
