//! Derivation paths and their canonical serialization
//!
//! The MPC contract treats the path as an opaque string, so two paths only
//! derive the same key when their canonical JSON is byte-identical. The
//! canonical form follows JSON canonicalization (RFC 8785): sorted keys, no
//! whitespace, `null`/absent top-level fields dropped.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// SLIP-44 coin types used by the supported chains
pub mod slip44 {
    pub const BITCOIN: u32 = 0;
    pub const ETHEREUM: u32 = 60;
    pub const COSMOS: u32 = 118;
}

/// Key derivation path sent alongside every signing request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivationPath {
    pub chain: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl DerivationPath {
    pub fn new(chain: u32) -> Self {
        Self {
            chain,
            domain: None,
            meta: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Check that `meta` only maps to scalar values
    pub fn validate(&self) -> Result<()> {
        if let Some(meta) = &self.meta {
            for (key, value) in meta {
                if value.is_array() || value.is_object() {
                    return Err(Error::MalformedPath(format!(
                        "meta.{} must be a string, number or bool",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    /// Canonical JSON string fed to epsilon derivation and to the contract
    pub fn canonicalize(&self) -> String {
        let mut fields = Map::new();
        fields.insert("chain".to_string(), Value::from(self.chain));
        if let Some(domain) = &self.domain {
            fields.insert("domain".to_string(), Value::String(domain.clone()));
        }
        if let Some(meta) = &self.meta {
            fields.insert("meta".to_string(), Value::Object(meta.clone()));
        }

        let mut out = String::new();
        write_canonical(&Value::Object(fields), &mut out);
        out
    }
}

impl PartialEq for DerivationPath {
    fn eq(&self, other: &Self) -> bool {
        self.canonicalize() == other.canonicalize()
    }
}

impl Eq for DerivationPath {}

impl Hash for DerivationPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonicalize().hash(state);
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonicalize())
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&canonical_number(n)),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Keys compare by UTF-16 code units, not by UTF-8 bytes
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| utf16_cmp(a, b));

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json escapes exactly the characters JSON canonicalization requires
    out.push_str(&Value::String(s.to_owned()).to_string());
}

fn canonical_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i128),
        _ => n.to_string(),
    }
}

fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
