//! Canonical serialization and checksums.
//!
//! The canonical form is JSON text with object keys sorted lexicographically
//! at every nesting level, no insignificant whitespace, array order kept,
//! `null` kept and absent fields omitted. Two values with the same content
//! produce the same bytes no matter how they were built, so a hash of the
//! canonical text is a reliable divergence detector between the server and
//! client mirrors.
//!
//! These functions are pure and only ever read the value they are given.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GameError, Result};

/// Convert a value into its JSON tree.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| GameError::Serialization(e.to_string()))
}

/// Canonical text of a JSON tree.
pub fn write_canonical(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&scalar_text(&Value::String(key.clone()))?);
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar_text(scalar)?),
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| GameError::Serialization(e.to_string()))
}

/// Canonical text of any serializable value.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    write_canonical(&to_value(value)?)
}

/// Re-canonicalize JSON text produced elsewhere.
pub fn canonicalize_json(text: &str) -> Result<String> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| GameError::Serialization(e.to_string()))?;
    write_canonical(&value)
}

/// Hash of a canonical form, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateChecksum(String);

impl StateChecksum {
    /// Hash canonical text.
    #[must_use]
    pub fn of_canonical(text: &str) -> Self {
        Self(blake3::hash(text.as_bytes()).to_hex().to_string())
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a checksum reported by another participant.
    pub fn verify_against(&self, remote: &str, cycle: u64) -> Result<()> {
        if self.0 == remote {
            Ok(())
        } else {
            Err(GameError::DesyncDetected {
                cycle,
                local: self.0.clone(),
                remote: remote.to_string(),
            })
        }
    }
}

impl fmt::Display for StateChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checksum of the canonical form of a value.
pub fn checksum<T: Serialize + ?Sized>(value: &T) -> Result<StateChecksum> {
    to_canonical_string(value).map(|text| StateChecksum::of_canonical(&text))
}
