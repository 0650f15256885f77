//! CBOR encoding for ledger snapshots.

use serde::{de::DeserializeOwned, Serialize};

use crate::{DbError, Result};

/// Serialize a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if the value cannot be serialized.
pub fn to_vec<T: Serialize>(value: &T, type_name: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| {
        DbError::Serialization(format!("CBOR serialization of {type_name} failed: {e}"))
    })?;
    Ok(buf)
}

/// Deserialize a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if the bytes do not decode into `T`.
pub fn from_slice<T: DeserializeOwned>(data: &[u8], type_name: &str) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| {
        DbError::Serialization(format!("CBOR deserialization of {type_name} failed: {e}"))
    })
}
