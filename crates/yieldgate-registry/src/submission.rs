//! Claim submission input.

use serde::{Deserialize, Serialize};
use yieldgate_types::constants::ATTESTATION_FEE;
use yieldgate_types::Amount;

use crate::{RegistryError, Result};

/// Maximum asset identifier length in bytes.
pub const MAX_ASSET_ID_LEN: usize = 64;

/// Maximum period label length in bytes.
pub const MAX_PERIOD_LEN: usize = 32;

/// Maximum document reference length in bytes.
pub const MAX_DOCUMENT_HASH_LEN: usize = 128;

/// The issuer-supplied fields of a new claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub asset_id: String,
    pub period: String,
    pub yield_amount: u64,
    pub document_hash: String,
}

impl ClaimSubmission {
    /// Check the submission fields.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::EmptyAssetId`], [`RegistryError::EmptyPeriod`],
    ///   [`RegistryError::EmptyDocumentHash`] on blank fields
    /// - [`RegistryError::FieldTooLong`] on oversized fields
    /// - [`RegistryError::InvalidYieldAmount`] if `yield_amount` is zero
    pub fn validate(&self) -> Result<()> {
        if self.asset_id.trim().is_empty() {
            return Err(RegistryError::EmptyAssetId);
        }
        check_len("asset_id", &self.asset_id, MAX_ASSET_ID_LEN)?;
        if self.period.trim().is_empty() {
            return Err(RegistryError::EmptyPeriod);
        }
        check_len("period", &self.period, MAX_PERIOD_LEN)?;
        if self.yield_amount == 0 {
            return Err(RegistryError::InvalidYieldAmount);
        }
        if self.document_hash.trim().is_empty() {
            return Err(RegistryError::EmptyDocumentHash);
        }
        check_len("document_hash", &self.document_hash, MAX_DOCUMENT_HASH_LEN)?;
        Ok(())
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(RegistryError::FieldTooLong { field, max });
    }
    Ok(())
}

/// Check that `paid` is exactly the attestation fee.
///
/// # Errors
///
/// - [`RegistryError::InsufficientFee`] if underpaid
/// - [`RegistryError::ExcessFee`] if overpaid
pub fn check_fee(paid: Amount) -> Result<()> {
    match paid.cmp(&ATTESTATION_FEE) {
        std::cmp::Ordering::Less => Err(RegistryError::InsufficientFee {
            required: ATTESTATION_FEE,
            paid,
        }),
        std::cmp::Ordering::Greater => Err(RegistryError::ExcessFee {
            required: ATTESTATION_FEE,
            paid,
        }),
        std::cmp::Ordering::Equal => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ClaimSubmission {
        ClaimSubmission {
            asset_id: "BOND-2031".to_string(),
            period: "2025-Q4".to_string(),
            yield_amount: 525,
            document_hash: "bafy-statement".to_string(),
        }
    }

    #[test]
    fn test_valid_submission() {
        valid().validate().expect("valid");
    }

    #[test]
    fn test_blank_asset_id() {
        let mut s = valid();
        s.asset_id = "   ".to_string();
        assert_eq!(s.validate(), Err(RegistryError::EmptyAssetId));
    }

    #[test]
    fn test_zero_yield() {
        let mut s = valid();
        s.yield_amount = 0;
        assert_eq!(s.validate(), Err(RegistryError::InvalidYieldAmount));
    }

    #[test]
    fn test_oversized_document_hash() {
        let mut s = valid();
        s.document_hash = "x".repeat(MAX_DOCUMENT_HASH_LEN + 1);
        assert_eq!(
            s.validate(),
            Err(RegistryError::FieldTooLong {
                field: "document_hash",
                max: MAX_DOCUMENT_HASH_LEN
            })
        );
    }

    #[test]
    fn test_fee_must_be_exact() {
        check_fee(ATTESTATION_FEE).expect("exact fee");
        assert!(matches!(
            check_fee(ATTESTATION_FEE - 1),
            Err(RegistryError::InsufficientFee { .. })
        ));
        assert!(matches!(
            check_fee(ATTESTATION_FEE + 1),
            Err(RegistryError::ExcessFee { .. })
        ));
        assert!(matches!(
            check_fee(0),
            Err(RegistryError::InsufficientFee { paid: 0, .. })
        ));
    }
}
