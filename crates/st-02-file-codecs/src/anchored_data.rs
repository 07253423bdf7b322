//! Anchor string: `<coreIndexFileUri>.<numberOfOperations>`.

use shared_types::{ErrorCode, SidetreeError};

const DELIMITER: char = '.';

/// Data committed to by one ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredData {
    pub core_index_file_uri: String,
    pub number_of_operations: u64,
}

impl AnchoredData {
    pub fn new(core_index_file_uri: impl Into<String>, number_of_operations: u64) -> Self {
        Self {
            core_index_file_uri: core_index_file_uri.into(),
            number_of_operations,
        }
    }

    pub fn serialize(&self) -> String {
        format!(
            "{}{DELIMITER}{}",
            self.core_index_file_uri, self.number_of_operations
        )
    }

    /// Parse an anchor string. The count must be a plain non-negative
    /// integer: no sign, no leading zeros (except `0` itself).
    pub fn deserialize(anchor_string: &str) -> Result<Self, SidetreeError> {
        let parts: Vec<&str> = anchor_string.split(DELIMITER).collect();
        let [uri, count] = parts.as_slice() else {
            return Err(SidetreeError::new(
                ErrorCode::AnchoredDataIncorrectFormat,
                format!("'{anchor_string}' does not have exactly two parts"),
            ));
        };
        if uri.is_empty() {
            return Err(SidetreeError::new(
                ErrorCode::AnchoredDataIncorrectFormat,
                "core index file URI is empty",
            ));
        }

        let well_formed = !count.is_empty()
            && count.bytes().all(|b| b.is_ascii_digit())
            && (count.len() == 1 || !count.starts_with('0'));
        let number_of_operations = well_formed
            .then(|| count.parse::<u64>().ok())
            .flatten()
            .ok_or_else(|| {
                SidetreeError::new(
                    ErrorCode::AnchoredDataNumberOfOperationsNotNonNegativeInteger,
                    format!("'{count}' is not a non-negative integer"),
                )
            })?;

        Ok(Self {
            core_index_file_uri: uri.to_string(),
            number_of_operations,
        })
    }
}
