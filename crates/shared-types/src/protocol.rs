//! # Protocol Parameters
//!
//! Immutable per-version constants. Built once and threaded through the
//! constructors of every versioned component; tests build their own
//! instance instead of mutating a shared one.

use serde::{Deserialize, Serialize};

/// Protocol constants of one protocol version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParameters {
    /// Multihash algorithm code used for every hash (18 = sha2-256).
    pub hash_algorithm_in_multihash_code: u64,
    /// Longest accepted CAS URI.
    pub max_cas_uri_length: usize,
    pub max_core_index_file_size_in_bytes: usize,
    pub max_provisional_index_file_size_in_bytes: usize,
    /// Applies to both core and provisional proof files.
    pub max_proof_file_size_in_bytes: usize,
    pub max_chunk_file_size_in_bytes: usize,
    /// Canonical size limit of one delta.
    pub max_delta_size_in_bytes: usize,
    pub max_writer_lock_id_in_bytes: usize,
    /// Operation quota of a writer with no value-time-lock.
    pub max_number_of_operations_for_no_value_time_lock: u64,
    pub max_number_of_operations_per_transaction_time: u64,
    pub max_number_of_transactions_per_transaction_time: u64,
    /// Largest operation count a single anchor string may declare.
    pub max_operations_per_batch: u64,
    pub normalized_fee_to_per_operation_fee_multiplier: f64,
    /// Lock amount per operation, in multiples of the per-operation fee.
    pub value_time_lock_amount_multiplier: u64,
    /// Bound on decompressed size as a multiple of the compressed ceiling.
    pub estimated_decompression_multiplier: usize,
    /// Confirmations the previous batch needs before the next one is written.
    pub min_confirmations_before_next_batch: u64,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            hash_algorithm_in_multihash_code: 18,
            max_cas_uri_length: 100,
            max_core_index_file_size_in_bytes: 1_000_000,
            max_provisional_index_file_size_in_bytes: 1_000_000,
            max_proof_file_size_in_bytes: 2_500_000,
            max_chunk_file_size_in_bytes: 10_000_000,
            max_delta_size_in_bytes: 1_000,
            max_writer_lock_id_in_bytes: 200,
            max_number_of_operations_for_no_value_time_lock: 100,
            max_number_of_operations_per_transaction_time: 600_000,
            max_number_of_transactions_per_transaction_time: 300,
            max_operations_per_batch: 10_000,
            normalized_fee_to_per_operation_fee_multiplier: 0.01,
            value_time_lock_amount_multiplier: 600,
            estimated_decompression_multiplier: 3,
            min_confirmations_before_next_batch: 6,
        }
    }
}

impl ProtocolParameters {
    /// Small limits so tests can hit every ceiling cheaply.
    pub fn for_testing() -> Self {
        Self {
            max_number_of_operations_for_no_value_time_lock: 10,
            max_number_of_operations_per_transaction_time: 50,
            max_number_of_transactions_per_transaction_time: 5,
            max_operations_per_batch: 100,
            ..Self::default()
        }
    }

    /// Largest decompressed size accepted for a file whose compressed ceiling is `max_file_size`.
    pub fn max_decompressed_size(&self, max_file_size: usize) -> usize {
        max_file_size.saturating_mul(self.estimated_decompression_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ProtocolParameters::default();
        assert_eq!(params.hash_algorithm_in_multihash_code, 18);
        assert_eq!(params.max_number_of_operations_for_no_value_time_lock, 100);
        assert_eq!(params.min_confirmations_before_next_batch, 6);
        assert_eq!(params.max_decompressed_size(1_000), 3_000);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let params: ProtocolParameters =
            serde_json::from_str(r#"{"max_operations_per_batch": 42}"#).unwrap();
        assert_eq!(params.max_operations_per_batch, 42);
        assert_eq!(params.max_cas_uri_length, 100);
    }

    #[test]
    fn test_for_testing_is_tighter() {
        let params = ProtocolParameters::for_testing();
        assert!(
            params.max_number_of_transactions_per_transaction_time
                < ProtocolParameters::default().max_number_of_transactions_per_transaction_time
        );
    }
}
