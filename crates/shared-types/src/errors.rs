//! # Error Types
//!
//! A single error type, [`SidetreeError`], crosses every subsystem boundary.
//! It carries a stable [`ErrorCode`] so callers can classify failures
//! without string matching:
//!
//! | Class | Meaning | Handling |
//! |-------|---------|----------|
//! | structural | malformed or protocol-violating content | discard, never retry |
//! | availability | CAS/ledger/store could not be reached | retry later |
//! | fork signal | ledger reports an unknown transaction/time hash | reorg recovery |
//! | invariant | unexpected internal state | log at error, halt the unit of work |

use std::fmt;

use thiserror::Error;

macro_rules! error_codes {
    ($($(#[$meta:meta])* $name:ident => $text:literal,)*) => {
        /// Stable error codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($(#[$meta])* $name,)*
        }

        impl ErrorCode {
            /// Stable string form of the code.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$name => $text,)*
                }
            }
        }
    };
}

error_codes! {
    // Anchor string
    AnchoredDataIncorrectFormat => "anchored_data_incorrect_format",
    AnchoredDataNumberOfOperationsNotNonNegativeInteger =>
        "anchored_data_number_of_operations_not_non_negative_integer",

    // CAS
    CasFileNotFound => "cas_file_not_found",
    CasNotReachable => "cas_not_reachable",
    CasFileTooLarge => "cas_file_too_large",
    CasFileNotAFile => "cas_file_not_a_file",
    CasFileHashMismatch => "cas_file_hash_mismatch",
    CasFileUriNotValid => "cas_file_uri_not_valid",

    // Operation references shared by index files
    OperationReferenceMissingOrUnknownProperty => "operation_reference_missing_or_unknown_property",
    OperationReferenceDidSuffixInvalid => "operation_reference_did_suffix_invalid",
    OperationReferenceRevealValueInvalid => "operation_reference_reveal_value_invalid",

    // Core index file
    CoreIndexFileDecompressionFailure => "core_index_file_decompression_failure",
    CoreIndexFileNotJson => "core_index_file_not_json",
    CoreIndexFileHasUnknownProperty => "core_index_file_has_unknown_property",
    CoreIndexFileWriterLockIdInvalid => "core_index_file_writer_lock_id_invalid",
    CoreIndexFileOperationsPropertyNotObject => "core_index_file_operations_property_not_object",
    CoreIndexFileUnexpectedPropertyInOperations =>
        "core_index_file_unexpected_property_in_operations",
    CoreIndexFileCreatePropertyNotArray => "core_index_file_create_property_not_array",
    CoreIndexFileRecoverPropertyNotArray => "core_index_file_recover_property_not_array",
    CoreIndexFileDeactivatePropertyNotArray => "core_index_file_deactivate_property_not_array",
    CoreIndexFileCreateEntryInvalid => "core_index_file_create_entry_invalid",
    CoreIndexFileMultipleOperationsForTheSameDid =>
        "core_index_file_multiple_operations_for_the_same_did",
    CoreIndexFileProvisionalIndexFileUriMissing =>
        "core_index_file_provisional_index_file_uri_missing",
    CoreIndexFileCoreProofFileUriMissing => "core_index_file_core_proof_file_uri_missing",
    CoreIndexFileCoreProofFileUriNotAllowed => "core_index_file_core_proof_file_uri_not_allowed",
    CoreIndexFileOperationCountExceededPaidLimit =>
        "core_index_file_operation_count_exceeded_paid_limit",

    // Provisional index file
    ProvisionalIndexFileDecompressionFailure => "provisional_index_file_decompression_failure",
    ProvisionalIndexFileNotJson => "provisional_index_file_not_json",
    ProvisionalIndexFileHasUnknownProperty => "provisional_index_file_has_unknown_property",
    ProvisionalIndexFileChunksPropertyDoesNotHaveExactlyOneElement =>
        "provisional_index_file_chunks_property_does_not_have_exactly_one_element",
    ProvisionalIndexFileChunkHasMissingOrUnknownProperty =>
        "provisional_index_file_chunk_has_missing_or_unknown_property",
    ProvisionalIndexFileOperationsPropertyHasMissingOrUnknownProperty =>
        "provisional_index_file_operations_property_has_missing_or_unknown_property",
    ProvisionalIndexFileUpdateOperationsNotArray =>
        "provisional_index_file_update_operations_not_array",
    ProvisionalIndexFileMultipleOperationsForTheSameDid =>
        "provisional_index_file_multiple_operations_for_the_same_did",
    ProvisionalIndexFileProvisionalProofFileUriNotAllowed =>
        "provisional_index_file_provisional_proof_file_uri_not_allowed",
    ProvisionalIndexFileProvisionalProofFileUriMissing =>
        "provisional_index_file_provisional_proof_file_uri_missing",
    ProvisionalIndexFileUpdateOperationCountGreaterThanMaxPaidCount =>
        "provisional_index_file_update_operation_count_greater_than_max_paid_count",
    ProvisionalIndexFileDidReferenceDuplicatedWithCoreIndexFile =>
        "provisional_index_file_did_reference_duplicated_with_core_index_file",

    // Chunk file
    ChunkFileDecompressionFailure => "chunk_file_decompression_failure",
    ChunkFileNotJson => "chunk_file_not_json",
    ChunkFileUnexpectedProperty => "chunk_file_unexpected_property",
    ChunkFileDeltasPropertyNotArray => "chunk_file_deltas_property_not_array",
    ChunkFileDeltasNotArrayOfObjects => "chunk_file_deltas_not_array_of_objects",
    ChunkFileDeltaCountIncorrect => "chunk_file_delta_count_incorrect",

    // Core proof file
    CoreProofFileDecompressionFailure => "core_proof_file_decompression_failure",
    CoreProofFileNotJson => "core_proof_file_not_json",
    CoreProofFileHasUnknownProperty => "core_proof_file_has_unknown_property",
    CoreProofFileOperationsPropertyHasMissingOrUnknownProperty =>
        "core_proof_file_operations_property_has_missing_or_unknown_property",
    CoreProofFileRecoverPropertyNotArray => "core_proof_file_recover_property_not_array",
    CoreProofFileDeactivatePropertyNotArray => "core_proof_file_deactivate_property_not_array",
    CoreProofFileHasNoProofs => "core_proof_file_has_no_proofs",
    CoreProofFileDeactivateDidSuffixMismatch => "core_proof_file_deactivate_did_suffix_mismatch",
    CoreProofFileProofCountNotTheSameAsOperationCountInCoreIndexFile =>
        "core_proof_file_proof_count_not_the_same_as_operation_count_in_core_index_file",

    // Provisional proof file
    ProvisionalProofFileDecompressionFailure => "provisional_proof_file_decompression_failure",
    ProvisionalProofFileNotJson => "provisional_proof_file_not_json",
    ProvisionalProofFileHasUnknownProperty => "provisional_proof_file_has_unknown_property",
    ProvisionalProofFileOperationsPropertyHasMissingOrUnknownProperty =>
        "provisional_proof_file_operations_property_has_missing_or_unknown_property",
    ProvisionalProofFileUpdatePropertyNotArray =>
        "provisional_proof_file_update_property_not_array",
    ProvisionalProofFileHasNoProofs => "provisional_proof_file_has_no_proofs",
    ProvisionalProofFileProofCountNotTheSameAsOperationCountInProvisionalIndexFile =>
        "provisional_proof_file_proof_count_not_the_same_as_operation_count_in_provisional_index_file",

    // Proof entries shared by both proof files
    ProofFileEntryHasMissingOrUnknownProperty => "proof_file_entry_has_missing_or_unknown_property",

    // Fees and value-time-locks
    OperationCountNotPositive => "operation_count_not_positive",
    TransactionFeePaidLessThanNormalizedFee => "transaction_fee_paid_less_than_normalized_fee",
    TransactionFeePaidInvalid => "transaction_fee_paid_invalid",
    ValueTimeLockOwnerMismatch => "value_time_lock_owner_mismatch",
    ValueTimeLockTransactionTimeOutsideLockRange =>
        "value_time_lock_transaction_time_outside_lock_range",
    ValueTimeLockInvalidNumberOfOperations => "value_time_lock_invalid_number_of_operations",

    // Transaction processing
    TransactionProcessorPaidOperationCountExceedsLimit =>
        "transaction_processor_paid_operation_count_exceeds_limit",
    TransactionNormalizedFeeMissing => "transaction_normalized_fee_missing",
    TransactionSelectorMixedTransactionTimes => "transaction_selector_mixed_transaction_times",

    // Operations
    OperationNotJson => "operation_not_json",
    OperationMissingOrUnknownProperty => "operation_missing_or_unknown_property",
    OperationTypeUnknown => "operation_type_unknown",
    OperationTypeMismatch => "operation_type_mismatch",
    OperationDidSuffixInvalid => "operation_did_suffix_invalid",
    OperationRevealValueMismatch => "operation_reveal_value_mismatch",
    OperationSignedDataInvalid => "operation_signed_data_invalid",
    DeltaExceedsMaximumSize => "delta_exceeds_maximum_size",
    DeltaMissingOrUnknownProperty => "delta_missing_or_unknown_property",
    SuffixDataMissingOrUnknownProperty => "suffix_data_missing_or_unknown_property",
    EncodedMultihashInvalid => "encoded_multihash_invalid",
    CanonicalizationFailed => "canonicalization_failed",

    // Signed data (JWS / JWK)
    JwsCompactFormatInvalid => "jws_compact_format_invalid",
    JwsProtectedHeaderInvalid => "jws_protected_header_invalid",
    JwsPayloadNotJson => "jws_payload_not_json",
    JwsSignatureInvalid => "jws_signature_invalid",
    JwkEs256kInvalid => "jwk_es256k_invalid",
    JwkHasPrivateKey => "jwk_has_private_key",

    // Document composer
    DocumentComposerPatchMissingOrUnknownAction =>
        "document_composer_patch_missing_or_unknown_action",
    DocumentComposerPatchMissingOrUnknownProperty =>
        "document_composer_patch_missing_or_unknown_property",
    DocumentComposerDocumentMissingOrUnknownProperty =>
        "document_composer_document_missing_or_unknown_property",
    DocumentComposerIdTooLong => "document_composer_id_too_long",
    DocumentComposerIdNotBase64Url => "document_composer_id_not_base64url",
    DocumentComposerDuplicateId => "document_composer_duplicate_id",
    DocumentComposerPublicKeyInvalid => "document_composer_public_key_invalid",
    DocumentComposerPublicKeyPurposesInvalid => "document_composer_public_key_purposes_invalid",
    DocumentComposerServiceInvalid => "document_composer_service_invalid",
    DocumentComposerServiceTypeTooLong => "document_composer_service_type_too_long",
    DocumentComposerServiceEndpointInvalid => "document_composer_service_endpoint_invalid",

    // Ledger
    InvalidTransactionNumberOrTimeHash => "invalid_transaction_number_or_time_hash",
    LedgerNotReachable => "ledger_not_reachable",
    LedgerWriteRejected => "ledger_write_rejected",

    // Stores and queue
    StoreOperationFailed => "store_operation_failed",
    OperationQueueDuplicateDid => "operation_queue_duplicate_did",

    // Observer
    ObserverTransactionProcessingAborted => "observer_transaction_processing_aborted",

    // Versioning
    VersionNotFoundForTime => "version_not_found_for_time",
    VersionComponentMissing => "version_component_missing",
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carried across every subsystem boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct SidetreeError {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl SidetreeError {
    /// Create an error with a detail message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an error whose message is the code itself.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.as_str().to_string(),
        }
    }

    /// Transient failure of an external collaborator; the work should be retried.
    pub fn is_availability(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::CasFileNotFound
                | ErrorCode::CasNotReachable
                | ErrorCode::LedgerNotReachable
                | ErrorCode::StoreOperationFailed
        )
    }

    /// The ledger no longer recognizes a transaction this node has stored.
    pub fn is_fork_signal(&self) -> bool {
        self.code == ErrorCode::InvalidTransactionNumberOrTimeHash
    }

    /// Programming error or unexpected internal state.
    pub fn is_invariant(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::OperationTypeUnknown
                | ErrorCode::OperationTypeMismatch
                | ErrorCode::TransactionNormalizedFeeMissing
                | ErrorCode::TransactionSelectorMixedTransactionTimes
                | ErrorCode::ObserverTransactionProcessingAborted
                | ErrorCode::VersionNotFoundForTime
                | ErrorCode::VersionComponentMissing
                | ErrorCode::CanonicalizationFailed
        )
    }

    /// Malformed or protocol-violating content: discard, never retry.
    pub fn is_structural(&self) -> bool {
        !self.is_availability() && !self.is_fork_signal() && !self.is_invariant()
    }
}

impl From<ErrorCode> for SidetreeError {
    fn from(code: ErrorCode) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_contains_code() {
        let err = SidetreeError::new(ErrorCode::CoreIndexFileNotJson, "bad input");
        assert_eq!(err.to_string(), "core_index_file_not_json: bad input");
    }

    #[test]
    fn test_from_code() {
        let err: SidetreeError = ErrorCode::CasNotReachable.into();
        assert_eq!(err.message, "cas_not_reachable");
    }

    #[test]
    fn test_classification() {
        assert!(SidetreeError::from_code(ErrorCode::CasFileNotFound).is_availability());
        let fork = SidetreeError::from_code(ErrorCode::InvalidTransactionNumberOrTimeHash);
        assert!(fork.is_fork_signal());
        assert!(SidetreeError::from_code(ErrorCode::OperationTypeUnknown).is_invariant());

        let structural = SidetreeError::from_code(ErrorCode::ChunkFileDeltaCountIncorrect);
        assert!(structural.is_structural());
        assert!(!structural.is_availability());
    }

    #[test]
    fn test_classes_are_disjoint() {
        for code in [
            ErrorCode::CasNotReachable,
            ErrorCode::InvalidTransactionNumberOrTimeHash,
            ErrorCode::VersionNotFoundForTime,
            ErrorCode::CoreIndexFileHasUnknownProperty,
        ] {
            let err = SidetreeError::from_code(code);
            let classes = [
                err.is_availability(),
                err.is_fork_signal(),
                err.is_invariant(),
                err.is_structural(),
            ];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "{code}");
        }
    }
}
