//! # Core Domain Entities
//!
//! The data model shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Ledger**: `TransactionModel`, `LedgerTime`, `ValueTimeLock`, `BlockMetadata`
//! - **Operations**: `OperationType`, `AnchoredOperationModel`, `QueuedOperation`
//! - **Bookkeeping**: `ConfirmationRecord`, `UnresolvableTransaction`
//! - **Resolution**: `DidState`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorCode, SidetreeError};

/// Ledger time (block height).
pub type TransactionTime = u64;

/// Globally unique, monotonically increasing ledger transaction number.
pub type TransactionNumber = u64;

// =============================================================================
// CLUSTER A: LEDGER
// =============================================================================

/// One ledger transaction carrying an anchor string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionModel {
    /// Ledger-wide transaction number.
    pub transaction_number: TransactionNumber,
    /// Ledger time the transaction was included at.
    pub transaction_time: TransactionTime,
    /// Hash of the block at `transaction_time`.
    pub transaction_time_hash: String,
    /// `<coreIndexFileUri>.<numberOfOperations>`
    pub anchor_string: String,
    /// Fee the writer actually paid.
    pub transaction_fee_paid: u64,
    /// Normalized fee at `transaction_time`, filled in by the ledger client.
    pub normalized_transaction_fee: Option<u64>,
    /// Writer identity (address of the paying key).
    pub writer: String,
}

/// A ledger time together with its block hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTime {
    pub time: TransactionTime,
    pub hash: String,
}

/// Ledger collateral that raises the operation quota of its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueTimeLock {
    pub identifier: String,
    pub amount_locked: u64,
    /// First ledger time the lock is active (inclusive).
    pub lock_transaction_time: TransactionTime,
    /// Ledger time the lock expires (exclusive).
    pub unlock_transaction_time: TransactionTime,
    /// Normalized fee at the time the lock was created.
    pub normalized_fee: u64,
    pub owner: String,
}

/// Per-block bookkeeping written by the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub height: TransactionTime,
    pub hash: String,
    pub transaction_count: u64,
}

// =============================================================================
// CLUSTER B: OPERATIONS
// =============================================================================

/// The four operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Recover,
    Deactivate,
}

impl OperationType {
    /// Wire name of the operation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Recover => "recover",
            Self::Deactivate => "deactivate",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = SidetreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "recover" => Ok(Self::Recover),
            "deactivate" => Ok(Self::Deactivate),
            other => Err(SidetreeError::new(
                ErrorCode::OperationTypeUnknown,
                format!("unknown operation type '{other}'"),
            )),
        }
    }
}

/// A fully materialized operation extracted from a validated batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoredOperationModel {
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub did_unique_suffix: String,
    /// JSON operation request; `delta` is absent when the chunk file was unavailable.
    pub operation_buffer: Vec<u8>,
    pub transaction_time: TransactionTime,
    pub transaction_number: TransactionNumber,
    /// Position within the transaction (create, recover, deactivate, update order).
    pub operation_index: u32,
}

impl AnchoredOperationModel {
    /// Global total order of anchored operations.
    pub fn ordering_key(&self) -> (TransactionTime, TransactionNumber, u32) {
        (
            self.transaction_time,
            self.transaction_number,
            self.operation_index,
        )
    }
}

/// An operation waiting in the batch writer's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedOperation {
    pub did_unique_suffix: String,
    pub operation_buffer: Vec<u8>,
}

// =============================================================================
// CLUSTER C: BOOKKEEPING
// =============================================================================

/// Submission/confirmation state of one anchor string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRecord {
    pub anchor_string: String,
    pub submitted_at: TransactionTime,
    pub confirmed_at: Option<TransactionTime>,
}

/// Retry bookkeeping for a transaction whose files could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvableTransaction {
    pub transaction: TransactionModel,
    /// Wall-clock millis of the first failed fetch.
    pub first_fetch_time: u64,
    pub retry_attempts: u32,
    /// Wall-clock millis before which no retry is due.
    pub next_retry_time: u64,
}

// =============================================================================
// CLUSTER D: RESOLUTION
// =============================================================================

/// Accumulated state of one DID during resolution.
///
/// Both commitments absent means the DID is deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidState {
    pub document: Value,
    pub next_recovery_commitment_hash: Option<String>,
    pub next_update_commitment_hash: Option<String>,
    pub last_operation_transaction_number: TransactionNumber,
}

impl DidState {
    /// Whether a deactivate operation has been applied.
    pub fn is_deactivated(&self) -> bool {
        self.next_recovery_commitment_hash.is_none() && self.next_update_commitment_hash.is_none()
    }
}
