//! # Protocol Versions
//!
//! Maps ledger-time ranges to the concrete component set of a protocol
//! version. A version applies from its `starting_time` until the next
//! version's `starting_time`; lookups pick the last version whose
//! `starting_time` is not after the requested time.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::{AnchoredOperationModel, DidState, TransactionModel, TransactionTime};
use crate::errors::{ErrorCode, SidetreeError};
use crate::protocol::ProtocolParameters;
use crate::Result;

/// Turns one anchored transaction into stored operations.
#[async_trait]
pub trait TransactionProcessor: Send + Sync {
    /// Returns `true` when the transaction is done with (processed or
    /// discarded), `false` when it must be retried later.
    async fn process_transaction(&self, transaction: &TransactionModel) -> bool;
}

/// Picks the transactions of one ledger time that fit the throughput caps.
#[async_trait]
pub trait TransactionSelector: Send + Sync {
    /// All input transactions must share one `transaction_time`.
    async fn select_qualified_transactions(
        &self,
        transactions: Vec<TransactionModel>,
    ) -> Result<Vec<TransactionModel>>;
}

/// Applies one anchored operation to a DID state.
pub trait OperationProcessor: Send + Sync {
    /// `Ok(None)` when the operation does not apply to `did_state`.
    /// `Err` only for invariant violations.
    fn apply(
        &self,
        operation: &AnchoredOperationModel,
        did_state: Option<&DidState>,
    ) -> Result<Option<DidState>>;

    /// Reveal value carried by a recover, deactivate or update operation.
    fn get_reveal_value(&self, operation: &AnchoredOperationModel) -> Result<String>;
}

/// Writes one batch of queued operations.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Number of operations anchored; `0` when nothing was written.
    async fn write(&self) -> Result<usize>;
}

/// Component set of one protocol version.
#[derive(Clone)]
pub struct ProtocolVersion {
    pub starting_time: TransactionTime,
    pub version: String,
    pub parameters: Arc<ProtocolParameters>,
    pub transaction_processor: Option<Arc<dyn TransactionProcessor>>,
    pub transaction_selector: Option<Arc<dyn TransactionSelector>>,
    pub operation_processor: Option<Arc<dyn OperationProcessor>>,
    pub batch_writer: Option<Arc<dyn BatchWriter>>,
}

impl ProtocolVersion {
    pub fn new(
        starting_time: TransactionTime,
        version: impl Into<String>,
        parameters: Arc<ProtocolParameters>,
    ) -> Self {
        Self {
            starting_time,
            version: version.into(),
            parameters,
            transaction_processor: None,
            transaction_selector: None,
            operation_processor: None,
            batch_writer: None,
        }
    }

    pub fn with_transaction_processor(mut self, processor: Arc<dyn TransactionProcessor>) -> Self {
        self.transaction_processor = Some(processor);
        self
    }

    pub fn with_transaction_selector(mut self, selector: Arc<dyn TransactionSelector>) -> Self {
        self.transaction_selector = Some(selector);
        self
    }

    pub fn with_operation_processor(mut self, processor: Arc<dyn OperationProcessor>) -> Self {
        self.operation_processor = Some(processor);
        self
    }

    pub fn with_batch_writer(mut self, writer: Arc<dyn BatchWriter>) -> Self {
        self.batch_writer = Some(writer);
        self
    }
}

impl fmt::Debug for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolVersion")
            .field("starting_time", &self.starting_time)
            .field("version", &self.version)
            .field("transaction_processor", &self.transaction_processor.is_some())
            .field("transaction_selector", &self.transaction_selector.is_some())
            .field("operation_processor", &self.operation_processor.is_some())
            .field("batch_writer", &self.batch_writer.is_some())
            .finish()
    }
}

/// Ordered lookup table of protocol versions.
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    versions: Vec<ProtocolVersion>,
}

impl VersionRegistry {
    pub fn new(mut versions: Vec<ProtocolVersion>) -> Self {
        versions.sort_by_key(|v| v.starting_time);
        Self { versions }
    }

    pub fn versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    /// Version in force at `time`.
    pub fn get_version(&self, time: TransactionTime) -> Result<&ProtocolVersion> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.starting_time <= time)
            .ok_or_else(|| {
                SidetreeError::new(
                    ErrorCode::VersionNotFoundForTime,
                    format!("no protocol version defined for time {time}"),
                )
            })
    }

    pub fn get_parameters(&self, time: TransactionTime) -> Result<Arc<ProtocolParameters>> {
        Ok(self.get_version(time)?.parameters.clone())
    }

    pub fn get_transaction_processor(
        &self,
        time: TransactionTime,
    ) -> Result<Arc<dyn TransactionProcessor>> {
        let version = self.get_version(time)?;
        version
            .transaction_processor
            .clone()
            .ok_or_else(|| missing_component(version, "transaction processor"))
    }

    pub fn get_transaction_selector(
        &self,
        time: TransactionTime,
    ) -> Result<Arc<dyn TransactionSelector>> {
        let version = self.get_version(time)?;
        version
            .transaction_selector
            .clone()
            .ok_or_else(|| missing_component(version, "transaction selector"))
    }

    pub fn get_operation_processor(
        &self,
        time: TransactionTime,
    ) -> Result<Arc<dyn OperationProcessor>> {
        let version = self.get_version(time)?;
        version
            .operation_processor
            .clone()
            .ok_or_else(|| missing_component(version, "operation processor"))
    }

    pub fn get_batch_writer(&self, time: TransactionTime) -> Result<Arc<dyn BatchWriter>> {
        let version = self.get_version(time)?;
        version
            .batch_writer
            .clone()
            .ok_or_else(|| missing_component(version, "batch writer"))
    }
}

fn missing_component(version: &ProtocolVersion, component: &str) -> SidetreeError {
    SidetreeError::new(
        ErrorCode::VersionComponentMissing,
        format!("protocol version {} has no {component}", version.version),
    )
}
