//! Engine error model.

use thiserror::Error;

use stockroom_auth::AuthzError;
use stockroom_core::DomainError;

use crate::ledger::LedgerError;
use crate::unit::UnitKey;

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Every failure surfaces synchronously to the caller; nothing is retried.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The acting principal lacks the stock-management capability.
    #[error("permission denied: {0}")]
    PermissionDenied(#[from] AuthzError),

    /// Malformed input, rejected before the ledger is touched.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The ledger count after registration does not match what was written.
    #[error("inventory anomaly detected for {key}: expected {expected} units, found {found}")]
    Anomaly {
        key: UnitKey,
        expected: u64,
        found: u64,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Domain(DomainError),
}

impl InventoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<DomainError> for InventoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            other => Self::Domain(other),
        }
    }
}
