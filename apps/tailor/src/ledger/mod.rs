//! Job Ledger: the persistent table of job records and their one-way status.
//!
//! The controller only sees the `Ledger` trait, so the CSV backing store can be
//! swapped for an embedded database without touching the pipeline.
//! Single writer per run; no locking.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::JobRecord;

pub mod csv_ledger;

pub use csv_ledger::CsvLedger;

/// Columns every ledger table must carry.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "CompanyName",
    "JobTitle",
    "JobDescription",
    "Language",
    "Status",
];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger file '{0}' not found")]
    Missing(String),

    #[error("could not read ledger '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ledger: {0}")]
    Csv(#[from] csv::Error),

    #[error("ledger header is missing column '{0}'")]
    MissingColumn(String),
}

/// Result of a status commit. Commits never raise; failures are logged and
/// reported here so the caller can decide what to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Updated,
    KeyNotFound,
    Unavailable(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Every record whose status is empty or whitespace-only, in file order.
    /// A ledger that cannot be read is fatal for the whole run.
    async fn list_pending(&self) -> Result<Vec<JobRecord>, LedgerError>;

    /// Sets the status of the unique row keyed by (company, title).
    /// All other rows are left byte-identical.
    async fn commit_status(&self, company: &str, title: &str, new_status: &str) -> CommitOutcome;
}
