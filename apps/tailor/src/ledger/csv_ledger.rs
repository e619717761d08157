//! CSV-backed ledger.
//!
//! Reads go through `csv` + serde into `JobRecord`. Commits locate the matched
//! record's byte range and splice a re-serialized copy of just that record into
//! the original bytes, then replace the file atomically.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::ledger::{CommitOutcome, Ledger, LedgerError, REQUIRED_COLUMNS};
use crate::models::JobRecord;

#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LedgerError::Missing(self.path.display().to_string()))
            }
            Err(source) => Err(LedgerError::Io {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    async fn try_commit(
        &self,
        company: &str,
        title: &str,
        new_status: &str,
    ) -> Result<bool, LedgerError> {
        let bytes = self.read_bytes().await?;
        let Some(updated) = splice_status(&bytes, company, title, new_status)? else {
            return Ok(false);
        };
        write_atomically(&self.path, updated)
            .await
            .map_err(|source| LedgerError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(true)
    }
}

#[async_trait]
impl Ledger for CsvLedger {
    async fn list_pending(&self) -> Result<Vec<JobRecord>, LedgerError> {
        let bytes = self.read_bytes().await?;
        let records = parse_records(&bytes)?;

        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert((record.company.as_str(), record.title.as_str())) {
                warn!(
                    company = %record.company,
                    title = %record.title,
                    "Duplicate ledger key; commits will only touch the first row"
                );
            }
        }

        let pending: Vec<JobRecord> = records.into_iter().filter(|r| r.is_pending()).collect();
        debug!("Ledger {} has {} pending records", self.path.display(), pending.len());
        Ok(pending)
    }

    async fn commit_status(&self, company: &str, title: &str, new_status: &str) -> CommitOutcome {
        match self.try_commit(company, title, new_status).await {
            Ok(true) => {
                info!(%company, %title, "Updated ledger status to '{new_status}'");
                CommitOutcome::Updated
            }
            Ok(false) => {
                warn!(%company, %title, "No ledger row matches; status not committed");
                CommitOutcome::KeyNotFound
            }
            Err(e) => {
                error!(%company, %title, "Could not commit ledger status: {e}");
                CommitOutcome::Unavailable(e.to_string())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ────────────────────────────────────────────────────────────────────────────

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new().flexible(true).from_reader(bytes)
}

fn column_index(headers: &csv::ByteRecord, name: &str) -> Result<usize, LedgerError> {
    headers
        .iter()
        .position(|h| h == name.as_bytes())
        .ok_or_else(|| LedgerError::MissingColumn(name.to_string()))
}

fn parse_records(bytes: &[u8]) -> Result<Vec<JobRecord>, LedgerError> {
    let mut reader = reader(bytes);
    let headers = reader.byte_headers()?.clone();
    for column in REQUIRED_COLUMNS {
        column_index(&headers, column)?;
    }
    reader
        .deserialize::<JobRecord>()
        .map(|row| row.map_err(LedgerError::from))
        .collect()
}

/// Returns the ledger bytes with the status of the first row keyed by
/// (company, title) replaced, or `None` if no row matches.
fn splice_status(
    bytes: &[u8],
    company: &str,
    title: &str,
    new_status: &str,
) -> Result<Option<Vec<u8>>, LedgerError> {
    let mut reader = reader(bytes);
    let headers = reader.byte_headers()?.clone();
    let company_idx = column_index(&headers, "CompanyName")?;
    let title_idx = column_index(&headers, "JobTitle")?;
    let status_idx = column_index(&headers, "Status")?;

    let mut record = csv::ByteRecord::new();
    loop {
        let start = reader.position().byte() as usize;
        if !reader.read_byte_record(&mut record)? {
            return Ok(None);
        }
        let end = reader.position().byte() as usize;

        let is_match = record.get(company_idx) == Some(company.as_bytes())
            && record.get(title_idx) == Some(title.as_bytes());
        if !is_match {
            continue;
        }

        let replacement = serialize_with_status(&record, status_idx, new_status)?;

        // The reported range may include line terminators on either side; keep them.
        let span = &bytes[start..end];
        let lead = span.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
        let trail = span[lead..]
            .iter()
            .rev()
            .take_while(|b| matches!(b, b'\r' | b'\n'))
            .count();
        let content_start = start + lead;
        let content_end = end - trail;

        let mut out = Vec::with_capacity(bytes.len() + new_status.len());
        out.extend_from_slice(&bytes[..content_start]);
        out.extend_from_slice(&replacement);
        out.extend_from_slice(&bytes[content_end..]);
        return Ok(Some(out));
    }
}

fn serialize_with_status(
    record: &csv::ByteRecord,
    status_idx: usize,
    new_status: &str,
) -> Result<Vec<u8>, LedgerError> {
    let mut fields: Vec<&[u8]> = record.iter().collect();
    while fields.len() <= status_idx {
        fields.push(b"");
    }
    fields[status_idx] = new_status.as_bytes();

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(&fields)?;
    let mut line = writer
        .into_inner()
        .map_err(|e| LedgerError::Csv(csv::Error::from(e.into_error())))?;
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    Ok(line)
}

/// Writes through a sibling temp file and renames it over the ledger, so an
/// interrupted run never leaves a truncated table behind.
async fn write_atomically(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let permissions = std::fs::metadata(&path)?.permissions();
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        std::fs::set_permissions(tmp.path(), permissions)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
