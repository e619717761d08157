// Pipeline: the per-record state machine plus the scratch project and cover
// letter helpers it drives.

pub mod controller;
pub mod cover_letter;
pub mod scratch;

pub use controller::{Controller, RecordOutcome, RecordState, RunSummary};
