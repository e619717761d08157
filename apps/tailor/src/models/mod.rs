pub mod job;

pub use job::{path_component, JobRecord, Language};
