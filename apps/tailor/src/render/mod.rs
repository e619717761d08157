//! Document rendering: escaping text for LaTeX, merging it into a template
//! project, and driving the external compiler and converter.

pub mod compiler;
pub mod process;
pub mod sanitize;
pub mod substitute;

pub use compiler::{compile, convert_companion, CompanionSettings, CompileReport};
pub use process::{ExternalTool, ProcessError};
pub use sanitize::sanitize_for_latex;
pub use substitute::{substitute, SubstitutionReport};
