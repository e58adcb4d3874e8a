pub mod diagnostics;

pub use diagnostics::{DIAGNOSTICS_FILE_PREFIX, DiagnosticsSink};
