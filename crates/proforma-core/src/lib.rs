pub mod assumptions;
pub mod cash_flow;
pub mod compensation;
pub mod development;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod returns;
pub mod time_value;
pub mod types;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(test)]
mod test_fixtures;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::ProformaError;
pub use types::*;

/// Standard result type for all proforma operations
pub type ProformaResult<T> = Result<T, ProformaError>;
