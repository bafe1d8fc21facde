//! Non-fatal findings collected while a computation runs.
//!
//! Business-rule problems never abort a run. They are recorded here,
//! emitted as `tracing` events, and returned next to the best-effort result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Input is outside market norms or internally inconsistent
    Validation,
    /// A division by zero or non-finite result was replaced with zero
    NumericDegeneracy,
    /// Malformed structure (waterfall tiers, splits); a fallback was applied
    Structural,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Validation => "validation",
            DiagnosticKind::NumericDegeneracy => "numeric",
            DiagnosticKind::Structural => "structural",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub field: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validation(&mut self, field: &str, message: impl Into<String>) {
        self.push(DiagnosticKind::Validation, field, message.into());
    }

    pub fn degenerate(&mut self, field: &str, message: impl Into<String>) {
        self.push(DiagnosticKind::NumericDegeneracy, field, message.into());
    }

    pub fn structural(&mut self, field: &str, message: impl Into<String>) {
        self.push(DiagnosticKind::Structural, field, message.into());
    }

    fn push(&mut self, kind: DiagnosticKind, field: &str, message: String) {
        tracing::warn!(kind = %kind, field, "{message}");
        self.0.push(Diagnostic {
            kind,
            field: field.to_string(),
            message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.kind == kind)
    }

    /// True if any diagnostic was recorded against `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|d| d.field == field)
    }

    /// Flattened messages for the `ComputationOutput::warnings` envelope.
    pub fn to_messages(&self) -> Vec<String> {
        self.0.iter().map(|d| d.to_string()).collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

/// Divide, substituting zero (and recording a degeneracy) when the
/// denominator is zero or the quotient overflows.
pub fn safe_div(
    numerator: Decimal,
    denominator: Decimal,
    field: &str,
    diagnostics: &mut Diagnostics,
) -> Decimal {
    match numerator.checked_div(denominator) {
        Some(q) => q,
        None => {
            diagnostics.degenerate(
                field,
                format!("{numerator} / {denominator} is undefined; substituted 0"),
            );
            Decimal::ZERO
        }
    }
}

/// Division used where a zero denominator is an expected, silent case.
pub fn div_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Clamp a negative intermediate to zero, recording a validation warning.
pub fn clamp_non_negative(value: Decimal, field: &str, diagnostics: &mut Diagnostics) -> Decimal {
    if value < Decimal::ZERO {
        diagnostics.validation(field, format!("negative value {value} clamped to 0"));
        Decimal::ZERO
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_safe_div_zero_denominator() {
        let mut diags = Diagnostics::new();
        assert_eq!(safe_div(dec!(100), dec!(0), "exit_cap_rate", &mut diags), dec!(0));
        assert!(diags.has(DiagnosticKind::NumericDegeneracy));
        assert!(diags.mentions("exit_cap_rate"));
    }

    #[test]
    fn test_safe_div_normal() {
        let mut diags = Diagnostics::new();
        assert_eq!(safe_div(dec!(100), dec!(4), "x", &mut diags), dec!(25));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_clamp_records_warning() {
        let mut diags = Diagnostics::new();
        assert_eq!(clamp_non_negative(dec!(-5), "land_cost", &mut diags), dec!(0));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.to_messages()[0], "[validation] land_cost: negative value -5 clamped to 0");
    }
}
