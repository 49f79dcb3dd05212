//! Rendering of verdict reports for people and machines.

use crate::error::{EtlError, Result};
use crate::validate::{CheckStatus, VerdictReport};
use std::fmt::Write;

/// Output options shared by the formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Colorized output for terminals.
    pub use_colors: bool,
    /// How many failures to list before truncating; `None` lists all.
    pub max_failures: Option<usize>,
    /// Whether skipped checks appear in the output.
    pub include_skipped: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            use_colors: true,
            max_failures: None,
            include_skipped: true,
        }
    }
}

impl FormatterConfig {
    /// Plain bounded output for CI logs.
    pub fn ci() -> Self {
        Self {
            use_colors: false,
            max_failures: Some(50),
            include_skipped: false,
        }
    }
}

/// Renders a [`VerdictReport`] to a string.
pub trait ReportFormatter {
    fn format(&self, report: &VerdictReport) -> Result<String>;
}

/// Emits the full report as JSON for downstream tooling.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &VerdictReport) -> Result<String> {
        let serialize = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        serialize.map_err(|e| EtlError::Internal(format!("report serialization failed: {e}")))
    }
}

/// Console-friendly summary: verdict, counters, then each failure with its
/// sample keys.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &VerdictReport) -> Result<String> {
        let mut out = String::new();

        if report.passed() {
            if self.config.use_colors {
                writeln!(out, "\x1b[32mVerdict: PASSED\x1b[0m").unwrap();
            } else {
                writeln!(out, "Verdict: PASSED").unwrap();
            }
        } else if self.config.use_colors {
            writeln!(out, "\x1b[31mVerdict: FAILED\x1b[0m").unwrap();
        } else {
            writeln!(out, "Verdict: FAILED").unwrap();
        }

        let m = &report.metrics;
        writeln!(out).unwrap();
        writeln!(
            out,
            "Checks: {} total, {} passed, {} failed, {} skipped",
            m.total, m.passed, m.failed, m.skipped
        )
        .unwrap();
        writeln!(
            out,
            "Failures: {} critical, {} advisory",
            m.critical_failures, m.advisory_failures
        )
        .unwrap();

        let failures: Vec<_> = report.failures().collect();
        if !failures.is_empty() {
            writeln!(out).unwrap();
            let shown = self.config.max_failures.unwrap_or(failures.len());
            for record in failures.iter().take(shown) {
                writeln!(
                    out,
                    "  [{}] {}: {}",
                    record.severity,
                    record.id,
                    record.message.as_deref().unwrap_or("failed")
                )
                .unwrap();
                if !record.samples.is_empty() {
                    writeln!(out, "      samples: {}", record.samples.join(", ")).unwrap();
                }
            }
            if failures.len() > shown {
                writeln!(out, "  ... and {} more failures", failures.len() - shown).unwrap();
            }
        }

        if self.config.include_skipped {
            for record in &report.records {
                if record.status == CheckStatus::Skipped {
                    writeln!(
                        out,
                        "  [skipped] {}: {}",
                        record.id,
                        record.message.as_deref().unwrap_or("")
                    )
                    .unwrap();
                }
            }
        }

        Ok(out)
    }
}
