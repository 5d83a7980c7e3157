//! Renders a reconciliation result for the operator.
//!
//! The text format lists one section per discrepancy kind, in result order.
//! The JSON format is the serialized result.

use std::io::Write;

use dirsync_core::{
    CanonicalRecord, Discrepancy, DiscrepancyKind, MatchMethod, ModeProfile, ReconciliationResult,
    SyncMode,
};

use crate::error::CliResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Names used in section headings.
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// What the directory side was read from (a group address or the user list).
    pub directory_label: String,
}

impl ReportContext {
    pub fn new(directory_label: impl Into<String>) -> Self {
        Self {
            directory_label: directory_label.into(),
        }
    }
}

/// Write `result` to `out` in `format`.
pub fn render<W: Write>(
    result: &ReconciliationResult,
    format: OutputFormat,
    context: &ReportContext,
    out: &mut W,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)?;
        }
        OutputFormat::Text => render_text(result, context, out)?,
    }
    Ok(())
}

fn heading(result: &ReconciliationResult, kind: DiscrepancyKind, context: &ReportContext) -> String {
    let stats = &result.stats;
    let target = &context.directory_label;
    match (result.mode, kind) {
        (SyncMode::MembersSync, DiscrepancyKind::MissingInDirectory) => format!(
            "Members missing from {target} (matched {}/{} members):",
            stats.matched(),
            stats.registry_total
        ),
        (SyncMode::MembersSync, DiscrepancyKind::MissingInRegistry) => format!(
            "Extra users in {target} (matched {}/{} users):",
            stats.matched(),
            stats.directory_total
        ),
        (SyncMode::MembersSync, DiscrepancyKind::AttributeMismatch) => {
            format!("Memberships in {target} that need attention:")
        }
        (SyncMode::ActivesSync, DiscrepancyKind::MissingInDirectory) => format!(
            "Members without G-Suite account ({}/{} MyAEGEE users matched):",
            stats.matched(),
            stats.registry_total
        ),
        (SyncMode::ActivesSync, DiscrepancyKind::MissingInRegistry) => format!(
            "G-Suite accounts without MyAEGEE membership (matched {}/{} users):",
            stats.matched(),
            stats.directory_total
        ),
        (SyncMode::ActivesSync, DiscrepancyKind::AttributeMismatch) => {
            "G-Suite accounts that need updating:".to_string()
        }
    }
}

fn describe(record: &CanonicalRecord) -> String {
    let label = record.label();
    if label == record.key().as_str() {
        label.to_string()
    } else {
        format!("{label} ({})", record.key())
    }
}

fn entry(discrepancy: &Discrepancy, profile: &ModeProfile) -> String {
    let mut line = match discrepancy.primary_record() {
        Some(record) => format!("* {}", describe(record)),
        None => format!("* {}", discrepancy.key),
    };

    if let (Some(registry), Some(directory)) =
        (&discrepancy.registry_record, &discrepancy.directory_record)
    {
        if directory.key() != registry.key() {
            line.push_str(&format!(" -> {}", directory.key()));
        }
        let changes: Vec<String> = discrepancy
            .mismatched_fields
            .iter()
            .map(|field| {
                format!(
                    "{field} is '{}', expected '{}'",
                    profile.value(directory, field).unwrap_or("-"),
                    profile.value(registry, field).unwrap_or("-"),
                )
            })
            .collect();
        if !changes.is_empty() {
            line.push_str(": ");
            line.push_str(&changes.join("; "));
        }
    }

    if discrepancy.matched_by == Some(MatchMethod::Name) {
        line.push_str(" [matched by name]");
    }
    line
}

fn render_text<W: Write>(
    result: &ReconciliationResult,
    context: &ReportContext,
    out: &mut W,
) -> CliResult<()> {
    let profile = result.mode.profile();

    for kind in DiscrepancyKind::all() {
        let mut section = result.of_kind(kind).peekable();
        if section.peek().is_none() {
            continue;
        }
        writeln!(out, "{}", heading(result, kind, context))?;
        for discrepancy in section {
            writeln!(out, "{}", entry(discrepancy, &profile))?;
        }
        writeln!(out)?;
    }

    let stats = &result.stats;
    if result.is_in_sync() {
        writeln!(
            out,
            "{} is in sync with MyAEGEE ({} members).",
            context.directory_label, stats.registry_total
        )?;
    } else {
        writeln!(
            out,
            "{} discrepancies: {} missing, {} extra, {} to update.",
            result.discrepancies.len(),
            stats.missing_in_directory,
            stats.missing_in_registry,
            stats.attribute_mismatch
        )?;
    }
    Ok(())
}
