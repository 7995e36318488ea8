//! Plain-text and JSON rendering for the headless commands.

use std::io::Write;

use anyhow::Result;
use fleetwatch_core::{
    probe::{ProbeStatus, ProbeSummary},
    service::{SystemCheckReport, WeeklyReport},
};

use crate::config::OutputFormat;

pub(crate) fn write_weekly_report<W: Write>(
    out: &mut W,
    report: &WeeklyReport,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Operator indicators {}", report.window)?;
    if report.indicators.is_empty() {
        writeln!(out, "No operators registered.")?;
        return Ok(());
    }

    writeln!(out, "{:<28} {:>10} {:>10} {:>11}", "Operator", "Km", "Incidents", "Checklists")?;
    for indicator in &report.indicators {
        writeln!(
            out,
            "{:<28} {:>10.1} {:>10} {:>11}",
            indicator.operator_name,
            indicator.km_driven_this_week,
            indicator.incidents_this_week,
            indicator.checklists_this_week
        )?;
    }
    Ok(())
}

pub(crate) fn write_system_check<W: Write>(
    out: &mut W,
    report: &SystemCheckReport,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        return Ok(());
    }

    if report.created_defaults.is_empty() {
        writeln!(out, "Default checklist items already present.")?;
    } else {
        writeln!(out, "Created {} default checklist items:", report.created_defaults.len())?;
        for item in &report.created_defaults {
            writeln!(out, "  {:>2}. {} ({})", item.position, item.label, item.key)?;
        }
    }

    writeln!(out, "Stored checklist items ({}):", report.definitions.len())?;
    for item in &report.definitions {
        writeln!(out, "  {:>2}. {} ({})", item.position, item.label, item.key)?;
    }

    writeln!(out, "Index probe:")?;
    for outcome in &report.probe {
        match &outcome.status {
            ProbeStatus::ExpectedFailure { message } | ProbeStatus::UnexpectedFailure { message, .. } => {
                writeln!(out, "  {}: {}: {message}", outcome.query, outcome.status)?;
            }
            ProbeStatus::Pending | ProbeStatus::Success => {
                writeln!(out, "  {}: {}", outcome.query, outcome.status)?;
            }
        }
    }

    let summary = ProbeSummary::from(report.probe.as_slice());
    writeln!(
        out,
        "{} ok, {} index missing, {} failed",
        summary.succeeded, summary.missing_indexes, summary.failed
    )?;
    Ok(())
}
