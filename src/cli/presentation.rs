//! CLI presentation: text and json formatters per report type.

use crate::error::PipelineError;
use crate::export::ExporterRegistry;
use crate::pipeline::{
    BatchOutcome, BatchReport, ExportReport, MigrateReport, MigrateStatus, TargetStatus,
    ValidateReport,
};
use crate::schema::SchemaRegistry;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, PipelineError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn label(report_path: Option<&std::path::Path>, manifest: &str) -> String {
    match report_path {
        Some(path) => format!("{} ({})", path.display(), manifest),
        None => manifest.to_string(),
    }
}

pub fn format_validate_text(report: &ValidateReport) -> String {
    let name = label(report.path.as_deref(), &report.manifest);
    let mut out = if report.is_valid() {
        format!(
            "{} {} is valid against schema {}\n",
            "ok".green(),
            name,
            report.schema_version
        )
    } else {
        format!(
            "{} {} has {} error(s) against schema {} ({})\n",
            "invalid".red(),
            name,
            report.errors.len(),
            report.schema_version,
            report.mode
        )
    };
    for error in &report.errors {
        out.push_str(&format!("  - {}\n", error));
    }
    for advisory in &report.advisories {
        out.push_str(&format!("  {} {}: {}\n", "note".yellow(), advisory.path, advisory.message));
    }
    out
}

pub fn format_migrate_text(report: &MigrateReport) -> String {
    let name = label(report.path.as_deref(), &report.manifest);
    let mut out = String::new();
    match &report.status {
        MigrateStatus::Migrated { deprecations } => {
            out.push_str(&format!(
                "{} {} migrated {} -> {}\n",
                "ok".green(),
                name,
                report.from,
                report.to
            ));
            for deprecation in deprecations {
                out.push_str(&format!("  {} {}\n", "deprecated".yellow(), deprecation));
            }
            if let Some(output) = &report.output {
                out.push_str(&format!("  written to {}\n", output.display()));
            }
        }
        MigrateStatus::InvalidSource { errors } => {
            out.push_str(&format!(
                "{} {} is not valid against its own schema {}\n",
                "invalid".red(),
                name,
                report.from
            ));
            for error in errors {
                out.push_str(&format!("  - {}\n", error));
            }
        }
        MigrateStatus::Unsupported {
            reason,
            diagnostics,
        } => {
            out.push_str(&format!(
                "{} {} cannot migrate {} -> {}: {}\n",
                "unsupported".red(),
                name,
                report.from,
                report.to,
                reason
            ));
            for error in diagnostics {
                out.push_str(&format!("  - {}\n", error));
            }
        }
    }
    out
}

pub fn format_export_text(report: &ExportReport) -> String {
    let name = label(report.path.as_deref(), &report.manifest);
    if !report.errors.is_empty() {
        let mut out = format!(
            "{} {} has {} validation error(s); nothing exported\n",
            "invalid".red(),
            name,
            report.errors.len()
        );
        for error in &report.errors {
            out.push_str(&format!("  - {}\n", error));
        }
        return out;
    }

    let mut out = format!("{}\n", heading(&format!("Export {}", name)));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Target", "Status", "Detail"]);
    for outcome in &report.targets {
        let (status, detail) = match &outcome.status {
            TargetStatus::Exported {
                out_dir, artifacts, ..
            } => (
                "exported",
                format!("{} file(s) in {}", artifacts.len(), out_dir.display()),
            ),
            TargetStatus::Rejected { rejection } => ("rejected", rejection.to_string()),
            TargetStatus::MigrationUnsupported { reason } => ("migration unsupported", reason.clone()),
            TargetStatus::Failed { message, .. } => ("failed", message.clone()),
        };
        table.add_row(vec![outcome.target.clone(), status.to_string(), detail]);
    }
    out.push_str(&format!("{}\n", table));

    for outcome in &report.targets {
        if let TargetStatus::Exported { deprecations, .. } = &outcome.status {
            for deprecation in deprecations {
                out.push_str(&format!(
                    "  {} [{}] {}\n",
                    "deprecated".yellow(),
                    outcome.target,
                    deprecation
                ));
            }
        }
    }
    out
}

pub fn format_batch_text(report: &BatchReport) -> String {
    let mut out = String::new();
    for item in &report.items {
        match &item.outcome {
            BatchOutcome::Validated(r) => out.push_str(&format_validate_text(r)),
            BatchOutcome::Migrated(r) => out.push_str(&format_migrate_text(r)),
            BatchOutcome::Exported(r) => out.push_str(&format_export_text(r)),
            BatchOutcome::Failed { message, .. } => out.push_str(&format!(
                "{} {}: {}\n",
                "error".red(),
                item.path.display(),
                message
            )),
        }
    }
    out.push_str(&format!(
        "\n{} manifest(s): {} succeeded, {} failed\n",
        report.items.len(),
        report.succeeded(),
        report.failed()
    ));
    out
}

pub fn format_schemas(registry: &SchemaRegistry, json_output: bool) -> Result<String, PipelineError> {
    let latest = registry.latest().version();
    if json_output {
        let rows: Vec<_> = registry
            .versions()
            .iter()
            .map(|v| {
                json!({
                    "version": v.version().to_string(),
                    "apiVersion": v.api_version(),
                    "latest": v.version() == latest,
                    "deprecated": v.changes().deprecated,
                    "removed": v.changes().removed,
                })
            })
            .collect();
        return to_json(&rows);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Version", "apiVersion", "Deprecated", "Removed"]);
    for version in registry.versions() {
        let marker = if version.version() == latest { " (latest)" } else { "" };
        table.add_row(vec![
            format!("{}{}", version.version(), marker),
            version.api_version(),
            version.changes().deprecated.join(", "),
            version.changes().removed.join(", "),
        ]);
    }
    Ok(format!("{}\n{}", heading("Schema versions"), table))
}

pub fn format_targets(exporters: &ExporterRegistry, json_output: bool) -> Result<String, PipelineError> {
    if json_output {
        let rows: Vec<_> = exporters
            .iter()
            .map(|e| {
                let t = e.target();
                json!({
                    "name": t.name,
                    "description": t.description,
                    "kinds": t.kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
                    "formatVersion": t.format_version.to_string(),
                    "schemaVersion": t.schema_version.to_string(),
                })
            })
            .collect();
        return to_json(&rows);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Target", "Kinds", "Format", "Schema", "Description"]);
    for exporter in exporters.iter() {
        let t = exporter.target();
        table.add_row(vec![
            t.name.to_string(),
            t.kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", "),
            t.format_version.to_string(),
            t.schema_version.to_string(),
            t.description.to_string(),
        ]);
    }
    Ok(format!("{}\n{}", heading("Export targets"), table))
}
