//! Entry commands (list, show, set, sections, check)

use std::fs;

use anyhow::{bail, Context, Result};

use super::output::Output;
use super::session::Session;
use crate::domain::{DisplayRecord, EntryEdit, RecordFilter, SectionFilter, UNCATEGORIZED};
use crate::storage::{parse_metadata, BackingKind, Workspace};

/// List projected entries
pub fn list(
    session: &mut Session,
    output: &Output,
    section: Option<String>,
    uncategorized: bool,
    search: Option<&str>,
) -> Result<()> {
    let workspace = session.workspace_with_config()?;

    let mut filter = RecordFilter::new();
    if let Some(section) = section {
        filter = filter.with_section(SectionFilter::Named(section));
    } else if uncategorized {
        filter = filter.with_section(SectionFilter::Uncategorized);
    }
    if let Some(search) = search {
        filter = filter.with_search(search);
    }

    let records = workspace.filtered(&filter);
    tracing::debug!(
        total = workspace.records().len(),
        shown = records.len(),
        "filtered entries"
    );

    if output.is_json() {
        output.data(&records);
    } else if records.is_empty() {
        println!("No matching entries.");
    } else {
        println!(
            "{:<5} {:<24} {:<24} {:<16} NAME",
            "ROW", "KEY", "VALUE", "SECTION"
        );
        println!("{}", "-".repeat(80));
        for record in records {
            println!(
                "{:<5} {:<24} {:<24} {:<16} {}",
                record.row,
                record.key,
                record.value,
                record.section_label(),
                record.name
            );
        }
    }

    Ok(())
}

/// Show one entry
pub fn show(session: &mut Session, output: &Output, key: &str) -> Result<()> {
    let workspace = session.workspace_with_config()?;
    let record = lookup(&workspace, key, None)?;
    let rows = workspace
        .document()
        .map(|doc| doc.rows_for_key(key))
        .unwrap_or_default();

    if output.is_json() {
        output.data(&serde_json::json!({
            "record": record,
            "rows": rows,
        }));
    } else {
        println!("Key:         {}", record.key);
        println!("Value:       {}", record.value);
        println!("Name:        {}", record.name);
        println!("Section:     {}", record.section_label());
        if !record.file_section.is_empty() {
            println!("File section: {}", record.file_section);
        }
        println!("Line:        {}", record.line_index + 1);
        if rows.len() > 1 {
            println!("Occurs on rows: {:?}", rows);
        }
        if let Some(description) = record.tooltip() {
            println!();
            println!("{}", description);
        }
    }

    Ok(())
}

/// Apply an edit and save
pub fn set(
    session: &mut Session,
    output: &Output,
    key: &str,
    row: Option<usize>,
    edit: EntryEdit,
) -> Result<()> {
    if edit.is_empty() {
        bail!("Nothing to change. Pass --value, --name, --section or --description.");
    }

    let mut workspace = session.workspace_with_config()?;
    let row = lookup(&workspace, key, row)?.row;

    let outcome = workspace
        .apply_edit(row, &edit)
        .with_context(|| format!("Row {} no longer exists", row))?;

    if let Some(value) = &edit.value {
        let current = workspace.record(row).map(|r| r.value.as_str());
        if !outcome.value_changed && current != Some(value.as_str()) {
            bail!(
                "Value {:?} cannot be written to the line of '{}' without changing how it reads back",
                value,
                key
            );
        }
    }

    if !outcome.changed() {
        if output.is_json() {
            output.data(&serde_json::json!({
                "key": key,
                "row": row,
                "changed": outcome,
            }));
        } else {
            output.success(&format!("No changes for {}", key));
        }
        return Ok(());
    }

    workspace.save().context("Failed to save changes")?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "key": key,
            "row": row,
            "changed": outcome,
            "record": workspace.record(row),
        }));
    } else {
        let mut parts = Vec::new();
        if outcome.value_changed {
            parts.push("value");
        }
        if outcome.metadata_changed {
            parts.push("metadata");
        }
        output.success(&format!("Updated {} of {} (row {})", parts.join(" and "), key, row));
    }

    Ok(())
}

/// List sections
pub fn sections(session: &mut Session, output: &Output) -> Result<()> {
    let workspace = session.workspace_with_config()?;
    let list = workspace.sections();

    if output.is_json() {
        output.data(&list);
    } else {
        for section in &list.sections {
            println!("{}", section);
        }
        if list.has_uncategorized {
            println!("({})", UNCATEGORIZED);
        }
    }

    Ok(())
}

/// Check the config round-trips and the text metadata parses without warnings
pub fn check(session: &mut Session, output: &Output) -> Result<()> {
    let workspace = session.workspace_with_config()?;
    let (Some(path), Some(document)) = (workspace.config_path(), workspace.document()) else {
        bail!("No config file loaded. Pass --config PATH.");
    };

    let on_disk = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let round_trips = document.render() == on_disk;

    let metadata_path = workspace.metadata_path();
    let mut warnings = Vec::new();
    if BackingKind::for_path(metadata_path) == BackingKind::Text && metadata_path.is_file() {
        let text = fs::read_to_string(metadata_path)
            .with_context(|| format!("Failed to read metadata {}", metadata_path.display()))?;
        warnings = parse_metadata(&text)
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect();
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "config": path.display().to_string(),
            "lines": document.lines().len(),
            "entries": document.len(),
            "round_trips": round_trips,
            "metadata": metadata_path.display().to_string(),
            "metadata_warnings": warnings,
        }));
    } else {
        println!(
            "{}: {} lines, {} entries",
            path.display(),
            document.lines().len(),
            document.len()
        );
        for warning in &warnings {
            output.warn(&format!("{}: {}", metadata_path.display(), warning));
        }
    }

    if !round_trips {
        bail!("{} does not round-trip byte-for-byte", path.display());
    }
    if !output.is_json() {
        output.success("Round-trip OK");
    }
    Ok(())
}

/// Finds the record for `key`, or checks that `row` holds `key`
fn lookup<'a>(workspace: &'a Workspace, key: &str, row: Option<usize>) -> Result<&'a DisplayRecord> {
    match row {
        Some(row) => {
            let record = workspace
                .record(row)
                .with_context(|| format!("No entry at row {}", row))?;
            if record.key != key {
                bail!("Row {} holds '{}', not '{}'", row, record.key, key);
            }
            Ok(record)
        }
        None => {
            let row = workspace
                .find_row(key)
                .with_context(|| format!("Key not found: {}", key))?;
            workspace
                .record(row)
                .with_context(|| format!("Key not found: {}", key))
        }
    }
}
