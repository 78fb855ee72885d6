//! Metadata commands (versions, use, convert)

use std::path::Path;

use anyhow::{bail, Context, Result};

use super::output::Output;
use super::session::Session;
use crate::storage::{load_metadata, save_metadata, BackingKind};

/// List metadata versions, current one marked
pub fn versions(session: &mut Session, output: &Output) -> Result<()> {
    let workspace = session.workspace()?;
    let store = workspace.metadata();
    let current = store.current_version();

    if output.is_json() {
        let items: Vec<_> = store
            .versions()
            .iter()
            .map(|v| {
                serde_json::json!({
                    "name": v.name(),
                    "items": v.len(),
                    "current": Some(v.name()) == current,
                })
            })
            .collect();
        output.data(&items);
    } else if store.is_empty() {
        println!("No metadata versions in {}.", workspace.metadata_path().display());
    } else {
        for version in store.versions() {
            let marker = if Some(version.name()) == current { "*" } else { " " };
            println!("{} {:<24} {} items", marker, version.name(), version.len());
        }
    }

    Ok(())
}

/// Switch the current version and persist the preference
pub fn use_version(session: &mut Session, output: &Output, name: &str) -> Result<()> {
    let mut workspace = session.workspace()?;

    if !workspace.switch_version(name, session.settings_mut())? {
        let available = workspace.metadata().version_names().join(", ");
        if available.is_empty() {
            bail!(
                "Unknown metadata version '{}': {} has no versions",
                name,
                workspace.metadata_path().display()
            );
        }
        bail!("Unknown metadata version '{}'. Available: {}", name, available);
    }

    output.success(&format!("Using metadata version {}", name));
    Ok(())
}

/// Load with the source's backing, save with the destination's
pub fn convert(output: &Output, src: &Path, dst: &Path) -> Result<()> {
    let store = load_metadata(src)
        .with_context(|| format!("Failed to load metadata from {}", src.display()))?;
    save_metadata(&store, dst)
        .with_context(|| format!("Failed to save metadata to {}", dst.display()))?;

    let from = BackingKind::for_path(src);
    let to = BackingKind::for_path(dst);

    if output.is_json() {
        output.data(&serde_json::json!({
            "src": src.display().to_string(),
            "dst": dst.display().to_string(),
            "from": from.as_str(),
            "to": to.as_str(),
            "versions": store.versions().len(),
            "items": store.total_items(),
        }));
    } else {
        output.success(&format!(
            "Converted {} ({}) to {} ({}): {} versions, {} items",
            src.display(),
            from.as_str(),
            dst.display(),
            to.as_str(),
            store.versions().len(),
            store.total_items()
        ));
    }

    Ok(())
}
