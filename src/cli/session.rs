//! Per-invocation state shared by the commands
//!
//! Resolves the settings file, the metadata path and the output format from
//! flags, environment and persisted settings, in that order.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::output::OutputFormat;
use crate::storage::{FileSettings, MemorySettings, SettingsProvider, Workspace};

/// Metadata file used when neither `--metadata` nor settings name one
pub const DEFAULT_METADATA_FILE: &str = "translation.yaml";

pub struct Session {
    settings: Box<dyn SettingsProvider>,
    metadata_path: PathBuf,
    config_path: Option<PathBuf>,
    format: OutputFormat,
}

impl Session {
    pub fn new(
        settings_path: Option<&Path>,
        metadata: Option<PathBuf>,
        config: Option<PathBuf>,
        format: Option<OutputFormat>,
    ) -> Result<Self> {
        let file_settings = match settings_path
            .map(Path::to_path_buf)
            .or_else(FileSettings::default_path)
        {
            Some(path) => Some(
                FileSettings::load(&path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            ),
            None => {
                tracing::debug!("no settings location, using in-memory settings");
                None
            }
        };

        let metadata_path = metadata
            .or_else(|| {
                file_settings
                    .as_ref()
                    .and_then(|s| s.metadata_path().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_METADATA_FILE));

        let format = format
            .or_else(|| {
                file_settings
                    .as_ref()
                    .and_then(|s| s.default_format())
                    .and_then(OutputFormat::from_setting)
            })
            .unwrap_or_default();

        let settings: Box<dyn SettingsProvider> = match file_settings {
            Some(s) => Box::new(s),
            None => Box::new(MemorySettings::new()),
        };

        Ok(Self {
            settings,
            metadata_path,
            config_path: config,
            format,
        })
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn settings_mut(&mut self) -> &mut dyn SettingsProvider {
        self.settings.as_mut()
    }

    /// Starts a workspace and opens `--config` when given. Without it the
    /// last opened config from settings is used.
    pub fn workspace(&mut self) -> Result<Workspace> {
        let mut workspace = Workspace::startup(&self.metadata_path, self.settings.as_mut())
            .with_context(|| {
                format!("Failed to load metadata from {}", self.metadata_path.display())
            })?;

        if let Some(config) = &self.config_path {
            workspace
                .open_config(config, self.settings.as_mut())
                .with_context(|| format!("Failed to open config {}", config.display()))?;
        }
        Ok(workspace)
    }

    /// Like [`Session::workspace`], but a config file must end up loaded
    pub fn workspace_with_config(&mut self) -> Result<Workspace> {
        let workspace = self.workspace()?;
        if workspace.document().is_none() {
            bail!("No config file loaded. Pass --config PATH.");
        }
        Ok(workspace)
    }
}
