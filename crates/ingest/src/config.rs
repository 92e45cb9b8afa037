use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use storage::DataFiles;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DataFilesConfig {
    pub wordle_data: PathBuf,
    pub user_stats: PathBuf,
}

impl Default for DataFilesConfig {
    fn default() -> Self {
        Self {
            wordle_data: PathBuf::from("wordle_data.json"),
            user_stats: PathBuf::from("user_stats.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrackerSettings {
    #[validate(range(min = 1, max = 365))]
    pub max_recent_days: u32,

    #[validate(range(min = 1, max = 365))]
    pub default_recent_days: u32,

    pub auto_save: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            max_recent_days: 30,
            default_recent_days: 7,
            auto_save: true,
        }
    }
}

/// Contents of the tracker's `config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub data_files: DataFilesConfig,

    #[validate(nested)]
    pub settings: TrackerSettings,
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(settings)
    }

    /// Number of days for a recent-performance report
    pub fn recent_days(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.settings.default_recent_days)
            .clamp(1, self.settings.max_recent_days)
    }

    pub fn data_files(&self) -> DataFiles {
        DataFiles {
            wordle_data: self.data_files.wordle_data.clone(),
            user_stats: self.data_files.user_stats.clone(),
            auto_save: self.settings.auto_save,
        }
    }
}
