use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OutletError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub sources: Sources,
}

/// Source files and folders, relative to `data_dir` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub pnl: String,
    pub cash_variance: String,
    pub food_cost: String,
    pub inventory: String,
    pub dish_costing: String,
    pub sales_dir: String,
    pub swiggy_pos: String,
    pub swiggy_mapping: String,
    pub swiggy_platform: String,
    pub swiggy_pos_input: String,
    pub swiggy_platform_input: String,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            pnl: "PnL.csv".to_string(),
            cash_variance: "CVR.csv".to_string(),
            food_cost: "foodcost_category.csv".to_string(),
            inventory: "inventory_loss.csv".to_string(),
            dish_costing: "dish.csv".to_string(),
            sales_dir: "Input files".to_string(),
            swiggy_pos: "swiggy_pos.csv".to_string(),
            swiggy_mapping: "swiggy_mapping_table.xlsx".to_string(),
            swiggy_platform: "swiggy_source.csv".to_string(),
            swiggy_pos_input: "pos_input_swiggy".to_string(),
            swiggy_platform_input: "swiggy_input".to_string(),
        }
    }
}

impl Sources {
    pub fn entries(&self) -> [(&'static str, &str); 11] {
        [
            ("pnl", self.pnl.as_str()),
            ("cash_variance", self.cash_variance.as_str()),
            ("food_cost", self.food_cost.as_str()),
            ("inventory", self.inventory.as_str()),
            ("dish_costing", self.dish_costing.as_str()),
            ("sales_dir", self.sales_dir.as_str()),
            ("swiggy_pos", self.swiggy_pos.as_str()),
            ("swiggy_mapping", self.swiggy_mapping.as_str()),
            ("swiggy_platform", self.swiggy_platform.as_str()),
            ("swiggy_pos_input", self.swiggy_pos_input.as_str()),
            ("swiggy_platform_input", self.swiggy_platform_input.as_str()),
        ]
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            user_name: String::new(),
            log_level: default_log_level(),
            sources: Sources::default(),
        }
    }
}

impl Settings {
    /// Resolve a configured source against the data directory.
    pub fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            PathBuf::from(&self.data_dir).join(path)
        }
    }

    pub fn exports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("outletbook")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("outletbook")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| OutletError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings {
            data_dir: "/tmp/outlets".to_string(),
            user_name: "Surya".to_string(),
            ..Settings::default()
        };
        settings.sources.pnl = "finance/PnL.csv".to_string();
        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.user_name, "Surya");
        assert_eq!(loaded.data_dir, "/tmp/outlets");
        assert_eq!(loaded.sources.pnl, "finance/PnL.csv");
        assert_eq!(loaded.log_level, "warn");
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("absent.json"));
        assert!(s.user_name.is_empty());
        assert_eq!(s.sources.cash_variance, "CVR.csv");
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "sources": {"dish_costing": "dishes.csv"}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.log_level, "warn");
        assert_eq!(s.sources.dish_costing, "dishes.csv");
        assert_eq!(s.sources.pnl, "PnL.csv");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let s = Settings {
            data_dir: "/data".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.resolve("PnL.csv"), PathBuf::from("/data/PnL.csv"));
        assert_eq!(s.resolve("/elsewhere/CVR.csv"), PathBuf::from("/elsewhere/CVR.csv"));
    }
}
