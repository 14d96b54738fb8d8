//! Loading and saving `.canopy/config.toml`

use std::path::Path;

use canopy_core::prelude::*;

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";
const CANOPY_DIR: &str = ".canopy";

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .canopy/config.toml
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(base_path: &Path) -> Settings {
    let config_path = base_path.join(CANOPY_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<Settings>(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings.validated()
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create .canopy/ with a commented default config.toml
pub fn init_config_dir(base_path: &Path) -> Result<()> {
    let canopy_dir = base_path.join(CANOPY_DIR);

    if !canopy_dir.exists() {
        std::fs::create_dir_all(&canopy_dir)
            .map_err(|e| Error::config(format!("Failed to create .canopy dir: {}", e)))?;
    }

    let config_path = canopy_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, generate_default_config())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
    }

    Ok(())
}

/// Save settings to .canopy/config.toml
///
/// Writes to a temp file first, then renames over the config.
pub fn save_settings(base_path: &Path, settings: &Settings) -> Result<()> {
    let canopy_dir = base_path.join(CANOPY_DIR);

    if !canopy_dir.exists() {
        std::fs::create_dir_all(&canopy_dir)
            .map_err(|e| Error::config(format!("Failed to create .canopy dir: {}", e)))?;
    }

    let config_path = canopy_dir.join(CONFIG_FILENAME);
    let temp_path = canopy_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("{}{}", generate_config_header(), content);

    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}

fn generate_config_header() -> String {
    "# Canopy Configuration\n# Generated by canopy\n\n".to_string()
}

fn generate_default_config() -> String {
    r#"# Canopy Configuration

[browser]
display_mode = "experimenter_display"   # or "group_display"
sort_by_date = false
sort_descending = false

[loading]
fetch_timeout_secs = 30     # min 1
count_timeout_ms = 10000    # min 100
count_concurrency = 4

[behavior]
auto_count_on_expand = true
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::DisplayMode;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_load_invalid_toml_uses_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CANOPY_DIR)).unwrap();
        std::fs::write(
            dir.path().join(CANOPY_DIR).join(CONFIG_FILENAME),
            "[browser\nnot toml",
        )
        .unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_init_config_dir_writes_parseable_defaults() {
        let dir = tempdir().unwrap();
        init_config_dir(dir.path()).unwrap();
        assert!(dir.path().join(CANOPY_DIR).join(CONFIG_FILENAME).exists());
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.browser.display_mode = DisplayMode::GroupDisplay;
        settings.loading.count_concurrency = 8;

        save_settings(dir.path(), &settings).unwrap();
        assert_eq!(load_settings(dir.path()), settings);
        assert!(!dir.path().join(CANOPY_DIR).join(".config.toml.tmp").exists());
    }

    #[test]
    fn test_load_clamps_out_of_range_values() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CANOPY_DIR)).unwrap();
        std::fs::write(
            dir.path().join(CANOPY_DIR).join(CONFIG_FILENAME),
            "[loading]\nfetch_timeout_secs = 0\n",
        )
        .unwrap();
        assert_eq!(load_settings(dir.path()).loading.fetch_timeout_secs, 1);
    }
}
