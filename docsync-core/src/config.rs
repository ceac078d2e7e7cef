//! Configuration management for docsync

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub languages: LanguageConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub line_stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Yaml,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "zh-cn".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            line_stats: true,
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "docsync")
            .map(|proj_dirs| proj_dirs.config_dir().join("docsync.toml"))
    }

    /// Load configuration from the platform config file, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
            if metadata.permissions().mode() & 0o002 != 0 {
                anyhow::bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.languages.source.trim().is_empty() || config.languages.target.trim().is_empty() {
            anyhow::bail!(
                "Config file {} must name both a source and a target language",
                path.display()
            );
        }

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.languages.source, "en");
        assert_eq!(config.languages.target, "zh-cn");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.line_stats);
    }

    #[test]
    fn test_load_valid_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(
            b"[languages]\n\
source = \"en\"\n\
target = \"fa\"\n\
\n\
[output]\n\
format = \"Yaml\"\n\
line_stats = false\n",
        )?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.languages.target, "fa");
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert!(!config.output.line_stats);

        Ok(())
    }

    #[test]
    fn test_load_partial_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[languages]\ntarget = \"ja\"\n")?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.languages.source, "en");
        assert_eq!(config.languages.target, "ja");
        assert_eq!(config.output.format, OutputFormat::Text);

        Ok(())
    }

    #[test]
    fn test_load_invalid_toml_returns_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"invalid toml [[[syntax")?;

        assert!(Config::load_from(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_language_is_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[languages]\ntarget = \"\"\n")?;

        let err = Config::load_from(file.path()).expect_err("empty target should fail");
        assert!(err.to_string().contains("target language"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_world_writable_config_is_rejected() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let file = NamedTempFile::new()?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666))?;

        let err = Config::load_from(file.path()).expect_err("world-writable config should fail");
        assert!(err.to_string().contains("world-writable"));
        Ok(())
    }

    #[test]
    fn test_config_path_names_docsync() {
        if let Some(p) = Config::config_path() {
            assert!(p.to_string_lossy().ends_with("docsync.toml"));
        }
    }

    #[test]
    fn test_config_serialization_round_trip() -> Result<()> {
        let mut config = Config::default();
        config.output.format = OutputFormat::Yaml;

        let toml_str = toml::to_string(&config)?;
        assert!(toml_str.contains("Yaml"));

        let parsed: Config = toml::from_str(&toml_str)?;
        assert_eq!(parsed.output.format, OutputFormat::Yaml);
        assert_eq!(parsed.languages, config.languages);

        Ok(())
    }
}
