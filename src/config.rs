//! Configuration management for lineage analysis
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (lineage.toml)
//! - Environment variables (LINEAGE__*)
//!
//! ## Example config file (lineage.toml):
//! ```toml
//! [scan]
//! artifact_markers = [".cbl", ".cob", ".cpy", ".jcl", ".cics", "db2:"]
//! parallel = true
//! strip_line_numbers = true
//!
//! [ingest]
//! lines_per_chunk = 120
//!
//! [fields]
//! copybook_markers = [".cpy", ".copybook", "copybook:"]
//!
//! [graph]
//! default_radius = 2
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for lineage analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Which chunks are scanned and how
    #[serde(default)]
    pub scan: ScanConfig,

    /// Source ingestion settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Copybook field analysis settings
    #[serde(default)]
    pub fields: FieldsConfig,

    /// Graph query settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Chunk scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Lower-case filename substrings that mark a chunk as a mainframe artifact
    #[serde(default = "default_artifact_markers")]
    pub artifact_markers: Vec<String>,

    /// Extract chunks on the rayon pool and merge partial maps
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Remove `00001: ` style line-number prefixes before extraction
    #[serde(default = "default_true")]
    pub strip_line_numbers: bool,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Lines per stored chunk
    #[serde(default = "default_lines_per_chunk")]
    pub lines_per_chunk: usize,

    /// File extensions picked up from a source directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Relative path prefixes skipped while walking
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

/// Field analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Case-insensitive filename substrings that mark a chunk as a copybook
    #[serde(default = "default_copybook_markers")]
    pub copybook_markers: Vec<String>,
}

/// Graph configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Radius used when a neighborhood query does not give one
    #[serde(default = "default_radius")]
    pub default_radius: usize,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_artifact_markers() -> Vec<String> {
    [".cbl", ".cob", ".cpy", ".jcl", ".cics", "db2:"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_lines_per_chunk() -> usize {
    120
}

fn default_extensions() -> Vec<String> {
    [".cbl", ".cob", ".cpy", ".jcl", ".cics", ".pli", ".sql", ".asm", ".map"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_skip_prefixes() -> Vec<String> {
    vec![
        "target/".to_string(),
        ".git/".to_string(),
    ]
}

fn default_copybook_markers() -> Vec<String> {
    [".cpy", ".copybook", "copybook:"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_radius() -> usize {
    2
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            artifact_markers: default_artifact_markers(),
            parallel: true,
            strip_line_numbers: true,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            lines_per_chunk: default_lines_per_chunk(),
            extensions: default_extensions(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            copybook_markers: default_copybook_markers(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_radius: default_radius(),
        }
    }
}

impl ScanConfig {
    /// Whether a chunk filename looks like a mainframe artifact worth scanning
    pub fn is_artifact(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.artifact_markers
            .iter()
            .any(|marker| lower.contains(&marker.to_lowercase()))
    }
}

impl FieldsConfig {
    /// Whether a chunk filename looks like a copybook
    pub fn is_copybook(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.copybook_markers
            .iter()
            .any(|marker| lower.contains(&marker.to_lowercase()))
    }
}

impl LineageConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "lineage.toml",
            ".lineage.toml",
            "config/lineage.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "mainframe", "lineage") {
            let xdg_config = config_dir.config_dir().join("lineage.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (LINEAGE__*)
        builder = builder.add_source(
            Environment::with_prefix("LINEAGE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Serialize a report according to the configured output format
    pub fn render<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self.output.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LineageConfig::default();
        assert!(config.scan.parallel);
        assert_eq!(config.ingest.lines_per_chunk, 120);
        assert_eq!(config.graph.default_radius, 2);
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let config = LineageConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[scan]"));
        assert!(toml_str.contains("[fields]"));
    }

    #[test]
    fn test_artifact_markers() {
        let scan = ScanConfig::default();
        assert!(scan.is_artifact("PGMA.CBL"));
        assert!(scan.is_artifact("DB2:ACCOUNTS"));
        assert!(scan.is_artifact("jobs/nightly.jcl"));
        assert!(!scan.is_artifact("design-notes.pdf"));
    }

    #[test]
    fn test_copybook_markers() {
        let fields = FieldsConfig::default();
        assert!(fields.is_copybook("ACCTREC.CPY"));
        assert!(fields.is_copybook("COPYBOOK:ACCTREC"));
        assert!(fields.is_copybook("shared/acct.copybook"));
        assert!(!fields.is_copybook("PGMA.CBL"));
    }
}
