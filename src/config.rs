use crate::error::Error;
use log::error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_RECORD_SIZE: usize = 16;
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Path that stands for standard input.
pub const STDIN_PATH: &str = "-";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub record_size: Option<usize>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub emit_partial: Option<bool>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub read_size: Option<usize>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Hex,
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("hex") {
            Ok(OutputFormat::Hex)
        } else if s.eq_ignore_ascii_case("raw") {
            Ok(OutputFormat::Raw)
        } else {
            Err(Error::Config(format!("Unknown output format '{}'", s)))
        }
    }
}

/// An enabled, validated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub id: String,
    pub path: String,
    pub read_size: usize,
}

#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub record_size: usize,
    pub format: OutputFormat,
    pub emit_partial: bool,
    pub sources: Vec<InputSource>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            record_size: DEFAULT_RECORD_SIZE,
            format: OutputFormat::Hex,
            emit_partial: true,
            sources: vec![InputSource {
                id: "stdin".to_string(),
                path: STDIN_PATH.to_string(),
                read_size: DEFAULT_READ_SIZE,
            }],
        }
    }
}

pub fn load_config(path: &str) -> Result<PipeConfig, Error> {
    if !Path::new(path).exists() {
        return Err(Error::Config(format!("Config file not found: {}", path)));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path, e)))?;

    let cfg = parse_config(&content)
        .map_err(|e| Error::Config(format!("Failed to load config {}: {}", path, e)))?;

    log::info!("Config loaded from: {}", path);
    Ok(cfg)
}

pub fn parse_config(content: &str) -> Result<PipeConfig, Error> {
    let cfg: Config =
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;

    log::info!("Found {} sources in config", cfg.sources.len());

    let record_size = cfg.record_size.unwrap_or(DEFAULT_RECORD_SIZE);
    if record_size == 0 {
        return Err(Error::Config("record_size must be positive".to_string()));
    }
    let format = match cfg.format.as_deref() {
        Some(f) => f.parse()?,
        None => OutputFormat::Hex,
    };

    let mut sources = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    for s in cfg.sources.into_iter().filter(|s| s.enabled) {
        if !is_valid_id(&s.id) {
            error!("Invalid source id '{}'. Use [a-z0-9][a-z0-9_-]*", s.id);
            continue;
        }
        if !seen_ids.insert(s.id.clone()) {
            error!("Duplicate source id '{}' - skipping", s.id);
            continue;
        }
        let read_size = s.read_size.unwrap_or(DEFAULT_READ_SIZE);
        if read_size == 0 {
            error!("Source '{}' has read_size 0 - skipping", s.id);
            continue;
        }
        sources.push(InputSource { id: s.id, path: s.path, read_size });
    }

    log::info!("Enabled sources: {}", sources.len());
    if sources.is_empty() {
        log::warn!("No enabled sources found in config - nothing will be read");
    }

    Ok(PipeConfig {
        record_size,
        format,
        emit_partial: cfg.emit_partial.unwrap_or(true),
        sources,
    })
}

fn is_valid_id(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_lc_alnum(c) => {},
        _ => return false,
    }
    chars.all(|c| is_lc_alnum(c) || c == '-' || c == '_')
}

fn is_lc_alnum(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn test_parse_full() {
        let cfg = parse_config(
            r#"
            record_size = 4
            format = "raw"
            emit_partial = false

            [[sources]]
            id = "first"
            path = "/tmp/a.bin"
            read_size = 3
            enabled = true

            [[sources]]
            id = "off"
            path = "/tmp/b.bin"

            [[sources]]
            id = "stdin"
            path = "-"
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(cfg.record_size, 4);
        assert_eq!(cfg.format, OutputFormat::Raw);
        assert!(!cfg.emit_partial);
        assert_eq!(
            cfg.sources,
            vec![
                InputSource { id: "first".into(), path: "/tmp/a.bin".into(), read_size: 3 },
                InputSource { id: "stdin".into(), path: "-".into(), read_size: DEFAULT_READ_SIZE },
            ]
        );
    }

    #[test]
    fn test_invalid_and_duplicate_ids_skipped() {
        let cfg = parse_config(
            r#"
            [[sources]]
            id = "Bad Id"
            path = "a"
            enabled = true

            [[sources]]
            id = "dup"
            path = "b"
            enabled = true

            [[sources]]
            id = "dup"
            path = "c"
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].path, "b");
        assert_eq!(cfg.record_size, DEFAULT_RECORD_SIZE);
        assert_eq!(cfg.format, OutputFormat::Hex);
        assert!(cfg.emit_partial);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(parse_config("record_size = 0"), Err(Error::Config(_))));
        assert!(matches!(parse_config("format = \"base64\""), Err(Error::Config(_))));
        assert!(matches!(parse_config("record_size = ["), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new("bqpipe_config").unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "record_size = 8").unwrap();

        let cfg = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.record_size, 8);
        assert!(cfg.sources.is_empty());

        let missing = dir.path().join("missing.toml");
        assert!(load_config(missing.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("a"));
        assert!(is_valid_id("src-1_b"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("-a"));
        assert!(!is_valid_id("A"));
    }
}
