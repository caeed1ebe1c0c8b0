//! Gateway configuration loading
//!
//! Effective settings come from, in priority order: command-line
//! arguments (handled by the binary), environment variables (via the
//! CLI layer), a TOML configuration file, and compiled defaults. A
//! missing configuration file is not fatal: the gateway starts on
//! defaults with a warning.
//!
//! The variable seed file is a separate, deliberately plain format: one
//! `name=value` per line, `;` starts a comment line, values may be
//! wrapped in double quotes, surrounding whitespace is trimmed.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default OSC target port.
pub const DEFAULT_OSC_PORT: u16 = 3001;
/// Default user-variable prefix.
pub const DEFAULT_USER_PREFIX: &str = "DPU.";

/// Effective gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Static web root served outside `/cgi-bin/`.
    pub web_root: PathBuf,
    /// Create datapool variables on first reference.
    pub on_the_fly_allocation: bool,
    /// Prefix routing variables to the user accessors.
    pub user_prefix: String,
    /// OSC target host name or IP.
    pub osc_host: String,
    /// OSC target port.
    pub osc_port: u16,
    /// Prefix selecting which writes are mirrored to the OSC host.
    /// Empty mirrors everything.
    pub osc_prefix: String,
    /// Stop the `setValue.cgi` pair scan at the first pair lacking `=`
    /// (wire-compatible behavior). `false` skips the malformed pair and
    /// continues.
    pub strict_pair_scan: bool,
    /// Optional `name=value` seed file for the datapool.
    pub seed_file: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            web_root: PathBuf::from("www"),
            on_the_fly_allocation: false,
            user_prefix: DEFAULT_USER_PREFIX.to_string(),
            osc_host: "localhost".to_string(),
            osc_port: DEFAULT_OSC_PORT,
            osc_prefix: String::new(),
            strict_pair_scan: true,
            seed_file: None,
        }
    }
}

/// Optional-field mirror of [`GatewayConfig`] for TOML parsing.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    port: Option<u16>,
    web_root: Option<PathBuf>,
    on_the_fly_allocation: Option<bool>,
    user_prefix: Option<String>,
    osc_host: Option<String>,
    osc_port: Option<u16>,
    osc_prefix: Option<String>,
    strict_pair_scan: Option<bool>,
    seed_file: Option<PathBuf>,
}

impl GatewayConfig {
    /// Load configuration from `path`, or from the default location when
    /// `None`. A missing file yields the compiled defaults.
    pub fn load(path: Option<&Path>) -> Result<GatewayConfig> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = GatewayConfig::default();
        let Some(path) = path else {
            warn!("no configuration file found, using defaults");
            return Ok(config);
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("cannot read {}: {e}, using defaults", path.display());
                return Ok(config);
            }
        };
        let parsed: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        if let Some(port) = parsed.port {
            config.port = port;
        }
        if let Some(web_root) = parsed.web_root {
            config.web_root = web_root;
        }
        if let Some(v) = parsed.on_the_fly_allocation {
            config.on_the_fly_allocation = v;
        }
        if let Some(v) = parsed.user_prefix {
            config.user_prefix = v;
        }
        if let Some(v) = parsed.osc_host {
            config.osc_host = v;
        }
        if let Some(v) = parsed.osc_port {
            config.osc_port = v;
        }
        if let Some(v) = parsed.osc_prefix {
            config.osc_prefix = v;
        }
        if let Some(v) = parsed.strict_pair_scan {
            config.strict_pair_scan = v;
        }
        if let Some(v) = parsed.seed_file {
            config.seed_file = Some(v);
        }
        Ok(config)
    }
}

/// Default configuration file location: the per-user config directory
/// first, then the system-wide one.
fn default_config_path() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        let user_config = dir.join("oscgate").join("oscgate.toml");
        if user_config.exists() {
            return Some(user_config);
        }
    }
    let system_config = PathBuf::from("/etc/oscgate/oscgate.toml");
    if system_config.exists() {
        return Some(system_config);
    }
    None
}

/// Read an ordered variable seed list from a `name=value` lines file.
///
/// Lines without `=` and `;`-comment lines are skipped; one layer of
/// double quotes around the value is stripped.
pub fn load_seed_file(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)?;
    let mut seed = Vec::new();
    for raw in content.lines() {
        if raw.starts_with(';') {
            continue;
        }
        let Some((name, value)) = raw.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let mut value = value.trim();
        value = value.strip_prefix('"').unwrap_or(value);
        value = value.strip_suffix('"').unwrap_or(value);
        seed.push((name.to_string(), value.to_string()));
    }
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.user_prefix, "DPU.");
        assert_eq!(config.osc_host, "localhost");
        assert_eq!(config.osc_port, 3001);
        assert_eq!(config.osc_prefix, "");
        assert!(!config.on_the_fly_allocation);
        assert!(config.strict_pair_scan);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 9090\nosc_host = \"synth.local\"\non_the_fly_allocation = true"
        )
        .unwrap();
        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.osc_host, "synth.local");
        assert!(config.on_the_fly_allocation);
        // untouched keys keep their defaults
        assert_eq!(config.osc_port, 3001);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number").unwrap();
        assert!(GatewayConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn seed_file_parses_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "; initial control values").unwrap();
        writeln!(file, "/1/fader1 = \"0.5\"").unwrap();
        writeln!(file, "label=hello world").unwrap();
        writeln!(file, "not a pair").unwrap();
        writeln!(file, "  spaced  =  trimmed  ").unwrap();
        let seed = load_seed_file(file.path()).unwrap();
        assert_eq!(
            seed,
            vec![
                ("/1/fader1".to_string(), "0.5".to_string()),
                ("label".to_string(), "hello world".to_string()),
                ("spaced".to_string(), "trimmed".to_string()),
            ]
        );
    }
}
