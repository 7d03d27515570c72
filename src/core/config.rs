//! RZ-011: Config file parsing and validation.
//!
//! The config names the external tools and shell hooks the workflow calls
//! and carries invocation defaults. Every field is optional; a missing file
//! means all defaults.
//!
//! Validation rules:
//! - Version must be "1.0"
//! - Tool and hook names must not be empty
//! - Default mode must not be empty

use super::error::EnvError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name looked up in the home directory.
pub const CONFIG_FILE_NAME: &str = ".rez-env.yaml";

/// Env var naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REZ_ENV_CONFIG";

/// Root config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Schema version (must be "1.0")
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            tools: ToolsConfig::default(),
            shell: ShellConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// External programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_resolver")]
    pub resolver: String,

    #[serde(default = "default_dot_renderer")]
    pub dot_renderer: String,

    #[serde(default = "default_wrapper_expander")]
    pub wrapper_expander: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            resolver: default_resolver(),
            dot_renderer: default_dot_renderer(),
            wrapper_expander: default_wrapper_expander(),
        }
    }
}

fn default_resolver() -> String {
    "rez-config".to_string()
}

fn default_dot_renderer() -> String {
    "rez-dot".to_string()
}

fn default_wrapper_expander() -> String {
    "rez-env-autowrappers".to_string()
}

/// Commands the hand-off source file runs inside the new shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_bashrc_hook")]
    pub bashrc_hook: String,

    #[serde(default = "default_context_info")]
    pub context_info: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            bashrc_hook: default_bashrc_hook(),
            context_info: default_context_info(),
        }
    }
}

fn default_bashrc_hook() -> String {
    "rez-env-bashrc".to_string()
}

fn default_context_info() -> String {
    "rez-context-info".to_string()
}

/// Invocation defaults, overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub tmpdir: Option<PathBuf>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            tmpdir: None,
        }
    }
}

fn default_mode() -> String {
    "latest".to_string()
}

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a config file from disk.
pub fn parse_config_file(path: &Path) -> Result<EnvConfig, EnvError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| EnvError::io("failed to read", path, e))?;
    parse_config(&content)
}

/// Parse a config from a YAML string.
pub fn parse_config(yaml: &str) -> Result<EnvConfig, EnvError> {
    if yaml.trim().is_empty() {
        return Ok(EnvConfig::default());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| EnvError::Config(format!("YAML parse error: {}", e)))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &EnvConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    let named = [
        ("tools.resolver", &config.tools.resolver),
        ("tools.dot_renderer", &config.tools.dot_renderer),
        ("tools.wrapper_expander", &config.tools.wrapper_expander),
        ("shell.bashrc_hook", &config.shell.bashrc_hook),
        ("shell.context_info", &config.shell.context_info),
        ("defaults.mode", &config.defaults.mode),
    ];
    for (field, value) in named {
        if value.trim().is_empty() {
            errors.push(ValidationError {
                message: format!("{} must not be empty", field),
            });
        }
    }

    errors
}

/// Find the config file: explicit path, then `$REZ_ENV_CONFIG`, then
/// `~/.rez-env.yaml` if it exists.
pub fn locate_config(explicit: Option<&Path>, env_path: Option<&str>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Some(p) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(p));
    }
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Load and validate the config, falling back to defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<EnvConfig, EnvError> {
    let config = match path {
        Some(p) => parse_config_file(p)?,
        None => EnvConfig::default(),
    };
    let errors = validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    Err(EnvError::Config(
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rz011_parse_full() {
        let yaml = r#"
version: "1.0"
tools:
  resolver: /opt/rez/bin/rez-config
  dot_renderer: rez-dot
  wrapper_expander: rez-env-autowrappers
shell:
  bashrc_hook: rez-env-bashrc
  context_info: rez-context-info
defaults:
  mode: earliest
  tmpdir: /scratch/tmp
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.tools.resolver, "/opt/rez/bin/rez-config");
        assert_eq!(config.defaults.mode, "earliest");
        assert_eq!(config.defaults.tmpdir, Some(PathBuf::from("/scratch/tmp")));
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_rz011_partial_uses_defaults() {
        let config = parse_config("tools:\n  resolver: my-resolver\n").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.tools.resolver, "my-resolver");
        assert_eq!(config.tools.dot_renderer, "rez-dot");
        assert_eq!(config.shell.bashrc_hook, "rez-env-bashrc");
        assert_eq!(config.defaults.mode, "latest");
    }

    #[test]
    fn test_rz011_empty_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config.tools.wrapper_expander, "rez-env-autowrappers");
    }

    #[test]
    fn test_rz011_bad_version() {
        let config = parse_config("version: \"2.0\"\n").unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("version")));
    }

    #[test]
    fn test_rz011_empty_tool_name() {
        let config = parse_config("tools:\n  dot_renderer: \"\"\n").unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("tools.dot_renderer")));
    }

    #[test]
    fn test_rz011_invalid_yaml() {
        let result = parse_config("tools: [valid: yaml: {{");
        assert!(matches!(result, Err(EnvError::Config(_))));
    }

    #[test]
    fn test_rz011_load_file_and_reject_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.yaml");
        std::fs::write(&good, "defaults:\n  mode: latest\n").unwrap();
        assert!(load_config(Some(&good)).is_ok());

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "version: \"0.9\"\n").unwrap();
        let err = load_config(Some(&bad)).unwrap_err();
        assert!(err.to_string().contains("version must be"));
    }

    #[test]
    fn test_rz011_load_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/rez-env.yaml"))).unwrap_err();
        assert!(matches!(err, EnvError::Io { .. }));
    }

    #[test]
    fn test_rz011_locate_prefers_explicit_then_env() {
        let explicit = Path::new("/etc/rez-env.yaml");
        assert_eq!(
            locate_config(Some(explicit), Some("/from/env.yaml")),
            Some(PathBuf::from("/etc/rez-env.yaml"))
        );
        assert_eq!(
            locate_config(None, Some("/from/env.yaml")),
            Some(PathBuf::from("/from/env.yaml"))
        );
    }
}
