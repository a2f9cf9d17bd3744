//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, CopilotConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local). Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/flare-copilot/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("flare-copilot/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("flare-copilot.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file into a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base`. Nested tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut CopilotConfig, sources: &mut ConfigSources) {
    apply_overrides_with(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from an arbitrary key lookup. `apply_env_overrides` passes
/// the process environment; tests pass a map.
pub fn apply_overrides_with<F>(config: &mut CopilotConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = Overrides {
        lookup: &lookup,
        sources,
    };

    // Bind
    overrides.string("FLARE_COPILOT_HOST", &mut config.bind.host);
    overrides.parsed("FLARE_COPILOT_HTTP_PORT", &mut config.bind.http_port);

    // Telemetry
    overrides.string("FLARE_COPILOT_LOG_LEVEL", &mut config.telemetry.log_level);
    // RUST_LOG wins over our own variable, matching tracing-subscriber conventions
    overrides.string("RUST_LOG", &mut config.telemetry.log_level);
    overrides.optional("FLARE_COPILOT_OTLP_ENDPOINT", &mut config.telemetry.otlp_endpoint);
    overrides.optional("OTEL_EXPORTER_OTLP_ENDPOINT", &mut config.telemetry.otlp_endpoint);

    // Model
    overrides.optional("ANTHROPIC_API_KEY", &mut config.model.api_key);
    overrides.string("ANTHROPIC_BASE_URL", &mut config.model.base_url);
    overrides.string("FLARE_COPILOT_MODEL", &mut config.model.model);
    overrides.parsed("FLARE_COPILOT_MAX_TOKENS", &mut config.model.max_tokens);

    // Agent loop budget
    overrides.parsed("FLARE_COPILOT_MAX_ROUNDS", &mut config.agent.max_rounds);
    overrides.parsed("FLARE_COPILOT_WALL_CLOCK_SECS", &mut config.agent.wall_clock_secs);

    // Oracles
    overrides.string("FLARE_COPILOT_RPC_URL", &mut config.oracle.rpc_url);
    overrides.string("FLARE_COPILOT_VERIFIER_URL", &mut config.oracle.verifier_url);
    overrides.string("FLARE_COPILOT_DA_LAYER_URL", &mut config.oracle.da_layer_url);
    overrides.string("FLARE_COPILOT_FDC_API_KEY", &mut config.oracle.api_key);
    overrides.parsed("FLARE_COPILOT_SUBMISSION_MODE", &mut config.oracle.submission.mode);
}

struct Overrides<'a, F> {
    lookup: &'a F,
    sources: &'a mut ConfigSources,
}

impl<F> Overrides<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&mut self, key: &str, target: &mut String) {
        if let Some(v) = (self.lookup)(key) {
            *target = v;
            self.sources.env_overrides.push(key.to_string());
        }
    }

    fn optional(&mut self, key: &str, target: &mut Option<String>) {
        if let Some(v) = (self.lookup)(key).filter(|v| !v.is_empty()) {
            *target = Some(v);
            self.sources.env_overrides.push(key.to_string());
        }
    }

    /// Unparseable values are ignored, leaving the file/default value in place.
    fn parsed<T: FromStr>(&mut self, key: &str, target: &mut T) {
        if let Some(v) = (self.lookup)(key).and_then(|v| v.trim().parse().ok()) {
            *target = v;
            self.sources.env_overrides.push(key.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubmissionKind;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[bind]
http_port = 9000
"#;
        let table = parse_table(toml, Path::new("test.toml")).unwrap();
        let config = CopilotConfig::from_table(table).unwrap();
        assert_eq!(config.bind.http_port, 9000);
        // Other values should be defaults
        assert_eq!(config.bind.host, "0.0.0.0");
        assert_eq!(config.agent.max_rounds, 8);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_table("[bind\nhttp_port = ", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_merge_tables_nested() {
        let mut base = parse_table(
            r#"
[oracle]
rpc_url = "http://base"
da_timeout_secs = 7

[oracle.submission]
delay_ms = 10
"#,
            Path::new("base.toml"),
        )
        .unwrap();

        let overlay = parse_table(
            r#"
[oracle]
rpc_url = "http://overlay"

[oracle.submission]
mode = "live"
"#,
            Path::new("overlay.toml"),
        )
        .unwrap();

        merge_tables(&mut base, overlay);
        let config = CopilotConfig::from_table(base).unwrap();

        assert_eq!(config.oracle.rpc_url, "http://overlay");
        assert_eq!(config.oracle.da_timeout_secs, 7);
        assert_eq!(config.oracle.submission.delay_ms, 10);
        assert_eq!(config.oracle.submission.mode, SubmissionKind::Live);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CopilotConfig::default();
        let mut sources = ConfigSources::default();

        apply_overrides_with(
            &mut config,
            &mut sources,
            lookup_from(&[
                ("ANTHROPIC_API_KEY", "sk-env"),
                ("FLARE_COPILOT_HTTP_PORT", "9100"),
                ("FLARE_COPILOT_MAX_ROUNDS", "3"),
                ("FLARE_COPILOT_SUBMISSION_MODE", "LIVE"),
                ("RUST_LOG", "debug"),
            ]),
        );

        assert_eq!(config.model.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.bind.http_port, 9100);
        assert_eq!(config.agent.max_rounds, 3);
        assert_eq!(config.oracle.submission.mode, SubmissionKind::Live);
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(sources.env_overrides.len(), 5);
    }

    #[test]
    fn test_env_override_ignores_garbage() {
        let mut config = CopilotConfig::default();
        let mut sources = ConfigSources::default();

        apply_overrides_with(
            &mut config,
            &mut sources,
            lookup_from(&[("FLARE_COPILOT_HTTP_PORT", "not-a-port"), ("ANTHROPIC_API_KEY", "")]),
        );

        assert_eq!(config.bind.http_port, 8000);
        assert!(config.model.api_key.is_none());
        assert!(sources.env_overrides.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copilot.toml");
        std::fs::write(
            &path,
            r#"
[agent]
max_rounds = 2

[oracle]
verifier_url = "http://localhost:9999"
"#,
        )
        .unwrap();

        let table = load_table(&path).unwrap();
        let config = CopilotConfig::from_table(table).unwrap();
        assert_eq!(config.agent.max_rounds, 2);
        assert_eq!(config.oracle.verifier_url, "http://localhost:9999");

        let files = discover_config_files_with_override(Some(&path));
        assert_eq!(files.last(), Some(&path));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_table(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
