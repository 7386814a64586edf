use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;
use url::Url;

use crate::model::Resources;
use crate::types::AppPackageId;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_DSL_URL: &str = "http://localhost:8001/v1/parse";
pub const DEFAULT_SCHEDULING_URL: &str = "http://localhost:8002/v1/schedule";
pub const DEFAULT_SIMULATION_URL: &str = "http://localhost:50051/rpc";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration of the orchestrator.
///
/// Every field has a default, so an empty JSON object (or no file at all)
/// yields a config pointing at collaborators on localhost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub bind: String,
    pub timeout_secs: u64,
    pub dsl_url: String,
    pub scheduling_url: String,
    pub simulation_url: String,
    /// Serve the built-in package for ids missing from `packages`.
    pub fallback_to_default: bool,
    /// Resources used by packages that do not declare their own.
    pub default_resources: Resources,
    pub packages: BTreeMap<AppPackageId, PackageConfig>,
}

/// Application package as declared in the config file.
///
/// Exactly one of `dsl_text` / `dsl_file` must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsl_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsl_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dsl_url: DEFAULT_DSL_URL.to_string(),
            scheduling_url: DEFAULT_SCHEDULING_URL.to_string(),
            simulation_url: DEFAULT_SIMULATION_URL.to_string(),
            fallback_to_default: true,
            default_resources: Resources::default(),
            packages: BTreeMap::new(),
        }
    }
}

/// Values supplied on the command line or via `VEMU_*` env vars.
/// `Some` wins over whatever the config file says.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub timeout_secs: Option<u64>,
    pub dsl_url: Option<String>,
    pub scheduling_url: Option<String>,
    pub simulation_url: Option<String>,
}

impl OrchestratorConfig {
    /// Load from the first config file found (see [`resolve_config_path`]),
    /// or fall back to defaults when there is none.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a config file. Relative `dsl_file` paths are resolved against
    /// the directory holding the config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut cfg = Self::from_json_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        if let Some(base) = path.parent() {
            for pkg in cfg.packages.values_mut() {
                if let Some(file) = pkg.dsl_file.as_mut() {
                    if file.is_relative() {
                        *file = base.join(&*file);
                    }
                }
            }
        }

        debug!("Loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Parse config JSON, expanding `${VAR}` placeholders in every string value.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let mut value: Value = serde_json::from_str(raw)?;
        expand_value(&mut value, &|name| env::var(name).ok());
        Ok(serde_json::from_value(value)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(url) = overrides.dsl_url {
            self.dsl_url = url;
        }
        if let Some(url) = overrides.scheduling_url {
            self.scheduling_url = url;
        }
        if let Some(url) = overrides.simulation_url {
            self.simulation_url = url;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }

        for (name, raw) in [
            ("dsl_url", &self.dsl_url),
            ("scheduling_url", &self.scheduling_url),
            ("simulation_url", &self.simulation_url),
        ] {
            let url = Url::parse(raw).with_context(|| format!("`{name}` is not a valid URL"))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("`{name}` must use http or https, got `{}`", url.scheme());
            }
        }

        for (id, pkg) in &self.packages {
            match (&pkg.dsl_text, &pkg.dsl_file) {
                (Some(_), None) | (None, Some(_)) => {}
                (None, None) => bail!("Package `{id}` must have either `dsl_text` or `dsl_file`"),
                (Some(_), Some(_)) => {
                    bail!("Package `{id}` must not set both `dsl_text` and `dsl_file`")
                }
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Locate the config file: explicit path, then `VEMU_CONFIG`, then
/// `$XDG_CONFIG_HOME/vemu/orchestrator.json`, then `./orchestrator.json`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    if let Ok(p) = env::var("VEMU_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("vemu").join("orchestrator.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("orchestrator.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

/// Replace `${NAME}` with `lookup(NAME)`. Unknown names stay verbatim.
fn expand_env_vars(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            match lookup(&name) {
                Some(val) if closed => out.push_str(&val),
                _ => {
                    out.push_str("${");
                    out.push_str(&name);
                    if closed {
                        out.push('}');
                    }
                }
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn expand_value(value: &mut Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) => *s = expand_env_vars(s, lookup),
        Value::Array(items) => items.iter_mut().for_each(|v| expand_value(v, lookup)),
        Value::Object(map) => map.values_mut().for_each(|v| expand_value(v, lookup)),
        _ => {}
    }
}
