use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ORG_URL_VAR: &str = "AZURE_DEVOPS_ORG_URL";
pub const PAT_VAR: &str = "AZURE_DEVOPS_PAT";
pub const PROJECT_VAR: &str = "AZURE_DEVOPS_PROJECT";
pub const CONFIG_PATH_VAR: &str = "AZURE_DEVOPS_MCP_CONFIG";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Optional on-disk settings. Environment variables override every field.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    org_url: Option<String>,
    pat: Option<String>,
    default_project: Option<String>,
    request_timeout_secs: Option<u64>,
    log_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub org_url: String,
    pub pat: String,
    pub default_project: Option<String>,
    pub request_timeout_secs: u64,
    pub log_level: Option<String>,
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devops-mcp")
        .join("config.toml")
}

pub fn load_config() -> Result<Config> {
    let file = load_file(&config_path())?;
    resolve(file, |name| std::env::var(name).ok())
}

fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let pick = |var: &str, fallback: Option<String>| {
        env(var)
            .or(fallback)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let org_url = pick(ORG_URL_VAR, file.org_url);
    let pat = pick(PAT_VAR, file.pat);
    let (org_url, pat) = match (org_url, pat) {
        (Some(org_url), Some(pat)) => (org_url, pat),
        (org_url, pat) => {
            let missing: Vec<&str> = [(ORG_URL_VAR, org_url.is_none()), (PAT_VAR, pat.is_none())]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect();
            bail!(
                "{} must be set (environment or config file)",
                missing.join(" and ")
            );
        }
    };

    Ok(Config {
        org_url: org_url.trim_end_matches('/').to_string(),
        pat,
        default_project: pick(PROJECT_VAR, file.default_project),
        request_timeout_secs: file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        log_level: file.log_level,
    })
}
