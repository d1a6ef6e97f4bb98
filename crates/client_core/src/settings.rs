use std::{fs, path::Path, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "repo_viewer.toml";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// What a `reload` does to fetches that are still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Earlier fetches keep running; whichever completes last sets the state.
    #[default]
    LastCompletionWins,
    /// Earlier fetches are aborted when a new one starts.
    CancelPrevious,
}

impl FromStr for ReloadPolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last_completion_wins" => Ok(Self::LastCompletionWins),
            "cancel_previous" => Ok(Self::CancelPrevious),
            other => Err(anyhow!("unknown reload policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub reload_policy: ReloadPolicy,
    pub action_buffer: usize,
    pub auth_token: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            user_agent: concat!("repo_viewer/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout_secs: 30,
            reload_policy: ReloadPolicy::default(),
            action_buffer: 16,
            auth_token: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    api_base_url: Option<String>,
    user_agent: Option<String>,
    request_timeout_secs: Option<u64>,
    reload_policy: Option<ReloadPolicy>,
    action_buffer: Option<usize>,
    auth_token: Option<String>,
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Overlays values from a TOML document. Absent keys keep their current value.
    pub fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let file: SettingsFile = toml::from_str(raw).context("invalid settings file")?;

        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.reload_policy {
            self.reload_policy = v;
        }
        if let Some(v) = file.action_buffer.filter(|v| *v > 0) {
            self.action_buffer = v;
        }
        if let Some(v) = file.auth_token {
            self.auth_token = Some(v);
        }
        Ok(())
    }

    /// Overlays environment overrides. Unparseable values are logged and skipped.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("REPO_VIEWER_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("APP__API_BASE_URL") {
            self.api_base_url = v;
        }

        if let Some(v) = lookup("REPO_VIEWER_USER_AGENT") {
            self.user_agent = v;
        }

        if let Some(v) = lookup("REPO_VIEWER_TIMEOUT_SECS") {
            match v.parse::<u64>() {
                Ok(parsed) => self.request_timeout_secs = parsed,
                Err(error) => warn!(value = %v, %error, "ignoring REPO_VIEWER_TIMEOUT_SECS"),
            }
        }

        if let Some(v) = lookup("REPO_VIEWER_RELOAD_POLICY") {
            match v.parse::<ReloadPolicy>() {
                Ok(parsed) => self.reload_policy = parsed,
                Err(error) => warn!(value = %v, %error, "ignoring REPO_VIEWER_RELOAD_POLICY"),
            }
        }

        if let Some(v) = lookup("REPO_VIEWER_ACTION_BUFFER") {
            match v.parse::<usize>() {
                Ok(parsed) if parsed > 0 => self.action_buffer = parsed,
                _ => warn!(value = %v, "ignoring REPO_VIEWER_ACTION_BUFFER"),
            }
        }

        if let Some(v) = lookup("GITHUB_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.auth_token = Some(v);
        }
    }
}

/// Builds settings from defaults, then a TOML file, then the environment.
///
/// An explicit `path` must exist. Without one, `repo_viewer.toml` in the
/// working directory is used when present.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
            settings
                .apply_toml(&raw)
                .with_context(|| format!("failed to load settings from '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_SETTINGS_FILE) {
                settings
                    .apply_toml(&raw)
                    .with_context(|| format!("failed to load settings from '{DEFAULT_SETTINGS_FILE}'"))?;
            }
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
