use std::{env::var, path::PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_BASE: &str = "/api";

#[derive(Serialize, Deserialize, Default)]
pub struct ConsoleConfigFile {
    pub server_url: Option<String>,
    pub api_base: Option<String>,
    pub session_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub server_url: String,
    pub api_base: String,
    pub session_path: PathBuf,
}

impl ConsoleConfig {
    /// Resolves each setting from the environment, then the config file, then defaults.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = var("APKMAN_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        let config_file = match std::fs::read_to_string(&config_path) {
            Ok(text) => {
                debug!("Using config file {}", config_path.to_string_lossy());
                toml::from_str::<ConsoleConfigFile>(&text).map_err(|err| {
                    anyhow::anyhow!(
                        "Invalid config file {}: {}",
                        config_path.to_string_lossy(),
                        err
                    )
                })?
            }
            Err(_) => ConsoleConfigFile::default(),
        };
        Ok(Self::resolve(
            config_file,
            var("APKMAN_SERVER_URL").ok(),
            var("APKMAN_API_BASE").ok(),
            var("APKMAN_SESSION_PATH").ok(),
        ))
    }

    fn resolve(
        file: ConsoleConfigFile,
        server_url: Option<String>,
        api_base: Option<String>,
        session_path: Option<String>,
    ) -> Self {
        ConsoleConfig {
            server_url: server_url
                .or(file.server_url)
                .unwrap_or(DEFAULT_SERVER_URL.to_string()),
            api_base: api_base
                .or(file.api_base)
                .unwrap_or(DEFAULT_API_BASE.to_string()),
            session_path: session_path
                .or(file.session_path)
                .map(PathBuf::from)
                .unwrap_or_else(default_session_path),
        }
    }

    pub fn with_server_url(mut self, server_url: Option<String>) -> Self {
        if let Some(server_url) = server_url {
            self.server_url = server_url;
        }
        self
    }

    /// Base URL every API path is appended to, e.g. `http://localhost:8000/api`.
    pub fn api_url(&self) -> String {
        let base = self.api_base.trim_matches('/');
        let server = self.server_url.trim_end_matches('/');
        if base.is_empty() {
            server.to_string()
        } else {
            format!("{}/{}", server, base)
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|x| x.join("apkman"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("apkman.toml")
}

fn default_session_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|x| x.join("apkman"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("session.toml")
}
