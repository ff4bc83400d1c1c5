//! Configuration file handling.
//!
//! The configuration file is stored at `$TICKETS_HOME/config.json` and holds the base URL of the
//! classification service along with settings for the result history.

use crate::error::{ErrorType, IntoResult, Res};
use crate::history::History;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "tickets";
const CONFIG_VERSION: u8 = 1;
const HISTORY_COPIES: u32 = 5;
const HISTORY: &str = ".history";
const CONFIG_JSON: &str = "config.json";

/// The service address used by a fresh configuration.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/";

/// The `Config` object represents the configuration of the app. It can be built directly from a
/// base URL with `Config::new`, or loaded from `$TICKETS_HOME/config.json` with `Config::load`, in
/// which case it also knows where the result history lives.
#[derive(Debug, Clone)]
pub struct Config {
    api_base_url: Url,
    request_timeout: Option<Duration>,
    home: Option<Home>,
}

/// Paths within the tickets home directory.
#[derive(Debug, Clone)]
struct Home {
    root: PathBuf,
    history: PathBuf,
    history_copies: u32,
}

impl Config {
    /// A configuration that talks to `api_base_url` and keeps no history.
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url: with_trailing_slash(api_base_url),
            request_timeout: None,
            home: None,
        }
    }

    /// Creates the home directory, its history subdirectory and an initial `config.json`.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail or if `api_base_url` is not a valid URL.
    pub async fn create(dir: impl Into<PathBuf>, api_base_url: &str) -> Result<Self> {
        create_home(dir.into(), api_base_url)
            .await
            .pub_result(ErrorType::Config)
    }

    /// This will
    /// - validate that `tickets_home` and its config file exist
    /// - load the config file
    /// - validate that the history directory exists
    pub async fn load(tickets_home: impl Into<PathBuf>) -> Result<Self> {
        load_home(tickets_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    fn from_parts(root: PathBuf, url: Url, config_file: &ConfigFile) -> Self {
        Self {
            api_base_url: with_trailing_slash(url),
            request_timeout: config_file.request_timeout_secs.map(Duration::from_secs),
            home: Some(Home {
                history: root.join(HISTORY),
                root,
                history_copies: config_file.history_copies,
            }),
        }
    }

    /// Replaces the service address for this process only. The config file is not changed.
    pub fn with_api_base_url(mut self, api_base_url: &str) -> Result<Self> {
        let url = parse_url(api_base_url).pub_result(ErrorType::Config)?;
        self.api_base_url = with_trailing_slash(url);
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// The base URL of the classification service, always ending with `/`.
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn root(&self) -> Option<&Path> {
        self.home.as_ref().map(|h| h.root.as_path())
    }

    /// The `History` for this home, or `None` when the config was not loaded from a home.
    pub fn history(&self) -> Option<History> {
        self.home
            .as_ref()
            .map(|h| History::new(&h.history, h.history_copies))
    }
}

async fn create_home(maybe_relative: PathBuf, api_base_url: &str) -> Res<Config> {
    let url = parse_url(api_base_url)?;

    utils::make_dir(&maybe_relative)
        .await
        .context("Unable to create the tickets home directory")?;
    let root = utils::canonicalize(&maybe_relative).await?;
    utils::make_dir(root.join(HISTORY)).await?;

    let config_file = ConfigFile {
        api_base_url: url.to_string(),
        ..ConfigFile::default()
    };
    config_file.save(root.join(CONFIG_JSON)).await?;

    Ok(Config::from_parts(root, url, &config_file))
}

async fn load_home(maybe_relative: PathBuf) -> Res<Config> {
    let root = utils::canonicalize(&maybe_relative)
        .await
        .context("Tickets home is missing, run 'tickets init' first")?;

    let config_path = root.join(CONFIG_JSON);
    if !config_path.is_file() {
        bail!("The config file is missing '{}'", config_path.display())
    }
    let config_file = ConfigFile::load(&config_path).await?;
    let url = parse_url(&config_file.api_base_url)?;

    let history = root.join(HISTORY);
    if !history.is_dir() {
        bail!("The history directory is missing '{}'", history.display())
    }
    Ok(Config::from_parts(root, url, &config_file))
}

fn parse_url(s: &str) -> Res<Url> {
    let url = Url::parse(s).with_context(|| format!("Invalid API base URL '{s}'"))?;
    if url.cannot_be_a_base() {
        bail!("The API base URL '{s}' cannot be used as a base");
    }
    Ok(url)
}

/// Relative endpoints are appended to the base path, so it has to look like a directory.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "tickets",
///   "config_version": 1,
///   "api_base_url": "http://localhost:8000/",
///   "history_copies": 5,
///   "request_timeout_secs": 30
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "tickets"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the classification service
    api_base_url: String,

    /// Number of saved upload results to keep
    #[serde(default = "default_history_copies")]
    history_copies: u32,

    /// Optional limit on each request to the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
}

fn default_history_copies() -> u32 {
    HISTORY_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            history_copies: HISTORY_COPIES,
            request_timeout_secs: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let config: ConfigFile = utils::deserialize(path.as_ref()).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}
