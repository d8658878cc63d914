//! Application-level configuration loading: Discord credentials, storage backend and the
//! two community channels the contest runs in.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::community::Community;

/// Default location on disk where the bot looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "NOODLE_JUDGE_CONFIG_PATH";
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_MONGO_DB: &str = "noodle_judge";
/// Users allowed to author trivia and run the private moderator commands.
const DEFAULT_AUTHORS: [u64; 3] = [369975025609998337, 251082987360223233, 716983438401601539];

/// Reasons a configuration cannot be used to start the bot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No Discord token in the file nor in `DISCORD_TOKEN`.
    #[error("discord token is missing (set `discord_token` or DISCORD_TOKEN)")]
    MissingToken,
    /// A community has no server or channel configured.
    #[error("community `{0}` has no server or channel configured")]
    MissingCommunity(Community),
    /// Both communities point at the same channel.
    #[error("both communities are configured with channel `{0}`")]
    SharedChannel(u64),
    /// An id in the file is not a Discord snowflake.
    #[error("`{field}` is not a valid Discord id: `{value}`")]
    InvalidId {
        /// Configuration key holding the bad value.
        field: &'static str,
        /// Raw value found in the file.
        value: String,
    },
}

/// Which [`crate::dao::contest_store::ContestStore`] backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MongoDB, the production backend.
    #[default]
    Mongo,
    /// Process-local store; state is lost on exit.
    Memory,
}

/// Storage connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,
    /// MongoDB connection string.
    pub mongo_uri: String,
    /// MongoDB database name.
    pub mongo_db: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            mongo_uri: DEFAULT_MONGO_URI.into(),
            mongo_db: DEFAULT_MONGO_DB.into(),
        }
    }
}

/// Guild and channel ids for one community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommunityConfig {
    /// Guild (server) id.
    pub server: u64,
    /// Id of the scored channel.
    pub channel: u64,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Bot token used to log into the gateway.
    pub discord_token: String,
    /// Storage connection settings.
    pub storage: StorageConfig,
    /// Itto community ids.
    pub itto: CommunityConfig,
    /// Shenhe community ids.
    pub shenhe: CommunityConfig,
    /// Flat allowlist of trivia authors.
    pub authors: Vec<u64>,
}

impl AppConfig {
    /// Load the configuration from disk and apply environment overrides, falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents)
                .map_err(|err| err.to_string())
                .and_then(|raw| Self::try_from(raw).map_err(|err| err.to_string()))
            {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(token) = non_empty_env("DISCORD_TOKEN") {
            self.discord_token = token;
        }
        if let Some(uri) = non_empty_env("MONGO_URI") {
            self.storage.mongo_uri = uri;
        }
        if let Some(db) = non_empty_env("MONGO_DB") {
            self.storage.mongo_db = db;
        }
        self
    }

    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        for community in Community::ALL {
            let ids = self.community(community);
            if ids.server == 0 || ids.channel == 0 {
                return Err(ConfigError::MissingCommunity(community));
            }
        }
        if self.itto.channel == self.shenhe.channel {
            return Err(ConfigError::SharedChannel(self.itto.channel));
        }
        Ok(())
    }

    /// Ids configured for `community`.
    pub fn community(&self, community: Community) -> &CommunityConfig {
        match community {
            Community::Itto => &self.itto,
            Community::Shenhe => &self.shenhe,
        }
    }

    /// Community whose scored channel is `channel`, if any.
    pub fn community_for_channel(&self, channel: u64) -> Option<Community> {
        Community::ALL
            .into_iter()
            .find(|community| self.community(*community).channel == channel)
    }

    /// Community owning the guild `server`, if any.
    pub fn community_for_server(&self, server: u64) -> Option<Community> {
        Community::ALL
            .into_iter()
            .find(|community| self.community(*community).server == server)
    }

    /// Whether `user` is on the trivia author allowlist.
    pub fn is_author(&self, user: u64) -> bool {
        self.authors.contains(&user)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            storage: StorageConfig::default(),
            itto: CommunityConfig::default(),
            shenhe: CommunityConfig::default(),
            authors: DEFAULT_AUTHORS.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    discord_token: String,
    #[serde(default)]
    storage: RawStorage,
    servers: RawServers,
    #[serde(default)]
    authors: Option<Vec<RawSnowflake>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStorage {
    #[serde(default)]
    backend: StorageBackend,
    mongo_uri: Option<String>,
    mongo_db: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawServers {
    itto: RawCommunity,
    shenhe: RawCommunity,
}

#[derive(Debug, Deserialize)]
struct RawCommunity {
    server: RawSnowflake,
    channel: RawSnowflake,
}

/// Discord ids are usually written as strings since they overflow JSON numbers in most
/// tooling; both spellings are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Number(u64),
    Text(String),
}

impl RawSnowflake {
    fn parse(self, field: &'static str) -> Result<u64, ConfigError> {
        match self {
            RawSnowflake::Number(value) => Ok(value),
            RawSnowflake::Text(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidId { field, value }),
        }
    }
}

impl TryFrom<RawCommunity> for CommunityConfig {
    type Error = ConfigError;

    fn try_from(value: RawCommunity) -> Result<Self, Self::Error> {
        Ok(Self {
            server: value.server.parse("server")?,
            channel: value.channel.parse("channel")?,
        })
    }
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let defaults = StorageConfig::default();
        let authors = match value.authors {
            Some(raw) => raw
                .into_iter()
                .map(|id| id.parse("authors"))
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_AUTHORS.to_vec(),
        };

        Ok(Self {
            discord_token: value.discord_token,
            storage: StorageConfig {
                backend: value.storage.backend,
                mongo_uri: value.storage.mongo_uri.unwrap_or(defaults.mongo_uri),
                mongo_db: value.storage.mongo_db.unwrap_or(defaults.mongo_db),
            },
            itto: value.servers.itto.try_into()?,
            shenhe: value.servers.shenhe.try_into()?,
            authors,
        })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
