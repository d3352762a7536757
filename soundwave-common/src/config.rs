//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "soundwave.db";

/// Default model artifact directory, relative to the root folder
pub const DEFAULT_MODEL_SUBDIR: &str = "models/latest";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. SOUNDWAVE_ROOT environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("SOUNDWAVE_ROOT") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Get the configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/soundwave/config.toml first, then /etc/soundwave/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("soundwave").join("config.toml"));
        let system_config = PathBuf::from("/etc/soundwave/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let config_path = dirs::config_dir()
        .map(|d| d.join("soundwave").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_path)))
    }
}

/// Get OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("soundwave"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/soundwave"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("soundwave"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/soundwave"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("soundwave"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\soundwave"))
    } else {
        PathBuf::from("./soundwave_data")
    }
}

/// Ensure the root folder exists and return the database path inside it
pub fn prepare_root_folder(root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    Ok(root.join(DATABASE_FILE_NAME))
}

/// Service settings loaded from environment variables
///
/// Missing provider credentials are not an error: the corresponding
/// discovery endpoints degrade to 503 until the credentials are supplied.
#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Discovery response cache TTL in seconds
    pub cache_ttl_seconds: u64,
    /// Access token lifetime in minutes
    pub token_expire_minutes: i64,
    /// TMDb API key (discovery disabled for movies when absent)
    pub tmdb_api_key: Option<String>,
    /// TMDb API base URL
    pub tmdb_api_base: String,
    /// Spotify client id (discovery disabled for music when absent)
    pub spotify_client_id: Option<String>,
    /// Spotify client secret
    pub spotify_client_secret: Option<String>,
    /// Spotify token endpoint URL
    pub spotify_token_url: String,
    /// Spotify API base URL
    pub spotify_api_base: String,
    /// Model artifact directory override (defaults to <root>/models/latest)
    pub model_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("SOUNDWAVE_HOST", "127.0.0.1"),
            port: env_parsed("SOUNDWAVE_PORT", 8000)?,
            cache_ttl_seconds: env_parsed("SOUNDWAVE_CACHE_TTL_SECONDS", 60)?,
            token_expire_minutes: env_parsed("SOUNDWAVE_TOKEN_EXPIRE_MINUTES", 30)?,
            tmdb_api_key: env_non_empty("TMDB_API_KEY"),
            tmdb_api_base: env_or("TMDB_API_BASE", "https://api.themoviedb.org/3"),
            spotify_client_id: env_non_empty("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: env_non_empty("SPOTIFY_CLIENT_SECRET"),
            spotify_token_url: env_or("SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token"),
            spotify_api_base: env_or("SPOTIFY_API_BASE", "https://api.spotify.com/v1"),
            model_dir: env_non_empty("SOUNDWAVE_MODEL_DIR").map(PathBuf::from),
        })
    }

    /// Model artifact directory, resolved against the root folder
    pub fn resolve_model_dir(&self, root: &Path) -> PathBuf {
        match &self.model_dir {
            Some(dir) => dir.clone(),
            None => root.join(DEFAULT_MODEL_SUBDIR),
        }
    }

    /// Whether TMDb discovery is configured
    pub fn tmdb_configured(&self) -> bool {
        self.tmdb_api_key.is_some()
    }

    /// Whether Spotify discovery is configured
    pub fn spotify_configured(&self) -> bool {
        self.spotify_client_id.is_some() && self.spotify_client_secret.is_some()
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn env_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse::<T>().map_err(|e| {
            warn!("Invalid value for {}: {}", name, e);
            Error::Config(format!("Invalid value for {}: {}", name, e))
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "SOUNDWAVE_HOST",
            "SOUNDWAVE_PORT",
            "SOUNDWAVE_CACHE_TTL_SECONDS",
            "SOUNDWAVE_TOKEN_EXPIRE_MINUTES",
            "TMDB_API_KEY",
            "SPOTIFY_CLIENT_ID",
            "SPOTIFY_CLIENT_SECRET",
            "SOUNDWAVE_MODEL_DIR",
            "SOUNDWAVE_ROOT",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_env_empty() {
        clear_env();
        let settings = Settings::from_env().unwrap();

        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.cache_ttl_seconds, 60);
        assert_eq!(settings.token_expire_minutes, 30);
        assert!(settings.tmdb_api_key.is_none());
        assert!(!settings.tmdb_configured());
        assert!(!settings.spotify_configured());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("SOUNDWAVE_PORT", "9100");
        std::env::set_var("TMDB_API_KEY", "tmdb-key");
        std::env::set_var("SPOTIFY_CLIENT_ID", "cid");
        std::env::set_var("SPOTIFY_CLIENT_SECRET", "secret");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.port, 9100);
        assert!(settings.tmdb_configured());
        assert!(settings.spotify_configured());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_config_error() {
        clear_env();
        std::env::set_var("SOUNDWAVE_PORT", "not-a-port");

        assert!(Settings::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_spotify_requires_both_credentials() {
        clear_env();
        std::env::set_var("SPOTIFY_CLIENT_ID", "cid");

        let settings = Settings::from_env().unwrap();
        assert!(!settings.spotify_configured());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_root_folder_cli_wins_over_env() {
        clear_env();
        std::env::set_var("SOUNDWAVE_ROOT", "/tmp/from-env");

        let resolved = resolve_root_folder(Some("/tmp/from-cli"));
        assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));

        let resolved = resolve_root_folder(None);
        assert_eq!(resolved, PathBuf::from("/tmp/from-env"));

        clear_env();
    }

    #[test]
    fn test_model_dir_resolution() {
        let settings = Settings {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cache_ttl_seconds: 60,
            token_expire_minutes: 30,
            tmdb_api_key: None,
            tmdb_api_base: String::new(),
            spotify_client_id: None,
            spotify_client_secret: None,
            spotify_token_url: String::new(),
            spotify_api_base: String::new(),
            model_dir: None,
        };

        let root = PathBuf::from("/data/soundwave");
        assert_eq!(
            settings.resolve_model_dir(&root),
            PathBuf::from("/data/soundwave/models/latest")
        );

        let settings = Settings {
            model_dir: Some(PathBuf::from("/opt/models")),
            ..settings
        };
        assert_eq!(settings.resolve_model_dir(&root), PathBuf::from("/opt/models"));
    }
}
