use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::ports::{CredentialSource, DeliveryCredentials};

const TOKEN_ENV: &str = "VIGIL_TELEGRAM_TOKEN";
const CHAT_ID_ENV: &str = "VIGIL_TELEGRAM_CHAT_ID";

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("telegram credentials not found")]
    NotFound,

    #[error("secrets file read error: {source}")]
    Read {
        #[from]
        source: std::io::Error,
    },

    #[error("secrets.toml parse error: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    #[error("secrets.toml serialization error: {source}")]
    Serialize {
        #[from]
        source: toml::ser::Error,
    },
}

#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
struct SecretsFile {
    telegram: Option<TelegramSecrets>,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct TelegramSecrets {
    token: String,
    chat_id: String,
}

/// Environment variables win over `secrets.toml`; empty values count as absent.
pub fn resolve_telegram_credentials() -> Result<DeliveryCredentials, SecretsError> {
    if let Some(credentials) =
        credentials_from_values(std::env::var(TOKEN_ENV).ok(), std::env::var(CHAT_ID_ENV).ok())
    {
        return Ok(credentials);
    }

    let path = secrets_path();
    if !path.exists() {
        return Err(SecretsError::NotFound);
    }

    let content = std::fs::read_to_string(&path)?;
    parse_secrets(&content)?.ok_or(SecretsError::NotFound)
}

/// Writes the Telegram section of `secrets.toml`, readable by the owner only.
pub fn save_telegram_credentials(token: &str, chat_id: &str) -> Result<PathBuf, SecretsError> {
    let path = secrets_path();

    let mut secrets = if path.exists() {
        toml::from_str::<SecretsFile>(&std::fs::read_to_string(&path)?)?
    } else {
        SecretsFile::default()
    };
    secrets.telegram = Some(TelegramSecrets {
        token: token.trim().to_string(),
        chat_id: chat_id.trim().to_string(),
    });

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string(&secrets)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(path)
}

pub fn secrets_path() -> PathBuf {
    Config::config_dir().join("secrets.toml")
}

fn credentials_from_values(
    token: Option<String>,
    chat_id: Option<String>,
) -> Option<DeliveryCredentials> {
    let credentials = DeliveryCredentials {
        token: token?,
        chat_id: chat_id?,
    };
    credentials.is_complete().then_some(credentials)
}

fn parse_secrets(content: &str) -> Result<Option<DeliveryCredentials>, SecretsError> {
    let secrets: SecretsFile = toml::from_str(content)?;

    Ok(secrets
        .telegram
        .and_then(|telegram| credentials_from_values(Some(telegram.token), Some(telegram.chat_id))))
}

/// Resolves credentials on every call so edits to `secrets.toml` apply without a restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretsCredentialSource;

impl CredentialSource for SecretsCredentialSource {
    fn resolve(&self) -> Option<DeliveryCredentials> {
        match resolve_telegram_credentials() {
            Ok(credentials) => Some(credentials),
            Err(SecretsError::NotFound) => {
                debug!("telegram credentials not configured");
                None
            }
            Err(error) => {
                warn!(%error, "failed to resolve telegram credentials");
                None
            }
        }
    }
}
