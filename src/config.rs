use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub signal: SignalConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignalConfig {
    pub phone_number: String,
    /// signal-cli data directory; sticker packs live in `stickers/` below it.
    pub cli_path: PathBuf,
    #[serde(default = "default_api_host")]
    pub api_host: String,
    /// Group ids, index-aligned with `telegram.chats`.
    pub chats: Vec<String>,
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chats: Vec<i64>,
    /// Signal user uuid -> token of the bot that speaks for that user.
    #[serde(default)]
    pub personalized_tokens: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    /// Answer `/id` in both directions instead of relaying it.
    #[serde(default = "default_id_command")]
    pub id_command: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            id_command: default_id_command(),
        }
    }
}

fn default_api_host() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_receive_timeout() -> u64 {
    1
}

fn default_id_command() -> bool {
    true
}

impl SignalConfig {
    /// The sticker pack directory inside the signal-cli data directory.
    pub fn sticker_dir(&self) -> PathBuf {
        self.cli_path.join("stickers")
    }
}

impl Config {
    /// Load from a TOML file when a path is given, from the environment
    /// otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Self::from_lookup(|key| std::env::var(key).ok())?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Build from environment-style variables supplied by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Missing {}", key))
        };

        let signal = SignalConfig {
            phone_number: required("SIGNAL_PHONE_NUMBER")?,
            cli_path: PathBuf::from(required("SIGNAL_CLI_PATH")?),
            api_host: lookup("SIGNAL_API_HOST").unwrap_or_else(default_api_host),
            chats: parse_list(&required("SIGNAL_CHATS")?).context("Invalid SIGNAL_CHATS")?,
            receive_timeout_secs: match lookup("SIGNAL_RECEIVE_TIMEOUT") {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid SIGNAL_RECEIVE_TIMEOUT: {}", v))?,
                None => default_receive_timeout(),
            },
        };

        let telegram = TelegramConfig {
            token: required("TELEGRAM_TOKEN")?,
            chats: parse_list(&required("TELEGRAM_CHATS")?).context("Invalid TELEGRAM_CHATS")?,
            personalized_tokens: match lookup("TELEGRAM_PERSONALIZED_TOKENS") {
                Some(v) if !v.trim().is_empty() => serde_json::from_str(&v)
                    .context("Invalid TELEGRAM_PERSONALIZED_TOKENS (expected a JSON object)")?,
                _ => HashMap::new(),
            },
        };

        let bridge = BridgeConfig {
            id_command: match lookup("BRIDGE_ID_COMMAND") {
                Some(v) => parse_bool(&v)
                    .with_context(|| format!("Invalid BRIDGE_ID_COMMAND: {}", v))?,
                None => default_id_command(),
            },
        };

        Ok(Config {
            signal,
            telegram,
            bridge,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.signal.phone_number.trim().is_empty() {
            anyhow::bail!("Signal phone number must not be empty");
        }
        if self.telegram.token.trim().is_empty() {
            anyhow::bail!("Telegram token must not be empty");
        }
        if self.signal.chats.len() != self.telegram.chats.len() {
            anyhow::bail!(
                "Signal and Telegram chat lists must have the same length ({} vs {})",
                self.signal.chats.len(),
                self.telegram.chats.len()
            );
        }
        Ok(())
    }
}

/// Accepts a JSON array (`["a","b"]`, `[1,2]`) or a comma separated list.
fn parse_list<T>(raw: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned + FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw.trim();
    if raw.starts_with('[') {
        return serde_json::from_str(raw).with_context(|| format!("Malformed JSON list: {}", raw));
    }

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|e| anyhow::anyhow!("Invalid list item '{}': {}", item, e))
        })
        .collect()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("not a boolean: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SIGNAL_PHONE_NUMBER", "+15550000000"),
            ("SIGNAL_CLI_PATH", "/var/lib/signal-cli"),
            ("SIGNAL_CHATS", r#"["G1","G2"]"#),
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHATS", "[-1001, -1002]"),
        ]
    }

    #[test]
    fn test_from_env_with_defaults() {
        let config = Config::from_lookup(env(&base_env())).unwrap();
        config.validate().unwrap();

        assert_eq!(config.signal.phone_number, "+15550000000");
        assert_eq!(config.signal.api_host, "127.0.0.1:8080");
        assert_eq!(config.signal.chats, vec!["G1", "G2"]);
        assert_eq!(config.signal.receive_timeout_secs, 1);
        assert_eq!(
            config.signal.sticker_dir(),
            PathBuf::from("/var/lib/signal-cli/stickers")
        );
        assert_eq!(config.telegram.chats, vec![-1001, -1002]);
        assert!(config.telegram.personalized_tokens.is_empty());
        assert!(config.bridge.id_command);
    }

    #[test]
    fn test_from_env_with_overrides() {
        let mut vars = base_env();
        vars.push(("SIGNAL_API_HOST", "http://signal:8080"));
        vars.push(("SIGNAL_RECEIVE_TIMEOUT", "5"));
        vars.push(("TELEGRAM_PERSONALIZED_TOKENS", r#"{"uuid-alice": "456:def"}"#));
        vars.push(("BRIDGE_ID_COMMAND", "false"));

        let config = Config::from_lookup(env(&vars)).unwrap();
        assert_eq!(config.signal.api_host, "http://signal:8080");
        assert_eq!(config.signal.receive_timeout_secs, 5);
        assert_eq!(
            config.telegram.personalized_tokens.get("uuid-alice").map(String::as_str),
            Some("456:def")
        );
        assert!(!config.bridge.id_command);
    }

    #[test]
    fn test_comma_separated_lists() {
        let mut vars = base_env();
        vars.retain(|(k, _)| *k != "SIGNAL_CHATS" && *k != "TELEGRAM_CHATS");
        vars.push(("SIGNAL_CHATS", "G1, G2"));
        vars.push(("TELEGRAM_CHATS", "-1001,-1002"));

        let config = Config::from_lookup(env(&vars)).unwrap();
        assert_eq!(config.signal.chats, vec!["G1", "G2"]);
        assert_eq!(config.telegram.chats, vec![-1001, -1002]);
    }

    #[test]
    fn test_missing_required_variable() {
        let mut vars = base_env();
        vars.retain(|(k, _)| *k != "TELEGRAM_TOKEN");
        let err = Config::from_lookup(env(&vars)).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_TOKEN"));
    }

    #[test]
    fn test_invalid_chat_id_rejected() {
        let mut vars = base_env();
        vars.retain(|(k, _)| *k != "TELEGRAM_CHATS");
        vars.push(("TELEGRAM_CHATS", "-1001,abc"));
        assert!(Config::from_lookup(env(&vars)).is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_lists() {
        let mut vars = base_env();
        vars.retain(|(k, _)| *k != "SIGNAL_CHATS");
        vars.push(("SIGNAL_CHATS", r#"["G1"]"#));
        let config = Config::from_lookup(env(&vars)).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("same length"));
    }

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("YES").unwrap());
        assert!(parse_bool(" 1 ").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[signal]
phone_number = "+15550000000"
cli_path = "/data/signal"
chats = ["G1"]

[telegram]
token = "123:abc"
chats = [-1001]

[telegram.personalized_tokens]
"uuid-alice" = "456:def"

[bridge]
id_command = false
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.signal.api_host, "127.0.0.1:8080");
        assert_eq!(config.signal.chats, vec!["G1"]);
        assert_eq!(config.telegram.chats, vec![-1001]);
        assert_eq!(config.telegram.personalized_tokens.len(), 1);
        assert!(!config.bridge.id_command);
    }

    #[test]
    fn test_load_toml_without_bridge_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[signal]
phone_number = "+1"
cli_path = "/data/signal"
chats = []

[telegram]
token = "t"
chats = []
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.bridge.id_command);
        assert_eq!(config.signal.receive_timeout_secs, 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/bridge.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
