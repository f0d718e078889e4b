use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::openai::CompletionOptions;

/// Per-mode model settings from the config file. Every field is optional;
/// unset fields fall through to the built-in defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ModeConfig {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chat: ModeConfig,
    #[serde(default)]
    pub edit: ModeConfig,
    pub api_key: Option<String>,
}

/// Explicit per-call overrides (CLI flags). Highest precedence.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::file(&config_path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!("invalid config at {}: {e}", config_path.display()))
        })
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Configuration("could not determine config directory".into()))?;
        Ok(config_dir.join("koai").join("config.json"))
    }

    /// Resolve the completion credential: environment first, config file
    /// second. Absence is a configuration error raised before any network
    /// call is attempted.
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
            .ok_or_else(|| {
                Error::Configuration(
                    "OPENAI_API_KEY is not set and no api_key is configured".into(),
                )
            })
    }

    /// Effective chat options: CLI flags > config file > built-in defaults.
    pub fn chat_options(&self, overrides: &Overrides) -> Result<CompletionOptions> {
        merge_options(
            overrides,
            &self.chat,
            CompletionOptions {
                model: "gpt-3.5-turbo".into(),
                max_tokens: 1000,
                temperature: 0.7,
                system_message: Some("You are a helpful AI assistant".into()),
            },
        )
    }

    /// Effective edit options, same precedence as chat.
    pub fn edit_options(&self, overrides: &Overrides) -> Result<CompletionOptions> {
        merge_options(
            overrides,
            &self.edit,
            CompletionOptions {
                model: "gpt-4".into(),
                max_tokens: 2000,
                temperature: 0.3,
                system_message: Some("You are a helpful AI coding assistant".into()),
            },
        )
    }
}

fn merge_options(
    overrides: &Overrides,
    mode: &ModeConfig,
    defaults: CompletionOptions,
) -> Result<CompletionOptions> {
    let options = CompletionOptions {
        model: overrides
            .model
            .clone()
            .or_else(|| mode.model.clone())
            .unwrap_or(defaults.model),
        max_tokens: overrides
            .max_tokens
            .or(mode.max_tokens)
            .unwrap_or(defaults.max_tokens),
        temperature: overrides
            .temperature
            .or(mode.temperature)
            .unwrap_or(defaults.temperature),
        system_message: mode
            .system_message
            .clone()
            .or(defaults.system_message),
    };

    if options.max_tokens == 0 {
        return Err(Error::Configuration("max_tokens must be positive".into()));
    }
    if !(0.0..=2.0).contains(&options.temperature) {
        return Err(Error::Configuration(format!(
            "temperature {} is outside [0, 2]",
            options.temperature
        )));
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_defaults_apply_when_nothing_is_configured() {
        let config = Config::default();
        let options = config.chat_options(&Overrides::default()).unwrap();
        assert_eq!(options.model, "gpt-3.5-turbo");
        assert_eq!(options.max_tokens, 1000);
        assert_eq!(options.temperature, 0.7);
        assert_eq!(
            options.system_message.as_deref(),
            Some("You are a helpful AI assistant")
        );
    }

    #[test]
    fn config_file_values_override_defaults() {
        let config = Config {
            chat: ModeConfig {
                model: Some("gpt-4o".into()),
                max_tokens: Some(500),
                ..Default::default()
            },
            ..Default::default()
        };
        let options = config.chat_options(&Overrides::default()).unwrap();
        assert_eq!(options.model, "gpt-4o");
        assert_eq!(options.max_tokens, 500);
        // Unset fields still come from the defaults.
        assert_eq!(options.temperature, 0.7);
    }

    #[test]
    fn cli_overrides_win_over_config_values() {
        let config = Config {
            edit: ModeConfig {
                model: Some("gpt-4-turbo".into()),
                temperature: Some(0.9),
                ..Default::default()
            },
            ..Default::default()
        };
        let overrides = Overrides {
            model: Some("gpt-4o-mini".into()),
            temperature: Some(0.1),
            max_tokens: None,
        };
        let options = config.edit_options(&overrides).unwrap();
        assert_eq!(options.model, "gpt-4o-mini");
        assert_eq!(options.temperature, 0.1);
        assert_eq!(options.max_tokens, 2000);
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let overrides = Overrides {
            temperature: Some(2.5),
            ..Default::default()
        };
        let err = Config::default().chat_options(&overrides).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        // Credential injection happens from an explicit config value, so the
        // error path is testable without touching the process environment.
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let err = Config::default().resolve_api_key().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let config = Config {
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), "sk-test");
    }
}
