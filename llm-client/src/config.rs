use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{LlmError, Result};
use crate::providers::ProviderKind;

/// Generation limit used when a preset doesn't set one
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preset to use when no --model flag is provided
    #[serde(default = "default_preset")]
    pub default_preset: String,

    /// Named model presets for quick access
    #[serde(default)]
    pub presets: BTreeMap<String, ModelPreset>,

    /// Provider-specific configuration
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

fn default_preset() -> String {
    "openai".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// A named model configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPreset {
    /// Provider identifier (openai, huggingface)
    pub provider: String,

    /// Model name for the provider. Required by huggingface; openai falls
    /// back to its default completion model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Token budget per request, used both for packing and as the backend's
    /// generation limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom base URL (for API providers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, defaulting when it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home =
            std::env::var("HOME").map_err(|_| LlmError::ConfigError("HOME not set".into()))?;
        Ok(PathBuf::from(home).join(".config/tabllm/llm.toml"))
    }

    /// Get a preset by name
    pub fn get_preset(&self, name: &str) -> Result<&ModelPreset> {
        self.presets
            .get(name)
            .ok_or_else(|| LlmError::InvalidPreset(name.to_string()))
    }

    /// Get a preset by name, or the default preset when no name is given
    pub fn resolve_preset(&self, name: Option<&str>) -> Result<&ModelPreset> {
        self.get_preset(name.unwrap_or(&self.default_preset))
    }

    /// Get provider config by provider name
    ///
    /// Any spelling that parses as a provider (`OpenAI`, `hf`) finds the
    /// `[providers.<canonical name>]` table.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        match provider.parse::<ProviderKind>() {
            Ok(kind) => self.providers.get(&kind.to_string()),
            Err(_) => self.providers.get(provider),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut presets = BTreeMap::new();

        presets.insert(
            "openai".to_string(),
            ModelPreset {
                provider: "openai".to_string(),
                model: None,
                max_tokens: DEFAULT_MAX_TOKENS,
            },
        );

        Self {
            default_preset: default_preset(),
            presets,
            providers: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_preset, "openai");

        let preset = config.get_preset("openai").unwrap();
        assert_eq!(preset.provider, "openai");
        assert_eq!(preset.model, None);
        assert_eq!(preset.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_resolve_preset_falls_back_to_default() {
        let config = Config::default();
        let preset = config.resolve_preset(None).unwrap();
        assert_eq!(preset.provider, "openai");
        assert!(matches!(
            config.resolve_preset(Some("missing")),
            Err(LlmError::InvalidPreset(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_provider_config_lookup_uses_canonical_name() {
        let mut config = Config::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key: Some("sk".to_string()),
                base_url: None,
            },
        );

        for spelling in ["openai", "OpenAI", "OPENAI"] {
            let found = config.get_provider_config(spelling);
            assert_eq!(found.and_then(|c| c.api_key.as_deref()), Some("sk"), "{spelling}");
        }
        assert!(config.get_provider_config("hf").is_none());
    }

    #[test]
    fn test_invalid_preset() {
        let config = Config::default();
        let result = config.get_preset("nonexistent");
        assert!(matches!(result, Err(LlmError::InvalidPreset(name)) if name == "nonexistent"));
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path().unwrap();
        assert!(path.ends_with(".config/tabllm/llm.toml"));
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
default_preset = "mathstral"

[presets.mathstral]
provider = "huggingface"
model = "mistralai/Mathstral-7B-v0.1"
max_tokens = 200

[presets.davinci]
provider = "openai"

[providers.openai]
api_key = "sk-test"
base_url = "http://localhost:8080/v1"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_preset, "mathstral");

        let hf = config.get_preset("mathstral").unwrap();
        assert_eq!(hf.model.as_deref(), Some("mistralai/Mathstral-7B-v0.1"));
        assert_eq!(hf.max_tokens, 200);

        // Omitted fields fall back to defaults
        let davinci = config.get_preset("davinci").unwrap();
        assert_eq!(davinci.model, None);
        assert_eq!(davinci.max_tokens, DEFAULT_MAX_TOKENS);

        let openai = config.get_provider_config("openai").unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));
        assert!(config.get_provider_config("huggingface").is_none());
    }

    #[test]
    fn test_load_missing_file_uses_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.default_preset, "openai");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/llm.toml");

        let mut config = Config::default();
        config.presets.insert(
            "local".to_string(),
            ModelPreset {
                provider: "huggingface".to_string(),
                model: Some("gpt2".to_string()),
                max_tokens: 64,
            },
        );
        config.default_preset = "local".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_preset, "local");
        assert_eq!(loaded.get_preset("local").unwrap(), config.get_preset("local").unwrap());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("llm.toml");
        std::fs::write(&path, "presets = 3").unwrap();

        assert!(matches!(Config::load_from(&path), Err(LlmError::TomlParse(_))));
    }
}
