//! Configuration file management for fitplan.
//!
//! Provides a TOML-based config file at `~/.config/fitplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fitplan_core::orchestrator::PlanGenerator;
use fitplan_core::provider::{self, GeminiProvider, OpenAiProvider, PlanProvider, ProviderRegistry};
use fitplan_core::webhook::WebhookVerifier;
use fitplan_db::config::DbConfig;

/// Provider used when neither env nor file names one.
pub const DEFAULT_PROVIDER: &str = OpenAiProvider::NAME;

/// Provider name that disables AI generation entirely.
pub const NO_PROVIDER: &str = "none";

pub const DATABASE_URL_ENV: &str = "FITPLAN_DATABASE_URL";
pub const AI_PROVIDER_ENV: &str = "FITPLAN_AI_PROVIDER";
pub const WEBHOOK_SECRET_ENV: &str = "CLERK_WEBHOOK_SECRET";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub webhook: WebhookSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiSection {
    /// `openai`, `gemini`, or `none`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Key for `provider`. The provider's own env var takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WebhookSection {
    /// `whsec_`-prefixed signing secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the fitplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/fitplan` or `~/.config/fitplan`,
/// never the platform-specific `dirs::config_dir()`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("fitplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fitplan")
}

/// Return the path to the fitplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold API keys and the webhook secret.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(non_blank)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct FitplanConfig {
    pub db_config: DbConfig,
    /// Lowercased provider name; [`NO_PROVIDER`] disables AI generation.
    pub ai_provider: String,
    /// The `[ai]` section as read from the file.
    file_ai: AiSection,
    pub webhook_secret: Option<String>,
}

impl FitplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `FITPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - AI provider: `FITPLAN_AI_PROVIDER` > `ai.provider` > `openai`
    /// - Webhook secret: `CLERK_WEBHOOK_SECRET` > `webhook.secret` > unset
    ///
    /// API keys are resolved per provider when the generator is built.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = env_var(DATABASE_URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let file_ai = file_config
            .as_ref()
            .map(|cfg| cfg.ai.clone())
            .unwrap_or_default();

        let ai_provider = env_var(AI_PROVIDER_ENV)
            .or_else(|| file_ai.provider.clone().and_then(non_blank))
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_owned())
            .to_ascii_lowercase();

        let webhook_secret = env_var(WEBHOOK_SECRET_ENV).or_else(|| {
            file_config
                .as_ref()
                .and_then(|cfg| cfg.webhook.secret.clone())
                .and_then(non_blank)
        });

        Ok(Self {
            db_config,
            ai_provider,
            file_ai,
            webhook_secret,
        })
    }

    /// The file's `api_key`, if the file's provider is `name`.
    fn file_key_for(&self, name: &str) -> Option<String> {
        let file_provider = self.file_ai.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);
        if !file_provider.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        self.file_ai.api_key.clone().and_then(non_blank)
    }

    /// Register every provider that has a key available.
    pub fn build_registry(&self, client: reqwest::Client) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();

        let openai = OpenAiProvider::from_env(client.clone()).ok().or_else(|| {
            self.file_key_for(OpenAiProvider::NAME)
                .map(|key| OpenAiProvider::new(client.clone(), key))
        });
        if let Some(openai) = openai {
            registry.register(openai);
        }

        let gemini = GeminiProvider::from_env(client.clone()).ok().or_else(|| {
            self.file_key_for(GeminiProvider::NAME)
                .map(|key| GeminiProvider::new(client.clone(), key))
        });
        if let Some(gemini) = gemini {
            registry.register(gemini);
        }

        debug!(registry = ?registry, "built provider registry");
        registry
    }

    /// The configured provider, or `None` when AI generation is disabled or
    /// its key is missing. An unknown provider name is an error.
    pub fn provider(&self, client: reqwest::Client) -> Result<Option<Arc<dyn PlanProvider>>> {
        let name = self.ai_provider.as_str();
        if name == NO_PROVIDER {
            return Ok(None);
        }
        if name != OpenAiProvider::NAME && name != GeminiProvider::NAME {
            bail!(
                "unknown AI provider {name:?}; expected {:?}, {:?} or {NO_PROVIDER:?}",
                OpenAiProvider::NAME,
                GeminiProvider::NAME,
            );
        }

        let provider = self.build_registry(client).get(name);
        if provider.is_none() {
            warn!(provider = name, "no API key configured, plans will use the fallback generator");
        }
        Ok(provider)
    }

    /// Build the plan generator for this configuration.
    pub fn build_generator(&self) -> Result<PlanGenerator> {
        let client = provider::http_client().context("failed to build HTTP client")?;
        Ok(PlanGenerator::new(self.provider(client)?))
    }

    /// Parse the webhook secret, if one is configured.
    pub fn webhook_verifier(&self) -> Result<Option<WebhookVerifier>> {
        self.webhook_secret
            .as_deref()
            .map(WebhookVerifier::new)
            .transpose()
            .context("invalid webhook secret")
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MANAGED_VARS: [&str; 6] = [
        "XDG_CONFIG_HOME",
        DATABASE_URL_ENV,
        AI_PROVIDER_ENV,
        WEBHOOK_SECRET_ENV,
        OpenAiProvider::API_KEY_ENV,
        GeminiProvider::API_KEY_ENV,
    ];

    /// Points `XDG_CONFIG_HOME` at a temp dir and clears the fitplan env
    /// vars; restores everything on drop.
    struct IsolatedEnv {
        saved: Vec<(&'static str, Option<String>)>,
        _tmp: tempfile::TempDir,
        _lock: std::sync::MutexGuard<'static, ()>,
    }

    impl IsolatedEnv {
        fn new() -> Self {
            let lock = crate::test_util::lock_env();
            let tmp = tempfile::TempDir::new().unwrap();
            let saved = MANAGED_VARS
                .iter()
                .map(|&name| (name, std::env::var(name).ok()))
                .collect();
            for name in MANAGED_VARS {
                unsafe { std::env::remove_var(name) };
            }
            unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
            Self {
                saved,
                _tmp: tmp,
                _lock: lock,
            }
        }

        fn set(&self, name: &str, value: &str) {
            unsafe { std::env::set_var(name, value) };
        }
    }

    impl Drop for IsolatedEnv {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => unsafe { std::env::set_var(name, v) },
                    None => unsafe { std::env::remove_var(name) },
                }
            }
        }
    }

    fn write_config(ai: AiSection, secret: Option<&str>) {
        save_config(&ConfigFile {
            database: DatabaseSection {
                url: "postgresql://filehost:5432/filedb".to_string(),
            },
            ai,
            webhook: WebhookSection {
                secret: secret.map(str::to_owned),
            },
        })
        .unwrap();
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _env = IsolatedEnv::new();
        write_config(
            AiSection {
                provider: Some("gemini".to_string()),
                api_key: Some("g-key".to_string()),
            },
            Some("whsec_abc"),
        );

        let loaded = load_config().unwrap();
        assert_eq!(loaded.database.url, "postgresql://filehost:5432/filedb");
        assert_eq!(loaded.ai.provider.as_deref(), Some("gemini"));
        assert_eq!(loaded.ai.api_key.as_deref(), Some("g-key"));
        assert_eq!(loaded.webhook.secret.as_deref(), Some("whsec_abc"));
    }

    #[test]
    fn config_without_optional_sections_parses() {
        let cfg: ConfigFile = toml::from_str("[database]\nurl = \"postgresql://x/y\"\n").unwrap();
        assert!(cfg.ai.provider.is_none());
        assert!(cfg.webhook.secret.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _env = IsolatedEnv::new();
        write_config(AiSection::default(), None);

        let meta = std::fs::metadata(config_path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let env = IsolatedEnv::new();
        env.set(DATABASE_URL_ENV, "postgresql://env:5432/envdb");
        write_config(AiSection::default(), None);

        let config = FitplanConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let env = IsolatedEnv::new();
        write_config(
            AiSection {
                provider: Some("gemini".to_string()),
                api_key: None,
            },
            Some("whsec_file"),
        );
        env.set(DATABASE_URL_ENV, "postgresql://env:5432/envdb");
        env.set(AI_PROVIDER_ENV, "OpenAI");
        env.set(WEBHOOK_SECRET_ENV, "whsec_env");

        let config = FitplanConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.ai_provider, "openai");
        assert_eq!(config.webhook_secret.as_deref(), Some("whsec_env"));
    }

    #[test]
    fn resolve_reads_config_file() {
        let _env = IsolatedEnv::new();
        write_config(
            AiSection {
                provider: Some("gemini".to_string()),
                api_key: None,
            },
            Some("whsec_file"),
        );

        let config = FitplanConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://filehost:5432/filedb");
        assert_eq!(config.ai_provider, "gemini");
        assert_eq!(config.webhook_secret.as_deref(), Some("whsec_file"));
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _env = IsolatedEnv::new();

        let config = FitplanConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.ai_provider, DEFAULT_PROVIDER);
        assert!(config.webhook_secret.is_none());
        assert!(config.webhook_verifier().unwrap().is_none());
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let env = IsolatedEnv::new();
        env.set(AI_PROVIDER_ENV, "  ");
        env.set(WEBHOOK_SECRET_ENV, "");

        let config = FitplanConfig::resolve(None).unwrap();
        assert_eq!(config.ai_provider, DEFAULT_PROVIDER);
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn registry_uses_env_keys_and_matching_file_key() {
        let env = IsolatedEnv::new();
        write_config(
            AiSection {
                provider: Some("gemini".to_string()),
                api_key: Some("g-key".to_string()),
            },
            None,
        );
        env.set(OpenAiProvider::API_KEY_ENV, "sk-env");

        let config = FitplanConfig::resolve(None).unwrap();
        let registry = config.build_registry(reqwest::Client::new());
        assert_eq!(registry.list(), vec!["gemini", "openai"]);
    }

    #[test]
    fn file_key_only_applies_to_file_provider() {
        let _env = IsolatedEnv::new();
        write_config(
            AiSection {
                provider: Some("gemini".to_string()),
                api_key: Some("g-key".to_string()),
            },
            None,
        );

        let config = FitplanConfig::resolve(None).unwrap();
        let registry = config.build_registry(reqwest::Client::new());
        assert_eq!(registry.list(), vec!["gemini"]);
    }

    #[test]
    fn missing_key_means_no_provider() {
        let _env = IsolatedEnv::new();
        let config = FitplanConfig::resolve(None).unwrap();
        let provider = config.provider(reqwest::Client::new()).unwrap();
        assert!(provider.is_none());
    }

    #[test]
    fn provider_none_disables_ai() {
        let env = IsolatedEnv::new();
        env.set(AI_PROVIDER_ENV, "none");
        env.set(OpenAiProvider::API_KEY_ENV, "sk-env");

        let config = FitplanConfig::resolve(None).unwrap();
        assert!(config.provider(reqwest::Client::new()).unwrap().is_none());
    }

    #[test]
    fn configured_provider_is_selected() {
        let env = IsolatedEnv::new();
        env.set(AI_PROVIDER_ENV, "gemini");
        env.set(GeminiProvider::API_KEY_ENV, "g-env");

        let config = FitplanConfig::resolve(None).unwrap();
        let provider = config.provider(reqwest::Client::new()).unwrap().unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let env = IsolatedEnv::new();
        env.set(AI_PROVIDER_ENV, "claude-on-a-napkin");

        let config = FitplanConfig::resolve(None).unwrap();
        let err = config.provider(reqwest::Client::new()).err().expect("expected provider resolution to fail");
        assert!(err.to_string().contains("unknown AI provider"), "unexpected error: {err}");
    }

    #[test]
    fn invalid_webhook_secret_is_an_error() {
        let env = IsolatedEnv::new();
        env.set(WEBHOOK_SECRET_ENV, "whsec_not base64!");

        let config = FitplanConfig::resolve(None).unwrap();
        assert!(config.webhook_verifier().is_err());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("fitplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
