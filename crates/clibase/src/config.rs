use crate::logging::LoggingConfig;
use crate::runner::EXIT_INTERRUPTED;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_FILE_ENV: &str = "CLIBASE_CONFIG_FILE";

/// Prefix of environment overrides, nested with `__`.
pub const ENV_PREFIX: &str = "CLIBASE_";

/// Settings shared by programs built on this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    /// Exit status after Ctrl-C; 130 mimics a shell
    pub interrupt_exit_code: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            interrupt_exit_code: EXIT_INTERRUPTED,
        }
    }
}

/// Service for configuration management
#[derive(Debug, Clone)]
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Config file from `$CLIBASE_CONFIG_FILE`, else `<config dir>/clibase/config.toml`
    pub fn from_env() -> Self {
        let config_path = std::env::var_os(CONFIG_FILE_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("clibase")
                    .join("config.toml")
            });
        Self::new(config_path)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Load configuration from file, with env var overrides (CLIBASE_ prefix, __ separator)
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: AppConfig = figment.extract().with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(&self.config_path, content).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, Style};
    use figment::Jail;

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|jail| {
            let service = ConfigService::new(jail.directory().join("missing.toml"));
            assert!(!service.exists());

            let config = service.load().unwrap();
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.logging.level, LogLevel::Info);
            assert_eq!(config.interrupt_exit_code, 2);
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                interrupt_exit_code = 130

                [logging]
                level = "warning"
                format = "{levelname}: {message}"
                style = "{"
                "#,
            )?;
            let service = ConfigService::new(jail.directory().join("config.toml"));

            let config = service.load().unwrap();
            assert_eq!(config.interrupt_exit_code, 130);
            assert_eq!(config.logging.level, LogLevel::Warning);
            assert_eq!(config.logging.style, Style::Brace);
            assert_eq!(config.logging.datefmt, crate::logging::DEFAULT_DATEFMT);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[logging]\nlevel = \"warning\"\n")?;
            jail.set_env("CLIBASE_LOGGING__LEVEL", "debug");
            jail.set_env("CLIBASE_INTERRUPT_EXIT_CODE", "130");
            let service = ConfigService::new(jail.directory().join("config.toml"));

            let config = service.load().unwrap();
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.interrupt_exit_code, 130);
            Ok(())
        });
    }

    #[test]
    fn invalid_value_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("CLIBASE_LOGGING__LEVEL", "loud");
            let service = ConfigService::new(jail.directory().join("config.toml"));

            let err = service.load().unwrap_err();
            assert!(err.to_string().contains("Failed to load configuration"));
            Ok(())
        });
    }

    #[test]
    fn save_then_load() {
        Jail::expect_with(|jail| {
            let service = ConfigService::new(jail.directory().join("nested/dir/config.toml"));
            let mut config = AppConfig::default();
            config.logging.level = LogLevel::Error;
            config.logging.directives = Some("hyper=warn".to_string());

            service.save(&config).unwrap();
            assert!(service.exists());
            assert_eq!(service.load().unwrap(), config);
            Ok(())
        });
    }

    #[test]
    fn from_env_reads_config_file_variable() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("custom.toml");
            jail.set_env(CONFIG_FILE_ENV, path.display());

            let service = ConfigService::from_env();
            assert_eq!(service.path(), path.as_path());
            Ok(())
        });
    }
}
