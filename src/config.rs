use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::events::{KeyCode, Modifiers};
use crate::services::keycode_map::KeycodeMap;

/// Количество рабочих столов, если конфигурация не задаёт своё
pub const DEFAULT_WORKSPACES: u32 = 4;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub compositor: CompositorConfig,
    pub shells: ShellsConfig,
    pub startup: StartupConfig,
    pub bindings: Vec<KeyMapping>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompositorConfig {
    /// Путь к сокету композитора или "auto"
    pub socket: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShellsConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartupConfig {
    pub initial_workspaces: u32,
    /// Без значения ожидание глобальных объектов не ограничено
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_timeout_ms: Option<u64>,
    /// Без значения ожидание готовности UI не ограничено
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyMapping {
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "full".to_string(),
                filter: "tideshell=info".to_string(),
            },
            compositor: CompositorConfig {
                socket: "auto".to_string(),
            },
            shells: ShellsConfig {
                directory: PathBuf::from("/usr/share/tideshell/shells"),
            },
            startup: StartupConfig {
                initial_workspaces: DEFAULT_WORKSPACES,
                bind_timeout_ms: None,
                settle_timeout_ms: None,
            },
            bindings: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        // Отсутствующий файл не ошибка: работают значения по умолчанию
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("TIDESHELL_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "full" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.compositor.socket.is_empty() {
            anyhow::bail!("compositor.socket не может быть пустым (используйте \"auto\")");
        }

        if self.startup.bind_timeout_ms == Some(0) || self.startup.settle_timeout_ms == Some(0) {
            anyhow::bail!("Таймауты запуска должны быть больше 0 или не заданы");
        }

        for (i, mapping) in self.bindings.iter().enumerate() {
            if mapping.key.is_empty() {
                anyhow::bail!("Пустая клавиша в привязке #{}", i + 1);
            }

            if KeycodeMap::get_key_code(&mapping.key).is_none() {
                anyhow::bail!("Неизвестная клавиша '{}' в привязке #{}", mapping.key, i + 1);
            }

            for modifier in &mapping.modifiers {
                match modifier.as_str() {
                    "ctrl" | "alt" | "shift" | "super" => {}
                    _ => anyhow::bail!("Неверный модификатор '{}' в привязке #{}", modifier, i + 1),
                }
            }
        }

        Ok(())
    }

    /// Привязки клавиш в виде (код, модификаторы), уже разрешённые по именам
    pub fn key_bindings(&self) -> Vec<(KeyCode, Modifiers)> {
        self.bindings
            .iter()
            .filter_map(|mapping| {
                KeycodeMap::get_key_code(&mapping.key)
                    .map(|code| (KeyCode(code), Modifiers::from_vec(&mapping.modifiers)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.startup.initial_workspaces, DEFAULT_WORKSPACES);
        assert!(config.startup.bind_timeout_ms.is_none());
    }

    #[test]
    fn test_invalid_binding_rejected() {
        let mut config = Config::default();
        config.bindings = vec![KeyMapping {
            key: "d".to_string(),
            modifiers: vec!["hyper".to_string()],
        }];
        assert!(config.validate().is_err());

        config.bindings[0].modifiers = vec!["super".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_bindings_resolved() {
        let mut config = Config::default();
        config.bindings = vec![KeyMapping {
            key: "d".to_string(),
            modifiers: vec!["super".to_string(), "shift".to_string()],
        }];

        let bindings = config.key_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].0, KeyCode(32));
        assert!(bindings[0].1.super_key && bindings[0].1.shift);
    }

    #[test]
    fn test_load_from_file_merges_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[startup]\ninitial_workspaces = 2\n\n[[bindings]]\nkey = \"l\"\nmodifiers = [\"super\"]"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.startup.initial_workspaces, 2);
        assert_eq!(config.compositor.socket, "auto");
        assert_eq!(config.bindings.len(), 1);
    }
}
