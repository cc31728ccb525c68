use crate::error::{Result, ShellError};
use crate::shell_error;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::{DescriptorHandler, ShellHandler, ShellManager};

/// Файл описания оболочки внутри её каталога
pub const DESCRIPTOR_FILE: &str = "shell.toml";
/// Подкаталог с ресурсами оболочки
pub const CONTENTS_DIR: &str = "contents";

#[derive(Debug, Deserialize)]
struct ShellDescriptorFile {
    shell: ShellDescriptor,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ShellDescriptor {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_willing")]
    pub willing: bool,
}

fn default_willing() -> bool {
    true
}

impl ShellDescriptor {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(shell_error!(invalid_metadata, "нет файла {:?}", path));
        }

        let file: ShellDescriptorFile = Figment::from(Toml::file(path))
            .extract()
            .map_err(|e| shell_error!(invalid_metadata, "{:?}: {}", path, e))?;

        file.shell.validate()?;
        Ok(file.shell)
    }

    fn validate(&self) -> Result<()> {
        let valid = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid {
            return Err(ShellError::InvalidMetadata(format!(
                "недопустимое внутреннее имя '{}'",
                self.name
            )));
        }
        Ok(())
    }
}

pub struct HandlerDiscovery;

impl HandlerDiscovery {
    /// Сканирует каталог оболочек и регистрирует найденные обработчики.
    ///
    /// Возвращает созданные обработчики: реестр хранит только слабые ссылки,
    /// владеет ими вызывающий. Ошибка в одном каталоге не прерывает поиск.
    pub fn load_handlers(
        shells_dir: &Path,
        manager: &mut ShellManager,
    ) -> Vec<Arc<DescriptorHandler>> {
        info!("Поиск обработчиков оболочки в {:?}", shells_dir);

        let mut handlers = Vec::new();
        for dir in Self::shell_directories(shells_dir) {
            let descriptor = match ShellDescriptor::read(&dir.join(DESCRIPTOR_FILE)) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!("Каталог {:?} пропущен: {}", dir, e);
                    continue;
                }
            };

            if manager.contains(&descriptor.name) {
                warn!("Обработчик '{}' уже добавлен, {:?} пропущен", descriptor.name, dir);
                continue;
            }

            info!("Загрузка обработчика оболочки {}", descriptor.name);
            let handler = Arc::new(DescriptorHandler::new(
                descriptor.name.clone(),
                descriptor.priority,
                descriptor.willing,
            ));
            handler.set_path(dir.join(CONTENTS_DIR));

            let dyn_handler: Arc<dyn ShellHandler> = handler.clone();
            match manager.register(&descriptor.name, &dyn_handler) {
                Ok(()) => handlers.push(handler),
                Err(e) => warn!("Обработчик '{}' не зарегистрирован: {}", descriptor.name, e),
            }
        }

        info!("Найдено обработчиков оболочки: {}", handlers.len());
        handlers
    }

    /// Подкаталоги в алфавитном порядке, чтобы порядок регистрации не зависел от ФС
    fn shell_directories(shells_dir: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(shells_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Нет доступа к каталогу оболочек {:?}: {}", shells_dir, e);
                return Vec::new();
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();
        dirs
    }

    /// Встроенные обработчики для режима сухого запуска
    pub fn builtin_handlers(manager: &mut ShellManager) -> Vec<Arc<DescriptorHandler>> {
        let mut handlers = Vec::new();
        for (name, priority, willing) in [("desktop", 10, true), ("tablet", 1, false)] {
            let handler = Arc::new(DescriptorHandler::new(name, priority, willing));
            let dyn_handler: Arc<dyn ShellHandler> = handler.clone();
            match manager.register(name, &dyn_handler) {
                Ok(()) => handlers.push(handler),
                Err(e) => warn!("Встроенный обработчик '{}' не зарегистрирован: {}", name, e),
            }
        }
        handlers
    }
}
