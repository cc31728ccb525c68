use crate::error::{Result, ShellError};
use std::path::PathBuf;
use tracing::{debug, info};

/// Переменная окружения с явным путём к сокету оболочки
pub const SOCKET_ENV: &str = "TIDE_COMPOSITOR_SOCKET";
const SOCKET_SUFFIX: &str = "-shell";

pub struct SocketFinder;

impl SocketFinder {
    /// Найти сокет композитора
    pub fn find_compositor_socket(socket: &str) -> Result<PathBuf> {
        let path = if socket != "auto" {
            info!("Используется указанный сокет: {:?}", socket);
            PathBuf::from(socket)
        } else {
            Self::resolve_auto(|key| std::env::var(key).ok())?
        };

        if path.exists() {
            Ok(path)
        } else {
            ShellError::display_unavailable(format!("Сокет композитора не найден: {:?}", path))
        }
    }

    /// Порядок поиска:
    /// 1. $TIDE_COMPOSITOR_SOCKET
    /// 2. $XDG_RUNTIME_DIR/$WAYLAND_DISPLAY-shell (по умолчанию wayland-0)
    pub fn resolve_auto<F>(env: F) -> Result<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = env(SOCKET_ENV).filter(|p| !p.is_empty()) {
            debug!("Сокет взят из {}", SOCKET_ENV);
            return Ok(PathBuf::from(path));
        }

        let runtime_dir = env("XDG_RUNTIME_DIR").filter(|p| !p.is_empty()).ok_or_else(|| {
            ShellError::DisplayUnavailable(
                "XDG_RUNTIME_DIR не задан, сессия композитора не найдена".to_string(),
            )
        })?;
        let display = env("WAYLAND_DISPLAY")
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "wayland-0".to_string());

        // WAYLAND_DISPLAY может быть абсолютным путём
        let display_path = PathBuf::from(&display);
        let base = if display_path.is_absolute() {
            display_path
        } else {
            PathBuf::from(runtime_dir).join(display)
        };

        let mut socket = base.into_os_string();
        socket.push(SOCKET_SUFFIX);
        Ok(PathBuf::from(socket))
    }
}
