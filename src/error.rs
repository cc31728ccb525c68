use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка протокола композитора: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Не установлено ни одного обработчика оболочки, продолжение невозможно")]
    NoHandlers,

    #[error("Обработчик оболочки '{0}' уже зарегистрирован")]
    DuplicateHandler(String),

    #[error("Неверные метаданные оболочки: {0}")]
    InvalidMetadata(String),

    #[error("Дисплей композитора недоступен: {0}")]
    DisplayUnavailable(String),

    #[error("Композитор не объявил обязательный глобальный объект '{0}'")]
    MissingGlobal(String),

    #[error("Соединение с композитором закрыто")]
    Disconnected,

    #[error("Таймаут: {0}")]
    Timeout(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl ShellError {
    pub fn display_unavailable<T>(msg: impl Into<String>) -> Result<T> {
        Err(ShellError::DisplayUnavailable(msg.into()))
    }

    /// Состояния, после которых оболочка не может стартовать
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::NoHandlers
                | ShellError::DisplayUnavailable(_)
                | ShellError::MissingGlobal(_)
                | ShellError::Disconnected
                | ShellError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! shell_error {
    (invalid_metadata, $($arg:tt)*) => {
        $crate::error::ShellError::InvalidMetadata(format!($($arg)*))
    };
    (display_unavailable, $($arg:tt)*) => {
        $crate::error::ShellError::DisplayUnavailable(format!($($arg)*))
    };
    (missing_global, $($arg:tt)*) => {
        $crate::error::ShellError::MissingGlobal(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::ShellError::ServiceUnavailable(format!($($arg)*))
    };
    (timeout, $($arg:tt)*) => {
        $crate::error::ShellError::Timeout(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::ShellError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ShellError::NoHandlers.is_fatal());
        assert!(shell_error!(missing_global, "{}", "shell").is_fatal());
        assert!(!ShellError::DuplicateHandler("desktop".into()).is_fatal());
        assert!(!shell_error!(invalid_metadata, "пустое имя").is_fatal());
    }
}
