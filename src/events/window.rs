use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор поверхности композитора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u32);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface@{}", self.0)
    }
}

/// Отображённое окно. Идентичность определяется поверхностью, а не заголовком.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub surface: SurfaceId,
    pub title: String,
    #[serde(default)]
    pub app_id: String,
}

impl Window {
    pub fn new(surface: SurfaceId, title: String) -> Self {
        Self {
            surface,
            title,
            app_id: String::new(),
        }
    }

    pub fn with_app_id(mut self, app_id: String) -> Self {
        self.app_id = app_id;
        self
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.app_id.is_empty() {
            write!(f, "\"{}\" [{}]", self.title, self.surface)
        } else {
            write!(f, "\"{}\" ({}) [{}]", self.title, self.app_id, self.surface)
        }
    }
}

/// Виртуальный рабочий стол. Позиция в последовательности и есть его номер,
/// `object` только связывает слот с объектом композитора.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub object: u32,
}

impl Workspace {
    pub fn new(object: u32) -> Self {
        Self { object }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_creation() {
        let window = Window::new(SurfaceId(7), "Terminal".to_string())
            .with_app_id("foot".to_string());

        assert_eq!(window.surface, SurfaceId(7));
        assert_eq!(window.app_id, "foot");
        assert_eq!(window.to_string(), "\"Terminal\" (foot) [surface@7]");
    }
}
