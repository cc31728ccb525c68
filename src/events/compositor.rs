//! Decoded primitives exchanged with the compositor.
//!
//! The transport delivers these already decoded; the session never sees bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::window::{SurfaceId, Window};

/// Локальный идентификатор объекта протокола (выделяется клиентом)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object@{}", self.0)
    }
}

/// Глобальные интерфейсы композитора, без которых оболочка не работает
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalInterface {
    Shell,
    ShellSurface,
    Notification,
}

impl GlobalInterface {
    pub const REQUIRED: [GlobalInterface; 3] = [
        GlobalInterface::Shell,
        GlobalInterface::ShellSurface,
        GlobalInterface::Notification,
    ];

    pub fn protocol_name(&self) -> &'static str {
        match self {
            GlobalInterface::Shell => "tide_desktop_shell",
            GlobalInterface::ShellSurface => "tide_shell_surface",
            GlobalInterface::Notification => "tide_notification_daemon",
        }
    }

    pub fn from_protocol_name(name: &str) -> Option<Self> {
        Self::REQUIRED.into_iter().find(|iface| iface.protocol_name() == name)
    }
}

impl fmt::Display for GlobalInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol_name())
    }
}

/// Подключённый монитор
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub id: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Событие от композитора
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CompositorEvent {
    /// Объявление глобального объекта реестром
    Global { name: u32, interface: String, version: u32 },
    GlobalRemoved { name: u32 },
    OutputAnnounced(Output),
    /// Ответ на `ShellRequest::Sync`
    Done { serial: u32 },
    WorkspaceAdded { object: u32 },
    WindowMapped(Window),
    WindowUnmapped { surface: SurfaceId },
    PrepareLockSurface,
    CursorChanged { cursor: String },
    KeyBindingTriggered { id: u32 },
}

/// Запрос к композитору
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum ShellRequest {
    GetRegistry { id: u32 },
    Bind { name: u32, interface: String, version: u32, id: u32 },
    Sync { serial: u32 },
    AddWorkspace,
    MinimizeWindows,
    RestoreWindows,
    AddKeyBinding { id: u32, key: u16, modifiers: u32 },
    DesktopReady,
    Release { id: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_lookup() {
        assert_eq!(
            GlobalInterface::from_protocol_name("tide_shell_surface"),
            Some(GlobalInterface::ShellSurface)
        );
        assert_eq!(GlobalInterface::from_protocol_name("wl_seat"), None);
    }

    #[test]
    fn test_event_wire_shape() {
        let event: CompositorEvent =
            serde_json::from_str(r#"{"event":"window_unmapped","surface":12}"#).unwrap();
        assert_eq!(event, CompositorEvent::WindowUnmapped { surface: SurfaceId(12) });

        let request = serde_json::to_string(&ShellRequest::Sync { serial: 3 }).unwrap();
        assert_eq!(request, r#"{"request":"sync","serial":3}"#);
    }
}
