pub mod compositor;
pub mod keyboard;
pub mod window;

pub use compositor::{CompositorEvent, GlobalInterface, ObjectHandle, Output, ShellRequest};
pub use keyboard::{KeyBinding, KeyCode, Modifiers};
pub use window::{SurfaceId, Window, Workspace};

/// Уведомления оболочки для подписчиков (панели, переключатель рабочих столов)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    WindowsChanged,
    WorkspaceAdded(usize),
    WorkspaceRemoved(usize),
    WorkspacesChanged,
    KeyBindingTriggered(u32),
}
