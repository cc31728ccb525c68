use crate::debug_if_enabled;
use crate::events::{ShellEvent, SurfaceId, Window, Workspace};
use tokio::sync::broadcast;
use tracing::info;

/// Упорядоченные списки окон и рабочих столов оболочки.
///
/// Responsibilities (strict):
/// - Keep windows in map order and workspaces in index order.
/// - Publish a change notification for every mutation.
/// - Do NOT talk to the compositor; the session routes events here.
pub struct ShellSurfaceTracker {
    windows: Vec<Window>,
    workspaces: Vec<Workspace>,
    events: broadcast::Sender<ShellEvent>,
}

impl ShellSurfaceTracker {
    pub fn new(events: broadcast::Sender<ShellEvent>) -> Self {
        Self {
            windows: Vec::new(),
            workspaces: Vec::new(),
            events,
        }
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn window_mapped(&mut self, window: Window) {
        // Одна поверхность не может быть отображена дважды
        if self.windows.iter().any(|w| w.surface == window.surface) {
            debug_if_enabled!("Окно {} уже отслеживается, повторное отображение пропущено", window);
            return;
        }

        info!("Окно отображено: {}", window);
        self.windows.push(window);
        self.emit(ShellEvent::WindowsChanged);
    }

    pub fn window_unmapped(&mut self, surface: SurfaceId) {
        match self.windows.iter().position(|w| w.surface == surface) {
            Some(index) => {
                let window = self.windows.remove(index);
                info!("Окно скрыто: {}", window);
                self.emit(ShellEvent::WindowsChanged);
            }
            None => {
                debug_if_enabled!("Скрытие неизвестной поверхности {} проигнорировано", surface);
            }
        }
    }

    pub fn workspace_added(&mut self, workspace: Workspace) -> usize {
        self.workspaces.push(workspace);
        let index = self.workspaces.len() - 1;
        info!("Добавлен рабочий стол #{}", index);
        self.emit(ShellEvent::WorkspaceAdded(index));
        self.emit(ShellEvent::WorkspacesChanged);
        index
    }

    /// Удаляет рабочий стол; все следующие за ним сдвигаются на один номер
    pub fn workspace_removed(&mut self, index: usize) -> Option<Workspace> {
        if index >= self.workspaces.len() {
            debug_if_enabled!(
                "Удаление рабочего стола #{} проигнорировано: всего {}",
                index,
                self.workspaces.len()
            );
            return None;
        }

        let workspace = self.workspaces.remove(index);
        info!("Удалён рабочий стол #{}", index);
        self.emit(ShellEvent::WorkspaceRemoved(index));
        self.emit(ShellEvent::WorkspacesChanged);
        Some(workspace)
    }

    /// Сброс при завершении сессии, без уведомлений
    pub fn clear(&mut self) {
        self.workspaces.clear();
        self.windows.clear();
    }

    fn emit(&self, event: ShellEvent) {
        // Ошибка означает лишь отсутствие подписчиков
        let _ = self.events.send(event);
    }
}
