//! Channel towards the UI collaborator.
//!
//! The core never calls the UI synchronously: every request is a
//! `UiNotification` sent over an unbounded channel, and surface readiness
//! comes back through a oneshot carried inside the notification.

use crate::error::Result;
use crate::events::Output;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum UiNotification {
    /// Сменилась активная оболочка
    SetShell(String),
    /// Построить поверхность оболочки на мониторе и сообщить о готовности
    BuildSurface {
        output: Output,
        ready: oneshot::Sender<()>,
    },
    CreateLockSurface,
    SetGrabCursor(String),
}

pub type UiSender = mpsc::UnboundedSender<UiNotification>;
pub type UiReceiver = mpsc::UnboundedReceiver<UiNotification>;

pub fn ui_channel() -> (UiSender, UiReceiver) {
    mpsc::unbounded_channel()
}

/// Trait for UI front-ends that consume shell notifications
#[async_trait::async_trait]
pub trait ShellUiTrait {
    /// Run the UI until the notification channel closes
    async fn run(self: Box<Self>) -> Result<()>;
}

/// UI без отрисовки: пишет уведомления в лог и сразу подтверждает готовность.
/// Используется в режиме сухого запуска и там, где UI процесс отдельный.
pub struct HeadlessUi {
    notifications: UiReceiver,
    shell: Option<String>,
    surfaces: Vec<Output>,
}

impl HeadlessUi {
    pub fn new(notifications: UiReceiver) -> Self {
        info!("Инициализация HeadlessUi");
        Self {
            notifications,
            shell: None,
            surfaces: Vec::new(),
        }
    }

    fn handle(&mut self, notification: UiNotification) {
        match notification {
            UiNotification::SetShell(shell) => {
                info!("UI: загружаем оболочку '{}'", shell);
                self.shell = Some(shell);
            }
            UiNotification::BuildSurface { output, ready } => {
                info!(
                    "UI: поверхность на мониторе {} ({}x{})",
                    output.name, output.width, output.height
                );
                self.surfaces.push(output);
                if ready.send(()).is_err() {
                    warn!("UI: сессия перестала ждать готовности поверхности");
                }
            }
            UiNotification::CreateLockSurface => {
                info!("UI: создаём экран блокировки для оболочки {:?}", self.shell);
            }
            UiNotification::SetGrabCursor(cursor) => {
                debug!("UI: курсор захвата '{}'", cursor);
            }
        }
    }

    async fn run_impl(mut self) -> Result<()> {
        while let Some(notification) = self.notifications.recv().await {
            self.handle(notification);
        }
        info!("UI: канал уведомлений закрыт, поверхностей было {}", self.surfaces.len());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ShellUiTrait for HeadlessUi {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
