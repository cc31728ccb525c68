use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Уведомления обработчика, на которые подписывается реестр
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerEvent {
    WillingChanged(HandlerId),
    PriorityChanged(HandlerId),
    Destroyed(HandlerId),
}

pub type HandlerEventSender = mpsc::UnboundedSender<HandlerEvent>;

/// Capability every shell handler exposes to the arbitrator
pub trait ShellHandler: Send + Sync {
    fn id(&self) -> HandlerId;
    /// Имя оболочки, которое получает UI
    fn shell(&self) -> String;
    fn path(&self) -> PathBuf;
    fn set_path(&self, path: PathBuf);
    fn is_willing(&self) -> bool;
    fn priority(&self) -> i32;
    fn is_loaded(&self) -> bool;
    fn set_loaded(&self, loaded: bool);
    /// Подписка на изменения willing/priority и на уничтожение
    fn subscribe(&self, events: HandlerEventSender);
    fn unsubscribe_all(&self);
}

#[derive(Debug)]
struct HandlerState {
    path: PathBuf,
    willing: bool,
    priority: i32,
    loaded: bool,
}

/// Обработчик, построенный по описанию из каталога оболочек
pub struct DescriptorHandler {
    id: HandlerId,
    shell: String,
    state: RwLock<HandlerState>,
    subscribers: RwLock<Vec<HandlerEventSender>>,
}

impl DescriptorHandler {
    pub fn new(shell: impl Into<String>, priority: i32, willing: bool) -> Self {
        Self {
            id: NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed),
            shell: shell.into(),
            state: RwLock::new(HandlerState {
                path: PathBuf::new(),
                willing,
                priority,
                loaded: false,
            }),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn set_willing(&self, willing: bool) {
        let changed = {
            let mut state = self.state.write();
            std::mem::replace(&mut state.willing, willing) != willing
        };
        if changed {
            self.notify(HandlerEvent::WillingChanged(self.id));
        }
    }

    pub fn set_priority(&self, priority: i32) {
        let changed = {
            let mut state = self.state.write();
            std::mem::replace(&mut state.priority, priority) != priority
        };
        if changed {
            self.notify(HandlerEvent::PriorityChanged(self.id));
        }
    }

    fn notify(&self, event: HandlerEvent) {
        // Закрытые каналы выбрасываем при следующей рассылке
        self.subscribers.write().retain(|tx| tx.send(event).is_ok());
    }
}

impl ShellHandler for DescriptorHandler {
    fn id(&self) -> HandlerId {
        self.id
    }

    fn shell(&self) -> String {
        self.shell.clone()
    }

    fn path(&self) -> PathBuf {
        self.state.read().path.clone()
    }

    fn set_path(&self, path: PathBuf) {
        self.state.write().path = path;
    }

    fn is_willing(&self) -> bool {
        self.state.read().willing
    }

    fn priority(&self) -> i32 {
        self.state.read().priority
    }

    fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    fn set_loaded(&self, loaded: bool) {
        self.state.write().loaded = loaded;
    }

    fn subscribe(&self, events: HandlerEventSender) {
        self.subscribers.write().push(events);
    }

    fn unsubscribe_all(&self) {
        self.subscribers.write().clear();
    }
}

impl Drop for DescriptorHandler {
    fn drop(&mut self) {
        debug!("Обработчик оболочки '{}' уничтожен", self.shell);
        self.notify(HandlerEvent::Destroyed(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_changes_are_published_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = DescriptorHandler::new("desktop", 10, true);
        handler.subscribe(tx);

        handler.set_willing(false);
        handler.set_willing(false);
        handler.set_priority(3);

        assert_eq!(rx.try_recv().unwrap(), HandlerEvent::WillingChanged(handler.id()));
        assert_eq!(rx.try_recv().unwrap(), HandlerEvent::PriorityChanged(handler.id()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn drop_publishes_destroyed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = DescriptorHandler::new("tablet", 1, false);
        let id = handler.id();
        handler.subscribe(tx);

        drop(handler);

        assert_eq!(rx.try_recv().unwrap(), HandlerEvent::Destroyed(id));
    }
}
