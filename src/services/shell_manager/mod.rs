//! ShellManager: registry of shell handlers and arbitration between them.
//!
//! The registry holds only weak references: handlers are owned by whoever
//! discovered them, and a dropped handler is removed through its `Destroyed`
//! notification. Exactly one handler is loaded at a time.

pub mod discovery;
pub mod dry_run;
mod handler;

pub use self::handler::{DescriptorHandler, HandlerEvent, HandlerId, ShellHandler};

use crate::debug_if_enabled;
use crate::error::{Result, ShellError};
use crate::services::ui::{UiNotification, UiSender};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

struct RegisteredHandler {
    id: HandlerId,
    /// Порядок регистрации, разрешает ничьи детерминированно
    seq: u64,
    handle: Weak<dyn ShellHandler>,
}

pub struct ShellManager {
    handlers: HashMap<String, RegisteredHandler>,
    current: Option<HandlerId>,
    next_seq: u64,
    events_tx: mpsc::UnboundedSender<HandlerEvent>,
    events_rx: mpsc::UnboundedReceiver<HandlerEvent>,
    ui: UiSender,
}

impl ShellManager {
    pub fn new(ui: UiSender) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            handlers: HashMap::new(),
            current: None,
            next_seq: 0,
            events_tx,
            events_rx,
            ui,
        }
    }

    /// Регистрирует обработчик; при совпадении имени остаётся первый
    pub fn register(&mut self, name: &str, handler: &Arc<dyn ShellHandler>) -> Result<()> {
        if self.handlers.contains_key(name) {
            return Err(ShellError::DuplicateHandler(name.to_string()));
        }

        handler.subscribe(self.events_tx.clone());
        self.handlers.insert(
            name.to_string(),
            RegisteredHandler {
                id: handler.id(),
                seq: self.next_seq,
                handle: Arc::downgrade(handler),
            },
        );
        self.next_seq += 1;
        info!(
            "Зарегистрирован обработчик оболочки '{}' (priority: {}, willing: {})",
            name,
            handler.priority(),
            handler.is_willing()
        );

        self.update_shell().map(|_| ())
    }

    /// Удаляет обработчик; неизвестный идентификатор молча игнорируется
    pub fn deregister(&mut self, id: HandlerId) -> Result<()> {
        let name = match self.handlers.iter().find(|(_, entry)| entry.id == id) {
            Some((name, _)) => name.clone(),
            None => {
                debug_if_enabled!("Снятие неизвестного обработчика #{} проигнорировано", id);
                return Ok(());
            }
        };

        let was_active = self.current == Some(id);
        if let Some(entry) = self.handlers.remove(&name) {
            if let Some(handler) = entry.handle.upgrade() {
                handler.unsubscribe_all();
                if was_active {
                    handler.set_loaded(false);
                }
            }
        }
        info!("Обработчик оболочки '{}' снят с регистрации", name);

        if was_active {
            self.current = None;
            self.update_shell()?;
        }

        Ok(())
    }

    /// Выбирает активный обработчик.
    ///
    /// Согласный (willing) всегда лучше несогласного, среди равных по
    /// согласию побеждает меньший priority, затем более ранняя регистрация.
    /// Возвращает `true`, если активный обработчик сменился.
    pub fn update_shell(&mut self) -> Result<bool> {
        let best = self
            .handlers
            .values()
            .filter_map(|entry| entry.handle.upgrade().map(|handler| (entry.seq, handler)))
            .min_by_key(|(seq, handler)| (!handler.is_willing(), handler.priority(), *seq))
            .map(|(_, handler)| handler);

        let handler = match best {
            Some(handler) => handler,
            None => {
                error!("Не установлено ни одного обработчика оболочки, продолжение невозможно");
                return Err(ShellError::NoHandlers);
            }
        };

        if self.current == Some(handler.id()) {
            return Ok(false);
        }

        if let Some(old) = self.current.and_then(|id| self.find(id)) {
            old.set_loaded(false);
        }
        handler.set_loaded(true);
        self.current = Some(handler.id());

        let shell = handler.shell();
        info!("-> Текущий обработчик оболочки: {}", shell);
        if self.ui.send(UiNotification::SetShell(shell)).is_err() {
            warn!("UI не принимает уведомления о смене оболочки");
        }

        Ok(true)
    }

    pub fn handle_event(&mut self, event: HandlerEvent) -> Result<()> {
        debug_if_enabled!("Событие обработчика: {:?}", event);
        match event {
            HandlerEvent::WillingChanged(_) | HandlerEvent::PriorityChanged(_) => {
                self.update_shell().map(|_| ())
            }
            HandlerEvent::Destroyed(id) => self.deregister(id),
        }
    }

    /// Ожидает следующее уведомление от обработчиков
    pub async fn next_event(&mut self) -> Option<HandlerEvent> {
        self.events_rx.recv().await
    }

    /// Обрабатывает все уже накопившиеся уведомления
    pub fn pump(&mut self) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event)?;
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[allow(dead_code)]
    pub fn handler(&self, name: &str) -> Option<Arc<dyn ShellHandler>> {
        self.handlers.get(name).and_then(|entry| entry.handle.upgrade())
    }

    pub fn active(&self) -> Option<Arc<dyn ShellHandler>> {
        self.current.and_then(|id| self.find(id))
    }

    /// Имя активной оболочки
    pub fn shell(&self) -> Option<String> {
        self.active().map(|handler| handler.shell())
    }

    /// Каталог ресурсов активной оболочки
    pub fn shell_directory(&self) -> Option<PathBuf> {
        self.active().map(|handler| handler.path())
    }

    fn find(&self, id: HandlerId) -> Option<Arc<dyn ShellHandler>> {
        self.handlers
            .values()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.handle.upgrade())
    }
}
