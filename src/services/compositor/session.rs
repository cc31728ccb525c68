use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{
    CompositorEvent, GlobalInterface, KeyBinding, KeyCode, Modifiers, ObjectHandle, Output,
    ShellEvent, ShellRequest, Window, Workspace,
};
use crate::services::keycode_map::KeycodeMap;
use crate::services::service_locator::{ServiceFactory, ServiceHandle, ServiceLocator};
use crate::services::shell_surface::ShellSurfaceTracker;
use crate::services::ui::{UiNotification, UiSender};
use crate::shell_error;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, oneshot};
use tokio::time::Duration;
use tracing::{error, info, warn};

use super::r#trait::CompositorTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    GlobalsBound,
    UiBuilding,
    Ready,
}

/// Привязанные глобальные объекты композитора
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BoundGlobals {
    pub registry: Option<ObjectHandle>,
    pub shell: Option<ObjectHandle>,
    pub shell_surface: Option<ObjectHandle>,
    pub notification: Option<ObjectHandle>,
}

impl BoundGlobals {
    pub fn get(&self, iface: GlobalInterface) -> Option<ObjectHandle> {
        match iface {
            GlobalInterface::Shell => self.shell,
            GlobalInterface::ShellSurface => self.shell_surface,
            GlobalInterface::Notification => self.notification,
        }
    }

    fn slot(&mut self, iface: GlobalInterface) -> &mut Option<ObjectHandle> {
        match iface {
            GlobalInterface::Shell => &mut self.shell,
            GlobalInterface::ShellSurface => &mut self.shell_surface,
            GlobalInterface::Notification => &mut self.notification,
        }
    }

    pub fn missing(&self) -> Vec<GlobalInterface> {
        GlobalInterface::REQUIRED
            .into_iter()
            .filter(|iface| self.get(*iface).is_none())
            .collect()
    }
}

/// Сессия с композитором.
///
/// Disconnected → Connecting → GlobalsBound → UiBuilding → Ready.
/// Владеет рабочими столами, окнами, привязками клавиш и кэшем сервисов;
/// при завершении освобождает их раньше глобальных объектов.
pub struct CompositorSession {
    config: Arc<Config>,
    transport: Box<dyn CompositorTransport>,
    state: SessionState,
    globals: BoundGlobals,
    global_names: HashMap<u32, GlobalInterface>,
    outputs: Vec<Output>,
    tracker: ShellSurfaceTracker,
    services: ServiceLocator,
    key_bindings: Vec<KeyBinding>,
    ui: UiSender,
    events: broadcast::Sender<ShellEvent>,
    next_object_id: u32,
    next_serial: u32,
    next_binding_id: u32,
    ready_sent: bool,
    started: Instant,
}

impl CompositorSession {
    pub fn new(
        config: Arc<Config>,
        transport: Box<dyn CompositorTransport>,
        ui: UiSender,
        factory: Box<dyn ServiceFactory>,
        started: Instant,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let mut session = Self {
            config,
            state: SessionState::Disconnected,
            globals: BoundGlobals::default(),
            global_names: HashMap::new(),
            outputs: Vec::new(),
            tracker: ShellSurfaceTracker::new(events.clone()),
            services: ServiceLocator::new(factory),
            key_bindings: Vec::new(),
            ui,
            events,
            next_object_id: 1,
            next_serial: 1,
            next_binding_id: 1,
            ready_sent: false,
            started,
            transport,
        };

        info!("Соединение с композитором: {}", session.transport.describe());
        session.set_state(SessionState::Connecting);
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[allow(dead_code)]
    pub fn globals(&self) -> &BoundGlobals {
        &self.globals
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn windows(&self) -> &[Window] {
        self.tracker.windows()
    }

    pub fn workspaces(&self) -> &[Workspace] {
        self.tracker.workspaces()
    }

    pub fn key_bindings(&self) -> &[KeyBinding] {
        &self.key_bindings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.events.subscribe()
    }

    /// Запрашивает реестр и ждёт, пока композитор объявит все глобальные объекты
    pub async fn bind_globals(&mut self) -> Result<()> {
        let registry = self.allocate_object();
        self.transport.send(ShellRequest::GetRegistry { id: registry.0 }).await?;
        self.globals.registry = Some(registry);

        let timeout = self.config.startup.bind_timeout_ms.map(Duration::from_millis);
        self.roundtrip(timeout, "привязка глобальных объектов").await?;

        if let Some(iface) = self.globals.missing().first() {
            error!("Композитор не объявил {}, запуск невозможен", iface);
            return Err(shell_error!(missing_global, "{}", iface));
        }

        self.set_state(SessionState::GlobalsBound);
        Ok(())
    }

    /// Строит UI на всех мониторах, добавляет рабочие столы и сообщает о готовности.
    /// Повторный вызов после готовности ничего не делает.
    pub async fn create(&mut self) -> Result<()> {
        if self.ready_sent {
            debug_if_enabled!("Оболочка уже готова, повторный create() пропущен");
            return Ok(());
        }
        if self.state != SessionState::GlobalsBound {
            return Err(shell_error!(
                internal,
                "create() в состоянии {:?}, ожидалось GlobalsBound",
                self.state
            ));
        }

        self.set_state(SessionState::UiBuilding);
        let settle = self.config.startup.settle_timeout_ms.map(Duration::from_millis);

        let mut pending = Vec::with_capacity(self.outputs.len());
        for output in self.outputs.clone() {
            info!("--- Монитор {} {}x{}", output.name, output.width, output.height);
            let (ready, surface_ready) = oneshot::channel();
            self.ui
                .send(UiNotification::BuildSurface { output, ready })
                .map_err(|_| shell_error!(service_unavailable, "UI не принимает уведомления"))?;
            pending.push(surface_ready);
        }

        with_timeout(settle, "готовность UI", await_surfaces(pending)).await?;

        for _ in 0..self.config.startup.initial_workspaces {
            self.add_workspace().await?;
        }
        self.roundtrip(settle, "обработка рабочих столов").await?;

        self.ready().await
    }

    /// Сигнал композитору о готовности оболочки (плавное появление фона).
    /// Отправляется ровно один раз и только после построения UI.
    async fn ready(&mut self) -> Result<()> {
        if self.ready_sent {
            return Ok(());
        }
        if self.state != SessionState::UiBuilding {
            return Err(shell_error!(
                internal,
                "сигнал готовности в состоянии {:?}, ожидалось UiBuilding",
                self.state
            ));
        }

        self.transport.send(ShellRequest::DesktopReady).await?;
        self.ready_sent = true;
        self.set_state(SessionState::Ready);
        info!(
            "Оболочка готова, запуск занял {} мс",
            self.started.elapsed().as_millis()
        );
        Ok(())
    }

    /// Запрос на новый рабочий стол; он появится с событием WorkspaceAdded
    pub async fn add_workspace(&mut self) -> Result<()> {
        self.transport.send(ShellRequest::AddWorkspace).await
    }

    pub fn remove_workspace(&mut self, index: usize) -> Option<Workspace> {
        self.tracker.workspace_removed(index)
    }

    /// Регистрирует глобальную привязку. Одинаковые сочетания не объединяются.
    pub async fn add_key_binding(&mut self, key: KeyCode, modifiers: Modifiers) -> Result<KeyBinding> {
        let binding = KeyBinding::new(self.next_binding_id, key, modifiers);
        self.next_binding_id += 1;

        self.transport
            .send(ShellRequest::AddKeyBinding {
                id: binding.id,
                key: key.value(),
                modifiers: modifiers.mask(),
            })
            .await?;

        info!(
            "Добавлена привязка клавиш {} ({})",
            binding,
            KeycodeMap::get_key_name(key.value()).unwrap_or("?")
        );
        self.key_bindings.push(binding.clone());
        Ok(binding)
    }

    pub async fn minimize_windows(&mut self) -> Result<()> {
        self.transport.send(ShellRequest::MinimizeWindows).await
    }

    pub async fn restore_windows(&mut self) -> Result<()> {
        self.transport.send(ShellRequest::RestoreWindows).await
    }

    pub fn lookup_service(&mut self, name: &str) -> Option<ServiceHandle> {
        self.services.service(name)
    }

    pub async fn next_event(&mut self) -> Result<CompositorEvent> {
        self.transport.next_event().await
    }

    /// Разбирает одно событие композитора
    pub async fn dispatch(&mut self, event: CompositorEvent) -> Result<()> {
        match event {
            CompositorEvent::Global { name, interface, version } => {
                self.bind_global(name, &interface, version).await?;
            }
            CompositorEvent::GlobalRemoved { name } => {
                if let Some(iface) = self.global_names.remove(&name) {
                    warn!("Композитор отозвал глобальный объект {}", iface);
                    *self.globals.slot(iface) = None;
                }
            }
            CompositorEvent::OutputAnnounced(output) => {
                self.output_announced(output);
            }
            CompositorEvent::Done { serial } => {
                debug_if_enabled!("Запоздалый ответ синхронизации #{}", serial);
            }
            CompositorEvent::WorkspaceAdded { object } => {
                self.tracker.workspace_added(Workspace::new(object));
            }
            CompositorEvent::WindowMapped(window) => {
                self.tracker.window_mapped(window);
            }
            CompositorEvent::WindowUnmapped { surface } => {
                self.tracker.window_unmapped(surface);
            }
            CompositorEvent::PrepareLockSurface => {
                self.notify_ui(UiNotification::CreateLockSurface);
            }
            CompositorEvent::CursorChanged { cursor } => {
                self.notify_ui(UiNotification::SetGrabCursor(cursor));
            }
            CompositorEvent::KeyBindingTriggered { id } => {
                match self.key_bindings.iter().find(|b| b.id == id) {
                    Some(binding) => {
                        info!("Сработала привязка {}", binding);
                        let _ = self.events.send(ShellEvent::KeyBindingTriggered(id));
                    }
                    None => debug_if_enabled!("Сработала неизвестная привязка #{}", id),
                }
            }
        }
        Ok(())
    }

    /// Освобождает ресурсы сессии: сначала окна, рабочие столы, сервисы и
    /// привязки, затем глобальные объекты композитора.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Завершение сессии композитора");

        self.tracker.clear();
        self.services.clear();
        self.key_bindings.clear();

        let handles = [
            self.globals.notification.take(),
            self.globals.shell_surface.take(),
            self.globals.shell.take(),
            self.globals.registry.take(),
        ];
        for handle in handles.into_iter().flatten() {
            if let Err(e) = self.transport.send(ShellRequest::Release { id: handle.0 }).await {
                warn!("Не удалось освободить {}: {}", handle, e);
            }
        }

        self.global_names.clear();
        self.set_state(SessionState::Disconnected);
        Ok(())
    }

    async fn bind_global(&mut self, name: u32, interface: &str, version: u32) -> Result<()> {
        let iface = match GlobalInterface::from_protocol_name(interface) {
            Some(iface) => iface,
            None => {
                debug_if_enabled!("Глобальный объект {} не нужен оболочке", interface);
                return Ok(());
            }
        };

        if self.globals.get(iface).is_some() {
            debug_if_enabled!("{} уже привязан, повторное объявление пропущено", iface);
            return Ok(());
        }

        let handle = self.allocate_object();
        self.transport
            .send(ShellRequest::Bind {
                name,
                interface: interface.to_string(),
                version,
                id: handle.0,
            })
            .await?;

        *self.globals.slot(iface) = Some(handle);
        self.global_names.insert(name, iface);
        info!("Привязан {} v{} как {}", iface, version, handle);
        Ok(())
    }

    fn output_announced(&mut self, output: Output) {
        if self.outputs.iter().any(|o| o.id == output.id) {
            return;
        }

        // Мониторы, подключённые после запуска, получают поверхность сразу
        if self.state == SessionState::Ready {
            info!("Подключён монитор {}", output.name);
            let (ready, surface_ready) = oneshot::channel();
            self.notify_ui(UiNotification::BuildSurface {
                output: output.clone(),
                ready,
            });
            let name = output.name.clone();
            tokio::spawn(async move {
                if surface_ready.await.is_ok() {
                    info!("Поверхность на мониторе {} готова", name);
                }
            });
        }
        self.outputs.push(output);
    }

    /// Синхронизация с композитором: все события до ответа на Sync разобраны
    async fn roundtrip(&mut self, timeout: Option<Duration>, phase: &str) -> Result<()> {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.transport.send(ShellRequest::Sync { serial }).await?;
        with_timeout(timeout, phase, self.dispatch_until_done(serial)).await
    }

    async fn dispatch_until_done(&mut self, serial: u32) -> Result<()> {
        loop {
            match self.transport.next_event().await? {
                CompositorEvent::Done { serial: done } if done == serial => return Ok(()),
                event => self.dispatch(event).await?,
            }
        }
    }

    fn notify_ui(&self, notification: UiNotification) {
        if self.ui.send(notification).is_err() {
            warn!("UI не принимает уведомления");
        }
    }

    fn allocate_object(&mut self) -> ObjectHandle {
        let handle = ObjectHandle(self.next_object_id);
        self.next_object_id += 1;
        handle
    }

    fn set_state(&mut self, state: SessionState) {
        info!(
            "Сессия: {:?} -> {:?} ({} мс)",
            self.state,
            state,
            self.started.elapsed().as_millis()
        );
        self.state = state;
    }
}

impl Drop for CompositorSession {
    fn drop(&mut self) {
        if self.state != SessionState::Disconnected {
            warn!("Сессия композитора уничтожена без shutdown()");
        }
    }
}

async fn await_surfaces(pending: Vec<oneshot::Receiver<()>>) -> Result<()> {
    for surface_ready in pending {
        surface_ready
            .await
            .map_err(|_| shell_error!(service_unavailable, "UI закрыл поверхность до готовности"))?;
    }
    Ok(())
}

/// Без таймаута ждёт сколько угодно
async fn with_timeout<F>(timeout: Option<Duration>, phase: &str, future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| shell_error!(timeout, "{} дольше {:?}", phase, limit))?,
        None => future.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellError;
    use crate::events::SurfaceId;
    use crate::services::compositor::loopback::{LoopbackCompositor, LoopbackHandle};
    use crate::services::service_locator::BuiltinServiceFactory;
    use crate::services::ui::{ui_channel, HeadlessUi, ShellUiTrait, UiReceiver};

    fn session_with(
        config: Config,
        compositor: LoopbackCompositor,
    ) -> (CompositorSession, UiReceiver) {
        let config = Arc::new(config);
        let (ui_tx, ui_rx) = ui_channel();
        let factory = Box::new(BuiltinServiceFactory::new(Arc::clone(&config), Instant::now()));
        let session =
            CompositorSession::new(config, Box::new(compositor), ui_tx, factory, Instant::now());
        (session, ui_rx)
    }

    fn spawn_ui(ui_rx: UiReceiver) {
        let ui: Box<dyn ShellUiTrait + Send> = Box::new(HeadlessUi::new(ui_rx));
        tokio::spawn(ui.run());
    }

    async fn ready_session() -> (CompositorSession, LoopbackHandle) {
        let (compositor, handle) = LoopbackCompositor::new();
        let (mut session, ui_rx) = session_with(Config::default(), compositor);
        spawn_ui(ui_rx);
        session.bind_globals().await.unwrap();
        session.create().await.unwrap();
        (session, handle)
    }

    fn drain(rx: &mut broadcast::Receiver<ShellEvent>) -> Vec<ShellEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn startup_reaches_ready() {
        let (mut session, handle) = ready_session().await;

        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.globals().missing().is_empty());
        assert!(session.globals().registry.is_some());
        assert_eq!(session.workspaces().len(), 4);
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::AddWorkspace)), 4);
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::DesktopReady)), 1);
        // wl_seat не привязывается
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::Bind { .. })), 3);

        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn ready_is_sent_once() {
        let (mut session, handle) = ready_session().await;

        session.create().await.unwrap();
        session.ready().await.unwrap();

        assert_eq!(handle.count(|r| matches!(r, ShellRequest::DesktopReady)), 1);
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::AddWorkspace)), 4);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn ready_before_handshake_is_rejected() {
        let (compositor, handle) = LoopbackCompositor::new();
        let (mut session, ui_rx) = session_with(Config::default(), compositor);

        assert!(matches!(session.ready().await, Err(ShellError::Internal(_))));
        assert!(matches!(session.create().await, Err(ShellError::Internal(_))));

        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::DesktopReady)), 0);

        // После привязки глобальных объектов запуск проходит как обычно
        spawn_ui(ui_rx);
        session.bind_globals().await.unwrap();
        session.create().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::DesktopReady)), 1);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn revoked_global_is_missing_and_not_released() {
        let (mut session, handle) = ready_session().await;
        let notification = session.globals().notification.unwrap();
        // Глобальные объекты объявляются по порядку REQUIRED, начиная с имени 1
        session
            .dispatch(CompositorEvent::GlobalRemoved { name: 3 })
            .await
            .unwrap();

        assert_eq!(session.globals().missing(), vec![GlobalInterface::Notification]);

        session.shutdown().await.unwrap();
        let released = handle.count(
            |r| matches!(r, ShellRequest::Release { id } if *id == notification.0),
        );
        assert_eq!(released, 0);
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::Release { .. })), 3);
    }

    #[tokio::test]
    async fn hotplugged_output_waits_for_its_surface() {
        let (compositor, _handle) = LoopbackCompositor::new();
        let (mut session, mut ui_rx) = session_with(Config::default(), compositor);
        let (acks_tx, mut acks) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(notification) = ui_rx.recv().await {
                if let UiNotification::BuildSurface { output, ready } = notification {
                    let _ = acks_tx.send((output.name, ready.send(()).is_ok()));
                }
            }
        });
        session.bind_globals().await.unwrap();
        session.create().await.unwrap();

        let hotplugged = Output { id: 2, name: "HDMI-A-1".into(), width: 2560, height: 1440 };
        session
            .dispatch(CompositorEvent::OutputAnnounced(hotplugged))
            .await
            .unwrap();

        assert_eq!(acks.recv().await.unwrap(), ("LOOPBACK-1".to_string(), true));
        assert_eq!(acks.recv().await.unwrap(), ("HDMI-A-1".to_string(), true));
        assert_eq!(session.outputs().len(), 2);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn globals_bind_in_any_order() {
        let (compositor, _handle) = LoopbackCompositor::new();
        let compositor = compositor.with_globals(&[
            "tide_notification_daemon",
            "wl_compositor",
            "tide_shell_surface",
            "tide_desktop_shell",
        ]);
        let (mut session, _ui_rx) = session_with(Config::default(), compositor);

        session.bind_globals().await.unwrap();

        assert_eq!(session.state(), SessionState::GlobalsBound);
        assert!(session.globals().missing().is_empty());
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn missing_global_is_fatal() {
        let (compositor, _handle) = LoopbackCompositor::new();
        let compositor = compositor.without_global(GlobalInterface::Notification);
        let (mut session, _ui_rx) = session_with(Config::default(), compositor);

        let err = session.bind_globals().await.unwrap_err();

        assert!(matches!(err, ShellError::MissingGlobal(ref iface) if iface == "tide_notification_daemon"));
        assert!(err.is_fatal());
        assert_eq!(session.state(), SessionState::Connecting);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn ui_settle_timeout_when_configured() {
        let (compositor, _handle) = LoopbackCompositor::new();
        let mut config = Config::default();
        config.startup.settle_timeout_ms = Some(50);
        // UI не запущен: поверхности никогда не станут готовы
        let (mut session, _ui_rx) = session_with(config, compositor);
        session.bind_globals().await.unwrap();

        let err = session.create().await.unwrap_err();

        assert!(matches!(err, ShellError::Timeout(_)));
        assert_eq!(session.state(), SessionState::UiBuilding);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn surface_per_output() {
        let outputs: Vec<Output> = (1..=3)
            .map(|id| Output { id, name: format!("OUT-{}", id), width: 1280, height: 720 })
            .collect();
        let (compositor, _handle) = LoopbackCompositor::new();
        let (mut session, mut ui_rx) =
            session_with(Config::default(), compositor.with_outputs(outputs));
        session.bind_globals().await.unwrap();

        let ui = tokio::spawn(async move {
            let mut built = 0;
            while let Some(notification) = ui_rx.recv().await {
                if let UiNotification::BuildSurface { ready, .. } = notification {
                    built += 1;
                    ready.send(()).unwrap();
                    if built == 3 {
                        break;
                    }
                }
            }
            built
        });

        session.create().await.unwrap();
        assert_eq!(ui.await.unwrap(), 3);
        assert_eq!(session.outputs().len(), 3);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn window_events_reach_tracker() {
        let (mut session, handle) = ready_session().await;
        let mut events = session.subscribe();

        handle.inject(CompositorEvent::WindowMapped(Window::new(SurfaceId(9), "Editor".into())));
        handle.inject(CompositorEvent::WindowUnmapped { surface: SurfaceId(9) });
        for _ in 0..2 {
            let event = session.next_event().await.unwrap();
            session.dispatch(event).await.unwrap();
        }

        assert!(session.windows().is_empty());
        assert_eq!(
            drain(&mut events),
            vec![ShellEvent::WindowsChanged, ShellEvent::WindowsChanged]
        );
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn remove_workspace_reindexes_and_ignores_bad_index() {
        let (mut session, _handle) = ready_session().await;
        let mut events = session.subscribe();

        assert!(session.remove_workspace(1).is_some());
        assert!(session.remove_workspace(10).is_none());

        let objects: Vec<u32> = session.workspaces().iter().map(|w| w.object).collect();
        assert_eq!(objects, vec![1, 3, 4]);
        assert_eq!(
            drain(&mut events),
            vec![ShellEvent::WorkspaceRemoved(1), ShellEvent::WorkspacesChanged]
        );
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_key_bindings_are_independent() {
        let (mut session, handle) = ready_session().await;
        let mut events = session.subscribe();
        let modifiers = Modifiers::new().with_super(true);

        let first = session.add_key_binding(KeyCode(32), modifiers).await.unwrap();
        let second = session.add_key_binding(KeyCode(32), modifiers).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(session.key_bindings().len(), 2);
        assert_eq!(handle.count(|r| matches!(r, ShellRequest::AddKeyBinding { .. })), 2);

        session
            .dispatch(CompositorEvent::KeyBindingTriggered { id: second.id })
            .await
            .unwrap();
        session
            .dispatch(CompositorEvent::KeyBindingTriggered { id: 999 })
            .await
            .unwrap();
        assert_eq!(drain(&mut events), vec![ShellEvent::KeyBindingTriggered(second.id)]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn lock_and_cursor_are_forwarded_to_ui() {
        let (compositor, _handle) = LoopbackCompositor::new();
        let (mut session, mut ui_rx) = session_with(Config::default(), compositor);
        session.bind_globals().await.unwrap();

        session.dispatch(CompositorEvent::PrepareLockSurface).await.unwrap();
        session
            .dispatch(CompositorEvent::CursorChanged { cursor: "move".into() })
            .await
            .unwrap();

        assert!(matches!(ui_rx.try_recv(), Ok(UiNotification::CreateLockSurface)));
        assert!(matches!(ui_rx.try_recv(), Ok(UiNotification::SetGrabCursor(ref c)) if c == "move"));
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn window_requests_are_fire_and_forget() {
        let (mut session, handle) = ready_session().await;

        session.minimize_windows().await.unwrap();
        session.restore_windows().await.unwrap();

        let requests = handle.requests();
        let tail = &requests[requests.len() - 2..];
        assert_eq!(tail, &[ShellRequest::MinimizeWindows, ShellRequest::RestoreWindows]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn services_are_cached_per_session() {
        let (mut session, _handle) = ready_session().await;

        let first = session.lookup_service("settings").unwrap();
        let second = session.lookup_service("settings").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(session.lookup_service("unknown").is_none());
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_releases_dependents_before_globals() {
        let (mut session, handle) = ready_session().await;
        let globals = session.globals().clone();
        session.add_key_binding(KeyCode(30), Modifiers::new()).await.unwrap();

        session.shutdown().await.unwrap();

        assert!(session.workspaces().is_empty());
        assert!(session.key_bindings().is_empty());
        assert_eq!(session.state(), SessionState::Disconnected);

        let requests = handle.requests();
        let released: Vec<&ShellRequest> = requests[requests.len() - 4..].iter().collect();
        let expected = [
            globals.notification.unwrap(),
            globals.shell_surface.unwrap(),
            globals.shell.unwrap(),
            globals.registry.unwrap(),
        ];
        for (request, object) in released.into_iter().zip(expected) {
            assert_eq!(request, &ShellRequest::Release { id: object.0 });
        }
    }
}
