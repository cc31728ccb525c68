use crate::error::{Result, ShellError};
use crate::events::{CompositorEvent, GlobalInterface, Output, ShellRequest, SurfaceId, Window};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::info;

use super::r#trait::CompositorTransport;

/// Встроенный композитор: отвечает на запросы так же, как настоящий,
/// но целиком внутри процесса. Нужен для сухого запуска и тестов.
pub struct LoopbackCompositor {
    pending: VecDeque<CompositorEvent>,
    injected: mpsc::UnboundedReceiver<CompositorEvent>,
    requests: Arc<Mutex<Vec<ShellRequest>>>,
    globals: Vec<String>,
    outputs: Vec<Output>,
    next_workspace: u32,
}

/// Управление встроенным композитором со стороны теста или сценария
#[derive(Clone)]
pub struct LoopbackHandle {
    events: mpsc::UnboundedSender<CompositorEvent>,
    requests: Arc<Mutex<Vec<ShellRequest>>>,
}

impl LoopbackHandle {
    /// Подбросить событие от имени композитора; `false`, если сессия уже закрыта
    pub fn inject(&self, event: CompositorEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Все запросы, полученные композитором, в порядке поступления
    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<ShellRequest> {
        self.requests.lock().clone()
    }

    #[allow(dead_code)]
    pub fn count(&self, predicate: impl Fn(&ShellRequest) -> bool) -> usize {
        self.requests.lock().iter().filter(|r| predicate(r)).count()
    }
}

impl LoopbackCompositor {
    pub fn new() -> (Self, LoopbackHandle) {
        let (events, injected) = mpsc::unbounded_channel();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let compositor = Self {
            pending: VecDeque::new(),
            injected,
            requests: Arc::clone(&requests),
            globals: GlobalInterface::REQUIRED
                .iter()
                .map(|iface| iface.protocol_name().to_string())
                .chain(std::iter::once("wl_seat".to_string()))
                .collect(),
            outputs: vec![Output {
                id: 1,
                name: "LOOPBACK-1".to_string(),
                width: 1920,
                height: 1080,
            }],
            next_workspace: 1,
        };

        (compositor, LoopbackHandle { events, requests })
    }

    /// Объявлять глобальные объекты в указанном порядке
    #[allow(dead_code)]
    pub fn with_globals(mut self, globals: &[&str]) -> Self {
        self.globals = globals.iter().map(|g| g.to_string()).collect();
        self
    }

    #[allow(dead_code)]
    pub fn without_global(mut self, iface: GlobalInterface) -> Self {
        self.globals.retain(|g| g != iface.protocol_name());
        self
    }

    #[allow(dead_code)]
    pub fn with_outputs(mut self, outputs: Vec<Output>) -> Self {
        self.outputs = outputs;
        self
    }

    fn respond(&mut self, request: &ShellRequest) {
        match request {
            ShellRequest::GetRegistry { .. } => {
                for (name, interface) in self.globals.iter().enumerate() {
                    self.pending.push_back(CompositorEvent::Global {
                        name: name as u32 + 1,
                        interface: interface.clone(),
                        version: 1,
                    });
                }
                for output in &self.outputs {
                    self.pending.push_back(CompositorEvent::OutputAnnounced(output.clone()));
                }
            }
            ShellRequest::Sync { serial } => {
                self.pending.push_back(CompositorEvent::Done { serial: *serial });
            }
            ShellRequest::AddWorkspace => {
                self.pending.push_back(CompositorEvent::WorkspaceAdded {
                    object: self.next_workspace,
                });
                self.next_workspace += 1;
            }
            _ => {}
        }
    }
}

#[async_trait::async_trait]
impl CompositorTransport for LoopbackCompositor {
    fn describe(&self) -> String {
        "loopback".to_string()
    }

    async fn send(&mut self, request: ShellRequest) -> Result<()> {
        self.respond(&request);
        self.requests.lock().push(request);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<CompositorEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }
        self.injected.recv().await.ok_or(ShellError::Disconnected)
    }
}

const FAKE_WINDOWS: [&str; 4] = [
    "Terminal - dry_run",
    "Browser - dry_run",
    "Editor - dry_run",
    "Files - dry_run",
];

/// Шаг сценария: на чётном тике окно появляется, на следующем исчезает,
/// затем очередь переходит к следующему окну
fn dry_run_step(tick: u32) -> CompositorEvent {
    let index = (tick / 2) as usize % FAKE_WINDOWS.len();
    let surface = SurfaceId(100 + index as u32);

    if tick % 2 == 0 {
        info!("Dry-run: эмулируем появление окна {}", FAKE_WINDOWS[index]);
        CompositorEvent::WindowMapped(
            Window::new(surface, FAKE_WINDOWS[index].to_string())
                .with_app_id("dry-run".to_string()),
        )
    } else {
        CompositorEvent::WindowUnmapped { surface }
    }
}

/// Сценарий сухого запуска: окна появляются и исчезают по таймеру
pub fn spawn_dry_run_script(handle: LoopbackHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick: u32 = 0;
        let mut interval = interval(Duration::from_secs(5));
        interval.tick().await;

        loop {
            interval.tick().await;
            if !handle.inject(dry_run_step(tick)) {
                break;
            }
            tick = tick.wrapping_add(1);
        }
    })
}
