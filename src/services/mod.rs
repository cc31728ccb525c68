pub mod compositor;
pub mod keycode_map;
pub mod service_locator;
pub mod shell_manager;
pub mod shell_surface;
pub mod ui;

pub use compositor::{create_transport, CompositorSession};
pub use service_locator::BuiltinServiceFactory;
pub use shell_manager::discovery::HandlerDiscovery;
pub use shell_manager::ShellManager;
pub use ui::{ui_channel, HeadlessUi, ShellUiTrait};
