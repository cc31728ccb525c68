use crate::config::Config;
use crate::error::Result;
use crate::events::{CompositorEvent, ShellRequest};
use crate::utils::SocketFinder;
use tracing::info;

/// Trait for transports that carry decoded shell requests and events
#[async_trait::async_trait]
pub trait CompositorTransport: Send {
    /// Human-readable peer description for logs
    fn describe(&self) -> String;

    /// Send one request to the compositor
    async fn send(&mut self, request: ShellRequest) -> Result<()>;

    /// Wait for the next event; `ShellError::Disconnected` once the peer is gone
    async fn next_event(&mut self) -> Result<CompositorEvent>;
}

/// Factory function to create an appropriate transport based on the dry_run flag.
///
/// Outside dry-run the compositor socket is the native display handle: failing
/// to find or connect to it is fatal.
pub async fn create_transport(
    config: &Config,
    dry_run: bool,
) -> Result<Box<dyn CompositorTransport>> {
    if dry_run {
        let (compositor, handle) = super::loopback::LoopbackCompositor::new();
        super::loopback::spawn_dry_run_script(handle);
        info!("Используется встроенный композитор для сухого запуска");
        Ok(Box::new(compositor))
    } else {
        let socket_path = SocketFinder::find_compositor_socket(&config.compositor.socket)?;
        Ok(Box::new(super::ipc::IpcTransport::connect(socket_path).await?))
    }
}
