mod ipc;
pub mod loopback;
pub mod session;
mod r#trait;

pub use r#trait::create_transport;
pub use session::CompositorSession;
