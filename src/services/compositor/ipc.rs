use crate::debug_if_enabled;
use crate::error::{Result, ShellError};
use crate::events::{CompositorEvent, ShellRequest};
use crate::shell_error;
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Split};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tracing::{info, warn};

use super::r#trait::CompositorTransport;

/// Запросы и события по сокету композитора: один JSON объект на строку.
/// Строка, которую не удалось разобрать, пропускается с предупреждением.
pub struct IpcTransport {
    socket_path: PathBuf,
    reader: Split<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl IpcTransport {
    pub async fn connect(socket_path: PathBuf) -> Result<Self> {
        let stream = UnixStream::connect(&socket_path).await.map_err(|e| {
            shell_error!(display_unavailable, "не удалось подключиться к {:?}: {}", socket_path, e)
        })?;

        info!("Сокет композитора: {:?} (fd {})", socket_path, stream.as_raw_fd());

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            socket_path,
            reader: BufReader::new(read_half).split(b'\n'),
            writer: write_half,
        })
    }
}

#[async_trait::async_trait]
impl CompositorTransport for IpcTransport {
    fn describe(&self) -> String {
        format!("ipc:{}", self.socket_path.display())
    }

    async fn send(&mut self, request: ShellRequest) -> Result<()> {
        debug_if_enabled!("-> {:?}", request);
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<CompositorEvent> {
        loop {
            let line = match self.reader.next_segment().await? {
                Some(line) => line,
                None => return Err(ShellError::Disconnected),
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<CompositorEvent>(&line) {
                Ok(event) => {
                    debug_if_enabled!("<- {:?}", event);
                    return Ok(event);
                }
                Err(e) => {
                    warn!(
                        "Пропущено нераспознанное событие композитора ({}): {}",
                        e,
                        String::from_utf8_lossy(&line)
                    );
                }
            }
        }
    }
}
