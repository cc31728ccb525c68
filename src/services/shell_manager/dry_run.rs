use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::info;

use super::{DescriptorHandler, ShellHandler};

/// Эмулирует переключение планшетного режима: обработчик периодически
/// меняет своё согласие, что заставляет менеджер перевыбирать оболочку.
pub fn spawn_tablet_mode_toggler(handler: Arc<DescriptorHandler>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(period);
        // Первый тик срабатывает сразу
        interval.tick().await;

        loop {
            interval.tick().await;
            let willing = !handler.is_willing();
            info!(
                "Dry-run: планшетный режим {}",
                if willing { "включён" } else { "выключен" }
            );
            handler.set_willing(willing);
        }
    })
}
