use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{error, info, warn};

mod config;
mod error;
mod events;
mod services;
mod utils;

use config::Config;
use error::ShellError;
use events::ShellEvent;
use services::shell_manager::dry_run::spawn_tablet_mode_toggler;
use services::service_locator::{SessionClock, SettingsService};
use services::shell_manager::ShellHandler;
use services::{
    create_transport, ui_channel, BuiltinServiceFactory, CompositorSession, HandlerDiscovery,
    HeadlessUi, ShellManager, ShellUiTrait,
};

#[derive(Parser, Debug)]
#[command(name = "tideshell")]
#[command(about = "Управляющий слой оболочки рабочего стола: выбор оболочки и сессия с композитором")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "tideshell.toml")]
    config: String,

    /// Режим сухого запуска (встроенный композитор вместо настоящего)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.level)
    #[arg(long)]
    log_level: Option<String>,

    /// Каталог с оболочками (перекрывает shells.directory)
    #[arg(long)]
    shells_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let started = Instant::now();
    let args = Args::parse();

    // Загрузка конфигурации
    let mut config = Config::load(&args.config)?;
    if let Some(dir) = &args.shells_dir {
        config.shells.directory = dir.clone();
    }

    // Инициализация системы логирования
    // Уровень из командной строки перекрывает фильтр конфигурации
    let directives = match &args.log_level {
        Some(level) => level.clone(),
        None if !config.logging.filter.is_empty() => {
            format!("{},{}", config.logging.level, config.logging.filter)
        }
        None => config.logging.level.clone(),
    };
    init_tracing(&directives, &config.logging.format)?;

    info!("Запуск tideshell v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - используется встроенный композитор");
    }

    let config = Arc::new(config);

    // UI живёт в отдельной задаче и общается с ядром только через канал
    let (ui_tx, ui_rx) = ui_channel();
    let ui: Box<dyn ShellUiTrait + Send> = Box::new(HeadlessUi::new(ui_rx));
    let ui_handle = tokio::spawn(async move {
        if let Err(e) = ui.run().await {
            error!("Ошибка в UI: {}", e);
        }
    });

    // Соединение с композитором; без него оболочка не работает
    let transport = create_transport(&config, args.dry_run).await?;
    let factory = Box::new(BuiltinServiceFactory::new(Arc::clone(&config), started));
    let mut session =
        CompositorSession::new(Arc::clone(&config), transport, ui_tx.clone(), factory, started);
    let mut shell_events = session.subscribe();

    session.bind_globals().await?;

    // Выбор оболочки
    let mut manager = ShellManager::new(ui_tx);
    let mut handlers = HandlerDiscovery::load_handlers(&config.shells.directory, &mut manager);
    let mut toggler = None;
    if handlers.is_empty() && args.dry_run {
        warn!("Оболочки не найдены, используются встроенные обработчики");
        handlers = HandlerDiscovery::builtin_handlers(&mut manager);
        if let Some(tablet) = handlers.iter().find(|h| !h.is_willing()) {
            toggler = Some(spawn_tablet_mode_toggler(
                Arc::clone(tablet),
                Duration::from_secs(15),
            ));
        }
    }
    manager.update_shell()?;
    info!(
        "Обработчиков оболочки: {}, активная: {:?} ({:?})",
        manager.len(),
        manager.shell(),
        manager.shell_directory()
    );

    for (key, modifiers) in config.key_bindings() {
        session.add_key_binding(key, modifiers).await?;
    }

    session.create().await?;
    log_startup_summary(&mut session);
    info!("Все компоненты инициализированы");

    // Основной цикл: события композитора, обработчиков оболочки и сигнал завершения
    let outcome: Result<()> = loop {
        tokio::select! {
            event = session.next_event() => {
                match event {
                    Ok(event) => {
                        if let Err(e) = session.dispatch(event).await {
                            if e.is_fatal() {
                                break Err(e.into());
                            }
                            warn!("Ошибка обработки события композитора: {}", e);
                        }
                    }
                    Err(e) if e.is_fatal() || matches!(e, ShellError::Io(_)) => {
                        error!("Соединение с композитором потеряно: {}", e);
                        break Err(e.into());
                    }
                    Err(e) => warn!("Ошибка чтения события композитора: {}", e),
                }
            }
            Some(event) = manager.next_event() => {
                if let Err(e) = manager.handle_event(event) {
                    break Err(e.into());
                }
                debug_if_enabled!(
                    "Оболочка {:?}, ресурсы в {:?}",
                    manager.shell(),
                    manager.shell_directory()
                );
            }
            shell_event = shell_events.recv() => {
                match shell_event {
                    Ok(ShellEvent::KeyBindingTriggered(id)) => info!("Привязка клавиш #{} сработала", id),
                    Ok(ShellEvent::WindowsChanged) => {
                        debug_if_enabled!("Открытых окон: {}", session.windows().len());
                    }
                    Ok(ShellEvent::WorkspacesChanged) => {
                        debug_if_enabled!("Рабочих столов: {}", session.workspaces().len());
                    }
                    Ok(event) => debug_if_enabled!("Событие оболочки: {:?}", event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Пропущено {} событий оболочки", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                }
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break Ok(());
            }
        }
    };

    info!("Завершение работы...");

    info!("Активная оболочка при завершении: {:?}", manager.shell());
    if let Err(e) = session.shutdown().await {
        warn!("Сессия композитора завершена с ошибкой: {}", e);
    }
    info!("Состояние сессии: {:?}", session.state());
    drop(handlers);

    if let Some(toggler) = toggler {
        toggler.abort();
    }
    ui_handle.abort();

    info!("tideshell завершил работу");
    outcome
}

/// Сводка запуска через встроенные сервисы сессии
fn log_startup_summary(session: &mut CompositorSession) {
    let requested = session
        .lookup_service("settings")
        .and_then(|service| {
            service
                .downcast_ref::<SettingsService>()
                .map(|settings| settings.config().startup.initial_workspaces)
        })
        .unwrap_or_default();
    info!(
        "Мониторов: {}, рабочих столов: {} из {}, привязок клавиш: {}",
        session.outputs().len(),
        session.workspaces().len(),
        requested,
        session.key_bindings().len()
    );

    if let Some(clock) = session.lookup_service("session-clock") {
        if let Some(clock) = clock.downcast_ref::<SessionClock>() {
            info!("Запуск занял {:?}", clock.elapsed());
        }
    }
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let fmt_layer = tracing_subscriber::fmt::layer();
    let registry = tracing_subscriber::registry().with(filter);
    if format == "compact" {
        registry.with(fmt_layer.compact()).init();
    } else {
        registry.with(fmt_layer).init();
    }

    Ok(())
}
