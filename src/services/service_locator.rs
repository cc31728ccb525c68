use crate::config::Config;
use crate::debug_if_enabled;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub type ServiceHandle = Arc<dyn Any + Send + Sync>;

/// Фабрика вспомогательных сервисов по имени
pub trait ServiceFactory: Send {
    fn create_service(&self, name: &str) -> Option<ServiceHandle>;
}

impl<F> ServiceFactory for F
where
    F: Fn(&str) -> Option<ServiceHandle> + Send,
{
    fn create_service(&self, name: &str) -> Option<ServiceHandle> {
        self(name)
    }
}

/// Ленивый кэш сервисов.
///
/// Результат фабрики запоминается навсегда, в том числе `None`:
/// повторный запрос не пытается создать сервис заново.
pub struct ServiceLocator {
    factory: Box<dyn ServiceFactory>,
    services: HashMap<String, Option<ServiceHandle>>,
}

impl ServiceLocator {
    pub fn new(factory: Box<dyn ServiceFactory>) -> Self {
        Self {
            factory,
            services: HashMap::new(),
        }
    }

    pub fn service(&mut self, name: &str) -> Option<ServiceHandle> {
        if let Some(cached) = self.services.get(name) {
            debug_if_enabled!("Сервис '{}' взят из кэша", name);
            return cached.clone();
        }

        let service = self.factory.create_service(name);
        match &service {
            Some(_) => info!("Создан сервис '{}'", name),
            None => warn!("Фабрика не смогла создать сервис '{}'", name),
        }

        self.services.insert(name.to_string(), service.clone());
        service
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Только для завершения сессии
    pub(crate) fn clear(&mut self) {
        self.services.clear();
    }
}

/// Только чтение загруженной конфигурации
#[derive(Debug)]
pub struct SettingsService {
    config: Arc<Config>,
}

impl SettingsService {
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Время, прошедшее с начала запуска оболочки
#[derive(Debug)]
pub struct SessionClock {
    started: Instant,
}

impl SessionClock {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Встроенные сервисы: "settings" и "session-clock"
pub struct BuiltinServiceFactory {
    config: Arc<Config>,
    started: Instant,
}

impl BuiltinServiceFactory {
    pub fn new(config: Arc<Config>, started: Instant) -> Self {
        Self { config, started }
    }
}

impl ServiceFactory for BuiltinServiceFactory {
    fn create_service(&self, name: &str) -> Option<ServiceHandle> {
        match name {
            "settings" => Some(Arc::new(SettingsService {
                config: Arc::clone(&self.config),
            })),
            "session-clock" => Some(Arc::new(SessionClock {
                started: self.started,
            })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_factory(counter: Arc<AtomicUsize>, produce: bool) -> Box<dyn ServiceFactory> {
        Box::new(move |_name: &str| -> Option<ServiceHandle> {
            counter.fetch_add(1, Ordering::SeqCst);
            if produce {
                Some(Arc::new(42u32))
            } else {
                None
            }
        })
    }

    #[test]
    fn lookup_is_memoized() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut locator = ServiceLocator::new(counting_factory(counter.clone(), true));

        let first = locator.service("panel").unwrap();
        let second = locator.service("panel").unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failed_lookup_is_cached_without_retry() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut locator = ServiceLocator::new(counting_factory(counter.clone(), false));

        assert!(locator.service("missing").is_none());
        assert!(locator.service("missing").is_none());

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(locator.len(), 1);
    }

    #[test]
    fn builtin_services_downcast() {
        let config = Arc::new(Config::default());
        let mut locator = ServiceLocator::new(Box::new(BuiltinServiceFactory::new(
            config,
            Instant::now(),
        )));

        let settings = locator.service("settings").unwrap();
        let settings = settings.downcast_ref::<SettingsService>().unwrap();
        assert_eq!(settings.config().startup.initial_workspaces, 4);

        assert!(locator.service("session-clock").unwrap().downcast_ref::<SessionClock>().is_some());
        assert!(locator.service("launcher").is_none());
    }
}
