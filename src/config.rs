//! Engine runtime configuration.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreType {
    InMemory,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub store: StoreType,
    /// SQLite database URL; resolved from `GUARDIAN_SQLITE_URL` (after a
    /// `.env` load) when not provided explicitly.
    pub sqlite_url: Option<String>,
    pub event_bus: EventBusConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store: StoreType::InMemory,
            sqlite_url: Self::resolve_sqlite_url(None),
            event_bus: EventBusConfig::default(),
        }
    }
}

impl EngineConfig {
    fn resolve_sqlite_url(provided: Option<String>) -> Option<String> {
        if provided.is_some() {
            return provided;
        }
        dotenvy::dotenv().ok();
        Some(
            std::env::var("GUARDIAN_SQLITE_URL")
                .unwrap_or_else(|_| "sqlite://guardian.db".to_string()),
        )
    }

    #[must_use]
    pub fn new(store: StoreType, sqlite_url: Option<String>) -> Self {
        Self {
            store,
            sqlite_url: Self::resolve_sqlite_url(sqlite_url),
            event_bus: EventBusConfig::default(),
        }
    }

    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBusConfig) -> Self {
        self.event_bus = event_bus;
        self
    }
}

#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub buffer_capacity: usize,
}

impl EventBusConfig {
    pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

    #[must_use]
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            buffer_capacity: if buffer_capacity == 0 {
                Self::DEFAULT_BUFFER_CAPACITY
            } else {
                buffer_capacity
            },
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUFFER_CAPACITY)
    }
}
