//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::Barrier;

use userbot::application::errors::{BotError, GatewayError, StorageError};
use userbot::application::messaging::Filter;
use userbot::domain::entities::{ApprovalRecord, Event, EventKind, LogEntry, LogLevel, User, UserStats};
use userbot::domain::traits::{EventGateway, EventHandler, HandlerId, Store};
use userbot::infrastructure::adapters::ConsoleGateway;
use userbot::infrastructure::config::Config;
use userbot::infrastructure::storage::MemoryStore;
use userbot::plugins::{builtin, HandlerSpec, Plugin, PluginCatalog, PluginContext, PluginInfo, PluginManager};

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Gateway that records handler registrations and can reject one of them
#[derive(Default)]
pub struct RecordingGateway {
    handlers: Mutex<BTreeMap<u64, (EventKind, Filter)>>,
    added: AtomicUsize,
    reject_at: Mutex<Option<usize>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the n-th `add_handler` call from now on (1-based)
    pub fn reject_nth_add(&self, n: usize) {
        let base = self.added.load(Ordering::SeqCst);
        *self.reject_at.lock().unwrap() = Some(base + n);
    }

    pub fn ids(&self) -> Vec<u64> {
        self.handlers.lock().unwrap().keys().copied().collect()
    }

    /// Installed handlers whose filter currently accepts the event
    pub fn matching(&self, event: &Event) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .values()
            .filter(|(kind, filter)| *kind == event.kind() && filter.matches(event))
            .count()
    }
}

#[async_trait]
impl EventGateway for RecordingGateway {
    fn add_handler(&self, kind: EventKind, filter: Filter, _handler: EventHandler) -> Result<HandlerId, GatewayError> {
        let n = self.added.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.reject_at.lock().unwrap() == Some(n) {
            return Err(GatewayError::HandlerRejected(format!("registration {} refused", n)));
        }
        let id = n as u64;
        self.handlers.lock().unwrap().insert(id, (kind, filter));
        Ok(HandlerId(id))
    }

    fn remove_handler(&self, id: HandlerId) -> Result<(), GatewayError> {
        match self.handlers.lock().unwrap().remove(&id.0) {
            Some(_) => Ok(()),
            None => Err(GatewayError::UnknownHandler(id.0)),
        }
    }

    fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    async fn me(&self) -> Result<User, GatewayError> {
        Ok(User::new(1))
    }

    async fn send_message(&self, _chat_id: i64, _text: &str) -> Result<i64, GatewayError> {
        Ok(1)
    }

    async fn edit_message(&self, _chat_id: i64, _message_id: i64, _text: &str) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn block_user(&self, _user_id: i64) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn unblock_user(&self, _user_id: i64) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Counters shared by every instance built from one fixture
#[derive(Default)]
pub struct Counters {
    pub inits: AtomicUsize,
    pub cleanups: AtomicUsize,
    pub hits: AtomicUsize,
}

impl Counters {
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Configurable test plugin
#[derive(Clone)]
pub struct Fixture {
    name: String,
    handlers: usize,
    fail_init: bool,
    fail_cleanup: bool,
    barrier: Option<Arc<Barrier>>,
    init_delay: Option<Duration>,
    cleanup_delay: Option<Duration>,
    pub counters: Arc<Counters>,
}

impl Fixture {
    pub fn new(name: &str, handlers: usize) -> Self {
        Self {
            name: name.to_string(),
            handlers,
            fail_init: false,
            fail_cleanup: false,
            barrier: None,
            init_delay: None,
            cleanup_delay: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_cleanup(mut self) -> Self {
        self.fail_cleanup = true;
        self
    }

    /// Block init until every holder of the barrier has arrived
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn slow_init(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    pub fn slow_cleanup(mut self, delay: Duration) -> Self {
        self.cleanup_delay = Some(delay);
        self
    }
}

#[async_trait]
impl Plugin for Fixture {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::new(&self.name).with_description("test fixture")
    }

    async fn init(&self, _ctx: &PluginContext) -> Result<(), BotError> {
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.init_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_init {
            return Err(BotError::Internal(format!("{} refused to start", self.name)));
        }
        Ok(())
    }

    fn handlers(&self, _ctx: &PluginContext) -> Vec<HandlerSpec> {
        (0..self.handlers)
            .map(|_| {
                let counters = self.counters.clone();
                HandlerSpec::message(Filter::All, move |_message| {
                    let counters = counters.clone();
                    async move {
                        counters.hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
            })
            .collect()
    }

    async fn cleanup(&self) -> Result<(), BotError> {
        if let Some(delay) = self.cleanup_delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.cleanups.fetch_add(1, Ordering::SeqCst);
        if self.fail_cleanup {
            return Err(BotError::Internal(format!("{} left a mess", self.name)));
        }
        Ok(())
    }
}

/// Register a fixture under its own name
pub fn with_fixture(catalog: PluginCatalog, fixture: &Fixture) -> PluginCatalog {
    let name = fixture.name.clone();
    let fixture = fixture.clone();
    catalog.register(&name, move || fixture.clone())
}

pub fn config_with_disabled(disabled: &[&str]) -> Config {
    let mut config = Config::default();
    config.plugins.disabled = disabled.iter().map(|d| d.to_string()).collect();
    config
}

pub fn manager_with(catalog: PluginCatalog, gateway: Arc<dyn EventGateway>, config: Config) -> Arc<PluginManager> {
    PluginManager::new(catalog, gateway, Arc::new(MemoryStore::new()), Arc::new(config))
}

/// Store whose every call fails
pub struct OfflineStore;

fn offline() -> StorageError {
    StorageError::Io(std::io::Error::new(std::io::ErrorKind::NotConnected, "store offline"))
}

#[async_trait]
impl Store for OfflineStore {
    async fn get_setting(&self, _plugin: &str, _key: &str, _user_id: i64) -> Result<Option<String>, StorageError> {
        Err(offline())
    }

    async fn set_setting(&self, _plugin: &str, _key: &str, _value: &str, _user_id: i64) -> Result<(), StorageError> {
        Err(offline())
    }

    async fn record_activity(&self, _user: &User, _messages: u64, _commands: u64) -> Result<(), StorageError> {
        Err(offline())
    }

    async fn user_stats(&self, _user_id: i64) -> Result<Option<UserStats>, StorageError> {
        Err(offline())
    }

    async fn approval(&self, _user_id: i64) -> Result<Option<ApprovalRecord>, StorageError> {
        Err(offline())
    }

    async fn touch_approval(&self, _user: &User) -> Result<(), StorageError> {
        Err(offline())
    }

    async fn approve(&self, _user_id: i64, _approved_by: i64) -> Result<(), StorageError> {
        Err(offline())
    }

    async fn disapprove(&self, _user_id: i64) -> Result<(), StorageError> {
        Err(offline())
    }

    async fn add_warning(&self, _user_id: i64) -> Result<u32, StorageError> {
        Err(offline())
    }

    async fn add_log(&self, _level: LogLevel, _message: &str, _user_id: Option<i64>, _chat_id: Option<i64>) -> Result<(), StorageError> {
        Err(offline())
    }

    async fn recent_logs(&self, _limit: usize) -> Result<Vec<LogEntry>, StorageError> {
        Err(offline())
    }
}

/// The logged-in console account
pub const ME: i64 = 1;

/// Built-in plugins running on a console gateway and an in-memory store
pub struct Harness {
    pub gateway: Arc<ConsoleGateway>,
    pub store: Arc<MemoryStore>,
    pub manager: Arc<PluginManager>,
}

impl Harness {
    pub async fn start(config: Config) -> Self {
        ensure_init();
        let gateway = Arc::new(ConsoleGateway::new(User::new(ME).with_username("me")).quiet());
        let store = Arc::new(MemoryStore::new());
        let manager = PluginManager::new(builtin::catalog(), gateway.clone(), store.clone(), Arc::new(config));
        let report = manager.load_all().await;
        assert!(report.failures.is_empty(), "load_all failed: {:?}", report.failures);
        Self { gateway, store, manager }
    }

    /// Type a line as the logged-in account, or `@<id> text` as someone else
    pub async fn send(&self, line: &str) -> usize {
        let event = self.gateway.event_from_line(line).expect("line must produce an event");
        self.gateway.dispatch(event).await
    }

    pub fn last_text(&self) -> Option<String> {
        self.gateway.texts().last().cloned()
    }
}
