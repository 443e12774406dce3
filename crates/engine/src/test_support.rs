// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted adapter, recording notifier,
//! canned token provider, and an engine builder over a temp data dir.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::adapter::{SearchError, SiteAdapter};
use crate::config::{HttpConfig, ParserDefaults, PoolConfig, TokenConfig};
use crate::engine::poll::PollContext;
use crate::engine::pool::WorkerPool;
use crate::engine::Supervisor;
use crate::model::{epoch_ms, Item};
use crate::notify::Notifier;
use crate::settings::UserSettings;
use crate::store::allowlist::AllowList;
use crate::store::backup::BackupManager;
use crate::store::history::HistoryStore;
use crate::store::items::ItemStore;
use crate::store::settings::SettingsStore;
use crate::store::DataLayout;
use crate::token::manager::TokenManager;
use crate::token::provider::TokenProvider;
use crate::token::parse_cookie_str;

/// Build a test item published `age_min` minutes ago.
pub fn aged_item(id: &str, age_min: u64) -> Item {
    Item {
        id: id.to_owned(),
        title: format!("item {id}"),
        price: 100.0,
        url: format!("https://www.goofish.com/item?id={id}"),
        location: "Hangzhou".to_owned(),
        publish_time: Some(epoch_ms().saturating_sub(age_min * 60_000)),
        images: Vec::new(),
        seller: "seller".to_owned(),
        category: String::new(),
        query: String::new(),
        site: "goofish".to_owned(),
    }
}

/// Scripted adapter: pops one canned response per `search` call.
///
/// An exhausted script answers with [`SearchError::EmptyPage`].
pub struct MockAdapter {
    script: parking_lot::Mutex<VecDeque<Result<Vec<Item>, SearchError>>>,
    pub calls: AtomicU64,
    pub last_seed: parking_lot::Mutex<Option<String>>,
    delay: Duration,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            script: parking_lot::Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
            last_seed: parking_lot::Mutex::new(None),
            delay: Duration::ZERO,
        }
    }

    pub fn enqueue(&self, response: Result<Vec<Item>, SearchError>) {
        self.script.lock().push_back(response);
    }

    pub fn enqueue_items(&self, items: Vec<Item>) {
        self.enqueue(Ok(items));
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SiteAdapter for MockAdapter {
    fn search<'a>(
        &'a self,
        query: &'a str,
        _page: u64,
        _rows: u64,
        token: &'a crate::token::SessionToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, SearchError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_seed.lock() = Some(token.token_seed.clone());
            match self.script.lock().pop_front() {
                Some(Ok(mut items)) => {
                    for item in &mut items {
                        item.query = query.to_owned();
                    }
                    Ok(items)
                }
                Some(Err(err)) => Err(err),
                None => Err(SearchError::EmptyPage),
            }
        })
    }

    fn request_delay(&self) -> Duration {
        self.delay
    }

    fn site(&self) -> &str {
        "mock"
    }
}

/// One recorded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { user_id: u64, text: String },
    Photo { user_id: u64, photo_url: String, caption: String },
    Admin { text: String },
}

/// Notifier that records every delivery; can be switched to failing.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: parking_lot::Mutex<Vec<Sent>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    /// Item deliveries (text + photo) to one user, in send order.
    pub fn deliveries_for(&self, user_id: u64) -> Vec<Sent> {
        self.sent
            .lock()
            .iter()
            .filter(|sent| match sent {
                Sent::Text { user_id: uid, .. } | Sent::Photo { user_id: uid, .. } => {
                    *uid == user_id
                }
                Sent::Admin { .. } => false,
            })
            .cloned()
            .collect()
    }

    /// Captions of item deliveries to one user, excluding the final
    /// loop-exit summary, in send order.
    pub fn item_captions_for(&self, user_id: u64) -> Vec<String> {
        self.deliveries_for(user_id)
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text { text, .. } if !text.starts_with("Polling stopped") => Some(text),
                Sent::Photo { caption, .. } => Some(caption),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("chat upstream unavailable");
        }
        self.sent.lock().push(sent);
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn send_text(
        &self,
        user_id: u64,
        text: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { self.record(Sent::Text { user_id, text }) })
    }

    fn send_photo(
        &self,
        user_id: u64,
        photo_url: String,
        caption: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { self.record(Sent::Photo { user_id, photo_url, caption }) })
    }

    fn send_admin(
        &self,
        text: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { self.record(Sent::Admin { text }) })
    }
}

/// Provider handing out numbered seeds, counting invocations.
#[derive(Default)]
pub struct SeedProvider {
    pub calls: AtomicU32,
}

impl TokenProvider for SeedProvider {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<BTreeMap<String, String>>> + Send + '_>>
    {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(parse_cookie_str(&format!("_m_h5_tk=fresh{n}_1700000000000; cna=test")))
        })
    }
}

/// Fully wired engine over a temp data dir with mock collaborators.
pub struct TestEngine {
    pub supervisor: Arc<Supervisor>,
    pub adapter: Arc<MockAdapter>,
    pub notifier: Arc<RecordingNotifier>,
    pub tokens: Arc<TokenManager>,
    pub provider_calls: Arc<SeedProvider>,
    pub allowlist: Arc<AllowList>,
    pub history: Arc<HistoryStore>,
    pub ctx: Arc<PollContext>,
}

/// Builder with test-friendly defaults: tiny intervals, throttle window
/// wide enough that one test sees a single refresh.
pub struct TestEngineBuilder {
    defaults: ParserDefaults,
    pool: PoolConfig,
    allowed: Vec<u64>,
    refresh_window: Duration,
}

impl Default for TestEngineBuilder {
    fn default() -> Self {
        Self {
            defaults: ParserDefaults {
                check_interval_s: 10,
                max_age_min: 1_440,
                max_pages: 1,
                rows_per_page: 30,
                notify_new_only: true,
            },
            pool: PoolConfig {
                core_size: 2,
                max_size: 8,
                queue_capacity: 8,
                keepalive: Duration::from_secs(60),
            },
            allowed: vec![42],
            refresh_window: Duration::from_secs(300),
        }
    }
}

impl TestEngineBuilder {
    pub fn defaults(mut self, defaults: ParserDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn allowed(mut self, users: &[u64]) -> Self {
        self.allowed = users.to_vec();
        self
    }

    pub fn refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn build(self, data_dir: &Path) -> anyhow::Result<TestEngine> {
        let layout = DataLayout::new(data_dir.to_owned());

        let allowlist = Arc::new(AllowList::load(
            layout.whitelist_file(),
            BackupManager::disabled(),
        )?);
        for user_id in &self.allowed {
            allowlist.add(*user_id)?;
        }

        let history = Arc::new(HistoryStore::new(layout.clone(), 50_000));
        let audit = Arc::new(ItemStore::new(layout.clone(), 500));
        let settings = Arc::new(SettingsStore::new(
            layout.clone(),
            self.defaults,
            BackupManager::disabled(),
        ));

        let provider = Arc::new(SeedProvider::default());
        let provider_calls = Arc::clone(&provider);
        let tokens = TokenManager::new(
            TokenConfig {
                auto_update: false,
                update_interval: Duration::from_secs(3_600),
                dynamic_enabled: true,
                min_refresh_interval: self.refresh_window,
            },
            Box::new(SharedProvider(provider)),
            layout.cookies_file(),
            "goofish",
            BackupManager::disabled(),
        );
        tokens.seed(parse_cookie_str("_m_h5_tk=seed0_1700000000000; cna=test"));

        let adapter = Arc::new(MockAdapter::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = Arc::new(PollContext {
            adapter: Arc::clone(&adapter) as Arc<dyn SiteAdapter>,
            tokens: Arc::clone(&tokens),
            history: Arc::clone(&history),
            audit,
            notifier: Arc::clone(&notifier) as Arc<dyn Notifier>,
            http: HttpConfig {
                connect_timeout: Duration::from_secs(10),
                read_timeout: Duration::from_secs(15),
                user_agent: "test".to_owned(),
                max_retries: 3,
                retry_delay: Duration::from_millis(10),
            },
            notify_delay: Duration::from_millis(1),
            shutdown: CancellationToken::new(),
        });

        let pool = WorkerPool::new(&self.pool);
        let supervisor = Supervisor::new(
            allowlist.clone(),
            settings,
            pool,
            Arc::clone(&ctx),
            Duration::from_secs(30),
        );

        Ok(TestEngine {
            supervisor,
            adapter,
            notifier,
            tokens,
            provider_calls,
            allowlist,
            history,
            ctx,
        })
    }
}

/// Adapter so a counted provider can be shared with the test body while the
/// manager owns its `Box<dyn TokenProvider>`.
struct SharedProvider(Arc<SeedProvider>);

impl TokenProvider for SharedProvider {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<BTreeMap<String, String>>> + Send + '_>>
    {
        self.0.fetch()
    }
}

/// Default settings used by loop-level tests.
pub fn test_settings() -> UserSettings {
    UserSettings {
        check_interval_s: 10,
        max_age_min: 1_440,
        max_pages: 1,
        rows_per_page: 30,
        notify_new_only: true,
    }
}
