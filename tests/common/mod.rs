#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::task::JoinHandle;

use battle_stats_api::config::{AppConfig, PartialFailurePolicy};
use battle_stats_api::database::models::{Battle, BattleField, GroupCount, SizeRange, User};
use battle_stats_api::database::{BattleStore, DatabaseError, MemoryBattleStore};
use battle_stats_api::filter::FilterData;
use battle_stats_api::state::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const USER: &str = "tywin";

/// Seven battles in the shape of the public dataset export; unknown sizes
/// are empty strings there.
pub const BATTLES_JSON: &str = r#"[
  {"name": "Battle of the Golden Tooth", "year": 298, "battle_number": 1,
   "attacker_king": "Joffrey", "defender_king": "Robb Stark", "attacker_outcome": "win",
   "battle_type": "pitched battle", "major_death": 1, "major_capture": 0,
   "attacker_size": 15000, "defender_size": 4000, "attacker_commander": "Jaime Lannister",
   "defender_commander": "Clement Piper, Vance", "summer": 1,
   "location": "Golden Tooth", "region": "The Westerlands", "note": ""},
  {"name": "Battle at the Mummer's Ford", "year": 298, "battle_number": 2,
   "attacker_king": "Joffrey", "defender_king": "Robb Stark", "attacker_outcome": "win",
   "battle_type": "ambush", "attacker_size": "", "defender_size": 120,
   "location": "Mummer's Ford", "region": "The Riverlands"},
  {"name": "Battle of Riverrun", "year": 298, "battle_number": 3,
   "attacker_king": "Joffrey", "defender_king": "Robb Stark", "attacker_outcome": "win",
   "battle_type": "pitched battle", "attacker_size": 15000, "defender_size": 10000,
   "location": "Riverrun", "region": "The Riverlands"},
  {"name": "Battle of the Green Fork", "year": 298, "battle_number": 4,
   "attacker_king": "Robb Stark", "defender_king": "Joffrey", "attacker_outcome": "loss",
   "battle_type": "pitched battle", "attacker_size": 18000, "defender_size": 20000,
   "location": "Green Fork", "region": "The Riverlands"},
  {"name": "Siege of Storm's End", "year": 299, "battle_number": 5,
   "attacker_king": "Stannis Baratheon", "defender_king": "Renly Baratheon", "attacker_outcome": "win",
   "battle_type": "siege", "attacker_size": 5000, "defender_size": "",
   "location": "Storm's End", "region": "The Stormlands"},
  {"name": "Battle of the Whispering Wood", "year": 298, "battle_number": 6,
   "attacker_king": "Robb Stark", "defender_king": "Joffrey", "attacker_outcome": "win",
   "battle_type": "ambush", "attacker_size": 1875, "defender_size": 6000,
   "location": "Whispering Wood", "region": "The Riverlands"},
  {"name": "Sack of Winterfell", "year": 299, "battle_number": 7,
   "attacker_king": "Joffrey", "defender_king": "Robb Stark", "attacker_outcome": "win",
   "battle_type": "", "defender_size": null,
   "location": "Winterfell", "region": "The North"}
]"#;

pub fn fixture_battles() -> Vec<Battle> {
    serde_json::from_str(BATTLES_JSON).expect("fixture parses")
}

pub fn fixture_store() -> MemoryBattleStore {
    MemoryBattleStore::from_json(BATTLES_JSON, vec![User::new(USER)]).expect("fixture parses")
}

pub fn test_config(policy: PartialFailurePolicy) -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = SECRET.to_string();
    config.api.enable_request_logging = false;
    config.stats.partial_failure = policy;
    config
}

pub fn test_state(store: Arc<dyn BattleStore>, policy: PartialFailurePolicy) -> AppState {
    AppState::new(store, test_config(policy)).expect("state builds")
}

/// The real router served in-process on a free port. Aborted on drop.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(store: Arc<dyn BattleStore>, policy: PartialFailurePolicy) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        let app = battle_stats_api::app(test_state(store, policy));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            handle,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    pub async fn with_fixture() -> Result<Self> {
        Self::start(Arc::new(fixture_store()), PartialFailurePolicy::Reject).await
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Requests a token for [`USER`] through the public endpoint.
    pub async fn token(&self) -> Result<String> {
        let body: serde_json::Value = self
            .client
            .post(self.url("/api/generate-token"))
            .json(&serde_json::json!({ "uname": USER }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("no token in response")
    }

    /// GET with a freshly issued token.
    pub async fn get_authed(&self, path: &str) -> Result<reqwest::Response> {
        let token = self.token().await?;
        Ok(self
            .client
            .get(self.url(path))
            .header("x-access-token", token)
            .send()
            .await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Wraps a store and fails every call touching one of the named columns.
pub struct FailingStore {
    inner: MemoryBattleStore,
    failing: HashSet<&'static str>,
}

impl FailingStore {
    pub fn new(inner: MemoryBattleStore, failing: &[&'static str]) -> Self {
        Self {
            inner,
            failing: failing.iter().copied().collect(),
        }
    }

    fn check(&self, field: BattleField) -> Result<(), DatabaseError> {
        if self.failing.contains(field.column()) {
            return Err(DatabaseError::QueryError(format!(
                "simulated failure on column \"{}\"",
                field.column()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BattleStore for FailingStore {
    async fn find_user_by_name(&self, uname: &str) -> Result<Option<User>, DatabaseError> {
        if self.failing.contains("users") {
            return Err(DatabaseError::QueryError("simulated failure on users".to_string()));
        }
        self.inner.find_user_by_name(uname).await
    }

    async fn count(&self, filter: FilterData) -> Result<i64, DatabaseError> {
        if self.failing.contains("battles") {
            return Err(DatabaseError::QueryError("simulated failure on battles".to_string()));
        }
        self.inner.count(filter).await
    }

    async fn select(&self, filter: FilterData) -> Result<Vec<Battle>, DatabaseError> {
        if self.failing.contains("battles") {
            return Err(DatabaseError::QueryError("simulated failure on battles".to_string()));
        }
        self.inner.select(filter).await
    }

    async fn distinct(&self, field: BattleField, filter: FilterData) -> Result<Vec<String>, DatabaseError> {
        self.check(field)?;
        self.inner.distinct(field, filter).await
    }

    async fn group_count(&self, field: BattleField, limit: Option<i32>) -> Result<Vec<GroupCount>, DatabaseError> {
        self.check(field)?;
        self.inner.group_count(field, limit).await
    }

    async fn size_range(&self, field: BattleField) -> Result<Option<SizeRange>, DatabaseError> {
        self.check(field)?;
        self.inner.size_range(field).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }
}

/// Counts user lookups, to prove which requests reach the store.
pub struct CountingStore {
    inner: MemoryBattleStore,
    pub user_lookups: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryBattleStore) -> Self {
        Self {
            inner,
            user_lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BattleStore for CountingStore {
    async fn find_user_by_name(&self, uname: &str) -> Result<Option<User>, DatabaseError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_user_by_name(uname).await
    }

    async fn count(&self, filter: FilterData) -> Result<i64, DatabaseError> {
        self.inner.count(filter).await
    }

    async fn select(&self, filter: FilterData) -> Result<Vec<Battle>, DatabaseError> {
        self.inner.select(filter).await
    }

    async fn distinct(&self, field: BattleField, filter: FilterData) -> Result<Vec<String>, DatabaseError> {
        self.inner.distinct(field, filter).await
    }

    async fn group_count(&self, field: BattleField, limit: Option<i32>) -> Result<Vec<GroupCount>, DatabaseError> {
        self.inner.group_count(field, limit).await
    }

    async fn size_range(&self, field: BattleField) -> Result<Option<SizeRange>, DatabaseError> {
        self.inner.size_range(field).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }
}
