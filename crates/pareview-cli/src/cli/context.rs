//! Shared state for one command invocation.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use pareview_core::api::LOGIN_ROUTE;
use pareview_core::cache::CacheManager;
use pareview_core::models::Instrument;
use pareview_core::{ApiClient, AuthEvent, Config, Session};
use tokio::sync::mpsc;
use tracing::warn;

/// Capacity of the auth event channel. One forced logout per command is the
/// most that can happen.
const AUTH_EVENT_BUFFER: usize = 4;

pub struct AppContext {
    pub config: Config,
    pub client: ApiClient,
    pub cache: CacheManager,
    pub offline: bool,
    pub json: bool,
    auth_events: Mutex<mpsc::Receiver<AuthEvent>>,
}

impl AppContext {
    pub fn new(offline: bool, json: bool) -> Result<Self> {
        let config = Config::load().context("load config")?;
        let data_dir = config.data_dir()?;

        let session = match Session::restore(data_dir.clone()) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Saved session unreadable, starting logged out");
                Session::new(data_dir.clone())
            }
        };

        let (tx, rx) = mpsc::channel(AUTH_EVENT_BUFFER);
        let client = ApiClient::new(&config.base_url()?, Arc::new(session))?.with_auth_events(tx);
        let cache = CacheManager::new(data_dir.join("cache"))?;

        Ok(Self {
            config,
            client,
            cache,
            offline,
            json,
            auth_events: Mutex::new(rx),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    /// Fail early for commands that need a logged-in backend session.
    pub fn require_login(&self) -> Result<()> {
        if self.offline {
            anyhow::bail!("This command needs the backend; drop --offline");
        }
        if !self.session().is_authenticated() {
            anyhow::bail!("Not logged in. Run `pareview login` first.");
        }
        Ok(())
    }

    /// Tell the user when the client dropped the session mid-command, and
    /// discard cached data that belonged to it.
    pub fn report_auth_events(&self) {
        let mut rx = self.auth_events.lock().unwrap_or_else(|e| e.into_inner());
        let mut forced = false;
        while let Ok(AuthEvent::LoginRequired { reason }) = rx.try_recv() {
            warn!(reason = %reason, route = LOGIN_ROUTE, "Forced logout");
            forced = true;
        }
        if forced {
            if let Err(e) = self.cache.clear() {
                warn!(error = %e, "Failed to clear cache after forced logout");
            }
            eprintln!("Session expired. Please log in again with `pareview login`.");
        }
    }

    /// Instruments from the backend (refreshing the cache) or, offline, from
    /// the cache.
    pub async fn instruments(&self) -> Result<Vec<Instrument>> {
        if self.offline {
            return self.cached(self.cache.load_instruments(), "instruments");
        }
        self.require_login()?;
        let instruments = self.client.list_instruments().await?;
        self.store(self.cache.save_instruments(&instruments), "instruments");
        Ok(instruments)
    }

    /// Resolve a command-line instrument reference: a numeric ID, or a
    /// symbol matched case-insensitively.
    pub async fn resolve_instrument(&self, reference: &str) -> Result<i64> {
        if let Ok(id) = reference.trim().parse::<i64>() {
            return Ok(id);
        }
        let instruments = self.instruments().await?;
        find_by_symbol(&instruments, reference)
            .map(|i| i.id)
            .with_context(|| format!("No instrument with symbol {}", reference))
    }

    pub async fn resolve_instruments(&self, references: &[String]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(references.len());
        for reference in references {
            ids.push(self.resolve_instrument(reference).await?);
        }
        Ok(ids)
    }

    /// Unwrap a cache read for offline mode.
    pub fn cached<T>(&self, loaded: Result<Option<pareview_core::cache::CachedData<T>>>, what: &str) -> Result<T> {
        let cached = loaded?.with_context(|| format!("No cached {}; run once without --offline", what))?;
        if cached.is_stale() {
            eprintln!("Showing cached {} from {}", what, cached.age_display());
        }
        Ok(cached.data)
    }

    /// Cache writes never fail a command.
    pub fn store(&self, result: Result<()>, what: &str) {
        if let Err(e) = result {
            warn!(cache = what, error = %e, "Failed to update cache");
        }
    }
}

pub fn find_by_symbol<'a>(instruments: &'a [Instrument], symbol: &str) -> Option<&'a Instrument> {
    let wanted = symbol.trim();
    instruments.iter().find(|i| i.symbol.eq_ignore_ascii_case(wanted))
}
