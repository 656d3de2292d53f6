use anyhow::{anyhow, Result};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::models::{Document, RateQuote, RemarkDefault, Settings};
use crate::services::exchange_rate::{self, RateSource, RefreshError, RefreshStart};
use crate::services::persistence;
use crate::services::reducer::{apply, Command, FieldUpdate, ReducerPolicy};
use crate::services::summary::StatementSummary;
use crate::utils::{now_unix, today};

pub const DATABASE_FILE: &str = "statement.sqlite";

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Another refresh was still running.
    Ignored,
    RateLimited { next_update: i64 },
    Updated(RateQuote),
    Failed(String),
}

/// Owns the one live statement document. Every change goes through
/// [`AppState::dispatch`], which applies the reducer and persists the result.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub settings: Arc<Mutex<Settings>>,
    document: Arc<Mutex<Document>>,
    status_generation: Arc<AtomicU64>,
}

impl AppState {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let db = Database::new(data_dir.join(DATABASE_FILE))?;
        let settings = load_settings(&db);
        Ok(AppState::new(db, settings))
    }

    pub fn new(db: Database, settings: Settings) -> Self {
        let policy = ReducerPolicy::from(&settings);
        let loaded = persistence::load(&db, &settings.storage_key, policy.default_document(today()));

        // A snapshot taken mid-refresh must not block the next one.
        let document = [
            Command::SetField(FieldUpdate::IsLoading(false)),
            Command::SetField(FieldUpdate::ShowModal(false)),
            Command::ClearStatus,
        ]
        .into_iter()
        .fold(loaded, |doc, cmd| apply(&doc, cmd, &policy));
        persistence::save(&db, &settings.storage_key, &document);

        AppState {
            db: Arc::new(Mutex::new(db)),
            settings: Arc::new(Mutex::new(settings)),
            document: Arc::new(Mutex::new(document)),
            status_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn document(&self) -> Result<Document> {
        Ok(self.document.lock().map_err(|_| anyhow!("Document lock"))?.clone())
    }

    pub fn summary(&self) -> Result<StatementSummary> {
        let document = self.document.lock().map_err(|_| anyhow!("Document lock"))?;
        Ok(StatementSummary::build(&document))
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.settings.lock().map_err(|_| anyhow!("Settings lock"))?.clone())
    }

    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        {
            let db = self.db.lock().map_err(|_| anyhow!("DB lock"))?;
            store_settings(&db, &settings)?;
        }
        let mut locked = self.settings.lock().map_err(|_| anyhow!("Settings lock"))?;
        *locked = settings;
        Ok(())
    }

    pub fn dispatch(&self, command: Command) -> Result<Document> {
        self.dispatch_all(vec![command])
    }

    /// Applies `commands` as one unit: no intermediate document is stored
    /// or observable.
    pub fn dispatch_all(&self, commands: Vec<Command>) -> Result<Document> {
        let (document, ()) = self.transact(|_| (commands, ()))?;
        Ok(document)
    }

    /// Runs `plan` against the current document and applies the commands it
    /// returns, all under the document lock.
    fn transact<T, F>(&self, plan: F) -> Result<(Document, T)>
    where
        F: FnOnce(&Document) -> (Vec<Command>, T),
    {
        let settings = self.settings()?;
        let policy = ReducerPolicy::from(&settings);

        let mut current = self.document.lock().map_err(|_| anyhow!("Document lock"))?;
        let (commands, value) = plan(&current);
        if commands.is_empty() {
            return Ok((current.clone(), value));
        }

        let clearing = commands
            .iter()
            .any(|c| matches!(c, Command::ClearDocument { .. }));
        let next = commands.into_iter().fold(current.clone(), |doc, cmd| {
            debug!(command = cmd.name(), "Applying statement command");
            apply(&doc, cmd, &policy)
        });
        *current = next.clone();

        let db = self.db.lock().map_err(|_| anyhow!("DB lock"))?;
        if clearing {
            persistence::remove(&*db, &settings.storage_key);
        }
        persistence::save(&*db, &settings.storage_key, &next);

        Ok((next, value))
    }

    pub async fn refresh_exchange_rate<S: RateSource>(&self, source: &S) -> Result<RefreshOutcome> {
        let settings = self.settings()?;
        let (_, (start, generation)) = self.transact(|doc| {
            let start = exchange_rate::begin(doc, now_unix());
            let (commands, generation) = match &start {
                RefreshStart::AlreadyRunning => (Vec::new(), None),
                RefreshStart::RateLimited { commands, .. } => {
                    (commands.clone(), Some(self.next_status_generation()))
                }
                RefreshStart::Fetch { commands } => (commands.clone(), None),
            };
            (commands, (start, generation))
        })?;

        match start {
            RefreshStart::AlreadyRunning => {
                debug!("Exchange-rate refresh already running");
                return Ok(RefreshOutcome::Ignored);
            }
            RefreshStart::RateLimited { next_update, .. } => {
                info!(next_update, "Exchange rate still valid, skipping request");
                if let Some(generation) = generation {
                    self.schedule_status_clear(generation, &settings);
                }
                return Ok(RefreshOutcome::RateLimited { next_update });
            }
            RefreshStart::Fetch { .. } => {}
        }

        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let result = match tokio::time::timeout(timeout, source.fetch_quote()).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Timeout),
        };

        match &result {
            Ok(quote) => info!(rate = quote.rate, next_update = quote.next_update, "Exchange rate updated"),
            Err(err) => warn!(error = %err, url = %settings.rate_api_url, "Exchange-rate refresh failed"),
        }

        let (_, generation) =
            self.transact(|_| (exchange_rate::resolve(&result), self.next_status_generation()))?;
        self.schedule_status_clear(generation, &settings);

        Ok(match result {
            Ok(quote) => RefreshOutcome::Updated(quote),
            Err(err) => RefreshOutcome::Failed(err.user_message().to_string()),
        })
    }

    /// Claims the generation for a status about to be written. Call it only
    /// inside the `transact` that writes the status, so no timer can observe
    /// the new status under the old generation.
    fn next_status_generation(&self) -> u64 {
        self.status_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Clears the refresh status after the display period, unless a newer
    /// status replaced it in the meantime.
    fn schedule_status_clear(&self, generation: u64, settings: &Settings) {
        let delay = Duration::from_secs(settings.status_display_secs);
        let state = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = state.transact(|_| {
                if state.status_generation.load(Ordering::SeqCst) == generation {
                    (vec![Command::ClearStatus], ())
                } else {
                    (Vec::new(), ())
                }
            });
            if let Err(err) = result {
                warn!(error = %err, "Failed to clear refresh status");
            }
        });
    }
}

fn setting<T: FromStr>(db: &Database, key: &str) -> Option<T> {
    db.get_setting(key).ok().flatten().and_then(|v| v.trim().parse().ok())
}

pub fn load_settings(db: &Database) -> Settings {
    let defaults = Settings::default();
    let rate_api_key = db
        .get_setting("rate_api_key")
        .ok()
        .flatten()
        .filter(|k| !k.trim().is_empty())
        .or(defaults.rate_api_key);
    let remark_default = db
        .get_setting("remark_default")
        .ok()
        .flatten()
        .and_then(|v| RemarkDefault::parse(&v))
        .unwrap_or(defaults.remark_default);

    Settings {
        storage_key: setting(db, "storage_key").unwrap_or(defaults.storage_key),
        rate_api_url: setting(db, "rate_api_url").unwrap_or(defaults.rate_api_url),
        rate_api_key,
        local_currency: setting(db, "local_currency").unwrap_or(defaults.local_currency),
        foreign_currency: setting(db, "foreign_currency").unwrap_or(defaults.foreign_currency),
        request_timeout_secs: setting(db, "request_timeout_secs")
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(defaults.request_timeout_secs),
        status_display_secs: setting(db, "status_display_secs").unwrap_or(defaults.status_display_secs),
        preserve_date_on_clear: setting(db, "preserve_date_on_clear")
            .unwrap_or(defaults.preserve_date_on_clear),
        remark_default,
    }
}

pub fn store_settings(db: &Database, settings: &Settings) -> rusqlite::Result<()> {
    db.set_setting("storage_key", &settings.storage_key)?;
    db.set_setting("rate_api_url", &settings.rate_api_url)?;
    match settings.rate_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(api_key) => db.set_setting("rate_api_key", api_key)?,
        None => db.delete_setting("rate_api_key")?,
    }
    db.set_setting("local_currency", &settings.local_currency)?;
    db.set_setting("foreign_currency", &settings.foreign_currency)?;
    db.set_setting("request_timeout_secs", &settings.request_timeout_secs.to_string())?;
    db.set_setting("status_display_secs", &settings.status_display_secs.to_string())?;
    db.set_setting("preserve_date_on_clear", &settings.preserve_date_on_clear.to_string())?;
    db.set_setting("remark_default", settings.remark_default.as_str())?;
    Ok(())
}
