use anyhow::{bail, Result};
use crate::config::Config;
use crate::link::PhoneLink;
use crate::session::{Authorization, LiveMatch, MatchDeps, MatchInfo, SessionConfig};
use crate::submit::{HttpSubmitter, ResultSubmitter, SubmissionOutbox};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Builds the sensors and sinks for each new match
pub type DepsFactory = Arc<dyn Fn() -> MatchDeps + Send + Sync>;

/// Builds a submitter for the signed-in user
pub type SubmitterFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn ResultSubmitter>> + Send + Sync>;

/// A match known to the control API
pub struct MatchEntry {
    pub live: LiveMatch,
    /// Created on the first submit after full time
    pub outbox: Mutex<Option<SubmissionOutbox>>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Matches by match ID
    pub matches: Arc<RwLock<HashMap<String, Arc<MatchEntry>>>>,
    pub session_config: SessionConfig,
    pub deps: DepsFactory,
    pub submitter: SubmitterFactory,
}

impl AppState {
    pub fn new(session_config: SessionConfig, deps: DepsFactory, submitter: SubmitterFactory) -> Self {
        Self {
            matches: Arc::new(RwLock::new(HashMap::new())),
            session_config,
            deps,
            submitter,
        }
    }

    /// Wire everything from the config file.
    pub fn from_config(config: Arc<Config>, link: Option<Arc<dyn PhoneLink>>) -> Self {
        let deps_config = Arc::clone(&config);
        let deps: DepsFactory = Arc::new(move || MatchDeps::from_config(&deps_config, link.clone()));

        let submit_config = Arc::clone(&config);
        let submitter: SubmitterFactory =
            Arc::new(move |user_id: &str| -> Result<Arc<dyn ResultSubmitter>> {
                let submitter = HttpSubmitter::new(&submit_config.submission, user_id)?;
                Ok(Arc::new(submitter))
            });

        Self::new(SessionConfig::from_config(&config), deps, submitter)
    }

    pub async fn get(&self, match_id: &str) -> Option<Arc<MatchEntry>> {
        self.matches.read().await.get(match_id).cloned()
    }

    /// Kick off a match and register it. Returns the new entry.
    ///
    /// The write lock is held while the match starts, so two requests for
    /// the same ID cannot both get through.
    pub async fn start_match(&self, info: MatchInfo, auth: &Authorization) -> Result<Arc<MatchEntry>> {
        let mut matches = self.matches.write().await;
        if matches.contains_key(&info.match_id) {
            bail!("Match {} is already running", info.match_id);
        }

        let live = LiveMatch::start(self.session_config.clone(), info, auth, (self.deps)()).await?;
        let entry = Arc::new(MatchEntry {
            live,
            outbox: Mutex::new(None),
        });

        matches.insert(entry.live.info().match_id.clone(), Arc::clone(&entry));
        Ok(entry)
    }
}
