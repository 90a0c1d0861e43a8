use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use vintner_core::settings::{GameMeta, Store};

use crate::traits::{PresenceClient, SleepInhibitor};

/// Process-wide resources shared by concurrent launches: the rich-presence
/// client and the display-sleep inhibitor. Reference counted so the first
/// launch acquires them and only the last one releases them.
pub struct SessionResources {
    presence: Arc<dyn PresenceClient>,
    sleep: Arc<dyn SleepInhibitor>,
    presence_enabled: bool,
    inhibit_sleep: bool,
    active: Mutex<usize>,
}

impl SessionResources {
    pub fn new(
        presence: Arc<dyn PresenceClient>,
        sleep: Arc<dyn SleepInhibitor>,
        presence_enabled: bool,
        inhibit_sleep: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            presence,
            sleep,
            presence_enabled,
            inhibit_sleep,
            active: Mutex::new(0),
        })
    }

    /// Acquires the shared resources for one running game. The returned
    /// guard releases them on drop, on every exit path.
    pub fn acquire(self: &Arc<Self>, title: &str) -> SessionGuard {
        let mut active = match self.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *active == 0 {
            if self.presence_enabled {
                self.presence.connect(title);
            }
            if self.inhibit_sleep {
                self.sleep.inhibit();
            }
        }
        *active += 1;
        SessionGuard {
            resources: Arc::clone(self),
        }
    }

    fn release(&self) {
        let mut active = match self.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        };
        *active = active.saturating_sub(1);
        if *active == 0 {
            if self.presence_enabled {
                self.presence.disconnect();
            }
            if self.inhibit_sleep {
                self.sleep.release();
            }
        }
    }
}

pub struct SessionGuard {
    resources: Arc<SessionResources>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.resources.release();
    }
}

/// Playtime accounting record for one launch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub app_name: String,
    pub title: String,
    pub store: Store,
    pub started_at: OffsetDateTime,
    pub ended_at: Option<OffsetDateTime>,
}

impl SessionRecord {
    pub fn begin(meta: &GameMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            app_name: meta.app_name.clone(),
            title: meta.title.clone(),
            store: meta.store,
            started_at: OffsetDateTime::now_utc(),
            ended_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(OffsetDateTime::now_utc());
    }

    pub fn playtime(&self) -> Option<time::Duration> {
        Some(self.ended_at? - self.started_at)
    }

    pub fn save(&self, session_dir: &Path) -> Result<()> {
        fs::create_dir_all(session_dir)
            .with_context(|| format!("create session dir {}", session_dir.display()))?;
        let path = session_dir.join(format!("{}.json", self.id));
        let contents = serde_json::to_string_pretty(self).context("render session record")?;
        fs::write(&path, contents)
            .with_context(|| format!("write session record {}", path.display()))?;
        Ok(())
    }

    /// Best-effort persistence for the end of a launch; failures only warn.
    pub fn save_or_warn(&self, session_dir: &Path) {
        if let Err(error) = self.save(session_dir) {
            warn!(target: "launcher", app = %self.app_name, "unable to store session record: {error:#}");
        }
    }
}
