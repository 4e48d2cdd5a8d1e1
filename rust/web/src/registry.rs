use crate::game::GameHandle;
use crate::session::SessionError;
use chrono::Utc;
use fourinrow_engine::game::GameId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Live and recently finished games, indexed by id and by human seat name.
#[derive(Debug, Default)]
pub struct GameRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    games: HashMap<GameId, Arc<GameHandle>>,
    by_name: HashMap<String, GameId>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handle: Arc<GameHandle>) -> Result<(), SessionError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?;
        let id = handle.id().to_string();
        for name in handle.human_names() {
            inner.by_name.insert(name.clone(), id.clone());
        }
        inner.games.insert(id.clone(), handle);
        tracing::debug!(game_id = %id, games = inner.games.len(), "game registered");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<GameHandle>, SessionError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| SessionError::StoragePoisoned)?;
        inner
            .games
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::GameNotFound(id.to_string()))
    }

    /// The active game seating a human called `name`, if any.
    pub fn find_active_by_participant(&self, name: &str) -> Option<Arc<GameHandle>> {
        let handle = {
            let inner = self.inner.read().ok()?;
            let id = inner.by_name.get(name)?;
            inner.games.get(id).cloned()
        };
        handle.filter(|handle| handle.is_active())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.games.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_games(&self) -> Vec<GameId> {
        let handles: Vec<Arc<GameHandle>> = match self.inner.read() {
            Ok(inner) => inner.games.values().cloned().collect(),
            Err(_) => return Vec::new(),
        };
        handles
            .into_iter()
            .filter(|handle| handle.is_active())
            .map(|handle| handle.id().to_string())
            .collect()
    }

    /// Drops games that finished more than `retention` ago. Returns how many
    /// were removed.
    pub fn prune_finished(&self, retention: Duration) -> Result<usize, SessionError> {
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now().checked_sub_signed(retention);

        let mut inner = self
            .inner
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?;
        let expired: Vec<GameId> = inner
            .games
            .iter()
            .filter(|(_, handle)| match (handle.finished_at(), cutoff) {
                (Some(finished), Some(cutoff)) => finished <= cutoff,
                _ => false,
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(handle) = inner.games.remove(id) {
                handle.release();
            }
        }
        inner.by_name.retain(|_, id| !expired.contains(id));

        if !expired.is_empty() {
            tracing::info!(
                removed = expired.len(),
                remaining = inner.games.len(),
                "pruned finished games"
            );
        }
        Ok(expired.len())
    }
}
