use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::db::{self, Pool};
use crate::error::Result;

/// Tokens are treated as expired this many seconds before the literal
/// deadline, so a set that passes the check here is still alive by the time
/// the request reaches the server.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: i64,
}

impl TokenSet {
    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.access_token.is_empty() && now < self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// Sole owner of persisted authentication state. The cached set is swapped
/// as a whole under a write lock, so readers never observe an old access
/// token paired with a new expiry. The refresh gate serializes refreshes
/// across concurrent callers (see `Gateway`).
pub struct TokenStore {
    pool: Pool,
    current: RwLock<Option<TokenSet>>,
    refresh_gate: Mutex<()>,
}

impl TokenStore {
    /// Loads the persisted set, if any, into the in-memory cache.
    pub async fn load(pool: Pool) -> Result<Self> {
        let persisted = db::get_tokens(&pool).await?;
        Ok(Self {
            pool,
            current: RwLock::new(persisted),
            refresh_gate: Mutex::new(()),
        })
    }

    pub async fn get(&self) -> Option<TokenSet> {
        self.current.read().await.clone()
    }

    /// Persists and installs a new set atomically with respect to readers.
    pub async fn replace(&self, set: TokenSet) -> Result<()> {
        let mut current = self.current.write().await;
        db::set_tokens(&self.pool, &set).await?;
        *current = Some(set);
        Ok(())
    }

    pub fn is_valid(set: &TokenSet, now: i64) -> bool {
        set.is_valid_at(now)
    }

    pub async fn is_authenticated(&self) -> bool {
        match self.get().await {
            Some(set) => set.is_valid_at(Utc::now().timestamp()),
            None => false,
        }
    }

    /// Discards the set wholesale. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        let mut current = self.current.write().await;
        db::delete_tokens(&self.pool).await?;
        *current = None;
        Ok(())
    }

    pub fn refresh_gate(&self) -> &Mutex<()> {
        &self.refresh_gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(access: &str, refresh: Option<&str>, expires_at: i64) -> TokenSet {
        TokenSet {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at,
        }
    }

    async fn store_in(dir: &TempDir) -> TokenStore {
        let pool = db::init_db(&dir.path().join("tokens.sqlite")).await.unwrap();
        TokenStore::load(pool).await.unwrap()
    }

    #[test]
    fn validity_respects_expiry_margin() {
        let t0 = 1_700_000_000;
        let tokens = set("T1", Some("R1"), t0 + 3600);

        assert!(tokens.is_valid_at(t0));
        assert!(tokens.is_valid_at(t0 + 3600 - EXPIRY_MARGIN_SECS - 1));
        assert!(!tokens.is_valid_at(t0 + 3600 - EXPIRY_MARGIN_SECS));
        assert!(!tokens.is_valid_at(t0 + 3600));
    }

    #[test]
    fn empty_access_token_is_never_valid() {
        let tokens = set("", Some("R1"), i64::MAX);
        assert!(!tokens.is_valid_at(0));
    }

    #[tokio::test]
    async fn replace_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        assert!(store.get().await.is_none());

        let tokens = set("T1", Some("R1"), 1_700_000_000);
        store.replace(tokens.clone()).await.unwrap();
        assert_eq!(store.get().await, Some(tokens));
    }

    #[tokio::test]
    async fn persisted_set_survives_reload() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("tokens.sqlite");

        let tokens = set("T1", None, 1_700_000_000);
        {
            let pool = db::init_db(&db_path).await.unwrap();
            let store = TokenStore::load(pool).await.unwrap();
            store.replace(tokens.clone()).await.unwrap();
        }

        let pool = db::init_db(&db_path).await.unwrap();
        let store = TokenStore::load(pool).await.unwrap();
        assert_eq!(store.get().await, Some(tokens));
    }

    #[tokio::test]
    async fn clear_discards_everything_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).await;

        store
            .replace(set("T1", Some("R1"), i64::MAX - 100))
            .await
            .unwrap();
        assert!(store.is_authenticated().await);

        store.clear().await.unwrap();
        assert!(store.get().await.is_none());
        assert!(!store.is_authenticated().await);

        store.clear().await.unwrap();
        assert!(store.get().await.is_none());
    }
}
