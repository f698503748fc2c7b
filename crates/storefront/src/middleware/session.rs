//! Session middleware configuration.
//!
//! The session cookie carries nothing but the shopper's [`CartKey`]; the cart
//! itself lives in the ledger store. Session records are kept in a bounded
//! `moka` cache with the same idle expiry and capacity as carts.

use async_trait::async_trait;
use moka::future::Cache;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use medpro_core::CartKey;

use crate::config::{CartConfig, StorefrontConfig};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "medpro_session";

/// Session keys.
pub mod keys {
    /// The shopper's cart key.
    pub const CART_KEY: &str = "cart_key";
}

/// A [`SessionStore`] over a bounded, idle-expiring cache.
///
/// Idle records are evicted by the cache itself; records past their cookie
/// expiry are dropped when next loaded.
#[derive(Clone)]
pub struct CacheSessionStore {
    sessions: Cache<Id, Record>,
}

impl std::fmt::Debug for CacheSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSessionStore")
            .field("entries", &self.sessions.entry_count())
            .finish()
    }
}

impl CacheSessionStore {
    #[must_use]
    pub fn new(config: &CartConfig) -> Self {
        let sessions = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_idle(config.idle_ttl)
            .build();
        Self { sessions }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }
}

#[async_trait]
impl SessionStore for CacheSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.sessions.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.sessions.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.sessions.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        match self.sessions.get(id).await {
            Some(record) if record.expiry_date <= OffsetDateTime::now_utc() => {
                self.sessions.invalidate(id).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.sessions.invalidate(id).await;
        Ok(())
    }
}

/// Create the session layer over a [`CacheSessionStore`].
///
/// Sessions expire after the same idle period as carts.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<CacheSessionStore> {
    let is_secure = config.base_url.starts_with("https://");
    let idle_secs = i64::try_from(config.cart.idle_ttl.as_secs()).unwrap_or(i64::MAX);

    SessionManagerLayer::new(CacheSessionStore::new(&config.cart))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(idle_secs),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// The cart key in this session, if one was ever assigned.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn existing_cart_key(
    session: &Session,
) -> Result<Option<CartKey>, tower_sessions::session::Error> {
    session.get::<CartKey>(keys::CART_KEY).await
}

/// The cart key in this session, assigning a fresh one on first use.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn current_cart_key(session: &Session) -> Result<CartKey, tower_sessions::session::Error> {
    if let Some(key) = existing_cart_key(session).await? {
        return Ok(key);
    }

    let key = CartKey::generate();
    session.insert(keys::CART_KEY, key).await?;
    tracing::debug!(cart_key = %key, "Assigned new cart");
    Ok(key)
}
