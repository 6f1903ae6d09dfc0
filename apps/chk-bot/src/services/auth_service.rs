use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use chk_db::models::user::User;
use chk_db::repositories::user_repo::UserRepository;

const CACHE_TTL: Duration = Duration::from_secs(300);

/// Resolves the account behind an incoming update, caching lookups for a
/// few minutes to cut repeated reads on chatty users. Mutating operations
/// must invalidate, otherwise a stale role or balance sticks until the TTL
/// runs out.
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    cache: Arc<Mutex<HashMap<i64, (User, Instant)>>>,
}

impl AuthService {
    pub fn new(users: UserRepository) -> Self {
        Self {
            users,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get_user(&self, tg_id: i64) -> Result<Option<User>> {
        if let Some(user) = self.cached(tg_id) {
            return Ok(Some(user));
        }

        let user = self.users.get_by_tg_id(tg_id).await?;
        if let Some(ref u) = user {
            self.store(tg_id, u.clone());
            // Failure to bump the activity timestamp is not worth failing
            // the whole update over.
            if let Err(e) = self.users.touch_last_active(tg_id).await {
                tracing::warn!("Failed to touch last_active for {}: {}", tg_id, e);
            }
        }
        Ok(user)
    }

    /// /start: link (or refresh) the Telegram account and cache it.
    pub async fn link(&self, tg_id: i64, username: Option<&str>) -> Result<User> {
        let user = self.users.upsert(tg_id, username).await?;
        self.store(tg_id, user.clone());
        Ok(user)
    }

    pub fn invalidate(&self, tg_id: i64) {
        self.cache.lock().unwrap().remove(&tg_id);
    }

    fn cached(&self, tg_id: i64) -> Option<User> {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(&tg_id) {
            Some((user, stored_at)) if stored_at.elapsed() < CACHE_TTL => Some(user.clone()),
            Some(_) => {
                cache.remove(&tg_id);
                None
            }
            None => None,
        }
    }

    fn store(&self, tg_id: i64, user: User) {
        self.cache
            .lock()
            .unwrap()
            .insert(tg_id, (user, Instant::now()));
    }
}
