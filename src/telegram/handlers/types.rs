//! Handler types, dependencies, and user lookup helpers

use std::sync::Arc;

use crate::conversation::FlowStore;
use crate::core::config::Mode;
use crate::core::AppResult;
use crate::storage::users::{find_user, update_username};
use crate::storage::{with_conn, DbPool, User};
use crate::telegram::telegram_id;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub flows: Arc<FlowStore>,
    pub mode: Mode,
}

impl HandlerDeps {
    /// Create new handler dependencies with an empty flow store
    pub fn new(db_pool: Arc<DbPool>, mode: Mode) -> Self {
        Self {
            db_pool,
            flows: Arc::new(FlowStore::new()),
            mode,
        }
    }
}

/// The stored user behind a Telegram account, if registered.
///
/// The stored username follows the Telegram profile.
pub fn registered_user(deps: &HandlerDeps, from: &teloxide::types::User) -> AppResult<Option<User>> {
    let tid = telegram_id(from);
    let username = from.username.clone();
    with_conn(&deps.db_pool, |conn| {
        let Some(user) = find_user(conn, Some(tid), username.as_deref())? else {
            return Ok(None);
        };
        match username {
            Some(name) if name != user.username => {
                update_username(conn, user.id, &name)?;
                Ok(Some(User { username: name, ..user }))
            }
            _ => Ok(Some(user)),
        }
    })
}

/// Like [`registered_user`], but only for admins.
pub fn admin_user(deps: &HandlerDeps, from: &teloxide::types::User) -> AppResult<Option<User>> {
    Ok(registered_user(deps, from)?.filter(|u| u.is_admin))
}

/// Username to store for a Telegram account without one.
pub fn fallback_username(from: &teloxide::types::User) -> String {
    from.username.clone().unwrap_or_else(|| format!("user{}", from.id.0))
}
