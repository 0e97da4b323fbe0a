use crate::orm::sessions;
use crate::user::ClientUser;
use chrono::{NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// How often the background sweep runs. Authentication also checks expiry
/// inline, so the sweep only reclaims memory and table rows.
const EXPIRE_SWEEP_SECS: u64 = 60;

/// In-memory copy of one sessions table row.
#[derive(Copy, Clone, Debug)]
pub struct Session {
    pub user_id: i32,
    pub expires_at: NaiveDateTime,
}

impl Session {
    pub fn is_fresh(&self, now: NaiveDateTime) -> bool {
        self.expires_at > now
    }
}

pub type SessionMap = RwLock<HashMap<Uuid, Session>>;

static SESSION_MAP: OnceCell<SessionMap> = OnceCell::new();

#[inline(always)]
pub fn get_sess() -> &'static SessionMap {
    unsafe { SESSION_MAP.get_unchecked() }
}

pub fn init() {
    SESSION_MAP
        .set(RwLock::new(HashMap::new()))
        .expect("failed to set SESSION_MAP");
}

/// Repopulates the session map from the sessions table.
/// Rows already expired at load time are skipped, not deleted; the sweep
/// task picks them up.
pub async fn reload_session_cache(ses_map: &SessionMap) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let rows = sessions::Entity::find().all(crate::get_db_pool()).await?;

    let mut map = ses_map.write().unwrap();
    map.clear();
    for row in rows {
        let session = Session {
            user_id: row.user_id,
            expires_at: row.expires_at,
        };
        if !session.is_fresh(now) {
            continue;
        }
        match Uuid::parse_str(&row.id) {
            Ok(uuid) => {
                map.insert(uuid, session);
            }
            Err(e) => {
                log::warn!("reload_session_cache: bad token {:?}: {}", row.id, e);
            }
        }
    }

    Ok(())
}

/// Creates a session for the user in both the map and the sessions table,
/// returning the cookie token.
pub async fn new_session(db: &DatabaseConnection, user_id: i32) -> Result<Uuid, DbErr> {
    let session = Session {
        user_id,
        expires_at: Utc::now().naive_utc() + *crate::global::get_session_time(),
    };

    let mut uuid;
    loop {
        uuid = Uuid::new_v4();
        let ses_map = &mut *get_sess().write().unwrap();
        if !ses_map.contains_key(&uuid) {
            ses_map.insert(uuid, session);
            break;
        }
    }

    let row = sessions::ActiveModel {
        id: Set(uuid.to_string()),
        user_id: Set(user_id),
        expires_at: Set(session.expires_at),
    };
    sessions::Entity::insert(row).exec(db).await?;

    Ok(uuid)
}

pub async fn remove_session(db: &DatabaseConnection, uuid: Uuid) -> Result<(), DbErr> {
    sessions::Entity::delete_many()
        .filter(sessions::Column::Id.eq(uuid.to_string()))
        .exec(db)
        .await?;
    get_sess().write().unwrap().remove(&uuid);
    Ok(())
}

/// Resolves the session cookie to a user, or None for guests and stale
/// or unparseable tokens.
pub async fn authenticate_client_by_session(cookies: &actix_session::Session) -> Option<ClientUser> {
    let token = match cookies.get::<String>("token") {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(e) => {
            log::error!("authenticate_client_by_session: cookies.get() {}", e);
            return None;
        }
    };
    let uuid = match Uuid::parse_str(&token) {
        Ok(uuid) => uuid,
        Err(e) => {
            log::warn!("authenticate_client_by_session: parse_str() {}", e);
            return None;
        }
    };
    authenticate_by_uuid(uuid).await
}

pub async fn authenticate_by_uuid(uuid: Uuid) -> Option<ClientUser> {
    use crate::orm::users;

    let user_id = {
        let ses_map = get_sess().read().unwrap();
        match ses_map.get(&uuid) {
            Some(session) if session.is_fresh(Utc::now().naive_utc()) => session.user_id,
            _ => return None,
        }
    };

    match users::Entity::find_by_id(user_id)
        .one(crate::get_db_pool())
        .await
    {
        Ok(Some(user)) => Some(ClientUser {
            id: user.id,
            name: user.username,
        }),
        Ok(None) => {
            log::warn!("authenticate_by_uuid: session for missing user {}", user_id);
            None
        }
        Err(e) => {
            log::error!("authenticate_by_uuid: {}", e);
            None
        }
    }
}

/// Deletes expired rows from the sessions table and prunes the map.
pub async fn expire_sessions(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let now = Utc::now().naive_utc();

    let res = sessions::Entity::delete_many()
        .filter(sessions::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;

    get_sess()
        .write()
        .unwrap()
        .retain(|_, session| session.is_fresh(now));

    Ok(res.rows_affected)
}

/// Spawns the expiry sweep on the server runtime. Dies with the process.
pub fn spawn_expire_task() {
    actix_web::rt::spawn(async {
        let mut interval =
            actix_web::rt::time::interval(std::time::Duration::from_secs(EXPIRE_SWEEP_SECS));
        loop {
            interval.tick().await;
            match expire_sessions(crate::get_db_pool()).await {
                Ok(0) => {}
                Ok(n) => log::info!("expire_sessions: removed {} expired sessions", n),
                Err(e) => log::error!("expire_sessions: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn session_freshness_tracks_expiry() {
        let now = Utc::now().naive_utc();
        let fresh = Session {
            user_id: 1,
            expires_at: now + Duration::minutes(5),
        };
        let stale = Session {
            user_id: 1,
            expires_at: now - Duration::seconds(1),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
        // A session expiring exactly now is no longer fresh.
        let edge = Session {
            user_id: 1,
            expires_at: now,
        };
        assert!(!edge.is_fresh(now));
    }
}
