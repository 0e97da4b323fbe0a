use crate::middleware::ClientCtx;
use crate::orm::{user_presences, users};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use chrono::prelude::Utc;
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, sea_query::Expr, FromQueryResult};
use serde::{Deserialize, Serialize};

/// A user counts as active while their last heartbeat is inside this window.
const ACTIVE_WINDOW_MINUTES: i64 = 5;
const ACTIVE_USER_LIMIT: u64 = 10;

#[derive(Deserialize)]
pub struct StatusFormData {
    pub status: String,
}

#[derive(Debug, FromQueryResult, Serialize)]
pub struct ActiveUserProfile {
    pub user_id: i32,
    pub status: String,
    pub last_active: NaiveDateTime,
    // join users
    pub username: Option<String>,
}

pub fn active_cutoff(now: NaiveDateTime) -> NaiveDateTime {
    now - chrono::Duration::minutes(ACTIVE_WINDOW_MINUTES)
}

/// Heartbeat. Overwrites the caller's presence row; there is no explicit
/// go-offline signal, staleness is the only exit.
#[post("/status")]
pub async fn update_status(
    client: ClientCtx,
    form: web::Json<StatusFormData>,
) -> Result<impl Responder, Error> {
    let user_id = client
        .get_id()
        .ok_or_else(|| error::ErrorUnauthorized("You must be logged in."))?;

    let status = form.status.trim();
    if status.is_empty() {
        return Err(error::ErrorUnprocessableEntity("Status cannot be blank."));
    }

    let db = crate::get_db_pool();
    let now = Utc::now().naive_utc();

    let existing = user_presences::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;
    match existing {
        Some(_) => {
            user_presences::Entity::update_many()
                .col_expr(user_presences::Column::Status, Expr::value(status))
                .col_expr(user_presences::Column::UpdatedAt, Expr::value(now))
                .filter(user_presences::Column::UserId.eq(user_id))
                .exec(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
        }
        None => {
            let presence = user_presences::ActiveModel {
                user_id: Set(user_id),
                status: Set(status.to_owned()),
                updated_at: Set(now),
            };
            user_presences::Entity::insert(presence)
                .exec(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Users whose last heartbeat falls inside the trailing window, newest
/// first, capped. Nothing older can appear regardless of its status string.
#[get("/active")]
pub async fn view_active_users() -> Result<impl Responder, Error> {
    let cutoff = active_cutoff(Utc::now().naive_utc());

    let active = user_presences::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .column_as(user_presences::Column::UpdatedAt, "last_active")
        .filter(user_presences::Column::UpdatedAt.gte(cutoff))
        .order_by_desc(user_presences::Column::UpdatedAt)
        .limit(ACTIVE_USER_LIMIT)
        .into_model::<ActiveUserProfile>()
        .all(crate::get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(active))
}

#[cfg(test)]
mod tests {
    use super::active_cutoff;
    use chrono::{Duration, Utc};

    #[test]
    fn cutoff_trails_by_the_active_window() {
        let now = Utc::now().naive_utc();
        let cutoff = active_cutoff(now);
        assert_eq!(now - cutoff, Duration::minutes(5));

        // A heartbeat just inside the window passes the filter; one just
        // outside does not.
        let fresh = now - Duration::minutes(4);
        let stale = now - Duration::minutes(6);
        assert!(fresh >= cutoff);
        assert!(stale < cutoff);
    }
}
