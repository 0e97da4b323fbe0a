use crate::middleware::ClientCtx;
use crate::orm::{likes, posts};
use actix_web::{error, post, web, Error, HttpResponse, Responder};
use chrono::prelude::Utc;
use sea_orm::{entity::*, query::*};

/// Toggles the caller's like on a post and returns the recomputed row count.
///
/// The check-then-act is deliberately not wrapped in a transaction; a
/// same-user double-toggle from two tabs can race, but the composite primary
/// key keeps duplicate rows out and the next read recomputes the truth.
#[post("/post/{post_id}/like")]
pub async fn toggle_like(client: ClientCtx, path: web::Path<i32>) -> Result<impl Responder, Error> {
    let user_id = client
        .get_id()
        .ok_or_else(|| error::ErrorUnauthorized("You must be logged in to like posts."))?;
    let post_id = path.into_inner();

    let db = crate::get_db_pool();
    posts::Entity::find_by_id(post_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    let existing = likes::Entity::find()
        .filter(likes::Column::PostId.eq(post_id))
        .filter(likes::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let liked = if existing.is_some() {
        likes::Entity::delete_many()
            .filter(likes::Column::PostId.eq(post_id))
            .filter(likes::Column::UserId.eq(user_id))
            .exec(db)
            .await
            .map_err(error::ErrorInternalServerError)?;
        false
    } else {
        let new_like = likes::ActiveModel {
            post_id: Set(post_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now().naive_utc()),
        };
        likes::Entity::insert(new_like)
            .exec(db)
            .await
            .map_err(error::ErrorInternalServerError)?;
        true
    };

    let like_count = crate::feed::like_counts_for(db, &[post_id])
        .await
        .map_err(error::ErrorInternalServerError)?
        .get(&post_id)
        .copied()
        .unwrap_or(0);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": if liked { "Like added." } else { "Like removed." },
        "liked": liked,
        "like_count": like_count,
    })))
}
