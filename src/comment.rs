use crate::middleware::ClientCtx;
use crate::orm::{comments, posts, users};
use actix_web::{delete, error, get, post, web, Error, HttpResponse, Responder};
use chrono::prelude::Utc;
use sea_orm::{entity::*, query::*, FromQueryResult};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct NewCommentFormData {
    pub content: String,
}

/// A comment row with its author's name adjoined.
#[derive(Debug, FromQueryResult, Serialize)]
pub struct CommentForPost {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub content: String,
    pub created_at: chrono::NaiveDateTime,
    // join users
    pub username: Option<String>,
}

pub fn validate_comment_form(form: NewCommentFormData) -> Result<NewCommentFormData, Error> {
    let content = form.content.trim();
    if content.is_empty() {
        return Err(error::ErrorUnprocessableEntity("Comment cannot be blank."));
    }

    Ok(NewCommentFormData {
        content: content.to_owned(),
    })
}

/// Oldest first, the order a conversation reads in.
#[get("/post/{post_id}/comments")]
pub async fn view_comments(path: web::Path<i32>) -> Result<impl Responder, Error> {
    let post_id = path.into_inner();
    let db = crate::get_db_pool();

    posts::Entity::find_by_id(post_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    let comments = comments::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .filter(comments::Column::PostId.eq(post_id))
        .order_by_asc(comments::Column::CreatedAt)
        .into_model::<CommentForPost>()
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(comments))
}

#[post("/post/{post_id}/comment")]
pub async fn create_comment(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<NewCommentFormData>,
) -> Result<impl Responder, Error> {
    let user_id = client
        .get_id()
        .ok_or_else(|| error::ErrorUnauthorized("You must be logged in to comment."))?;
    let form = validate_comment_form(form.into_inner())?;
    let post_id = path.into_inner();

    let db = crate::get_db_pool();
    posts::Entity::find_by_id(post_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    let new_comment = comments::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(user_id),
        content: Set(form.content),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let result = comments::Entity::insert(new_comment)
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Comment added.",
        "id": result.last_insert_id,
    })))
}

#[delete("/comment/{comment_id}")]
pub async fn destroy_comment(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    if !client.is_user() {
        return Err(error::ErrorUnauthorized("You must be logged in."));
    }

    let db = crate::get_db_pool();
    let comment = comments::Entity::find_by_id(path.into_inner())
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;

    if !client.can_delete_comment(&comment) {
        return Err(error::ErrorForbidden(
            "You do not have permission to delete this comment.",
        ));
    }

    comments::Entity::delete_many()
        .filter(comments::Column::Id.eq(comment.id))
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::{validate_comment_form, NewCommentFormData};

    #[test]
    fn blank_comment_is_rejected() {
        let form = NewCommentFormData {
            content: " \n ".to_owned(),
        };
        assert!(validate_comment_form(form).is_err());
    }

    #[test]
    fn comment_content_is_trimmed() {
        let form = validate_comment_form(NewCommentFormData {
            content: "  nice write-up  ".to_owned(),
        })
        .unwrap();
        assert_eq!(form.content, "nice write-up");
    }
}
