use crate::middleware::ClientCtx;
use crate::orm::{comments, communities, likes, posts, users};
use actix_web::{delete, error, get, post, web, Error, HttpResponse, Responder};
use chrono::prelude::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct NewPostFormData {
    pub title: String,
    pub content: String,
    pub technical_area: Option<String>,
    pub community_id: Option<i32>,
}

/// A post row with its author's name adjoined, for the detail view.
#[derive(Debug, FromQueryResult, Serialize)]
pub struct PostForView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub technical_area: Option<String>,
    pub user_id: i32,
    pub community_id: Option<i32>,
    pub created_at: chrono::NaiveDateTime,
    // join users
    pub username: Option<String>,
}

pub fn validate_post_form(form: NewPostFormData) -> Result<NewPostFormData, Error> {
    let title = form.title.trim();
    let content = form.content.trim();

    if title.is_empty() {
        return Err(error::ErrorUnprocessableEntity("Title cannot be blank."));
    }
    if content.is_empty() {
        return Err(error::ErrorUnprocessableEntity("Content cannot be blank."));
    }

    Ok(NewPostFormData {
        title: title.to_owned(),
        content: content.to_owned(),
        technical_area: form
            .technical_area
            .map(|area| area.trim().to_owned())
            .filter(|area| !area.is_empty()),
        community_id: form.community_id,
    })
}

#[post("/post")]
pub async fn create_post(
    client: ClientCtx,
    form: web::Json<NewPostFormData>,
) -> Result<impl Responder, Error> {
    let user_id = client
        .get_id()
        .ok_or_else(|| error::ErrorUnauthorized("You must be logged in to post."))?;
    let form = validate_post_form(form.into_inner())?;

    let db = crate::get_db_pool();

    // A dangling community reference would otherwise surface as a 500 on the
    // foreign key.
    if let Some(community_id) = form.community_id {
        communities::Entity::find_by_id(community_id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?
            .ok_or_else(|| error::ErrorNotFound("Community not found."))?;
    }

    let new_post = posts::ActiveModel {
        title: Set(form.title),
        content: Set(form.content),
        technical_area: Set(form.technical_area),
        user_id: Set(user_id),
        community_id: Set(form.community_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let result = posts::Entity::insert(new_post)
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Post created successfully.",
        "id": result.last_insert_id,
    })))
}

#[get("/post/{post_id}")]
pub async fn view_post(path: web::Path<i32>) -> Result<impl Responder, Error> {
    let post = get_post_for_view(crate::get_db_pool(), path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    Ok(HttpResponse::Ok().json(post))
}

#[delete("/post/{post_id}")]
pub async fn destroy_post(client: ClientCtx, path: web::Path<i32>) -> Result<impl Responder, Error> {
    if !client.is_user() {
        return Err(error::ErrorUnauthorized("You must be logged in."));
    }

    let db = crate::get_db_pool();
    let post = posts::Entity::find_by_id(path.into_inner())
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    if !client.can_delete_post(&post) {
        return Err(error::ErrorForbidden(
            "You do not have permission to delete this post.",
        ));
    }

    // Likes and comments reference the post; drop them in the same
    // transaction so no orphan rows survive a partial failure.
    let txn = db.begin().await.map_err(error::ErrorInternalServerError)?;
    likes::Entity::delete_many()
        .filter(likes::Column::PostId.eq(post.id))
        .exec(&txn)
        .await
        .map_err(error::ErrorInternalServerError)?;
    comments::Entity::delete_many()
        .filter(comments::Column::PostId.eq(post.id))
        .exec(&txn)
        .await
        .map_err(error::ErrorInternalServerError)?;
    posts::Entity::delete_many()
        .filter(posts::Column::Id.eq(post.id))
        .exec(&txn)
        .await
        .map_err(error::ErrorInternalServerError)?;
    txn.commit().await.map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::NoContent().finish())
}

/// Returns the result of a query selecting for a post by id with its
/// author's name adjoined.
pub async fn get_post_for_view(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<PostForView>, DbErr> {
    posts::Entity::find_by_id(id)
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .into_model::<PostForView>()
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::{validate_post_form, NewPostFormData};

    fn form(title: &str, content: &str, area: Option<&str>) -> NewPostFormData {
        NewPostFormData {
            title: title.to_owned(),
            content: content.to_owned(),
            technical_area: area.map(str::to_owned),
            community_id: None,
        }
    }

    #[test]
    fn blank_title_or_content_is_rejected() {
        assert!(validate_post_form(form("  ", "body", None)).is_err());
        assert!(validate_post_form(form("title", "\n\t", None)).is_err());
    }

    #[test]
    fn fields_are_trimmed_and_blank_area_dropped() {
        let form = validate_post_form(form("  HANA tips  ", " body ", Some("  "))).unwrap();
        assert_eq!(form.title, "HANA tips");
        assert_eq!(form.content, "body");
        assert_eq!(form.technical_area, None);

        let form = validate_post_form(super::NewPostFormData {
            title: "t".to_owned(),
            content: "c".to_owned(),
            technical_area: Some(" ABAP ".to_owned()),
            community_id: Some(3),
        })
        .unwrap();
        assert_eq!(form.technical_area.as_deref(), Some("ABAP"));
        assert_eq!(form.community_id, Some(3));
    }
}
