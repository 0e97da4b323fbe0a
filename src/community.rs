use crate::middleware::ClientCtx;
use crate::orm::communities;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use chrono::prelude::Utc;
use sea_orm::{entity::*, query::*, FromQueryResult};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct NewCommunityFormData {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, FromQueryResult, Serialize)]
pub struct CommunityForDirectory {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub user_id: i32,
    pub created_at: chrono::NaiveDateTime,
}

pub fn validate_community_form(form: NewCommunityFormData) -> Result<NewCommunityFormData, Error> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(error::ErrorUnprocessableEntity(
            "Community name cannot be blank.",
        ));
    }

    Ok(NewCommunityFormData {
        name: name.to_owned(),
        description: form
            .description
            .map(|description| description.trim().to_owned())
            .filter(|description| !description.is_empty()),
    })
}

#[post("/community")]
pub async fn create_community(
    client: ClientCtx,
    form: web::Json<NewCommunityFormData>,
) -> Result<impl Responder, Error> {
    let user_id = client
        .get_id()
        .ok_or_else(|| error::ErrorUnauthorized("You must be logged in."))?;
    let form = validate_community_form(form.into_inner())?;

    let db = crate::get_db_pool();
    let taken = communities::Entity::find()
        .filter(communities::Column::Name.eq(form.name.as_str()))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;
    if taken.is_some() {
        return Err(error::ErrorConflict(
            "A community with that name already exists.",
        ));
    }

    let new_community = communities::ActiveModel {
        name: Set(form.name),
        description: Set(form.description),
        user_id: Set(user_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let result = communities::Entity::insert(new_community)
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Community created successfully.",
        "id": result.last_insert_id,
    })))
}

/// The directory lists every community, including ones with no posts yet.
#[get("/communities")]
pub async fn view_communities() -> Result<impl Responder, Error> {
    let communities = communities::Entity::find()
        .order_by_asc(communities::Column::Name)
        .into_model::<CommunityForDirectory>()
        .all(crate::get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(communities))
}

#[cfg(test)]
mod tests {
    use super::{validate_community_form, NewCommunityFormData};

    #[test]
    fn blank_name_is_rejected() {
        let form = NewCommunityFormData {
            name: "   ".to_owned(),
            description: None,
        };
        assert!(validate_community_form(form).is_err());
    }

    #[test]
    fn name_and_description_are_trimmed() {
        let form = validate_community_form(NewCommunityFormData {
            name: " Tech Experts ".to_owned(),
            description: Some("  all things BASIS  ".to_owned()),
        })
        .unwrap();
        assert_eq!(form.name, "Tech Experts");
        assert_eq!(form.description.as_deref(), Some("all things BASIS"));

        let form = validate_community_form(NewCommunityFormData {
            name: "Tech".to_owned(),
            description: Some("   ".to_owned()),
        })
        .unwrap();
        assert_eq!(form.description, None);
    }
}
