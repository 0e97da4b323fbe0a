use crate::orm::users;
use crate::session::new_session;
use actix_session::Session;
use actix_web::{error, post, web, Error, HttpResponse, Responder};
use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use sea_orm::{entity::*, query::*};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginFormData {
    username: String,
    password: String,
}

#[post("/login")]
pub async fn post_login(
    cookies: Session,
    form: web::Json<LoginFormData>,
) -> Result<impl Responder, Error> {
    let db = crate::get_db_pool();

    // The same message for a missing user and a bad password, so the response
    // is not a username oracle.
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(form.username.trim()))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorUnauthorized("Invalid username or password."))?;

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        log::error!("post_login: stored hash for user {} unparseable: {}", user.id, e);
        error::ErrorInternalServerError("Login failed.")
    })?;
    if Argon2::default()
        .verify_password(form.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(error::ErrorUnauthorized("Invalid username or password."));
    }

    let token = new_session(db, user.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    cookies
        .insert("token", token.to_string())
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Login successful.",
        "user_id": user.id,
    })))
}
