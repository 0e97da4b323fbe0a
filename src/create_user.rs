use crate::orm::users;
use actix_web::{error, post, web, Error, HttpResponse, Responder};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, InsertResult};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SignupFormData {
    username: String,
    password: String,
}

async fn insert_new_user(
    db: &DatabaseConnection,
    name: &str,
    pass: &str,
) -> Result<InsertResult<users::ActiveModel>, DbErr> {
    let user = users::ActiveModel {
        created_at: Set(Utc::now().naive_utc()),
        username: Set(name.to_owned()),
        password: Set(pass.to_owned()),
        ..Default::default() // all other attributes are `Unset`
    };
    users::Entity::insert(user).exec(db).await
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("hash_password: {}", e);
            error::ErrorInternalServerError("Could not create user.")
        })
}

#[post("/signup")]
pub async fn create_user(form: web::Json<SignupFormData>) -> Result<impl Responder, Error> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(error::ErrorUnprocessableEntity("Username cannot be blank."));
    }
    if form.password.is_empty() {
        return Err(error::ErrorUnprocessableEntity("Password cannot be blank."));
    }

    let db = crate::get_db_pool();
    let taken = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;
    if taken.is_some() {
        return Err(error::ErrorConflict("That username is already taken."));
    }

    let password_hash = hash_password(&form.password)?;
    insert_new_user(db, username, &password_hash)
        .await
        .map_err(|e| {
            log::error!("create_user: {}", e);
            error::ErrorInternalServerError("Could not create user.")
        })?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User created successfully.",
    })))
}

#[cfg(test)]
mod tests {
    use super::hash_password;
    use argon2::{
        password_hash::{PasswordHash, PasswordVerifier},
        Argon2,
    };

    #[test]
    fn hash_round_trips_and_rejects_wrong_password() {
        let hash = hash_password("hunter2").expect("hashing failed");
        let parsed = PasswordHash::new(&hash).expect("hash unparseable");
        assert!(Argon2::default()
            .verify_password(b"hunter2", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"hunter3", &parsed)
            .is_err());
    }
}
