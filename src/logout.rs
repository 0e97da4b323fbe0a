use crate::session::remove_session;
use actix_web::{post, Error, HttpResponse, Responder};
use uuid::Uuid;

/// Idempotent; a guest or stale token still gets a 204 and a purged cookie.
#[post("/logout")]
pub async fn post_logout(cookies: actix_session::Session) -> Result<impl Responder, Error> {
    match cookies.get::<String>("token") {
        Ok(Some(token)) => match Uuid::parse_str(&token) {
            Ok(uuid) => {
                if let Err(e) = remove_session(crate::get_db_pool(), uuid).await {
                    log::error!("post_logout: remove_session() {}", e);
                }
            }
            Err(e) => {
                log::warn!("post_logout: parse_str() {}", e);
            }
        },
        Ok(None) => {}
        Err(e) => {
            log::error!("post_logout: cookies.get() {}", e);
        }
    }

    cookies.purge();
    Ok(HttpResponse::NoContent().finish())
}
