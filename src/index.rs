use actix_web::{get, HttpResponse, Responder};

#[get("/")]
pub async fn view_index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
