use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger};
use actix_web::{App, HttpServer};
use env_logger::Env;
use knowhub::db::init_db;
use knowhub::middleware::ClientCtx;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();
    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    knowhub::session::spawn_expire_task();

    let secret_key = Key::generate(); // TODO: Should be from .env file
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());

    HttpServer::new(move || {
        // Middleware runs in reverse registration order: the session layer
        // must execute before ClientCtx can resolve a user from it.
        App::new()
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::BAD_REQUEST, knowhub::web::error::render_400)
                    .handler(StatusCode::UNAUTHORIZED, knowhub::web::error::render_401)
                    .handler(StatusCode::FORBIDDEN, knowhub::web::error::render_403)
                    .handler(StatusCode::NOT_FOUND, knowhub::web::error::render_404)
                    .handler(StatusCode::CONFLICT, knowhub::web::error::render_409)
                    .handler(
                        StatusCode::UNPROCESSABLE_ENTITY,
                        knowhub::web::error::render_422,
                    )
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        knowhub::web::error::render_500,
                    ),
            )
            .wrap(ClientCtx::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                secret_key.clone(),
            ))
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(knowhub::web::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
/// Panics on bad or missing configuration.
fn init_our_mods() {
    // Kept independent of each other so single modules can be exercised in
    // tests without booting the whole application.
    knowhub::global::init();
    knowhub::session::init();
}
