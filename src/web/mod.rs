pub mod error;

/// Configures the web app
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(crate::index::view_index)
        .service(crate::create_user::create_user)
        .service(crate::login::post_login)
        .service(crate::logout::post_logout)
        .service(crate::feed::view_feed)
        .service(crate::community::create_community)
        .service(crate::community::view_communities)
        .service(crate::post::create_post)
        .service(crate::post::view_post)
        .service(crate::post::destroy_post)
        .service(crate::like::toggle_like)
        .service(crate::comment::view_comments)
        .service(crate::comment::create_comment)
        .service(crate::comment::destroy_comment)
        .service(crate::status::update_status)
        .service(crate::status::view_active_users);
}
