pub mod comments;
pub mod communities;
pub mod likes;
pub mod posts;
pub mod sessions;
pub mod user_presences;
pub mod users;
