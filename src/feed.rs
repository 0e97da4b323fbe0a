use crate::middleware::ClientCtx;
use crate::orm::{comments, likes, posts, users};
use actix_web::{error, get, web, Error, HttpResponse, Responder};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Deserialize)]
pub struct FeedQuery {
    pub community: Option<i32>,
}

/// A post row with its author's name adjoined.
#[derive(Debug, FromQueryResult)]
pub struct PostForFeed {
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

/// One feed item as serialized to the client, stats included.
#[derive(Debug, Serialize)]
pub struct FeedPost {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub technical_area: Option<String>,
    pub user_id: i32,
    pub community_id: Option<i32>,
    pub username: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked: bool,
}

#[derive(Debug, FromQueryResult)]
struct CountByPost {
    post_id: i32,
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct LikedPost {
    post_id: i32,
}

#[get("/feed")]
pub async fn view_feed(
    client: ClientCtx,
    query: web::Query<FeedQuery>,
) -> Result<impl Responder, Error> {
    let db = crate::get_db_pool();

    let mut posts_query = posts::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "username")
        .order_by_desc(posts::Column::CreatedAt);
    if let Some(community_id) = query.community {
        posts_query = posts_query.filter(posts::Column::CommunityId.eq(community_id));
    }
    let posts = posts_query
        .into_model::<PostForFeed>()
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    // One aggregate round trip per stat for the whole page, not three
    // queries per post.
    let ids: Vec<i32> = posts.iter().map(|post| post.id).collect();
    let like_counts = like_counts_for(db, &ids)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let comment_counts = comment_counts_for(db, &ids)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let liked = match client.get_id() {
        Some(user_id) => liked_posts_for(db, user_id, &ids)
            .await
            .map_err(error::ErrorInternalServerError)?,
        None => HashSet::new(),
    };

    Ok(HttpResponse::Ok().json(merge_feed(posts, &like_counts, &comment_counts, &liked)))
}

/// Like counts grouped by post id, for the given posts only.
pub async fn like_counts_for(
    db: &DatabaseConnection,
    post_ids: &[i32],
) -> Result<HashMap<i32, i64>, DbErr> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = likes::Entity::find()
        .select_only()
        .column(likes::Column::PostId)
        .column_as(likes::Column::PostId.count(), "count")
        .filter(likes::Column::PostId.is_in(post_ids.to_owned()))
        .group_by(likes::Column::PostId)
        .into_model::<CountByPost>()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| (row.post_id, row.count)).collect())
}

/// Comment counts grouped by post id, for the given posts only.
pub async fn comment_counts_for(
    db: &DatabaseConnection,
    post_ids: &[i32],
) -> Result<HashMap<i32, i64>, DbErr> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = comments::Entity::find()
        .select_only()
        .column(comments::Column::PostId)
        .column_as(comments::Column::PostId.count(), "count")
        .filter(comments::Column::PostId.is_in(post_ids.to_owned()))
        .group_by(comments::Column::PostId)
        .into_model::<CountByPost>()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| (row.post_id, row.count)).collect())
}

/// The subset of the given posts this user has liked.
pub async fn liked_posts_for(
    db: &DatabaseConnection,
    user_id: i32,
    post_ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    if post_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows = likes::Entity::find()
        .select_only()
        .column(likes::Column::PostId)
        .filter(likes::Column::UserId.eq(user_id))
        .filter(likes::Column::PostId.is_in(post_ids.to_owned()))
        .into_model::<LikedPost>()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.post_id).collect())
}

/// Merges the aggregate results into the post list. Posts with no aggregate
/// row default to zero counts / not liked.
fn merge_feed(
    posts: Vec<PostForFeed>,
    like_counts: &HashMap<i32, i64>,
    comment_counts: &HashMap<i32, i64>,
    liked: &HashSet<i32>,
) -> Vec<FeedPost> {
    posts
        .into_iter()
        .map(|post| FeedPost {
            like_count: like_counts.get(&post.id).copied().unwrap_or(0),
            comment_count: comment_counts.get(&post.id).copied().unwrap_or(0),
            liked: liked.contains(&post.id),
            id: post.id,
            title: post.title,
            content: post.content,
            technical_area: post.technical_area,
            user_id: post.user_id,
            community_id: post.community_id,
            username: post.username,
            created_at: post.created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(id: i32) -> PostForFeed {
        PostForFeed {
            id,
            title: format!("Post {}", id),
            content: "content".to_owned(),
            technical_area: None,
            user_id: 1,
            community_id: None,
            created_at: Utc::now().naive_utc(),
            username: Some("alice".to_owned()),
        }
    }

    #[test]
    fn merge_defaults_to_zero_counts_and_not_liked() {
        let merged = merge_feed(
            vec![post(1)],
            &HashMap::new(),
            &HashMap::new(),
            &HashSet::new(),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].like_count, 0);
        assert_eq!(merged[0].comment_count, 0);
        assert!(!merged[0].liked);
    }

    #[test]
    fn merge_applies_counts_per_post() {
        let like_counts = HashMap::from([(1, 3), (2, 1)]);
        let comment_counts = HashMap::from([(2, 7)]);
        let liked = HashSet::from([2]);

        let merged = merge_feed(
            vec![post(1), post(2), post(3)],
            &like_counts,
            &comment_counts,
            &liked,
        );

        assert_eq!(merged[0].like_count, 3);
        assert_eq!(merged[0].comment_count, 0);
        assert!(!merged[0].liked);

        assert_eq!(merged[1].like_count, 1);
        assert_eq!(merged[1].comment_count, 7);
        assert!(merged[1].liked);

        assert_eq!(merged[2].like_count, 0);
        assert!(!merged[2].liked);
    }

    #[test]
    fn merge_preserves_input_order() {
        let merged = merge_feed(
            vec![post(5), post(2), post(9)],
            &HashMap::new(),
            &HashMap::new(),
            &HashSet::new(),
        );
        let ids: Vec<i32> = merged.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }
}
