use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    pagination::PageContext,
    schema::{AuthorView, FollowedAuthor, Id, User, UserRow},
    AUTHOR_COUNT_PER_PAGE,
};

use super::recipes;

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row)
}

pub async fn is_following(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let row: Option<(Id,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row.is_some())
}

pub async fn get_author_view(
    author_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<AuthorView, Error> {
    let user = get_user_by_id(pool, author_id)
        .await?
        .ok_or_else(|| Error::NotFound(String::from("No user exists with specified id")))?;

    let is_subscribed = match viewer {
        Some(user_id) if user_id != author_id => is_following(user_id, author_id, pool).await?,
        _ => false,
    };

    Ok(AuthorView::from_user(user, is_subscribed))
}

/// Subscribes `user_id` to the author. Self-follows are rejected before
/// touching the store; a duplicate edge loses against the unique
/// constraint and is reported as a conflict.
pub async fn follow_author(
    user_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<AuthorView, Error> {
    if user_id == author_id {
        return Err(Error::Validation(String::from(
            "Subscribing to yourself is not allowed",
        )));
    }

    let author = get_user_by_id(pool, author_id)
        .await?
        .ok_or_else(|| Error::NotFound(String::from("No user exists with specified id")))?;

    let result =
        sqlx::query("INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(author_id)
            .execute(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        log::warn!("follow insert lost for user {} on author {}", user_id, author_id);
        return Err(Error::Conflict(String::from(
            "Already subscribed to this author",
        )));
    }

    Ok(AuthorView::from_user(author, true))
}

pub async fn unfollow_author(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(String::from(
            "Not subscribed to this author",
        )));
    }

    Ok(())
}

/// Authors the user follows, each with up to `recipes_limit` of their
/// newest recipes and a total recipe count.
pub async fn list_followed_authors(
    user_id: Id,
    recipes_limit: Option<i64>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<FollowedAuthor>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(AUTHOR_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);

    let mut authors = Vec::with_capacity(rows.len());
    for row in rows {
        let recipes = recipes::list_author_recipes(row.id, recipes_limit, pool).await?;
        let recipes_count = recipes::count_author_recipes(row.id, pool).await?;

        authors.push(FollowedAuthor {
            author: AuthorView {
                id: row.id,
                username: row.username,
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
                is_subscribed: true,
            },
            recipes,
            recipes_count,
        });
    }

    let page = PageContext::from_rows(authors, total_count, AUTHOR_COUNT_PER_PAGE, offset);
    Ok(page)
}
