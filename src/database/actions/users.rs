use crate::{
    error::ApiError,
    form::ProfileForm,
    schema::{BookmarkToggle, User},
    store::NewUser,
};

use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Likes are never stored on the user; they are summed from the user's recipes.
const USER_COLUMNS: &str = "
    u.id, u.full_name, u.email, u.password, u.image_url, u.bio, u.role, u.bookmarks,
    u.credit_points, u.created_at, u.updated_at,
    COALESCE((SELECT SUM(cardinality(r.liked_users)) FROM recipes r WHERE r.created_by = u.id), 0)::BIGINT
        AS user_like_count
";

pub async fn get_user(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users u WHERE lower(u.email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

async fn require_user(pool: &Pool<Postgres>, id: Uuid) -> Result<User, ApiError> {
    get_user(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

/// Creates a user whose password is already hashed. A taken email is a conflict.
pub async fn register_user(pool: &Pool<Postgres>, user: NewUser) -> Result<User, ApiError> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (full_name, email, password, image_url, bio, role)
        VALUES ($1, lower($2), $3, $4, $5, $6)
        ON CONFLICT (email) DO NOTHING
        RETURNING *, 0::BIGINT AS user_like_count;
    ",
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.image_url)
    .bind(&user.bio)
    .bind(user.role)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| ApiError::Conflict("User already exists".to_string()))
}

pub async fn update_profile(
    pool: &Pool<Postgres>,
    id: Uuid,
    form: &ProfileForm,
) -> Result<User, ApiError> {
    let updated = sqlx::query(
        "
        UPDATE users
        SET full_name = $2, bio = $3, image_url = COALESCE($4, image_url), updated_at = now()
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(form.full_name.trim())
    .bind(&form.bio)
    .bind(&form.image_url)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("User"));
    }
    require_user(pool, id).await
}

pub async fn update_password(
    pool: &Pool<Postgres>,
    id: Uuid,
    password_hash: &str,
) -> Result<User, ApiError> {
    let updated = sqlx::query("UPDATE users SET password = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("User"));
    }
    require_user(pool, id).await
}

/// Flips the bookmark in one statement. Adding requires the recipe to exist,
/// removing a bookmark of an already deleted recipe is allowed.
pub async fn toggle_bookmark(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<BookmarkToggle, ApiError> {
    let row: Option<(bool,)> = sqlx::query_as(
        "
        UPDATE users
        SET bookmarks = CASE
                WHEN $2 = ANY(bookmarks) THEN array_remove(bookmarks, $2)
                ELSE array_append(bookmarks, $2)
            END,
            updated_at = now()
        WHERE id = $1
          AND ($2 = ANY(bookmarks) OR EXISTS (SELECT 1 FROM recipes WHERE id = $2))
        RETURNING $2 = ANY(bookmarks);
    ",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((bookmarked,)) => Ok(BookmarkToggle { bookmarked }),
        None if get_user(pool, user_id).await?.is_none() => Err(ApiError::not_found("User")),
        None => Err(ApiError::not_found("Recipe")),
    }
}
