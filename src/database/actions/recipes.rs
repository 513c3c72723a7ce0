use chrono::{DateTime, Utc};
use sqlx::{types::Json, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::like_pattern;
use crate::{
    error::ApiError,
    form::{RecipeFilter, RecipeForm},
    pagination::{Page, PageRequest},
    ranking::KeywordCount,
    schema::{
        CommentView, LikeToggle, PublicProfile, RankedRecipe, Recipe, RecipeDetail, RecipeRow,
    },
};

#[derive(sqlx::FromRow)]
struct RankedRecipeRow {
    #[sqlx(flatten)]
    recipe: RecipeRow,
    owner_full_name: String,
    owner_image_url: String,
}

impl From<RankedRecipeRow> for RankedRecipe {
    fn from(row: RankedRecipeRow) -> Self {
        let owner = PublicProfile {
            id: row.recipe.created_by,
            full_name: row.owner_full_name,
            image_url: row.owner_image_url,
        };
        Self {
            recipe: row.recipe.into(),
            owner,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    comment: String,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    full_name: String,
    image_url: String,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            commented_by: PublicProfile {
                id: row.user_id,
                full_name: row.full_name,
                image_url: row.image_url,
            },
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

fn into_recipes(rows: Vec<RecipeRow>) -> Vec<Recipe> {
    rows.into_iter().map(Recipe::from).collect()
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a RecipeFilter) {
    match filter {
        RecipeFilter::All => {}
        RecipeFilter::Category(category) => {
            builder.push(" WHERE r.category = ").push_bind(category);
        }
        RecipeFilter::Search(query) => {
            let pattern = like_pattern(query.trim());
            builder
                .push(" WHERE (r.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR EXISTS (SELECT 1 FROM unnest(r.keywords) k WHERE k ILIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\'))");
        }
        RecipeFilter::Keyword(keyword) => {
            builder
                .push(" WHERE EXISTS (SELECT 1 FROM unnest(r.keywords) k WHERE lower(k) = lower(")
                .push_bind(keyword.trim())
                .push("))");
        }
    }
}

pub async fn fetch_recipes(
    pool: &Pool<Postgres>,
    filter: &RecipeFilter,
    request: PageRequest,
) -> Result<Page<Recipe>, ApiError> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_filter(&mut count, filter);
    let (total,): (i64,) = count.build_query_as().fetch_one(pool).await?;

    let mut select = QueryBuilder::new("SELECT r.* FROM recipes r");
    push_filter(&mut select, filter);
    select
        .push(" ORDER BY r.name, r.id LIMIT ")
        .push_bind(request.limit)
        .push(" OFFSET ")
        .push_bind(request.offset());
    let rows: Vec<RecipeRow> = select.build_query_as().fetch_all(pool).await?;

    Ok(Page::from_rows(into_recipes(rows), total, request))
}

pub async fn get_recipe(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Recipe>, ApiError> {
    let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Recipe::from))
}

pub async fn get_recipe_detail(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<RecipeDetail>, ApiError> {
    let recipe = match get_recipe(pool, id).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let owner: PublicProfile =
        sqlx::query_as("SELECT id, full_name, image_url FROM users WHERE id = $1")
            .bind(recipe.created_by)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

    let comments: Vec<CommentRow> = sqlx::query_as(
        "
        SELECT c.id, c.comment, c.created_at, u.id AS user_id, u.full_name, u.image_url
        FROM recipe_comments c
        INNER JOIN users u ON u.id = c.commented_by
        WHERE c.recipe_id = $1
        ORDER BY c.created_at DESC, c.id
    ",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(RecipeDetail {
        recipe,
        owner,
        comments: comments.into_iter().map(CommentView::from).collect(),
    }))
}

pub async fn create_recipe(
    pool: &Pool<Postgres>,
    owner: Uuid,
    form: &RecipeForm,
) -> Result<Recipe, ApiError> {
    let row: RecipeRow = sqlx::query_as(
        "
        INSERT INTO recipes
            (name, category, instructions, keywords, ingredients, time, servings, difficulty, image_url, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *;
    ",
    )
    .bind(form.name.trim())
    .bind(form.category.trim())
    .bind(&form.instructions)
    .bind(&form.keywords)
    .bind(Json(&form.ingredients))
    .bind(&form.time)
    .bind(form.servings)
    .bind(form.difficulty)
    .bind(&form.image)
    .bind(owner)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Owner and likes are left untouched.
pub async fn update_recipe(
    pool: &Pool<Postgres>,
    id: Uuid,
    form: &RecipeForm,
) -> Result<Recipe, ApiError> {
    let row: Option<RecipeRow> = sqlx::query_as(
        "
        UPDATE recipes
        SET name = $2, category = $3, instructions = $4, keywords = $5, ingredients = $6,
            time = $7, servings = $8, difficulty = $9, image_url = COALESCE($10, image_url),
            updated_at = now()
        WHERE id = $1
        RETURNING *;
    ",
    )
    .bind(id)
    .bind(form.name.trim())
    .bind(form.category.trim())
    .bind(&form.instructions)
    .bind(&form.keywords)
    .bind(Json(&form.ingredients))
    .bind(&form.time)
    .bind(form.servings)
    .bind(form.difficulty)
    .bind(&form.image)
    .fetch_optional(pool)
    .await?;

    row.map(Recipe::from)
        .ok_or_else(|| ApiError::not_found("Recipe"))
}

/// Comments go with the recipe through the foreign key cascade.
pub async fn delete_recipe(pool: &Pool<Postgres>, id: Uuid) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE users SET bookmarks = array_remove(bookmarks, $1) WHERE $1 = ANY(bookmarks)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Recipe"));
    }

    tx.commit().await?;
    Ok(())
}

pub async fn list_user_recipes(
    pool: &Pool<Postgres>,
    owner: Uuid,
) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<RecipeRow> =
        sqlx::query_as("SELECT * FROM recipes WHERE created_by = $1 ORDER BY created_at DESC, id")
            .bind(owner)
            .fetch_all(pool)
            .await?;

    Ok(into_recipes(rows))
}

pub async fn list_liked_recipes(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<RecipeRow> =
        sqlx::query_as("SELECT * FROM recipes WHERE $1 = ANY(liked_users) ORDER BY name, id")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    Ok(into_recipes(rows))
}

pub async fn list_bookmarked_recipes(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<RecipeRow> = sqlx::query_as(
        "
        SELECT r.* FROM recipes r
        INNER JOIN users u ON r.id = ANY(u.bookmarks)
        WHERE u.id = $1
        ORDER BY r.name, r.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(into_recipes(rows))
}

pub async fn top_keywords(
    pool: &Pool<Postgres>,
    limit: usize,
) -> Result<Vec<KeywordCount>, ApiError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "
        SELECT lower(k) AS keyword, COUNT(*) AS count
        FROM recipes r, unnest(r.keywords) k
        GROUP BY lower(k)
        ORDER BY count DESC, keyword ASC
        LIMIT $1
    ",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect())
}

pub async fn most_liked_recipes(
    pool: &Pool<Postgres>,
    limit: i64,
) -> Result<Vec<RankedRecipe>, ApiError> {
    let rows: Vec<RankedRecipeRow> = sqlx::query_as(
        "
        SELECT r.*, u.full_name AS owner_full_name, u.image_url AS owner_image_url
        FROM recipes r
        INNER JOIN users u ON u.id = r.created_by
        ORDER BY cardinality(r.liked_users) DESC, r.name, r.id
        LIMIT $1
    ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RankedRecipe::from).collect())
}

pub async fn other_recipes(
    pool: &Pool<Postgres>,
    exclude: Uuid,
    limit: i64,
) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<RecipeRow> = sqlx::query_as(
        "SELECT * FROM recipes WHERE id <> $1 ORDER BY created_at DESC, id LIMIT $2",
    )
    .bind(exclude)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(into_recipes(rows))
}

/// Membership test and flip happen in the same statement, so concurrent toggles
/// by the same user cannot both add.
pub async fn toggle_like(
    pool: &Pool<Postgres>,
    recipe_id: Uuid,
    user_id: Uuid,
) -> Result<LikeToggle, ApiError> {
    let row: Option<(bool, i64)> = sqlx::query_as(
        "
        UPDATE recipes
        SET liked_users = CASE
                WHEN $2 = ANY(liked_users) THEN array_remove(liked_users, $2)
                ELSE array_append(liked_users, $2)
            END
        WHERE id = $1
        RETURNING $2 = ANY(liked_users), cardinality(liked_users)::BIGINT;
    ",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let (liked, likes_count) = row.ok_or_else(|| ApiError::not_found("Recipe"))?;
    Ok(LikeToggle { liked, likes_count })
}

pub async fn add_comment(
    pool: &Pool<Postgres>,
    recipe_id: Uuid,
    user_id: Uuid,
    comment: &str,
) -> Result<CommentView, ApiError> {
    let row: Option<CommentRow> = sqlx::query_as(
        "
        WITH inserted AS (
            INSERT INTO recipe_comments (recipe_id, commented_by, comment)
            SELECT $1, $2, $3
            WHERE EXISTS (SELECT 1 FROM recipes WHERE id = $1)
            RETURNING id, comment, created_at, commented_by
        )
        SELECT i.id, i.comment, i.created_at, u.id AS user_id, u.full_name, u.image_url
        FROM inserted i
        INNER JOIN users u ON u.id = i.commented_by
    ",
    )
    .bind(recipe_id)
    .bind(user_id)
    .bind(comment.trim())
    .fetch_optional(pool)
    .await?;

    row.map(CommentView::from)
        .ok_or_else(|| ApiError::not_found("Recipe"))
}
