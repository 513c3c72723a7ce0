pub mod orders;
pub mod products;
pub mod recipes;
pub mod users;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use uuid::Uuid;

use crate::{
    checkout::OrderDraft,
    error::ApiError,
    form::{ProductFilter, ProductForm, ProductUpdateForm, ProfileForm, RecipeFilter, RecipeForm},
    pagination::{Page, PageRequest},
    ranking::KeywordCount,
    schema::{
        BookmarkToggle, CommentView, FilterFacets, LikeToggle, Order, OrderStatus, Product,
        RankedRecipe, Recipe, RecipeDetail, User,
    },
    store::{NewUser, Store},
};

/// `%text%` for `ILIKE ... ESCAPE '\'`, with the wildcard characters in `text` matched literally.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// PostgreSQL backed store. Every method is a thin call into the query functions.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError> {
        users::register_user(&self.pool, user).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        users::get_user_by_email(&self.pool, email).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        users::get_user(&self.pool, id).await
    }

    async fn update_profile(&self, id: Uuid, form: &ProfileForm) -> Result<User, ApiError> {
        users::update_profile(&self.pool, id, form).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, ApiError> {
        users::update_password(&self.pool, id, password_hash).await
    }

    async fn toggle_bookmark(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<BookmarkToggle, ApiError> {
        users::toggle_bookmark(&self.pool, user_id, recipe_id).await
    }

    async fn create_recipe(&self, owner: Uuid, form: &RecipeForm) -> Result<Recipe, ApiError> {
        recipes::create_recipe(&self.pool, owner, form).await
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, ApiError> {
        recipes::get_recipe(&self.pool, id).await
    }

    async fn recipe_detail(&self, id: Uuid) -> Result<Option<RecipeDetail>, ApiError> {
        recipes::get_recipe_detail(&self.pool, id).await
    }

    async fn update_recipe(&self, id: Uuid, form: &RecipeForm) -> Result<Recipe, ApiError> {
        recipes::update_recipe(&self.pool, id, form).await
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<(), ApiError> {
        recipes::delete_recipe(&self.pool, id).await
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        request: PageRequest,
    ) -> Result<Page<Recipe>, ApiError> {
        recipes::fetch_recipes(&self.pool, filter, request).await
    }

    async fn recipes_by_owner(&self, owner: Uuid) -> Result<Vec<Recipe>, ApiError> {
        recipes::list_user_recipes(&self.pool, owner).await
    }

    async fn recipes_liked_by(&self, user_id: Uuid) -> Result<Vec<Recipe>, ApiError> {
        recipes::list_liked_recipes(&self.pool, user_id).await
    }

    async fn bookmarked_recipes(&self, user_id: Uuid) -> Result<Vec<Recipe>, ApiError> {
        recipes::list_bookmarked_recipes(&self.pool, user_id).await
    }

    async fn top_keywords(&self, limit: usize) -> Result<Vec<KeywordCount>, ApiError> {
        recipes::top_keywords(&self.pool, limit).await
    }

    async fn most_liked(&self, limit: i64) -> Result<Vec<RankedRecipe>, ApiError> {
        recipes::most_liked_recipes(&self.pool, limit).await
    }

    async fn other_recipes(&self, exclude: Uuid, limit: i64) -> Result<Vec<Recipe>, ApiError> {
        recipes::other_recipes(&self.pool, exclude, limit).await
    }

    async fn toggle_like(&self, recipe_id: Uuid, user_id: Uuid) -> Result<LikeToggle, ApiError> {
        recipes::toggle_like(&self.pool, recipe_id, user_id).await
    }

    async fn add_comment(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        comment: &str,
    ) -> Result<CommentView, ApiError> {
        recipes::add_comment(&self.pool, recipe_id, user_id, comment).await
    }

    async fn create_product(&self, form: &ProductForm) -> Result<Product, ApiError> {
        products::create_product(&self.pool, form).await
    }

    async fn update_product(
        &self,
        id: Uuid,
        form: &ProductUpdateForm,
    ) -> Result<Product, ApiError> {
        products::update_product(&self.pool, id, form).await
    }

    async fn restock(&self, id: Uuid, quantity: i32) -> Result<Product, ApiError> {
        products::restock_product(&self.pool, id, quantity).await
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ApiError> {
        products::get_product(&self.pool, id).await
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
        request: PageRequest,
    ) -> Result<Page<Product>, ApiError> {
        products::fetch_products(&self.pool, filter, request).await
    }

    async fn filter_facets(&self) -> Result<FilterFacets, ApiError> {
        products::get_filter_facets(&self.pool).await
    }

    async fn place_order(&self, user_id: Uuid, draft: &OrderDraft) -> Result<Order, ApiError> {
        orders::create_order(&self.pool, user_id, draft).await
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, ApiError> {
        orders::list_user_orders(&self.pool, user_id).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>, ApiError> {
        orders::list_all_orders(&self.pool).await
    }

    async fn update_order_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, ApiError> {
        orders::update_order_status(&self.pool, id, next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_text_is_matched_literally() {
        assert_eq!(like_pattern("rice"), "%rice%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }
}
