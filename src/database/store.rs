use async_trait::async_trait;
use uuid::Uuid;

use super::{
    checkout::OrderDraft,
    error::ApiError,
    form::{ProductFilter, ProductForm, ProductUpdateForm, ProfileForm, RecipeFilter, RecipeForm},
    pagination::{Page, PageRequest},
    ranking::KeywordCount,
    schema::{
        BookmarkToggle, CommentView, FilterFacets, LikeToggle, Order, OrderStatus, Product,
        RankedRecipe, Recipe, RecipeDetail, User, UserRole,
    },
};

/// A user about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub image_url: String,
    pub bio: String,
    pub role: UserRole,
}

/// Persistence contract for the whole service. Handlers only talk to this.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn update_profile(&self, id: Uuid, form: &ProfileForm) -> Result<User, ApiError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, ApiError>;
    /// Only adding a bookmark requires the recipe to exist.
    async fn toggle_bookmark(&self, user_id: Uuid, recipe_id: Uuid)
        -> Result<BookmarkToggle, ApiError>;

    // Recipes
    async fn create_recipe(&self, owner: Uuid, form: &RecipeForm) -> Result<Recipe, ApiError>;
    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, ApiError>;
    async fn recipe_detail(&self, id: Uuid) -> Result<Option<RecipeDetail>, ApiError>;
    async fn update_recipe(&self, id: Uuid, form: &RecipeForm) -> Result<Recipe, ApiError>;
    /// Also drops the recipe's comments and removes it from every bookmark set.
    async fn delete_recipe(&self, id: Uuid) -> Result<(), ApiError>;
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        request: PageRequest,
    ) -> Result<Page<Recipe>, ApiError>;
    async fn recipes_by_owner(&self, owner: Uuid) -> Result<Vec<Recipe>, ApiError>;
    async fn recipes_liked_by(&self, user_id: Uuid) -> Result<Vec<Recipe>, ApiError>;
    async fn bookmarked_recipes(&self, user_id: Uuid) -> Result<Vec<Recipe>, ApiError>;
    async fn top_keywords(&self, limit: usize) -> Result<Vec<KeywordCount>, ApiError>;
    async fn most_liked(&self, limit: i64) -> Result<Vec<RankedRecipe>, ApiError>;
    async fn other_recipes(&self, exclude: Uuid, limit: i64) -> Result<Vec<Recipe>, ApiError>;
    async fn toggle_like(&self, recipe_id: Uuid, user_id: Uuid) -> Result<LikeToggle, ApiError>;
    async fn add_comment(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        comment: &str,
    ) -> Result<CommentView, ApiError>;

    // Products
    async fn create_product(&self, form: &ProductForm) -> Result<Product, ApiError>;
    async fn update_product(&self, id: Uuid, form: &ProductUpdateForm)
        -> Result<Product, ApiError>;
    async fn restock(&self, id: Uuid, quantity: i32) -> Result<Product, ApiError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ApiError>;
    async fn filter_products(
        &self,
        filter: &ProductFilter,
        request: PageRequest,
    ) -> Result<Page<Product>, ApiError>;
    async fn filter_facets(&self) -> Result<FilterFacets, ApiError>;

    // Orders
    /// Every line is checked and decremented, then the order is written, all or nothing.
    async fn place_order(&self, user_id: Uuid, draft: &OrderDraft) -> Result<Order, ApiError>;
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, ApiError>;
    async fn all_orders(&self) -> Result<Vec<Order>, ApiError>;
    async fn update_order_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, ApiError>;
}
