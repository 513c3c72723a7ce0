use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    checkout::{OrderDraft, OrderTotals, PricedLine},
    error::ApiError,
    form::{
        ProductFilter, ProductForm, ProductSort, ProductUpdateForm, ProfileForm, RecipeFilter,
        RecipeForm,
    },
    pagination::{Page, PageRequest},
    ranking::{rank_keywords, KeywordCount},
    schema::{
        BookmarkToggle, Comment, CommentView, FilterFacets, LikeToggle, Order, OrderItem,
        OrderStatus, Product, PublicProfile, RankedRecipe, Recipe, RecipeDetail, User,
    },
    store::{NewUser, Store},
};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    recipes: Vec<Recipe>,
    comments: Vec<Comment>,
    products: Vec<Product>,
    orders: Vec<Order>,
    clock: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing timestamps keep "newest first" orderings deterministic.
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.clock {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.clock = Some(now);
        now
    }

    fn user_like_count(&self, user_id: Uuid) -> i64 {
        self.recipes
            .iter()
            .filter(|recipe| recipe.created_by == user_id)
            .map(|recipe| recipe.liked_users.len() as i64)
            .sum()
    }

    fn user_view(&self, user: &User) -> User {
        User {
            user_like_count: self.user_like_count(user.id),
            ..user.clone()
        }
    }

    fn find_user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    fn profile(&self, id: Uuid) -> Option<PublicProfile> {
        self.find_user(id).map(PublicProfile::from)
    }

    fn find_recipe(&self, id: Uuid) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| recipe.id == id)
    }

    fn find_product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    fn with_products(&self, mut order: Order) -> Order {
        order.items.iter_mut().for_each(|item| {
            item.product = self.find_product(item.product_id).cloned();
        });
        order
    }
}

fn recipe_view(recipe: &Recipe) -> Recipe {
    Recipe {
        likes_count: recipe.liked_users.len() as i64,
        ..recipe.clone()
    }
}

fn by_name(a: &Recipe, b: &Recipe) -> std::cmp::Ordering {
    a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
}

fn matches_recipe(recipe: &Recipe, filter: &RecipeFilter) -> bool {
    match filter {
        RecipeFilter::All => true,
        RecipeFilter::Category(category) => recipe.category == *category,
        RecipeFilter::Search(query) => {
            let query = query.trim().to_lowercase();
            recipe.name.to_lowercase().contains(&query)
                || recipe
                    .keywords
                    .iter()
                    .any(|keyword| keyword.to_lowercase().contains(&query))
        }
        RecipeFilter::Keyword(keyword) => {
            let keyword = keyword.trim().to_lowercase();
            recipe
                .keywords
                .iter()
                .any(|candidate| candidate.to_lowercase() == keyword)
        }
    }
}

fn matches_product(product: &Product, filter: &ProductFilter) -> bool {
    filter
        .category
        .as_ref()
        .map_or(true, |category| product.category == *category)
        && (!filter.in_stock || product.quantity_in_stock > 0)
        && filter.min_price.map_or(true, |min| product.price >= min)
        && filter.max_price.map_or(true, |max| product.price <= max)
        && filter.search.as_ref().map_or(true, |search| {
            product.name.to_lowercase().contains(&search.to_lowercase())
        })
}

fn sort_products(products: &mut [Product], sort: ProductSort) {
    products.sort_by(|a, b| {
        let order = match sort {
            ProductSort::Latest => b.updated_at.cmp(&a.updated_at),
            ProductSort::Oldest => a.updated_at.cmp(&b.updated_at),
            ProductSort::PriceLowHigh => a.price.total_cmp(&b.price),
            ProductSort::PriceHighLow => b.price.total_cmp(&a.price),
            ProductSort::NameAZ => a.name.cmp(&b.name),
            ProductSort::NameZA => b.name.cmp(&a.name),
        };
        order.then_with(|| a.id.cmp(&b.id))
    });
}

/// In-process store used by the tests and by runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError> {
        let mut state = self.state.write().await;
        let email = user.email.trim().to_lowercase();
        if state.users.iter().any(|existing| existing.email == email) {
            return Err(ApiError::Conflict("User already exists".to_string()));
        }

        let now = state.now();
        let created = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            email,
            password: user.password_hash,
            image_url: user.image_url,
            bio: user.bio,
            role: user.role,
            bookmarks: vec![],
            user_like_count: 0,
            credit_points: 0,
            created_at: now,
            updated_at: now,
        };
        state.users.push(created.clone());

        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let state = self.state.read().await;
        let email = email.trim().to_lowercase();

        Ok(state
            .users
            .iter()
            .find(|user| user.email == email)
            .map(|user| state.user_view(user)))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let state = self.state.read().await;
        Ok(state.find_user(id).map(|user| state.user_view(user)))
    }

    async fn update_profile(&self, id: Uuid, form: &ProfileForm) -> Result<User, ApiError> {
        let mut state = self.state.write().await;
        let now = state.now();
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or_else(|| ApiError::not_found("User"))?;

        user.full_name = form.full_name.trim().to_string();
        user.bio = form.bio.clone();
        if let Some(image_url) = &form.image_url {
            user.image_url = image_url.clone();
        }
        user.updated_at = now;

        let user = user.clone();
        Ok(state.user_view(&user))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, ApiError> {
        let mut state = self.state.write().await;
        let now = state.now();
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or_else(|| ApiError::not_found("User"))?;

        user.password = password_hash.to_string();
        user.updated_at = now;

        let user = user.clone();
        Ok(state.user_view(&user))
    }

    async fn toggle_bookmark(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<BookmarkToggle, ApiError> {
        let mut state = self.state.write().await;
        let recipe_exists = state.find_recipe(recipe_id).is_some();
        let now = state.now();
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| ApiError::not_found("User"))?;

        let bookmarked = if user.bookmarks.contains(&recipe_id) {
            user.bookmarks.retain(|id| *id != recipe_id);
            false
        } else {
            if !recipe_exists {
                return Err(ApiError::not_found("Recipe"));
            }
            user.bookmarks.push(recipe_id);
            true
        };
        user.updated_at = now;

        Ok(BookmarkToggle { bookmarked })
    }

    async fn create_recipe(&self, owner: Uuid, form: &RecipeForm) -> Result<Recipe, ApiError> {
        let mut state = self.state.write().await;
        if state.find_user(owner).is_none() {
            return Err(ApiError::not_found("User"));
        }

        let now = state.now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            name: form.name.trim().to_string(),
            category: form.category.trim().to_string(),
            instructions: form.instructions.clone(),
            keywords: form.keywords.clone(),
            ingredients: form.ingredients.clone(),
            time: form.time.clone(),
            servings: form.servings,
            difficulty: form.difficulty,
            image_url: form.image.clone(),
            created_by: owner,
            liked_users: vec![],
            likes_count: 0,
            is_popular: false,
            created_at: now,
            updated_at: now,
        };
        state.recipes.push(recipe.clone());

        Ok(recipe)
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, ApiError> {
        let state = self.state.read().await;
        Ok(state.find_recipe(id).map(recipe_view))
    }

    async fn recipe_detail(&self, id: Uuid) -> Result<Option<RecipeDetail>, ApiError> {
        let state = self.state.read().await;
        let recipe = match state.find_recipe(id) {
            Some(recipe) => recipe_view(recipe),
            None => return Ok(None),
        };
        let owner = state
            .profile(recipe.created_by)
            .ok_or_else(|| ApiError::not_found("User"))?;

        let mut comments: Vec<CommentView> = state
            .comments
            .iter()
            .filter(|comment| comment.recipe_id == id)
            .filter_map(|comment| {
                state.profile(comment.commented_by).map(|commented_by| CommentView {
                    id: comment.id,
                    commented_by,
                    comment: comment.comment.clone(),
                    created_at: comment.created_at,
                })
            })
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(Some(RecipeDetail {
            recipe,
            owner,
            comments,
        }))
    }

    async fn update_recipe(&self, id: Uuid, form: &RecipeForm) -> Result<Recipe, ApiError> {
        let mut state = self.state.write().await;
        let now = state.now();
        let recipe = state
            .recipes
            .iter_mut()
            .find(|recipe| recipe.id == id)
            .ok_or_else(|| ApiError::not_found("Recipe"))?;

        recipe.name = form.name.trim().to_string();
        recipe.category = form.category.trim().to_string();
        recipe.instructions = form.instructions.clone();
        recipe.keywords = form.keywords.clone();
        recipe.ingredients = form.ingredients.clone();
        recipe.time = form.time.clone();
        recipe.servings = form.servings;
        recipe.difficulty = form.difficulty;
        if let Some(image) = &form.image {
            recipe.image_url = Some(image.clone());
        }
        recipe.updated_at = now;

        Ok(recipe_view(recipe))
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        let before = state.recipes.len();
        state.recipes.retain(|recipe| recipe.id != id);
        if state.recipes.len() == before {
            return Err(ApiError::not_found("Recipe"));
        }

        state.comments.retain(|comment| comment.recipe_id != id);
        state
            .users
            .iter_mut()
            .for_each(|user| user.bookmarks.retain(|bookmark| *bookmark != id));

        Ok(())
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        request: PageRequest,
    ) -> Result<Page<Recipe>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|recipe| matches_recipe(recipe, filter))
            .map(recipe_view)
            .collect();
        rows.sort_by(by_name);

        Ok(Page::slice(rows, request))
    }

    async fn recipes_by_owner(&self, owner: Uuid) -> Result<Vec<Recipe>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|recipe| recipe.created_by == owner)
            .map(recipe_view)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(rows)
    }

    async fn recipes_liked_by(&self, user_id: Uuid) -> Result<Vec<Recipe>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|recipe| recipe.is_liked_by(user_id))
            .map(recipe_view)
            .collect();
        rows.sort_by(by_name);

        Ok(rows)
    }

    async fn bookmarked_recipes(&self, user_id: Uuid) -> Result<Vec<Recipe>, ApiError> {
        let state = self.state.read().await;
        let bookmarks = match state.find_user(user_id) {
            Some(user) => &user.bookmarks,
            None => return Ok(vec![]),
        };
        let mut rows: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|recipe| bookmarks.contains(&recipe.id))
            .map(recipe_view)
            .collect();
        rows.sort_by(by_name);

        Ok(rows)
    }

    async fn top_keywords(&self, limit: usize) -> Result<Vec<KeywordCount>, ApiError> {
        let state = self.state.read().await;
        Ok(rank_keywords(
            state.recipes.iter().map(|recipe| &recipe.keywords),
            limit,
        ))
    }

    async fn most_liked(&self, limit: i64) -> Result<Vec<RankedRecipe>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<Recipe> = state.recipes.iter().map(recipe_view).collect();
        rows.sort_by(|a, b| b.likes_count.cmp(&a.likes_count).then_with(|| by_name(a, b)));

        Ok(rows
            .into_iter()
            .filter_map(|recipe| {
                state
                    .profile(recipe.created_by)
                    .map(|owner| RankedRecipe { recipe, owner })
            })
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn other_recipes(&self, exclude: Uuid, limit: i64) -> Result<Vec<Recipe>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|recipe| recipe.id != exclude)
            .map(recipe_view)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        rows.truncate(limit.max(0) as usize);

        Ok(rows)
    }

    async fn toggle_like(&self, recipe_id: Uuid, user_id: Uuid) -> Result<LikeToggle, ApiError> {
        let mut state = self.state.write().await;
        let recipe = state
            .recipes
            .iter_mut()
            .find(|recipe| recipe.id == recipe_id)
            .ok_or_else(|| ApiError::not_found("Recipe"))?;

        let liked = if recipe.is_liked_by(user_id) {
            recipe.liked_users.retain(|id| *id != user_id);
            false
        } else {
            recipe.liked_users.push(user_id);
            true
        };
        recipe.likes_count = recipe.liked_users.len() as i64;

        Ok(LikeToggle {
            liked,
            likes_count: recipe.likes_count,
        })
    }

    async fn add_comment(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        comment: &str,
    ) -> Result<CommentView, ApiError> {
        let mut state = self.state.write().await;
        if state.find_recipe(recipe_id).is_none() {
            return Err(ApiError::not_found("Recipe"));
        }
        let commented_by = state
            .profile(user_id)
            .ok_or_else(|| ApiError::not_found("User"))?;

        let stored = Comment {
            id: Uuid::new_v4(),
            recipe_id,
            commented_by: user_id,
            comment: comment.trim().to_string(),
            created_at: state.now(),
        };
        let view = CommentView {
            id: stored.id,
            commented_by,
            comment: stored.comment.clone(),
            created_at: stored.created_at,
        };
        state.comments.push(stored);

        Ok(view)
    }

    async fn create_product(&self, form: &ProductForm) -> Result<Product, ApiError> {
        let mut state = self.state.write().await;
        let now = state.now();
        let product = Product {
            id: Uuid::new_v4(),
            name: form.name.trim().to_string(),
            description: form.description.clone(),
            price: form.price,
            quantity_in_stock: form.quantity_in_stock,
            category: form.category.trim().to_string(),
            unit: form.unit.clone(),
            image_url: form.image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());

        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        form: &ProductUpdateForm,
    ) -> Result<Product, ApiError> {
        let mut state = self.state.write().await;
        let now = state.now();
        let product = state
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| ApiError::not_found("Product"))?;

        product.name = form.name.trim().to_string();
        product.description = form.description.clone();
        product.price = form.price;
        product.category = form.category.trim().to_string();
        product.unit = form.unit.clone();
        if let Some(image_url) = &form.image_url {
            product.image_url = Some(image_url.clone());
        }
        product.updated_at = now;

        Ok(product.clone())
    }

    async fn restock(&self, id: Uuid, quantity: i32) -> Result<Product, ApiError> {
        let mut state = self.state.write().await;
        let now = state.now();
        let product = state
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| ApiError::not_found("Product"))?;

        product.quantity_in_stock = product
            .quantity_in_stock
            .checked_add(quantity)
            .ok_or_else(|| ApiError::invalid("Restock quantity is too large"))?;
        product.updated_at = now;

        Ok(product.clone())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ApiError> {
        let state = self.state.read().await;
        Ok(state.find_product(id).cloned())
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
        request: PageRequest,
    ) -> Result<Page<Product>, ApiError> {
        let state = self.state.read().await;
        let mut rows: Vec<Product> = state
            .products
            .iter()
            .filter(|product| matches_product(product, filter))
            .cloned()
            .collect();
        sort_products(&mut rows, filter.sort);

        Ok(Page::slice(rows, request))
    }

    async fn filter_facets(&self) -> Result<FilterFacets, ApiError> {
        let state = self.state.read().await;
        let categories: BTreeSet<String> = state
            .products
            .iter()
            .map(|product| product.category.clone())
            .collect();
        let prices = state.products.iter().map(|product| product.price);
        let min = prices.clone().reduce(f64::min);
        let max = prices.reduce(f64::max);

        Ok(FilterFacets::from_prices(
            categories.into_iter().collect(),
            min,
            max,
        ))
    }

    async fn place_order(&self, user_id: Uuid, draft: &OrderDraft) -> Result<Order, ApiError> {
        let mut state = self.state.write().await;

        // Every line is checked against the staged stock before anything is written.
        let mut staged: HashMap<Uuid, i32> = HashMap::new();
        let mut priced: Vec<PricedLine> = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = state
                .find_product(line.product_id)
                .ok_or_else(|| ApiError::not_found(format!("Product {}", line.product_id)))?;
            let available = staged
                .get(&product.id)
                .copied()
                .unwrap_or(product.quantity_in_stock);
            if available < line.quantity {
                return Err(ApiError::InsufficientStock(product.name.clone()));
            }

            staged.insert(product.id, available - line.quantity);
            priced.push(PricedLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        let now = state.now();
        state.products.iter_mut().for_each(|product| {
            if let Some(remaining) = staged.get(&product.id) {
                product.quantity_in_stock = *remaining;
                product.updated_at = now;
            }
        });

        let totals = OrderTotals::compute(&priced, draft.delivery_charge);
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            phone_number: draft.phone_number.clone(),
            address: draft.address.clone(),
            items: priced
                .iter()
                .map(|line| OrderItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    current_unit_price: line.unit_price,
                    product: None,
                })
                .collect(),
            subtotal: totals.subtotal,
            delivery_charge: totals.delivery_charge,
            total_amount: totals.total_amount,
            payment_method: draft.payment_method.clone(),
            order_status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            user: None,
        };
        state.orders.push(order.clone());
        log::info!(
            "Order {} placed by {user_id}: {} lines, total {}",
            order.id,
            priced.len(),
            totals.total_amount
        );

        Ok(state.with_products(order))
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, ApiError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|order| order.user_id == user_id)
            .map(|order| state.with_products(order.clone()))
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>, ApiError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter_map(|order| {
                let user = state.profile(order.user_id)?;
                let mut order = state.with_products(order.clone());
                order.user = Some(user);
                Some(order)
            })
            .collect())
    }

    async fn update_order_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, ApiError> {
        let mut state = self.state.write().await;
        let now = state.now();
        let order = state
            .orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or_else(|| ApiError::not_found("Order"))?;

        order.order_status = order.order_status.transition(next)?;
        order.updated_at = now;

        let order = order.clone();
        Ok(state.with_products(order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        checkout::OrderLine,
        schema::{Difficulty, UserRole},
    };

    async fn customer(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                full_name: "Rahim".into(),
                email: email.into(),
                password_hash: "hash".into(),
                image_url: "avatar.png".into(),
                bio: String::new(),
                role: UserRole::Customer,
            })
            .await
            .unwrap()
    }

    fn recipe_form(name: &str, keywords: &[&str]) -> RecipeForm {
        RecipeForm {
            name: name.into(),
            category: "Dinner".into(),
            instructions: vec!["Cook".into()],
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ingredients: vec![],
            time: Some("20 min".into()),
            servings: 2,
            difficulty: Difficulty::Easy,
            image: None,
        }
    }

    fn product_form(name: &str, price: f64, stock: i32) -> ProductForm {
        ProductForm {
            name: name.into(),
            description: String::new(),
            price,
            category: "Grains".into(),
            image_url: None,
            unit: "kg".into(),
            quantity_in_stock: stock,
        }
    }

    fn draft(lines: Vec<OrderLine>) -> OrderDraft {
        OrderDraft {
            phone_number: "01700000000".into(),
            address: "Dhaka".into(),
            lines,
            payment_method: "Cash on Delivery".into(),
            delivery_charge: 60.,
        }
    }

    #[tokio::test]
    async fn emails_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        customer(&store, "cook@example.com").await;

        let duplicate = store
            .create_user(NewUser {
                full_name: "Other".into(),
                email: "COOK@example.com".into(),
                password_hash: "hash".into(),
                image_url: String::new(),
                bio: String::new(),
                role: UserRole::Customer,
            })
            .await;
        assert!(matches!(duplicate, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn failed_line_leaves_every_stock_untouched() {
        let store = MemoryStore::new();
        let user = customer(&store, "buyer@example.com").await;
        let rice = store.create_product(&product_form("Rice", 2., 10)).await.unwrap();
        let lentils = store.create_product(&product_form("Lentils", 3., 1)).await.unwrap();

        let result = store
            .place_order(
                user.id,
                &draft(vec![
                    OrderLine { product_id: rice.id, quantity: 4 },
                    OrderLine { product_id: lentils.id, quantity: 2 },
                ]),
            )
            .await;
        assert!(matches!(result, Err(ApiError::InsufficientStock(name)) if name == "Lentils"));

        let rice = store.get_product(rice.id).await.unwrap().unwrap();
        let lentils = store.get_product(lentils.id).await.unwrap().unwrap();
        assert_eq!(rice.quantity_in_stock, 10);
        assert_eq!(lentils.quantity_in_stock, 1);
        assert!(store.orders_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_lines_share_the_stock() {
        let store = MemoryStore::new();
        let user = customer(&store, "buyer@example.com").await;
        let rice = store.create_product(&product_form("Rice", 2., 5)).await.unwrap();
        let line = OrderLine { product_id: rice.id, quantity: 3 };

        let result = store.place_order(user.id, &draft(vec![line, line])).await;
        assert!(matches!(result, Err(ApiError::InsufficientStock(_))));
        assert_eq!(
            store.get_product(rice.id).await.unwrap().unwrap().quantity_in_stock,
            5
        );
    }

    #[tokio::test]
    async fn deleting_a_recipe_clears_bookmarks_and_comments() {
        let store = MemoryStore::new();
        let owner = customer(&store, "owner@example.com").await;
        let reader = customer(&store, "reader@example.com").await;
        let recipe = store
            .create_recipe(owner.id, &recipe_form("Biryani", &["rice"]))
            .await
            .unwrap();

        store.toggle_bookmark(reader.id, recipe.id).await.unwrap();
        store.add_comment(recipe.id, reader.id, "Lovely").await.unwrap();
        store.delete_recipe(recipe.id).await.unwrap();

        let reader = store.get_user(reader.id).await.unwrap().unwrap();
        assert!(reader.bookmarks.is_empty());
        assert!(store.recipe_detail(recipe.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_recipe(recipe.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn comments_are_listed_newest_first() {
        let store = MemoryStore::new();
        let owner = customer(&store, "owner@example.com").await;
        let recipe = store
            .create_recipe(owner.id, &recipe_form("Dal", &[]))
            .await
            .unwrap();

        store.add_comment(recipe.id, owner.id, "first").await.unwrap();
        store.add_comment(recipe.id, owner.id, "second").await.unwrap();

        let detail = store.recipe_detail(recipe.id).await.unwrap().unwrap();
        let comments: Vec<&str> = detail.comments.iter().map(|c| c.comment.as_str()).collect();
        assert_eq!(comments, vec!["second", "first"]);
        assert_eq!(detail.owner.id, owner.id);
    }

    #[tokio::test]
    async fn bookmarking_a_missing_recipe_is_not_found() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader@example.com").await;

        let result = store.toggle_bookmark(user.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
