use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, sqlx::Type, Serialize, Deserialize, Eq, Hash)]
#[sqlx(type_name = "difficulty")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Clone, Copy, Debug, PartialEq, sqlx::Type, Serialize, Deserialize, Eq, Hash)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /* transition table */
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    pub fn transition(self, next: Self) -> Result<Self, ApiError> {
        if !self.can_transition_to(next) {
            return Err(ApiError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        Ok(next)
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub image_url: String,
    pub bio: String,
    pub role: UserRole,
    pub bookmarks: Vec<Uuid>,
    /// Likes received across every recipe this user owns.
    pub user_like_count: i64,
    pub credit_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The only user fields exposed when a user is joined onto another entity.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub full_name: String,
    pub image_url: String,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.to_owned(),
            image_url: user.image_url.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub bio: String,
    pub user_like_count: i64,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            profile: user.into(),
            bio: user.bio.to_owned(),
            user_like_count: user.user_like_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub instructions: Vec<String>,
    pub keywords: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub time: Option<String>,
    pub servings: i32,
    pub difficulty: Difficulty,
    pub image_url: Option<String>,
    pub created_by: Uuid,
    pub liked_users: Vec<Uuid>,
    pub likes_count: i64,
    pub is_popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.liked_users.contains(&user_id)
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub instructions: Vec<String>,
    pub keywords: Vec<String>,
    pub ingredients: Json<Vec<Ingredient>>,
    pub time: Option<String>,
    pub servings: i32,
    pub difficulty: Difficulty,
    pub image_url: Option<String>,
    pub created_by: Uuid,
    pub liked_users: Vec<Uuid>,
    pub is_popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            likes_count: row.liked_users.len() as i64,
            id: row.id,
            name: row.name,
            category: row.category,
            instructions: row.instructions,
            keywords: row.keywords,
            ingredients: row.ingredients.0,
            time: row.time,
            servings: row.servings,
            difficulty: row.difficulty,
            image_url: row.image_url,
            created_by: row.created_by,
            liked_users: row.liked_users,
            is_popular: row.is_popular,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub commented_by: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub commented_by: PublicProfile,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub owner: PublicProfile,
    /// Newest first.
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub owner: PublicProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookmarkToggle {
    pub bookmarked: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity_in_stock: i32,
    pub category: String,
    pub unit: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFacets {
    pub categories: Vec<String>,
    pub price_range: PriceRange,
}

impl FilterFacets {
    /// Rounds the observed prices outwards; an empty catalog reports the default range.
    pub fn from_prices(categories: Vec<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let (default_min, default_max) = crate::constants::DEFAULT_PRICE_RANGE;
        Self {
            categories,
            price_range: PriceRange {
                min: min.map(f64::floor).unwrap_or(default_min),
                max: max.map(f64::ceil).unwrap_or(default_max),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Price per unit captured when the order was placed.
    pub current_unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone_number: String,
    pub address: String,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub delivery_charge: f64,
    pub total_amount: f64,
    pub payment_method: String,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicProfile>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone_number: String,
    pub address: String,
    pub subtotal: f64,
    pub delivery_charge: f64,
    pub total_amount: f64,
    pub payment_method: String,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn with_items(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            phone_number: self.phone_number,
            address: self.address,
            items,
            subtotal: self.subtotal,
            delivery_charge: self.delivery_charge,
            total_amount: self.total_amount,
            payment_method: self.payment_method,
            order_status: self.order_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_orders_can_be_confirmed_or_cancelled() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        let all = [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ];
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in all {
                assert!(terminal.transition(next).is_err());
            }
        }
    }

    #[test]
    fn shipping_follows_confirmation() {
        let status = OrderStatus::Pending
            .transition(OrderStatus::Confirmed)
            .and_then(|s| s.transition(OrderStatus::Shipped))
            .and_then(|s| s.transition(OrderStatus::Delivered));
        assert_eq!(status.ok(), Some(OrderStatus::Delivered));
        assert!(OrderStatus::Confirmed.transition(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn facets_round_outwards() {
        let facets = FilterFacets::from_prices(vec!["Spices".into()], Some(12.4), Some(99.1));
        assert_eq!(facets.price_range, PriceRange { min: 12., max: 100. });

        let empty = FilterFacets::from_prices(vec![], None, None);
        assert_eq!(empty.price_range, PriceRange { min: 0., max: 1000. });
    }

    #[test]
    fn order_status_serializes_as_label() {
        let value = serde_json::to_value(OrderStatus::Cancelled).unwrap();
        assert_eq!(value, serde_json::json!("Cancelled"));
        let parsed: OrderStatus = serde_json::from_str("\"Shipped\"").unwrap();
        assert_eq!(parsed, OrderStatus::Shipped);
    }
}
