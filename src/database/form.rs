use serde::Deserialize;
use uuid::Uuid;

use super::{
    error::ApiError,
    schema::{Difficulty, Ingredient, OrderStatus},
};
use crate::{constants::CASH_ON_DELIVERY, pagination::PageRequest};

fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(format!("{field} is required")));
    }
    Ok(())
}

/// Query strings send empty values for cleared inputs; those mean "no filter".
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        required(&self.full_name, "Full name")?;
        required(&self.password, "Password")?;
        if !self.email.contains('@') {
            return Err(ApiError::invalid("A valid email is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    pub image_url: Option<String>,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        required(&self.full_name, "Full name")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordForm {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeForm {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    pub time: Option<String>,
    #[serde(default)]
    pub servings: i32,
    pub difficulty: Difficulty,
    /// URL handed back by the object store after upload.
    #[serde(alias = "imageUrl")]
    pub image: Option<String>,
}

impl RecipeForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        required(&self.name, "Name")?;
        required(&self.category, "Category")?;
        if self.servings < 0 {
            return Err(ApiError::invalid("Servings cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub unit: String,
    pub quantity_in_stock: i32,
}

impl ProductForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        required(&self.name, "Name")?;
        required(&self.category, "Category")?;
        if !self.price.is_finite() || self.price < 0. {
            return Err(ApiError::invalid("Price must be a non-negative number"));
        }
        if self.quantity_in_stock < 0 {
            return Err(ApiError::invalid("Stock cannot be negative"));
        }
        Ok(())
    }
}

/// Descriptive fields of a product. Stock only changes through orders and restocking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdateForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub unit: String,
}

impl ProductUpdateForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        required(&self.name, "Name")?;
        required(&self.category, "Category")?;
        if !self.price.is_finite() || self.price < 0. {
            return Err(ApiError::invalid("Price must be a non-negative number"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockForm {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl RestockForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.quantity < 1 {
            return Err(ApiError::invalid("Restock quantity must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductSort {
    Latest,
    Oldest,
    PriceLowHigh,
    PriceHighLow,
    NameAZ,
    NameZA,
}

impl ProductSort {
    /// Unknown keys yield `None`, which callers treat as the default ordering.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "latest" => Some(Self::Latest),
            "oldest" => Some(Self::Oldest),
            "price-low-high" => Some(Self::PriceLowHigh),
            "price-high-low" => Some(Self::PriceHighLow),
            "name-a-z" => Some(Self::NameAZ),
            "name-z-a" => Some(Self::NameZA),
            _ => None,
        }
    }
}

impl Default for ProductSort {
    fn default() -> Self {
        Self::Latest
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilterQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub in_stock: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub in_stock: bool,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl ProductFilterQuery {
    pub fn into_filter(self, default_limit: i64) -> (ProductFilter, PageRequest) {
        let request = PageRequest::new(self.page, self.limit, default_limit);
        let filter = ProductFilter {
            category: non_empty(self.category),
            in_stock: self.in_stock.as_deref() == Some("true"),
            min_price: self.min_price,
            max_price: self.max_price,
            search: non_empty(self.search),
            sort: self
                .sort
                .as_deref()
                .and_then(ProductSort::from_key)
                .unwrap_or_default(),
        };

        (filter, request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeFilter {
    All,
    /// Exact category match.
    Category(String),
    /// Case-insensitive substring of the name or of any keyword.
    Search(String),
    /// Case-insensitive equality with one of the keywords.
    Keyword(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeCategoryQuery {
    #[serde(default)]
    pub category: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeSearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRecipesForm {
    pub keyword: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIdForm {
    pub recipe_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentForm {
    pub recipe_id: Uuid,
    pub comment: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        required(&self.comment, "Comment")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineForm {
    pub product_id: Uuid,
    pub quantity: i32,
    /// What the client displayed; the stored price comes from the product.
    pub current_unit_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderForm {
    pub phone_number: String,
    pub address: String,
    pub items: Vec<OrderLineForm>,
    pub subtotal: Option<f64>,
    pub delivery_charge: Option<f64>,
    pub total_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl OrderForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        required(&self.phone_number, "Phone number")?;
        required(&self.address, "Address")?;
        if self.items.is_empty() {
            return Err(ApiError::invalid("Your cart is empty"));
        }
        if self.items.iter().any(|item| item.quantity < 1) {
            return Err(ApiError::invalid("Every item needs a quantity of at least 1"));
        }
        match self.payment_method.as_deref() {
            None | Some(CASH_ON_DELIVERY) => {}
            Some(other) => {
                return Err(ApiError::invalid(format!(
                    "Unsupported payment method {other}"
                )))
            }
        }
        if let Some(status) = self.order_status {
            if status != OrderStatus::Pending {
                return Err(ApiError::invalid("New orders start as Pending"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusForm {
    pub order_id: Uuid,
    pub status: OrderStatus,
}
