#![allow(dead_code)]

use std::sync::Arc;

use culinary_art::{
    cryptography::hash_password,
    jwt::SessionKeys,
    memory::MemoryStore,
    routes,
    schema::{User, UserRole},
    state::AppState,
    store::{NewUser, Store},
    Cache, DEFAULT_DELIVERY_CHARGE,
};
use serde_json::{json, Value};
use warp::http::StatusCode;

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let keys = SessionKeys::new("integration-secret").unwrap();

        Self {
            state: AppState::new(store, keys, DEFAULT_DELIVERY_CHARGE),
        }
    }

    /// Same app with the recipe cache on, or `None` when `REDIS_URL` is not set.
    pub async fn cached() -> Option<Self> {
        let url = std::env::var("REDIS_URL").ok()?;
        let cache = Cache::connect(&url).await.unwrap();
        let app = Self::new();

        Some(Self {
            state: app.state.with_cache(cache),
        })
    }

    pub async fn call(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.reply(&routes::app(self.state.clone())).await;
        let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
        (response.status(), body)
    }

    /// Signs up through the API and returns the session token.
    pub async fn sign_up(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/users/create-user",
                None,
                Some(json!({ "fullName": name, "email": email, "password": "pa55word" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Admins are never created through the API.
    pub async fn admin(&self) -> (User, String) {
        let user = self
            .state
            .store
            .create_user(NewUser {
                full_name: "Store Admin".into(),
                email: "admin@culinary.test".into(),
                password_hash: hash_password("admin-pass").unwrap(),
                image_url: "admin.png".into(),
                bio: String::new(),
                role: UserRole::Admin,
            })
            .await
            .unwrap();
        let token = self.state.sessions.issue(&user).unwrap();
        (user, token)
    }

    pub async fn create_recipe(&self, token: &str, name: &str, keywords: &[&str]) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/recipes/create",
                Some(token),
                Some(json!({
                    "name": name,
                    "category": "Dinner",
                    "keywords": keywords,
                    "ingredients": [{ "name": "Rice", "quantity": "2 cups" }],
                    "instructions": ["Cook"],
                    "servings": 2,
                    "difficulty": "Easy"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_product(
        &self,
        admin_token: &str,
        name: &str,
        category: &str,
        price: f64,
        stock: i32,
    ) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/products/create-product",
                Some(admin_token),
                Some(json!({
                    "name": name,
                    "description": "",
                    "price": price,
                    "category": category,
                    "unit": "kg",
                    "quantityInStock": stock
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}
