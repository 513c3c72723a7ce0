//! Runs the query layer against a real database. Every test returns early when
//! `DATABASE_URL` is not set.

use culinary_art::{
    actions::PgStore,
    checkout::{OrderDraft, OrderLine},
    error::ApiError,
    form::{ProductFilter, ProductForm, RecipeForm},
    pagination::PageRequest,
    schema::{Difficulty, OrderStatus, Product, User, UserRole},
    store::{NewUser, Store},
    CASH_ON_DELIVERY,
};
use uuid::Uuid;

async fn connect() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(PgStore::connect(&url, 20).await.unwrap())
}

fn tag() -> String {
    Uuid::new_v4().simple().to_string()
}

async fn user(store: &PgStore, name: &str) -> User {
    store
        .create_user(NewUser {
            full_name: name.into(),
            email: format!("{}-{}@example.com", name.to_lowercase(), tag()),
            password_hash: "hash".into(),
            image_url: "avatar.png".into(),
            bio: String::new(),
            role: UserRole::Customer,
        })
        .await
        .unwrap()
}

async fn product(store: &PgStore, name: &str, category: &str, stock: i32) -> Product {
    store
        .create_product(&ProductForm {
            name: name.into(),
            description: String::new(),
            price: 10.,
            category: category.into(),
            image_url: None,
            unit: "kg".into(),
            quantity_in_stock: stock,
        })
        .await
        .unwrap()
}

fn draft(lines: &[(Uuid, i32)]) -> OrderDraft {
    OrderDraft {
        phone_number: "01711000000".into(),
        address: "12 Lake Road".into(),
        lines: lines
            .iter()
            .map(|&(product_id, quantity)| OrderLine {
                product_id,
                quantity,
            })
            .collect(),
        payment_method: CASH_ON_DELIVERY.into(),
        delivery_charge: 60.,
    }
}

async fn stock(store: &PgStore, id: Uuid) -> i32 {
    store.get_product(id).await.unwrap().unwrap().quantity_in_stock
}

#[tokio::test]
async fn failing_line_rolls_back_the_order() {
    let Some(store) = connect().await else { return };
    let buyer = user(&store, "Buyer").await;
    let rice = product(&store, "Rice", "Grains", 5).await;
    let dal = product(&store, "Dal", "Grains", 10).await;

    let order = store
        .place_order(buyer.id, &draft(&[(rice.id, 3)]))
        .await
        .unwrap();
    assert_eq!(order.total_amount, 90.);
    assert_eq!(stock(&store, rice.id).await, 2);

    let err = store
        .place_order(buyer.id, &draft(&[(dal.id, 4), (rice.id, 3)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InsufficientStock(ref name) if name == "Rice"));
    assert_eq!(stock(&store, rice.id).await, 2);
    assert_eq!(stock(&store, dal.id).await, 10);
    assert_eq!(store.orders_for_user(buyer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn items_keep_the_cart_order() {
    let Some(store) = connect().await else { return };
    let buyer = user(&store, "Buyer").await;
    let a = product(&store, "Atta", "Grains", 5).await;
    let b = product(&store, "Besan", "Grains", 5).await;
    let (first, second) = if a.id > b.id { (a, b) } else { (b, a) };

    let order = store
        .place_order(buyer.id, &draft(&[(first.id, 1), (second.id, 2)]))
        .await
        .unwrap();
    let ids: Vec<Uuid> = order.items.iter().map(|item| item.product_id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(order.items[1].quantity, 2);
}

#[tokio::test]
async fn overlapping_carts_in_opposite_order_all_succeed() {
    let Some(store) = connect().await else { return };
    let buyer = user(&store, "Buyer").await;
    let x = product(&store, "Ghee", "Dairy", 100).await;
    let y = product(&store, "Milk", "Dairy", 100).await;
    let (buyer, x, y) = (buyer.id, x.id, y.id);

    let tasks: Vec<_> = (0..20)
        .map(|n| {
            let store = store.clone();
            let lines = if n % 2 == 0 {
                [(x, 1), (y, 1)]
            } else {
                [(y, 1), (x, 1)]
            };
            tokio::spawn(async move { store.place_order(buyer, &draft(&lines)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(stock(&store, x).await, 80);
    assert_eq!(stock(&store, y).await, 80);
}

#[tokio::test]
async fn last_unit_goes_to_one_buyer() {
    let Some(store) = connect().await else { return };
    let buyer = user(&store, "Buyer").await;
    let saffron = product(&store, "Saffron", "Spices", 1).await;
    let (buyer, id) = (buyer.id, saffron.id);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.place_order(buyer, &draft(&[(id, 1)])).await })
        })
        .collect();
    let mut placed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert!(matches!(err, ApiError::InsufficientStock(_)), "{err:?}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(stock(&store, id).await, 0);
}

#[tokio::test]
async fn racing_status_updates_have_one_winner() {
    let Some(store) = connect().await else { return };
    let buyer = user(&store, "Buyer").await;
    let salt = product(&store, "Salt", "Spices", 10).await;
    let order = store
        .place_order(buyer.id, &draft(&[(salt.id, 1)]))
        .await
        .unwrap();
    let id = order.id;

    let updates: Vec<_> = [OrderStatus::Confirmed, OrderStatus::Cancelled]
        .into_iter()
        .map(|next| {
            let store = store.clone();
            tokio::spawn(async move { store.update_order_status(id, next).await })
        })
        .collect();
    let mut winners = vec![];
    for update in updates {
        match update.await.unwrap() {
            Ok(order) => winners.push(order.order_status),
            Err(err) => assert!(
                matches!(err, ApiError::Conflict(_) | ApiError::InvalidTransition { .. }),
                "{err:?}"
            ),
        }
    }

    assert_eq!(winners.len(), 1);
    let stored = store.orders_for_user(buyer.id).await.unwrap();
    assert_eq!(stored[0].order_status, winners[0]);

    let err = store
        .update_order_status(id, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidTransition { .. }));
}

#[tokio::test]
async fn like_round_trip_restores_counts() {
    let Some(store) = connect().await else { return };
    let owner = user(&store, "Owner").await;
    let fan = user(&store, "Fan").await;
    let recipe = store
        .create_recipe(owner.id, &recipe_form("Kacchi", vec![]))
        .await
        .unwrap();

    let liked = store.toggle_like(recipe.id, fan.id).await.unwrap();
    assert!(liked.liked);
    assert_eq!(liked.likes_count, 1);
    let owner_now = store.get_user(owner.id).await.unwrap().unwrap();
    assert_eq!(owner_now.user_like_count, 1);
    assert_eq!(store.recipes_liked_by(fan.id).await.unwrap().len(), 1);

    let unliked = store.toggle_like(recipe.id, fan.id).await.unwrap();
    assert!(!unliked.liked);
    assert_eq!(unliked.likes_count, 0);
    let owner_now = store.get_user(owner.id).await.unwrap().unwrap();
    assert_eq!(owner_now.user_like_count, 0);
    let recipe = store.get_recipe(recipe.id).await.unwrap().unwrap();
    assert!(recipe.liked_users.is_empty());
}

#[tokio::test]
async fn keywords_are_ranked_case_insensitively() {
    let Some(store) = connect().await else { return };
    let owner = user(&store, "Owner").await;
    let spicy = format!("spicy{}", tag());
    let quick = format!("quick{}", tag());
    let words = |list: &[&String], upper: bool| -> Vec<String> {
        list.iter()
            .map(|w| if upper { w.to_uppercase() } else { w.to_string() })
            .collect()
    };
    store
        .create_recipe(owner.id, &recipe_form("One", words(&[&spicy, &quick], true)))
        .await
        .unwrap();
    store
        .create_recipe(owner.id, &recipe_form("Two", words(&[&spicy], false)))
        .await
        .unwrap();

    let ranked = store.top_keywords(100_000).await.unwrap();
    let count = |keyword: &str| {
        ranked
            .iter()
            .find(|k| k.keyword == keyword)
            .map(|k| k.count)
    };
    assert_eq!(count(&spicy), Some(2));
    assert_eq!(count(&quick), Some(1));
}

#[tokio::test]
async fn search_wildcards_match_literally() {
    let Some(store) = connect().await else { return };
    let category = format!("Deals-{}", tag());
    product(&store, "Ghee 50% off", &category, 1).await;
    product(&store, "Ghee 500g", &category, 1).await;
    product(&store, "Ghee_pack", &category, 1).await;

    let search = |text: &str| ProductFilter {
        category: Some(category.clone()),
        search: Some(text.into()),
        ..Default::default()
    };
    let request = PageRequest::new(None, None, 12);

    let page = store.filter_products(&search("50%"), request).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Ghee 50% off");

    let page = store.filter_products(&search("_"), request).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Ghee_pack");
}

#[tokio::test]
async fn restock_overflow_is_a_bad_request() {
    let Some(store) = connect().await else { return };
    let oil = product(&store, "Oil", "Oils", i32::MAX - 1).await;

    let err = store.restock(oil.id, 5).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)), "{err:?}");
    assert_eq!(stock(&store, oil.id).await, i32::MAX - 1);

    let err = store.restock(Uuid::new_v4(), 5).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

fn recipe_form(name: &str, keywords: Vec<String>) -> RecipeForm {
    RecipeForm {
        name: name.into(),
        category: "Dinner".into(),
        instructions: vec![],
        keywords,
        ingredients: vec![],
        time: None,
        servings: 2,
        difficulty: Difficulty::Easy,
        image: None,
    }
}
