use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::like_pattern;
use crate::{
    error::ApiError,
    form::{ProductFilter, ProductForm, ProductSort, ProductUpdateForm},
    pagination::{Page, PageRequest},
    schema::{FilterFacets, Product},
};

fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Latest => "p.updated_at DESC, p.id",
        ProductSort::Oldest => "p.updated_at ASC, p.id",
        ProductSort::PriceLowHigh => "p.price ASC, p.id",
        ProductSort::PriceHighLow => "p.price DESC, p.id",
        ProductSort::NameAZ => "p.name ASC, p.id",
        ProductSort::NameZA => "p.name DESC, p.id",
    }
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a ProductFilter) {
    builder.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        builder.push(" AND p.category = ").push_bind(category);
    }
    if filter.in_stock {
        builder.push(" AND p.quantity_in_stock > 0");
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND p.name ILIKE ")
            .push_bind(like_pattern(search))
            .push(" ESCAPE '\\'");
    }
}

pub async fn fetch_products(
    pool: &Pool<Postgres>,
    filter: &ProductFilter,
    request: PageRequest,
) -> Result<Page<Product>, ApiError> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products p");
    push_filter(&mut count, filter);
    let (total,): (i64,) = count.build_query_as().fetch_one(pool).await?;

    let mut select = QueryBuilder::new("SELECT p.* FROM products p");
    push_filter(&mut select, filter);
    select
        .push(" ORDER BY ")
        .push(order_by(filter.sort))
        .push(" LIMIT ")
        .push_bind(request.limit)
        .push(" OFFSET ")
        .push_bind(request.offset());
    let rows: Vec<Product> = select.build_query_as().fetch_all(pool).await?;

    Ok(Page::from_rows(rows, total, request))
}

pub async fn get_filter_facets(pool: &Pool<Postgres>) -> Result<FilterFacets, ApiError> {
    let categories: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT category FROM products ORDER BY category")
            .fetch_all(pool)
            .await?;

    let (min, max): (Option<f64>, Option<f64>) =
        sqlx::query_as("SELECT MIN(price), MAX(price) FROM products")
            .fetch_one(pool)
            .await?;

    Ok(FilterFacets::from_prices(
        categories.into_iter().map(|(c,)| c).collect(),
        min,
        max,
    ))
}

pub async fn get_product(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Product>, ApiError> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(product)
}

pub async fn create_product(pool: &Pool<Postgres>, form: &ProductForm) -> Result<Product, ApiError> {
    let product: Product = sqlx::query_as(
        "
        INSERT INTO products (name, description, price, quantity_in_stock, category, unit, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *;
    ",
    )
    .bind(form.name.trim())
    .bind(&form.description)
    .bind(form.price)
    .bind(form.quantity_in_stock)
    .bind(form.category.trim())
    .bind(&form.unit)
    .bind(&form.image_url)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn update_product(
    pool: &Pool<Postgres>,
    id: Uuid,
    form: &ProductUpdateForm,
) -> Result<Product, ApiError> {
    let product: Option<Product> = sqlx::query_as(
        "
        UPDATE products
        SET name = $2, description = $3, price = $4, category = $5, unit = $6,
            image_url = COALESCE($7, image_url), updated_at = now()
        WHERE id = $1
        RETURNING *;
    ",
    )
    .bind(id)
    .bind(form.name.trim())
    .bind(&form.description)
    .bind(form.price)
    .bind(form.category.trim())
    .bind(&form.unit)
    .bind(&form.image_url)
    .fetch_optional(pool)
    .await?;

    product.ok_or_else(|| ApiError::not_found("Product"))
}

pub async fn restock_product(
    pool: &Pool<Postgres>,
    id: Uuid,
    quantity: i32,
) -> Result<Product, ApiError> {
    let product: Option<Product> = sqlx::query_as(
        "
        UPDATE products
        SET quantity_in_stock = quantity_in_stock + $2, updated_at = now()
        WHERE id = $1 AND quantity_in_stock <= 2147483647 - $2
        RETURNING *;
    ",
    )
    .bind(id)
    .bind(quantity)
    .fetch_optional(pool)
    .await?;

    match product {
        Some(product) => Ok(product),
        None if get_product(pool, id).await?.is_some() => {
            Err(ApiError::invalid("Restock quantity is too large"))
        }
        None => Err(ApiError::not_found("Product")),
    }
}
