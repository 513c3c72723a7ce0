use serde_json::json;
use uuid::Uuid;
use warp::{filters::BoxedFilter, reject::Rejection, Filter};

use super::{created, json_body, ok, Response};
use crate::{
    constants::PRODUCT_COUNT_PER_PAGE,
    error::ApiError,
    form::{ProductFilterQuery, ProductForm, ProductUpdateForm, RestockForm},
    jwt::Session,
    middleware::with_session,
    permissions::ActionType,
    state::{with_state, AppState},
};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let filtered = warp::path!("api" / "products")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(warp::query::<ProductFilterQuery>())
        .and_then(filtered);

    let facets = warp::path!("api" / "products" / "filter-data")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(facets);

    let single = warp::path!("api" / "products" / "single-product" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(single);

    let create = warp::path!("api" / "products" / "create-product")
        .and(warp::post())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(create);

    let update = warp::path!("api" / "products" / "update-product" / Uuid)
        .and(warp::put())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(update);

    let restock = warp::path!("api" / "products" / "restock")
        .and(warp::patch())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state))
        .and(json_body())
        .and_then(restock);

    filtered
        .or(facets)
        .unify()
        .or(single)
        .unify()
        .or(create)
        .unify()
        .or(update)
        .unify()
        .or(restock)
        .unify()
        .boxed()
}

async fn filtered(state: AppState, query: ProductFilterQuery) -> Result<Response, Rejection> {
    let (filter, request) = query.into_filter(PRODUCT_COUNT_PER_PAGE);
    let page = state.store.filter_products(&filter, request).await?;

    Ok(ok(json!({
        "products": page.items,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

async fn facets(state: AppState) -> Result<Response, Rejection> {
    let facets = state.store.filter_facets().await?;

    Ok(ok(json!(facets)))
}

async fn single(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;

    Ok(ok(json!({
        "success": true,
        "message": "Product fetched successfully",
        "data": product,
    })))
}

async fn create(session: Session, state: AppState, form: ProductForm) -> Result<Response, Rejection> {
    session.authorize(ActionType::ManageProducts)?;
    form.validate()?;
    let product = state.store.create_product(&form).await?;
    log::info!("Product {} created", product.id);

    Ok(created(json!({
        "success": true,
        "message": "Product created successfully",
        "data": product,
    })))
}

async fn update(
    id: Uuid,
    session: Session,
    state: AppState,
    form: ProductUpdateForm,
) -> Result<Response, Rejection> {
    session.authorize(ActionType::ManageProducts)?;
    form.validate()?;
    let product = state.store.update_product(id, &form).await?;

    Ok(ok(json!({
        "success": true,
        "message": "Product updated successfully",
        "data": product,
    })))
}

async fn restock(session: Session, state: AppState, form: RestockForm) -> Result<Response, Rejection> {
    session.authorize(ActionType::ManageProducts)?;
    form.validate()?;
    let product = state.store.restock(form.product_id, form.quantity).await?;
    log::info!(
        "Product {} restocked by {}, now {}",
        product.id,
        form.quantity,
        product.quantity_in_stock
    );

    Ok(ok(json!({
        "success": true,
        "message": "Product restocked successfully",
        "data": product,
    })))
}
