use serde_json::json;
use warp::{filters::BoxedFilter, reject::Rejection, Filter};

use super::{created, json_body, ok, Response};
use crate::{
    checkout::{OrderDraft, OrderTotals},
    form::{OrderForm, OrderStatusForm},
    jwt::Session,
    middleware::with_session,
    permissions::ActionType,
    state::{with_state, AppState},
};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let create = warp::path!("api" / "orders" / "create-order")
        .and(warp::post())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(create);

    let own = warp::path!("api" / "orders" / "user-orders")
        .and(warp::get())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and_then(own);

    let all = warp::path!("api" / "orders" / "all-orders")
        .and(warp::get())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and_then(all);

    let update_status = warp::path!("api" / "orders" / "update-order")
        .and(warp::patch())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state))
        .and(json_body())
        .and_then(update_status);

    create
        .or(own)
        .unify()
        .or(all)
        .unify()
        .or(update_status)
        .unify()
        .boxed()
}

async fn create(session: Session, state: AppState, form: OrderForm) -> Result<Response, Rejection> {
    session.authorize(ActionType::PlaceOrders)?;
    let draft = OrderDraft::from_form(&form, state.delivery_charge)?;
    let order = state.store.place_order(session.user_id, &draft).await?;
    OrderTotals::from(&order).report_mismatch(&form);

    Ok(created(json!({
        "success": true,
        "message": "Order placed successfully",
        "data": order,
    })))
}

async fn own(session: Session, state: AppState) -> Result<Response, Rejection> {
    session.authorize(ActionType::ViewOwnOrders)?;
    let orders = state.store.orders_for_user(session.user_id).await?;

    Ok(ok(json!({
        "success": true,
        "message": "Orders fetched successfully",
        "data": orders,
    })))
}

async fn all(session: Session, state: AppState) -> Result<Response, Rejection> {
    session.authorize(ActionType::ViewAllOrders)?;
    let orders = state.store.all_orders().await?;

    Ok(ok(json!({
        "success": true,
        "message": "Orders fetched successfully",
        "data": orders,
    })))
}

async fn update_status(
    session: Session,
    state: AppState,
    form: OrderStatusForm,
) -> Result<Response, Rejection> {
    session.authorize(ActionType::ManageOrders)?;
    let order = state
        .store
        .update_order_status(form.order_id, form.status)
        .await?;
    log::info!("Order {} moved to {}", order.id, order.order_status.as_str());

    Ok(ok(json!({
        "success": true,
        "message": "Order status updated successfully",
        "data": order,
    })))
}
