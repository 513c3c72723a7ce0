pub mod orders;
pub mod products;
pub mod recipes;
pub mod users;

use std::convert::Infallible;

use serde::de::DeserializeOwned;
use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    filters::BoxedFilter,
    http::{Method, StatusCode},
    reject::{InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection},
    reply::Reply,
    Filter,
};

use crate::{error::ApiError, state::AppState};

pub type Response = warp::reply::Response;

const JSON_BODY_LIMIT: u64 = 1024 * 256;

pub fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(JSON_BODY_LIMIT).and(warp::body::json())
}

pub fn reply_json(status: StatusCode, body: &serde_json::Value) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

pub fn ok(body: serde_json::Value) -> Response {
    reply_json(StatusCode::OK, &body)
}

pub fn created(body: serde_json::Value) -> Response {
    reply_json(StatusCode::CREATED, &body)
}

/// Every `/api` route, without rejection handling.
pub fn api(state: AppState) -> BoxedFilter<(Response,)> {
    users::routes(state.clone())
        .or(recipes::routes(state.clone()))
        .unify()
        .or(products::routes(state.clone()))
        .unify()
        .or(orders::routes(state))
        .unify()
        .boxed()
}

/// The full service: routes, CORS, error rendering and access log.
pub fn app(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["authorization", "content-type"])
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ]);

    api(state)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log("culinary_art::access"))
}

/// Renders any rejection as `{ success: false, message }`.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if let Some(e) = err.find::<ApiError>() {
        e.log();
        (e.status(), e.to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if err.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Route not found".to_string())
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
    };

    Ok(reply_json(
        status,
        &json!({ "success": false, "message": message }),
    ))
}
