use serde_json::json;
use uuid::Uuid;
use warp::{filters::BoxedFilter, reject::Rejection, Filter};

use super::{created, json_body, ok, Response};
use crate::{
    constants::DEFAULT_USER_IMAGE,
    cryptography::{hash_password, verify_password},
    error::ApiError,
    form::{LoginForm, PasswordForm, ProfileForm, SignUpForm},
    jwt::Session,
    middleware::with_session,
    schema::{PublicUser, User, UserRole},
    state::{with_state, AppState},
    store::NewUser,
};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let sign_up = warp::path!("api" / "users" / "create-user")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(sign_up);

    let login = warp::path!("api" / "users" / "login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(login);

    let user_info = warp::path!("api" / "users" / "user-info")
        .and(warp::get())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and_then(user_info);

    let public_info = warp::path!("api" / "users" / "user-public-info" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(public_info);

    let edit_info = warp::path!("api" / "users" / "edit-user-info")
        .and(warp::put())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(edit_info);

    let update_password = warp::path!("api" / "users" / "update-password")
        .and(warp::patch())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state))
        .and(json_body())
        .and_then(update_password);

    sign_up
        .or(login)
        .unify()
        .or(user_info)
        .unify()
        .or(public_info)
        .unify()
        .or(edit_info)
        .unify()
        .or(update_password)
        .unify()
        .boxed()
}

async fn require_user(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

async fn sign_up(state: AppState, form: SignUpForm) -> Result<Response, Rejection> {
    form.validate()?;
    let user = state
        .store
        .create_user(NewUser {
            full_name: form.full_name.trim().to_string(),
            email: form.email.trim().to_string(),
            password_hash: hash_password(&form.password)?,
            image_url: DEFAULT_USER_IMAGE.to_string(),
            bio: form.bio,
            role: UserRole::Customer,
        })
        .await?;
    let token = state.sessions.issue(&user)?;
    log::info!("User {} signed up", user.id);

    Ok(created(json!({
        "success": true,
        "message": "User created successfully",
        "data": user,
        "token": token,
    })))
}

async fn login(state: AppState, form: LoginForm) -> Result<Response, Rejection> {
    let user = state
        .store
        .find_user_by_email(&form.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !verify_password(&form.password, &user.password) {
        return Err(ApiError::InvalidCredentials.into());
    }
    let token = state.sessions.issue(&user)?;

    Ok(ok(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
    })))
}

async fn user_info(session: Session, state: AppState) -> Result<Response, Rejection> {
    let user = require_user(&state, session.user_id).await?;
    let recipes = state.store.recipes_by_owner(user.id).await?;

    Ok(ok(json!({
        "success": true,
        "data": user,
        "userRecipes": recipes,
        "totalLikesReceived": user.user_like_count,
    })))
}

async fn public_info(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let user = require_user(&state, id).await?;
    let recipes = state.store.recipes_by_owner(user.id).await?;

    Ok(ok(json!({
        "success": true,
        "data": PublicUser::from(&user),
        "userRecipes": recipes,
        "totalLikesReceived": user.user_like_count,
    })))
}

async fn edit_info(
    session: Session,
    state: AppState,
    form: ProfileForm,
) -> Result<Response, Rejection> {
    form.validate()?;
    let user = state.store.update_profile(session.user_id, &form).await?;
    // Ranked recipes embed the owner's name and picture.
    state.invalidate_recipes().await;
    let token = state.sessions.issue(&user)?;

    Ok(ok(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": user,
        "token": token,
    })))
}

async fn update_password(
    session: Session,
    state: AppState,
    form: PasswordForm,
) -> Result<Response, Rejection> {
    if form.password.trim().is_empty() {
        return Err(ApiError::invalid("Password is required").into());
    }
    let password_hash = hash_password(&form.password)?;
    let user = state
        .store
        .update_password(session.user_id, &password_hash)
        .await?;
    let token = state.sessions.issue(&user)?;

    Ok(ok(json!({
        "success": true,
        "message": "Password updated successfully",
        "token": token,
    })))
}
