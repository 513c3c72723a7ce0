use serde_json::json;
use uuid::Uuid;
use warp::{filters::BoxedFilter, reject::Rejection, Filter};

use super::{created, json_body, ok, Response};
use crate::{
    constants::{OTHER_RECIPE_COUNT, POPULAR_RECIPE_COUNT, RECIPE_COUNT_PER_PAGE, TOP_KEYWORD_COUNT},
    error::ApiError,
    form::{
        CommentForm, KeywordRecipesForm, RecipeCategoryQuery, RecipeFilter, RecipeForm,
        RecipeIdForm, RecipePageQuery, RecipeSearchQuery,
    },
    jwt::Session,
    middleware::with_session,
    pagination::PageRequest,
    permissions::ActionType,
    schema::Recipe,
    state::{with_state, AppState},
    CacheKeyType,
};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let all_recipes = warp::path!("api" / "recipes" / "all-recipes")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(warp::query::<RecipePageQuery>())
        .and_then(all_recipes);

    let by_category = warp::path!("api" / "recipes" / "categories")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(warp::query::<RecipeCategoryQuery>())
        .and_then(by_category);

    let search = warp::path!("api" / "recipes" / "search")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(warp::query::<RecipeSearchQuery>())
        .and_then(search);

    let by_keyword = warp::path!("api" / "recipes" / "keyword-recipes")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(by_keyword);

    let keywords = warp::path!("api" / "recipes" / "keywords")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(keywords);

    let popular = warp::path!("api" / "recipes" / "popular-recipes")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(popular);

    let other = warp::path!("api" / "recipes" / "other-recipes" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(other);

    let single = warp::path!("api" / "recipes" / "single-recipe" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(single);

    let create = warp::path!("api" / "recipes" / "create")
        .and(warp::post())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(create);

    let edit = warp::path!("api" / "recipes" / "edit" / Uuid)
        .and(warp::put())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(edit);

    let delete = warp::path!("api" / "recipes" / "delete-recipe" / Uuid)
        .and(warp::delete())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and_then(delete);

    let own = warp::path!("api" / "recipes" / "user-recipes")
        .and(warp::get())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and_then(own);

    let liked = warp::path!("api" / "recipes" / "user-liked-recipes")
        .and(warp::get())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and_then(liked);

    let bookmarked = warp::path!("api" / "recipes" / "user-bookmarked-recipes")
        .and(warp::get())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and_then(bookmarked);

    let like = warp::path!("api" / "recipes" / "like-recipe")
        .and(warp::put())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(like);

    let bookmark = warp::path!("api" / "recipes" / "bookmark-recipe")
        .and(warp::put())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(bookmark);

    let comment = warp::path!("api" / "recipes" / "comment-recipe")
        .and(warp::put())
        .and(with_session(state.sessions.clone()))
        .and(with_state(state))
        .and(json_body())
        .and_then(comment);

    let listings = all_recipes
        .or(by_category)
        .unify()
        .or(search)
        .unify()
        .or(by_keyword)
        .unify()
        .or(keywords)
        .unify()
        .or(popular)
        .unify()
        .or(other)
        .unify()
        .or(single)
        .unify();

    let authoring = create
        .or(edit)
        .unify()
        .or(delete)
        .unify()
        .or(own)
        .unify()
        .or(liked)
        .unify()
        .or(bookmarked)
        .unify();

    let engagement = like.or(bookmark).unify().or(comment).unify();

    listings
        .or(authoring)
        .unify()
        .or(engagement)
        .unify()
        .boxed()
}

async fn paginated(
    state: &AppState,
    filter: RecipeFilter,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<Response, ApiError> {
    let request = PageRequest::new(page, limit, RECIPE_COUNT_PER_PAGE);
    let page = state.store.list_recipes(&filter, request).await?;

    Ok(ok(json!({
        "success": true,
        "data": page.items,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

async fn all_recipes(state: AppState, query: RecipePageQuery) -> Result<Response, Rejection> {
    Ok(paginated(&state, RecipeFilter::All, query.page, query.limit).await?)
}

async fn by_category(state: AppState, query: RecipeCategoryQuery) -> Result<Response, Rejection> {
    let category = query.category.trim();
    if category.is_empty() {
        return Err(ApiError::invalid("Category is required").into());
    }
    let filter = RecipeFilter::Category(category.to_string());

    Ok(paginated(&state, filter, query.page, query.limit).await?)
}

async fn search(state: AppState, query: RecipeSearchQuery) -> Result<Response, Rejection> {
    let filter = RecipeFilter::Search(query.q);

    Ok(paginated(&state, filter, query.page, query.limit).await?)
}

async fn by_keyword(state: AppState, form: KeywordRecipesForm) -> Result<Response, Rejection> {
    if form.keyword.trim().is_empty() {
        return Err(ApiError::invalid("Keyword is required").into());
    }
    let filter = RecipeFilter::Keyword(form.keyword);

    Ok(paginated(&state, filter, form.page, form.limit).await?)
}

async fn keywords(state: AppState) -> Result<Response, Rejection> {
    let ranked = state
        .cached(CacheKeyType::Recipe.new("keywords"), || {
            state.store.top_keywords(TOP_KEYWORD_COUNT)
        })
        .await?;
    let keywords: Vec<String> = ranked.into_iter().map(|k| k.keyword).collect();

    Ok(ok(json!({ "success": true, "data": keywords })))
}

async fn popular(state: AppState) -> Result<Response, Rejection> {
    let recipes = state
        .cached(CacheKeyType::Recipe.new("popular"), || {
            state.store.most_liked(POPULAR_RECIPE_COUNT)
        })
        .await?;

    Ok(ok(json!({ "success": true, "data": recipes })))
}

async fn other(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let recipes = state.store.other_recipes(id, OTHER_RECIPE_COUNT).await?;

    Ok(ok(json!({ "success": true, "data": recipes })))
}

async fn single(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let detail = state
        .store
        .recipe_detail(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;

    Ok(ok(json!({ "success": true, "data": detail })))
}

async fn create(session: Session, state: AppState, form: RecipeForm) -> Result<Response, Rejection> {
    session.authorize(ActionType::CreateRecipes)?;
    form.validate()?;
    let recipe = state.store.create_recipe(session.user_id, &form).await?;
    state.invalidate_recipes().await;
    log::info!("Recipe {} created by {}", recipe.id, session.user_id);

    Ok(created(json!({
        "success": true,
        "message": "Recipe created successfully",
        "data": recipe,
    })))
}

/// Loads the recipe and checks the caller may manage it.
async fn owned_recipe(state: &AppState, session: &Session, id: Uuid) -> Result<Recipe, ApiError> {
    session.authorize(ActionType::ManageOwnRecipes)?;
    let recipe = state
        .store
        .get_recipe(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;
    session.owns(recipe.created_by)?;

    Ok(recipe)
}

async fn edit(
    id: Uuid,
    session: Session,
    state: AppState,
    form: RecipeForm,
) -> Result<Response, Rejection> {
    owned_recipe(&state, &session, id).await?;
    form.validate()?;
    let recipe = state.store.update_recipe(id, &form).await?;
    state.invalidate_recipes().await;

    Ok(ok(json!({
        "success": true,
        "message": "Recipe updated successfully",
        "data": recipe,
    })))
}

async fn delete(id: Uuid, session: Session, state: AppState) -> Result<Response, Rejection> {
    owned_recipe(&state, &session, id).await?;
    state.store.delete_recipe(id).await?;
    state.invalidate_recipes().await;
    log::info!("Recipe {id} deleted by {}", session.user_id);

    Ok(ok(json!({
        "success": true,
        "message": "Recipe deleted successfully",
    })))
}

async fn own(session: Session, state: AppState) -> Result<Response, Rejection> {
    let recipes = state.store.recipes_by_owner(session.user_id).await?;

    Ok(ok(json!({ "success": true, "data": recipes })))
}

async fn liked(session: Session, state: AppState) -> Result<Response, Rejection> {
    let recipes = state.store.recipes_liked_by(session.user_id).await?;

    Ok(ok(json!({ "success": true, "data": recipes })))
}

async fn bookmarked(session: Session, state: AppState) -> Result<Response, Rejection> {
    let recipes = state.store.bookmarked_recipes(session.user_id).await?;

    Ok(ok(json!({ "success": true, "data": recipes })))
}

async fn like(session: Session, state: AppState, form: RecipeIdForm) -> Result<Response, Rejection> {
    session.authorize(ActionType::Engage)?;
    let toggle = state.store.toggle_like(form.recipe_id, session.user_id).await?;
    state.invalidate_recipes().await;

    let message = if toggle.liked {
        "Recipe liked"
    } else {
        "Recipe unliked"
    };
    Ok(ok(json!({
        "success": true,
        "message": message,
        "liked": toggle.liked,
        "likesCount": toggle.likes_count,
    })))
}

async fn bookmark(
    session: Session,
    state: AppState,
    form: RecipeIdForm,
) -> Result<Response, Rejection> {
    session.authorize(ActionType::Engage)?;
    let toggle = state
        .store
        .toggle_bookmark(session.user_id, form.recipe_id)
        .await?;

    let message = if toggle.bookmarked {
        "Recipe bookmarked"
    } else {
        "Bookmark removed"
    };
    Ok(ok(json!({
        "success": true,
        "message": message,
        "bookmarked": toggle.bookmarked,
    })))
}

async fn comment(session: Session, state: AppState, form: CommentForm) -> Result<Response, Rejection> {
    session.authorize(ActionType::Engage)?;
    form.validate()?;
    let comment = state
        .store
        .add_comment(form.recipe_id, session.user_id, &form.comment)
        .await?;

    Ok(ok(json!({
        "success": true,
        "message": "Comment added successfully",
        "data": comment,
    })))
}
