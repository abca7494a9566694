use serde::{Deserialize, Serialize};
use warp::{
    http::StatusCode,
    reject::{self, Rejection},
    reply::{self, Reply, Response},
};

use super::filters::{parse_recipe_query, ApiState};
use crate::{
    actions,
    constants::{SESSION_COOKIE, SHOPPING_LIST_FILENAME},
    jwt::SessionData,
    pagination::PageRequest,
    schema::{
        Credentials, NewIngredient, NewRecipe, NewTag, NewUser, PasswordChange, RecipePatch, Uuid,
    },
};

#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

#[derive(Serialize)]
struct AuthToken {
    auth_token: String,
}

fn json<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

fn no_content() -> Response {
    reply::with_status(reply::reply(), StatusCode::NO_CONTENT).into_response()
}

fn viewer(session: &Option<SessionData>) -> Option<Uuid> {
    session.as_ref().map(|session| session.user_id)
}

pub async fn register_user(user: NewUser, state: ApiState) -> Result<Response, Rejection> {
    let profile = actions::register_user(user, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&profile, StatusCode::CREATED))
}

pub async fn list_users(
    query: PageQuery,
    session: Option<SessionData>,
    state: ApiState,
) -> Result<Response, Rejection> {
    let page = PageRequest::new(query.page, query.limit, state.page_size).map_err(reject::custom)?;
    let users = actions::list_users(page, viewer(&session), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&users, StatusCode::OK))
}

pub async fn current_user(session: SessionData, state: ApiState) -> Result<Response, Rejection> {
    let profile = actions::get_profile(session.user_id, Some(session.user_id), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&profile, StatusCode::OK))
}

pub async fn get_user(
    id: Uuid,
    session: Option<SessionData>,
    state: ApiState,
) -> Result<Response, Rejection> {
    let profile = actions::get_profile(id, viewer(&session), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&profile, StatusCode::OK))
}

pub async fn set_password(
    session: SessionData,
    change: PasswordChange,
    state: ApiState,
) -> Result<Response, Rejection> {
    actions::set_password(&session, change, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

/// Returns the token in the body and also sets it as the session cookie.
pub async fn login(credentials: Credentials, state: ApiState) -> Result<Response, Rejection> {
    let token = actions::login_user(credentials, &state.signer, &state.pool)
        .await
        .map_err(reject::custom)?;

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.signer.lifetime().num_seconds()
    );
    let body = reply::json(&AuthToken { auth_token: token });

    Ok(reply::with_header(body, "set-cookie", cookie).into_response())
}

pub async fn logout(_session: SessionData) -> Result<Response, Rejection> {
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");

    Ok(reply::with_header(no_content(), "set-cookie", cookie).into_response())
}

pub async fn list_subscriptions(
    query: SubscriptionQuery,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    let page = PageRequest::new(query.page, query.limit, state.page_size).map_err(reject::custom)?;
    let subscriptions =
        actions::list_subscriptions(&session, page, query.recipes_limit, &state.pool)
            .await
            .map_err(reject::custom)?;

    Ok(json(&subscriptions, StatusCode::OK))
}

pub async fn follow(
    author_id: Uuid,
    query: RecipesLimitQuery,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    let subscription = actions::follow(&session, author_id, query.recipes_limit, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&subscription, StatusCode::CREATED))
}

pub async fn unfollow(
    author_id: Uuid,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    actions::unfollow(&session, author_id, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

pub async fn list_tags(state: ApiState) -> Result<Response, Rejection> {
    let tags = actions::list_tags(&state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&tags, StatusCode::OK))
}

pub async fn get_tag(id: Uuid, state: ApiState) -> Result<Response, Rejection> {
    let tag = actions::get_tag(id, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&tag, StatusCode::OK))
}

pub async fn create_tag(
    session: SessionData,
    tag: NewTag,
    state: ApiState,
) -> Result<Response, Rejection> {
    let tag = actions::create_tag(&session, tag, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&tag, StatusCode::CREATED))
}

pub async fn list_ingredients(
    query: IngredientQuery,
    state: ApiState,
) -> Result<Response, Rejection> {
    let ingredients = actions::list_ingredients(query.name.as_deref(), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&ingredients, StatusCode::OK))
}

pub async fn get_ingredient(id: Uuid, state: ApiState) -> Result<Response, Rejection> {
    let ingredient = actions::get_ingredient(id, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&ingredient, StatusCode::OK))
}

pub async fn create_ingredient(
    session: SessionData,
    ingredient: NewIngredient,
    state: ApiState,
) -> Result<Response, Rejection> {
    let ingredient = actions::create_ingredient(&session, ingredient, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&ingredient, StatusCode::CREATED))
}

pub async fn list_recipes(
    query: Vec<(String, String)>,
    session: Option<SessionData>,
    state: ApiState,
) -> Result<Response, Rejection> {
    let (filter, page) = parse_recipe_query(query, state.page_size).map_err(reject::custom)?;
    let recipes = actions::fetch_recipes(filter, page, viewer(&session), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&recipes, StatusCode::OK))
}

pub async fn create_recipe(
    session: SessionData,
    recipe: NewRecipe,
    state: ApiState,
) -> Result<Response, Rejection> {
    let recipe = actions::create_recipe(&session, recipe, &state.pool)
        .await
        .map_err(reject::custom)?;
    let detail = actions::get_recipe_detail(recipe.id, Some(session.user_id), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&detail, StatusCode::CREATED))
}

pub async fn get_recipe(
    id: Uuid,
    session: Option<SessionData>,
    state: ApiState,
) -> Result<Response, Rejection> {
    let detail = actions::get_recipe_detail(id, viewer(&session), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&detail, StatusCode::OK))
}

pub async fn update_recipe(
    id: Uuid,
    session: SessionData,
    patch: RecipePatch,
    state: ApiState,
) -> Result<Response, Rejection> {
    actions::update_recipe(id, &session, patch, &state.pool)
        .await
        .map_err(reject::custom)?;
    let detail = actions::get_recipe_detail(id, Some(session.user_id), &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&detail, StatusCode::OK))
}

pub async fn delete_recipe(
    id: Uuid,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    actions::delete_recipe(id, &session, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

pub async fn favorite(
    id: Uuid,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    let recipe = actions::favorite(&session, id, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&recipe, StatusCode::CREATED))
}

pub async fn unfavorite(
    id: Uuid,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    actions::unfavorite(&session, id, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

pub async fn add_to_cart(
    id: Uuid,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    let recipe = actions::add_to_cart(&session, id, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&recipe, StatusCode::CREATED))
}

pub async fn remove_from_cart(
    id: Uuid,
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    actions::remove_from_cart(&session, id, &state.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

/// Always a text attachment, even when the cart is empty.
pub async fn download_shopping_cart(
    session: SessionData,
    state: ApiState,
) -> Result<Response, Rejection> {
    let body = actions::download_shopping_list(&session, &state.pool)
        .await
        .map_err(reject::custom)?;

    let reply = reply::with_header(body, "content-type", "text/plain; charset=utf-8");
    let reply = reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
    );
    Ok(reply.into_response())
}
