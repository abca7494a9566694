use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use sqlx::{Pool, Postgres};
use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

use super::{handlers, rejection::handle_rejection};
use crate::{
    error::ActionError,
    jwt::SessionSigner,
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    schema::{
        Credentials, NewIngredient, NewRecipe, NewTag, NewUser, PasswordChange, RecipeFilter,
        RecipePatch,
    },
};

const BODY_LIMIT: u64 = 1024 * 256;

/// Everything a request handler needs besides the request itself.
#[derive(Clone)]
pub struct ApiState {
    pub pool: Pool<Postgres>,
    pub signer: Arc<SessionSigner>,
    pub page_size: i64,
}

fn with_state(state: ApiState) -> impl Filter<Extract = (ApiState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
{
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ActionError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ActionError::Validation(format!(
            "{key}: expected 0, 1, true or false"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ActionError> {
    value
        .parse()
        .map_err(|_| ActionError::Validation(format!("{key}: expected a number")))
}

/// Builds the recipe list filter from raw query pairs; `tags` may repeat.
pub fn parse_recipe_query(
    pairs: Vec<(String, String)>,
    default_limit: i64,
) -> Result<(RecipeFilter, PageRequest), ActionError> {
    let mut filter = RecipeFilter::default();
    let (mut page, mut limit) = (None, None);

    for (key, value) in pairs {
        match key.as_str() {
            "author" => filter.author = Some(parse_number(&key, &value)?),
            "tags" => {
                if !value.is_empty() && !filter.tags.contains(&value) {
                    filter.tags.push(value);
                }
            }
            "is_favorited" => filter.is_favorited = Some(parse_flag(&key, &value)?),
            "is_in_shopping_cart" => {
                filter.is_in_shopping_cart = Some(parse_flag(&key, &value)?)
            }
            "page" => page = Some(parse_number(&key, &value)?),
            "limit" => limit = Some(parse_number(&key, &value)?),
            _ => {}
        }
    }

    Ok((filter, PageRequest::new(page, limit, default_limit)?))
}

fn user_routes(state: ApiState) -> BoxedFilter<(Response,)> {
    let signer = state.signer.clone();

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body::<NewUser>())
        .and(with_state(state.clone()))
        .and_then(handlers::register_user);

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(warp::query::<handlers::PageQuery>())
        .and(with_possible_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::list_users);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::current_user);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<handlers::SubscriptionQuery>())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::list_subscriptions);

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_session(signer.clone()))
        .and(json_body::<PasswordChange>())
        .and(with_state(state.clone()))
        .and_then(handlers::set_password);

    let profile = warp::path!("api" / "users" / i32)
        .and(warp::get())
        .and(with_possible_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_user);

    let follow = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::post())
        .and(warp::query::<handlers::RecipesLimitQuery>())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::follow);

    let unfollow = warp::path!("api" / "users" / i32 / "subscribe")
        .and(warp::delete())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::unfollow);

    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<Credentials>())
        .and(with_state(state))
        .and_then(handlers::login);

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(signer))
        .and_then(handlers::logout);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(set_password)
        .unify()
        .or(profile)
        .unify()
        .or(follow)
        .unify()
        .or(unfollow)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .boxed()
}

fn catalog_routes(state: ApiState) -> BoxedFilter<(Response,)> {
    let signer = state.signer.clone();

    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_tags);

    let tag = warp::path!("api" / "tags" / i32)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_tag);

    let new_tag = warp::path!("api" / "tags")
        .and(warp::post())
        .and(with_session(signer.clone()))
        .and(json_body::<NewTag>())
        .and(with_state(state.clone()))
        .and_then(handlers::create_tag);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<handlers::IngredientQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_ingredients);

    let ingredient = warp::path!("api" / "ingredients" / i32)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_ingredient);

    let new_ingredient = warp::path!("api" / "ingredients")
        .and(warp::post())
        .and(with_session(signer))
        .and(json_body::<NewIngredient>())
        .and(with_state(state))
        .and_then(handlers::create_ingredient);

    tags.or(tag)
        .unify()
        .or(new_tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .or(new_ingredient)
        .unify()
        .boxed()
}

fn recipe_routes(state: ApiState) -> BoxedFilter<(Response,)> {
    let signer = state.signer.clone();

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(signer.clone()))
        .and(json_body::<NewRecipe>())
        .and(with_state(state.clone()))
        .and_then(handlers::create_recipe);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::download_shopping_cart);

    let detail = warp::path!("api" / "recipes" / i32)
        .and(warp::get())
        .and(with_possible_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_recipe);

    let update = warp::path!("api" / "recipes" / i32)
        .and(warp::patch())
        .and(with_session(signer.clone()))
        .and(json_body::<RecipePatch>())
        .and(with_state(state.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("api" / "recipes" / i32)
        .and(warp::delete())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::delete_recipe);

    let favorite = warp::path!("api" / "recipes" / i32 / "favorite")
        .and(warp::post())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::favorite);

    let unfavorite = warp::path!("api" / "recipes" / i32 / "favorite")
        .and(warp::delete())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::unfavorite);

    let add_to_cart = warp::path!("api" / "recipes" / i32 / "shopping_cart")
        .and(warp::post())
        .and(with_session(signer.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::add_to_cart);

    let remove_from_cart = warp::path!("api" / "recipes" / i32 / "shopping_cart")
        .and(warp::delete())
        .and(with_session(signer))
        .and(with_state(state))
        .and_then(handlers::remove_from_cart);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(unfavorite)
        .unify()
        .or(add_to_cart)
        .unify()
        .or(remove_from_cart)
        .unify()
        .boxed()
}

/// The whole HTTP surface, with rejections rendered as JSON errors.
pub fn routes(state: ApiState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    user_routes(state.clone())
        .or(catalog_routes(state.clone()))
        .unify()
        .or(recipe_routes(state))
        .unify()
        .recover(handle_rejection)
        .with(warp::log::custom(|info| {
            log::info!(
                "{} {} {} {:?}",
                info.method(),
                info.path(),
                info.status().as_u16(),
                info.elapsed()
            );
        }))
}
