use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use super::{
    recipes::get_recipe,
    users::{get_profile, get_user_by_id},
};
use crate::{
    authentication::permissions::ActionType,
    error::{ActionError, ConstraintViolation, QueryError},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{AuthorRecipe, FollowedAuthorRow, RecipeShort, Subscription, UserProfile, Uuid},
};

/// The three user-owned link tables. Each allows at most one row per
/// (user, object) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Follow,
    Favorite,
    Purchase,
}

impl Relation {
    pub fn table(self) -> &'static str {
        match self {
            Relation::Follow => "follows",
            Relation::Favorite => "favorites",
            Relation::Purchase => "purchases",
        }
    }

    pub fn object_column(self) -> &'static str {
        match self {
            Relation::Follow => "author_id",
            Relation::Favorite | Relation::Purchase => "recipe_id",
        }
    }

    pub fn conflict_message(self) -> &'static str {
        match self {
            Relation::Follow => "You are already following this author",
            Relation::Favorite => "Recipe is already in favorites",
            Relation::Purchase => "Recipe is already in the shopping cart",
        }
    }

    pub fn missing_message(self) -> &'static str {
        match self {
            Relation::Follow => "You are not following this author",
            Relation::Favorite => "Recipe is not in favorites",
            Relation::Purchase => "Recipe is not in the shopping cart",
        }
    }

    fn target_missing(self) -> ActionError {
        match self {
            Relation::Follow => ActionError::NotFound(String::from("User not found")),
            Relation::Favorite | Relation::Purchase => {
                ActionError::NotFound(String::from("Recipe not found"))
            }
        }
    }

    /// Translates a rejected insert into the error the caller would have
    /// seen had the pre-check caught it.
    pub fn insert_error(self, e: sqlx::Error) -> ActionError {
        match ConstraintViolation::of(&e) {
            Some(ConstraintViolation::Unique) => {
                log::warn!(
                    "Concurrent duplicate insert into {} rejected by storage",
                    self.table()
                );
                ActionError::Conflict(String::from(self.conflict_message()))
            }
            Some(ConstraintViolation::ForeignKey) => self.target_missing(),
            Some(ConstraintViolation::Check) => {
                ActionError::SelfReference(String::from("You cannot follow yourself"))
            }
            None => QueryError::from(e).into(),
        }
    }
}

pub async fn create_relation(
    relation: Relation,
    user_id: Uuid,
    object_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    let (table, column) = (relation.table(), relation.object_column());

    let exists: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE user_id = $1 AND {column} = $2)"
    ))
    .bind(user_id)
    .bind(object_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;
    if exists.0 {
        return Err(ActionError::Conflict(String::from(
            relation.conflict_message(),
        )));
    }

    sqlx::query(&format!(
        "INSERT INTO {table} (user_id, {column}) VALUES ($1, $2)"
    ))
    .bind(user_id)
    .bind(object_id)
    .execute(pool)
    .await
    .map_err(|e| relation.insert_error(e))?;

    log::info!("User {user_id} added {column} {object_id} to {table}");
    Ok(())
}

pub async fn delete_relation(
    relation: Relation,
    user_id: Uuid,
    object_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    let (table, column) = (relation.table(), relation.object_column());

    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE user_id = $1 AND {column} = $2"
    ))
    .bind(user_id)
    .bind(object_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ActionError::NotFound(String::from(
            relation.missing_message(),
        )));
    }

    log::info!("User {user_id} removed {column} {object_id} from {table}");
    Ok(())
}

pub fn validate_recipes_limit(recipes_limit: Option<i64>) -> Result<Option<i64>, ActionError> {
    match recipes_limit {
        Some(limit) if limit < 0 => Err(ActionError::Validation(String::from(
            "Recipes limit: must not be negative",
        ))),
        limit => Ok(limit),
    }
}

async fn author_recipes(
    author_ids: &[Uuid],
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<AuthorRecipe>, ActionError> {
    let rows: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time, r.pub_date,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, pub_date DESC, id DESC
    ",
    )
    .bind(author_ids)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

async fn recipe_counts(
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, i64>, ActionError> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().collect())
}

/// Pairs each followed author with their recipes, keeping the order of `authors`.
pub fn build_subscriptions(
    authors: Vec<UserProfile>,
    recipes: Vec<AuthorRecipe>,
    counts: &HashMap<Uuid, i64>,
) -> Vec<Subscription> {
    let mut by_author: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    for recipe in recipes {
        by_author
            .entry(recipe.author_id)
            .or_default()
            .push(recipe.into());
    }

    authors
        .into_iter()
        .map(|author| Subscription {
            recipes: by_author.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author,
        })
        .collect()
}

async fn load_subscriptions(
    authors: Vec<UserProfile>,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscription>, ActionError> {
    let ids: Vec<Uuid> = authors.iter().map(|author| author.id).collect();
    let recipes = author_recipes(&ids, recipes_limit, pool).await?;
    let counts = recipe_counts(&ids, pool).await?;

    Ok(build_subscriptions(authors, recipes, &counts))
}

pub async fn follow(
    session: &SessionData,
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ActionError> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let recipes_limit = validate_recipes_limit(recipes_limit)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(Relation::Follow.target_missing());
    }
    if author_id == session.user_id {
        return Err(ActionError::SelfReference(String::from(
            "You cannot follow yourself",
        )));
    }

    create_relation(Relation::Follow, session.user_id, author_id, pool).await?;

    let author = get_profile(author_id, Some(session.user_id), pool).await?;
    load_subscriptions(vec![author], recipes_limit, pool)
        .await?
        .pop()
        .ok_or_else(|| Relation::Follow.target_missing())
}

pub async fn unfollow(
    session: &SessionData,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(Relation::Follow.target_missing());
    }

    delete_relation(Relation::Follow, session.user_id, author_id, pool).await
}

/// Authors the session follows, most recently followed first.
pub async fn list_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, ActionError> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let recipes_limit = validate_recipes_limit(recipes_limit)?;

    let rows: Vec<FollowedAuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY f.created_at DESC, f.id DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let authors: Vec<UserProfile> = rows
        .into_iter()
        .map(|row| UserProfile {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed: true,
        })
        .collect();

    let subscriptions = load_subscriptions(authors, recipes_limit, pool).await?;
    Ok(PageContext::from_rows(subscriptions, total_count, page))
}

async fn add_recipe_relation(
    relation: Relation,
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, ActionError> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let recipe = get_recipe(recipe_id, pool).await?;

    create_relation(relation, session.user_id, recipe.id, pool).await?;
    Ok(RecipeShort::from(&recipe))
}

async fn remove_recipe_relation(
    relation: Relation,
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let recipe = get_recipe(recipe_id, pool).await?;

    delete_relation(relation, session.user_id, recipe.id, pool).await
}

pub async fn favorite(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, ActionError> {
    add_recipe_relation(Relation::Favorite, session, recipe_id, pool).await
}

pub async fn unfavorite(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    remove_recipe_relation(Relation::Favorite, session, recipe_id, pool).await
}

pub async fn add_to_cart(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, ActionError> {
    add_recipe_relation(Relation::Purchase, session, recipe_id, pool).await
}

pub async fn remove_from_cart(
    session: &SessionData,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    remove_recipe_relation(Relation::Purchase, session, recipe_id, pool).await
}
