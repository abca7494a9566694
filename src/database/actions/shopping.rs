use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{ActionError, QueryError},
    jwt::SessionData,
    schema::{CartPart, ShoppingListItem, Uuid},
    shopping_list::{aggregate, render},
};

/// Every composition row of every recipe in the user's cart, ungrouped.
pub async fn list_cart_parts(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartPart>, ActionError> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM purchases p
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = p.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE p.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, ActionError> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    let parts = list_cart_parts(session.user_id, pool).await?;
    Ok(aggregate(parts))
}

/// Plain-text rendering of [`shopping_list`]; empty when the cart is empty.
pub async fn download_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<String, ActionError> {
    let items = shopping_list(session, pool).await?;
    log::debug!(
        "Rendering shopping list of {} items for user {}",
        items.len(),
        session.user_id
    );

    Ok(render(&items))
}
