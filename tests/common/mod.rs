#![allow(dead_code)]

use foodgram_sdk::{
    actions,
    jwt::SessionData,
    schema::{IngredientAmount, NewRecipe, Recipe, UserRole, Uuid},
};
use sqlx::PgPool;

pub async fn user(pool: &PgPool, username: &str, role: UserRole) -> SessionData {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (email, username, password, role) VALUES ($1, $2, 'x', $3) RETURNING id",
    )
    .bind(format!("{username}@example.com"))
    .bind(username)
    .bind(role.clone())
    .fetch_one(pool)
    .await
    .unwrap();

    SessionData {
        user_id: id,
        username: username.to_string(),
        role,
    }
}

pub async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Uuid {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

pub async fn tag(pool: &PgPool, slug: &str, color: &str) -> Uuid {
    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $1) RETURNING id")
            .bind(slug)
            .bind(color)
            .fetch_one(pool)
            .await
            .unwrap();
    id
}

pub fn new_recipe(name: &str, ingredients: &[(Uuid, i32)], tags: &[Uuid]) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        image: String::from("recipes/images/dish.png"),
        text: String::from("Mix everything"),
        cooking_time: 10,
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmount { id, amount })
            .collect(),
        tags: tags.to_vec(),
    }
}

pub async fn recipe(
    pool: &PgPool,
    author: &SessionData,
    name: &str,
    ingredients: &[(Uuid, i32)],
    tags: &[Uuid],
) -> Recipe {
    actions::create_recipe(author, new_recipe(name, ingredients, tags), pool)
        .await
        .unwrap()
}

pub async fn count(pool: &PgPool, table: &str, column: &str, id: Uuid) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as(&format!("SELECT COUNT(*) FROM {table} WHERE {column} = $1"))
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap();
    count
}

pub async fn composition(pool: &PgPool, recipe_id: Uuid) -> Vec<(Uuid, i32)> {
    sqlx::query_as(
        "SELECT ingredient_id, amount FROM recipe_ingredients WHERE recipe_id = $1 ORDER BY ingredient_id",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .unwrap()
}
