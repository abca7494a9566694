mod common;

use common::{count, ingredient, recipe, tag, user};
use foodgram_sdk::{
    actions::{self, Relation},
    error::{ActionError, ConstraintViolation},
    pagination::PageRequest,
    schema::UserRole,
};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn following_yourself_is_rejected(pool: PgPool) {
    let cook = user(&pool, "cook", UserRole::User).await;

    let result = actions::follow(&cook, cook.user_id, None, &pool).await;

    assert!(matches!(result, Err(ActionError::SelfReference(_))));
    assert_eq!(count(&pool, "follows", "user_id", cook.user_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn following_twice_conflicts(pool: PgPool) {
    let fan = user(&pool, "fan", UserRole::User).await;
    let author = user(&pool, "author", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    recipe(&pool, &author, "First", &[(eggs, 1)], &[breakfast]).await;
    let newest = recipe(&pool, &author, "Second", &[(eggs, 2)], &[breakfast]).await;

    let subscription = actions::follow(&fan, author.user_id, Some(1), &pool)
        .await
        .unwrap();
    assert!(subscription.author.is_subscribed);
    assert_eq!(subscription.recipes_count, 2);
    assert_eq!(subscription.recipes.len(), 1);
    assert_eq!(subscription.recipes[0].id, newest.id);

    let again = actions::follow(&fan, author.user_id, None, &pool).await;
    assert!(matches!(again, Err(ActionError::Conflict(_))));
    assert_eq!(count(&pool, "follows", "user_id", fan.user_id).await, 1);

    let missing = actions::follow(&fan, author.user_id + 100, None, &pool).await;
    assert!(matches!(missing, Err(ActionError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn unfollow_requires_an_existing_follow(pool: PgPool) {
    let fan = user(&pool, "fan", UserRole::User).await;
    let author = user(&pool, "author", UserRole::User).await;

    assert!(matches!(
        actions::unfollow(&fan, author.user_id, &pool).await,
        Err(ActionError::NotFound(_))
    ));

    actions::follow(&fan, author.user_id, None, &pool)
        .await
        .unwrap();
    actions::unfollow(&fan, author.user_id, &pool).await.unwrap();
    assert_eq!(count(&pool, "follows", "user_id", fan.user_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn favoriting_twice_keeps_one_row(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let fan = user(&pool, "fan", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let created = recipe(&pool, &author, "Omelette", &[(eggs, 3)], &[breakfast]).await;

    let short = actions::favorite(&fan, created.id, &pool).await.unwrap();
    assert_eq!(short.id, created.id);
    assert_eq!(short.name, "Omelette");

    let again = actions::favorite(&fan, created.id, &pool).await;
    assert!(matches!(
        again,
        Err(ActionError::Conflict(message)) if message == Relation::Favorite.conflict_message()
    ));
    assert_eq!(count(&pool, "favorites", "recipe_id", created.id).await, 1);

    actions::unfavorite(&fan, created.id, &pool).await.unwrap();
    assert!(matches!(
        actions::unfavorite(&fan, created.id, &pool).await,
        Err(ActionError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn missing_recipe_is_not_found_before_conflict(pool: PgPool) {
    let fan = user(&pool, "fan", UserRole::User).await;

    assert!(matches!(
        actions::add_to_cart(&fan, 4242, &pool).await,
        Err(ActionError::NotFound(_))
    ));
    assert!(matches!(
        actions::remove_from_cart(&fan, 4242, &pool).await,
        Err(ActionError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn storage_rejects_a_racing_duplicate(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let fan = user(&pool, "fan", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let created = recipe(&pool, &author, "Omelette", &[(eggs, 3)], &[breakfast]).await;

    actions::add_to_cart(&fan, created.id, &pool).await.unwrap();

    // The insert a second request would issue after both passed the pre-check.
    let error = sqlx::query("INSERT INTO purchases (user_id, recipe_id) VALUES ($1, $2)")
        .bind(fan.user_id)
        .bind(created.id)
        .execute(&pool)
        .await
        .unwrap_err();

    assert_eq!(ConstraintViolation::of(&error), Some(ConstraintViolation::Unique));
    assert!(matches!(
        Relation::Purchase.insert_error(error),
        ActionError::Conflict(message) if message == Relation::Purchase.conflict_message()
    ));
    assert_eq!(count(&pool, "purchases", "recipe_id", created.id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn subscriptions_are_paginated(pool: PgPool) {
    let fan = user(&pool, "fan", UserRole::User).await;
    for name in ["a", "b", "c"] {
        let author = user(&pool, name, UserRole::User).await;
        actions::follow(&fan, author.user_id, None, &pool)
            .await
            .unwrap();
    }

    let first = actions::list_subscriptions(&fan, PageRequest { page: 1, limit: 2 }, None, &pool)
        .await
        .unwrap();
    assert_eq!(first.count, 3);
    assert_eq!(first.results.len(), 2);
    assert_eq!(first.next, Some(2));

    let second = actions::list_subscriptions(&fan, PageRequest { page: 2, limit: 2 }, None, &pool)
        .await
        .unwrap();
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.previous, Some(1));
    assert!(second.results.iter().all(|s| s.author.is_subscribed));
}
