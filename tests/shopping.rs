mod common;

use common::{ingredient, recipe, tag, user};
use foodgram_sdk::{actions, schema::UserRole};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn same_ingredient_is_summed_across_recipes(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let shopper = user(&pool, "shopper", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let milk = ingredient(&pool, "milk", "ml").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;

    let a = recipe(&pool, &author, "A", &[(eggs, 2)], &[breakfast]).await;
    let b = recipe(&pool, &author, "B", &[(eggs, 3), (milk, 100)], &[breakfast]).await;
    recipe(&pool, &author, "Not in cart", &[(eggs, 40)], &[breakfast]).await;

    actions::add_to_cart(&shopper, a.id, &pool).await.unwrap();
    actions::add_to_cart(&shopper, b.id, &pool).await.unwrap();

    let list = actions::download_shopping_list(&shopper, &pool)
        .await
        .unwrap();
    assert_eq!(list, "eggs, 5 pcs\nmilk, 100 ml");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn empty_cart_gives_empty_list(pool: PgPool) {
    let shopper = user(&pool, "shopper", UserRole::User).await;

    let list = actions::download_shopping_list(&shopper, &pool)
        .await
        .unwrap();
    assert!(list.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn lookalike_ingredients_stay_separate(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let shopper = user(&pool, "shopper", UserRole::User).await;
    let salt = ingredient(&pool, "salt", "g").await;
    let other_salt = ingredient(&pool, "salt", "g").await;
    let dinner = tag(&pool, "dinner", "#49B64E").await;

    let a = recipe(&pool, &author, "A", &[(salt, 5)], &[dinner]).await;
    let b = recipe(&pool, &author, "B", &[(other_salt, 7)], &[dinner]).await;
    actions::add_to_cart(&shopper, a.id, &pool).await.unwrap();
    actions::add_to_cart(&shopper, b.id, &pool).await.unwrap();

    let items = actions::shopping_list(&shopper, &pool).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].ingredient_id, salt);
    assert_eq!(items[0].total, 5);
    assert_eq!(items[1].total, 7);
}
