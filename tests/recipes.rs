mod common;

use common::{composition, count, ingredient, new_recipe, recipe, tag, user};
use foodgram_sdk::{
    actions,
    error::ActionError,
    pagination::PageRequest,
    schema::{IngredientAmount, RecipeFilter, RecipePatch, UserRole},
};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn create_persists_one_row_per_ingredient(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let milk = ingredient(&pool, "milk", "ml").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;

    let created = recipe(
        &pool,
        &author,
        "Omelette",
        &[(eggs, 3), (milk, 50)],
        &[breakfast, breakfast],
    )
    .await;

    assert_eq!(created.author_id, author.user_id);
    assert_eq!(composition(&pool, created.id).await, vec![(eggs, 3), (milk, 50)]);
    assert_eq!(count(&pool, "recipe_tags", "recipe_id", created.id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn duplicate_ingredient_persists_nothing(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;

    let result = actions::create_recipe(
        &author,
        new_recipe("Omelette", &[(eggs, 2), (eggs, 3)], &[breakfast]),
        &pool,
    )
    .await;

    assert!(matches!(result, Err(ActionError::Validation(message)) if message.contains("unique")));
    assert_eq!(count(&pool, "recipes", "author_id", author.user_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn unknown_ingredient_leaves_no_orphan(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;

    let result = actions::create_recipe(
        &author,
        new_recipe("Omelette", &[(eggs, 2), (eggs + 100, 1)], &[breakfast]),
        &pool,
    )
    .await;
    assert!(matches!(result, Err(ActionError::NotFound(_))));

    let result = actions::create_recipe(
        &author,
        new_recipe("Omelette", &[(eggs, 2)], &[breakfast + 100]),
        &pool,
    )
    .await;
    assert!(matches!(result, Err(ActionError::Validation(_))));

    assert_eq!(count(&pool, "recipes", "author_id", author.user_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn update_replaces_the_ingredient_list(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let milk = ingredient(&pool, "milk", "ml").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let dinner = tag(&pool, "dinner", "#49B64E").await;

    let created = recipe(&pool, &author, "Pancakes", &[(eggs, 2), (milk, 200)], &[breakfast]).await;

    let patch = RecipePatch {
        name: Some(String::from("Crepes")),
        ingredients: Some(vec![
            IngredientAmount { id: flour, amount: 100 },
            IngredientAmount { id: eggs, amount: 1 },
        ]),
        ..RecipePatch::default()
    };
    let updated = actions::update_recipe(created.id, &author, patch, &pool)
        .await
        .unwrap();

    assert_eq!(updated.name, "Crepes");
    assert_eq!(updated.text, created.text);
    assert_eq!(composition(&pool, created.id).await, vec![(eggs, 1), (flour, 100)]);
    assert_eq!(count(&pool, "recipe_tags", "recipe_id", created.id).await, 1);

    let patch = RecipePatch {
        tags: Some(vec![dinner]),
        ..RecipePatch::default()
    };
    actions::update_recipe(created.id, &author, patch, &pool)
        .await
        .unwrap();

    let detail = actions::get_recipe_detail(created.id, None, &pool)
        .await
        .unwrap();
    assert_eq!(detail.tags.len(), 1);
    assert_eq!(detail.tags[0].id, dinner);
    assert_eq!(detail.ingredients.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn failed_update_keeps_previous_state(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let created = recipe(&pool, &author, "Boiled eggs", &[(eggs, 2)], &[breakfast]).await;

    let patch = RecipePatch {
        name: Some(String::from("Renamed")),
        ingredients: Some(vec![IngredientAmount {
            id: eggs + 100,
            amount: 1,
        }]),
        ..RecipePatch::default()
    };
    let result = actions::update_recipe(created.id, &author, patch, &pool).await;

    assert!(matches!(result, Err(ActionError::NotFound(_))));
    assert_eq!(composition(&pool, created.id).await, vec![(eggs, 2)]);
    let stored = actions::get_recipe(created.id, &pool).await.unwrap();
    assert_eq!(stored.name, "Boiled eggs");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn only_author_or_admin_may_modify(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let stranger = user(&pool, "stranger", UserRole::User).await;
    let admin = user(&pool, "admin", UserRole::Admin).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let created = recipe(&pool, &author, "Boiled eggs", &[(eggs, 2)], &[breakfast]).await;

    let patch = RecipePatch {
        cooking_time: Some(3),
        ..RecipePatch::default()
    };
    assert!(matches!(
        actions::update_recipe(created.id, &stranger, patch.clone(), &pool).await,
        Err(ActionError::Forbidden(_))
    ));
    assert!(matches!(
        actions::delete_recipe(created.id, &stranger, &pool).await,
        Err(ActionError::Forbidden(_))
    ));

    let updated = actions::update_recipe(created.id, &admin, patch, &pool)
        .await
        .unwrap();
    assert_eq!(updated.cooking_time, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn delete_cascades_to_dependent_rows(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let fan = user(&pool, "fan", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let created = recipe(&pool, &author, "Boiled eggs", &[(eggs, 2)], &[breakfast]).await;

    actions::favorite(&fan, created.id, &pool).await.unwrap();
    actions::add_to_cart(&fan, created.id, &pool).await.unwrap();

    actions::delete_recipe(created.id, &author, &pool)
        .await
        .unwrap();

    assert_eq!(count(&pool, "recipe_ingredients", "recipe_id", created.id).await, 0);
    assert_eq!(count(&pool, "recipe_tags", "recipe_id", created.id).await, 0);
    assert_eq!(count(&pool, "favorites", "recipe_id", created.id).await, 0);
    assert_eq!(count(&pool, "purchases", "recipe_id", created.id).await, 0);
    assert!(matches!(
        actions::get_recipe_detail(created.id, Some(fan.user_id), &pool).await,
        Err(ActionError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn viewer_flags_are_per_viewer(pool: PgPool) {
    let author = user(&pool, "author", UserRole::User).await;
    let fan = user(&pool, "fan", UserRole::User).await;
    let other = user(&pool, "other", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let created = recipe(&pool, &author, "Boiled eggs", &[(eggs, 2)], &[breakfast]).await;

    actions::favorite(&fan, created.id, &pool).await.unwrap();
    actions::add_to_cart(&fan, created.id, &pool).await.unwrap();

    let seen_by_fan = actions::get_recipe_detail(created.id, Some(fan.user_id), &pool)
        .await
        .unwrap();
    assert!(seen_by_fan.flags.is_favorited);
    assert!(seen_by_fan.flags.is_in_shopping_cart);

    for viewer in [None, Some(other.user_id)] {
        let detail = actions::get_recipe_detail(created.id, viewer, &pool)
            .await
            .unwrap();
        assert!(!detail.flags.is_favorited);
        assert!(!detail.flags.is_in_shopping_cart);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a running Postgres (DATABASE_URL)"]
async fn list_filters_by_tag_author_and_flags(pool: PgPool) {
    let alice = user(&pool, "alice", UserRole::User).await;
    let bob = user(&pool, "bob", UserRole::User).await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let dinner = tag(&pool, "dinner", "#49B64E").await;

    let omelette = recipe(&pool, &alice, "Omelette", &[(eggs, 3)], &[breakfast]).await;
    let frittata = recipe(&pool, &bob, "Frittata", &[(eggs, 6)], &[dinner]).await;
    actions::favorite(&bob, omelette.id, &pool).await.unwrap();

    let page = PageRequest::new(None, None, 6).unwrap();

    let all = actions::fetch_recipes(RecipeFilter::default(), page, None, &pool)
        .await
        .unwrap();
    assert_eq!(all.count, 2);
    assert_eq!(all.results[0].id, frittata.id);

    let by_tag = RecipeFilter {
        tags: vec![String::from("breakfast")],
        ..RecipeFilter::default()
    };
    let tagged = actions::fetch_recipes(by_tag, page, None, &pool).await.unwrap();
    assert_eq!(tagged.results.len(), 1);
    assert_eq!(tagged.results[0].id, omelette.id);

    let by_author = RecipeFilter {
        author: Some(bob.user_id),
        ..RecipeFilter::default()
    };
    let authored = actions::fetch_recipes(by_author, page, None, &pool)
        .await
        .unwrap();
    assert_eq!(authored.results.len(), 1);
    assert_eq!(authored.results[0].id, frittata.id);

    let favorites = RecipeFilter {
        is_favorited: Some(true),
        ..RecipeFilter::default()
    };
    let mine = actions::fetch_recipes(favorites.clone(), page, Some(bob.user_id), &pool)
        .await
        .unwrap();
    assert_eq!(mine.count, 1);
    assert!(mine.results[0].flags.is_favorited);

    let anonymous = actions::fetch_recipes(favorites, page, None, &pool)
        .await
        .unwrap();
    assert_eq!(anonymous.count, 0);
}
