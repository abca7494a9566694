use std::collections::{BTreeSet, HashMap};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{catalog::load_snapshot, users::fetch_profiles};
use crate::{
    authentication::permissions::ActionType,
    composition::{validate_new_recipe, validate_patch},
    error::{ActionError, ConstraintViolation, QueryError},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{
        IngredientAmount, LinkedRecipeTag, NewRecipe, Recipe, RecipeDetail, RecipeFilter,
        RecipePart, RecipePatch, RecipeRow, Tag, UserProfile, Uuid,
    },
    viewer::{FlagFilter, ViewerFlagSet},
};

fn composition_error(e: sqlx::Error) -> ActionError {
    match ConstraintViolation::of(&e) {
        Some(ConstraintViolation::ForeignKey) => {
            log::warn!("Catalog row vanished during a recipe write: {e}");
            ActionError::NotFound(String::from("Ingredient or tag no longer exists"))
        }
        Some(ConstraintViolation::Unique) => ActionError::Validation(String::from(
            "Ingredients: ingredients must be unique",
        )),
        Some(ConstraintViolation::Check) => ActionError::Validation(String::from(
            "Ingredients: amount must be at least 1",
        )),
        None => QueryError::from(e).into(),
    }
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Recipe, ActionError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| ActionError::NotFound(String::from("Recipe not found")))
}

/// Fetches a recipe the session is allowed to modify: its own, or any for admins.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ActionError> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if recipe.author_id == session.user_id {
        return Ok(recipe);
    }
    session.authenticate(ActionType::ManageAllRecipes)?;
    Ok(recipe)
}

async fn insert_parts(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    parts: &[IngredientAmount],
) -> Result<(), ActionError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(parts.iter(), |mut b, part| {
        b.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });

    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(composition_error)?;

    Ok(())
}

async fn insert_tags(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    tags: &BTreeSet<Uuid>,
) -> Result<(), ActionError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    builder.push_values(tags.iter(), |mut b, tag| {
        b.push_bind(recipe_id).push_bind(*tag);
    });

    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(composition_error)?;

    Ok(())
}

/// Creates a recipe together with its ingredient and tag rows.
///
/// The whole write runs in one transaction: every referenced ingredient and
/// tag is checked against a single snapshot before anything is inserted, and
/// any failure afterwards rolls the recipe row back with its parts.
pub async fn create_recipe(
    session: &SessionData,
    recipe: NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ActionError> {
    session.authenticate(ActionType::CreateRecipes)?;
    let tags = validate_new_recipe(&recipe)?;

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let snapshot = load_snapshot(&mut *tr, &recipe.ingredients, &tags).await?;
    snapshot.check_ingredients(&recipe.ingredients)?;
    snapshot.check_tags(&tags)?;

    let row: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_parts(&mut *tr, row.id, &recipe.ingredients).await?;
    insert_tags(&mut *tr, row.id, &tags).await?;

    tr.commit().await.map_err(QueryError::from)?;

    log::info!(
        "User {} created recipe {} with {} ingredients",
        session.user_id,
        row.id,
        recipe.ingredients.len()
    );
    Ok(row)
}

/// Applies a partial update. Supplied ingredient or tag lists replace the
/// stored ones wholesale.
pub async fn update_recipe(
    id: Uuid,
    session: &SessionData,
    patch: RecipePatch,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ActionError> {
    let tags = validate_patch(&patch)?;
    get_recipe_mut(id, session, pool).await?;

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    if locked.is_none() {
        return Err(ActionError::NotFound(String::from("Recipe not found")));
    }

    let no_parts = vec![];
    let parts = patch.ingredients.as_ref().unwrap_or(&no_parts);
    let no_tags = BTreeSet::new();
    let snapshot = load_snapshot(&mut *tr, parts, tags.as_ref().unwrap_or(&no_tags)).await?;
    snapshot.check_ingredients(parts)?;
    if let Some(tags) = &tags {
        snapshot.check_tags(tags)?;
    }

    let row: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET
            name = COALESCE($2, name),
            image = COALESCE($3, image),
            text = COALESCE($4, text),
            cooking_time = COALESCE($5, cooking_time)
        WHERE id = $1
        RETURNING *
    ",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.image)
    .bind(&patch.text)
    .bind(patch.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if let Some(parts) = &patch.ingredients {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
        insert_parts(&mut *tr, id, parts).await?;
    }

    if let Some(tags) = &tags {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
        insert_tags(&mut *tr, id, tags).await?;
    }

    tr.commit().await.map_err(QueryError::from)?;

    log::info!("User {} updated recipe {}", session.user_id, id);
    Ok(row)
}

/// Composition rows, favorites and purchases go with the recipe.
pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {} deleted recipe {}", session.user_id, id);
    Ok(())
}

pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, ActionError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, ActionError> {
    let rows: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_viewer_flags(
    viewer: Option<Uuid>,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<ViewerFlagSet, ActionError> {
    let viewer = match viewer {
        Some(viewer) => viewer,
        None => return Ok(ViewerFlagSet::anonymous()),
    };

    let rows: Vec<(Uuid, bool, bool)> = sqlx::query_as(
        "
        SELECT r.id,
            EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $1),
            EXISTS (SELECT 1 FROM purchases p WHERE p.recipe_id = r.id AND p.user_id = $1)
        FROM recipes r
        WHERE r.id = ANY($2)
    ",
    )
    .bind(viewer)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut flags = ViewerFlagSet::default();
    for (id, favorited, in_cart) in rows {
        if favorited {
            flags.favorites.insert(id);
        }
        if in_cart {
            flags.cart.insert(id);
        }
    }
    Ok(flags)
}

/// Joins batch-fetched parts, tags, authors and flags onto their recipes,
/// keeping the order of `recipes`.
pub fn assemble(
    recipes: Vec<Recipe>,
    parts: Vec<RecipePart>,
    tags: Vec<LinkedRecipeTag>,
    authors: &HashMap<Uuid, UserProfile>,
    flags: &ViewerFlagSet,
) -> Vec<RecipeDetail> {
    let mut parts_by_recipe: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    for part in parts {
        parts_by_recipe.entry(part.recipe_id).or_default().push(part);
    }

    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for tag in tags {
        tags_by_recipe
            .entry(tag.recipe_id)
            .or_default()
            .push(tag.into());
    }

    recipes
        .into_iter()
        .filter_map(|recipe| {
            let author = match authors.get(&recipe.author_id) {
                Some(author) => author.clone(),
                None => {
                    log::warn!("Recipe {} has no readable author", recipe.id);
                    return None;
                }
            };

            Some(RecipeDetail {
                id: recipe.id,
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: parts_by_recipe.remove(&recipe.id).unwrap_or_default(),
                flags: flags.flags_for(recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                pub_date: recipe.pub_date,
            })
        })
        .collect()
}

pub async fn load_details(
    recipes: Vec<Recipe>,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, ActionError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let parts = list_recipe_parts(&ids, pool).await?;
    let tags = list_recipe_tags(&ids, pool).await?;
    let authors = fetch_profiles(&author_ids, viewer, pool).await?;
    let flags = fetch_viewer_flags(viewer, &ids, pool).await?;

    Ok(assemble(recipes, parts, tags, &authors, &flags))
}

pub async fn get_recipe_detail(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ActionError> {
    let recipe = get_recipe(id, pool).await?;

    load_details(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| ActionError::NotFound(String::from("Recipe not found")))
}

fn push_flag_filter(builder: &mut QueryBuilder<'_, Postgres>, table: &str, viewer: Uuid) {
    builder
        .push(format!(
            " AND EXISTS (SELECT 1 FROM {table} l WHERE l.recipe_id = r.id AND l.user_id = "
        ))
        .push_bind(viewer)
        .push(")");
}

/// Newest first. Tag slugs match if the recipe carries any of them.
pub async fn fetch_recipes(
    filter: RecipeFilter,
    page: PageRequest,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeDetail>, ActionError> {
    let favorited = FlagFilter::new(filter.is_favorited, viewer);
    let in_cart = FlagFilter::new(filter.is_in_shopping_cart, viewer);
    if favorited == FlagFilter::Unsatisfiable || in_cart == FlagFilter::Unsatisfiable {
        return Ok(PageContext::from_rows(vec![], 0, page));
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags)
            .push("))");
    }
    if let FlagFilter::Require(viewer) = favorited {
        push_flag_filter(&mut builder, "favorites", viewer);
    }
    if let FlagFilter::Require(viewer) = in_cart {
        push_flag_filter(&mut builder, "purchases", viewer);
    }

    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes: Vec<Recipe> = rows.into_iter().map(Recipe::from).collect();
    let details = load_details(recipes, viewer, pool).await?;

    Ok(PageContext::from_rows(details, total_count, page))
}
