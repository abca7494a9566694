use std::collections::{BTreeSet, HashSet};

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    composition::{validate_color, validate_length, validate_slug, CatalogSnapshot},
    constants::{INGREDIENT_NAME_MAX_LENGTH, MEASUREMENT_UNIT_MAX_LENGTH, TAG_NAME_MAX_LENGTH},
    error::{ActionError, ConstraintViolation, QueryError},
    jwt::SessionData,
    schema::{Ingredient, IngredientAmount, NewIngredient, NewTag, Tag, Uuid},
};

/// Escapes `LIKE` metacharacters so user input only ever matches literally.
pub fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ActionError> {
    let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Tag, ActionError> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| ActionError::NotFound(String::from("Tag not found")))
}

fn validate_tag(tag: &NewTag) -> Result<(), ActionError> {
    let name = tag.name.trim();
    if name.is_empty() {
        return Err(ActionError::Validation(String::from(
            "Name: this field may not be blank",
        )));
    }
    validate_length("Name", name, TAG_NAME_MAX_LENGTH)?;
    validate_color(&tag.color)?;
    validate_slug(&tag.slug)
}

fn validate_ingredient(ingredient: &NewIngredient) -> Result<(), ActionError> {
    let name = ingredient.name.trim();
    let unit = ingredient.measurement_unit.trim();
    if name.is_empty() || unit.is_empty() {
        return Err(ActionError::Validation(String::from(
            "Ingredient: name and measurement_unit may not be blank",
        )));
    }
    validate_length("Name", name, INGREDIENT_NAME_MAX_LENGTH)?;
    validate_length("Measurement unit", unit, MEASUREMENT_UNIT_MAX_LENGTH)
}

pub async fn create_tag(
    session: &SessionData,
    tag: NewTag,
    pool: &Pool<Postgres>,
) -> Result<Tag, ActionError> {
    session.authenticate(ActionType::ManageCatalog)?;
    validate_tag(&tag)?;
    let name = tag.name.trim();

    let row: Tag = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_one(pool)
    .await
    .map_err(|e| match ConstraintViolation::of(&e) {
        Some(ConstraintViolation::Unique) => ActionError::Conflict(String::from(
            "A tag with that name, color or slug already exists",
        )),
        _ => QueryError::from(e).into(),
    })?;

    log::info!("Created tag {} ({})", row.id, row.slug);
    Ok(row)
}

/// Case-insensitive prefix match on the ingredient name.
pub async fn list_ingredients(
    name_prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ActionError> {
    let pattern = like_prefix(name_prefix.unwrap_or_default());

    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE LOWER(name) LIKE LOWER($1) ORDER BY name, id",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, ActionError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| ActionError::NotFound(String::from("Ingredient not found")))
}

pub async fn create_ingredient(
    session: &SessionData,
    ingredient: NewIngredient,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, ActionError> {
    session.authenticate(ActionType::ManageCatalog)?;
    validate_ingredient(&ingredient)?;
    let name = ingredient.name.trim();
    let unit = ingredient.measurement_unit.trim();

    let row: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Created ingredient {} ({})", row.id, row.name);
    Ok(row)
}

/// Fetches, in one pass per table, which of the referenced ids exist.
pub async fn load_snapshot(
    conn: &mut PgConnection,
    parts: &[IngredientAmount],
    tags: &BTreeSet<Uuid>,
) -> Result<CatalogSnapshot, ActionError> {
    let ingredient_ids: Vec<Uuid> = parts.iter().map(|part| part.id).collect();
    let tag_ids: Vec<Uuid> = tags.iter().copied().collect();

    let ingredients: Vec<(Uuid,)> = if ingredient_ids.is_empty() {
        vec![]
    } else {
        sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
            .bind(&ingredient_ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(QueryError::from)?
    };

    let tags: Vec<(Uuid,)> = if tag_ids.is_empty() {
        vec![]
    } else {
        sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(&tag_ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(QueryError::from)?
    };

    Ok(CatalogSnapshot {
        ingredients: ingredients.into_iter().map(|r| r.0).collect::<HashSet<_>>(),
        tags: tags.into_iter().map(|r| r.0).collect::<HashSet<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", "%")]
    #[case("egg", "egg%")]
    #[case("50%", "50\\%%")]
    #[case("a_b", "a\\_b%")]
    #[case("back\\slash", "back\\\\slash%")]
    fn prefix_patterns(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(like_prefix(input), expected);
    }

    fn tag(name: &str) -> NewTag {
        NewTag {
            name: name.to_string(),
            color: String::from("#E26C2D"),
            slug: String::from("breakfast"),
        }
    }

    #[rstest]
    #[case("Breakfast", true)]
    #[case("   ", false)]
    #[case(&"x".repeat(TAG_NAME_MAX_LENGTH), true)]
    #[case(&"x".repeat(TAG_NAME_MAX_LENGTH + 1), false)]
    fn tag_names(#[case] name: &str, #[case] valid: bool) {
        let result = validate_tag(&tag(name));
        assert_eq!(result.is_ok(), valid);
        if let Err(e) = result {
            assert!(matches!(e, ActionError::Validation(_)));
        }
    }

    #[rstest]
    #[case("eggs", "pcs", true)]
    #[case("eggs", "", false)]
    #[case(&"e".repeat(INGREDIENT_NAME_MAX_LENGTH + 1), "pcs", false)]
    #[case("eggs", &"g".repeat(MEASUREMENT_UNIT_MAX_LENGTH + 1), false)]
    fn ingredient_fields(#[case] name: &str, #[case] unit: &str, #[case] valid: bool) {
        let ingredient = NewIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        };
        let result = validate_ingredient(&ingredient);
        assert_eq!(result.is_ok(), valid);
        if let Err(e) = result {
            assert!(matches!(e, ActionError::Validation(_)));
        }
    }
}
