//! Validation of recipe payloads.
//!
//! Shape checks run on the payload alone. Existence checks run against a
//! [`CatalogSnapshot`] fetched in one batch inside the write transaction, so
//! nothing is written before every referenced row has been seen.

use std::collections::{BTreeSet, HashSet};

use super::{
    error::ActionError,
    schema::{IngredientAmount, NewRecipe, RecipePatch, Uuid},
};
use crate::constants::{RECIPE_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH};

/// Ingredient and tag ids known to exist at the time of the write.
#[derive(Debug, Default, Clone)]
pub struct CatalogSnapshot {
    pub ingredients: HashSet<Uuid>,
    pub tags: HashSet<Uuid>,
}

impl CatalogSnapshot {
    pub fn check_ingredients(&self, parts: &[IngredientAmount]) -> Result<(), ActionError> {
        match parts
            .iter()
            .find(|part| !self.ingredients.contains(&part.id))
        {
            Some(part) => Err(ActionError::NotFound(format!(
                "Ingredient {} does not exist",
                part.id
            ))),
            None => Ok(()),
        }
    }

    pub fn check_tags(&self, tags: &BTreeSet<Uuid>) -> Result<(), ActionError> {
        match tags.iter().find(|tag| !self.tags.contains(tag)) {
            Some(tag) => Err(ActionError::Validation(format!(
                "Tag {tag} does not exist"
            ))),
            None => Ok(()),
        }
    }
}

pub fn validate_ingredients(parts: &[IngredientAmount]) -> Result<(), ActionError> {
    if parts.is_empty() {
        return Err(ActionError::Validation(String::from(
            "Ingredients: at least one ingredient is required",
        )));
    }

    if let Some(part) = parts.iter().find(|part| part.amount < 1) {
        return Err(ActionError::Validation(format!(
            "Ingredients: amount of ingredient {} must be at least 1",
            part.id
        )));
    }

    let mut seen = HashSet::with_capacity(parts.len());
    if parts.iter().any(|part| !seen.insert(part.id)) {
        return Err(ActionError::Validation(String::from(
            "Ingredients: ingredients must be unique",
        )));
    }

    Ok(())
}

/// Duplicate tag ids collapse into one association.
pub fn validate_tags(tags: &[Uuid]) -> Result<BTreeSet<Uuid>, ActionError> {
    if tags.is_empty() {
        return Err(ActionError::Validation(String::from(
            "Tags: at least one tag is required",
        )));
    }

    Ok(tags.iter().copied().collect())
}

pub fn validate_name(name: &str) -> Result<(), ActionError> {
    if name.trim().is_empty() {
        return Err(ActionError::Validation(String::from(
            "Name: this field may not be blank",
        )));
    }
    if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        return Err(ActionError::Validation(format!(
            "Name: at most {RECIPE_NAME_MAX_LENGTH} characters"
        )));
    }
    Ok(())
}

/// `max` counts characters, like a `VARCHAR(max)` column does.
pub fn validate_length(field: &str, value: &str, max: usize) -> Result<(), ActionError> {
    if value.chars().count() > max {
        return Err(ActionError::Validation(format!(
            "{field}: at most {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<(), ActionError> {
    if text.trim().is_empty() {
        return Err(ActionError::Validation(String::from(
            "Text: this field may not be blank",
        )));
    }
    Ok(())
}

pub fn validate_image(image: &str) -> Result<(), ActionError> {
    if image.trim().is_empty() {
        return Err(ActionError::Validation(String::from(
            "Image: this field may not be blank",
        )));
    }
    Ok(())
}

pub fn validate_cooking_time(cooking_time: i32) -> Result<(), ActionError> {
    if cooking_time < 1 {
        return Err(ActionError::Validation(String::from(
            "Cooking time: must be at least 1 minute",
        )));
    }
    Ok(())
}

/// Runs every payload-only check of a new recipe and returns the tag set.
pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<BTreeSet<Uuid>, ActionError> {
    validate_name(&recipe.name)?;
    validate_image(&recipe.image)?;
    validate_text(&recipe.text)?;
    validate_cooking_time(recipe.cooking_time)?;
    validate_ingredients(&recipe.ingredients)?;
    validate_tags(&recipe.tags)
}

/// Same as [`validate_new_recipe`] but only for the fields present.
pub fn validate_patch(patch: &RecipePatch) -> Result<Option<BTreeSet<Uuid>>, ActionError> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(image) = &patch.image {
        validate_image(image)?;
    }
    if let Some(text) = &patch.text {
        validate_text(text)?;
    }
    if let Some(cooking_time) = patch.cooking_time {
        validate_cooking_time(cooking_time)?;
    }
    if let Some(ingredients) = &patch.ingredients {
        validate_ingredients(ingredients)?;
    }
    patch.tags.as_deref().map(validate_tags).transpose()
}

pub fn validate_color(color: &str) -> Result<(), ActionError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if !valid {
        return Err(ActionError::Validation(format!(
            "Color: '{color}' is not a #RRGGBB hex code"
        )));
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), ActionError> {
    let valid = !slug.is_empty()
        && slug.len() <= TAG_SLUG_MAX_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(ActionError::Validation(format!(
            "Slug: '{slug}' must be 1-{TAG_SLUG_MAX_LENGTH} letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}
