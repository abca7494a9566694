use std::collections::HashSet;

use super::schema::{Uuid, ViewerFlags};

/// Recipes the current viewer has favorited or put in their cart, restricted
/// to the recipes being rendered.
#[derive(Debug, Default, Clone)]
pub struct ViewerFlagSet {
    pub favorites: HashSet<Uuid>,
    pub cart: HashSet<Uuid>,
}

impl ViewerFlagSet {
    /// Anonymous viewers never have any flags set.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn flags_for(&self, recipe_id: Uuid) -> ViewerFlags {
        ViewerFlags {
            is_favorited: self.favorites.contains(&recipe_id),
            is_in_shopping_cart: self.cart.contains(&recipe_id),
        }
    }
}

/// How a boolean list filter on one of the viewer's link tables applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFilter {
    Ignore,
    Require(Uuid),
    /// Nothing can match, e.g. "my favorites" for an anonymous viewer.
    Unsatisfiable,
}

impl FlagFilter {
    pub fn new(requested: Option<bool>, viewer: Option<Uuid>) -> Self {
        match (requested, viewer) {
            (Some(true), Some(viewer)) => FlagFilter::Require(viewer),
            (Some(true), None) => FlagFilter::Unsatisfiable,
            _ => FlagFilter::Ignore,
        }
    }
}
