use std::collections::HashMap;

use super::schema::{CartPart, ShoppingListItem, Uuid};

/// Groups composition rows by ingredient id and sums their amounts.
///
/// Ingredients sharing a name and unit under different ids stay separate
/// lines. Output is ordered by name, then id.
pub fn aggregate(parts: Vec<CartPart>) -> Vec<ShoppingListItem> {
    let mut hashmap: HashMap<Uuid, ShoppingListItem> = HashMap::new();
    parts
        .into_iter()
        .for_each(|part| match hashmap.get_mut(&part.ingredient_id) {
            Some(item) => item.total += i64::from(part.amount),
            None => {
                hashmap.insert(
                    part.ingredient_id,
                    ShoppingListItem {
                        ingredient_id: part.ingredient_id,
                        name: part.name,
                        measurement_unit: part.measurement_unit,
                        total: part.amount.into(),
                    },
                );
            }
        });

    let mut items: Vec<ShoppingListItem> = hashmap.into_values().collect();
    items.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
    });
    items
}

/// `"<name>, <total> <unit>"` per line, newline-joined.
pub fn render(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| format!("{}, {} {}", item.name, item.total, item.measurement_unit))
        .collect::<Vec<String>>()
        .join("\n")
}
