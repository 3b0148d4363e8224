use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{IngredientTypeMap, MealPlan, RecipeTable};

/// One filled cell of the recipe × ingredient matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartCell {
    pub recipe_name: String,
    /// Display name, e.g. `Olive Oil`.
    pub ingredient: String,
    pub ingredient_token: String,
    pub ingredient_type: Option<String>,
    pub count: u32,
    /// Other-column values of the recipe, for tooltips.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub recipes: Vec<String>,
    pub cells: Vec<ChartCell>,
    /// Distinct display names in the order the matrix rows should be drawn.
    pub ingredient_order: Vec<String>,
}

impl ChartData {
    #[must_use]
    pub fn count(&self, recipe_name: &str, ingredient: &str) -> u32 {
        self.cells
            .iter()
            .find(|c| c.recipe_name == recipe_name && c.ingredient == ingredient)
            .map_or(0, |c| c.count)
    }

    #[must_use]
    pub fn ingredient_type(&self, ingredient: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.ingredient == ingredient)
            .and_then(|c| c.ingredient_type.as_deref())
    }
}

/// Flatten a plan into long-format chart rows with count > 0.
///
/// Ingredients are ordered by type (descending), then by how often the plan
/// uses them (descending), then by name.
#[must_use]
pub fn build_chart_data(
    table: &RecipeTable,
    ingredient_types: &IngredientTypeMap,
    plan: &MealPlan,
) -> ChartData {
    let mut cells = Vec::new();
    let mut recipes = Vec::new();

    for row in plan.recipe_ids.iter().filter_map(|&id| table.get(id)) {
        recipes.push(row.name.clone());
        let metadata = table.metadata_of(row);
        for (token, count) in row.ingredients(&table.vocabulary) {
            cells.push(ChartCell {
                recipe_name: row.name.clone(),
                ingredient: display_ingredient_name(token),
                ingredient_token: token.to_string(),
                ingredient_type: ingredient_types.get(token).cloned(),
                count,
                metadata: metadata.clone(),
            });
        }
    }

    let ingredient_order = ingredient_order(&cells);
    ChartData {
        recipes,
        cells,
        ingredient_order,
    }
}

fn ingredient_order(cells: &[ChartCell]) -> Vec<String> {
    let mut totals: HashMap<(&str, &str), u32> = HashMap::new();
    for cell in cells {
        let kind = cell.ingredient_type.as_deref().unwrap_or("");
        *totals.entry((kind, cell.ingredient.as_str())).or_insert(0) += cell.count;
    }

    let mut grouped: Vec<((&str, &str), u32)> = totals.into_iter().collect();
    grouped.sort_by(|((type_a, name_a), count_a), ((type_b, name_b), count_b)| {
        type_b
            .cmp(type_a)
            .then_with(|| count_b.cmp(count_a))
            .then_with(|| name_a.cmp(name_b))
    });

    let mut order: Vec<String> = Vec::with_capacity(grouped.len());
    for ((_, name), _) in grouped {
        if !order.iter().any(|n| n == name) {
            order.push(name.to_string());
        }
    }
    order
}

/// `olive_oil` → `Olive Oil`.
#[must_use]
pub fn display_ingredient_name(token: &str) -> String {
    let spaced = token.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_alpha = false;
    for c in spaced.trim().chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
