use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Header of the column holding the unique recipe identifier.
pub const RECIPE_NAME_COLUMN: &str = "Recipe Name";

/// Header prefix marking an ingredient category column, e.g. `Ingredients: Produce`.
pub const INGREDIENT_COLUMN_PREFIX: &str = "Ingredients: ";

/// Ingredient token → category it was declared under.
pub type IngredientTypeMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRow {
    pub id: usize,
    pub name: String,
    /// Values of the other columns, aligned with `RecipeTable::other_columns`.
    pub metadata: Vec<String>,
    pub ingredients_text: String,
    /// Token counts, aligned with `RecipeTable::vocabulary`.
    pub ingredient_counts: Vec<u32>,
}

impl RecipeRow {
    /// Total ingredient mass of the recipe across the whole vocabulary.
    #[must_use]
    pub fn ingredient_mass(&self) -> u32 {
        self.ingredient_counts.iter().sum()
    }

    /// Tokens with a non-zero count, in vocabulary order.
    pub fn ingredients<'a>(&'a self, vocabulary: &'a [String]) -> impl Iterator<Item = (&'a str, u32)> {
        vocabulary
            .iter()
            .zip(&self.ingredient_counts)
            .filter(|(_, count)| **count > 0)
            .map(|(token, count)| (token.as_str(), *count))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeTable {
    pub other_columns: Vec<String>,
    /// Sorted distinct ingredient tokens.
    pub vocabulary: Vec<String>,
    pub recipes: Vec<RecipeRow>,
}

impl RecipeTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&RecipeRow> {
        self.recipes.get(id)
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.recipes.iter().position(|r| r.name == name)
    }

    /// Resolve recipe names to ids, returned in table order.
    ///
    /// Names that are not in the table come back in the second vector, in the
    /// order they were given.
    #[must_use]
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> (Vec<usize>, Vec<String>) {
        let ids = self
            .recipes
            .iter()
            .filter(|r| names.iter().any(|n| n.as_ref() == r.name))
            .map(|r| r.id)
            .collect();
        let missing = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| self.id_of(n).is_none())
            .map(str::to_string)
            .collect();
        (ids, missing)
    }

    #[must_use]
    pub fn names_of(&self, ids: &[usize]) -> Vec<String> {
        ids.iter()
            .filter_map(|&id| self.get(id))
            .map(|r| r.name.clone())
            .collect()
    }

    #[must_use]
    pub fn token_index(&self, token: &str) -> Option<usize> {
        self.vocabulary.binary_search_by(|t| t.as_str().cmp(token)).ok()
    }

    /// Other-column values of a row keyed by column name.
    #[must_use]
    pub fn metadata_of(&self, row: &RecipeRow) -> BTreeMap<String, String> {
        self.other_columns
            .iter()
            .cloned()
            .zip(row.metadata.iter().cloned())
            .collect()
    }

    /// Total count of every token across all recipes, in vocabulary order.
    #[must_use]
    pub fn token_totals(&self) -> Vec<u32> {
        let mut totals = vec![0; self.vocabulary.len()];
        for row in &self.recipes {
            for (total, count) in totals.iter_mut().zip(&row.ingredient_counts) {
                *total += count;
            }
        }
        totals
    }
}

/// Everything the parser produces from one uploaded dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDataset {
    pub table: RecipeTable,
    pub ingredient_types: IngredientTypeMap,
}

impl ParsedDataset {
    #[must_use]
    pub fn other_columns(&self) -> &[String] {
        &self.table.other_columns
    }

    #[must_use]
    pub fn ingredient_type(&self, token: &str) -> Option<&str> {
        self.ingredient_types.get(token).map(String::as_str)
    }

    #[must_use]
    pub fn recipe_summary(&self, row: &RecipeRow) -> RecipeSummary {
        RecipeSummary {
            id: row.id,
            name: row.name.clone(),
            metadata: self.table.metadata_of(row),
            ingredients: row
                .ingredients(&self.table.vocabulary)
                .map(|(token, _)| token.to_string())
                .collect(),
        }
    }

    /// Every vocabulary token with its category and how many recipes use it.
    #[must_use]
    pub fn ingredient_summaries(&self) -> Vec<IngredientSummary> {
        let totals = self.table.token_totals();
        self.table
            .vocabulary
            .iter()
            .enumerate()
            .map(|(idx, token)| IngredientSummary {
                token: token.clone(),
                ingredient_type: self.ingredient_types.get(token).cloned(),
                recipes: self
                    .table
                    .recipes
                    .iter()
                    .filter(|r| r.ingredient_counts[idx] > 0)
                    .count(),
                total_count: totals[idx],
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: usize,
    pub name: String,
    pub metadata: BTreeMap<String, String>,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientSummary {
    pub token: String,
    pub ingredient_type: Option<String>,
    /// Number of recipes that use the ingredient at least once.
    pub recipes: usize,
    pub total_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Grown from the seeds by the randomized greedy search.
    Search,
    /// The seeds already filled the requested size.
    Seeds,
    /// Reused verbatim from a saved plan.
    Saved,
}

/// One extension of the partial plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthStep {
    pub recipe_id: usize,
    pub recipe_name: String,
    pub intersection_weight: u32,
    pub union_weight: u32,
    /// `intersection_weight / union_weight` of the chosen recipe, before perturbation.
    pub ratio: f64,
    /// Highest unperturbed ratio among all candidates of this step.
    pub best_ratio: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealPlan {
    pub recipe_ids: Vec<usize>,
    pub recipe_names: Vec<String>,
    pub source: PlanSource,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<GrowthStep>,
}

impl MealPlan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipe_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipe_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// No seed recipes were selected, so there is nothing to grow.
    NoSelection,
    Planned { plan: MealPlan },
}

impl PlanOutcome {
    #[must_use]
    pub fn plan(&self) -> Option<&MealPlan> {
        match self {
            Self::NoSelection => None,
            Self::Planned { plan } => Some(plan),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub label: String,
    pub recipe_names: Vec<String>,
}

impl SavedPlan {
    #[must_use]
    pub fn from_names(recipe_names: Vec<String>) -> Self {
        Self {
            label: recipe_names.join(", "),
            recipe_names,
        }
    }
}

/// Count how often each ingredient token is used across a set of recipes.
#[must_use]
pub fn usage_by_token<'a>(table: &'a RecipeTable, ids: &[usize]) -> HashMap<&'a str, u32> {
    let mut usage = HashMap::new();
    for row in ids.iter().filter_map(|&id| table.get(id)) {
        for (token, count) in row.ingredients(&table.vocabulary) {
            *usage.entry(token).or_insert(0) += count;
        }
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: usize, name: &str, counts: Vec<u32>) -> RecipeRow {
        RecipeRow {
            id,
            name: name.to_string(),
            metadata: vec![format!("cuisine-{id}")],
            ingredients_text: String::new(),
            ingredient_counts: counts,
        }
    }

    fn sample_table() -> RecipeTable {
        RecipeTable {
            other_columns: vec!["Cuisine".to_string()],
            vocabulary: vec!["eggs".to_string(), "flour".to_string(), "milk".to_string()],
            recipes: vec![
                row(0, "Pancakes", vec![1, 1, 1]),
                row(1, "Omelette", vec![1, 0, 0]),
                row(2, "Bread", vec![0, 1, 0]),
            ],
        }
    }

    #[test]
    fn test_resolve_names_table_order() {
        let table = sample_table();
        let (ids, missing) = table.resolve_names(&["Bread", "Pancakes", "Soup"]);
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(missing, vec!["Soup".to_string()]);
    }

    #[test]
    fn test_token_index() {
        let table = sample_table();
        assert_eq!(table.token_index("flour"), Some(1));
        assert_eq!(table.token_index("sugar"), None);
    }

    #[test]
    fn test_token_totals() {
        assert_eq!(sample_table().token_totals(), vec![2, 2, 1]);
    }

    #[test]
    fn test_metadata_of() {
        let table = sample_table();
        let meta = table.metadata_of(&table.recipes[1]);
        assert_eq!(meta.get("Cuisine").map(String::as_str), Some("cuisine-1"));
    }

    #[test]
    fn test_usage_by_token() {
        let table = sample_table();
        let usage = usage_by_token(&table, &[0, 1]);
        assert_eq!(usage.get("eggs"), Some(&2));
        assert_eq!(usage.get("flour"), Some(&1));
        assert_eq!(usage.get("milk"), Some(&1));
    }

    #[test]
    fn test_ingredient_summaries() {
        let mut ingredient_types = IngredientTypeMap::new();
        ingredient_types.insert("milk".to_string(), "Dairy".to_string());
        let dataset = ParsedDataset {
            table: sample_table(),
            ingredient_types,
        };

        let summaries = dataset.ingredient_summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].token, "eggs");
        assert_eq!(summaries[0].recipes, 2);
        assert_eq!(summaries[0].ingredient_type, None);
        assert_eq!(summaries[2].ingredient_type.as_deref(), Some("Dairy"));
        assert_eq!(summaries[2].total_count, 1);
    }

    #[test]
    fn test_recipe_summary() {
        let dataset = ParsedDataset {
            table: sample_table(),
            ingredient_types: IngredientTypeMap::new(),
        };
        let summary = dataset.recipe_summary(&dataset.table.recipes[0]);
        assert_eq!(summary.name, "Pancakes");
        assert_eq!(summary.ingredients, vec!["eggs", "flour", "milk"]);
    }

    #[test]
    fn test_saved_plan_label() {
        let saved = SavedPlan::from_names(vec!["Bread".to_string(), "Soup".to_string()]);
        assert_eq!(saved.label, "Bread, Soup");
    }

    #[test]
    fn test_plan_outcome_serializes_status() {
        let json = serde_json::to_value(PlanOutcome::NoSelection).unwrap();
        assert_eq!(json["status"], "no_selection");
    }
}
