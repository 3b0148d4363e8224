use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplan_core::chart::{ChartData, display_ingredient_name};
use mealplan_core::models::{IngredientSummary, MealPlan, PlanSource, RecipeSummary, SavedPlan};

/// Deterministic generator when a seed is given, OS entropy otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

fn recipe_columns(recipe: &RecipeSummary) -> (String, String, String) {
    let details = recipe
        .metadata
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    let ingredients = recipe
        .ingredients
        .iter()
        .map(|t| display_ingredient_name(t))
        .collect::<Vec<_>>()
        .join(", ");
    (truncate(&recipe.name, 35), details, truncate(&ingredients, 60))
}

pub(crate) fn render_recipe_table(recipes: &[RecipeSummary]) -> String {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "Recipe")]
        name: String,
        #[tabled(rename = "Details")]
        details: String,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| {
            let (name, details, ingredients) = recipe_columns(r);
            RecipeRow {
                name,
                details,
                ingredients,
            }
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}

/// Recipe table with a leading `[x]` column for the session's seed selection.
pub(crate) fn render_recipe_selection(
    recipes: &[RecipeSummary],
    is_selected: impl Fn(usize) -> bool,
) -> String {
    #[derive(Tabled)]
    struct SelectableRow {
        #[tabled(rename = "")]
        selected: &'static str,
        #[tabled(rename = "Recipe")]
        name: String,
        #[tabled(rename = "Details")]
        details: String,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
    }

    let rows: Vec<SelectableRow> = recipes
        .iter()
        .map(|r| {
            let (name, details, ingredients) = recipe_columns(r);
            SelectableRow {
                selected: if is_selected(r.id) { "[x]" } else { "[ ]" },
                name,
                details,
                ingredients,
            }
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_ingredient_table(ingredients: &[IngredientSummary]) -> String {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "Ingredient")]
        name: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Recipes")]
        recipes: usize,
        #[tabled(rename = "Uses")]
        uses: u32,
    }

    let rows: Vec<IngredientRow> = ingredients
        .iter()
        .map(|i| IngredientRow {
            name: display_ingredient_name(&i.token),
            kind: i.ingredient_type.clone().unwrap_or_else(|| "-".into()),
            recipes: i.recipes,
            uses: i.total_count,
        })
        .collect();

    Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string()
}

/// Ingredient × recipe matrix, one row per ingredient in chart order.
pub(crate) fn render_plan_matrix(chart: &ChartData) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["Ingredient".to_string(), "Type".to_string()];
    header.extend(chart.recipes.iter().map(|r| truncate(r, 20)));
    builder.push_record(header);

    for ingredient in &chart.ingredient_order {
        let mut record = vec![
            ingredient.clone(),
            chart
                .ingredient_type(ingredient)
                .unwrap_or("-")
                .to_string(),
        ];
        record.extend(chart.recipes.iter().map(|recipe| {
            match chart.count(recipe, ingredient) {
                0 => String::new(),
                1 => "x".to_string(),
                n => n.to_string(),
            }
        }));
        builder.push_record(record);
    }

    builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::center()))
        .to_string()
}

pub(crate) fn describe_plan(plan: &MealPlan) -> String {
    let how = match plan.source {
        PlanSource::Search => "shared-ingredient search",
        PlanSource::Seeds => "your selection",
        PlanSource::Saved => "saved plan",
    };
    let count = plan.len();
    format!("Meal plan ({count} recipes, from {how}): {}", plan.recipe_names.join(", "))
}

pub(crate) fn render_saved_plans(saved: &[SavedPlan], active: Option<&SavedPlan>) -> String {
    if saved.is_empty() {
        return "No saved meal plans yet.".to_string();
    }
    saved
        .iter()
        .enumerate()
        .map(|(i, plan)| {
            let marker = if active == Some(plan) { "*" } else { " " };
            format!("{marker} {}. {}", i + 1, plan.label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
