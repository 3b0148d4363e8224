use anyhow::Result;
use std::process;

use mealplan_core::models::RecipeSummary;
use mealplan_core::service::PlannerSession;

use super::helpers::{render_ingredient_table, render_recipe_table};

pub(crate) fn cmd_recipes(session: &PlannerSession, search: Option<&str>, json: bool) -> Result<()> {
    let dataset = session.dataset();
    let recipes: Vec<RecipeSummary> = session
        .search(search.unwrap_or(""))
        .into_iter()
        .map(|row| dataset.recipe_summary(row))
        .collect();

    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            match search {
                Some(q) => eprintln!("No recipes found for '{q}'"),
                None => eprintln!("No recipes in dataset"),
            }
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else {
        println!("{}", render_recipe_table(&recipes));
    }

    Ok(())
}

pub(crate) fn cmd_ingredients(session: &PlannerSession, json: bool) -> Result<()> {
    let ingredients = session.dataset().ingredient_summaries();

    if ingredients.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No ingredient columns found (expected headers like 'Ingredients: Produce')");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ingredients)?);
    } else {
        println!("{}", render_ingredient_table(&ingredients));
    }

    Ok(())
}
