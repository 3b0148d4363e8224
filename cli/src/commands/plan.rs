use anyhow::Result;
use std::process;

use mealplan_core::models::PlanOutcome;
use mealplan_core::planner::PlanRequest;
use mealplan_core::service::PlannerSession;

use super::helpers::{describe_plan, json_error, make_rng, render_plan_matrix};

pub(crate) const NO_SELECTION_MESSAGE: &str = "Select a recipe to see a meal plan";

pub(crate) fn cmd_plan(
    session: &PlannerSession,
    size: usize,
    seeds: Vec<String>,
    saved: Vec<String>,
    rng_seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let request = PlanRequest {
        recipes_per_meal_plan: size,
        seed_recipes: seeds,
        saved_meal_plan: (!saved.is_empty()).then_some(saved),
    };

    let mut rng = make_rng(rng_seed);
    let view = session.evaluate(&request, &mut rng)?;

    match (&view.outcome, &view.chart) {
        (PlanOutcome::Planned { plan }, Some(chart)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}\n", describe_plan(plan));
                println!("{}", render_plan_matrix(chart));
            }
            Ok(())
        }
        _ => {
            if json {
                println!("{}", json_error(NO_SELECTION_MESSAGE));
            } else {
                eprintln!("{NO_SELECTION_MESSAGE} (pass --seed <recipe>)");
            }
            process::exit(2);
        }
    }
}
