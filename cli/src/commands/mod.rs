mod helpers;
mod plan;
mod recipes;
mod session;

use std::path::Path;

use anyhow::{Context, Result};

use mealplan_core::service::PlannerSession;

pub(crate) use helpers::make_rng;
pub(crate) use plan::cmd_plan;
pub(crate) use recipes::{cmd_ingredients, cmd_recipes};
pub(crate) use session::cmd_session;

/// Read and parse a recipe CSV into a fresh session.
pub(crate) fn load_session(path: &Path) -> Result<PlannerSession> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    PlannerSession::from_csv(file)
        .with_context(|| format!("Failed to load recipes from {}", path.display()))
}
