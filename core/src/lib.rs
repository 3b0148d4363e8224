//! Recipe parsing and overlap-driven meal plan search.
//!
//! [`dataset::parse_recipe_csv`] turns a recipe spreadsheet into a
//! [`models::RecipeTable`] with one ingredient count vector per recipe.
//! [`planner::build_meal_plan`] grows a set of seed recipes into a plan whose
//! recipes share as many ingredients as possible, and
//! [`service::PlannerSession`] keeps the per-session selections and saved plans.

pub mod chart;
pub mod dataset;
pub mod error;
pub mod models;
pub mod planner;
pub mod search;
pub mod service;

pub use error::PlanError;
