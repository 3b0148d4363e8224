use thiserror::Error;

/// Request-level failures of the planner and the session around it.
///
/// None of these end the session; the caller reports them and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Meal plan size must be at least 1")]
    InvalidPlanSize,

    #[error("Meal plan size must be between {min} and {max} (got {size})")]
    PlanSizeOutOfRange { size: usize, min: usize, max: usize },

    #[error("Not enough recipes: requested {requested}, but the dataset only has {available}")]
    InsufficientRecipes { requested: usize, available: usize },

    #[error("No meal plan to save yet")]
    NothingToSave,

    #[error("No saved meal plan at position {}", .0 + 1)]
    UnknownSavedPlan(usize),

    #[error("Unknown recipe: '{0}'")]
    UnknownRecipe(String),
}
