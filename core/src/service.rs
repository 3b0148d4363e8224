use std::collections::BTreeSet;
use std::io::Read;
use std::ops::RangeInclusive;

use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::chart::{ChartData, build_chart_data};
use crate::dataset::parse_recipe_csv;
use crate::error::PlanError;
use crate::models::{ParsedDataset, PlanOutcome, RecipeRow, RecipeTable, SavedPlan};
use crate::planner::{PlanRequest, PlannerConfig, build_meal_plan};
use crate::search::{search_recipes, selected_first};

/// Plan sizes offered to the user.
pub const PLAN_SIZE_CHOICES: RangeInclusive<usize> = 3..=7;
pub const DEFAULT_PLAN_SIZE: usize = 5;

/// Result of one planning request, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub outcome: PlanOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
}

/// State of one planning session: the uploaded dataset plus the user's
/// selections, the current plan and the plans saved so far.
///
/// Nothing here outlives the process.
#[derive(Debug)]
pub struct PlannerSession {
    dataset: ParsedDataset,
    config: PlannerConfig,
    plan_size: usize,
    selected: BTreeSet<usize>,
    active_saved_plan: Option<usize>,
    current_meal_plan: Vec<String>,
    saved_plans: Vec<SavedPlan>,
}

impl PlannerSession {
    #[must_use]
    pub fn new(dataset: ParsedDataset) -> Self {
        Self {
            dataset,
            config: PlannerConfig::default(),
            plan_size: DEFAULT_PLAN_SIZE,
            selected: BTreeSet::new(),
            active_saved_plan: None,
            current_meal_plan: Vec::new(),
            saved_plans: Vec::new(),
        }
    }

    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::new(parse_recipe_csv(reader)?))
    }

    #[must_use]
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn dataset(&self) -> &ParsedDataset {
        &self.dataset
    }

    #[must_use]
    pub fn table(&self) -> &RecipeTable {
        &self.dataset.table
    }

    // --- Selection ---

    #[must_use]
    pub fn plan_size(&self) -> usize {
        self.plan_size
    }

    pub fn set_plan_size(&mut self, size: usize) -> Result<(), PlanError> {
        if !PLAN_SIZE_CHOICES.contains(&size) {
            return Err(PlanError::PlanSizeOutOfRange {
                size,
                min: *PLAN_SIZE_CHOICES.start(),
                max: *PLAN_SIZE_CHOICES.end(),
            });
        }
        self.plan_size = size;
        self.active_saved_plan = None;
        Ok(())
    }

    /// Flip a recipe's seed selection, returning whether it is now selected.
    pub fn toggle_recipe(&mut self, name: &str) -> Result<bool, PlanError> {
        let id = self.recipe_id(name)?;
        let now_selected = if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        };
        self.active_saved_plan = None;
        Ok(now_selected)
    }

    pub fn set_selected(&mut self, name: &str, selected: bool) -> Result<(), PlanError> {
        let id = self.recipe_id(name)?;
        if selected {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
        self.active_saved_plan = None;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.active_saved_plan = None;
    }

    #[must_use]
    pub fn is_selected(&self, id: usize) -> bool {
        self.selected.contains(&id)
    }

    /// Selected seed recipe names, in table order.
    #[must_use]
    pub fn selected_recipes(&self) -> Vec<String> {
        let ids: Vec<usize> = self.selected.iter().copied().collect();
        self.table().names_of(&ids)
    }

    /// Recipes matching `query`, selected ones first.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&RecipeRow> {
        let ids = search_recipes(self.table(), query);
        selected_first(&ids, |id| self.is_selected(id))
            .into_iter()
            .filter_map(|id| self.table().get(id))
            .collect()
    }

    // --- Planning ---

    /// The request the current selections describe.
    #[must_use]
    pub fn plan_request(&self) -> PlanRequest {
        PlanRequest {
            recipes_per_meal_plan: self.plan_size,
            seed_recipes: self.selected_recipes(),
            saved_meal_plan: self.active_saved_plan().map(|p| p.recipe_names.clone()),
        }
    }

    /// Plan for an explicit request without touching session state.
    pub fn evaluate<R: Rng>(&self, request: &PlanRequest, rng: &mut R) -> Result<PlanView, PlanError> {
        let outcome = build_meal_plan(self.table(), request, &self.config, rng)?;
        let chart = outcome
            .plan()
            .map(|plan| build_chart_data(self.table(), &self.dataset.ingredient_types, plan));
        Ok(PlanView { outcome, chart })
    }

    /// Plan for an explicit request and remember the result as the current plan.
    ///
    /// A request without seeds leaves the current plan as it was.
    pub fn submit<R: Rng>(&mut self, request: &PlanRequest, rng: &mut R) -> Result<PlanView, PlanError> {
        let view = self.evaluate(request, rng)?;
        if let Some(plan) = view.outcome.plan() {
            self.current_meal_plan.clone_from(&plan.recipe_names);
        }
        Ok(view)
    }

    /// Plan from the session's own selections.
    pub fn build_plan<R: Rng>(&mut self, rng: &mut R) -> Result<PlanView, PlanError> {
        let request = self.plan_request();
        self.submit(&request, rng)
    }

    #[must_use]
    pub fn current_meal_plan(&self) -> &[String] {
        &self.current_meal_plan
    }

    // --- Saved plans ---

    /// Snapshot the current plan, append it to the saved list and make it active.
    pub fn save_current_plan(&mut self) -> Result<&SavedPlan, PlanError> {
        if self.current_meal_plan.is_empty() {
            return Err(PlanError::NothingToSave);
        }
        self.saved_plans
            .push(SavedPlan::from_names(self.current_meal_plan.clone()));
        let index = self.saved_plans.len() - 1;
        self.active_saved_plan = Some(index);
        info!(label = %self.saved_plans[index].label, "Saved meal plan");
        Ok(&self.saved_plans[index])
    }

    #[must_use]
    pub fn saved_plans(&self) -> &[SavedPlan] {
        &self.saved_plans
    }

    pub fn select_saved_plan(&mut self, index: usize) -> Result<&SavedPlan, PlanError> {
        if index >= self.saved_plans.len() {
            return Err(PlanError::UnknownSavedPlan(index));
        }
        self.active_saved_plan = Some(index);
        Ok(&self.saved_plans[index])
    }

    /// Go back to generating new plans from the selected seeds.
    pub fn clear_saved_plan_selection(&mut self) {
        self.active_saved_plan = None;
    }

    #[must_use]
    pub fn active_saved_plan(&self) -> Option<&SavedPlan> {
        self.active_saved_plan.and_then(|i| self.saved_plans.get(i))
    }

    fn recipe_id(&self, name: &str) -> Result<usize, PlanError> {
        self.table()
            .id_of(name)
            .ok_or_else(|| PlanError::UnknownRecipe(name.to_string()))
    }
}
