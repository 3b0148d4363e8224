use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PlanError;
use crate::models::{GrowthStep, MealPlan, PlanOutcome, PlanSource, RecipeTable};

/// Default spread of the multiplicative noise applied to every candidate score.
pub const RANDOMIZATION_STRENGTH: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Scores are multiplied by a weight drawn from `[1 - r, 1 + r]`. Clamped to `[0, 1]`.
    pub randomization_strength: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            randomization_strength: RANDOMIZATION_STRENGTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub recipes_per_meal_plan: usize,
    #[serde(default)]
    pub seed_recipes: Vec<String>,
    /// When non-empty, used as the plan directly and the search is skipped.
    #[serde(default)]
    pub saved_meal_plan: Option<Vec<String>>,
}

/// How well one candidate overlaps the partial plan in a single growth step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub recipe_id: usize,
    /// Candidate's ingredient counts restricted to the plan's ingredients.
    pub intersection_weight: u32,
    /// Candidate's total ingredient count.
    pub union_weight: u32,
    pub random_weight: f64,
}

impl CandidateScore {
    /// Unperturbed overlap ratio; `None` for a recipe without ingredients.
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        (self.union_weight > 0)
            .then(|| f64::from(self.intersection_weight) / f64::from(self.union_weight))
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.ratio().map_or(0.0, |ratio| ratio * self.random_weight)
    }
}

/// Build a meal plan of `request.recipes_per_meal_plan` recipes.
///
/// A non-empty saved plan is resolved by name and returned as is. Otherwise
/// the selected seeds are grown one recipe at a time, each step taking the
/// candidate whose ingredients overlap the plan the most after a random
/// perturbation drawn from `rng`.
pub fn build_meal_plan<R: Rng>(
    table: &RecipeTable,
    request: &PlanRequest,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<PlanOutcome, PlanError> {
    let target = request.recipes_per_meal_plan;
    if target == 0 {
        return Err(PlanError::InvalidPlanSize);
    }

    if let Some(saved) = request.saved_meal_plan.as_deref().filter(|s| !s.is_empty()) {
        let (ids, missing) = table.resolve_names(saved);
        if !missing.is_empty() {
            warn!(?missing, "Saved meal plan references recipes missing from the dataset");
        }
        return Ok(planned(table, ids, PlanSource::Saved, Vec::new()));
    }

    let (seeds, missing) = table.resolve_names(&request.seed_recipes);
    if !missing.is_empty() {
        warn!(?missing, "Ignoring unknown seed recipes");
    }
    if seeds.is_empty() {
        info!("No seed recipes selected");
        return Ok(PlanOutcome::NoSelection);
    }

    if seeds.len() >= target {
        return Ok(planned(table, seeds, PlanSource::Seeds, Vec::new()));
    }

    if target > table.len() {
        return Err(PlanError::InsufficientRecipes {
            requested: target,
            available: table.len(),
        });
    }

    let strength = config.randomization_strength.clamp(0.0, 1.0);
    let mut current = seeds;
    let mut steps = Vec::with_capacity(target - current.len());

    while current.len() < target {
        let candidates = score_candidates(table, &current, strength, rng);
        let Some(best) = select_best(&candidates) else {
            return Err(PlanError::InsufficientRecipes {
                requested: target,
                available: table.len(),
            });
        };

        let best_ratio = candidates
            .iter()
            .filter_map(CandidateScore::ratio)
            .fold(0.0, f64::max);
        let recipe_name = table
            .get(best.recipe_id)
            .map(|r| r.name.clone())
            .unwrap_or_default();

        debug!(
            recipe = %recipe_name,
            intersection = best.intersection_weight,
            union = best.union_weight,
            score = best.score(),
            candidates = candidates.len(),
            "Extended meal plan"
        );

        current.push(best.recipe_id);
        steps.push(GrowthStep {
            recipe_id: best.recipe_id,
            recipe_name,
            intersection_weight: best.intersection_weight,
            union_weight: best.union_weight,
            ratio: best.ratio().unwrap_or(0.0),
            best_ratio,
            score: best.score(),
        });
    }

    current.sort_unstable();
    let outcome = planned(table, current, PlanSource::Search, steps);
    if let Some(plan) = outcome.plan() {
        info!(recipes = ?plan.recipe_names, "Built meal plan");
    }
    Ok(outcome)
}

/// Which vocabulary columns the recipes in `ids` use at least once.
#[must_use]
pub fn plan_support(table: &RecipeTable, ids: &[usize]) -> Vec<bool> {
    let mut totals = vec![0u32; table.vocabulary.len()];
    for row in ids.iter().filter_map(|&id| table.get(id)) {
        for (total, count) in totals.iter_mut().zip(&row.ingredient_counts) {
            *total += count;
        }
    }
    totals.into_iter().map(|t| t >= 1).collect()
}

/// Score every recipe not yet in `current`, in table order.
pub fn score_candidates<R: Rng>(
    table: &RecipeTable,
    current: &[usize],
    randomization_strength: f64,
    rng: &mut R,
) -> Vec<CandidateScore> {
    let support = plan_support(table, current);
    let low = 1.0 - randomization_strength;
    let high = 1.0 + randomization_strength;

    table
        .recipes
        .iter()
        .filter(|row| !current.contains(&row.id))
        .map(|row| {
            let intersection_weight = row
                .ingredient_counts
                .iter()
                .zip(&support)
                .filter(|(_, in_plan)| **in_plan)
                .map(|(count, _)| count)
                .sum();
            CandidateScore {
                recipe_id: row.id,
                intersection_weight,
                union_weight: row.ingredient_mass(),
                random_weight: rng.random_range(low..=high),
            }
        })
        .collect()
}

/// Pick the highest-scoring candidate, first one wins a tie.
///
/// Recipes without ingredients are only picked once nothing else is left.
#[must_use]
pub fn select_best(candidates: &[CandidateScore]) -> Option<&CandidateScore> {
    let mut best: Option<&CandidateScore> = None;
    for candidate in candidates.iter().filter(|c| c.union_weight > 0) {
        if best.is_none_or(|b| candidate.score() > b.score()) {
            best = Some(candidate);
        }
    }
    best.or_else(|| candidates.first())
}

fn planned(
    table: &RecipeTable,
    recipe_ids: Vec<usize>,
    source: PlanSource,
    steps: Vec<GrowthStep>,
) -> PlanOutcome {
    PlanOutcome::Planned {
        plan: MealPlan {
            recipe_names: table.names_of(&recipe_ids),
            recipe_ids,
            source,
            steps,
        },
    }
}
