use crate::meal_model::{ComponentScores, MealScore, WeightSatisfaction};
use crate::profile::{PriorityWeights, UserProfile};
use crate::ranking::{self, llm_ranker};

use super::assembler::MealPlanEngine;
use super::PlanGenerationError;

/// How many locally ranked candidates feed the base-meal search.
const BASE_CANDIDATE_POOL: usize = 15;
/// How many of those the LLM is asked to keep.
const BASE_RERANK_COUNT: usize = 5;

/// The single anchor meal a plan is balanced around, with the per-weight
/// alignment contributions that justify the choice.
#[derive(Debug, Clone)]
pub struct BaseMealSelection {
    pub score: MealScore,
    pub weight_alignment: WeightSatisfaction,
    pub reasoning: String,
}

/// Fraction of a plan's remaining slots that should stay similar to the
/// base meal, as opposed to variety slots.
///
/// `clamp(0.2, 0.7, cultural*0.4 - variety*0.3 + time*0.1)`: a strong
/// cultural weight pulls the plan toward the anchor's cuisine, a strong
/// variety weight pushes away from it, and a time-pressed user gets a
/// slight nudge toward repetition (repeats are faster to cook). Pure
/// function; weights outside [0, 1] are clamped first.
pub fn calculate_base_influence(weights: &PriorityWeights) -> f32 {
    let w = weights.clamped();
    (w.cultural * 0.4 - w.variety * 0.3 + w.time * 0.1).clamp(0.2, 0.7)
}

/// Per-weight alignment contributions for explanation text: component
/// score times the corresponding weight. Variety has no per-meal component
/// score; its contribution is the variety-weighted share of the plan that
/// base influence leaves to non-similar slots.
pub(crate) fn weight_alignment(
    components: &ComponentScores,
    weights: &PriorityWeights,
    base_influence: f32,
) -> WeightSatisfaction {
    let w = weights.clamped();
    WeightSatisfaction {
        cost: components.cost * w.cost,
        health: components.health * w.health,
        cultural: components.cultural * w.cultural,
        variety: w.variety * (1.0 - base_influence),
        time: components.time * w.time,
    }
}

impl MealPlanEngine {
    /// Picks the plan's anchor meal: top locally ranked candidates,
    /// re-ranked by the LLM, best survivor adopted.
    ///
    /// `preferred_cultures`, when non-empty, overrides the profile's
    /// cultural background for the search. Returns `Ok(None)` when no
    /// cached candidates exist at all - the caller must supply a different
    /// fallback path. LLM failures propagate per the ranking delegate's
    /// loud-failure contract.
    pub async fn find_optimal_base_meal(
        &self,
        user_id: &str,
        profile: &UserProfile,
        preferred_cultures: &[String],
    ) -> Result<Option<BaseMealSelection>, PlanGenerationError> {
        let mut effective = profile.clone();
        if !preferred_cultures.is_empty() {
            effective.cultural_background = preferred_cultures.to_vec();
        }

        let local = ranking::ranked_meals(
            self.cuisine_source(),
            user_id,
            &effective,
            BASE_CANDIDATE_POOL,
            0.0,
        )
        .await
        .map_err(|err| PlanGenerationError::CuisineData(format!("{}", err)))?;

        if local.is_empty() {
            return Ok(None);
        }

        let outcome = llm_ranker::rank_meals(
            self.chat_backend(),
            self.model(),
            &local,
            &effective,
            BASE_RERANK_COUNT,
        )
        .await?;

        let Some(best) = outcome.ranked.first() else {
            return Ok(None);
        };

        let influence = calculate_base_influence(&effective.priority_weights);
        let alignment =
            weight_alignment(&best.component_scores, &effective.priority_weights, influence);
        let reasoning = if outcome.reasoning.is_empty() {
            best.ranking_explanation.clone()
        } else {
            outcome.reasoning.clone()
        };

        Ok(Some(BaseMealSelection {
            score: best.clone(),
            weight_alignment: alignment,
            reasoning,
        }))
    }
}
