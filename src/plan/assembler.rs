use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::api_connection::connection::{ApiConnectionError, ChatCompletionBackend};
use crate::api_connection::endpoints::{
    ChatCompletionRequest, ChatMessage, JsonSchema, JsonSchemaDefinition, JsonSchemaProperty,
    ResponseFormat,
};
use crate::compliance::{adapt_meal_for_restrictions, check_compliance, ComplianceReport};
use crate::cuisine::CuisineSource;
use crate::meal_model::{
    ComponentScores, MealNutrition, MealPlan, MealScore, MealType, StructuredMeal,
    WeightBasedMeal, WeightSatisfaction, MEAL_TYPE_ORDER,
};
use crate::profile::UserProfile;
use crate::ranking::{self, llm_ranker};
use crate::scoring::score_meal;

use super::base_meal::calculate_base_influence;
use super::quota::optimal_cultural_meal_count;
use super::shopping::{build_prep_tips, build_shopping_list};
use super::PlanGenerationError;

/// Candidates below this local total score never reach the LLM ranking
/// pass.
const MIN_CANDIDATE_SCORE: f32 = 0.3;

/// Authenticity assigned to freshly generated meals.
const GENERATED_MEAL_AUTHENTICITY: f32 = 0.5;

/// A component score at or above this counts toward objective overlap.
const OBJECTIVE_OVERLAP_THRESHOLD: f32 = 0.6;

/// Variety credit for a cuisine the plan has already served.
const REPEAT_CUISINE_NOVELTY: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct MealPlanRequest {
    pub user_id: String,
    pub profile: UserProfile,
    pub num_days: u32,
    pub meals_per_day: u32,
    /// Overrides the profile's max total time for this plan when set.
    pub max_total_time_minutes: Option<u32>,
    /// Cached candidates above this difficulty are skipped when set.
    pub max_difficulty: Option<f32>,
}

/// The meal recommendation pipeline's top-level entry point, wired to its
/// two external collaborators: the cultural cuisine cache and the LLM
/// chat-completion backend.
pub struct MealPlanEngine {
    cuisine_source: Arc<dyn CuisineSource>,
    chat_backend: Arc<dyn ChatCompletionBackend>,
    model: String,
}

impl MealPlanEngine {
    pub fn new(
        cuisine_source: Arc<dyn CuisineSource>,
        chat_backend: Arc<dyn ChatCompletionBackend>,
        model: impl Into<String>,
    ) -> Self {
        MealPlanEngine {
            cuisine_source,
            chat_backend,
            model: model.into(),
        }
    }

    pub(crate) fn cuisine_source(&self) -> &dyn CuisineSource {
        self.cuisine_source.as_ref()
    }

    pub(crate) fn chat_backend(&self) -> &dyn ChatCompletionBackend {
        self.chat_backend.as_ref()
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    /// Locally ranked cached meals for "suggest one meal" style callers.
    /// Purely cache-bound; see [`crate::ranking::ranked_meals`].
    pub async fn ranked_meals(
        &self,
        user_id: &str,
        profile: &UserProfile,
        limit: usize,
        min_score_threshold: f32,
    ) -> Result<Vec<MealScore>, PlanGenerationError> {
        ranking::ranked_meals(
            self.cuisine_source(),
            user_id,
            profile,
            limit,
            min_score_threshold,
        )
        .await
        .map_err(|err| PlanGenerationError::CuisineData(format!("{}", err)))
    }

    /// Builds a complete meal plan: every day x meal-type slot filled, a
    /// consolidated shopping list and prep tips.
    ///
    /// Slots fill day-major, breakfast first. Cached cultural meals are
    /// placed until the cultural quota is met, adapted for dietary
    /// restrictions where needed; the rest are generated through the LLM.
    /// Per-slot problems degrade (adaptation, fallback placement, or a
    /// flagged non-compliant slot); only configuration errors, a total
    /// ranking failure or a complete absence of candidates fail the call.
    pub async fn generate_meal_plan(
        &self,
        request: &MealPlanRequest,
        progress_updater: impl Fn(String) + Send + Sync,
    ) -> Result<MealPlan, PlanGenerationError> {
        if request.num_days == 0 {
            return Err(PlanGenerationError::InvalidRequest(
                "num_days must be at least 1".to_string(),
            ));
        }
        let max_meals_per_day = MEAL_TYPE_ORDER.len() as u32;
        if request.meals_per_day == 0 || request.meals_per_day > max_meals_per_day {
            return Err(PlanGenerationError::InvalidRequest(format!(
                "meals_per_day must be between 1 and {}",
                max_meals_per_day
            )));
        }

        let mut profile = request.profile.clone();
        if request.max_total_time_minutes.is_some() {
            profile.max_total_time_minutes = request.max_total_time_minutes;
        }
        let weights = profile.priority_weights.clamped();

        let total_meals = request.num_days * request.meals_per_day;
        let cultural_quota =
            optimal_cultural_meal_count(request.num_days, total_meals, weights.cultural);
        progress_updater(format!(
            "Planning {} meals over {} days; targeting {} cultural meals.",
            total_meals, request.num_days, cultural_quota
        ));

        // Local candidates, then one parallel LLM re-ranking pass over the
        // survivors. The re-ranked list is the cultural pool for the whole
        // plan.
        let mut local = self
            .ranked_meals(
                &request.user_id,
                &profile,
                llm_ranker::MAX_PROMPT_CANDIDATES,
                MIN_CANDIDATE_SCORE,
            )
            .await?;
        if let Some(max_difficulty) = request.max_difficulty {
            local.retain(|candidate| candidate.meal.difficulty_level <= max_difficulty);
        }
        progress_updater(format!(
            "{} cached cultural candidates after local ranking.",
            local.len()
        ));

        let pool: Vec<MealScore> = if local.is_empty() {
            Vec::new()
        } else {
            let pool_size = local.len();
            let outcome = llm_ranker::rank_meals_parallel(
                self.chat_backend(),
                self.model(),
                &local,
                &profile,
                pool_size,
            )
            .await?;
            if !outcome.reasoning.is_empty() {
                progress_updater(format!("LLM ranking rationale: {}", outcome.reasoning));
            }
            outcome.ranked
        };

        // The top-ranked pool entry anchors the plan; base influence
        // decides how many of the remaining cultural slots stay close to
        // its cuisine.
        let base_cuisine = pool.first().map(|score| score.meal.cuisine.clone());
        let base_influence = calculate_base_influence(&profile.priority_weights);
        let similar_target =
            (cultural_quota.saturating_sub(1) as f32 * base_influence).round() as u32;
        if let Some(cuisine) = &base_cuisine {
            progress_updater(format!(
                "Base meal cuisine: {} (influence {:.2}, {} similar slots).",
                cuisine, base_influence, similar_target
            ));
        }

        let slot_types = &MEAL_TYPE_ORDER[..request.meals_per_day as usize];
        let mut days: BTreeMap<u32, BTreeMap<MealType, WeightBasedMeal>> = BTreeMap::new();
        let mut used_meal_ids: HashSet<String> = HashSet::new();
        let mut seen_cuisines: HashSet<String> = HashSet::new();
        let mut cultural_used = 0u32;
        let mut similar_used = 0u32;

        for day in 1..=request.num_days {
            let mut day_meals: BTreeMap<MealType, WeightBasedMeal> = BTreeMap::new();
            for meal_type in slot_types {
                progress_updater(format!("Filling day {} {}...", day, meal_type.as_str()));

                let mut placed: Option<WeightBasedMeal> = None;
                if cultural_used < cultural_quota {
                    let prefer_similar =
                        base_cuisine.is_some() && similar_used < similar_target;
                    if let Some(candidate) = select_cultural_candidate(
                        &pool,
                        &used_meal_ids,
                        base_cuisine.as_deref(),
                        prefer_similar,
                    ) {
                        match place_cultural_candidate(&candidate, &profile, &seen_cuisines) {
                            Some(slot_meal) => {
                                used_meal_ids.insert(candidate.meal.id.clone());
                                cultural_used += 1;
                                if Some(candidate.meal.cuisine.as_str())
                                    == base_cuisine.as_deref()
                                {
                                    similar_used += 1;
                                }
                                placed = Some(slot_meal);
                            }
                            None => {
                                progress_updater(format!(
                                    " -> '{}' cannot be adapted to the restrictions; generating instead.",
                                    candidate.meal.name
                                ));
                            }
                        }
                    }
                }

                let slot_meal = match placed {
                    Some(slot_meal) => slot_meal,
                    None => {
                        self.generate_slot_meal(
                            &profile,
                            day,
                            *meal_type,
                            &pool,
                            &mut used_meal_ids,
                            &seen_cuisines,
                            &progress_updater,
                        )
                        .await?
                    }
                };

                seen_cuisines.insert(slot_meal.meal.cuisine.to_lowercase());
                day_meals.insert(*meal_type, slot_meal);
            }
            days.insert(day, day_meals);
        }

        let shopping_list = build_shopping_list(days.values().flat_map(|day| day.values()));
        let prep_tips =
            build_prep_tips(days.values().flat_map(|day| day.values()), profile.family_size);

        Ok(MealPlan {
            days,
            shopping_list,
            prep_tips,
        })
    }

    /// Fills one slot through generation, with the per-slot degradation
    /// ladder: retry once on a compliance violation, then adapt, then flag;
    /// on transport failure fall back to an unused cached candidate.
    /// Missing credentials are the one error that always aborts the plan.
    #[allow(clippy::too_many_arguments)]
    async fn generate_slot_meal(
        &self,
        profile: &UserProfile,
        day: u32,
        meal_type: MealType,
        pool: &[MealScore],
        used_meal_ids: &mut HashSet<String>,
        seen_cuisines: &HashSet<String>,
        progress_updater: &(impl Fn(String) + Send + Sync),
    ) -> Result<WeightBasedMeal, PlanGenerationError> {
        match self
            .generate_compliant_meal(profile, day, meal_type, seen_cuisines, progress_updater)
            .await
        {
            Ok(slot_meal) => Ok(slot_meal),
            Err(err @ ApiConnectionError::MissingApiKey(_)) => Err(err.into()),
            Err(err) => {
                progress_updater(format!(
                    " -> Generation failed for day {} {}: {}. Falling back to cached candidates.",
                    day,
                    meal_type.as_str(),
                    err
                ));
                let fallback = pool
                    .iter()
                    .find(|candidate| !used_meal_ids.contains(&candidate.meal.id))
                    .or_else(|| pool.first())
                    .cloned();
                let Some(candidate) = fallback else {
                    return Err(PlanGenerationError::NoUsableCandidates);
                };
                used_meal_ids.insert(candidate.meal.id.clone());

                let fallback_note =
                    "placed from cached candidates after a generation failure".to_string();
                let report =
                    check_compliance(&candidate.meal.ingredients, &profile.dietary_restrictions);
                if report.compliant {
                    return Ok(build_weight_based_meal(
                        candidate.meal.clone(),
                        &candidate.component_scores,
                        profile,
                        seen_cuisines,
                        Some(candidate.meal.cuisine.clone()),
                        Some(fallback_note),
                        &report,
                        Vec::new(),
                    ));
                }
                if let Some((adapted, mut notes)) =
                    adapt_meal_for_restrictions(&candidate.meal, &profile.dietary_restrictions)
                {
                    let adapted_report =
                        check_compliance(&adapted.ingredients, &profile.dietary_restrictions);
                    let components = score_meal(&adapted, profile).component_scores;
                    notes.push(fallback_note);
                    return Ok(build_weight_based_meal(
                        adapted,
                        &components,
                        profile,
                        seen_cuisines,
                        Some(candidate.meal.cuisine.clone()),
                        Some(notes.join("; ")),
                        &adapted_report,
                        Vec::new(),
                    ));
                }
                // Flag, never block.
                Ok(build_weight_based_meal(
                    candidate.meal.clone(),
                    &candidate.component_scores,
                    profile,
                    seen_cuisines,
                    Some(candidate.meal.cuisine.clone()),
                    Some(fallback_note),
                    &report,
                    Vec::new(),
                ))
            }
        }
    }

    /// One generation attempt plus the compliance ladder: a violating
    /// first attempt is retried once with its violations echoed back,
    /// then adaptation is tried, and a still-violating meal is delivered
    /// flagged rather than blocking the slot.
    async fn generate_compliant_meal(
        &self,
        profile: &UserProfile,
        day: u32,
        meal_type: MealType,
        seen_cuisines: &HashSet<String>,
        progress_updater: &(impl Fn(String) + Send + Sync),
    ) -> Result<WeightBasedMeal, ApiConnectionError> {
        let (meal, satisfaction) = self
            .request_generated_meal(profile, day, meal_type, None)
            .await?;
        let report = check_compliance(&meal.ingredients, &profile.dietary_restrictions);
        if report.compliant {
            let components = score_meal(&meal, profile).component_scores;
            return Ok(build_weight_based_meal(
                meal,
                &components,
                profile,
                seen_cuisines,
                None,
                None,
                &report,
                satisfaction,
            ));
        }

        progress_updater(format!(
            " -> Generated '{}' violates restrictions ({}); retrying once.",
            meal.name,
            report.violations.join(", ")
        ));
        let (candidate, candidate_satisfaction, candidate_report) = match self
            .request_generated_meal(profile, day, meal_type, Some(&report.violations))
            .await
        {
            Ok((second, second_satisfaction)) => {
                let second_report =
                    check_compliance(&second.ingredients, &profile.dietary_restrictions);
                (second, second_satisfaction, second_report)
            }
            Err(err) => {
                // The first attempt is still in hand; a failed retry is a
                // per-slot problem, not a fatal one.
                progress_updater(format!(" -> Retry failed ({}); keeping first attempt.", err));
                (meal, satisfaction, report)
            }
        };

        if candidate_report.compliant {
            let components = score_meal(&candidate, profile).component_scores;
            return Ok(build_weight_based_meal(
                candidate,
                &components,
                profile,
                seen_cuisines,
                None,
                None,
                &candidate_report,
                candidate_satisfaction,
            ));
        }

        if let Some((adapted, notes)) =
            adapt_meal_for_restrictions(&candidate, &profile.dietary_restrictions)
        {
            let adapted_report =
                check_compliance(&adapted.ingredients, &profile.dietary_restrictions);
            let components = score_meal(&adapted, profile).component_scores;
            return Ok(build_weight_based_meal(
                adapted,
                &components,
                profile,
                seen_cuisines,
                None,
                Some(notes.join("; ")),
                &adapted_report,
                candidate_satisfaction,
            ));
        }

        // Flag, never block.
        let components = score_meal(&candidate, profile).component_scores;
        Ok(build_weight_based_meal(
            candidate,
            &components,
            profile,
            seen_cuisines,
            None,
            None,
            &candidate_report,
            candidate_satisfaction,
        ))
    }

    async fn request_generated_meal(
        &self,
        profile: &UserProfile,
        day: u32,
        meal_type: MealType,
        previous_violations: Option<&[String]>,
    ) -> Result<(StructuredMeal, Vec<String>), ApiConnectionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_generation_messages(profile, day, meal_type, previous_violations),
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(get_meal_generation_json_schema()),
            }),
            temperature: Some(0.6),
            max_tokens: Some(1024),
        };

        let response = self.chat_backend.call_chat_completion(request).await?;
        let content = response.first_choice_content().ok_or_else(|| {
            ApiConnectionError::MalformedResponse("LLM returned no choices in response".to_string())
        })?;
        let generated: GeneratedMealResponse = serde_json::from_str(&content)?;
        Ok(generated.into_structured_meal(day, meal_type))
    }
}

/// Next unused pool candidate for a cultural slot. Similar slots look for
/// the base cuisine first; variety slots prefer any other cuisine. Both
/// fall back to the best unused candidate so a lopsided pool never stalls
/// the quota.
fn select_cultural_candidate(
    pool: &[MealScore],
    used_meal_ids: &HashSet<String>,
    base_cuisine: Option<&str>,
    prefer_similar: bool,
) -> Option<MealScore> {
    let unused =
        |candidate: &&MealScore| !used_meal_ids.contains(&candidate.meal.id);

    if let Some(base) = base_cuisine {
        let preferred = if prefer_similar {
            pool.iter()
                .filter(unused)
                .find(|candidate| candidate.meal.cuisine == base)
        } else {
            pool.iter()
                .filter(unused)
                .find(|candidate| candidate.meal.cuisine != base)
        };
        if let Some(candidate) = preferred {
            return Some(candidate.clone());
        }
    }

    pool.iter().find(|candidate| !used_meal_ids.contains(&candidate.meal.id)).cloned()
}

/// Compliance-gates a cached candidate into a slot, adapting if needed.
/// `None` means neither the meal nor an adaptation satisfies the
/// restrictions, and the slot must be generated instead.
fn place_cultural_candidate(
    candidate: &MealScore,
    profile: &UserProfile,
    seen_cuisines: &HashSet<String>,
) -> Option<WeightBasedMeal> {
    let report = check_compliance(&candidate.meal.ingredients, &profile.dietary_restrictions);
    if report.compliant {
        return Some(build_weight_based_meal(
            candidate.meal.clone(),
            &candidate.component_scores,
            profile,
            seen_cuisines,
            Some(candidate.meal.cuisine.clone()),
            None,
            &report,
            Vec::new(),
        ));
    }

    let (adapted, notes) =
        adapt_meal_for_restrictions(&candidate.meal, &profile.dietary_restrictions)?;
    let adapted_report = check_compliance(&adapted.ingredients, &profile.dietary_restrictions);
    let components = score_meal(&adapted, profile).component_scores;
    Some(build_weight_based_meal(
        adapted,
        &components,
        profile,
        seen_cuisines,
        Some(candidate.meal.cuisine.clone()),
        Some(notes.join("; ")),
        &adapted_report,
        Vec::new(),
    ))
}

/// Assembles the slot unit. `self_reported_overlap` (from generation) wins
/// over the locally derived overlap when present; variety credit depends
/// on whether the plan has already served this cuisine.
#[allow(clippy::too_many_arguments)]
fn build_weight_based_meal(
    meal: StructuredMeal,
    components: &ComponentScores,
    profile: &UserProfile,
    seen_cuisines: &HashSet<String>,
    cultural_source: Option<String>,
    adaptation_notes: Option<String>,
    report: &ComplianceReport,
    self_reported_overlap: Vec<String>,
) -> WeightBasedMeal {
    let weights = profile.priority_weights.clamped();
    let novelty = if seen_cuisines.contains(&meal.cuisine.to_lowercase()) {
        REPEAT_CUISINE_NOVELTY
    } else {
        1.0
    };

    let weight_satisfaction = WeightSatisfaction {
        cost: components.cost * weights.cost,
        health: components.health * weights.health,
        cultural: components.cultural * weights.cultural,
        variety: novelty * weights.variety,
        time: components.time * weights.time,
    };

    let objective_overlap = if !self_reported_overlap.is_empty() {
        self_reported_overlap
    } else {
        let mut overlap = Vec::new();
        if components.cost >= OBJECTIVE_OVERLAP_THRESHOLD {
            overlap.push("cost".to_string());
        }
        if components.health >= OBJECTIVE_OVERLAP_THRESHOLD {
            overlap.push("health".to_string());
        }
        if components.cultural >= OBJECTIVE_OVERLAP_THRESHOLD {
            overlap.push("cultural".to_string());
        }
        if components.time >= OBJECTIVE_OVERLAP_THRESHOLD {
            overlap.push("time".to_string());
        }
        if novelty >= 1.0 {
            overlap.push("variety".to_string());
        }
        overlap
    };

    WeightBasedMeal {
        meal,
        objective_overlap,
        weight_satisfaction,
        cultural_source,
        adaptation_notes,
        dietary_compliant: report.compliant,
        compliance_violations: report.violations.clone(),
    }
}

// What the generation prompt asks the model to return.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeneratedMealResponse {
    name: String,
    description: String,
    cuisine: String,
    ingredients: Vec<String>,
    #[serde(default)]
    cooking_techniques: Vec<String>,
    calories: f32,
    protein_g: f32,
    carbs_g: f32,
    fat_g: f32,
    prep_time_minutes: u32,
    cook_time_minutes: u32,
    #[serde(default = "default_difficulty")]
    difficulty_level: f32,
    /// Which weight priorities the model believes this meal satisfies
    /// well.
    #[serde(default)]
    objective_satisfaction: Vec<String>,
}

fn default_difficulty() -> f32 {
    2.5
}

impl GeneratedMealResponse {
    fn into_structured_meal(self, day: u32, meal_type: MealType) -> (StructuredMeal, Vec<String>) {
        let meal = StructuredMeal {
            id: format!("generated-d{}-{}", day, meal_type.as_str()),
            name: self.name,
            description: self.description,
            cuisine: self.cuisine,
            authenticity_score: GENERATED_MEAL_AUTHENTICITY,
            ingredients: self.ingredients,
            cooking_techniques: self.cooking_techniques,
            nutrition: MealNutrition {
                calories: self.calories,
                protein_g: self.protein_g,
                carbs_g: self.carbs_g,
                fat_g: self.fat_g,
            },
            estimated_prep_time: self.prep_time_minutes,
            estimated_cook_time: self.cook_time_minutes,
            difficulty_level: self.difficulty_level.clamp(1.0, 5.0),
        };
        (meal, self.objective_satisfaction)
    }
}

fn string_property(description: &str) -> JsonSchemaProperty {
    JsonSchemaProperty {
        property_type: "string".to_string(),
        description: Some(description.to_string()),
        r#enum: None,
        items: None,
    }
}

fn number_property(description: &str) -> JsonSchemaProperty {
    JsonSchemaProperty {
        property_type: "number".to_string(),
        description: Some(description.to_string()),
        r#enum: None,
        items: None,
    }
}

fn integer_property(description: &str) -> JsonSchemaProperty {
    JsonSchemaProperty {
        property_type: "integer".to_string(),
        description: Some(description.to_string()),
        r#enum: None,
        items: None,
    }
}

fn string_array_property(description: &str) -> JsonSchemaProperty {
    JsonSchemaProperty {
        property_type: "array".to_string(),
        description: Some(description.to_string()),
        r#enum: None,
        items: Some(Box::new(JsonSchema {
            schema_type: "string".to_string(),
            properties: None,
            required: None,
            additional_properties: None,
        })),
    }
}

fn get_meal_generation_json_schema() -> JsonSchemaDefinition {
    let mut properties = HashMap::new();
    properties.insert("name".to_string(), string_property("Name of the meal."));
    properties.insert(
        "description".to_string(),
        string_property("One or two sentences describing the meal."),
    );
    properties.insert(
        "cuisine".to_string(),
        string_property("Cuisine the meal belongs to, e.g. 'Italian'."),
    );
    properties.insert(
        "ingredients".to_string(),
        string_array_property("Every ingredient, one entry per item."),
    );
    properties.insert(
        "cooking_techniques".to_string(),
        string_array_property("Primary cooking techniques, e.g. 'baked', 'steamed'."),
    );
    properties.insert(
        "calories".to_string(),
        number_property("Estimated calories per serving."),
    );
    properties.insert(
        "protein_g".to_string(),
        number_property("Grams of protein per serving."),
    );
    properties.insert(
        "carbs_g".to_string(),
        number_property("Grams of carbohydrates per serving."),
    );
    properties.insert(
        "fat_g".to_string(),
        number_property("Grams of fat per serving."),
    );
    properties.insert(
        "prep_time_minutes".to_string(),
        integer_property("Preparation time in minutes."),
    );
    properties.insert(
        "cook_time_minutes".to_string(),
        integer_property("Cooking time in minutes."),
    );
    properties.insert(
        "difficulty_level".to_string(),
        number_property("Difficulty from 1 (trivial) to 5 (expert)."),
    );
    properties.insert(
        "objective_satisfaction".to_string(),
        string_array_property(
            "Which of cost, health, cultural, variety, time this meal satisfies well.",
        ),
    );

    JsonSchemaDefinition {
        name: "generated_meal".to_string(),
        strict: Some(true),
        schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec![
                "name".to_string(),
                "description".to_string(),
                "cuisine".to_string(),
                "ingredients".to_string(),
                "calories".to_string(),
                "protein_g".to_string(),
                "carbs_g".to_string(),
                "fat_g".to_string(),
                "prep_time_minutes".to_string(),
                "cook_time_minutes".to_string(),
            ]),
            additional_properties: Some(false),
        },
    }
}

fn build_generation_messages(
    profile: &UserProfile,
    day: u32,
    meal_type: MealType,
    previous_violations: Option<&[String]>,
) -> Vec<ChatMessage> {
    let system_prompt = "/no_thinking
You are a meal generation assistant. You design one meal for one plan slot.
The user's dietary restrictions are MANDATORY. Every ingredient must satisfy every restriction; there are no exceptions and no trade-offs against other goals.
The user's priority weights are soft tie-breakers to apply after the restrictions are satisfied.
Also self-report, in 'objective_satisfaction', which of the weight priorities (cost, health, cultural, variety, time) the meal satisfies well.
Respond ONLY with a JSON object strictly adhering to the provided 'generated_meal' schema.
The JSON object must be the only content in your response. Do not include any explanatory text, comments, or markdown formatting (like ```json) before or after the JSON object."
        .to_string();

    let weights = profile.priority_weights.clamped();
    let restrictions_block = if profile.dietary_restrictions.is_empty() {
        "none".to_string()
    } else {
        profile.dietary_restrictions.join(", ")
    };
    let cultures_block = if profile.cultural_background.is_empty() {
        "no stated preference".to_string()
    } else {
        profile.cultural_background.join(", ")
    };
    let time_block = profile
        .max_total_time_minutes
        .map(|minutes| format!("{} minutes total (prep + cook)", minutes))
        .unwrap_or_else(|| "no limit".to_string());

    let mut user_prompt = format!(
        "MANDATORY dietary restrictions: {}

Priority weights (soft, 0 to 1):
- cost: {:.2}
- health: {:.2}
- cultural: {:.2}
- variety: {:.2}
- time: {:.2}

Slot: day {}, {}.
Cultural backgrounds of interest: {}.
Household size: {}.
Time budget: {}.

Design one meal for this slot and return it as JSON.",
        restrictions_block,
        weights.cost,
        weights.health,
        weights.cultural,
        weights.variety,
        weights.time,
        day,
        meal_type.as_str(),
        cultures_block,
        profile.family_size,
        time_block
    );

    if let Some(violations) = previous_violations {
        user_prompt.push_str(&format!(
            "\n\nYour previous attempt violated the restrictions: {}. Do not use any of those ingredients or their derivatives.",
            violations.join(", ")
        ));
    }

    vec![
        ChatMessage {
            role: "system".to_string(),
            content: system_prompt,
        },
        ChatMessage {
            role: "user".to_string(),
            content: user_prompt,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PriorityWeights;

    fn candidate(id: &str, cuisine: &str, total: f32) -> MealScore {
        MealScore {
            meal: StructuredMeal {
                id: id.to_string(),
                name: format!("Meal {}", id),
                description: String::new(),
                cuisine: cuisine.to_string(),
                authenticity_score: 0.8,
                ingredients: vec!["rice".to_string()],
                cooking_techniques: vec!["baked".to_string()],
                nutrition: MealNutrition::default(),
                estimated_prep_time: 10,
                estimated_cook_time: 20,
                difficulty_level: 2.0,
            },
            component_scores: ComponentScores {
                cultural: 0.8,
                health: 0.7,
                cost: 0.9,
                time: 0.5,
            },
            total_score: total,
            ranking_explanation: String::new(),
        }
    }

    #[test]
    fn test_select_prefers_base_cuisine_when_similar() {
        let pool = vec![
            candidate("it-0", "Italian", 0.9),
            candidate("mx-0", "Mexican", 0.8),
            candidate("it-1", "Italian", 0.7),
        ];
        let used: HashSet<String> = ["it-0".to_string()].into_iter().collect();
        let selected = select_cultural_candidate(&pool, &used, Some("Italian"), true).unwrap();
        assert_eq!(selected.meal.id, "it-1");
    }

    #[test]
    fn test_select_prefers_other_cuisines_for_variety() {
        let pool = vec![
            candidate("it-0", "Italian", 0.9),
            candidate("mx-0", "Mexican", 0.8),
        ];
        let used = HashSet::new();
        let selected = select_cultural_candidate(&pool, &used, Some("Italian"), false).unwrap();
        assert_eq!(selected.meal.id, "mx-0");
    }

    #[test]
    fn test_select_falls_back_to_any_unused() {
        let pool = vec![candidate("it-0", "Italian", 0.9)];
        let used = HashSet::new();
        // Variety requested but only the base cuisine is available.
        let selected = select_cultural_candidate(&pool, &used, Some("Italian"), false).unwrap();
        assert_eq!(selected.meal.id, "it-0");
    }

    #[test]
    fn test_select_none_when_pool_exhausted() {
        let pool = vec![candidate("it-0", "Italian", 0.9)];
        let used: HashSet<String> = ["it-0".to_string()].into_iter().collect();
        assert!(select_cultural_candidate(&pool, &used, Some("Italian"), true).is_none());
    }

    #[test]
    fn test_place_cultural_candidate_adapts_for_restrictions() {
        let mut c = candidate("it-0", "Italian", 0.9);
        c.meal.ingredients = vec!["chicken breast".to_string(), "rice".to_string()];
        let mut profile = UserProfile::new("u1");
        profile.dietary_restrictions = vec!["vegan".to_string()];
        let seen = HashSet::new();

        let placed = place_cultural_candidate(&c, &profile, &seen).unwrap();
        assert!(placed.dietary_compliant);
        assert!(placed.adaptation_notes.is_some());
        assert!(placed.meal.ingredients.contains(&"tofu".to_string()));
        assert_eq!(placed.cultural_source.as_deref(), Some("Italian"));
    }

    #[test]
    fn test_place_cultural_candidate_none_when_unadaptable() {
        let mut c = candidate("it-0", "Italian", 0.9);
        c.meal.ingredients = vec!["shrimp".to_string()];
        let mut profile = UserProfile::new("u1");
        profile.dietary_restrictions = vec!["shellfish-free".to_string()];
        let seen = HashSet::new();
        assert!(place_cultural_candidate(&c, &profile, &seen).is_none());
    }

    #[test]
    fn test_build_weight_based_meal_overlap_and_variety() {
        let c = candidate("it-0", "Italian", 0.9);
        let mut profile = UserProfile::new("u1");
        profile.priority_weights = PriorityWeights {
            cost: 1.0,
            health: 1.0,
            cultural: 1.0,
            variety: 1.0,
            time: 1.0,
        };
        let report = ComplianceReport {
            compliant: true,
            violations: vec![],
        };

        let fresh = build_weight_based_meal(
            c.meal.clone(),
            &c.component_scores,
            &profile,
            &HashSet::new(),
            None,
            None,
            &report,
            Vec::new(),
        );
        // cultural 0.8, health 0.7, cost 0.9 clear the 0.6 bar; time 0.5
        // does not; novel cuisine adds variety.
        assert_eq!(
            fresh.objective_overlap,
            vec!["cost", "health", "cultural", "variety"]
        );
        assert!((fresh.weight_satisfaction.variety - 1.0).abs() < 1e-6);

        let seen: HashSet<String> = ["italian".to_string()].into_iter().collect();
        let repeat = build_weight_based_meal(
            c.meal.clone(),
            &c.component_scores,
            &profile,
            &seen,
            None,
            None,
            &report,
            Vec::new(),
        );
        assert!((repeat.weight_satisfaction.variety - REPEAT_CUISINE_NOVELTY).abs() < 1e-6);
        assert!(!repeat.objective_overlap.contains(&"variety".to_string()));
    }

    #[test]
    fn test_self_reported_overlap_wins() {
        let c = candidate("it-0", "Italian", 0.9);
        let profile = UserProfile::new("u1");
        let report = ComplianceReport {
            compliant: true,
            violations: vec![],
        };
        let slot = build_weight_based_meal(
            c.meal.clone(),
            &c.component_scores,
            &profile,
            &HashSet::new(),
            None,
            None,
            &report,
            vec!["time".to_string()],
        );
        assert_eq!(slot.objective_overlap, vec!["time"]);
    }

    #[test]
    fn test_generated_meal_response_conversion() {
        let response = GeneratedMealResponse {
            name: "Lentil Bowl".to_string(),
            description: "Quick lentil bowl".to_string(),
            cuisine: "Mediterranean".to_string(),
            ingredients: vec!["lentils".to_string(), "olive oil".to_string()],
            cooking_techniques: vec!["boiled".to_string()],
            calories: 420.0,
            protein_g: 22.0,
            carbs_g: 55.0,
            fat_g: 9.0,
            prep_time_minutes: 10,
            cook_time_minutes: 25,
            difficulty_level: 9.0,
            objective_satisfaction: vec!["cost".to_string()],
        };
        let (meal, satisfaction) = response.into_structured_meal(2, MealType::Lunch);
        assert_eq!(meal.id, "generated-d2-lunch");
        assert_eq!(meal.authenticity_score, GENERATED_MEAL_AUTHENTICITY);
        // Out-of-range difficulty clamps into [1, 5].
        assert_eq!(meal.difficulty_level, 5.0);
        assert_eq!(satisfaction, vec!["cost"]);
    }

    #[test]
    fn test_generation_prompt_states_restrictions_first() {
        let mut profile = UserProfile::new("u1");
        profile.dietary_restrictions = vec!["vegan".to_string()];
        let messages = build_generation_messages(&profile, 1, MealType::Dinner, None);
        assert!(messages[1]
            .content
            .starts_with("MANDATORY dietary restrictions: vegan"));
    }

    #[test]
    fn test_generation_prompt_echoes_previous_violations() {
        let profile = UserProfile::new("u1");
        let violations = vec!["vegan: contains chicken".to_string()];
        let messages =
            build_generation_messages(&profile, 1, MealType::Dinner, Some(&violations));
        assert!(messages[1].content.contains("previous attempt violated"));
        assert!(messages[1].content.contains("vegan: contains chicken"));
    }

    #[test]
    fn test_generation_schema_requires_core_fields() {
        let schema = get_meal_generation_json_schema();
        let required = schema.schema.required.unwrap();
        for field in ["name", "cuisine", "ingredients", "calories"] {
            assert!(required.contains(&field.to_string()), "missing {}", field);
        }
    }
}
