use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::api_connection::connection::{ApiConnectionError, ChatCompletionBackend};
use crate::api_connection::endpoints::{
    ChatCompletionRequest, ChatMessage, JsonSchema, JsonSchemaDefinition, JsonSchemaProperty,
    ResponseFormat,
};
use crate::meal_model::{ComponentScores, MealScore};
use crate::profile::UserProfile;

/// Upper bound on candidates serialized into a single ranking prompt.
pub const MAX_PROMPT_CANDIDATES: usize = 15;

/// Batch size for the parallel ranking variant.
pub const RANKING_BATCH_SIZE: usize = 2;

#[derive(Debug, Clone)]
pub struct LlmRankingOutcome {
    pub ranked: Vec<MealScore>,
    pub reasoning: String,
}

// Per-meal entry the model is asked to return. Scores are 0-100.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct LlmMealRanking {
    meal_index: i32,
    cultural_score: f32,
    health_score: f32,
    cost_score: f32,
    time_score: f32,
    total_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
}

fn score_property(description: &str) -> JsonSchemaProperty {
    JsonSchemaProperty {
        property_type: "number".to_string(),
        description: Some(description.to_string()),
        r#enum: None,
        items: None,
    }
}

fn get_meal_ranking_json_schema(candidate_count: usize) -> JsonSchemaDefinition {
    let mut ranking_properties = HashMap::new();
    ranking_properties.insert(
        "meal_index".to_string(),
        JsonSchemaProperty {
            property_type: "integer".to_string(),
            description: Some(format!(
                "The 1-based index of the candidate meal being scored (1 to {}).",
                candidate_count
            )),
            r#enum: None,
            items: None,
        },
    );
    ranking_properties.insert(
        "cultural_score".to_string(),
        score_property("Cultural authenticity fit, 0 to 100."),
    );
    ranking_properties.insert(
        "health_score".to_string(),
        score_property("Health and macro balance, 0 to 100."),
    );
    ranking_properties.insert(
        "cost_score".to_string(),
        score_property("Ingredient affordability, 0 to 100."),
    );
    ranking_properties.insert(
        "time_score".to_string(),
        score_property("Preparation speed, 0 to 100."),
    );
    ranking_properties.insert(
        "total_score".to_string(),
        score_property("Weighted total using the user's priority weights, 0 to 100."),
    );
    ranking_properties.insert(
        "reasoning".to_string(),
        JsonSchemaProperty {
            property_type: "string".to_string(),
            description: Some("One short sentence on why this meal ranks where it does.".to_string()),
            r#enum: None,
            items: None,
        },
    );

    let ranking_item_schema = JsonSchema {
        schema_type: "object".to_string(),
        properties: Some(ranking_properties),
        required: Some(vec![
            "meal_index".to_string(),
            "cultural_score".to_string(),
            "health_score".to_string(),
            "cost_score".to_string(),
            "time_score".to_string(),
            "total_score".to_string(),
        ]),
        additional_properties: Some(true),
    };

    let mut response_properties = HashMap::new();
    response_properties.insert(
        "rankings".to_string(),
        JsonSchemaProperty {
            property_type: "array".to_string(),
            description: Some("One entry per candidate meal, best first.".to_string()),
            r#enum: None,
            items: Some(Box::new(ranking_item_schema)),
        },
    );
    response_properties.insert(
        "overall_reasoning".to_string(),
        JsonSchemaProperty {
            property_type: "string".to_string(),
            description: Some("Overall explanation of the ranking.".to_string()),
            r#enum: None,
            items: None,
        },
    );

    JsonSchemaDefinition {
        name: "meal_ranking".to_string(),
        strict: Some(true),
        schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(response_properties),
            required: Some(vec![
                "rankings".to_string(),
                "overall_reasoning".to_string(),
            ]),
            additional_properties: Some(false),
        },
    }
}

fn build_ranking_messages(candidates: &[MealScore], profile: &UserProfile) -> Vec<ChatMessage> {
    let system_prompt = "/no_thinking
You are a meal ranking assistant. You will receive a numbered list of candidate meals and a user's priority weights and dietary restrictions.
Assign each candidate four component scores (cultural_score, health_score, cost_score, time_score) from 0 to 100, plus a total_score from 0 to 100 computed as the weighted combination of the components using the user's priority weights.
Dietary restrictions are hard constraints: a meal that violates one must receive a total_score of 0.
Respond ONLY with a JSON object strictly adhering to the provided 'meal_ranking' schema.
The JSON object must be the only content in your response. Do not include any explanatory text, comments, or markdown formatting (like ```json) before or after the JSON object.
The 'meal_index' of each entry MUST be the 1-based index of a meal from the candidate list."
        .to_string();

    let weights = profile.priority_weights.clamped();
    let candidate_lines = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            format!(
                "{}. \"{}\" (cuisine: {}, authenticity: {:.2}) - {}",
                i + 1,
                candidate.meal.name,
                candidate.meal.cuisine,
                candidate.meal.authenticity_score,
                candidate.meal.description
            )
        })
        .collect::<Vec<String>>()
        .join("\n");

    let restrictions_line = if profile.dietary_restrictions.is_empty() {
        "none".to_string()
    } else {
        profile.dietary_restrictions.join(", ")
    };

    let user_prompt = format!(
        "Candidate meals:
{}

Priority weights (0 to 1, higher = more important):
- cost: {:.2}
- health: {:.2}
- cultural: {:.2}
- variety: {:.2}
- time: {:.2}

Dietary restrictions (mandatory): {}

Score every candidate meal by index and return the ranking as JSON.",
        candidate_lines,
        weights.cost,
        weights.health,
        weights.cultural,
        weights.variety,
        weights.time,
        restrictions_line
    );

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

fn clamp_component(raw: f32) -> f32 {
    raw.clamp(0.0, 100.0) / 100.0
}

/// Parses a ranking response against the candidate list it was generated
/// for.
///
/// A response that is not a JSON object with a `rankings` array is a hard
/// parse failure. Individual entries that fail to deserialize, or whose
/// `meal_index` does not refer to a candidate, are discarded; a partial
/// (even empty) ranked list is a valid outcome.
fn parse_ranking_response(
    content: &str,
    candidates: &[MealScore],
) -> Result<(Vec<MealScore>, String), ApiConnectionError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let rankings = value
        .get("rankings")
        .and_then(|r| r.as_array())
        .ok_or_else(|| {
            ApiConnectionError::MalformedResponse(format!(
                "response has no 'rankings' array: {}",
                content
            ))
        })?;
    let overall_reasoning = value
        .get("overall_reasoning")
        .and_then(|r| r.as_str())
        .unwrap_or("")
        .to_string();

    let mut ranked = Vec::new();
    for entry in rankings {
        let Ok(ranking) = serde_json::from_value::<LlmMealRanking>(entry.clone()) else {
            continue;
        };
        if ranking.meal_index < 1 || ranking.meal_index as usize > candidates.len() {
            continue;
        }
        let candidate = &candidates[(ranking.meal_index - 1) as usize];
        let explanation = ranking
            .reasoning
            .unwrap_or_else(|| candidate.ranking_explanation.clone());
        ranked.push(MealScore {
            meal: candidate.meal.clone(),
            component_scores: ComponentScores {
                cultural: clamp_component(ranking.cultural_score),
                health: clamp_component(ranking.health_score),
                cost: clamp_component(ranking.cost_score),
                time: clamp_component(ranking.time_score),
            },
            total_score: clamp_component(ranking.total_score),
            ranking_explanation: explanation,
        });
    }

    Ok((ranked, overall_reasoning))
}

fn sort_descending(scores: &mut [MealScore]) {
    scores.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
    });
}

/// Re-ranks locally scored candidates through the external model.
///
/// Serializes up to `MAX_PROMPT_CANDIDATES` candidates plus the profile's
/// weights and restrictions into one prompt; the model's scores override
/// the local component scores for surviving entries. Missing credentials,
/// transport failures and a wholly unparseable response all fail loudly;
/// there is deliberately no local-heuristic fallback and no retry loop
/// here - the caller owns that decision.
pub async fn rank_meals(
    chat: &dyn ChatCompletionBackend,
    model: &str,
    candidates: &[MealScore],
    profile: &UserProfile,
    max_meals: usize,
) -> Result<LlmRankingOutcome, ApiConnectionError> {
    if candidates.is_empty() {
        return Ok(LlmRankingOutcome {
            ranked: Vec::new(),
            reasoning: String::new(),
        });
    }

    let capped: Vec<MealScore> = candidates
        .iter()
        .take(MAX_PROMPT_CANDIDATES)
        .cloned()
        .collect();

    let request = ChatCompletionRequest {
        model: model.to_string(),
        messages: build_ranking_messages(&capped, profile),
        response_format: Some(ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: Some(get_meal_ranking_json_schema(capped.len())),
        }),
        temperature: Some(0.1),
        max_tokens: Some(1024),
    };

    let response = chat.call_chat_completion(request).await?;
    let content = response.first_choice_content().ok_or_else(|| {
        ApiConnectionError::MalformedResponse("LLM returned no choices in response".to_string())
    })?;

    let (mut ranked, reasoning) = parse_ranking_response(&content, &capped)?;
    sort_descending(&mut ranked);
    ranked.truncate(max_meals);

    Ok(LlmRankingOutcome { ranked, reasoning })
}

/// Parallel variant of [`rank_meals`]: candidates split into fixed-size
/// batches, all batches issued concurrently and joined.
///
/// Batches operate on disjoint candidate slices; the merge runs strictly
/// after every batch resolves. A failed batch drops its candidates from
/// the result without aborting the others. Only when every batch fails
/// does the first error propagate.
pub async fn rank_meals_parallel(
    chat: &dyn ChatCompletionBackend,
    model: &str,
    candidates: &[MealScore],
    profile: &UserProfile,
    max_meals: usize,
) -> Result<LlmRankingOutcome, ApiConnectionError> {
    if candidates.is_empty() {
        return Ok(LlmRankingOutcome {
            ranked: Vec::new(),
            reasoning: String::new(),
        });
    }

    let batches: Vec<&[MealScore]> = candidates.chunks(RANKING_BATCH_SIZE).collect();
    let batch_futures = batches
        .iter()
        .map(|batch| rank_meals(chat, model, batch, profile, batch.len()));
    let results = join_all(batch_futures).await;

    let mut merged: Vec<MealScore> = Vec::new();
    let mut reasons: Vec<String> = Vec::new();
    let mut first_error: Option<ApiConnectionError> = None;
    let mut surviving_batches = 0usize;

    for result in results {
        match result {
            Ok(outcome) => {
                surviving_batches += 1;
                merged.extend(outcome.ranked);
                if !outcome.reasoning.is_empty() {
                    reasons.push(outcome.reasoning);
                }
            }
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if surviving_batches == 0 {
        return Err(first_error.unwrap_or_else(|| {
            ApiConnectionError::MalformedResponse("no ranking batches produced output".to_string())
        }));
    }

    sort_descending(&mut merged);
    merged.truncate(max_meals);

    Ok(LlmRankingOutcome {
        ranked: merged,
        reasoning: reasons.join(" | "),
    })
}
