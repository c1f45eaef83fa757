use crate::meal_model::{ComponentScores, MealScore, StructuredMeal};
use crate::profile::UserProfile;

const HEALTHY_TECHNIQUES: &[&str] = &["steam", "grill", "bake", "poach", "boil", "roast"];
const UNHEALTHY_TECHNIQUES: &[&str] = &["fried", "fry", "batter"];

/// Low-cost staples favored by the cost heuristic. "Hero ingredients" in
/// plan-assembly terms: cheap, versatile, reusable across slots.
const STAPLE_INGREDIENTS: &[&str] = &[
    "rice", "beans", "lentil", "potato", "onion", "garlic", "cabbage", "carrot", "flour",
    "oats", "egg", "pasta", "tomato", "chickpea", "corn", "bread", "milk", "yogurt",
    "peanut", "banana", "tofu",
];

const PREMIUM_INGREDIENTS: &[&str] = &[
    "saffron", "truffle", "lobster", "wagyu", "tenderloin", "scallop", "prosciutto",
    "caviar", "crab", "duck", "lamb", "salmon", "pine nut", "vanilla bean", "shrimp",
];

/// Minutes of prep + cook at which the time score bottoms out.
const TIME_SCORE_CEILING_MINUTES: f32 = 120.0;

fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

fn cultural_score(meal: &StructuredMeal, profile: &UserProfile) -> f32 {
    clamp01(meal.authenticity_score.clamp(0.0, 1.0) * profile.cultural_preference(&meal.cuisine))
}

/// Technique and macro heuristic. Starts neutral, rewards gentle cooking
/// methods, protein >= 20 g and a 300-600 kcal main-meal window, penalizes
/// frying and calorie extremes.
fn health_score(meal: &StructuredMeal) -> f32 {
    let mut score = 0.5;

    let technique_matches = |keywords: &[&str]| {
        meal.cooking_techniques.iter().any(|technique| {
            let lowered = technique.to_lowercase();
            keywords.iter().any(|keyword| lowered.contains(keyword))
        })
    };
    // "fried" also contains "fry"-adjacent text, so check the penalty list
    // first and do not double-count a technique as both.
    if technique_matches(UNHEALTHY_TECHNIQUES) {
        score -= 0.2;
    } else if technique_matches(HEALTHY_TECHNIQUES) {
        score += 0.2;
    }

    if meal.nutrition.protein_g >= 20.0 {
        score += 0.2;
    }
    if (300.0..=600.0).contains(&meal.nutrition.calories) {
        score += 0.1;
    } else {
        score -= 0.1;
    }

    clamp01(score)
}

/// Ingredient-commonness heuristic: staples rate 1.0, premium items 0.1,
/// everything else a neutral 0.6; the score is the mean.
fn cost_score(meal: &StructuredMeal) -> f32 {
    if meal.ingredients.is_empty() {
        return 0.5;
    }
    let sum: f32 = meal
        .ingredients
        .iter()
        .map(|ingredient| {
            let lowered = ingredient.to_lowercase();
            if PREMIUM_INGREDIENTS.iter().any(|p| lowered.contains(p)) {
                0.1
            } else if STAPLE_INGREDIENTS.iter().any(|s| lowered.contains(s)) {
                1.0
            } else {
                0.6
            }
        })
        .sum();
    clamp01(sum / meal.ingredients.len() as f32)
}

/// Inverse of total prep + cook time, zero at two hours; hard zero for
/// meals over the profile's max total time when one is set.
fn time_score(meal: &StructuredMeal, profile: &UserProfile) -> f32 {
    let total_minutes = meal.total_time_minutes();
    if let Some(max_minutes) = profile.max_total_time_minutes {
        if total_minutes > max_minutes {
            return 0.0;
        }
    }
    clamp01(1.0 - total_minutes as f32 / TIME_SCORE_CEILING_MINUTES)
}

/// Scores a meal against a user profile.
///
/// Pure and deterministic: identical inputs always produce an identical
/// `MealScore`. All four component scores and the weighted total are
/// clamped to [0, 1]. The total is `sum(w_i * s_i) / sum(w_i)` over the
/// cost/health/cultural/time weights, falling back to an unweighted mean
/// when all four weights are zero.
///
/// # Arguments
/// * `meal`: the candidate meal.
/// * `profile`: weights, cuisine preferences and time limits.
///
/// # Returns
/// A `MealScore` holding the component scores, weighted total and a short
/// explanation string.
pub fn score_meal(meal: &StructuredMeal, profile: &UserProfile) -> MealScore {
    let components = ComponentScores {
        cultural: cultural_score(meal, profile),
        health: health_score(meal),
        cost: cost_score(meal),
        time: time_score(meal, profile),
    };

    let weights = profile.priority_weights.clamped();
    let weight_sum = weights.cost + weights.health + weights.cultural + weights.time;
    let total_score = if weight_sum > 0.0 {
        clamp01(
            (weights.cost * components.cost
                + weights.health * components.health
                + weights.cultural * components.cultural
                + weights.time * components.time)
                / weight_sum,
        )
    } else {
        clamp01((components.cost + components.health + components.cultural + components.time) / 4.0)
    };

    let ranking_explanation = explain(&components, total_score);

    MealScore {
        meal: meal.clone(),
        component_scores: components,
        total_score,
        ranking_explanation,
    }
}

fn explain(components: &ComponentScores, total: f32) -> String {
    let labeled = [
        ("cultural", components.cultural),
        ("health", components.health),
        ("cost", components.cost),
        ("time", components.time),
    ];
    let strongest = labeled
        .iter()
        .cloned()
        .fold(("cultural", f32::MIN), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });
    format!(
        "total {:.2} (cultural {:.2}, health {:.2}, cost {:.2}, time {:.2}); strongest: {}",
        total, components.cultural, components.health, components.cost, components.time,
        strongest.0
    )
}
