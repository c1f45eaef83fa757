use anyhow::Result;
use std::cmp::Ordering;

use crate::cuisine::CuisineSource;
use crate::meal_model::MealScore;
use crate::profile::UserProfile;
use crate::scoring::score_meal;

/// Cultures consulted when a profile names none.
pub const DEFAULT_CULTURE_FALLBACK: &[&str] =
    &["Italian", "Mexican", "Chinese", "Indian", "Mediterranean"];

/// Ranks cached cultural meals for a profile, purely locally.
///
/// For each culture in the profile's background (or the fallback list when
/// the background is empty), cached cuisine data is fetched and every
/// contained meal scored. Meals below `min_score_threshold` are dropped;
/// the rest sort descending by total score with a stable tie-break on
/// culture list order, then cache order. The result is truncated to
/// `limit`.
///
/// Never calls the LLM: given fixed cache contents and profile this is
/// fully deterministic. When no culture yields any cached data the result
/// is empty and the caller decides on a fallback.
pub async fn ranked_meals(
    source: &dyn CuisineSource,
    user_id: &str,
    profile: &UserProfile,
    limit: usize,
    min_score_threshold: f32,
) -> Result<Vec<MealScore>> {
    let cultures: Vec<String> = if profile.cultural_background.is_empty() {
        DEFAULT_CULTURE_FALLBACK
            .iter()
            .map(|c| c.to_string())
            .collect()
    } else {
        profile.cultural_background.clone()
    };

    let cuisine_map = source.cultural_cuisine(user_id, &cultures).await?;

    // (culture position, cache position) ride along as the tie-break keys.
    let mut scored: Vec<(usize, usize, MealScore)> = Vec::new();
    for (culture_idx, culture) in cultures.iter().enumerate() {
        let Some(data) = cuisine_map.get(culture) else {
            continue;
        };
        for (meal_idx, meal) in data.meals.iter().enumerate() {
            let score = score_meal(meal, profile);
            if score.total_score >= min_score_threshold {
                scored.push((culture_idx, meal_idx, score));
            }
        }
    }

    scored.sort_by(|a, b| {
        b.2.total_score
            .partial_cmp(&a.2.total_score)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });

    Ok(scored
        .into_iter()
        .take(limit)
        .map(|(_, _, score)| score)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuisine::CuisineStore;
    use crate::meal_model::{CulturalCuisineData, MealNutrition, StructuredMeal};
    use std::time::Duration;

    fn meal(id: &str, cuisine: &str, authenticity: f32, ingredients: &[&str]) -> StructuredMeal {
        StructuredMeal {
            id: id.to_string(),
            name: format!("Meal {}", id),
            description: String::new(),
            cuisine: cuisine.to_string(),
            authenticity_score: authenticity,
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            cooking_techniques: vec!["baked".to_string()],
            nutrition: MealNutrition {
                calories: 450.0,
                protein_g: 22.0,
                carbs_g: 50.0,
                fat_g: 12.0,
            },
            estimated_prep_time: 10,
            estimated_cook_time: 20,
            difficulty_level: 2.0,
        }
    }

    fn fixture_store() -> CuisineStore {
        let italian = CulturalCuisineData {
            culture: "Italian".to_string(),
            meals: vec![
                meal("it-0", "Italian", 0.9, &["pasta", "tomato"]),
                meal("it-1", "Italian", 0.6, &["rice", "tomato"]),
            ],
            source_quality_score: 0.8,
            key_ingredients: vec!["tomato".to_string()],
        };
        let mexican = CulturalCuisineData {
            culture: "Mexican".to_string(),
            meals: vec![meal("mx-0", "Mexican", 0.9, &["beans", "corn"])],
            source_quality_score: 0.7,
            key_ingredients: vec!["beans".to_string()],
        };
        CuisineStore::from_catalog(vec![italian, mexican], Duration::from_secs(3600))
    }

    fn profile_with_cultures(cultures: &[&str]) -> UserProfile {
        let mut profile = UserProfile::new("u1");
        profile.cultural_background = cultures.iter().map(|s| s.to_string()).collect();
        profile
    }

    #[tokio::test]
    async fn test_ranked_meals_is_deterministic() {
        let store = fixture_store();
        let profile = profile_with_cultures(&["Italian", "Mexican"]);
        let first = ranked_meals(&store, "u1", &profile, 10, 0.0).await.unwrap();
        let second = ranked_meals(&store, "u1", &profile, 10, 0.0).await.unwrap();
        let ids = |scores: &[MealScore]| {
            scores
                .iter()
                .map(|s| s.meal.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
        let totals_first: Vec<f32> = first.iter().map(|s| s.total_score).collect();
        let totals_second: Vec<f32> = second.iter().map(|s| s.total_score).collect();
        assert_eq!(totals_first, totals_second);
    }

    #[tokio::test]
    async fn test_sorted_descending_with_culture_order_tie_break() {
        let store = fixture_store();
        let profile = profile_with_cultures(&["Italian", "Mexican"]);
        let ranked = ranked_meals(&store, "u1", &profile, 10, 0.0).await.unwrap();
        assert_eq!(ranked.len(), 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].total_score >= pair[1].total_score);
        }
        // it-0 and mx-0 tie on every component (same authenticity, same
        // default preference, same nutrition and timing); Italian comes
        // first in the profile's culture list so it must win the tie.
        let ids: Vec<&str> = ranked.iter().map(|s| s.meal.id.as_str()).collect();
        let it0 = ids.iter().position(|id| *id == "it-0").unwrap();
        let mx0 = ids.iter().position(|id| *id == "mx-0").unwrap();
        assert!(it0 < mx0);
    }

    #[tokio::test]
    async fn test_threshold_drops_low_scores() {
        let store = fixture_store();
        let profile = profile_with_cultures(&["Italian", "Mexican"]);
        let all = ranked_meals(&store, "u1", &profile, 10, 0.0).await.unwrap();
        let filtered = ranked_meals(&store, "u1", &profile, 10, 0.99).await.unwrap();
        assert!(filtered.len() < all.len());
        for score in &filtered {
            assert!(score.total_score >= 0.99);
        }
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let store = fixture_store();
        let profile = profile_with_cultures(&["Italian", "Mexican"]);
        let ranked = ranked_meals(&store, "u1", &profile, 2, 0.0).await.unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[tokio::test]
    async fn test_no_cached_data_yields_empty() {
        let store = fixture_store();
        let profile = profile_with_cultures(&["Klingon"]);
        let ranked = ranked_meals(&store, "u1", &profile, 10, 0.0).await.unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_empty_background_uses_fallback_cultures() {
        let store = fixture_store();
        let profile = profile_with_cultures(&[]);
        // Italian and Mexican are both in the fallback list, so the
        // fixture's meals should surface without a stated background.
        let ranked = ranked_meals(&store, "u1", &profile, 10, 0.0).await.unwrap();
        assert_eq!(ranked.len(), 3);
    }
}
