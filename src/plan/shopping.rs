use std::collections::BTreeMap;

use crate::meal_model::WeightBasedMeal;

/// Occurrence counts at which a shopping-list line gets a bulk-buy note.
const BULK_PACK_THRESHOLD: usize = 4;
const FAMILY_PACK_THRESHOLD: usize = 3;
const DOUBLE_UP_THRESHOLD: usize = 2;

/// An ingredient must recur this often to be called out as the plan's
/// hero ingredient in the prep tips.
const HERO_INGREDIENT_THRESHOLD: usize = 3;

fn ingredient_counts<'a>(
    meals: impl Iterator<Item = &'a WeightBasedMeal>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for slot in meals {
        for ingredient in &slot.meal.ingredients {
            *counts.entry(ingredient.trim().to_lowercase()).or_insert(0) += 1;
        }
    }
    counts.remove("");
    counts
}

/// Consolidates every slot's ingredients into one deduplicated,
/// alphabetized shopping list. Ingredients recurring across slots get a
/// bulk-buy annotation scaled by how often they appear.
pub fn build_shopping_list<'a>(meals: impl Iterator<Item = &'a WeightBasedMeal>) -> Vec<String> {
    ingredient_counts(meals)
        .into_iter()
        .map(|(name, count)| {
            if count >= BULK_PACK_THRESHOLD {
                format!("{} (x{}, buy in bulk)", name, count)
            } else if count >= FAMILY_PACK_THRESHOLD {
                format!("{} (x{}, family pack)", name, count)
            } else if count >= DOUBLE_UP_THRESHOLD {
                format!("{} (x{})", name, count)
            } else {
                name
            }
        })
        .collect()
}

/// Static prep guidance plus plan-derived tips: a hero-ingredient callout
/// when one ingredient recurs enough to batch-prep, and a scaling reminder
/// for households larger than one.
pub fn build_prep_tips<'a>(
    meals: impl Iterator<Item = &'a WeightBasedMeal>,
    family_size: u32,
) -> Vec<String> {
    let counts = ingredient_counts(meals);

    let mut tips = vec![
        "Batch-cook grains and legumes at the start of the week.".to_string(),
        "Wash and portion vegetables the night before each cooking day.".to_string(),
        "Label leftovers with the day they were cooked.".to_string(),
    ];

    let hero = counts
        .iter()
        .filter(|(_, count)| **count >= HERO_INGREDIENT_THRESHOLD)
        .max_by_key(|(_, count)| **count);
    if let Some((name, count)) = hero {
        tips.push(format!(
            "'{}' is this plan's hero ingredient: prep one large batch and reuse it across {} meals.",
            name, count
        ));
    }

    if family_size > 1 {
        tips.push(format!(
            "Scale quantities for {} people when shopping.",
            family_size
        ));
    }

    tips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal_model::{
        MealNutrition, StructuredMeal, WeightSatisfaction,
    };

    fn slot_with_ingredients(id: &str, ingredients: &[&str]) -> WeightBasedMeal {
        WeightBasedMeal {
            meal: StructuredMeal {
                id: id.to_string(),
                name: format!("Meal {}", id),
                description: String::new(),
                cuisine: "Italian".to_string(),
                authenticity_score: 0.5,
                ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
                cooking_techniques: vec![],
                nutrition: MealNutrition::default(),
                estimated_prep_time: 10,
                estimated_cook_time: 10,
                difficulty_level: 2.0,
            },
            objective_overlap: vec![],
            weight_satisfaction: WeightSatisfaction::default(),
            cultural_source: None,
            adaptation_notes: None,
            dietary_compliant: true,
            compliance_violations: vec![],
        }
    }

    #[test]
    fn test_shopping_list_deduplicates_and_annotates() {
        let slots = vec![
            slot_with_ingredients("a", &["Rice", "beans"]),
            slot_with_ingredients("b", &["rice", "onion"]),
            slot_with_ingredients("c", &["rice", "beans", "garlic"]),
            slot_with_ingredients("d", &["rice"]),
        ];
        let list = build_shopping_list(slots.iter());
        // Alphabetized, case-folded, annotated by count.
        assert_eq!(
            list,
            vec![
                "beans (x2)",
                "garlic",
                "onion",
                "rice (x4, buy in bulk)",
            ]
        );
    }

    #[test]
    fn test_family_pack_annotation_at_three() {
        let slots = vec![
            slot_with_ingredients("a", &["tofu"]),
            slot_with_ingredients("b", &["tofu"]),
            slot_with_ingredients("c", &["tofu"]),
        ];
        let list = build_shopping_list(slots.iter());
        assert_eq!(list, vec!["tofu (x3, family pack)"]);
    }

    #[test]
    fn test_prep_tips_include_hero_ingredient() {
        let slots = vec![
            slot_with_ingredients("a", &["rice", "beans"]),
            slot_with_ingredients("b", &["rice"]),
            slot_with_ingredients("c", &["rice"]),
        ];
        let tips = build_prep_tips(slots.iter(), 1);
        assert!(tips.iter().any(|tip| tip.contains("'rice'")));
        // Family of one gets no scaling reminder.
        assert!(!tips.iter().any(|tip| tip.contains("Scale quantities")));
    }

    #[test]
    fn test_prep_tips_scale_for_family() {
        let slots = vec![slot_with_ingredients("a", &["rice"])];
        let tips = build_prep_tips(slots.iter(), 4);
        assert!(tips.iter().any(|tip| tip.contains("4 people")));
        // No ingredient recurs, so no hero callout.
        assert!(!tips.iter().any(|tip| tip.contains("hero ingredient")));
    }

    #[test]
    fn test_static_tips_always_present() {
        let tips = build_prep_tips(std::iter::empty(), 1);
        assert_eq!(tips.len(), 3);
    }
}
