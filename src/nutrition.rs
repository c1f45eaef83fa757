use serde::{Deserialize, Serialize};

use crate::meal_model::MealPlan;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct NutritionTotals {
    pub calories: f32,
    pub protein_g: f32,
    pub carbs_g: f32,
    pub fat_g: f32,
}

/// Aggregated nutrition for a whole plan, for downstream display.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PlanNutritionProfile {
    pub total: NutritionTotals,
    pub per_day_average: NutritionTotals,
    pub per_meal_average: NutritionTotals,
}

fn scaled(totals: &NutritionTotals, divisor: f32) -> NutritionTotals {
    if divisor <= 0.0 {
        return NutritionTotals::default();
    }
    NutritionTotals {
        calories: totals.calories / divisor,
        protein_g: totals.protein_g / divisor,
        carbs_g: totals.carbs_g / divisor,
        fat_g: totals.fat_g / divisor,
    }
}

/// Sums every slot's nutrition and normalizes per day and per meal.
pub fn calculate_plan_nutrition(plan: &MealPlan) -> PlanNutritionProfile {
    let mut total = NutritionTotals::default();
    let mut meal_count = 0u32;

    for slot in plan.meals() {
        total.calories += slot.meal.nutrition.calories;
        total.protein_g += slot.meal.nutrition.protein_g;
        total.carbs_g += slot.meal.nutrition.carbs_g;
        total.fat_g += slot.meal.nutrition.fat_g;
        meal_count += 1;
    }

    let day_count = plan.days.len() as f32;
    PlanNutritionProfile {
        per_day_average: scaled(&total, day_count),
        per_meal_average: scaled(&total, meal_count as f32),
        total,
    }
}
