use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MealNutrition {
    pub calories: f32,
    pub protein_g: f32,
    pub carbs_g: f32,
    pub fat_g: f32,
}

/// A meal as loaded from cached cultural cuisine data. Immutable once
/// loaded: dietary adaptation produces a derived meal, never an in-place
/// edit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StructuredMeal {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cuisine: String,
    /// [0, 1] proxy for how traditional the meal is of its stated cuisine.
    pub authenticity_score: f32,
    pub ingredients: Vec<String>,
    pub cooking_techniques: Vec<String>,
    pub nutrition: MealNutrition,
    pub estimated_prep_time: u32,
    pub estimated_cook_time: u32,
    /// [1, 5]; 1 is a dump-and-stir, 5 needs a confident cook.
    pub difficulty_level: f32,
}

impl StructuredMeal {
    pub fn total_time_minutes(&self) -> u32 {
        self.estimated_prep_time + self.estimated_cook_time
    }
}

/// Cached data for one culture: its meals plus catalog-level metadata.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CulturalCuisineData {
    pub culture: String,
    pub meals: Vec<StructuredMeal>,
    /// [0, 1] authenticity proxy for the catalog source itself.
    pub source_quality_score: f32,
    pub key_ingredients: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ComponentScores {
    pub cultural: f32,
    pub health: f32,
    pub cost: f32,
    pub time: f32,
}

/// Ephemeral scoring result, recomputed per ranking pass.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MealScore {
    pub meal: StructuredMeal,
    pub component_scores: ComponentScores,
    pub total_score: f32,
    pub ranking_explanation: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct WeightSatisfaction {
    pub cost: f32,
    pub health: f32,
    pub cultural: f32,
    pub variety: f32,
    pub time: f32,
}

/// The unit placed into a plan slot. Created once during assembly and
/// never mutated after insertion; a meal that could not be made compliant
/// is delivered with `dietary_compliant: false` and its violations listed,
/// rather than blocking the plan.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WeightBasedMeal {
    pub meal: StructuredMeal,
    /// Weight-priority categories this meal satisfies well.
    pub objective_overlap: Vec<String>,
    pub weight_satisfaction: WeightSatisfaction,
    /// Culture whose cached data supplied the meal; `None` for generated
    /// meals.
    pub cultural_source: Option<String>,
    pub adaptation_notes: Option<String>,
    pub dietary_compliant: bool,
    pub compliance_violations: Vec<String>,
}

/// Fill order within a day is the declaration order here.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

pub const MEAL_TYPE_ORDER: &[MealType] = &[
    MealType::Breakfast,
    MealType::Lunch,
    MealType::Dinner,
    MealType::Snack,
];

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MealPlan {
    /// day number (1-based) -> meal type -> meal. BTreeMaps keep the
    /// day-major, breakfast-first ordering stable in output.
    pub days: BTreeMap<u32, BTreeMap<MealType, WeightBasedMeal>>,
    pub shopping_list: Vec<String>,
    pub prep_tips: Vec<String>,
}

impl MealPlan {
    pub fn slot_count(&self) -> usize {
        self.days.values().map(|day| day.len()).sum()
    }

    pub fn meals(&self) -> impl Iterator<Item = &WeightBasedMeal> {
        self.days.values().flat_map(|day| day.values())
    }
}
