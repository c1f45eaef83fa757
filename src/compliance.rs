use crate::meal_model::StructuredMeal;

/// Forbidden-ingredient keywords per restriction category. Matching is a
/// case-insensitive substring check over each ingredient line, which will
/// false-positive on compound phrases ("chicken-free broth" trips
/// "chicken"). That is the documented behavior of this filter; changing it
/// is a contract change, not a cleanup.
const RESTRICTION_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "vegetarian",
        &[
            "chicken", "beef", "pork", "lamb", "turkey", "bacon", "ham", "sausage", "veal",
            "duck", "prosciutto", "chorizo", "fish", "salmon", "tuna", "anchovy", "shrimp",
            "crab", "lobster", "gelatin", "lard",
        ],
    ),
    (
        "vegan",
        &[
            "chicken", "beef", "pork", "lamb", "turkey", "bacon", "ham", "sausage", "veal",
            "duck", "prosciutto", "chorizo", "fish", "salmon", "tuna", "anchovy", "shrimp",
            "crab", "lobster", "gelatin", "lard", "milk", "cheese", "butter", "cream",
            "yogurt", "egg", "honey", "ghee", "mayonnaise", "whey",
        ],
    ),
    (
        "gluten-free",
        &[
            "wheat", "flour", "barley", "rye", "pasta", "bread", "couscous", "soy sauce",
            "breadcrumb", "seitan", "noodle", "cracker",
        ],
    ),
    (
        "dairy-free",
        &[
            "milk", "cheese", "butter", "cream", "yogurt", "ghee", "whey", "custard",
        ],
    ),
    (
        "nut-free",
        &[
            "almond", "peanut", "cashew", "walnut", "pecan", "hazelnut", "pistachio",
            "macadamia", "pine nut", "nut butter",
        ],
    ),
    (
        "keto",
        &[
            "sugar", "bread", "pasta", "rice", "potato", "flour", "corn", "oats", "honey",
        ],
    ),
    (
        "paleo",
        &[
            "bread", "pasta", "cheese", "milk", "beans", "lentil", "peanut", "rice",
            "sugar", "tofu", "soy",
        ],
    ),
    (
        "halal",
        &["pork", "bacon", "ham", "lard", "alcohol", "wine", "beer", "gelatin"],
    ),
    (
        "kosher",
        &["pork", "bacon", "ham", "lard", "shellfish", "shrimp", "crab", "lobster"],
    ),
    (
        "shellfish-free",
        &["shrimp", "crab", "lobster", "clam", "mussel", "oyster", "scallop"],
    ),
];

/// Ingredient substitutions the adapter may apply per restriction. Keys are
/// substring patterns matched against the offending ingredient; categories
/// without an entry (keto, halal, ...) cannot be adapted, only flagged.
const SUBSTITUTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "vegan",
        &[
            ("chicken", "tofu"),
            ("beef", "tempeh"),
            ("pork", "jackfruit"),
            ("lamb", "seitan"),
            ("fish", "tofu"),
            ("salmon", "marinated tofu"),
            ("shrimp", "king oyster mushroom"),
            ("milk", "oat milk"),
            ("butter", "olive oil"),
            ("cheese", "nutritional yeast"),
            ("cream", "coconut cream"),
            ("yogurt", "coconut yogurt"),
            ("egg", "flax egg"),
            ("honey", "maple syrup"),
            ("mayonnaise", "vegan mayonnaise"),
        ],
    ),
    (
        "vegetarian",
        &[
            ("chicken", "tofu"),
            ("beef", "portobello mushroom"),
            ("pork", "jackfruit"),
            ("lamb", "seitan"),
            ("bacon", "smoked tempeh"),
            ("fish", "halloumi"),
            ("shrimp", "king oyster mushroom"),
            ("gelatin", "agar agar"),
        ],
    ),
    (
        "gluten-free",
        &[
            ("wheat flour", "rice flour"),
            ("flour", "rice flour"),
            ("pasta", "rice noodles"),
            ("soy sauce", "tamari"),
            ("bread", "gluten-free bread"),
            ("breadcrumb", "crushed rice crackers"),
            ("couscous", "quinoa"),
        ],
    ),
    (
        "dairy-free",
        &[
            ("milk", "oat milk"),
            ("butter", "olive oil"),
            ("cheese", "dairy-free cheese"),
            ("cream", "coconut cream"),
            ("yogurt", "coconut yogurt"),
            ("ghee", "coconut oil"),
        ],
    ),
    (
        "nut-free",
        &[
            ("peanut butter", "sunflower seed butter"),
            ("almond", "sunflower seed"),
            ("cashew", "toasted oat"),
            ("peanut", "roasted chickpea"),
        ],
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub violations: Vec<String>,
}

/// Normalizes "Gluten Free" / "gluten_free" / "GLUTEN-FREE" to the table
/// key form.
fn normalize_restriction(restriction: &str) -> String {
    restriction.trim().to_lowercase().replace([' ', '_'], "-")
}

fn keywords_for(restriction: &str) -> Option<&'static [&'static str]> {
    let normalized = normalize_restriction(restriction);
    RESTRICTION_KEYWORDS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, keywords)| *keywords)
}

fn substitutions_for(restriction: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let normalized = normalize_restriction(restriction);
    SUBSTITUTIONS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, pairs)| *pairs)
}

/// Checks a meal's ingredient list against a set of dietary restrictions.
///
/// This is the one hard gate in the system: priority weights never override
/// it. A restriction with no keyword table entry is treated as always
/// satisfied rather than producing a false violation. Pure function, no
/// I/O.
///
/// # Arguments
/// * `ingredients`: the meal's ingredient lines, any casing.
/// * `restrictions`: restriction category names ("vegan", "Gluten Free", ...).
///
/// # Returns
/// A `ComplianceReport`; `violations` entries read like
/// `"vegan: contains chicken"`.
pub fn check_compliance(ingredients: &[String], restrictions: &[String]) -> ComplianceReport {
    let mut violations = Vec::new();

    for restriction in restrictions {
        let Some(keywords) = keywords_for(restriction) else {
            continue;
        };
        let normalized = normalize_restriction(restriction);
        for keyword in keywords {
            let hit = ingredients
                .iter()
                .any(|ingredient| ingredient.to_lowercase().contains(keyword));
            if hit {
                violations.push(format!("{}: contains {}", normalized, keyword));
            }
        }
    }

    ComplianceReport {
        compliant: violations.is_empty(),
        violations,
    }
}

/// Attempts to derive a compliant variant of `meal` by substituting
/// offending ingredients.
///
/// The input meal is never mutated; on success a new meal (same id plus an
/// `-adapted` suffix) is returned together with human-readable notes, one
/// per substitution. Returns `None` when substitutions cannot reach full
/// compliance, e.g. for restriction categories with no substitution table.
pub fn adapt_meal_for_restrictions(
    meal: &StructuredMeal,
    restrictions: &[String],
) -> Option<(StructuredMeal, Vec<String>)> {
    let initial = check_compliance(&meal.ingredients, restrictions);
    if initial.compliant {
        return Some((meal.clone(), Vec::new()));
    }

    let mut ingredients = meal.ingredients.clone();
    let mut notes = Vec::new();

    for restriction in restrictions {
        let Some(keywords) = keywords_for(restriction) else {
            continue;
        };
        let Some(substitutions) = substitutions_for(restriction) else {
            continue;
        };
        for ingredient in ingredients.iter_mut() {
            let lowered = ingredient.to_lowercase();
            if !keywords.iter().any(|keyword| lowered.contains(keyword)) {
                continue;
            }
            // First pattern match wins; the table orders specific patterns
            // ("peanut butter") before general ones ("peanut").
            if let Some((_, replacement)) = substitutions
                .iter()
                .find(|(pattern, _)| lowered.contains(pattern))
            {
                notes.push(format!(
                    "replaced '{}' with '{}' ({})",
                    ingredient,
                    replacement,
                    normalize_restriction(restriction)
                ));
                *ingredient = replacement.to_string();
            }
        }
    }

    let adapted_report = check_compliance(&ingredients, restrictions);
    if !adapted_report.compliant {
        return None;
    }

    let mut adapted = meal.clone();
    adapted.id = format!("{}-adapted", meal.id);
    adapted.ingredients = ingredients;
    Some((adapted, notes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal_model::MealNutrition;

    fn meal_with_ingredients(ingredients: &[&str]) -> StructuredMeal {
        StructuredMeal {
            id: "m1".to_string(),
            name: "Test meal".to_string(),
            description: String::new(),
            cuisine: "Italian".to_string(),
            authenticity_score: 0.8,
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            cooking_techniques: vec!["baked".to_string()],
            nutrition: MealNutrition::default(),
            estimated_prep_time: 10,
            estimated_cook_time: 20,
            difficulty_level: 2.0,
        }
    }

    #[test]
    fn test_vegan_meal_with_chicken_fails() {
        let report = check_compliance(
            &["chicken breast".to_string(), "olive oil".to_string()],
            &["vegan".to_string()],
        );
        assert!(!report.compliant);
        assert_eq!(report.violations, vec!["vegan: contains chicken"]);
    }

    #[test]
    fn test_compliant_meal_passes() {
        let report = check_compliance(
            &["rice".to_string(), "black beans".to_string()],
            &["vegan".to_string(), "dairy-free".to_string()],
        );
        assert!(report.compliant);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_unknown_restriction_always_satisfied() {
        let report = check_compliance(
            &["chicken breast".to_string()],
            &["low-sodium".to_string()],
        );
        assert!(report.compliant);
    }

    #[test]
    fn test_restriction_name_normalization() {
        let report = check_compliance(
            &["wheat flour".to_string()],
            &["Gluten Free".to_string()],
        );
        assert!(!report.compliant);
        assert!(report
            .violations
            .iter()
            .any(|v| v.starts_with("gluten-free:")));
    }

    #[test]
    fn test_substring_false_positive_is_the_documented_behavior() {
        // "chicken-free broth" still trips the "chicken" keyword. Kept on
        // purpose; see DESIGN.md before changing.
        let report = check_compliance(
            &["chicken-free broth substitute".to_string()],
            &["vegan".to_string()],
        );
        assert!(!report.compliant);
    }

    #[test]
    fn test_multiple_restrictions_accumulate_violations() {
        let report = check_compliance(
            &["wheat pasta".to_string(), "parmesan cheese".to_string()],
            &["gluten-free".to_string(), "dairy-free".to_string()],
        );
        assert!(!report.compliant);
        assert!(report.violations.iter().any(|v| v.contains("wheat")));
        assert!(report.violations.iter().any(|v| v.contains("cheese")));
    }

    #[test]
    fn test_adaptation_substitutes_and_recovers_compliance() {
        let meal = meal_with_ingredients(&["chicken breast", "rice", "butter"]);
        let (adapted, notes) =
            adapt_meal_for_restrictions(&meal, &["vegan".to_string()]).unwrap();
        assert!(check_compliance(&adapted.ingredients, &["vegan".to_string()]).compliant);
        assert_eq!(adapted.id, "m1-adapted");
        assert_eq!(notes.len(), 2); // chicken breast and butter replaced
        assert!(adapted.ingredients.contains(&"tofu".to_string()));
        // Original untouched.
        assert!(meal.ingredients.contains(&"chicken breast".to_string()));
    }

    #[test]
    fn test_adaptation_returns_none_without_substitution_table() {
        let meal = meal_with_ingredients(&["shrimp", "rice"]);
        assert!(adapt_meal_for_restrictions(&meal, &["shellfish-free".to_string()]).is_none());
    }

    #[test]
    fn test_adaptation_noop_for_already_compliant_meal() {
        let meal = meal_with_ingredients(&["rice", "beans"]);
        let (adapted, notes) =
            adapt_meal_for_restrictions(&meal, &["vegan".to_string()]).unwrap();
        assert_eq!(adapted.id, "m1");
        assert!(notes.is_empty());
    }
}
