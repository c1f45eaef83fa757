use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Relative decision priorities, each expected in [0, 1]. These are not
/// quotas and need not sum to 1; `Default` is an even 0.5 across the board.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriorityWeights {
    pub cost: f32,
    pub health: f32,
    pub cultural: f32,
    pub variety: f32,
    pub time: f32,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        PriorityWeights {
            cost: 0.5,
            health: 0.5,
            cultural: 0.5,
            variety: 0.5,
            time: 0.5,
        }
    }
}

impl PriorityWeights {
    /// Copy with every weight clamped to [0, 1]. Scoring and slot-split
    /// math assume this range; profile files are not trusted to respect it.
    pub fn clamped(&self) -> PriorityWeights {
        PriorityWeights {
            cost: self.cost.clamp(0.0, 1.0),
            health: self.health.clamp(0.0, 1.0),
            cultural: self.cultural.clamp(0.0, 1.0),
            variety: self.variety.clamp(0.0, 1.0),
            time: self.time.clamp(0.0, 1.0),
        }
    }
}

fn default_family_size() -> u32 {
    1
}

/// Immutable per-request description of the person the plan is for.
///
/// `dietary_restrictions` are mandatory and are never overridden by the
/// priority weights. `cultural_background` is an ordered search list: the
/// ranking engine consults cached cuisine data in exactly this order.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub priority_weights: PriorityWeights,
    #[serde(default)]
    pub cultural_background: Vec<String>,
    /// Per-cuisine preference in [0, 1]. Cuisines absent from the map get
    /// `DEFAULT_CUISINE_PREFERENCE`.
    #[serde(default)]
    pub cultural_preferences: HashMap<String, f32>,
    #[serde(default = "default_family_size")]
    pub family_size: u32,
    /// Upper bound on prep + cook minutes a meal may take. `None` means
    /// no limit.
    #[serde(default)]
    pub max_total_time_minutes: Option<u32>,
}

pub const DEFAULT_CUISINE_PREFERENCE: f32 = 0.5;

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        UserProfile {
            user_id: user_id.into(),
            dietary_restrictions: Vec::new(),
            priority_weights: PriorityWeights::default(),
            cultural_background: Vec::new(),
            cultural_preferences: HashMap::new(),
            family_size: 1,
            max_total_time_minutes: None,
        }
    }

    /// Preference for a cuisine, matched case-insensitively; 0.5 for any
    /// cuisine the profile has not seen.
    pub fn cultural_preference(&self, cuisine: &str) -> f32 {
        self.cultural_preferences
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(cuisine))
            .map(|(_, preference)| preference.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CUISINE_PREFERENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cultural_preference_case_insensitive() {
        let mut profile = UserProfile::new("u1");
        profile
            .cultural_preferences
            .insert("Italian".to_string(), 0.9);
        assert_eq!(profile.cultural_preference("italian"), 0.9);
        assert_eq!(profile.cultural_preference("ITALIAN"), 0.9);
    }

    #[test]
    fn test_cultural_preference_default_for_unseen() {
        let profile = UserProfile::new("u1");
        assert_eq!(
            profile.cultural_preference("Ethiopian"),
            DEFAULT_CUISINE_PREFERENCE
        );
    }

    #[test]
    fn test_cultural_preference_clamps_out_of_range_values() {
        let mut profile = UserProfile::new("u1");
        profile.cultural_preferences.insert("Thai".to_string(), 3.0);
        assert_eq!(profile.cultural_preference("Thai"), 1.0);
    }

    #[test]
    fn test_weights_clamped() {
        let weights = PriorityWeights {
            cost: 1.5,
            health: -0.2,
            cultural: 0.4,
            variety: 0.0,
            time: 1.0,
        };
        let clamped = weights.clamped();
        assert_eq!(clamped.cost, 1.0);
        assert_eq!(clamped.health, 0.0);
        assert_eq!(clamped.cultural, 0.4);
        assert_eq!(clamped.time, 1.0);
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let profile: UserProfile = serde_json::from_str(r#"{"user_id": "u2"}"#).unwrap();
        assert_eq!(profile.family_size, 1);
        assert!(profile.dietary_restrictions.is_empty());
        assert_eq!(profile.priority_weights, PriorityWeights::default());
        assert!(profile.max_total_time_minutes.is_none());
    }
}
