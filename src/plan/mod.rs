pub mod assembler;
pub mod base_meal;
pub mod quota;
pub mod shopping;

pub use assembler::{MealPlanEngine, MealPlanRequest};
pub use base_meal::{calculate_base_influence, BaseMealSelection};
pub use quota::optimal_cultural_meal_count;

use std::error::Error;
use std::fmt;

use crate::api_connection::connection::ApiConnectionError;

/// Why a whole plan-generation call failed. Per-slot problems never show
/// up here - they degrade to flagged or fallback slots - so every variant
/// is something the calling layer should tell the user about
/// distinguishably.
#[derive(Debug)]
pub enum PlanGenerationError {
    /// Missing LLM credentials. Fatal, no retry.
    Configuration(String),
    /// The ranking/generation transport or response parsing failed for the
    /// operation as a whole.
    Ranking(ApiConnectionError),
    /// The cultural cuisine source failed.
    CuisineData(String),
    /// Neither cached candidates nor generation produced anything usable.
    NoUsableCandidates,
    InvalidRequest(String),
}

impl fmt::Display for PlanGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanGenerationError::Configuration(detail) => {
                write!(f, "Configuration error: {}", detail)
            }
            PlanGenerationError::Ranking(err) => write!(f, "Ranking failed: {}", err),
            PlanGenerationError::CuisineData(detail) => {
                write!(f, "Cuisine data unavailable: {}", detail)
            }
            PlanGenerationError::NoUsableCandidates => {
                write!(f, "No usable meal candidates available")
            }
            PlanGenerationError::InvalidRequest(detail) => {
                write!(f, "Invalid plan request: {}", detail)
            }
        }
    }
}

impl Error for PlanGenerationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlanGenerationError::Ranking(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiConnectionError> for PlanGenerationError {
    fn from(err: ApiConnectionError) -> Self {
        match err {
            ApiConnectionError::MissingApiKey(key_name) => PlanGenerationError::Configuration(
                format!("API key not found in environment: {}", key_name),
            ),
            other => PlanGenerationError::Ranking(other),
        }
    }
}
