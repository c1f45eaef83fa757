pub mod engine;
pub mod llm_ranker;

pub use engine::{ranked_meals, DEFAULT_CULTURE_FALLBACK};
pub use llm_ranker::{rank_meals, rank_meals_parallel, LlmRankingOutcome};
