/// Clamp ranges for the cultural-meal quota, keyed by plan length in days:
/// up to a week, up to two weeks, longer.
const SMALL_PLAN_RANGE: (u32, u32) = (1, 3);
const MEDIUM_PLAN_RANGE: (u32, u32) = (2, 6);
const LARGE_PLAN_RANGE: (u32, u32) = (4, 10);

const SMALL_PLAN_MAX_DAYS: u32 = 7;
const MEDIUM_PLAN_MAX_DAYS: u32 = 14;

/// Target number of slots to fill from cached cultural meals rather than
/// generation.
///
/// The raw target is a quarter of the plan, scaled up by as much as 60%
/// for a maximal cultural weight, then clamped to the range for the plan's
/// size so tiny plans still get at least one cultural meal and long plans
/// do not become pure catalog replays.
///
/// # Arguments
/// * `num_days`: plan length in days (selects the clamp range).
/// * `total_meals`: `num_days * meals_per_day`.
/// * `cultural_weight`: the profile's cultural priority weight in [0, 1].
pub fn optimal_cultural_meal_count(num_days: u32, total_meals: u32, cultural_weight: f32) -> u32 {
    let weight = cultural_weight.clamp(0.0, 1.0);
    let raw = (total_meals as f32 * 0.25 * (1.0 + 0.6 * weight)).ceil() as u32;
    let (lo, hi) = if num_days <= SMALL_PLAN_MAX_DAYS {
        SMALL_PLAN_RANGE
    } else if num_days <= MEDIUM_PLAN_MAX_DAYS {
        MEDIUM_PLAN_RANGE
    } else {
        LARGE_PLAN_RANGE
    };
    raw.clamp(lo, hi)
}
