use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use mealplan_engine::api_connection::endpoints::{Provider, DEFAULT_MODEL};
use mealplan_engine::cli::parse_args;
use mealplan_engine::cuisine::CuisineStore;
use mealplan_engine::nutrition::calculate_plan_nutrition;
use mealplan_engine::plan::{MealPlanEngine, MealPlanRequest};
use mealplan_engine::profile::UserProfile;

const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

/// Cached cuisine data is considered fresh for a day.
const CUISINE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok(); // Load .env file for API keys

    let cli_args = parse_args();

    println!("Loading user profile from {}...", cli_args.profile_file);
    let profile_content = fs::read_to_string(&cli_args.profile_file)
        .await
        .with_context(|| format!("Failed to read profile file '{}'", cli_args.profile_file))?;
    let profile: UserProfile = serde_json::from_str(&profile_content)
        .with_context(|| format!("Failed to parse profile file '{}'", cli_args.profile_file))?;

    println!("Loading cuisine catalog from {}...", cli_args.cuisine_data);
    let store = CuisineStore::from_csv_path(Path::new(&cli_args.cuisine_data), CUISINE_CACHE_TTL)
        .with_context(|| {
            format!("Failed to load cuisine catalog from '{}'", cli_args.cuisine_data)
        })?;
    println!("Cuisine catalog loaded: {} cultures.", store.culture_count());

    let engine = MealPlanEngine::new(
        Arc::new(store),
        Arc::new(Provider::openrouter(API_KEY_ENV_VAR)),
        DEFAULT_MODEL,
    );

    let request = MealPlanRequest {
        user_id: profile.user_id.clone(),
        profile,
        num_days: cli_args.days,
        meals_per_day: cli_args.meals_per_day,
        max_total_time_minutes: cli_args.max_total_time,
        max_difficulty: cli_args.max_difficulty,
    };

    let progress_callback = |message: String| {
        println!("{}", message);
    };

    println!(
        "\nGenerating a {}-day plan with {} meals per day...\n",
        request.num_days, request.meals_per_day
    );
    let plan = match engine.generate_meal_plan(&request, progress_callback).await {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("\nMeal plan generation failed: {}", e);
            return Err(anyhow::anyhow!("Meal plan generation failed: {}", e));
        }
    };

    println!("\n=== Meal plan ({} slots) ===", plan.slot_count());
    for (day, meals) in &plan.days {
        println!("\nDay {}:", day);
        for (meal_type, slot) in meals {
            let source = slot
                .cultural_source
                .as_deref()
                .unwrap_or("generated");
            let compliance = if slot.dietary_compliant {
                String::new()
            } else {
                format!("  [NON-COMPLIANT: {}]", slot.compliance_violations.join(", "))
            };
            println!(
                "  {:<9} {} ({}){}",
                format!("{}:", meal_type.as_str()),
                slot.meal.name,
                source,
                compliance
            );
            if let Some(notes) = &slot.adaptation_notes {
                println!("            adapted: {}", notes);
            }
        }
    }

    println!("\n=== Shopping list ===");
    for item in &plan.shopping_list {
        println!("  - {}", item);
    }

    println!("\n=== Prep tips ===");
    for tip in &plan.prep_tips {
        println!("  - {}", tip);
    }

    let nutrition = calculate_plan_nutrition(&plan);
    println!("\n=== Nutrition (per day average) ===");
    println!(
        "  {:.0} kcal, {:.0} g protein, {:.0} g carbs, {:.0} g fat",
        nutrition.per_day_average.calories,
        nutrition.per_day_average.protein_g,
        nutrition.per_day_average.carbs_g,
        nutrition.per_day_average.fat_g
    );

    Ok(())
}
