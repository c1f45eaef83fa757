use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;

use crate::meal_model::{CulturalCuisineData, MealNutrition, StructuredMeal};

// Expected column headers in the cuisine catalog CSV.
const CULTURE_COL: &str = "Culture";
const MEAL_NAME_COL: &str = "Meal Name";
const DESCRIPTION_COL: &str = "Description";
const AUTHENTICITY_COL: &str = "Authenticity";
const INGREDIENTS_COL: &str = "Ingredients";
const TECHNIQUES_COL: &str = "Techniques";
const CALORIES_COL: &str = "Calories";
const PROTEIN_COL: &str = "Protein (g)";
const CARBS_COL: &str = "Carbs (g)";
const FAT_COL: &str = "Fat (g)";
const PREP_COL: &str = "Prep (min)";
const COOK_COL: &str = "Cook (min)";
const DIFFICULTY_COL: &str = "Difficulty";
const SOURCE_QUALITY_COL: &str = "Source Quality";

/// Ingredients and techniques are packed into one CSV cell each,
/// ';'-separated.
const LIST_SEPARATOR: char = ';';

/// An ingredient must recur this often within a culture to count as one of
/// its key ingredients.
const KEY_INGREDIENT_MIN_OCCURRENCES: usize = 2;
const KEY_INGREDIENT_LIMIT: usize = 8;

fn parse_f32_or(s: &str, fallback: f32) -> f32 {
    s.trim().parse::<f32>().unwrap_or(fallback)
}

fn parse_u32_or(s: &str, fallback: u32) -> u32 {
    s.trim().parse::<u32>().unwrap_or(fallback)
}

fn split_list(s: &str) -> Vec<String> {
    s.split(LIST_SEPARATOR)
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn slugify(culture: &str) -> String {
    culture.trim().to_lowercase().replace(' ', "-")
}

/// Loads a cultural cuisine catalog from a CSV file, grouping rows by
/// culture.
///
/// Rows with an empty culture or meal name are skipped. Numeric cells that
/// fail to parse fall back to neutral defaults rather than aborting the
/// load; a catalog row with a mangled calorie count is still a usable
/// meal. Per-culture `key_ingredients` are derived from ingredient
/// recurrence across that culture's meals.
pub fn load_cuisine_catalog(csv_path: &Path) -> Result<Vec<CulturalCuisineData>> {
    if !csv_path.exists() {
        return Err(anyhow::anyhow!(
            "Cuisine catalog CSV not found at: {:?}",
            csv_path
        ));
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open cuisine catalog at {:?}", csv_path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow::anyhow!("Column '{}' not found", name))
    };

    let culture_idx = col(CULTURE_COL)?;
    let meal_name_idx = col(MEAL_NAME_COL)?;
    let description_idx = col(DESCRIPTION_COL)?;
    let authenticity_idx = col(AUTHENTICITY_COL)?;
    let ingredients_idx = col(INGREDIENTS_COL)?;
    let techniques_idx = col(TECHNIQUES_COL)?;
    let calories_idx = col(CALORIES_COL)?;
    let protein_idx = col(PROTEIN_COL)?;
    let carbs_idx = col(CARBS_COL)?;
    let fat_idx = col(FAT_COL)?;
    let prep_idx = col(PREP_COL)?;
    let cook_idx = col(COOK_COL)?;
    let difficulty_idx = col(DIFFICULTY_COL)?;
    let source_quality_idx = col(SOURCE_QUALITY_COL)?;

    // Culture name -> (display name, meals, source quality). IndexMap-like
    // insertion order is kept separately so output order follows the file.
    let mut cultures: HashMap<String, CulturalCuisineData> = HashMap::new();
    let mut culture_order: Vec<String> = Vec::new();

    for (row_index, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("Failed to read record at row index {}", row_index))?;

        let culture = record
            .get(culture_idx)
            .unwrap_or("")
            .trim()
            .to_string();
        let meal_name = record
            .get(meal_name_idx)
            .unwrap_or("")
            .trim()
            .to_string();
        if culture.is_empty() || meal_name.is_empty() {
            continue;
        }

        let get = |idx: usize| record.get(idx).unwrap_or("");
        let meal = StructuredMeal {
            id: format!("{}-{}", slugify(&culture), row_index),
            name: meal_name,
            description: get(description_idx).trim().to_string(),
            cuisine: culture.clone(),
            authenticity_score: parse_f32_or(get(authenticity_idx), 0.5).clamp(0.0, 1.0),
            ingredients: split_list(get(ingredients_idx)),
            cooking_techniques: split_list(get(techniques_idx)),
            nutrition: MealNutrition {
                calories: parse_f32_or(get(calories_idx), 0.0),
                protein_g: parse_f32_or(get(protein_idx), 0.0),
                carbs_g: parse_f32_or(get(carbs_idx), 0.0),
                fat_g: parse_f32_or(get(fat_idx), 0.0),
            },
            estimated_prep_time: parse_u32_or(get(prep_idx), 0),
            estimated_cook_time: parse_u32_or(get(cook_idx), 0),
            difficulty_level: parse_f32_or(get(difficulty_idx), 2.5).clamp(1.0, 5.0),
        };
        let source_quality = parse_f32_or(get(source_quality_idx), 0.5).clamp(0.0, 1.0);

        let key = slugify(&culture);
        let entry = cultures.entry(key.clone()).or_insert_with(|| {
            culture_order.push(key);
            CulturalCuisineData {
                culture,
                meals: Vec::new(),
                source_quality_score: source_quality,
                key_ingredients: Vec::new(),
            }
        });
        entry.meals.push(meal);
    }

    if cultures.is_empty() {
        return Err(anyhow::anyhow!(
            "No valid cuisine data loaded from {:?}",
            csv_path
        ));
    }

    let mut catalog = Vec::with_capacity(culture_order.len());
    for key in culture_order {
        if let Some(mut data) = cultures.remove(&key) {
            data.key_ingredients = derive_key_ingredients(&data.meals);
            catalog.push(data);
        }
    }
    Ok(catalog)
}

fn derive_key_ingredients(meals: &[StructuredMeal]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for meal in meals {
        for ingredient in &meal.ingredients {
            let lowered = ingredient.to_lowercase();
            match counts.iter_mut().find(|(name, _)| *name == lowered) {
                Some((_, count)) => *count += 1,
                None => counts.push((lowered, 1)),
            }
        }
    }
    counts.retain(|(_, count)| *count >= KEY_INGREDIENT_MIN_OCCURRENCES);
    // Most-recurrent first; first-seen order breaks ties (sort is stable).
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(KEY_INGREDIENT_LIMIT)
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_header(file: &mut NamedTempFile) -> Result<()> {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            CULTURE_COL,
            MEAL_NAME_COL,
            DESCRIPTION_COL,
            AUTHENTICITY_COL,
            INGREDIENTS_COL,
            TECHNIQUES_COL,
            CALORIES_COL,
            PROTEIN_COL,
            CARBS_COL,
            FAT_COL,
            PREP_COL,
            COOK_COL,
            DIFFICULTY_COL,
            SOURCE_QUALITY_COL
        )?;
        Ok(())
    }

    fn create_test_catalog() -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        write_header(&mut file)?;
        writeln!(
            file,
            "Italian,Margherita Pizza,Classic pizza,0.9,flour;tomato;mozzarella,baked,550,20,70,18,20,15,2.5,0.8"
        )?;
        writeln!(
            file,
            "Italian,Pasta al Pomodoro,Simple pasta,0.85,pasta;tomato;basil,boiled,480,15,80,10,10,20,1.5,0.8"
        )?;
        writeln!(
            file,
            "Mexican,Black Bean Tacos,Weeknight tacos,0.7,tortilla;black beans;onion,grilled,430,18,60,12,15,10,2,0.7"
        )?;
        writeln!(file, ",Orphan Meal,No culture,0.5,rice,steamed,300,10,60,3,5,15,1,0.5")?;
        writeln!(file, "Ghost Culture,,No name,0.5,rice,steamed,300,10,60,3,5,15,1,0.5")?;
        writeln!(
            file,
            "Italian,Risotto,Creamy rice,not-a-number,rice;tomato;parmesan,simmered,520,14,75,15,10,35,3,0.8"
        )?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_cuisine_catalog_groups_by_culture() -> Result<()> {
        let file = create_test_catalog()?;
        let catalog = load_cuisine_catalog(file.path())?;

        // Two cultures, file order preserved; rows with an empty culture
        // or meal name are skipped.
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].culture, "Italian");
        assert_eq!(catalog[0].meals.len(), 3);
        assert_eq!(catalog[1].culture, "Mexican");
        assert_eq!(catalog[1].meals.len(), 1);
        Ok(())
    }

    #[test]
    fn test_load_cuisine_catalog_parses_meal_fields() -> Result<()> {
        let file = create_test_catalog()?;
        let catalog = load_cuisine_catalog(file.path())?;

        let pizza = &catalog[0].meals[0];
        assert_eq!(pizza.name, "Margherita Pizza");
        assert_eq!(pizza.cuisine, "Italian");
        assert_eq!(pizza.id, "italian-0");
        assert_eq!(pizza.authenticity_score, 0.9);
        assert_eq!(
            pizza.ingredients,
            vec!["flour", "tomato", "mozzarella"]
        );
        assert_eq!(pizza.nutrition.calories, 550.0);
        assert_eq!(pizza.estimated_prep_time, 20);
        assert_eq!(pizza.estimated_cook_time, 15);
        Ok(())
    }

    #[test]
    fn test_unparseable_authenticity_falls_back_to_neutral() -> Result<()> {
        let file = create_test_catalog()?;
        let catalog = load_cuisine_catalog(file.path())?;
        let risotto = catalog[0]
            .meals
            .iter()
            .find(|m| m.name == "Risotto")
            .unwrap();
        assert_eq!(risotto.authenticity_score, 0.5);
        Ok(())
    }

    #[test]
    fn test_key_ingredients_derived_from_recurrence() -> Result<()> {
        let file = create_test_catalog()?;
        let catalog = load_cuisine_catalog(file.path())?;
        // "tomato" appears in all three Italian meals; nothing else recurs.
        assert_eq!(catalog[0].key_ingredients, vec!["tomato"]);
        Ok(())
    }

    #[test]
    fn test_missing_column_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{},{}", CULTURE_COL, MEAL_NAME_COL)?;
        writeln!(file, "Italian,Pizza")?;
        file.flush()?;

        let result = load_cuisine_catalog(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Column 'Description' not found"));
        Ok(())
    }

    #[test]
    fn test_empty_catalog_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write_header(&mut file)?;
        file.flush()?;

        let result = load_cuisine_catalog(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("No valid cuisine data loaded"));
        Ok(())
    }

    #[test]
    fn test_file_not_found() {
        let path = Path::new("this_catalog_does_not_exist.csv");
        let result = load_cuisine_catalog(path);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Cuisine catalog CSV not found"));
    }
}
