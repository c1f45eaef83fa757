use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the user profile JSON file
    #[arg(short, long)]
    pub profile_file: String,

    /// Path to the cultural cuisine catalog CSV
    #[arg(short, long, default_value = "cuisine_catalog.csv")]
    pub cuisine_data: String,

    /// Number of days to plan
    #[arg(short = 'd', long, default_value_t = 7)]
    pub days: u32,

    /// Meals per day (1-4: breakfast, lunch, dinner, snack)
    #[arg(short = 'm', long, default_value_t = 3)]
    pub meals_per_day: u32,

    /// Maximum prep + cook minutes per meal
    #[arg(long)]
    pub max_total_time: Option<u32>,

    /// Maximum difficulty (1-5) for cached cultural meals
    #[arg(long)]
    pub max_difficulty: Option<f32>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
