pub mod api_connection;
pub mod cli;
pub mod compliance;
pub mod cuisine;
pub mod meal_model;
pub mod nutrition;
pub mod plan;
pub mod profile;
pub mod ranking;
pub mod scoring;
