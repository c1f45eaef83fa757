pub mod data_loader;
pub mod store;

pub use data_loader::load_cuisine_catalog;
pub use store::{CuisineSource, CuisineStore};
