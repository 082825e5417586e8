pub mod cell_types;
pub mod config;
pub mod dataset;
pub mod genes;
pub mod profiles;
pub mod results;
pub mod spot_class;
