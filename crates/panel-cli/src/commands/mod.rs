pub mod analyze;
pub mod demo;
pub mod export;
pub mod generate;
pub mod schema;
pub mod survey;
pub mod utils;
