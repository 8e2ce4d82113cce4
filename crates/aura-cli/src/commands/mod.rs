pub mod analyze;
pub mod build;
pub mod deps;
pub mod validate;
