pub mod merger;
pub mod types;
