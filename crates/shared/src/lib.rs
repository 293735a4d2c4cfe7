pub mod geo;
pub mod keys;
pub mod models;
