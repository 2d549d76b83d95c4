pub mod config;
pub mod family;
pub mod photos;
pub mod stats;
