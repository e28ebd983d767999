pub mod address;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod listings;
pub mod output;
pub mod scoring;
