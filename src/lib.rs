pub mod app;
pub mod cli;
pub mod config;
pub mod filters;
pub mod finder;
pub mod genres;
pub mod models;
pub mod tmdb;
