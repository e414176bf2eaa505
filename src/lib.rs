pub mod aqi;
pub mod collector;
pub mod config;
pub mod errors;
pub mod features;
pub mod initialization;
pub mod logging;
pub mod manager_open_meteo;
pub mod models;
pub mod predictor;
pub mod server;
