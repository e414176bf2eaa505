pub mod artifact;
pub mod forecast;
pub mod open_meteo;
pub mod readings;
