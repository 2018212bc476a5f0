pub mod interval;
pub mod models;
pub mod services;
pub mod store;
