//! URLive front end: a client for the URLive link-shortener API, driven
//! from the browser through a thin shell.

pub mod api;
pub mod app;
pub mod chart;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pages;
pub mod router;
pub mod server;
pub mod store;
pub mod validate;

pub use app::{App, Event, Frame};
pub use config::AppConfig;
pub use server::AppState;
