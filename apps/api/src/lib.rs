pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod mailer;
pub mod models;
pub mod notices;
pub mod plans;
pub mod postings;
pub mod routes;
pub mod state;
pub mod tags;
pub mod users;
