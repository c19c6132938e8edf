//! Request handlers.

pub mod admin;
pub mod applications;
pub mod auth;
pub mod employers;
pub mod health;
pub mod jobs;
pub mod uploads;
pub mod users;
