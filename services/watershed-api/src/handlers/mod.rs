//! HTTP request handlers for the watershed API.

pub mod delineate;
pub mod health;
pub mod status;
