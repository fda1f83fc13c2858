//! # Donation storefront server
//! This module hosts the HTTP server for the donation storefront. It is responsible for:
//! Accepting checkout requests and turning them into pending orders with EasyDonate payment sessions.
//! Listening for incoming payment webhook notifications from EasyDonate and reconciling them.
//! Serving the public product catalog and the admin back office.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/products`: The public product catalog.
//! * `/orders`: The checkout endpoint.
//! * `/webhooks/easydonate`: The payment notification webhook.
//! * `/api/*`: The admin back office, guarded by the admin API key.

pub mod checkout;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook;

#[cfg(test)]
mod endpoint_tests;
