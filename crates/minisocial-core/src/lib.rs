//! Core Mini Social library (validation, services, session, feed, routes).

pub mod config;
pub mod feed;
pub mod interrupt;
pub mod logging;
pub mod messages;
pub mod post;
pub mod posts;
pub mod routes;
pub mod services;
pub mod session;
pub mod subscription;
pub mod validation;
