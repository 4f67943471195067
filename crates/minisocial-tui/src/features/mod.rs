//! Screen features. Each owns its state, key handling, and rendering.

pub mod auth;
pub mod banner;
pub mod home;
pub mod not_found;
