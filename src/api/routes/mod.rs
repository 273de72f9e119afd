//! API Routes
//!
//! Route handlers organized by functionality.

pub mod auth;
pub mod export;
pub mod health;
pub mod profile;
pub mod requests;
