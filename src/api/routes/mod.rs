//! API Routes
//!
//! Route handlers organized by functionality.

pub mod derived;
pub mod export;
pub mod files;
pub mod goals;
pub mod health;
pub mod runs;
pub mod strava;
