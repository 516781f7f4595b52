//! Domain types and rules for the theory-test coach.
//!
//! Everything here is pure: quiz sessions, scoring, progress, learning
//! modules, and coach actions, with no IO or persistence concerns.

#![forbid(unsafe_code)]

pub mod model;
pub mod time;

pub use time::Clock;
