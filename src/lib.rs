//! Paw Brawl: a local two-player platform fighter.
//!
//! `domain` holds the simulation rules, `sim` runs a match one tick at a
//! time, `ui` drives the terminal front-end.

pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
