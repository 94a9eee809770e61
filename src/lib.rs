//! cliprig library crate.
//!
//! This module exposes the internal components for integration testing.

pub mod assets;
pub mod config;
pub mod export;
pub mod locator;
pub mod logging;
pub mod overlay;
pub mod placement;
pub mod poll;
pub mod selectors;
pub mod session;
pub mod surface;
