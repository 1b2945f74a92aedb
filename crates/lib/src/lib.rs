//! buildlab-lib: preview pipeline for generated components
//!
//! Generated component source travels through a fixed pipeline:
//! - `sanitize`: trims the commentary around the module body
//! - `transpile`: TSX to plain CommonJS-style JavaScript
//! - `sandbox`: evaluates the module against a dependency whitelist
//! - `render`: mounts the component in-process or emits an isolated document
//!
//! `pipeline` ties the stages together for one render environment and
//! `preview` maps build lookups onto it.

pub mod auth;
pub mod build;
pub mod config;
pub mod consts;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod platform;
pub mod preview;
pub mod render;
pub mod sandbox;
pub mod sanitize;
pub mod transpile;
