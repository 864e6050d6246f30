//! Citymap Viewer - Application Library
//!
//! A headless front end over `citymap-lib`: it loads a catalog, ingests every
//! source, keeps the live source fresh and prints what a map UI would show
//! (the layer list and each render pass) as text or JSON.

mod app;
pub mod logging;

pub use app::settings::Settings;
pub use app::{Error, Result, run};
