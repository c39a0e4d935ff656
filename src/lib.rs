//! RedactFE: pixelate or cover rectangular regions of an image.
//!
//! The editing core (`canvas`, `ops::redact`, `components`, `session`) has no
//! GUI dependency beyond the panel widgets; `app` is the eframe shell and
//! `cli` the headless batch front end.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;
pub mod settings;
