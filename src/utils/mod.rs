//! Utility functions for the fusion pipeline.
//!
//! This module provides image ingestion helpers, overlay rendering, and
//! logging setup.

pub mod image;
pub mod visualization;

pub use image::{decode_image, encode_png, resize_for_analysis, resize_if_needed};
pub use visualization::{OverlayStyle, composite_overlay, damage_color, render_overlay};

/// Initializes the tracing subscriber for logging.
///
/// Sets up the tracing subscriber with environment filter and formatting
/// layer. Typically called once at the start of an application.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
