//! The core module of the fusion engine.
//!
//! This module contains the fundamental components shared across the
//! pipeline:
//! - Error handling
//! - Constants used throughout the engine
//! - Configuration management
//! - The session cache for expensive external runtimes
//! - Traits defining the seams to external collaborators
//!
//! It also re-exports commonly used types for convenience.

pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod traits;

pub use cache::SessionCache;
pub use config::{
    DecoderConfig, FilterConfig, FusionConfig, HeuristicConfig, OverlayConfig, PipelineConfig,
};
pub use constants::*;
pub use errors::{FusionError, FusionResult, ProcessingStage};
pub use traits::{Annotator, InferenceBackend, RegionLabel};
