//! Classical computer-vision damage detectors.
//!
//! Each detector is a pure function from a photo to zero or more scored
//! candidates, built from color gating, texture statistics, and
//! morphological cleanup. They run independently of the learned model and
//! feed the same fusion pipeline; their confidences are heuristic and
//! capped below typical model scores so a model detection wins overlaps.

mod dark_patch;
mod discoloration;
mod missing_material;
mod underlayment;

pub use dark_patch::detect_dark_patches;
pub use discoloration::detect_discoloration;
pub use missing_material::detect_missing_material;
pub use underlayment::detect_exposed_underlayment;
