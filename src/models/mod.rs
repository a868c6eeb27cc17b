//! Fitted model handles, loading and routing

pub mod inference;
pub mod loader;
pub mod native;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod router;

pub use inference::{ModelHandle, ModelOutput};
pub use loader::{ArtifactLoader, LoadedArtifacts};
pub use router::PredictionRouter;
