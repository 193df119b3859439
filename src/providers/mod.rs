//! Inference provider transports

pub mod huggingface;

// Re-export for convenience
pub use huggingface::HuggingFaceClient;
