//! Result aggregation
//!
//! Turns a classification and the raw biomarkers into the caller-facing
//! record:
//! - Confidence percentages
//! - Result and response types
//! - Metadata

pub mod confidence;
pub mod metadata;
pub mod result;

pub use confidence::ConfidenceBreakdown;
pub use metadata::AnalysisMetadata;
pub use result::{AnalysisResponse, AnalysisResult, SurfacedFeatures};
