// src/types/mod.rs

pub mod analysis;
pub mod resume;
pub mod session;

pub use analysis::{AnalysisRequest, AnalysisResult, AnalyzeResponse};
pub use session::{GuestSession, SessionSnapshot};
