// src/types/analysis.rs
//! Analysis request/response types.
//!
//! The result payload is large and loosely typed on the wire. We keep a
//! partial schema: every field optional, unknown fields preserved in
//! `extra`, narrowing done once at the network boundary instead of
//! defensive lookups scattered through the rendering code.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One analysis submission. Transient, built per submit, never persisted.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub resume_path: PathBuf,
    pub job_description: String,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Option<String>,
    pub overall_score: Option<f64>,
    pub match_analysis: Option<MatchAnalysis>,
    pub recommendations: Option<Vec<Recommendation>>,
    pub score_breakdown: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub summary: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub gaps: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response of POST /guest/analyze: the analysis payload plus the
/// credit balance after this run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    pub credits_remaining: Option<u32>,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_result_tolerates_missing_fields() {
        let result: AnalysisResult = serde_json::from_str("{}").unwrap();
        assert!(result.overall_score.is_none());
        assert!(result.match_analysis.is_none());
        assert!(result.recommendations.is_none());
    }

    #[test]
    fn test_unknown_fields_survive() {
        let raw = r#"{"overall_score": 82.5, "ats_version": "v3"}"#;
        let result: AnalysisResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.overall_score, Some(82.5));
        assert_eq!(
            result.extra.get("ats_version").and_then(|v| v.as_str()),
            Some("v3")
        );
    }

    #[test]
    fn test_analyze_response_flattens_payload() {
        let raw = r#"{
            "credits_remaining": 1,
            "overall_score": 74.0,
            "match_analysis": {"summary": "Decent fit", "strengths": ["Rust"]},
            "recommendations": [{"title": "Add metrics", "priority": "high"}]
        }"#;
        let response: AnalyzeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.credits_remaining, Some(1));
        assert_eq!(response.analysis.overall_score, Some(74.0));
        let analysis = response.analysis.match_analysis.unwrap();
        assert_eq!(analysis.summary.as_deref(), Some("Decent fit"));
    }
}
