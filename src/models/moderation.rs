use serde::{Deserialize, Serialize};

/// Scores at or above this value mark an image unsafe. Shared by the
/// analyzer and the categories endpoint.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Upload limit enforced by the file validator.
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

pub const SUPPORTED_FORMATS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
}

pub const CATEGORIES: [Category; 5] = [
    Category {
        key: "explicit_nudity",
        name: "Explicit Nudity",
        description: "Sexually explicit content and nudity",
        severity: Severity::High,
    },
    Category {
        key: "graphic_violence",
        name: "Graphic Violence",
        description: "Violent, gory, or disturbing imagery",
        severity: Severity::High,
    },
    Category {
        key: "hate_symbols",
        name: "Hate Symbols",
        description: "Hate speech symbols and extremist imagery",
        severity: Severity::High,
    },
    Category {
        key: "self_harm",
        name: "Self Harm",
        description: "Content depicting self-harm or suicide",
        severity: Severity::High,
    },
    Category {
        key: "spam_unwanted",
        name: "Spam/Unwanted",
        description: "Spam, advertisements, or unwanted content",
        severity: Severity::Medium,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    /// In `[0.0, 1.0]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub is_safe: bool,
    pub scores: Vec<CategoryScore>,
    pub filename: String,
    pub content_type: String,
}

impl ModerationResult {
    /// Builds a result whose `is_safe` is derived from the scores, so the
    /// verdict can never disagree with them.
    pub fn from_scores(
        scores: Vec<CategoryScore>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        let is_safe = scores.iter().all(|s| s.confidence < CONFIDENCE_THRESHOLD);
        Self {
            is_safe,
            scores,
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }
}

/// Payload of `GET /moderate/categories`.
pub fn category_catalog() -> serde_json::Value {
    let categories: serde_json::Map<String, serde_json::Value> = CATEGORIES
        .iter()
        .map(|c| {
            (
                c.key.to_string(),
                serde_json::json!({
                    "name": c.name,
                    "description": c.description,
                    "severity": c.severity,
                }),
            )
        })
        .collect();

    serde_json::json!({
        "categories": categories,
        "confidence_threshold": CONFIDENCE_THRESHOLD,
        "supported_formats": SUPPORTED_FORMATS,
        "max_file_size": format!("{}MB", MAX_FILE_SIZE_BYTES / (1024 * 1024)),
    })
}
