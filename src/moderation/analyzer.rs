use async_trait::async_trait;
use rand::Rng;

use crate::models::moderation::{CategoryScore, ModerationResult, CATEGORIES};

/// Scores an image per moderation category.
///
/// Implementations return raw scores; the verdict is always derived through
/// [`ModerationResult::from_scores`].
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> anyhow::Result<ModerationResult>;
}

/// Stand-in model: a uniform random confidence in `[0, 1]` per category,
/// rounded to two decimals. The image bytes are not inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAnalyzer;

impl RandomAnalyzer {
    fn scores() -> Vec<CategoryScore> {
        let mut rng = rand::thread_rng();
        CATEGORIES
            .iter()
            .map(|c| CategoryScore {
                category: c.key.to_string(),
                confidence: (rng.gen_range(0.0..=1.0_f64) * 100.0).round() / 100.0,
            })
            .collect()
    }
}

#[async_trait]
impl Analyzer for RandomAnalyzer {
    async fn analyze(
        &self,
        _bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> anyhow::Result<ModerationResult> {
        let scores = Self::scores();
        Ok(ModerationResult::from_scores(scores, filename, content_type))
    }
}
