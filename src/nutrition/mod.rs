//! Nutrition analysis: an in-process lookup table, an HTTP client for the
//! analysis service, and the stub implementation of that service.

pub mod remote;
pub mod stub;
pub mod table;

use async_trait::async_trait;
use serde::Serialize;

use crate::meals::repo_types::{Nutrition, Unit};

pub use remote::RemoteNutrition;

/// Tag reported when the analyzer could not classify a food.
pub const UNKNOWN_TAG: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionAnalysis {
    pub nutrition: Nutrition,
    pub ayurvedic_tag: Option<String>,
}

impl NutritionAnalysis {
    pub fn fallback() -> Self {
        Self {
            nutrition: Nutrition::default(),
            ayurvedic_tag: Some(UNKNOWN_TAG.to_string()),
        }
    }

    /// The tag, unless it is absent or `unknown`.
    pub fn known_tag(&self) -> Option<&str> {
        self.ayurvedic_tag
            .as_deref()
            .filter(|t| !t.is_empty() && *t != UNKNOWN_TAG)
    }
}

/// Estimates nutrition facts for a logged food. Never fails: implementations
/// degrade to [`NutritionAnalysis::fallback`].
#[async_trait]
pub trait NutritionAnalyzer: Send + Sync {
    async fn analyze(&self, food_name: &str, quantity: f64, unit: Unit) -> NutritionAnalysis;
}

/// Analyzer backed by [`table`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalNutrition;

#[async_trait]
impl NutritionAnalyzer for LocalNutrition {
    async fn analyze(&self, food_name: &str, quantity: f64, _unit: Unit) -> NutritionAnalysis {
        NutritionAnalysis {
            nutrition: table::analyze(food_name, quantity),
            ayurvedic_tag: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_analyzer_uses_table() {
        let a = LocalNutrition.analyze("banana", 100.0, Unit::Grams).await;
        assert_eq!(a.nutrition.calories, 89.0);
        assert_eq!(a.known_tag(), None);
    }

    #[test]
    fn unknown_tag_is_not_known() {
        assert_eq!(NutritionAnalysis::fallback().known_tag(), None);
        let tagged = NutritionAnalysis {
            nutrition: Nutrition::default(),
            ayurvedic_tag: Some("cooling".into()),
        };
        assert_eq!(tagged.known_tag(), Some("cooling"));
    }
}
