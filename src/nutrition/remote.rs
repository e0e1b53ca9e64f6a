use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{NutritionAnalysis, NutritionAnalyzer, UNKNOWN_TAG};
use crate::meals::repo_types::{Nutrition, Unit};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub food_name: &'a str,
    pub quantity: f64,
    pub unit: &'a str,
}

/// Body returned by the analysis service; missing numbers read as zero.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeReply {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
    #[serde(default)]
    pub ayurvedic_tag: Option<String>,
}

impl From<AnalyzeReply> for NutritionAnalysis {
    fn from(r: AnalyzeReply) -> Self {
        Self {
            nutrition: Nutrition {
                calories: r.calories.unwrap_or(0.0),
                protein: r.protein.unwrap_or(0.0),
                carbohydrates: r.carbs.unwrap_or(0.0),
                fat: r.fat.unwrap_or(0.0),
                ..Default::default()
            },
            ayurvedic_tag: Some(
                r.ayurvedic_tag
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| UNKNOWN_TAG.to_string()),
            ),
        }
    }
}

/// Client for the external analysis service at `AI_SERVICE_URL`.
#[derive(Clone)]
pub struct RemoteNutrition {
    client: reqwest::Client,
    url: String,
}

impl RemoteNutrition {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build analysis http client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn call(&self, food_name: &str, quantity: f64, unit: Unit) -> anyhow::Result<AnalyzeReply> {
        let reply = self
            .client
            .post(&self.url)
            .json(&AnalyzeRequest {
                food_name,
                quantity,
                unit: unit.as_str(),
            })
            .send()
            .await
            .context("send analyze request")?
            .error_for_status()
            .context("analysis service status")?
            .json::<AnalyzeReply>()
            .await
            .context("decode analyze reply")?;
        Ok(reply)
    }
}

#[async_trait]
impl NutritionAnalyzer for RemoteNutrition {
    async fn analyze(&self, food_name: &str, quantity: f64, unit: Unit) -> NutritionAnalysis {
        match self.call(food_name, quantity, unit).await {
            Ok(reply) => {
                debug!(food_name, quantity, "analysis service replied");
                reply.into()
            }
            Err(e) => {
                warn!(error = %e, food_name, "analysis service call failed; using fallback nutrition");
                NutritionAnalysis::fallback()
            }
        }
    }
}
