//! Stand-in for the external analysis service, served by the `ai-stub` binary.

use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::UNKNOWN_TAG;

#[derive(Debug, Clone, Copy)]
struct StubFacts {
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    tag: &'static str,
}

const STUB_FOODS: &[(&str, StubFacts)] = &[
    ("apple", StubFacts { calories: 95.0, protein: 0.5, carbs: 25.0, fat: 0.3, tag: "sweet" }),
    ("banana", StubFacts { calories: 105.0, protein: 1.3, carbs: 27.0, fat: 0.4, tag: "sweet" }),
    ("chicken breast", StubFacts { calories: 165.0, protein: 31.0, carbs: 0.0, fat: 3.6, tag: "protein" }),
    ("rice", StubFacts { calories: 130.0, protein: 2.7, carbs: 28.0, fat: 0.3, tag: "neutral" }),
    ("spinach", StubFacts { calories: 23.0, protein: 2.9, carbs: 3.6, fat: 0.4, tag: "bitter" }),
    ("yogurt", StubFacts { calories: 61.0, protein: 3.5, carbs: 4.7, fat: 3.3, tag: "cooling" }),
];

const STUB_DEFAULT: StubFacts = StubFacts {
    calories: 100.0,
    protein: 5.0,
    carbs: 10.0,
    fat: 2.0,
    tag: UNKNOWN_TAG,
};

#[derive(Debug, Deserialize)]
pub struct StubRequest {
    pub food_name: Option<String>,
    pub quantity: Option<f64>,
    #[allow(dead_code)]
    pub unit: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StubReply {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub ayurvedic_tag: &'static str,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Exact lowercased lookup, scaled per serving.
pub fn analyze_stub(food_name: &str, quantity: f64) -> StubReply {
    let key = food_name.to_lowercase();
    let base = STUB_FOODS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, f)| *f)
        .unwrap_or(STUB_DEFAULT);
    StubReply {
        calories: (base.calories * quantity).round(),
        protein: round1(base.protein * quantity),
        carbs: round1(base.carbs * quantity),
        fat: round1(base.fat * quantity),
        ayurvedic_tag: base.tag,
    }
}

async fn analyze(Json(req): Json<StubRequest>) -> impl IntoResponse {
    let Some(food_name) = req.food_name.filter(|n| !n.trim().is_empty()) else {
        warn!("analyze request without food_name");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "food_name is required" })),
        )
            .into_response();
    };
    let reply = analyze_stub(&food_name, req.quantity.unwrap_or(1.0));
    Json(reply).into_response()
}

pub fn router() -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    info!("ai stub listening on {}", listener.local_addr()?);
    axum::serve(listener, router()).await?;
    Ok(())
}
