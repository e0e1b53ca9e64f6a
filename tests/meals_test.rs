mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{app, create_meal, delete, get, post, put, register};

#[tokio::test]
async fn create_fills_missing_nutrition() {
    let app = app();
    let (user_id, token) = register(&app, "eater@example.com", "patient").await;

    let meal = create_meal(
        &app,
        &token,
        json!({ "food_name": "Rice", "quantity": 200, "unit": "grams", "meal_type": "lunch" }),
    )
    .await;
    assert_eq!(meal["user_id"], user_id);
    assert_eq!(meal["nutrition"]["calories"], 260.0);
    assert_eq!(meal["doctor_review"]["status"], "pending");
    assert!(meal["nutrition_score"].as_f64().unwrap() > 0.0);

    let given = create_meal(
        &app,
        &token,
        json!({ "food_name": "Rice", "quantity": 1, "nutrition": { "calories": 42 } }),
    )
    .await;
    assert_eq!(given["nutrition"]["calories"], 42.0);
    assert_eq!(given["meal_type"], "other");
}

#[tokio::test]
async fn create_rejects_invalid_meals() {
    let app = app();
    let (_, token) = register(&app, "bad@example.com", "patient").await;
    let cases = [
        json!({ "quantity": 1 }),
        json!({ "food_name": "Rice" }),
        json!({ "food_name": "Rice", "quantity": 0 }),
        json!({ "food_name": "Rice", "quantity": 1, "meal_type": "brunch" }),
        json!({ "food_name": "Rice", "quantity": 1, "journal_entry": { "energy_level": 0 } }),
        json!({ "food_name": "Rice", "quantity": 1, "meal_date": "someday" }),
    ];
    for case in cases {
        let (status, body) = post(&app, "/api/meals", &token, case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {case}: {body}");
    }
}

#[tokio::test]
async fn meals_are_private_to_their_owner() {
    let app = app();
    let (_, alice) = register(&app, "alice@example.com", "patient").await;
    let (_, eve) = register(&app, "eve@example.com", "patient").await;
    let meal = create_meal(&app, &alice, json!({ "food_name": "Dal", "quantity": 1 })).await;
    let uri = format!("/api/meals/{}", meal["id"].as_str().unwrap());

    let (status, _) = get(&app, &uri, &eve).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = put(&app, &uri, &eve, json!({ "food_name": "Stolen" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = delete(&app, &uri, &eve).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, &uri, &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["food_name"], "Dal");
}

#[tokio::test]
async fn update_and_delete() {
    let app = app();
    let (_, token) = register(&app, "upd@example.com", "patient").await;
    let meal = create_meal(
        &app,
        &token,
        json!({ "food_name": "Oatmeal", "quantity": 1, "servings": { "planned": 2, "consumed": 1 } }),
    )
    .await;
    assert_eq!(meal["servings"]["remaining"], 1.0);
    let uri = format!("/api/meals/{}", meal["id"].as_str().unwrap());

    let (status, body) = put(
        &app,
        &uri,
        &token,
        json!({ "is_favorite": true, "servings": { "planned": 2, "consumed": 2 } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_favorite"], true);
    assert_eq!(body["data"]["food_name"], "Oatmeal");
    assert_eq!(body["data"]["servings"]["remaining"], 0.0);

    let (status, _) = put(&app, &uri, &token, json!({ "quantity": -1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = delete(&app, &uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, &uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_sorts_and_paginates() {
    let app = app();
    let (_, token) = register(&app, "list@example.com", "patient").await;
    let meals = [
        ("Poha", "breakfast", 250, "2024-05-01T08:00:00Z"),
        ("Rajma rice", "lunch", 600, "2024-05-01T13:00:00Z"),
        ("Khichdi", "dinner", 400, "2024-05-02T20:00:00Z"),
        ("Fruit bowl", "snack", 150, "2024-05-03T16:00:00Z"),
    ];
    for (name, meal_type, calories, date) in meals {
        create_meal(
            &app,
            &token,
            json!({
                "food_name": name,
                "quantity": 1,
                "meal_type": meal_type,
                "meal_date": date,
                "nutrition": { "calories": calories },
            }),
        )
        .await;
    }

    let (status, body) = get(&app, "/api/meals?sort=-calories&limit=3", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["food_name"], "Rajma rice");
    assert_eq!(body["pagination"]["total_meals"], 4);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["pagination"]["has_next"], true);

    let (_, body) = get(&app, "/api/meals?sort=-calories&limit=3&page=2", &token).await;
    assert_eq!(body["data"][0]["food_name"], "Fruit bowl");
    assert_eq!(body["pagination"]["has_prev"], true);

    let (_, body) = get(&app, "/api/meals?meal_type=dinner", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["food_name"], "Khichdi");

    let (_, body) = get(&app, "/api/meals?search=RICE", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = get(
        &app,
        "/api/meals?start_date=2024-05-01&end_date=2024-05-01&sort=meal_date",
        &token,
    )
    .await;
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["food_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Poha", "Rajma rice"]);

    let (status, _) = get(&app, "/api/meals?sort=-name", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recent_returns_latest_three() {
    let app = app();
    let (_, token) = register(&app, "recent@example.com", "patient").await;
    for name in ["a", "b", "c", "d"] {
        create_meal(
            &app,
            &token,
            json!({ "food_name": name, "quantity": 1, "nutrition": { "calories": 10 } }),
        )
        .await;
        // keep created_at strictly increasing
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    let (status, body) = get(&app, "/api/meals/recent", &token).await;
    assert_eq!(status, StatusCode::OK);
    let recent = body["data"].as_array().unwrap();
    let names: Vec<_> = recent.iter().map(|m| m["food_name"].as_str().unwrap()).collect();
    assert_eq!(names, ["d", "c", "b"]);
    assert_eq!(recent[0]["calories"], 10.0);
    assert!(recent[0].get("image_url").is_some());
}

#[tokio::test]
async fn nutrition_summary_totals_the_period() {
    let app = app();
    let (_, token) = register(&app, "sum@example.com", "patient").await;
    for (date, calories, protein) in [
        ("2024-04-30T12:00:00Z", 999, 99),
        ("2024-05-01T12:00:00Z", 300, 10),
        ("2024-05-02T12:00:00Z", 500, 20),
    ] {
        create_meal(
            &app,
            &token,
            json!({
                "food_name": "Thali",
                "quantity": 1,
                "meal_date": date,
                "nutrition": { "calories": calories, "protein": protein },
            }),
        )
        .await;
    }

    let (status, body) = get(
        &app,
        "/api/meals/nutrition-summary?start_date=2024-05-01&end_date=2024-05-02",
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_calories"], 800.0);
    assert_eq!(body["data"]["total_protein"], 30.0);
    assert_eq!(body["data"]["meal_count"], 2);
    assert_eq!(body["period"]["start_date"], "2024-05-01T00:00:00Z");

    let (status, body) = get(&app, "/api/meals/nutrition-summary", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meal_count"], 0);

    let (status, _) = get(
        &app,
        "/api/meals/nutrition-summary?start_date=2024-05-03&end_date=2024-05-01",
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn far_pages_are_empty_not_errors() {
    let app = app();
    let (_, token) = register(&app, "far@example.com", "patient").await;
    create_meal(&app, &token, json!({ "food_name": "Dal", "quantity": 1 })).await;

    let (status, body) = get(
        &app,
        "/api/meals?page=9223372036854775807&limit=100",
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total_meals"], 1);
}

#[tokio::test]
async fn bad_query_and_path_params_use_the_error_envelope() {
    let app = app();
    let (_, token) = register(&app, "params@example.com", "patient").await;

    let (status, body) = get(&app, "/api/meals?page=abc", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, body) = get(&app, "/api/meals/not-a-uuid", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, body) = delete(&app, "/api/meals/not-a-uuid", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
