mod common;

use axum::http::{Method, StatusCode};
use common::{create_bill, dinner_draft, pay, send, test_app};
use serde_json::json;

#[tokio::test]
async fn health_reports_the_store_backend() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");

    let (status, _) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;
    send(&app, Method::GET, &format!("/bills/{}", share_code), None).await;

    let (status, body) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("bill_bills_created_total"));
}

#[tokio::test]
async fn created_bill_is_reindexed_and_carries_a_share_code() {
    let app = test_app();
    let mut draft = dinner_draft();
    draft["line_items"]
        .as_array_mut()
        .unwrap()
        .insert(0, json!({ "description": "Water", "amount": "1", "total_price": "2", "is_deleted": true }));
    draft["service_fee_input"] = json!("€ 1,50");

    let (status, body) = send(&app, Method::POST, "/bills", Some(draft)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["share_code"].as_str().unwrap().len(), 16);
    assert_eq!(body["date"], "2024-06-01");
    assert_eq!(body["number_of_payments"], 0);

    let items = body["line_items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["index"], 0);
    assert_eq!(items[0]["description"], "Coffee");
    assert_eq!(items[0]["unit_price"], "2.5");
    assert_eq!(items[2]["description"], "Service fee");
    assert_eq!(items[2]["unit_price"], "1.5");
}

#[tokio::test]
async fn invalid_drafts_are_rejected() {
    let app = test_app();

    let mut empty = dinner_draft();
    empty["line_items"] = json!([]);
    let (status, _) = send(&app, Method::POST, "/bills", Some(empty)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut zero_quantity = dinner_draft();
    zero_quantity["line_items"][0]["amount"] = json!("0");
    let (status, body) = send(&app, Method::POST, "/bills", Some(zero_quantity)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("positive quantity"));
}

#[tokio::test]
async fn unknown_bill_is_not_found() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/bills/doesnotexist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("doesnotexist"));
}

#[tokio::test]
async fn fresh_bill_view_has_everything_unclaimed() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;

    let (status, body) = send(&app, Method::GET, &format!("/bills/{}", share_code), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bill"]["name"], "Team lunch");

    let selection = &body["selection"];
    assert_eq!(selection["totals"]["total"], "15.5");
    assert_eq!(selection["totals"]["paid"], "0");
    assert_eq!(selection["totals"]["remaining"], "15.5");
    assert_eq!(selection["items"][0]["mode"], "undecided");
    assert_eq!(selection["items"][0]["remaining_amount"], "3");
    assert!(selection["submission"].as_array().unwrap().is_empty());
    assert!(body["payments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn selection_replay_returns_items_totals_and_submission() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/bills/{}/selection", share_code),
        Some(json!({
            "actions": [
                { "type": "amount_change", "line_item": 0, "step": "increment" },
                { "type": "split", "line_item": 1 },
                { "type": "split_change", "line_item": 1, "step": "increment" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["mode"], "itemize");
    assert_eq!(items[0]["current_amount"], "1");
    assert_eq!(items[1]["mode"], "splitting");
    assert_eq!(items[1]["splitting_denominator"], 3);
    assert_eq!(items[1]["remaining_display"], "1 1/3");

    // 1 coffee at 2.50 plus a third of 2 cakes at 4.00.
    let share = body["totals"]["current_share"].as_str().unwrap();
    assert!(share.starts_with("5.16666"), "unexpected share {}", share);
    assert_eq!(body["submission"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn selection_on_unknown_item_is_a_bad_request() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/bills/{}/selection", share_code),
        Some(json!({ "actions": [{ "type": "split", "line_item": 42 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payments_show_up_in_the_bill_and_receipt() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;

    let (status, body) = pay(
        &app,
        &share_code,
        "ana",
        json!([{ "line_item_ref": 0, "amount": "2" }, { "line_item_ref": 1, "amount": "1" }]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["paid_amount"], "9");
    assert_eq!(body["currency"], "EUR");
    let payment_id = body["payment_id"].as_str().unwrap().to_string();

    let (_, view) = send(&app, Method::GET, &format!("/bills/{}", share_code), None).await;
    assert_eq!(view["bill"]["number_of_payments"], 1);
    assert_eq!(view["selection"]["totals"]["paid"], "9");
    assert_eq!(view["selection"]["totals"]["remaining"], "6.5");
    assert_eq!(view["payments"][0]["creator"], "ana");
    assert_eq!(view["selection"]["items"][0]["prior_amount"], "2");
    assert_eq!(view["selection"]["items"][0]["payment_items"][0]["creator"], "ana");

    let (status, receipt) = send(
        &app,
        Method::GET,
        &format!("/bills/{}/payments/{}", share_code, payment_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["paid_amount"], "9");
    assert_eq!(receipt["payment_method"]["kind"], "link");
    assert_eq!(receipt["payment_method"]["value"], "https://pay.example/ana");
    assert_eq!(receipt["line_items"][1]["description"], "Cake");
}

#[tokio::test]
async fn fully_claimed_items_sort_last() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;
    pay(&app, &share_code, "ana", json!([{ "line_item_ref": 0, "amount": "3" }])).await;

    let (_, view) = send(&app, Method::GET, &format!("/bills/{}", share_code), None).await;
    let items = view["selection"]["items"].as_array().unwrap();
    assert_eq!(items[0]["line_item"], 1);
    assert_eq!(items[1]["line_item"], 0);
    assert_eq!(items[1]["fully_claimed"], true);
}

#[tokio::test]
async fn stale_over_claim_is_a_conflict() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;

    let (status, _) = pay(&app, &share_code, "ana", json!([{ "line_item_ref": 1, "amount": "2" }])).await;
    assert_eq!(status, StatusCode::CREATED);

    // Ben still had the old view open and claims a cake that is already paid for.
    let (status, body) = pay(&app, &share_code, "ben", json!([{ "line_item_ref": 1, "amount": "1" }])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("over-claimed"));
}

#[tokio::test]
async fn malformed_payments_are_rejected() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;

    let (status, _) = pay(&app, &share_code, "ana", json!([])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = pay(&app, &share_code, "ana", json!([{ "line_item_ref": 9, "amount": "1" }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = pay(&app, &share_code, "ana", json!([{ "line_item_ref": 0, "amount": "-1" }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = pay(&app, &share_code, "   ", json!([{ "line_item_ref": 0, "amount": "1" }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = pay(&app, "missing", "ana", json!([{ "line_item_ref": 0, "amount": "1" }])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn removing_a_payment_frees_its_items() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;
    let (_, body) = pay(&app, &share_code, "ana", json!([{ "line_item_ref": 1, "amount": "2" }])).await;
    let payment_id = body["payment_id"].as_str().unwrap().to_string();
    let payment_uri = format!("/bills/{}/payments/{}", share_code, payment_id);

    let (status, body) = send(&app, Method::DELETE, &payment_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (_, view) = send(&app, Method::GET, &format!("/bills/{}", share_code), None).await;
    assert_eq!(view["bill"]["number_of_payments"], 0);
    assert_eq!(view["selection"]["totals"]["paid"], "0");

    let (status, _) = send(&app, Method::DELETE, &payment_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &payment_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    let app = test_app();
    let response = app
        .oneshot(
            HttpRequest::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn oversized_draft_amounts_are_rejected() {
    let app = test_app();

    let mut raw = dinner_draft();
    raw["line_items"][1]["total_price"] = json!("50000000000000000000000000000");
    let (status, _) = send(&app, Method::POST, "/bills", Some(raw)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Typed edits skip request validation and are bounded when the bill is built.
    let mut typed = dinner_draft();
    typed["line_items"][0]["amount_input"] = json!("0.0001");
    typed["line_items"][0]["total_price_input"] = json!("50000000000000000000000000000");
    let (status, body) = send(&app, Method::POST, "/bills", Some(typed)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("price"));

    let mut fee = dinner_draft();
    fee["service_fee_input"] = json!("99999999999999");
    let (status, _) = send(&app, Method::POST, "/bills", Some(fee)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_payment_amounts_are_rejected() {
    let app = test_app();
    let share_code = create_bill(&app, dinner_draft()).await;

    let (status, _) = pay(
        &app,
        &share_code,
        "ana",
        json!([{ "line_item_ref": 1, "amount": "79228162514264337593543950335" }]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = pay(
        &app,
        &share_code,
        "ana",
        json!([
            { "line_item_ref": 1, "amount": "1000000" },
            { "line_item_ref": 1, "amount": "1000000" }
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("over-claimed"));

    // The store is still usable afterwards.
    let (status, view) = send(&app, Method::GET, &format!("/bills/{}", share_code), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["bill"]["number_of_payments"], 0);
    assert_eq!(view["selection"]["totals"]["total"], "15.5");
}
