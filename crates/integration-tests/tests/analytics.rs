//! Admin analytics over the funnel's records.

use reqwest::StatusCode;
use serde_json::{Value, json};

use scanlane_integration_tests::TestContext;

#[tokio::test]
async fn test_analytics_require_owner_token() {
    let ctx = TestContext::new().await;

    let resp = ctx.analytics("not-a-token", ctx.store_id, "customers").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx
        .visitor()
        .get(ctx.url(&format!(
            "/api/v1/admin/stores/{}/analytics/customers",
            ctx.store_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Someone else's store looks like no store at all.
    let resp = ctx
        .analytics(&ctx.other_admin_token, ctx.store_id, "reviews")
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = ctx
        .analytics(&ctx.other_admin_token, ctx.other_store_id, "reviews")
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_analytics_reflect_the_funnel() {
    let ctx = TestContext::new().await;

    // One anonymous browse, one pending registration.
    ctx.visitor().get(ctx.catalog_url()).send().await.unwrap();
    ctx.register(&ctx.visitor(), "Cy", "c@x.com").await;

    let (client, ada) = ctx.verified_customer("Ada", "a@x.com").await;
    client.get(ctx.catalog_url()).send().await.unwrap();
    client
        .get(ctx.customer_url(&format!(
            "/stores/{}/catalog/{}?customer_id={ada}",
            ctx.store_id, ctx.item_ids[0]
        )))
        .send()
        .await
        .unwrap();
    client
        .post(ctx.customer_url(&format!("/customers/{ada}/purchases")))
        .json(&json!({ "catalog_item_id": ctx.item_ids[0] }))
        .send()
        .await
        .unwrap();
    for rating in [5, 4] {
        let resp = client
            .post(ctx.customer_url(&format!("/customers/{ada}/reviews")))
            .json(&json!({ "catalog_item_id": ctx.item_ids[0], "overall_rating": rating }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let customers: Value = ctx
        .analytics(&ctx.admin_token, ctx.store_id, "customers")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(customers["total_customers"], 2);
    assert_eq!(customers["verified_customers"], 1);
    let ada_row = customers["customers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == ada)
        .unwrap()
        .clone();
    assert_eq!(ada_row["verified"], true);
    assert_eq!(ada_row["purchases_count"], 1);
    assert_eq!(ada_row["reviews_count"], 2);
    // browse + view + purchase + two review submissions
    assert_eq!(ada_row["interactions_count"], 5);

    let interactions: Value = ctx
        .analytics(&ctx.admin_token, ctx.store_id, "interactions")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(interactions["total_interactions"], 6);
    let recent = interactions["recent_interactions"].as_array().unwrap();
    assert_eq!(recent[0]["interaction_type"], "review_submit");
    assert_eq!(recent[0]["customer_name"], "Ada");
    assert!(recent.last().unwrap()["customer_name"].is_null());
    let purchase = recent
        .iter()
        .find(|i| i["metadata"]["action"] == "purchase")
        .unwrap();
    assert_eq!(purchase["interaction_type"], "catalog_browse");
    assert_eq!(purchase["metadata"]["quantity"], 1);

    let reviews: Value = ctx
        .analytics(&ctx.admin_token, ctx.store_id, "reviews")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(reviews["total_reviews"], 2);
    assert!((reviews["average_rating"].as_f64().unwrap() - 4.5).abs() < f64::EPSILON);
    assert_eq!(reviews["recent_reviews"][0]["overall_rating"], 4);
    assert_eq!(reviews["recent_reviews"][0]["catalog_item"], "Item 0");

    // Reading changes nothing.
    let again: Value = ctx
        .analytics(&ctx.admin_token, ctx.store_id, "reviews")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(again, reviews);
}
