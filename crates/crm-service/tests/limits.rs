//! Plan limit, feature and minimum-plan tests.

mod common;

use axum::http::StatusCode;
use common::{Attach, TestHarness};
use crm_core::{BillingPlan, Company, Role};
use crm_store::TenantRepository;
use serde_json::{json, Value};

#[tokio::test]
async fn test_company_limit_on_starter() {
    let harness = TestHarness::new();
    let (account, _, auth) = harness.tenant_admin("Acme", BillingPlan::Starter);
    for i in 0..50 {
        harness.seed_company(account.id, &format!("Customer {i}"));
    }

    let response = harness
        .server
        .post("/companies")
        .attach(&auth)
        .json(&json!({ "name": "Customer 51" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "limit_reached");
    assert_eq!(
        body["error"]["details"],
        json!({ "entity": "companies", "limit": 50, "current": 50 })
    );
    let count = TenantRepository::<Company>::new(harness.store.as_ref())
        .count(account.id)
        .unwrap();
    assert_eq!(count, 50);
}

#[tokio::test]
async fn test_limit_counts_live_rows() {
    let harness = TestHarness::new();
    let (_, _, auth) = harness.tenant_admin("Acme", BillingPlan::Trial);

    let mut ids = Vec::new();
    for name in ["One", "Two"] {
        let response = harness
            .server
            .post("/companies")
            .attach(&auth)
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        ids.push(body["id"].as_i64().unwrap());
    }

    harness
        .server
        .post("/companies")
        .attach(&auth)
        .json(&json!({ "name": "Three" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    harness
        .server
        .delete(&format!("/companies/{}", ids[0]))
        .attach(&auth)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    harness
        .server
        .post("/companies")
        .attach(&auth)
        .json(&json!({ "name": "Three" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_contacts_and_tasks_are_unlimited() {
    let harness = TestHarness::new();
    let (_, _, auth) = harness.tenant_admin("Acme", BillingPlan::Trial);

    for i in 0..5 {
        harness
            .server
            .post("/contacts")
            .attach(&auth)
            .json(&json!({ "first_name": format!("Person {i}") }))
            .await
            .assert_status(StatusCode::CREATED);
        harness
            .server
            .post("/tasks")
            .attach(&auth)
            .json(&json!({ "title": format!("Task {i}") }))
            .await
            .assert_status(StatusCode::CREATED);
    }
}

#[tokio::test]
async fn test_user_limit_on_starter() {
    let harness = TestHarness::new();
    let (account, _, auth) = harness.tenant_admin("Acme", BillingPlan::Starter);
    for name in ["ann", "ben", "cat"] {
        harness.seed_user(account.id, name, Role::User);
    }

    let response = harness
        .server
        .post("/users")
        .attach(&auth)
        .json(&json!({
            "email": "dan@acme.test",
            "username": "dan",
            "password": "long enough password",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = harness
        .server
        .post("/users")
        .attach(&auth)
        .json(&json!({
            "email": "eve@acme.test",
            "username": "eve",
            "password": "long enough password",
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "limit_reached");
    assert_eq!(
        body["error"]["details"],
        json!({ "entity": "users", "limit": 5, "current": 5 })
    );
}

#[tokio::test]
async fn test_role_changes_need_admin_module() {
    let harness = TestHarness::new();
    let (account, _, auth) = harness.tenant_admin("Acme", BillingPlan::Starter);
    let ann = harness.seed_user(account.id, "ann", Role::User);
    let path = format!("/users/{}", ann.id);

    for patch in [json!({ "role": "COMPANY_ADMIN" }), json!({ "is_active": false })] {
        let response = harness.server.patch(&path).attach(&auth).json(&patch).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "feature_not_available");
        assert_eq!(body["error"]["details"]["feature"], "admin_module");
        assert_eq!(body["error"]["details"]["current_plan"], "STARTER");
        assert_eq!(body["error"]["details"]["minimum_plan"], "PRO");
    }

    let response = harness
        .server
        .patch(&path)
        .attach(&auth)
        .json(&json!({ "email": "ann.new@acme.test" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["email"], "ann.new@acme.test");
    assert_eq!(body["role"], "USER");
}

#[tokio::test]
async fn test_company_admin_manages_users_on_pro() {
    let harness = TestHarness::new();
    let (account, admin, auth) = harness.tenant_admin("Acme", BillingPlan::Pro);

    let response = harness
        .server
        .post("/users")
        .attach(&auth)
        .json(&json!({
            "email": "bob@acme.test",
            "username": "bob",
            "password": "long enough password",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["role"], "USER");
    assert_eq!(created["account_id"], json!(account.id));
    assert!(created.get("password_hash").is_none());
    let bob_id = created["id"].as_i64().unwrap();

    let response = harness
        .server
        .patch(&format!("/users/{bob_id}"))
        .attach(&auth)
        .json(&json!({ "role": "COMPANY_ADMIN" }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["role"], "COMPANY_ADMIN");

    let response = harness
        .server
        .patch(&format!("/users/{bob_id}"))
        .attach(&auth)
        .json(&json!({ "role": "SUPER_ADMIN" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let users: Vec<Value> = harness.server.get("/users").attach(&auth).await.json();
    assert_eq!(users.len(), 2);

    harness
        .server
        .delete(&format!("/users/{}", admin.id))
        .attach(&auth)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    harness
        .server
        .delete(&format!("/users/{bob_id}"))
        .attach(&auth)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let harness = TestHarness::new();
    let (_, _, auth) = harness.tenant_admin("Acme", BillingPlan::Pro);
    let (_, _, _) = harness.tenant_admin("Other", BillingPlan::Pro);

    let response = harness
        .server
        .post("/users")
        .attach(&auth)
        .json(&json!({
            "email": "fresh@acme.test",
            "username": "other-admin",
            "password": "long enough password",
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_plain_user_cannot_manage_users() {
    let harness = TestHarness::new();
    let (account, _, _) = harness.tenant_admin("Acme", BillingPlan::Enterprise);
    let user = harness.seed_user(account.id, "bob", Role::User);
    let auth = harness.auth(&user);

    harness
        .server
        .get("/users")
        .attach(&auth)
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/users")
        .attach(&auth)
        .json(&json!({
            "email": "carol@acme.test",
            "username": "carol",
            "password": "long enough password",
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "forbidden");
    assert_eq!(body["error"]["details"]["role"], "USER");
}

#[tokio::test]
async fn test_analytics_requires_pro() {
    let harness = TestHarness::new();
    let (_, _, starter) = harness.tenant_admin("Small", BillingPlan::Starter);
    let (pro_account, _, pro) = harness.tenant_admin("Big", BillingPlan::Pro);
    harness.seed_company(pro_account.id, "Customer");

    let response = harness.server.get("/analytics/summary").attach(&starter).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "feature_not_available");
    assert_eq!(body["error"]["details"]["minimum_plan"], "PRO");

    let response = harness.server.get("/analytics/summary").attach(&pro).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["companies"], 1);
    assert_eq!(body["users"], 1);
    assert!(body["win_rate_percent"].is_null());
}

#[tokio::test]
async fn test_search_requires_starter() {
    let harness = TestHarness::new();
    let (_, _, trial) = harness.tenant_admin("Tiny", BillingPlan::Trial);
    let (account, _, starter) = harness.tenant_admin("Small", BillingPlan::Starter);
    harness.seed_company(account.id, "Globex Corporation");
    harness.seed_company(account.id, "Initech");
    harness.seed_contact(account.id, "Hank", "Scorpio");

    harness
        .server
        .get("/search")
        .add_query_param("q", "globex")
        .attach(&trial)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = harness
        .server
        .get("/search")
        .add_query_param("q", "GLOBEX")
        .attach(&starter)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["companies"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["companies"][0]["name"], "Globex Corporation");

    let response = harness
        .server
        .get("/search")
        .add_query_param("q", "hank scor")
        .attach(&starter)
        .await;
    let body: Value = response.json();
    assert_eq!(body["contacts"].as_array().map(Vec::len), Some(1));

    harness
        .server
        .get("/search")
        .attach(&starter)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contact_export_requires_pro() {
    let harness = TestHarness::new();
    let (_, _, starter) = harness.tenant_admin("Small", BillingPlan::Starter);
    let (account, _, pro) = harness.tenant_admin("Big", BillingPlan::Pro);
    harness.seed_contact(account.id, "Ada", "Lovelace");

    let response = harness.server.get("/contacts/export").attach(&starter).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_plan");
    assert_eq!(body["error"]["details"]["current_plan"], "STARTER");
    assert_eq!(body["error"]["details"]["required_plan"], "PRO");

    let response = harness.server.get("/contacts/export").attach(&pro).await;
    response.assert_status_ok();
    let csv = response.text();
    let mut lines = csv.lines();
    assert!(lines.next().is_some_and(|header| header.starts_with("id,first_name")));
    assert!(lines.next().is_some_and(|row| row.contains("Ada,Lovelace")));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn test_pipeline_groups_deals_by_stage() {
    let harness = TestHarness::new();
    let (_, _, auth) = harness.tenant_admin("Acme", BillingPlan::Trial);

    for (title, stage, value) in [
        ("A", "lead", 100),
        ("B", "lead", 250),
        ("C", "won", 1000),
    ] {
        harness
            .server
            .post("/deals")
            .attach(&auth)
            .json(&json!({ "title": title, "stage": stage, "value_cents": value }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = harness.server.get("/deals/pipeline").attach(&auth).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let stages = body["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 6);
    assert_eq!(stages[0]["stage"], "lead");
    assert_eq!(stages[0]["count"], 2);
    assert_eq!(stages[0]["total_value_cents"], 350);
    assert_eq!(stages[4]["stage"], "won");
    assert_eq!(stages[4]["count"], 1);
    assert_eq!(body["open_value_cents"], 350);
}

#[tokio::test]
async fn test_huge_deal_values_saturate_in_views() {
    let harness = TestHarness::new();
    let (_, _, auth) = harness.tenant_admin("Acme", BillingPlan::Pro);

    for (title, stage) in [("A", "lead"), ("B", "lead"), ("C", "won"), ("D", "won")] {
        harness
            .server
            .post("/deals")
            .attach(&auth)
            .json(&json!({ "title": title, "stage": stage, "value_cents": i64::MAX }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = harness.server.get("/deals/pipeline").attach(&auth).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["stages"][0]["total_value_cents"], i64::MAX);
    assert_eq!(body["open_value_cents"], i64::MAX);

    let response = harness.server.get("/analytics/summary").attach(&auth).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["pipeline_value_cents"], i64::MAX);
    assert_eq!(body["won_value_cents"], i64::MAX);
}
