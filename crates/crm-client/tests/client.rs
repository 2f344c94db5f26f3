//! Client tests against a mocked CRM service.

use crm_client::{ClientError, CrmClient};
use crm_core::{
    AccountId, BillingPlan, Company, CompanyId, Feature, NewCompany, ResourceKind,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn company_json(id: i64, account_id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "account_id": account_id,
        "name": name,
        "industry": null,
        "website": null,
        "phone": null,
        "address": null,
        "notes": null,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
    })
}

fn error_json(code: &str, message: &str, details: serde_json::Value) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message, "details": details } })
}

#[tokio::test]
async fn test_login_returns_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "login": "alice", "password": "secret-pass" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-token",
            "token_type": "Bearer",
            "expires_at": "2026-01-02T00:00:00Z",
            "user": {
                "id": 1,
                "account_id": 7,
                "email": "alice@acme.test",
                "username": "alice",
                "role": "COMPANY_ADMIN",
                "is_active": true,
                "created_at": "2026-01-01T00:00:00Z",
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CrmClient::new(server.uri()).unwrap();
    let session = client.login("alice", "secret-pass").await.unwrap();

    assert_eq!(session.token, "jwt-token");
    assert_eq!(session.user.account_id, Some(AccountId::new(7)));
}

#[tokio::test]
async fn test_requests_carry_token_and_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/companies"))
        .and(header("authorization", "Bearer jwt-token"))
        .and(header("x-account-id", "9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([company_json(3, 9, "Globex")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = CrmClient::new(server.uri())
        .unwrap()
        .with_token("jwt-token")
        .for_account(AccountId::new(9));
    let companies: Vec<Company> = client.list().await.unwrap();

    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0].name, "Globex");
}

#[tokio::test]
async fn test_create_and_delete_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/companies"))
        .respond_with(ResponseTemplate::new(201).set_body_json(company_json(4, 7, "Initech")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/companies/4"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = CrmClient::new(server.uri()).unwrap().with_token("t");
    let company: Company = client
        .create(&NewCompany {
            name: "Initech".into(),
            ..NewCompany::default()
        })
        .await
        .unwrap();
    assert_eq!(company.id, CompanyId::new(4));

    client.delete::<Company>(company.id).await.unwrap();
}

#[tokio::test]
async fn test_limit_error_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/companies"))
        .respond_with(ResponseTemplate::new(403).set_body_json(error_json(
            "limit_reached",
            "companies limit reached",
            json!({ "entity": "companies", "limit": 50, "current": 50 }),
        )))
        .mount(&server)
        .await;

    let client = CrmClient::new(server.uri()).unwrap().with_token("t");
    let err = client
        .create::<Company>(&NewCompany {
            name: "One too many".into(),
            ..NewCompany::default()
        })
        .await
        .unwrap_err();

    assert!(err.needs_upgrade());
    assert!(matches!(
        err,
        ClientError::LimitReached {
            entity: ResourceKind::Companies,
            limit: 50,
            current: 50,
        }
    ));
}

#[tokio::test]
async fn test_feature_and_billing_errors_are_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/billing/current"))
        .respond_with(ResponseTemplate::new(402).set_body_json(error_json(
            "plan_locked",
            "plan is locked",
            json!({}),
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/billing/upgrade"))
        .respond_with(ResponseTemplate::new(403).set_body_json(error_json(
            "feature_not_available",
            "feature not available",
            json!({
                "feature": "analytics_dashboard",
                "current_plan": "STARTER",
                "minimum_plan": "PRO",
            }),
        )))
        .mount(&server)
        .await;

    let client = CrmClient::new(server.uri()).unwrap().with_token("t");

    let err = client.billing().await.unwrap_err();
    assert!(matches!(err, ClientError::PaymentRequired { ref code, .. } if code == "plan_locked"));

    let err = client.upgrade(BillingPlan::Pro).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::FeatureNotAvailable {
            feature: Feature::AnalyticsDashboard,
            current_plan: BillingPlan::Starter,
            minimum_plan: Some(BillingPlan::Pro),
        }
    ));
}

#[tokio::test]
async fn test_not_found_and_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/companies/42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(error_json(
            "not_found",
            "company not found",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_json(
            "unauthorized",
            "unauthorized",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;

    let client = CrmClient::new(server.uri()).unwrap();

    let err = client.get::<Company>(CompanyId::new(42)).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(ref message) if message == "company not found"));

    let err = client.me().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
}

#[tokio::test]
async fn test_unknown_error_code_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let client = CrmClient::new(server.uri()).unwrap();
    let err = client.list_users().await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 500, ref code, .. } if code == "unknown"));
}
