//! Integration tests for the Shopfront HTTP client

use chrono::NaiveDate;
use serde_json::{Value, json};
use shopfront_core::{MemoryStorage, OrderStatus, SessionStore, Storage};
use shopfront_http::client::ClientError;
use shopfront_http::types::{DateRange, OrderQuery, ProductQuery, ProductSort, SalesInterval};
use shopfront_http::{SessionEvent, ShopClient};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_json() -> Value {
    json!({
        "id": "u-42",
        "email": "admin@shop.test",
        "name": "Shop Admin",
        "role": "admin"
    })
}

fn empty_page() -> Value {
    json!({"items": [], "total": 0, "page": 1, "limit": 20})
}

fn client_for(server: &MockServer, storage: Arc<dyn Storage>) -> ShopClient {
    ShopClient::builder()
        .base_url(server.uri())
        .session(SessionStore::load(storage))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_client_builder() {
    let client = ShopClient::builder()
        .base_url("http://localhost:5000/api")
        .user_agent("shopfront-tests")
        .build();

    assert!(client.is_ok());
    let client = client.unwrap();
    assert_eq!(client.base_url(), "http://localhost:5000/api");
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = ShopClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_login_stores_session_and_round_trips_storage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "admin@shop.test", "password": "hunter2"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "tok-1", "user": user_json()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let client = client_for(&server, Arc::clone(&storage));
    let mut events = client.subscribe();

    let user = client.login("admin@shop.test", "hunter2").await.unwrap();
    assert_eq!(user.id, "u-42");
    assert!(user.role.is_staff());
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedIn {
            user_id: "u-42".into()
        }
    );

    let reloaded = SessionStore::load(storage).snapshot();
    assert_eq!(reloaded.user, Some(user));
    assert_eq!(reloaded.access_token.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn test_auth_endpoints_never_carry_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "tok-2", "user": user_json()})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();
    client
        .session()
        .login(serde_json::from_value(user_json()).unwrap(), "tok-1")
        .unwrap();

    client.login("admin@shop.test", "hunter2").await.unwrap();
    client.logout().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests {
        assert!(request.headers.get("authorization").is_none());
    }
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_bearer_token_attached_to_domain_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer tok-1"))
        .and(query_param("page", "2"))
        .and(query_param("categoryId", "gpus"))
        .and(query_param("sort", "price_desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "p-1",
                "name": "RTX 5090",
                "price": "1999.99",
                "stock": 3,
                "specHighlights": [{"key": "interface", "value": "PCIe 5.0"}]
            }],
            "total": 21,
            "page": 2,
            "limit": 20
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();
    client
        .session()
        .login(serde_json::from_value(user_json()).unwrap(), "tok-1")
        .unwrap();

    let page = client
        .list_products(&ProductQuery {
            page: Some(2),
            category_id: Some("gpus".into()),
            sort: Some(ProductSort::PriceDesc),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].highlight("interface"), Some("PCIe 5.0"));
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_anonymous_requests_have_no_authorization_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c-1", "name": "Graphics cards"}
        ])))
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();
    let categories = client.list_categories().await.unwrap();
    assert_eq!(categories[0].name, "Graphics cards");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_request_shaping_for_writes() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/orders/o-7/status"))
        .and(body_json(json!({"status": "shipped"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "o-7",
            "items": [{"productId": "p-1", "quantity": 2}],
            "status": "shipped",
            "total": "59.90"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/products/p-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("status", "pending"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();

    let order = client
        .update_order_status("o-7", OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
    assert_eq!(order.items[0].quantity, 2);

    client.delete_product("p-1").await.unwrap();

    let orders = client
        .list_orders(&OrderQuery {
            limit: Some(5),
            status: Some(OrderStatus::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(orders.total, 0);
}

#[tokio::test]
async fn test_error_handling() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Product not found"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": ["name should not be empty"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/delivery-services"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    // Non-401 errors never reach the refresh endpoint
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();

    match client.get_product("missing").await {
        Err(ClientError::NotFound(message)) => assert_eq!(message, "Product not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }

    let category = shopfront_http::types::CategoryInput {
        name: String::new(),
        slug: None,
        parent_id: None,
        description: None,
    };
    match client.create_category(&category).await {
        Err(ClientError::BadRequest(message)) => {
            assert_eq!(message, "name should not be empty");
        }
        other => panic!("expected BadRequest, got {other:?}"),
    }

    match client.list_delivery_services().await {
        Err(ClientError::ServerError { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_success_body_is_serialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();
    let result = client.current_user().await;
    assert!(matches!(result, Err(ClientError::Serialization(_))));
}

#[tokio::test]
async fn test_discount_validation_and_analytics_queries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discounts/validate"))
        .and(query_param("code", "SPRING10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "d-1",
            "code": "SPRING10",
            "kind": "percent",
            "value": 10,
            "active": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analytics/sales"))
        .and(query_param("from", "2024-03-01"))
        .and(query_param("to", "2024-03-31"))
        .and(query_param("interval", "week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": "2024-03-04", "revenue": "1520.50", "orderCount": 12}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();

    let discount = client.validate_discount("SPRING10").await.unwrap();
    assert_eq!(discount.code, "SPRING10");
    assert!(discount.active);

    let range = DateRange {
        from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    };
    let series = client
        .sales_series(range, SalesInterval::Week)
        .await
        .unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].order_count, 12);
}

#[tokio::test]
async fn test_ids_are_encoded_as_single_path_segments() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/gpu%2Frtx%3F5090"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gpu/rtx?5090",
            "name": "RTX 5090",
            "price": "1999.99"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/o%201/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "o 1",
            "items": [],
            "status": "cancelled",
            "total": "0"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShopClient::new(server.uri()).unwrap();

    let product = client.get_product("gpu/rtx?5090").await.unwrap();
    assert_eq!(product.id, "gpu/rtx?5090");

    let order = client.cancel_order("o 1").await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_disabled_timeout_lets_slow_responses_finish() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "c-1", "name": "Cases"}]))
                .set_delay(Duration::from_millis(600)),
        )
        .mount(&server)
        .await;

    let bounded = ShopClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    match bounded.list_categories().await {
        Err(ClientError::Request(e)) => assert!(e.is_timeout()),
        other => panic!("expected a timeout, got {other:?}"),
    }

    let unbounded = ShopClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(100))
        .no_timeout()
        .build()
        .unwrap();
    assert_eq!(unbounded.timeout(), None);
    let categories = unbounded.list_categories().await.unwrap();
    assert_eq!(categories[0].name, "Cases");
}
