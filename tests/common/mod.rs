#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use restaurant_pos::{
    build_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    services::checkout::SaleStore,
    AppState,
};

pub const TEST_SECRET: &str = "a6f1c0e9b7d24f3a8e5c1b0d9f7e6a5c4b3";

/// Router over a fresh in-memory SQLite database, with a signed session
/// token for one till user.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub user_id: Uuid,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Same as [`TestApp::new`] but sales are written through `store`
    pub async fn with_sale_store(store: Arc<dyn SaleStore>) -> Self {
        Self::build(Some(store)).await
    }

    async fn build(store: Option<Arc<dyn SaleStore>>) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // in-memory SQLite is per connection
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.business_name = "BAHAY BIRIA".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_sender = Arc::new(event_sender);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = match store {
            Some(store) => {
                AppServices::with_sale_store(db_arc.clone(), event_sender.clone(), &cfg, store)
            }
            None => AppServices::new(db_arc.clone(), event_sender.clone(), &cfg),
        };
        let state = AppState::with_services(db_arc, cfg, event_sender, services);

        let user_id = Uuid::new_v4();
        let token = state
            .auth
            .issue_token(user_id)
            .expect("sign session token");
        let router = build_router(state.clone()).expect("router");

        Self {
            router,
            state,
            user_id,
            token,
            _event_task: event_task,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request_authenticated(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request_authenticated(Method::POST, uri, Some(body)).await
    }

    pub async fn seed_payment_method(&self, name: &str) -> Uuid {
        let response = self
            .post("/api/v1/payment-methods", json!({ "name": name }))
            .await;
        id_of(&data(response).await)
    }

    pub async fn seed_menu_item(&self, name: &str, price: Decimal) -> Uuid {
        let response = self
            .post("/api/v1/menu-items", json!({ "name": name, "price": price }))
            .await;
        id_of(&data(response).await)
    }

    pub async fn open_cart(&self) -> Uuid {
        let response = self
            .request_authenticated(Method::POST, "/api/v1/carts", None)
            .await;
        id_of(&data(response).await)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

/// The `data` field of the standard envelope
pub async fn data(response: Response) -> Value {
    json_body(response).await["data"].clone()
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("id field")
}

/// Decimals serialize as strings; compare numerically
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
