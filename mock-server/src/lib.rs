use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub valid: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub info: Map<String, Value>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(skip)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateAccount {
    pub email: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub purchases: Vec<String>,
    #[serde(default)]
    pub info: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct UpdateAccount {
    pub info: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct ResetPassword {
    pub password: Option<String>,
}

#[derive(Default)]
pub struct Store {
    pub accounts: HashMap<String, Account>,
    pub offers: Vec<Offer>,
}

pub type Db = Arc<RwLock<Store>>;

/// Catalog every fresh server starts with.
pub fn default_offers() -> Vec<Offer> {
    vec![
        Offer {
            id: "basic".to_string(),
            name: "Basic".to_string(),
        },
        Offer {
            id: "premium".to_string(),
            name: "Premium".to_string(),
        },
    ]
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store {
        accounts: HashMap::new(),
        offers: default_offers(),
    }));
    let api = Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", get(get_account).delete(delete_account))
        .route("/accounts/{id}/update", post(update_account))
        .route("/accounts/{id}/reset-password", post(reset_password))
        .route(
            "/accounts/{id}/subscriptions",
            get(list_account_subscriptions).post(update_account_subscription),
        )
        .route("/subscriptions", get(list_offers))
        .with_state(db);
    Router::new()
        .nest("/v2", api)
        .layer(middleware::from_fn(echo_content_type))
}

/// Response header carrying the `content-type` the request arrived with.
pub const ECHO_CONTENT_TYPE: HeaderName = HeaderName::from_static("x-request-content-type");

/// Reflect the request's content type back so clients can see what the
/// server actually received, including on requests without a body.
async fn echo_content_type(request: Request, next: Next) -> Response {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""));
    let mut response = next.run(request).await;
    response.headers_mut().insert(ECHO_CONTENT_TYPE, content_type);
    response
}

/// Answers every request with a plain-text 503, like a provider node under
/// maintenance behind a proxy.
pub fn unavailable_app() -> Router {
    Router::new().fallback(|| async { (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable") })
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

/// Start `router` on a random local port in a background thread.
pub fn spawn(router: Router) -> std::io::Result<SocketAddr> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::spawn(move || {
        let result = rt.block_on(async {
            let listener = TcpListener::from_std(std_listener)?;
            serve(listener, router).await
        });
        if let Err(err) = result {
            tracing::error!(%addr, error = %err, "mock server stopped");
        }
    });
    Ok(addr)
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": 404, "message": "not found"})),
    )
        .into_response()
}

async fn list_accounts(State(db): State<Db>) -> Json<Vec<Account>> {
    let store = db.read().await;
    Json(store.accounts.values().cloned().collect())
}

async fn create_account(State(db): State<Db>, Json(input): Json<CreateAccount>) -> Response {
    let mut store = db.write().await;
    if store.accounts.values().any(|a| a.email == input.email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"code": 409, "message": "email already registered"})),
        )
            .into_response();
    }
    if let Some(unknown) = input
        .purchases
        .iter()
        .find(|id| !store.offers.iter().any(|offer| &offer.id == *id))
    {
        return (StatusCode::BAD_REQUEST, format!("unknown subscription {unknown}")).into_response();
    }

    let account = Account {
        id: Uuid::new_v4().simple().to_string(),
        email: input.email,
        username: input.username.unwrap_or_default(),
        info: input.info,
        subscriptions: input
            .purchases
            .into_iter()
            .map(|id| Subscription { id, valid: true })
            .collect(),
        password: input.password.unwrap_or_else(generate_password),
    };
    store.accounts.insert(account.id.clone(), account.clone());
    Json(account).into_response()
}

async fn get_account(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let store = db.read().await;
    match store.accounts.get(&id) {
        Some(account) => Json(account.clone()).into_response(),
        None => not_found(),
    }
}

async fn delete_account(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let mut store = db.write().await;
    match store.accounts.remove(&id) {
        Some(_) => Json(json!({})).into_response(),
        None => not_found(),
    }
}

async fn update_account(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateAccount>,
) -> Response {
    let mut store = db.write().await;
    let Some(account) = store.accounts.get_mut(&id) else {
        return not_found();
    };
    account.info.extend(input.info);
    Json(account.clone()).into_response()
}

async fn reset_password(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<ResetPassword>,
) -> Response {
    let mut store = db.write().await;
    let Some(account) = store.accounts.get_mut(&id) else {
        return not_found();
    };
    account.password = input.password.unwrap_or_else(generate_password);
    Json(json!({"password": account.password})).into_response()
}

async fn list_account_subscriptions(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let store = db.read().await;
    match store.accounts.get(&id) {
        Some(account) => Json(account.subscriptions.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_account_subscription(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<Subscription>,
) -> Response {
    let mut store = db.write().await;
    let Store { accounts, offers } = &mut *store;
    let Some(account) = accounts.get_mut(&id) else {
        return not_found();
    };
    if !offers.iter().any(|offer| offer.id == input.id) {
        return (StatusCode::BAD_REQUEST, format!("unknown subscription {}", input.id)).into_response();
    }
    match account.subscriptions.iter_mut().find(|s| s.id == input.id) {
        Some(existing) => existing.valid = input.valid,
        None => account.subscriptions.push(input),
    }
    Json(account.subscriptions.clone()).into_response()
}

async fn list_offers(State(db): State<Db>) -> Json<Vec<Offer>> {
    Json(db.read().await.offers.clone())
}

fn generate_password() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
