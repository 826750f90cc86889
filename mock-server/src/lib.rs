use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

/// One page of results in the shape Open5e returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Value>,
    /// Query parameters the server received, echoed back for assertions.
    pub query: Map<String, Value>,
}

#[derive(Clone, Default)]
pub struct AppState {
    hits: Arc<AtomicUsize>,
}

impl AppState {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

type Params = Query<Vec<(String, String)>>;

pub fn app() -> Router {
    app_with_state(AppState::default())
}

/// Router sharing `state` with the caller, so tests can read the hit counter.
pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/v2/spells/", get(spells))
        .route("/v1/monsters/", get(monsters))
        .route("/v1/magicitems/", get(magic_items))
        .route("/status/{code}/{*rest}", get(fixed_status))
        .route("/slow/{millis}/{*rest}", get(slow))
        .route("/not-json/{*rest}", get(not_json))
        .route("/bytes/{code}/{*rest}", get(raw_bytes))
        .route("/large/{size}/{*rest}", get(large))
        .route("/redirect/{*rest}", get(redirect))
        .route("/hits", get(hits))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn spells(State(state): State<AppState>, Query(params): Params) -> Json<Page> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tracing::info!(?params, "GET /v2/spells/");
    Json(page(spell_fixtures(), &params))
}

async fn monsters(State(state): State<AppState>, Query(params): Params) -> Json<Page> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tracing::info!(?params, "GET /v1/monsters/");
    Json(page(monster_fixtures(), &params))
}

async fn magic_items(State(state): State<AppState>, Query(params): Params) -> Json<Page> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tracing::info!(?params, "GET /v1/magicitems/");
    Json(page(magic_item_fixtures(), &params))
}

async fn fixed_status(
    State(state): State<AppState>,
    Path((code, rest)): Path<(u16, String)>,
) -> Result<Response, StatusCode> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    tracing::info!(code, %rest, "forced status");
    let body = Json(json!({ "detail": status.canonical_reason().unwrap_or("Unknown") }));
    Ok((status, body).into_response())
}

async fn slow(
    State(state): State<AppState>,
    Path((millis, _rest)): Path<(u64, String)>,
) -> Json<Page> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(page(Vec::new(), &[]))
}

async fn not_json(State(state): State<AppState>) -> &'static str {
    state.hits.fetch_add(1, Ordering::SeqCst);
    "<html><body>maintenance</body></html>"
}

/// Status `code` with a body that is not valid UTF-8.
async fn raw_bytes(
    State(state): State<AppState>,
    Path((code, _rest)): Path<(u16, String)>,
) -> Result<Response, StatusCode> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let body: Vec<u8> = b"\xff\xfe not found".to_vec();
    Ok((status, [(header::CONTENT_TYPE, "application/octet-stream")], body).into_response())
}

/// A valid page whose single result carries a `desc` of `size` bytes.
async fn large(
    State(state): State<AppState>,
    Path((size, _rest)): Path<(usize, String)>,
) -> Json<Page> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let item = json!({ "slug": "tome", "name": "Tome", "desc": "a".repeat(size) });
    Json(page(vec![item], &[]))
}

async fn redirect(State(state): State<AppState>, Path(rest): Path<String>) -> Redirect {
    state.hits.fetch_add(1, Ordering::SeqCst);
    Redirect::temporary(&format!("/{rest}"))
}

async fn hits(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "hits": state.hits() }))
}

/// Filter `items` the way the real API does for the handful of lookups the
/// fixtures support: `<field>__icontains` is a case-insensitive substring
/// match, a bare field name is a case-insensitive equality match, and any
/// other parameter is ignored.
fn page(items: Vec<Value>, params: &[(String, String)]) -> Page {
    let results: Vec<Value> = items
        .into_iter()
        .filter(|item| params.iter().all(|(key, value)| matches_param(item, key, value)))
        .collect();
    let query = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    Page {
        count: results.len(),
        next: None,
        previous: None,
        results,
        query,
    }
}

fn matches_param(item: &Value, key: &str, value: &str) -> bool {
    let wanted = value.to_lowercase();
    if let Some(field) = key.strip_suffix("__icontains") {
        return match item.get(field) {
            Some(v) => field_text(v).to_lowercase().contains(&wanted),
            None => true,
        };
    }
    match item.get(key) {
        Some(v) => field_text(v).to_lowercase() == wanted,
        None => true,
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn spell_fixtures() -> Vec<Value> {
    vec![
        json!({
            "key": "srd_fireball", "name": "Fireball", "level": 3,
            "school": "evocation", "concentration": false,
        }),
        json!({
            "key": "srd_shield", "name": "Shield", "level": 1,
            "school": "abjuration", "concentration": false,
        }),
        json!({
            "key": "srd_counterspell", "name": "Counterspell", "level": 3,
            "school": "abjuration", "concentration": false,
        }),
        json!({
            "key": "srd_fly", "name": "Fly", "level": 3,
            "school": "transmutation", "concentration": true,
        }),
    ]
}

fn monster_fixtures() -> Vec<Value> {
    vec![
        json!({
            "slug": "goblin", "name": "Goblin", "cr": "0.25",
            "type": "humanoid", "size": "Small",
        }),
        json!({
            "slug": "troll", "name": "Troll", "cr": "5",
            "type": "giant", "size": "Large",
        }),
        json!({
            "slug": "young-red-dragon", "name": "Young Red Dragon", "cr": "10",
            "type": "dragon", "size": "Large",
        }),
    ]
}

fn magic_item_fixtures() -> Vec<Value> {
    vec![
        json!({
            "slug": "bag-of-holding", "name": "Bag of Holding",
            "rarity": "uncommon", "requires_attunement": false,
        }),
        json!({
            "slug": "cloak-of-displacement", "name": "Cloak of Displacement",
            "rarity": "rare", "requires_attunement": true,
        }),
        json!({
            "slug": "flame-tongue", "name": "Flame Tongue",
            "rarity": "rare", "requires_attunement": true,
        }),
    ]
}
