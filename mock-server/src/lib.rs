//! In-memory fake of the Trello REST endpoints the client exercises.
//!
//! Boards, lists, cards, labels, checklists and webhooks live in one store
//! behind a `RwLock`. Every request must carry the configured `key` and
//! `token` query parameters. Parameters are read from the query string and,
//! for write requests, from a JSON body, the way the service accepts them.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const NOT_FOUND: &str = "The requested resource was not found.";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub closed: bool,
    pub id_organization: Option<String>,
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub name: String,
    pub closed: bool,
    pub id_board: String,
    pub pos: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub closed: bool,
    pub id_list: String,
    pub id_board: String,
    pub id_labels: Vec<String>,
    pub due: Option<String>,
    pub due_complete: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub id_board: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    pub name: String,
    pub id_card: String,
    pub id_board: String,
    pub check_items: Vec<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub description: String,
    #[serde(rename = "callbackURL")]
    pub callback_url: String,
    pub id_model: String,
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct Store {
    boards: HashMap<String, Board>,
    lists: HashMap<String, List>,
    cards: HashMap<String, Card>,
    labels: HashMap<String, Label>,
    checklists: HashMap<String, Checklist>,
    webhooks: HashMap<String, Webhook>,
}

pub type Db = Arc<RwLock<Store>>;

/// Credentials the fake accepts.
#[derive(Clone, Debug)]
pub struct Auth {
    pub key: String,
    pub token: String,
}

#[derive(Clone)]
struct AppState {
    db: Db,
    auth: Arc<Auth>,
}

type ApiResult<T> = Result<T, (StatusCode, &'static str)>;
type Params = HashMap<String, String>;

pub fn app(key: &str, token: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        auth: Arc::new(Auth {
            key: key.to_string(),
            token: token.to_string(),
        }),
    };
    Router::new()
        .route("/1/boards", post(create_board))
        .route("/1/boards/", post(create_board))
        .route("/1/boards/{id}", get(get_board))
        .route("/1/boards/{id}/lists", get(lists_on_board).post(create_list))
        .route("/1/boards/{id}/cards", get(cards_on_board))
        .route("/1/boards/{id}/cards/{card_id}", get(card_on_board))
        .route("/1/boards/{id}/labels", get(labels_on_board))
        .route("/1/lists/{id}/name", put(rename_list))
        .route("/1/lists/{id}/cards", get(cards_on_list))
        .route("/1/cards", post(create_card))
        .route("/1/cards/{id}", get(get_card).delete(delete_card))
        .route("/1/cards/{id}/{field}", put(update_card))
        .route("/1/cards/{id}/idLabels", post(add_label_to_card))
        .route("/1/cards/{id}/idLabels/{label_id}", axum::routing::delete(remove_label_from_card))
        .route("/1/cards/{id}/checklists", get(checklists_on_card).post(create_checklist))
        .route("/1/labels", post(create_label))
        .route("/1/labels/{id}", axum::routing::delete(delete_label))
        .route("/1/tokens/{token}/webhooks/", post(create_webhook))
        .route("/1/webhooks/{id}", axum::routing::delete(delete_webhook))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

pub async fn run(listener: TcpListener, key: &str, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(key, token)).await
}

/// Response header repeating the request's `user-agent`.
pub const ECHO_USER_AGENT: &str = "x-echo-user-agent";

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_agent = req.headers().get(header::USER_AGENT).cloned();
    let mut response = next.run(req).await;
    info!(%method, %path, status = response.status().as_u16(), "handled request");
    if let Some(ua) = user_agent {
        response.headers_mut().insert(ECHO_USER_AGENT, ua);
    }
    response
}

async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let params = Query::<Params>::try_from_uri(req.uri())
        .map(|Query(p)| p)
        .unwrap_or_default();
    if params.get("key") != Some(&state.auth.key) {
        return (StatusCode::UNAUTHORIZED, "invalid key").into_response();
    }
    if params.get("token") != Some(&state.auth.token) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    next.run(req).await
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..24].to_string()
}

/// Query parameters overlaid with the fields of a JSON object body.
fn fields(mut query: Params, body: &str) -> ApiResult<Params> {
    if body.trim().is_empty() {
        return Ok(query);
    }
    let parsed: serde_json::Map<String, Value> =
        serde_json::from_str(body).map_err(|_| (StatusCode::BAD_REQUEST, "invalid json body"))?;
    for (k, v) in parsed {
        let text = match v {
            Value::String(s) => s,
            Value::Null => continue,
            other => other.to_string(),
        };
        query.insert(k, text);
    }
    Ok(query)
}

fn parse_bool(value: &str) -> ApiResult<bool> {
    value
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid value"))
}

// --- boards ---

async fn create_board(
    State(state): State<AppState>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<Board>> {
    let params = fields(query, &body)?;
    let name = params
        .get("name")
        .filter(|n| !n.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for name"))?;
    let id = new_id();
    let board = Board {
        id: id.clone(),
        name: name.clone(),
        desc: params.get("desc").cloned().unwrap_or_default(),
        closed: false,
        id_organization: params.get("idOrganization").cloned(),
        url: format!("https://trello.com/b/{id}"),
    };

    let mut db = state.db.write().await;
    if let Some(source) = params.get("idBoardSource") {
        if !db.boards.contains_key(source) {
            return Err((StatusCode::BAD_REQUEST, "invalid value for idBoardSource"));
        }
        let copies: Vec<List> = db
            .lists
            .values()
            .filter(|l| &l.id_board == source)
            .map(|l| List {
                id: new_id(),
                id_board: id.clone(),
                ..l.clone()
            })
            .collect();
        for list in copies {
            db.lists.insert(list.id.clone(), list);
        }
    }
    db.boards.insert(id, board.clone());
    Ok(Json(board))
}

async fn get_board(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Board>> {
    let db = state.db.read().await;
    db.boards
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, NOT_FOUND))
}

async fn lists_on_board(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
) -> ApiResult<Json<Vec<List>>> {
    let db = state.db.read().await;
    if !db.boards.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND));
    }
    let filter = query.get("filter").map(String::as_str).unwrap_or("open");
    let mut lists: Vec<List> = db
        .lists
        .values()
        .filter(|l| l.id_board == id)
        .filter(|l| match filter {
            "all" => true,
            "closed" => l.closed,
            "none" => false,
            _ => !l.closed,
        })
        .cloned()
        .collect();
    lists.sort_by(|a, b| a.pos.total_cmp(&b.pos));
    Ok(Json(lists))
}

async fn create_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<List>> {
    let params = fields(query, &body)?;
    let name = params
        .get("name")
        .filter(|n| !n.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for name"))?;
    let mut db = state.db.write().await;
    if !db.boards.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND));
    }
    let pos = db.lists.values().filter(|l| l.id_board == id).count() as f64 * 16384.0 + 16384.0;
    let list = List {
        id: new_id(),
        name: name.clone(),
        closed: false,
        id_board: id,
        pos,
    };
    db.lists.insert(list.id.clone(), list.clone());
    Ok(Json(list))
}

async fn cards_on_board(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<Card>>> {
    let db = state.db.read().await;
    if !db.boards.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND));
    }
    Ok(Json(db.cards.values().filter(|c| c.id_board == id).cloned().collect()))
}

async fn card_on_board(
    State(state): State<AppState>,
    Path((id, card_id)): Path<(String, String)>,
) -> ApiResult<Json<Card>> {
    let db = state.db.read().await;
    db.cards
        .get(&card_id)
        .filter(|c| c.id_board == id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, NOT_FOUND))
}

async fn labels_on_board(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<Label>>> {
    let db = state.db.read().await;
    if !db.boards.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND));
    }
    Ok(Json(db.labels.values().filter(|l| l.id_board == id).cloned().collect()))
}

// --- lists ---

async fn rename_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<List>> {
    let params = fields(query, &body)?;
    let value = params
        .get("value")
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for value"))?;
    let mut db = state.db.write().await;
    let list = db.lists.get_mut(&id).ok_or((StatusCode::NOT_FOUND, NOT_FOUND))?;
    list.name = value.clone();
    Ok(Json(list.clone()))
}

async fn cards_on_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
) -> ApiResult<Json<Vec<Card>>> {
    let db = state.db.read().await;
    if !db.lists.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND));
    }
    let limit = match query.get("limit") {
        Some(l) => l.parse().map_err(|_| (StatusCode::BAD_REQUEST, "invalid value for limit"))?,
        None => usize::MAX,
    };
    let cards = db
        .cards
        .values()
        .filter(|c| c.id_list == id && !c.closed)
        .take(limit)
        .cloned()
        .collect();
    Ok(Json(cards))
}

// --- cards ---

async fn create_card(
    State(state): State<AppState>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<Card>> {
    let params = fields(query, &body)?;
    let mut db = state.db.write().await;
    let list = params
        .get("idList")
        .and_then(|id| db.lists.get(id))
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for idList"))?;
    let card = Card {
        id: new_id(),
        name: params.get("name").cloned().unwrap_or_default(),
        desc: params.get("desc").cloned().unwrap_or_default(),
        closed: false,
        id_list: list.id.clone(),
        id_board: list.id_board.clone(),
        id_labels: Vec::new(),
        due: params.get("due").cloned(),
        due_complete: match params.get("dueComplete") {
            Some(v) => parse_bool(v)?,
            None => false,
        },
    };
    db.cards.insert(card.id.clone(), card.clone());
    Ok(Json(card))
}

async fn get_card(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Card>> {
    let db = state.db.read().await;
    db.cards
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, NOT_FOUND))
}

async fn delete_card(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    db.cards
        .remove(&id)
        .map(|_| Json(json!({"limits": {}})))
        .ok_or((StatusCode::NOT_FOUND, NOT_FOUND))
}

async fn update_card(
    State(state): State<AppState>,
    Path((id, field)): Path<(String, String)>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<Card>> {
    let params = fields(query, &body)?;
    let value = params
        .get("value")
        .cloned()
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for value"))?;
    let mut db = state.db.write().await;
    let board_of_list = match field.as_str() {
        "idList" => Some(
            db.lists
                .get(&value)
                .map(|l| l.id_board.clone())
                .ok_or((StatusCode::BAD_REQUEST, "invalid value for value"))?,
        ),
        _ => None,
    };
    let card = db.cards.get_mut(&id).ok_or((StatusCode::NOT_FOUND, NOT_FOUND))?;
    match field.as_str() {
        "name" => card.name = value,
        "desc" => card.desc = value,
        "due" => card.due = Some(value),
        "closed" => card.closed = parse_bool(&value)?,
        "dueComplete" => card.due_complete = parse_bool(&value)?,
        "idList" => {
            card.id_list = value;
            if let Some(board) = board_of_list {
                card.id_board = board;
            }
        }
        _ => return Err((StatusCode::NOT_FOUND, NOT_FOUND)),
    }
    Ok(Json(card.clone()))
}

async fn add_label_to_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<Vec<String>>> {
    let params = fields(query, &body)?;
    let label_id = params
        .get("value")
        .cloned()
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for value"))?;
    let mut db = state.db.write().await;
    if !db.labels.contains_key(&label_id) {
        return Err((StatusCode::BAD_REQUEST, "invalid value for value"));
    }
    let card = db.cards.get_mut(&id).ok_or((StatusCode::NOT_FOUND, NOT_FOUND))?;
    if !card.id_labels.contains(&label_id) {
        card.id_labels.push(label_id);
    }
    Ok(Json(card.id_labels.clone()))
}

async fn remove_label_from_card(
    State(state): State<AppState>,
    Path((id, label_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    let card = db.cards.get_mut(&id).ok_or((StatusCode::NOT_FOUND, NOT_FOUND))?;
    let before = card.id_labels.len();
    card.id_labels.retain(|l| *l != label_id);
    if card.id_labels.len() == before {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND));
    }
    Ok(Json(json!({"_value": null})))
}

async fn checklists_on_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Checklist>>> {
    let db = state.db.read().await;
    if !db.cards.contains_key(&id) {
        return Err((StatusCode::NOT_FOUND, NOT_FOUND));
    }
    Ok(Json(db.checklists.values().filter(|c| c.id_card == id).cloned().collect()))
}

async fn create_checklist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<Checklist>> {
    let params = fields(query, &body)?;
    let mut db = state.db.write().await;
    let id_board = db
        .cards
        .get(&id)
        .map(|c| c.id_board.clone())
        .ok_or((StatusCode::NOT_FOUND, NOT_FOUND))?;
    let (name, check_items) = match params.get("idChecklistSource") {
        Some(source) => {
            let source = db
                .checklists
                .get(source)
                .ok_or((StatusCode::BAD_REQUEST, "invalid value for idChecklistSource"))?;
            (source.name.clone(), source.check_items.clone())
        }
        None => (params.get("name").cloned().unwrap_or_default(), Vec::new()),
    };
    let checklist = Checklist {
        id: new_id(),
        name,
        id_card: id,
        id_board,
        check_items,
    };
    db.checklists.insert(checklist.id.clone(), checklist.clone());
    Ok(Json(checklist))
}

// --- labels ---

async fn create_label(
    State(state): State<AppState>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<Label>> {
    let params = fields(query, &body)?;
    let mut db = state.db.write().await;
    let id_board = params
        .get("idBoard")
        .filter(|b| db.boards.contains_key(*b))
        .cloned()
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for idBoard"))?;
    let label = Label {
        id: new_id(),
        name: params.get("name").cloned().unwrap_or_default(),
        color: params.get("color").cloned(),
        id_board,
    };
    db.labels.insert(label.id.clone(), label.clone());
    Ok(Json(label))
}

async fn delete_label(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    db.labels.remove(&id).ok_or((StatusCode::NOT_FOUND, NOT_FOUND))?;
    for card in db.cards.values_mut() {
        card.id_labels.retain(|l| *l != id);
    }
    Ok(Json(json!({"limits": {}})))
}

// --- webhooks ---

async fn create_webhook(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<Params>,
    body: String,
) -> ApiResult<Json<Webhook>> {
    if token != state.auth.token {
        return Err((StatusCode::UNAUTHORIZED, "invalid token"));
    }
    let params = fields(query, &body)?;
    let callback_url = params
        .get("callbackURL")
        .cloned()
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for callbackURL"))?;
    let id_model = params
        .get("idModel")
        .cloned()
        .ok_or((StatusCode::BAD_REQUEST, "invalid value for idModel"))?;
    let webhook = Webhook {
        id: new_id(),
        description: params.get("description").cloned().unwrap_or_default(),
        callback_url,
        id_model,
        active: true,
    };
    state.db.write().await.webhooks.insert(webhook.id.clone(), webhook.clone());
    Ok(Json(webhook))
}

async fn delete_webhook(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let mut db = state.db.write().await;
    db.webhooks
        .remove(&id)
        .map(|_| Json(json!({"_value": null})))
        .ok_or((StatusCode::NOT_FOUND, NOT_FOUND))
}
