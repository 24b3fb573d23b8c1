use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{
        ws::rejection::WebSocketUpgradeRejection,
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use what_the_card_core::Game;

use crate::connection::{self, Keepalive};
use crate::hub::Hub;

/// 路由共享的状态
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub keepalive: Keepalive,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, keepalive: Keepalive) -> Self {
        AppState { hub, keepalive }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomCreated {
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    player_name: Option<String>,
}

/// 创建路由：房间接口、WebSocket 入口，其余路径交给单页应用的静态文件
pub fn router(state: AppState, static_dir: &FsPath) -> Router {
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/room", post(create_room))
        .route("/ws/room/{id}", get(websocket_handler))
        .fallback_service(spa)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_room(State(state): State<AppState>) -> Json<RoomCreated> {
    let room = state.hub.create_room(Game::new());
    Json(RoomCreated { room_id: room.id().clone() })
}

/// 处理 WebSocket 连接请求
///
/// 先校验房间号和昵称，再占用房间位置，最后才升级连接。
async fn websocket_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<JoinQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if room_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "room id is required");
    }
    let Some(player_name) = query.player_name.filter(|name| !name.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "player_name is required");
    };

    let Some(room) = state.hub.admit(&room_id) else {
        warn!("房间不存在: {}", room_id);
        return error_response(StatusCode::NOT_FOUND, "room not found");
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            state.hub.release(&room);
            return rejection.into_response();
        }
    };

    info!("玩家 {} 正在连接房间 {}", player_name, room_id);
    let hub = state.hub.clone();
    let keepalive = state.keepalive;
    let failed_hub = state.hub.clone();
    let failed_room = room.clone();
    ws.on_failed_upgrade(move |e| {
        warn!("房间 {} 的连接升级失败: {}", failed_room.id(), e);
        failed_hub.release(&failed_room);
    })
    .on_upgrade(move |socket| async move {
        connection::serve(socket, &room, player_name, keepalive).await;
        hub.release(&room);
    })
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
