//! # What The Card 实时房间服务
//!
//! - `hub`: 进程内的房间登记表
//! - `room`: 每个房间一个任务，是该房间游戏状态的唯一写者
//! - `connection`: 每个 WebSocket 连接的读循环和写泵
//! - `routes`: HTTP / WebSocket 路由

pub mod config;
pub mod connection;
pub mod hub;
pub mod room;
pub mod routes;

pub use config::Config;
pub use connection::Keepalive;
pub use hub::Hub;
pub use room::{Room, RoomHandle};
pub use routes::{router, AppState};
