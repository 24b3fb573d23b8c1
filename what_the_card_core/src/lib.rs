//! # What The Card 核心逻辑库
//!
//! 这个 `core` crate 包含了派对卡牌游戏的全部状态管理、
//! 游戏规则以及客户端-服务器通信消息的定义。
//! 它不关心网络和并发，只提供同步的、单写者的数据结构，
//! 由服务器的房间任务驱动，也可以被客户端复用来编解码消息。

mod card;
mod error;
mod logic;
mod message;
mod state;

pub use card::*;

pub use error::*;

pub use message::*;

pub use state::*;
