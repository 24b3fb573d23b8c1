use crate::state::PlayerId;
use thiserror::Error;

/// 执行一条游戏指令时可能出现的错误
///
/// 这些错误都只影响当前这条指令：房间记录日志后丢弃该消息，连接保持不变。
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid game command: {0}")]
    InvalidCommand(String),

    #[error("cmd: {command} has an invalid payload: {reason}")]
    InvalidPayload { command: &'static str, reason: String },

    #[error("player {player_id} is not a host, cmd: {command} must be executed by host player")]
    NotHost { player_id: PlayerId, command: &'static str },
}
