use crate::error::CommandError;
use crate::state::PlayerId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- 客户端 -> 服务器 的消息 ---
// 线上格式统一为 { "name": "<指令名>", "payload": <随指令变化的 JSON> }

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "name", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 修改每位玩家需要提交的卡片数 (仅房主)
    SetCardsPerPlayer(SetCardsPerPlayerPayload),
    /// 以指定 id 加入一名玩家
    AddPlayer(AddPlayerPayload),
    /// 移除一名玩家
    RemovePlayer(RemovePlayerPayload),
    /// 进入提交阶段 (仅房主)
    Start,
    /// 从抽牌堆抽一张牌
    DrawCard,
    /// 提交一张卡片
    AddCard(AddCardPayload),
    /// 重置牌堆 (仅房主)
    Reset(ResetPayload),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SetCardsPerPlayerPayload {
    // 超出范围的值由游戏逻辑忽略，这里不做限制
    pub cards_per_player: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddPlayerPayload {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemovePlayerPayload {
    pub id: PlayerId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddCardPayload {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResetPayload {
    pub mode: ResetMode,
}

/// 重置方式，线上用数字表示
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResetMode {
    /// 0: 清空两个牌堆，回到等待阶段，提交计数归零
    Hard,
    /// 1: 弃牌堆并回抽牌堆后重新洗牌，阶段和提交计数不变
    Reshuffle,
}

impl From<ResetMode> for u8 {
    fn from(mode: ResetMode) -> u8 {
        match mode {
            ResetMode::Hard => 0,
            ResetMode::Reshuffle => 1,
        }
    }
}

impl TryFrom<u8> for ResetMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResetMode::Hard),
            1 => Ok(ResetMode::Reshuffle),
            other => Err(format!("unknown reset mode {other}")),
        }
    }
}

/// 未解码的原始消息，payload 的结构取决于 name
#[derive(Deserialize, Debug)]
struct Envelope {
    name: String,
    #[serde(default)]
    payload: Value,
}

impl ClientMessage {
    /// 把一帧 JSON 文本解码为具体指令
    ///
    /// 未知的指令名在这里就被拒绝，不会进入游戏逻辑。
    pub fn decode(text: &str) -> Result<Self, CommandError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let message = match envelope.name.as_str() {
            "set_cards_per_player" => {
                ClientMessage::SetCardsPerPlayer(payload("set_cards_per_player", envelope.payload)?)
            }
            "add_player" => ClientMessage::AddPlayer(payload("add_player", envelope.payload)?),
            "remove_player" => {
                ClientMessage::RemovePlayer(payload("remove_player", envelope.payload)?)
            }
            "start" => ClientMessage::Start,
            "draw_card" => ClientMessage::DrawCard,
            "add_card" => ClientMessage::AddCard(payload("add_card", envelope.payload)?),
            "reset" => ClientMessage::Reset(payload("reset", envelope.payload)?),
            _ => return Err(CommandError::InvalidCommand(envelope.name)),
        };
        Ok(message)
    }

    pub fn encode(&self) -> Result<String, CommandError> {
        Ok(serde_json::to_string(self)?)
    }

    /// 线上使用的指令名
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::SetCardsPerPlayer(_) => "set_cards_per_player",
            ClientMessage::AddPlayer(_) => "add_player",
            ClientMessage::RemovePlayer(_) => "remove_player",
            ClientMessage::Start => "start",
            ClientMessage::DrawCard => "draw_card",
            ClientMessage::AddCard(_) => "add_card",
            ClientMessage::Reset(_) => "reset",
        }
    }

    /// 只有房主才能执行的指令
    pub fn is_host_only(&self) -> bool {
        matches!(
            self,
            ClientMessage::SetCardsPerPlayer(_) | ClientMessage::Start | ClientMessage::Reset(_)
        )
    }
}

fn payload<T: DeserializeOwned>(command: &'static str, value: Value) -> Result<T, CommandError> {
    serde_json::from_value(value).map_err(|e| CommandError::InvalidPayload {
        command,
        reason: e.to_string(),
    })
}

/// 一条已解码的指令，连同发出它的玩家
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub player_id: PlayerId,
    pub message: ClientMessage,
}

impl Command {
    pub fn new(player_id: PlayerId, message: ClientMessage) -> Self {
        Command { player_id, message }
    }
}

impl From<AddCardPayload> for ClientMessage {
    fn from(payload: AddCardPayload) -> Self {
        ClientMessage::AddCard(payload)
    }
}
