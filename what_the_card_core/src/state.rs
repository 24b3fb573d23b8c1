use crate::card::{Card, Pile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type RoomId = String;
pub type PlayerId = u32;

/// 每位玩家默认需要提交的卡片数
pub const DEFAULT_CARDS_PER_PLAYER: u32 = 5;
/// 每位玩家最多可以提交的卡片数
pub const MAX_CARDS_PER_PLAYER: u32 = 20;

/// 一个房间对应的完整游戏状态 (聚合根)
///
/// 本身不做任何同步，只允许房间任务单线程地修改。
#[derive(Debug, Clone)]
pub struct Game {
    // 由 Hub 在创建房间时写入，之后不再变化
    pub room_id: RoomId,
    pub phase: GamePhase,
    // BTreeMap 保证按 id 升序遍历
    pub players: BTreeMap<PlayerId, Player>,
    pub draw_pile: Pile,
    pub discard_pile: Pile,
    pub host_id: Option<PlayerId>,
    pub cards_per_player: u32,
    pub last_draw_player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(rename = "number_of_submitted_cards")]
    pub submitted_cards: u32,  // 本轮提交阶段已提交的卡片数
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Player { id, name: name.into(), submitted_cards: 0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// 等待玩家加入，房主尚未开始
    #[default]
    #[serde(rename = "WAITING_PHASE")]
    Waiting,
    /// 玩家提交卡片
    #[serde(rename = "SUBMIT_PHASE")]
    Submit,
    /// 卡池已洗好，玩家轮流抽牌
    #[serde(rename = "PLAY_PHASE")]
    Play,
}

/// 发给单个玩家的状态快照，也就是服务器 -> 客户端的唯一消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateView {
    pub phase: GamePhase,
    pub draw_pile_left: usize,
    pub discard_cards: Vec<Card>,
    pub cards_per_player: u32,
    pub player_id: PlayerId,  // 接收者自己的 id
    pub host_id: PlayerId,  // 没有房主时为 0
    pub players: Vec<Player>,
    pub last_draw_player_id: PlayerId,  // 还没人抽过牌时为 0
}

impl Default for Game {
    fn default() -> Self {
        Game {
            room_id: RoomId::new(),
            phase: GamePhase::Waiting,
            players: BTreeMap::new(),
            draw_pile: Pile::new(),
            discard_pile: Pile::new(),
            host_id: None,
            cards_per_player: DEFAULT_CARDS_PER_PLAYER,
            last_draw_player_id: None,
        }
    }
}

// --- Game 的只读方法 ---

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_host(&self, player_id: PlayerId) -> bool {
        self.host_id == Some(player_id)
    }

    /// 是否每位当前玩家都已达到提交配额
    ///
    /// 配额可能在两次提交之间被修改，所以每次都重新计算。
    pub fn all_submitted(&self) -> bool {
        self.players.values().all(|p| p.submitted_cards >= self.cards_per_player)
    }

    /// 为指定玩家生成状态快照，每次调用都重新计算
    pub fn state(&self, for_player: PlayerId) -> StateView {
        StateView {
            phase: self.phase,
            draw_pile_left: self.draw_pile.len(),
            discard_cards: self.discard_pile.cards().to_vec(),
            cards_per_player: self.cards_per_player,
            player_id: for_player,
            host_id: self.host_id.unwrap_or_default(),
            players: self.players.values().cloned().collect(),
            last_draw_player_id: self.last_draw_player_id.unwrap_or_default(),
        }
    }
}
