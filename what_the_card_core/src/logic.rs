use crate::card::Card;
use crate::error::CommandError;
use crate::message::{ClientMessage, Command, ResetMode};
use crate::state::*;
use tracing::debug;

// --- 核心游戏流程函数 ---
// 这里的方法都是同步的，调用方 (房间任务) 负责保证同一时刻只有一个写者。

impl Game {
    /// 以给定 id 加入一名玩家
    ///
    /// 房间里的第一位玩家自动成为房主。
    pub fn add_player(&mut self, id: PlayerId, name: impl Into<String>) -> Player {
        let player = Player::new(id, name);
        self.players.insert(id, player.clone());
        debug!("player {} has joined the room {}", id, self.room_id);

        if self.players.len() == 1 {
            self.promote_host(id);
        }
        player
    }

    /// 移除一名玩家，id 不存在时什么都不做
    ///
    /// 如果被移除的是房主，由剩下 id 最小的玩家接任。
    pub fn remove_player(&mut self, id: PlayerId) {
        if self.players.remove(&id).is_none() {
            return;
        }
        debug!("player {} has left the room {}", id, self.room_id);

        if self.is_host(id) {
            match self.players.keys().next().copied() {
                Some(next_host) => self.promote_host(next_host),
                None => self.host_id = None,
            }
        }
    }

    pub fn promote_host(&mut self, player_id: PlayerId) {
        self.host_id = Some(player_id);
        debug!("player {} has been promoted to a host in room {}", player_id, self.room_id);
    }

    /// 修改提交配额，超出 1..=20 时直接忽略
    ///
    /// 已提交的数量不受影响，只影响之后的阶段判断。
    pub fn set_cards_per_player(&mut self, n: i64) {
        match u32::try_from(n) {
            Ok(n) if (1..=MAX_CARDS_PER_PLAYER).contains(&n) => self.cards_per_player = n,
            _ => debug!("room {} ignored cards per player {}", self.room_id, n),
        }
    }

    /// 进入提交阶段
    pub fn start(&mut self) {
        self.phase = GamePhase::Submit;
    }

    /// 玩家提交一张卡片，玩家不存在时返回 None
    ///
    /// 提交阶段中，当所有玩家都达到配额时洗牌并进入游戏阶段。
    pub fn add_card(&mut self, text: impl Into<String>, player_id: PlayerId) -> Option<Card> {
        let player = self.players.get_mut(&player_id)?;
        player.submitted_cards += 1;
        let card = self.draw_pile.push(Card::new(text, player.name.clone()));

        if self.phase == GamePhase::Submit && self.all_submitted() {
            self.draw_pile.shuffle();
            self.phase = GamePhase::Play;
            debug!(
                "room {} entered the play phase with {} cards",
                self.room_id,
                self.draw_pile.len()
            );
        }
        Some(card)
    }

    /// 抽一张牌并放入弃牌堆，抽牌堆为空时返回 None
    pub fn draw_card(&mut self, player_id: PlayerId) -> Option<Card> {
        self.last_draw_player_id = Some(player_id);
        let card = self.draw_pile.pop()?;
        self.discard_pile.put(card.clone());
        Some(card)
    }

    /// 重置牌堆
    ///
    /// - `Hard`: 清空两个牌堆，回到等待阶段，所有玩家的提交数归零
    /// - `Reshuffle`: 弃牌堆并回抽牌堆再洗牌，阶段和提交数不变
    pub fn reset(&mut self, mode: ResetMode) {
        match mode {
            ResetMode::Hard => {
                self.draw_pile.reset();
                self.discard_pile.reset();
                self.phase = GamePhase::Waiting;
                self.players.values_mut().for_each(|p| p.submitted_cards = 0);
            }
            ResetMode::Reshuffle => {
                self.draw_pile.merge(&mut self.discard_pile);
                self.draw_pile.shuffle();
            }
        }
    }

    /// 执行一条指令
    ///
    /// 房主专属指令由非房主发出时返回 `NotHost`，游戏状态不会改变。
    pub fn exec_command(&mut self, cmd: Command) -> Result<(), CommandError> {
        let Command { player_id, message } = cmd;
        if message.is_host_only() && !self.is_host(player_id) {
            return Err(CommandError::NotHost { player_id, command: message.name() });
        }

        match message {
            ClientMessage::SetCardsPerPlayer(p) => self.set_cards_per_player(p.cards_per_player),
            ClientMessage::AddPlayer(p) => {
                self.add_player(p.id, p.name);
            }
            ClientMessage::RemovePlayer(p) => self.remove_player(p.id),
            ClientMessage::Start => self.start(),
            ClientMessage::DrawCard => {
                self.draw_card(player_id);
            }
            ClientMessage::AddCard(p) => {
                self.add_card(p.text, player_id);
            }
            ClientMessage::Reset(p) => self.reset(p.mode),
        }
        Ok(())
    }
}

// --- 单元测试 ---
