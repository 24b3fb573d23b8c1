use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CardId = u32;

// --- 核心数据结构定义 ---

/// 玩家提交的一张卡片
///
/// `id` 在入堆 (`Pile::push`) 时由牌堆分配，其余字段创建后不再变化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub text: String,
    pub author: String,
}

impl Card {
    /// 创建一张尚未入堆的卡片 (id 为 0)
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Card {
        Card { id: 0, text: text.into(), author: author.into() }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} {} ({})", self.id, self.text, self.author)
    }
}

/// 牌堆 (Pile)
///
/// 栈式结构：`push` 放到末尾，`pop` 从末尾取出。
/// 牌堆自己维护一个单调递增的 id 计数器，`reset` 时归零。
#[derive(Debug, Clone, Default)]
pub struct Pile {
    cards: Vec<Card>,
    last_id: CardId,
}

impl Pile {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入一张新卡片并为其分配 id，返回入堆后的卡片
    pub fn push(&mut self, mut card: Card) -> Card {
        self.last_id += 1;
        card.id = self.last_id;
        self.cards.push(card.clone());
        card
    }

    /// 放入一张已有 id 的卡片 (从别的牌堆移过来的)，不重新编号
    pub fn put(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// 取出顶部的卡片，空堆时返回 None
    pub fn pop(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// 原地洗牌，每次调用都使用新的随机源
    pub fn shuffle(&mut self) {
        let mut rng = rand::rng();
        self.cards.shuffle(&mut rng);
    }

    /// 清空牌堆并重置 id 计数器
    pub fn reset(&mut self) {
        self.cards.clear();
        self.last_id = 0;
    }

    /// 把 `other` 的全部卡片 (保持 id) 移到本牌堆顶部，然后重置 `other`
    pub fn merge(&mut self, other: &mut Pile) {
        self.cards.append(&mut other.cards);
        other.reset();
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;

    fn pile_of(texts: &[&str]) -> Pile {
        let mut pile = Pile::new();
        for text in texts {
            pile.push(Card::new(*text, "tester"));
        }
        pile
    }

    fn sorted_ids(pile: &Pile) -> Vec<CardId> {
        let mut ids: Vec<_> = pile.cards().iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_push_assigns_increasing_ids() {
        let mut pile = Pile::new();
        let ids: Vec<_> = (0..5)
            .map(|i| pile.push(Card::new(format!("card {i}"), "a")).id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(pile.len(), 5);
    }

    #[test]
    fn test_reset_restarts_counter() {
        let mut pile = pile_of(&["a", "b", "c"]);
        pile.reset();
        assert!(pile.is_empty());
        assert_eq!(pile.push(Card::new("d", "x")).id, 1);
    }

    #[test]
    fn test_pop_is_last_in_first_out() {
        let mut pile = pile_of(&["c1", "c2", "c3"]);
        assert_eq!(pile.pop().unwrap().text, "c3");
        assert_eq!(pile.pop().unwrap().text, "c2");
        assert_eq!(pile.pop().unwrap().text, "c1");
        assert_eq!(pile.pop(), None);
        // 空堆再 pop 也只是 None
        assert_eq!(pile.pop(), None);
    }

    #[test]
    fn test_shuffle_preserves_cards() {
        let mut pile = pile_of(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let before = sorted_ids(&pile);
        for _ in 0..10 {
            pile.shuffle();
            assert_eq!(sorted_ids(&pile), before);
        }
        // 空堆和单张牌也可以洗
        let mut empty = Pile::new();
        empty.shuffle();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_put_keeps_identity() {
        let mut draw = pile_of(&["a", "b"]);
        let mut discard = Pile::new();
        let card = draw.pop().unwrap();
        discard.put(card.clone());
        assert_eq!(discard.cards(), &[card]);
        // put 不影响计数器
        assert_eq!(discard.push(Card::new("z", "x")).id, 1);
    }

    #[test]
    fn test_merge_moves_everything() {
        let mut draw = pile_of(&["a"]);
        let mut discard = Pile::new();
        let mut other = pile_of(&["b", "c"]);
        discard.put(other.pop().unwrap());
        discard.put(other.pop().unwrap());

        draw.merge(&mut discard);
        assert!(discard.is_empty());
        let texts: Vec<_> = draw.cards().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c", "b"]);
        // 合并后继续 push，id 接着本牌堆自己的计数器
        assert_eq!(draw.push(Card::new("d", "x")).id, 2);
    }
}
