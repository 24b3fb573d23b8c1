use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use tracing::{debug, info};

use what_the_card_core::{Game, RoomId};

use crate::room::{Room, RoomHandle};

/// 房间号长度
pub const ROOM_ID_LENGTH: usize = 4;

/// 进程内全部房间的登记表
///
/// 登记表本身只在创建、进入、离开房间时被访问，房间内部的游戏状态
/// 完全由各自的房间任务管理。DashMap 的分片锁保证了对同一个房间号的
/// 创建和删除互斥。
#[derive(Default)]
pub struct Hub {
    rooms: DashMap<RoomId, RoomHandle>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为给定的游戏创建房间并启动房间任务
    ///
    /// 随机生成的房间号与现有房间冲突时会重新生成。
    pub fn create_room(&self, game: Game) -> RoomHandle {
        self.create_room_with(game, random_room_id)
    }

    fn create_room_with(&self, mut game: Game, mut next_id: impl FnMut() -> RoomId) -> RoomHandle {
        loop {
            let id = next_id();
            match self.rooms.entry(id) {
                Entry::Occupied(entry) => {
                    debug!("房间号 {} 已被占用，重新生成", entry.key());
                }
                Entry::Vacant(entry) => {
                    game.room_id = entry.key().clone();
                    let handle = Room::new(game).spawn();
                    entry.insert(handle.clone());
                    info!("房间 {} 已创建", handle.id());
                    return handle;
                }
            }
        }
    }

    pub fn get_room(&self, id: &str) -> Option<RoomHandle> {
        self.rooms.get(id).map(|r| r.clone())
    }

    /// 查找房间并占一个位置
    ///
    /// 查找和计数在同一个分片读锁内完成，所以不会和 `release` 的删除交错。
    pub fn admit(&self, id: &str) -> Option<RoomHandle> {
        let room = self.rooms.get(id)?;
        room.enter();
        Some(room.clone())
    }

    /// 释放 `admit` 占的位置，房间没人时将其删除，返回是否删除
    pub fn release(&self, room: &RoomHandle) -> bool {
        let remaining = room.exit();
        if remaining > 0 {
            return false;
        }
        // 只删除同一个房间：房间号可能已被删除后重新分配
        let removed = self
            .rooms
            .remove_if(room.id(), |_, current| current.same_room(room) && current.occupants() == 0)
            .is_some();
        if removed {
            info!("房间 {} 已空，已被移除", room.id());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// 生成由小写字母组成的随机房间号
fn random_room_id() -> RoomId {
    let mut rng = rand::rng();
    (0..ROOM_ID_LENGTH)
        .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_room_id_shape() {
        for _ in 0..100 {
            let id = random_room_id();
            assert_eq!(id.len(), ROOM_ID_LENGTH);
            assert!(id.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[tokio::test]
    async fn test_create_room_stamps_id() {
        let hub = Hub::new();
        let room = hub.create_room(Game::new());
        assert_eq!(room.id().len(), ROOM_ID_LENGTH);
        assert!(hub.get_room(room.id()).is_some());
        assert!(hub.get_room("zzzzz").is_none());
        assert_eq!(hub.len(), 1);
    }

    #[tokio::test]
    async fn test_collision_is_retried() {
        let hub = Hub::new();
        let mut ids = ["aaaa", "aaaa", "aaaa", "bbbb"].into_iter().map(String::from);
        let first = hub.create_room_with(Game::new(), || ids.next().unwrap());
        let second = hub.create_room_with(Game::new(), || ids.next().unwrap());
        assert_eq!(first.id(), "aaaa");
        assert_eq!(second.id(), "bbbb");
        assert_eq!(hub.len(), 2);
        assert!(!first.same_room(&second));
    }

    #[tokio::test]
    async fn test_room_removed_after_last_release() {
        let hub = Hub::new();
        let id = hub.create_room(Game::new()).id().clone();

        let a = hub.admit(&id).unwrap();
        let b = hub.admit(&id).unwrap();
        assert!(!hub.release(&a));
        assert!(hub.get_room(&id).is_some());
        assert!(hub.release(&b));
        assert!(hub.get_room(&id).is_none());
        assert!(hub.admit(&id).is_none());
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn test_stale_release_keeps_new_room() {
        let hub = Hub::new();
        let mut ids = ["abcd", "abcd"].into_iter().map(String::from);
        let old = hub.create_room_with(Game::new(), || ids.next().unwrap());
        let seat = hub.admit(old.id()).unwrap();
        assert!(hub.release(&seat));

        // 同一个房间号被新房间复用，旧句柄的释放不能影响它
        let new = hub.create_room_with(Game::new(), || ids.next().unwrap());
        assert!(!hub.release(&old));
        assert!(hub.get_room(new.id()).is_some());
    }

    #[tokio::test]
    async fn test_admitted_room_accepts_players() {
        let hub = Hub::new();
        let room = hub.create_room(Game::new());
        let seat = hub.admit(room.id()).unwrap();
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        let player = seat.join("alice".into(), tx).await.unwrap();
        assert_eq!(player, 1);
        assert!(room.snapshot(player).await.is_some());
    }
}
