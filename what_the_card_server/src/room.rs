use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use what_the_card_core::{ClientMessage, Command, Game, PlayerId, RoomId, StateView};

/// 房间事件队列的容量
const ROOM_QUEUE_SIZE: usize = 64;

/// 发往某个连接写泵的通道
pub type Outbound = mpsc::Sender<StateView>;

/// 房间任务处理的事件，按到达顺序逐个执行
enum RoomEvent {
    Join {
        name: String,
        outbound: Outbound,
        reply: oneshot::Sender<PlayerId>,
    },
    // 连接读到的一帧原始文本
    Inbound {
        player_id: PlayerId,
        text: String,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        player_id: PlayerId,
        reply: oneshot::Sender<StateView>,
    },
}

/// 单个房间的状态
///
/// 整个值被移动进房间任务里，只有这个任务能修改游戏状态，
/// 所以 `Game` 不需要任何锁。
pub struct Room {
    id: RoomId,
    game: Game,
    // 将 PlayerId 映射到对应连接的发送端
    connections: HashMap<PlayerId, Outbound>,
    // 连接 id 和玩家 id 共用这一个分配器
    last_id: PlayerId,
}

impl Room {
    pub fn new(game: Game) -> Self {
        Room {
            id: game.room_id.clone(),
            game,
            connections: HashMap::new(),
            last_id: 0,
        }
    }

    /// 启动房间任务，返回可以随意克隆的句柄
    ///
    /// 当所有句柄都被丢弃后任务自行结束，游戏状态随之释放。
    pub fn spawn(self) -> RoomHandle {
        let (tx, rx) = mpsc::channel(ROOM_QUEUE_SIZE);
        let handle = RoomHandle {
            id: self.id.clone(),
            events: tx,
            occupants: Arc::new(AtomicUsize::new(0)),
        };
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut events: mpsc::Receiver<RoomEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::Join { name, outbound, reply } => {
                    let player_id = self.join(name, outbound);
                    let _ = reply.send(player_id);
                    self.broadcast_state();
                }
                RoomEvent::Inbound { player_id, text } => {
                    if self.apply(player_id, &text) {
                        self.broadcast_state();
                    }
                }
                RoomEvent::Leave { player_id, reply } => {
                    let removed = self.leave(player_id);
                    let _ = reply.send(self.connections.len());
                    if removed {
                        self.broadcast_state();
                    }
                }
                RoomEvent::Snapshot { player_id, reply } => {
                    let _ = reply.send(self.game.state(player_id));
                }
            }
        }
        info!("房间 {} 的任务已结束", self.id);
    }

    /// 分配新的 id，登记连接，并以同一个 id 把玩家加入游戏
    fn join(&mut self, name: String, outbound: Outbound) -> PlayerId {
        self.last_id += 1;
        let player_id = self.last_id;
        self.connections.insert(player_id, outbound);
        self.game.add_player(player_id, name);
        info!("玩家 {} 加入了房间 {}", player_id, self.id);
        player_id
    }

    /// 注销连接并移除玩家，重复离开时返回 false
    fn leave(&mut self, player_id: PlayerId) -> bool {
        if self.connections.remove(&player_id).is_none() {
            return false;
        }
        self.game.remove_player(player_id);
        info!("玩家 {} 离开了房间 {}", player_id, self.id);
        true
    }

    /// 解码并执行一条消息，成功时返回 true
    ///
    /// 失败只记日志，消息被丢弃，连接不受影响。
    fn apply(&mut self, player_id: PlayerId, text: &str) -> bool {
        let message = match ClientMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("房间 {} 丢弃了玩家 {} 的消息: {}", self.id, player_id, e);
                return false;
            }
        };
        let name = message.name();
        match self.game.exec_command(Command::new(player_id, message)) {
            Ok(()) => {
                debug!("房间 {} 执行了玩家 {} 的指令 {}", self.id, player_id, name);
                true
            }
            Err(e) => {
                warn!("房间 {} 拒绝了玩家 {} 的指令: {}", self.id, player_id, e);
                false
            }
        }
    }

    /// 给每位在线玩家发送各自的状态快照
    ///
    /// 没有对应连接的玩家 (例如通过指令加入的) 直接跳过。
    /// 房间任务从不等待某个连接：队列已满的玩家被移出房间，
    /// 其余玩家会再收到一次状态。
    fn broadcast_state(&mut self) {
        loop {
            let mut slow = Vec::new();
            for player_id in self.game.players.keys() {
                let Some(conn) = self.connections.get(player_id) else {
                    continue;
                };
                match conn.try_send(self.game.state(*player_id)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => slow.push(*player_id),
                    // 写泵已退出，由该玩家自己的连接任务负责离开
                    Err(TrySendError::Closed(_)) => {
                        debug!("玩家 {} 的发送队列已关闭", player_id);
                    }
                }
            }
            if slow.is_empty() {
                return;
            }
            for player_id in slow {
                warn!("玩家 {} 的发送队列已满，断开连接", player_id);
                // 丢弃发送端后写泵会关闭连接
                self.leave(player_id);
            }
        }
    }
}

/// 房间任务的句柄
///
/// `occupants` 由 Hub 在登记表的锁内增减，用来判断房间何时可以删除。
#[derive(Clone)]
pub struct RoomHandle {
    id: RoomId,
    events: mpsc::Sender<RoomEvent>,
    occupants: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// 加入房间，返回分配到的玩家 id；房间任务已结束时返回 None
    pub async fn join(&self, name: String, outbound: Outbound) -> Option<PlayerId> {
        let (reply, rx) = oneshot::channel();
        self.events.send(RoomEvent::Join { name, outbound, reply }).await.ok()?;
        rx.await.ok()
    }

    /// 把一帧原始消息转交给房间任务，房间任务已结束时返回 false
    pub async fn relay(&self, player_id: PlayerId, text: String) -> bool {
        self.events.send(RoomEvent::Inbound { player_id, text }).await.is_ok()
    }

    /// 离开房间，返回房间内剩余的连接数
    pub async fn leave(&self, player_id: PlayerId) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.events.send(RoomEvent::Leave { player_id, reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or_default()
    }

    /// 获取某位玩家视角的当前状态
    pub async fn snapshot(&self, player_id: PlayerId) -> Option<StateView> {
        let (reply, rx) = oneshot::channel();
        self.events.send(RoomEvent::Snapshot { player_id, reply }).await.ok()?;
        rx.await.ok()
    }

    pub(crate) fn occupants(&self) -> usize {
        self.occupants.load(Ordering::SeqCst)
    }

    pub(crate) fn enter(&self) {
        self.occupants.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn exit(&self) -> usize {
        self.occupants
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_or(0, |prev| prev - 1)
    }

    /// 两个句柄是否指向同一个房间任务
    pub(crate) fn same_room(&self, other: &RoomHandle) -> bool {
        Arc::ptr_eq(&self.occupants, &other.occupants)
    }
}
