use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info, warn};

use what_the_card_core::{PlayerId, StateView};

use crate::room::RoomHandle;

/// 每个连接的待发送队列容量
const OUTBOUND_QUEUE_SIZE: usize = 32;

/// 写一条消息允许的最长时间
pub const WRITE_WAIT: Duration = Duration::from_secs(10);
/// 读超时：这段时间内收不到任何帧 (包括 Pong) 就认为连接已断开
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// 心跳参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub write_wait: Duration,
    pub pong_wait: Duration,
    // 必须小于 pong_wait
    pub ping_period: Duration,
}

impl Keepalive {
    /// 按读超时推导其余参数：Ping 周期为读超时的 9/10
    pub fn new(pong_wait: Duration) -> Self {
        Keepalive {
            write_wait: WRITE_WAIT.min(pong_wait),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
        }
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Keepalive::new(PONG_WAIT)
    }
}

/// 处理单个 WebSocket 连接的生命周期
///
/// 加入房间，启动写泵任务，在当前任务里运行读循环，断开后离开房间。
/// 连接本身不了解任何游戏规则，只负责转发。
pub async fn serve(socket: WebSocket, room: &RoomHandle, name: String, keepalive: Keepalive) {
    let (sink, stream) = socket.split();

    // 房间通过这个通道把状态快照交给写泵
    let (tx, rx) = mpsc::channel::<StateView>(OUTBOUND_QUEUE_SIZE);

    let Some(player_id) = room.join(name, tx).await else {
        warn!("房间 {} 已关闭，无法加入", room.id());
        return;
    };

    let writer = tokio::spawn(write_pump(sink, rx, keepalive));
    read_loop(stream, room, player_id, keepalive, writer).await;

    let remaining = room.leave(player_id).await;
    info!("玩家 {} 的连接关闭，房间 {} 还剩 {} 个连接", player_id, room.id(), remaining);
}

/// 读循环：把收到的每一帧原始文本转交给房间
///
/// 每收到一帧 (包括 Pong) 都会刷新读超时。
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    room: &RoomHandle,
    player_id: PlayerId,
    keepalive: Keepalive,
    mut writer: tokio::task::JoinHandle<()>,
) {
    loop {
        let frame = tokio::select! {
            frame = timeout(keepalive.pong_wait, stream.next()) => frame,
            _ = &mut writer => {
                debug!("玩家 {} 的写泵已退出", player_id);
                break;
            }
        };

        let msg = match frame {
            Err(_) => {
                warn!("玩家 {} 在 {:?} 内没有任何响应，断开连接", player_id, keepalive.pong_wait);
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                warn!("读取玩家 {} 的消息失败: {}", player_id, e);
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        let text = match msg {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    warn!("玩家 {} 发送了无法解析的二进制消息: {}", player_id, e);
                    continue;
                }
            },
            Message::Close(_) => break,
            // 心跳帧只用于刷新读超时
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        if !room.relay(player_id, text).await {
            break;
        }
    }
}

/// 写泵：定时发送 Ping，并把房间推送的状态写到连接上
///
/// 队列关闭 (玩家已离开房间) 或写失败时退出。
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<StateView>,
    keepalive: Keepalive,
) {
    let mut ticker = interval_at(Instant::now() + keepalive.ping_period, keepalive.ping_period);

    loop {
        let msg = tokio::select! {
            _ = ticker.tick() => Message::Ping(Default::default()),
            view = rx.recv() => match view {
                Some(view) => match serde_json::to_string(&view) {
                    Ok(payload) => Message::Text(payload.into()),
                    Err(e) => {
                        warn!("序列化状态失败: {}", e);
                        continue;
                    }
                },
                None => {
                    let _ = timeout(keepalive.write_wait, sink.send(Message::Close(None))).await;
                    return;
                }
            },
        };

        match timeout(keepalive.write_wait, sink.send(msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("写入失败，写泵退出: {}", e);
                return;
            }
            Err(_) => {
                warn!("写入超时 ({:?})，写泵退出", keepalive.write_wait);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_period_shorter_than_deadline() {
        let keepalive = Keepalive::default();
        assert_eq!(keepalive.pong_wait, Duration::from_secs(60));
        assert_eq!(keepalive.ping_period, Duration::from_secs(54));
        assert_eq!(keepalive.write_wait, Duration::from_secs(10));

        let short = Keepalive::new(Duration::from_millis(500));
        assert_eq!(short.ping_period, Duration::from_millis(450));
        assert_eq!(short.write_wait, Duration::from_millis(500));
    }
}
