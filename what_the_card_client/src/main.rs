use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use what_the_card_core::{
    AddCardPayload, ClientMessage, RemovePlayerPayload, ResetMode, ResetPayload,
    SetCardsPerPlayerPayload, StateView,
};

const DEFAULT_SERVER: &str = "127.0.0.1:4000";

/// What The Card 终端客户端
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// 房间号
    room_id: String,
    /// 昵称
    player_name: String,
    /// 服务器地址
    #[arg(default_value = DEFAULT_SERVER)]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut url = Url::parse(&format!("ws://{}/ws/room/{}", args.server, args.room_id))?;
    url.query_pairs_mut().append_pair("player_name", &args.player_name);

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的状态
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<StateView>(text.as_str()) {
                        Ok(state) => {
                            print_state(&state);
                            print!("> "); // 重新显示输入提示符
                            let _ = std::io::stdout().flush();
                        }
                        Err(e) => eprintln!("解析服务器消息失败: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    println!("\n服务器关闭了连接");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- What The Card 客户端 ---");
    println!("可用命令:");
    println!("  quota <数量>     - 设置每人提交的卡片数 (仅房主)");
    println!("  start            - 进入提交阶段 (仅房主)");
    println!("  add <内容>       - 提交一张卡片");
    println!("  draw             - 抽一张牌");
    println!("  reset <0|1>      - 0 清空重来，1 弃牌回堆重洗 (仅房主)");
    println!("  kick <玩家ID>    - 移除一名玩家");
    println!("  exit             - 退出");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let client_msg = match command {
            "quota" => match rest.parse() {
                Ok(cards_per_player) => {
                    ClientMessage::SetCardsPerPlayer(SetCardsPerPlayerPayload { cards_per_player })
                }
                Err(_) => {
                    println!("用法: quota <数量>");
                    continue;
                }
            },
            "start" => ClientMessage::Start,
            "add" if !rest.is_empty() => AddCardPayload { text: rest.to_string() }.into(),
            "draw" => ClientMessage::DrawCard,
            "reset" => match rest.parse::<u8>().ok().and_then(|m| ResetMode::try_from(m).ok()) {
                Some(mode) => ClientMessage::Reset(ResetPayload { mode }),
                None => {
                    println!("用法: reset <0|1>");
                    continue;
                }
            },
            "kick" => match rest.parse() {
                Ok(id) => ClientMessage::RemovePlayer(RemovePlayerPayload { id }),
                Err(_) => {
                    println!("用法: kick <玩家ID>");
                    continue;
                }
            },
            "exit" => {
                println!("正在断开连接...");
                write.send(Message::Close(None)).await?;
                break;
            }
            "" => continue,
            _ => {
                println!("未知命令: {}", line);
                continue;
            }
        };

        write.send(Message::Text(client_msg.encode()?.into())).await?;
    }

    Ok(())
}

fn print_state(state: &StateView) {
    println!("\n<-- [房间状态] 阶段: {:?}", state.phase);
    println!(
        "    抽牌堆剩余: {}  每人提交: {}",
        state.draw_pile_left, state.cards_per_player
    );
    for player in &state.players {
        let mut tags = Vec::new();
        if player.id == state.player_id {
            tags.push("你");
        }
        if player.id == state.host_id {
            tags.push("房主");
        }
        if player.id == state.last_draw_player_id {
            tags.push("刚抽牌");
        }
        println!(
            "    [{}] {} 已提交 {} 张 {}",
            player.id,
            player.name,
            player.submitted_cards,
            tags.join(" ")
        );
    }
    if let Some(card) = state.discard_cards.last() {
        println!("    最新翻开: {}", card);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_server() {
        let args = Args::try_parse_from(["client", "abcd", "alice"]).unwrap();
        assert_eq!(args.room_id, "abcd");
        assert_eq!(args.player_name, "alice");
        assert_eq!(args.server, DEFAULT_SERVER);

        let args = Args::try_parse_from(["client", "abcd", "alice", "10.0.0.2:8080"]).unwrap();
        assert_eq!(args.server, "10.0.0.2:8080");
    }

    #[test]
    fn test_args_require_room_and_name() {
        assert!(Args::try_parse_from(["client"]).is_err());
        assert!(Args::try_parse_from(["client", "abcd"]).is_err());
    }
}
