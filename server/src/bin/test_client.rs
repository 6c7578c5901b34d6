//! Scripted client for smoke-testing a running server.
//!
//! Joins, says hello, walks a small circle while echoing move keys, answers
//! pings, then disconnects.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use worldsync_shared::{
    Action, ChatRequest, ClientPacket, MoveKey, MoveRequest, ServerPacket, Vec3, DEFAULT_PORT,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Number of moves to send before disconnecting
    #[arg(short = 'm', long, default_value = "50")]
    moves: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let (ws_stream, _) = connect_async(format!("ws://{}", args.server)).await?;
    let (mut write, mut read) = ws_stream.split();
    info!("Connected to {}", args.server);

    write
        .send(Message::Text(ClientPacket::Ready.encode()?))
        .await?;

    let mut my_id = None;
    let mut move_key: Option<MoveKey> = None;
    let mut can_move = false;
    let mut sent_moves = 0u32;
    let mut ticker = interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };
                let packet = match ServerPacket::decode(&text) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Undecodable frame: {}", e);
                        continue;
                    }
                };
                match packet {
                    ServerPacket::Open(open) => {
                        info!("Assigned id {} with {} chat lines", open.uuid, open.chat.len());
                        my_id = Some(open.uuid);
                        write.send(Message::Text(ClientPacket::Ready2.encode()?)).await?;
                        let hello = ClientPacket::Chat(ChatRequest { message: "hello".to_string() });
                        write.send(Message::Text(hello.encode()?)).await?;
                    }
                    ServerPacket::AddEntities(add) => {
                        info!("Roster: {:?}", add.entities.iter().map(|e| e.uuid).collect::<Vec<_>>());
                        if sent_moves == 0 {
                            can_move = true;
                        }
                    }
                    ServerPacket::UpdateEntity(update) => {
                        if Some(update.entity.uuid) == my_id {
                            move_key = update.next_key;
                            can_move = true;
                        }
                    }
                    ServerPacket::Chat(line) => info!("Chat: {}", line.message),
                    ServerPacket::Ping(_) => {
                        write.send(Message::Text(ClientPacket::Pong.encode()?)).await?;
                    }
                    ServerPacket::Kicked(kicked) => {
                        warn!("Kicked: {}", kicked.reason);
                        break;
                    }
                    ServerPacket::RemoveEntity(remove) => info!("Entity {} left", remove.entity.uuid),
                }
            }

            _ = ticker.tick() => {
                if !can_move {
                    continue;
                }
                if sent_moves >= args.moves {
                    write.send(Message::Close(None)).await?;
                    break;
                }
                let angle = sent_moves as f64 * 0.2;
                let request = MoveRequest {
                    position: Vec3::new(angle.cos() * 3.0, 0.0, angle.sin() * 3.0),
                    yaw: angle,
                    pitch: 0.0,
                    head_yaw: angle,
                    action_id: Action::Walk,
                    key: move_key.take(),
                };
                write.send(Message::Text(ClientPacket::Move(request).encode()?)).await?;
                sent_moves += 1;
                // Wait for the next key before moving again
                can_move = false;
            }
        }
    }

    info!("Sent {} moves, disconnected", sent_moves);
    Ok(())
}
