//! Server network layer: WebSocket transport and the session hub
//!
//! Each connection gets a reader loop plus a writer task and a keepalive
//! task. Every inbound event is forwarded to a single hub task that owns the
//! [`LifecycleController`].

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::keepalive;
use crate::lifecycle::LifecycleController;
use crate::session::{Outbound, Outbox};
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Interval};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{self, Message};
use worldsync_shared::{ClientPacket, ServerPacket, SessionId};

/// How long a closing connection may take to flush its queued packets
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Events sent from connection tasks to the hub
#[derive(Debug)]
pub enum HubEvent {
    Connect {
        outbox: Outbox,
        reply: oneshot::Sender<SessionId>,
    },
    Packet {
        session_id: SessionId,
        packet: ClientPacket,
    },
    KeepaliveTick {
        session_id: SessionId,
    },
    Disconnected {
        session_id: SessionId,
    },
}

/// Applies one hub event to the controller.
pub fn dispatch(controller: &mut LifecycleController, event: HubEvent) {
    match event {
        HubEvent::Connect { outbox, reply } => {
            let session_id = controller.connect(outbox);
            if reply.send(session_id).is_err() {
                controller.disconnect(session_id);
            }
        }
        HubEvent::Packet { session_id, packet } => controller.handle_packet(session_id, packet),
        HubEvent::KeepaliveTick { session_id } => controller.keepalive_tick(session_id),
        HubEvent::Disconnected { session_id } => controller.disconnect(session_id),
    }
}

/// Hub loop: applies events in arrival order and periodically refreshes the
/// roster of every prepared session.
pub async fn run_hub(
    mut controller: LifecycleController,
    mut events: mpsc::UnboundedReceiver<HubEvent>,
    roster_interval: Option<Duration>,
) {
    let mut roster_timer = roster_interval.map(keepalive::ticker);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => dispatch(&mut controller, event),
                None => {
                    info!("Session hub shutting down");
                    break;
                }
            },
            _ = next_tick(&mut roster_timer) => {
                let recipients = controller.broadcast_roster();
                debug!("Roster refresh sent to {} sessions", recipients);
            }
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// WebSocket listener accepting client sessions
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Server { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Runs until the task is dropped; per-connection failures
    /// are logged and never end the loop.
    pub async fn run(self) -> Result<(), ServerError> {
        let (hub_tx, hub_rx) = mpsc::unbounded_channel();
        let controller = LifecycleController::new(&self.config);
        tokio::spawn(run_hub(controller, hub_rx, self.config.roster_interval));

        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let hub = hub_tx.clone();
                    let keepalive_interval = self.config.keepalive_interval;
                    let outbox_capacity = self.config.outbox_capacity;
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, addr, hub, keepalive_interval, outbox_capacity)
                                .await
                        {
                            warn!("Connection from {} ended with error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Drives a single client connection until either side closes it.
///
/// The reader stays in this task; the writer and the keepalive ticker run in
/// their own tasks so that a client which stops reading still gets ticked,
/// timed out and disconnected.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: mpsc::UnboundedSender<HubEvent>,
    keepalive_interval: Duration,
    outbox_capacity: usize,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream).await?;
    let (ws_write, mut ws_read) = ws_stream.split();

    let (outbox, outbound) = Outbox::connect(outbox_capacity);
    let Outbound {
        packets,
        closed: mut session_closed,
    } = outbound;
    let (reply_tx, reply_rx) = oneshot::channel();
    hub.send(HubEvent::Connect {
        outbox,
        reply: reply_tx,
    })
    .map_err(|_| ServerError::HubClosed)?;
    let session_id = reply_rx.await.map_err(|_| ServerError::HubClosed)?;
    info!("[session #{}] connected from {}", session_id, addr);

    let mut writer = tokio::spawn(run_writer(ws_write, packets));
    let keepalive = tokio::spawn(run_keepalive(session_id, hub.clone(), keepalive_interval));
    let mut writer_done = false;

    let result = loop {
        tokio::select! {
            frame = ws_read.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientPacket::decode(&text) {
                    Ok(packet) => {
                        if hub.send(HubEvent::Packet { session_id, packet }).is_err() {
                            break Err(ServerError::HubClosed);
                        }
                    }
                    Err(e) => warn!("[session #{}] undecodable frame: {}", session_id, e),
                },
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },

            _ = &mut session_closed => {
                debug!("[session #{}] closed by server", session_id);
                break Ok(());
            }

            written = &mut writer => {
                writer_done = true;
                break written.map_err(ServerError::from).and_then(|r| r);
            }
        }
    };

    keepalive.abort();
    let _ = hub.send(HubEvent::Disconnected { session_id });

    if !writer_done && timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        warn!(
            "[session #{}] socket not draining, dropping connection",
            session_id
        );
        writer.abort();
    }

    info!("[session #{}] connection closed", session_id);
    result
}

/// Writes queued packets until the outbox is dropped, then sends a close
/// frame.
async fn run_writer<S>(
    mut sink: S,
    mut packets: mpsc::Receiver<ServerPacket>,
) -> Result<(), ServerError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(packet) = packets.recv().await {
        write_packet(&mut sink, &packet).await?;
    }
    let _ = sink.send(Message::Close(None)).await;
    Ok(())
}

/// Forwards one keepalive tick per period to the hub. Aborted when the
/// connection ends.
async fn run_keepalive(
    session_id: SessionId,
    hub: mpsc::UnboundedSender<HubEvent>,
    period: Duration,
) {
    let mut ticker = keepalive::ticker(period);
    loop {
        ticker.tick().await;
        if hub.send(HubEvent::KeepaliveTick { session_id }).is_err() {
            break;
        }
    }
}

async fn write_packet<S>(sink: &mut S, packet: &ServerPacket) -> Result<(), ServerError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = packet.encode()?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}
