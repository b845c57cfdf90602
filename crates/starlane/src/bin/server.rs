//! # Starlane Server
//!
//! Authoritative room server. One UDP socket, one packet manager per player.
//!
//! ## Usage
//!
//! ```bash
//! starlane_server --bind 0.0.0.0:4242 --compression --duration 60
//! RUST_LOG=starlane_net=trace starlane_server
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use parking_lot::Mutex;
use starlane::{bind_socket, init_tracing, load_config, tick_duration, GAP_RETRY_TICKS, TICK_RATE};
use starlane_net::{Packet, PacketHandler, PeerTable};
use starlane_shared::{
    JoinRoom, JoinRoomAccepted, PacketKind, Payload, PlayerInput, PlayerState, SERVER_BIND,
};

/// Starlane authoritative server.
#[derive(Parser, Debug)]
#[command(name = "starlane_server", about = "Starlane room server")]
struct Cli {
    /// UDP address to bind.
    #[arg(long, default_value = SERVER_BIND)]
    bind: SocketAddr,

    /// Transport configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compress large payloads.
    #[arg(long, default_value_t = false)]
    compression: bool,

    /// Server tick rate in Hz.
    #[arg(long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Simulated outgoing packet loss, in percent.
    #[arg(long, default_value_t = 0)]
    loss: u8,

    /// Run for N seconds then exit.
    #[arg(long)]
    duration: Option<u64>,
}

/// Player movement per tick, in world units.
const PLAYER_SPEED: f32 = 4.0;

/// Lives a player joins with.
const STARTING_LIVES: u16 = 3;

/// Events collected by packet callbacks during one tick.
#[derive(Default)]
struct Inbox {
    joins: Vec<(SocketAddr, JoinRoom)>,
    inputs: Vec<PlayerInput>,
    leaving: Vec<SocketAddr>,
}

fn global_handler(inbox: &Arc<Mutex<Inbox>>) -> PacketHandler {
    let mut handler = PacketHandler::new();
    let sink = Arc::clone(inbox);
    handler.register(PacketKind::JoinRoom, move |packet: &Packet| {
        match JoinRoom::from_bytes(packet.payload()) {
            Some(join) => sink
                .lock()
                .joins
                .push((packet.header.endpoint.to_socket_addr(), join)),
            None => tracing::debug!(len = packet.payload().len(), "bad join payload"),
        }
    });
    handler
}

fn peer_handler(inbox: &Arc<Mutex<Inbox>>) -> PacketHandler {
    let mut handler = PacketHandler::new();

    let sink = Arc::clone(inbox);
    handler.register(PacketKind::PlayerInput, move |packet: &Packet| {
        if let Some(input) = PlayerInput::from_bytes(packet.payload()) {
            sink.lock().inputs.push(input);
        }
    });

    let sink = Arc::clone(inbox);
    handler.register(PacketKind::PlayerDisconnect, move |packet: &Packet| {
        sink.lock()
            .leaving
            .push(packet.header.endpoint.to_socket_addr());
    });

    handler
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.compression)?;
    let mut socket = bind_socket(cli.bind, cli.loss)?;
    let table = PeerTable::new(config.clone());

    tracing::info!(
        bind = %socket.get_ref().local_addr(),
        tick_rate = cli.tick_rate,
        compression = config.compression,
        loss = cli.loss,
        "server listening"
    );

    let inbox = Arc::new(Mutex::new(Inbox::default()));
    let mut global = global_handler(&inbox);
    let mut peers = peer_handler(&inbox);

    let mut players: HashMap<SocketAddr, PlayerState> = HashMap::new();
    let mut next_player_id: u32 = 1;

    let tick = tick_duration(cli.tick_rate);
    let deadline = cli.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut tick_count: u64 = 0;

    loop {
        let tick_start = Instant::now();
        if deadline.is_some_and(|d| tick_start >= d) {
            break;
        }

        if let Err(e) = table.pump(&mut socket) {
            tracing::warn!(error = %e, "socket read failed");
        }

        global.process(&table.global().drain_received());
        for addr in table.peers() {
            if let Some(peer) = table.get(addr) {
                peers.process(&peer.drain_received());
            }
        }

        let events = std::mem::take(&mut *inbox.lock());

        for (addr, join) in events.joins {
            if players.contains_key(&addr) {
                continue;
            }
            let id = next_player_id;
            next_player_id += 1;

            let peer = table.register(addr);
            peer.set_auth_key(id);
            let accepted = JoinRoomAccepted {
                room_code: join.join_code,
                player_server_id: id,
                admin: u8::from(players.is_empty()),
                _pad: [0; 3],
            };
            peer.send_reliable(&accepted.to_bytes(), JoinRoomAccepted::KIND.as_u8());
            players.insert(
                addr,
                PlayerState {
                    player_id: id,
                    health: 100,
                    lives: STARTING_LIVES,
                    ..PlayerState::default()
                },
            );
            tracing::info!(%addr, id, name = %join.name(), "player joined");
        }

        for input in events.inputs {
            if let Some(state) = players.values_mut().find(|s| s.player_id == input.player_id) {
                state.pos_x += f32::from(input.move_x) * PLAYER_SPEED;
                state.pos_y += f32::from(input.move_y) * PLAYER_SPEED;
            }
        }

        for addr in events.leaving {
            if let Some(state) = players.remove(&addr) {
                table.remove(addr);
                tracing::info!(%addr, id = state.player_id, "player left");
            }
        }

        for state in players.values() {
            table.broadcast(&state.to_bytes(), PlayerState::KIND.as_u8(), false);
        }

        if tick_count % GAP_RETRY_TICKS == 0 {
            for addr in table.peers() {
                if let Some(peer) = table.get(addr) {
                    peer.request_outstanding();
                }
            }
        }

        tick_count += 1;
        if let Some(rest) = tick.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let stats = socket.get_ref().stats();
    tracing::info!(
        ticks = tick_count,
        players = players.len(),
        sent = stats.packets_sent,
        received = stats.packets_received,
        dropped = socket.stats().dropped,
        "server stopped"
    );
    Ok(())
}
