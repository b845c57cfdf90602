//! # Starlane Client
//!
//! Headless scripted client: joins a room, streams input for a while, leaves.
//!
//! ## Usage
//!
//! ```bash
//! starlane_client --server 127.0.0.1:4242 --name pilot --ticks 600
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use parking_lot::Mutex;
use starlane::{bind_socket, init_tracing, load_config, tick_duration, GAP_RETRY_TICKS, TICK_RATE};
use starlane_net::{pump, Packet, PacketHandler, PacketManager};
use starlane_shared::{
    EntityDestroy, JoinRoom, JoinRoomAccepted, PacketKind, Payload, PlayerInput, PlayerState,
    SERVER_PORT,
};

/// Starlane scripted client.
#[derive(Parser, Debug)]
#[command(name = "starlane_client", about = "Starlane headless client")]
struct Cli {
    /// Server address.
    #[arg(long, default_value_t = SocketAddr::from(([127, 0, 0, 1], SERVER_PORT)))]
    server: SocketAddr,

    /// Local UDP address.
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: SocketAddr,

    /// Player name.
    #[arg(long, default_value = "pilot")]
    name: String,

    /// Room join code.
    #[arg(long, default_value_t = 0)]
    join_code: u32,

    /// Transport configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compress large payloads.
    #[arg(long, default_value_t = false)]
    compression: bool,

    /// Simulated outgoing packet loss, in percent.
    #[arg(long, default_value_t = 0)]
    loss: u8,

    /// Number of ticks to play before leaving.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
}

/// What the client knows about the match.
#[derive(Debug, Default)]
struct View {
    player_id: Option<u32>,
    admin: bool,
    own_state: Option<PlayerState>,
    others_seen: u64,
    destroyed: u64,
}

fn handler(view: &Arc<Mutex<View>>) -> PacketHandler {
    let mut handler = PacketHandler::new();

    let sink = Arc::clone(view);
    handler.register(PacketKind::JoinRoomAccepted, move |packet: &Packet| {
        if let Some(accepted) = JoinRoomAccepted::from_bytes(packet.payload()) {
            let mut view = sink.lock();
            view.player_id = Some(accepted.player_server_id);
            view.admin = accepted.admin != 0;
            tracing::info!(
                id = accepted.player_server_id,
                room = accepted.room_code,
                admin = view.admin,
                "joined room"
            );
        }
    });

    let sink = Arc::clone(view);
    handler.register(PacketKind::PlayerState, move |packet: &Packet| {
        if let Some(state) = PlayerState::from_bytes(packet.payload()) {
            let mut view = sink.lock();
            if view.player_id == Some(state.player_id) {
                view.own_state = Some(state);
            } else {
                view.others_seen += 1;
            }
        }
    });

    let sink = Arc::clone(view);
    handler.register(PacketKind::EntityDestroy, move |packet: &Packet| {
        if let Some(destroy) = EntityDestroy::from_bytes(packet.payload()) {
            tracing::debug!(entity = destroy.entity_id, "entity destroyed");
            sink.lock().destroyed += 1;
        }
    });

    handler
}

/// Scripted movement: a slow square.
fn scripted_input(player_id: u32, tick: u64) -> PlayerInput {
    let (move_x, move_y) = match (tick / 60) % 4 {
        0 => (1, 0),
        1 => (0, 1),
        2 => (-1, 0),
        _ => (0, -1),
    };
    PlayerInput {
        player_id,
        tick: u32::try_from(tick).unwrap_or(u32::MAX),
        move_x,
        move_y,
        fire: u8::from(tick % 30 == 0),
        _pad: 0,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.compression)?;
    let mut socket = bind_socket(cli.bind, cli.loss)?;
    let manager = PacketManager::with_config(config);

    tracing::info!(
        local = %socket.get_ref().local_addr(),
        server = %cli.server,
        name = %cli.name,
        "connecting"
    );

    let view = Arc::new(Mutex::new(View::default()));
    let mut dispatch = handler(&view);

    let join = JoinRoom::new(&cli.name, cli.join_code);
    manager.send_reliable(&join.to_bytes(), JoinRoom::KIND.as_u8());

    let tick = tick_duration(TICK_RATE);
    for tick_count in 0..cli.ticks {
        let tick_start = Instant::now();

        if let Err(e) = pump(&manager, &mut socket, cli.server) {
            tracing::warn!(error = %e, "socket read failed");
        }
        dispatch.process(&manager.drain_received());

        let player_id = view.lock().player_id;
        if let Some(id) = player_id {
            let input = scripted_input(id, tick_count);
            manager.send_unreliable(&input.to_bytes(), PlayerInput::KIND.as_u8());
        }

        if tick_count % GAP_RETRY_TICKS == 0 {
            manager.request_outstanding();
        }

        if let Some(rest) = tick.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    manager.send_reliable(&[], PacketKind::PlayerDisconnect.as_u8());
    if let Err(e) = pump(&manager, &mut socket, cli.server) {
        tracing::warn!(error = %e, "final flush failed");
    }
    socket.flush()?;

    let view = view.lock();
    let stats = manager.stats();
    tracing::info!(
        id = ?view.player_id,
        position = ?view.own_state.map(|s| (s.pos_x, s.pos_y)),
        others_seen = view.others_seen,
        delivered = stats.packets_delivered,
        retransmissions = stats.retransmissions,
        ack_requests = stats.ack_requests_queued,
        "client finished"
    );
    Ok(())
}
