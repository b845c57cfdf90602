//! End-to-end sessions over simulated links.
//!
//! A client and a server exchange game payloads through `pump`, a
//! [`PeerTable`] and [`PacketHandler`] callbacks, with loss, duplication
//! and reordering on both directions.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use starlane_net::{
    pump, LossyLink, MemoryNetwork, NetworkConditions, Packet, PacketHandler, PacketManager,
    PeerTable, TransportConfig,
};
use starlane_shared::{JoinRoom, JoinRoomAccepted, PacketKind, Payload, PlayerState};

fn server_addr() -> SocketAddr {
    "10.0.0.1:4242".parse().unwrap()
}

fn client_addr() -> SocketAddr {
    "10.0.0.2:50000".parse().unwrap()
}

#[test]
fn test_reliable_stream_survives_poor_link() {
    let network = MemoryNetwork::new();
    let mut client_link = LossyLink::new(
        network.bind(client_addr()),
        NetworkConditions::POOR,
        0xC11E,
    );
    let mut server_link = LossyLink::new(
        network.bind(server_addr()),
        NetworkConditions::POOR,
        0x5E7E,
    );

    let client = PacketManager::new();
    let server = PacketManager::new();

    let states = Arc::new(Mutex::new(Vec::new()));
    let mut handler = PacketHandler::new();
    let sink = Arc::clone(&states);
    handler.register(PacketKind::PlayerState, move |packet: &Packet| {
        if let Some(state) = PlayerState::from_bytes(packet.payload()) {
            sink.lock().push(state.player_id);
        }
    });

    let mut delivered = BTreeSet::new();
    for round in 0..400u32 {
        if round < 200 {
            let state = PlayerState {
                player_id: round,
                pos_x: round as f32,
                pos_y: 1.5,
                health: 100,
                lives: 3,
            };
            client.send_reliable(&state.to_bytes(), PlayerState::KIND.as_u8());
        } else {
            // Keep-alive so trailing losses still show up as gaps
            client.send_reliable(&[], PacketKind::PlayerReady.as_u8());
        }

        pump(&client, &mut client_link, server_addr()).unwrap();
        pump(&server, &mut server_link, client_addr()).unwrap();

        let received = server.drain_received();
        delivered.extend(received.iter().map(Packet::seqid));
        handler.process(&received);

        if round % 5 == 4 {
            server.request_outstanding();
        }
    }

    for seqid in 1..=200 {
        assert!(delivered.contains(&seqid), "seqid {seqid} never delivered");
    }
    let ids: BTreeSet<u32> = states.lock().iter().copied().collect();
    assert_eq!(ids, (0..200).collect::<BTreeSet<u32>>());
    assert!(client.stats().retransmissions > 0);
}

#[test]
fn test_join_flow_through_peer_table() {
    let network = MemoryNetwork::new();
    let mut server_socket = network.bind(server_addr());
    let mut client_socket = network.bind(client_addr());

    let table = PeerTable::new(TransportConfig::default().with_compression(true));
    let client = PacketManager::new();

    let join = JoinRoom::new("pilot", 1234);
    client.send_reliable(&join.to_bytes(), JoinRoom::KIND.as_u8());
    pump(&client, &mut client_socket, server_addr()).unwrap();

    let report = table.pump(&mut server_socket).unwrap();
    assert_eq!(report.received, 1);
    assert!(table.is_empty());

    // Unknown sender: the request lands in the global manager
    let requests = table.global().drain_received();
    assert_eq!(requests.len(), 1);
    let request = JoinRoom::from_bytes(requests[0].payload()).unwrap();
    assert_eq!(request.name(), "pilot");
    assert_eq!(request.join_code, 1234);

    let from = requests[0].header.endpoint.to_socket_addr();
    assert_eq!(from, client_addr());
    let peer = table.register(from);
    let accepted = JoinRoomAccepted {
        room_code: 1234,
        player_server_id: 1,
        admin: 1,
        _pad: [0; 3],
    };
    peer.send_reliable(&accepted.to_bytes(), JoinRoomAccepted::KIND.as_u8());

    // A large, compressible broadcast
    let snapshot = vec![0u8; 1500];
    assert_eq!(
        table.broadcast(&snapshot, PacketKind::AllPlayersState.as_u8(), false),
        1
    );

    let report = table.pump(&mut server_socket).unwrap();
    assert_eq!(report.sent, 2);
    assert!(report.bytes_sent < 1500);

    pump(&client, &mut client_socket, server_addr()).unwrap();
    let replies = client.drain_received();
    assert_eq!(replies.len(), 2);
    // Unreliable (seqid 0) sorts first
    assert_eq!(replies[0].kind(), PacketKind::AllPlayersState.as_u8());
    assert_eq!(replies[0].payload(), snapshot.as_slice());
    assert_eq!(replies[1].seqid(), 1);
    assert_eq!(
        JoinRoomAccepted::from_bytes(replies[1].payload()),
        Some(accepted)
    );

    // Later traffic from the client goes to its own manager
    client.send_reliable(b"ready", PacketKind::PlayerReady.as_u8());
    pump(&client, &mut client_socket, server_addr()).unwrap();
    table.pump(&mut server_socket).unwrap();
    assert_eq!(table.global().pending_received(), 0);

    // Another round trip: the join must not be requested and delivered again
    pump(&client, &mut client_socket, server_addr()).unwrap();
    table.pump(&mut server_socket).unwrap();
    let delivered: Vec<(u32, Vec<u8>)> = peer
        .drain_received()
        .iter()
        .map(|p| (p.seqid(), p.payload().to_vec()))
        .collect();
    assert_eq!(delivered, vec![(2, b"ready".to_vec())]);
    assert_eq!(peer.stats().ack_requests_queued, 0);
    assert_eq!(client.stats().retransmissions, 0);
}
