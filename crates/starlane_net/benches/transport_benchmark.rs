//! Benchmark for the packet transport hot paths.
//!
//! TARGET: a full server tick (64 players, one state packet each) well under 1ms
//!
//! Run with: cargo bench --package starlane_net --bench transport_benchmark

#![allow(missing_docs)]

use std::net::SocketAddr;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use starlane_net::protocol::{deserialize, serialize};
use starlane_net::{PacketManager, PeerTable, TransportConfig};
use starlane_shared::{Payload, PlayerState};

fn state_payload(id: u32) -> Vec<u8> {
    PlayerState {
        player_id: id,
        pos_x: 12.5,
        pos_y: -3.0,
        health: 80,
        lives: 2,
    }
    .to_bytes()
}

fn benchmark_codec(c: &mut Criterion) {
    let manager = PacketManager::new();
    let bytes = manager.send_reliable(&state_payload(1), PlayerState::KIND.as_u8());
    let packet = deserialize(&bytes).unwrap();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));
    group.bench_function("serialize", |b| b.iter(|| serialize(black_box(&packet))));
    group.bench_function("deserialize", |b| {
        b.iter(|| deserialize(black_box(&bytes)).unwrap())
    });
    group.finish();
}

fn benchmark_send_ingest(c: &mut Criterion) {
    let from: SocketAddr = "127.0.0.1:5000".parse().unwrap();
    let payload = state_payload(7);

    c.bench_function("send_then_ingest_reliable", |b| {
        let sender = PacketManager::new();
        let receiver = PacketManager::new();
        b.iter(|| {
            let bytes = sender.send_reliable(black_box(&payload), 7);
            receiver.ingest(&bytes, from).unwrap();
            black_box(receiver.drain_received());
            black_box(sender.drain_send());
        });
    });

    let large = vec![0u8; 1024];
    c.bench_function("send_compressed_1k", |b| {
        let sender = PacketManager::with_config(TransportConfig::default().with_compression(true));
        b.iter(|| {
            black_box(sender.send_unreliable(black_box(&large), 19));
            black_box(sender.drain_send());
        });
    });
}

fn benchmark_server_tick(c: &mut Criterion) {
    let table = PeerTable::default();
    for port in 0..64u16 {
        table.register(SocketAddr::from(([10, 0, 0, 1], 20_000 + port)));
    }
    let payload = state_payload(3);

    let mut group = c.benchmark_group("server_tick");
    group.throughput(Throughput::Elements(64));
    group.bench_function("broadcast_and_collect_64", |b| {
        b.iter(|| {
            table.broadcast(black_box(&payload), PlayerState::KIND.as_u8(), false);
            black_box(table.collect_outgoing())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_codec,
    benchmark_send_ingest,
    benchmark_server_tick
);
criterion_main!(benches);
