//! Network protocol types shared between client and server.
//!
//! Every payload is a `#[repr(C)]` plain-old-data struct with no implicit
//! padding, so it can be cast to and from the transport's byte buffers.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Packet kind identifier carried in the transport header's `type` byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    /// A player left the session.
    PlayerDisconnect = 1,
    /// Client asks to join (or create) a room.
    JoinRoom = 2,
    /// Server accepted the join request.
    JoinRoomAccepted = 3,
    /// Room owner asks to start the game.
    GameStartRequest = 4,
    /// Room ownership changed.
    RoomAdminUpdate = 5,
    /// A player joined the room.
    PlayerJoin = 6,
    /// Authoritative state of one player.
    PlayerState = 7,
    /// An entity was removed from the world.
    EntityDestroy = 8,
    /// Client input for one tick.
    PlayerInput = 9,
    /// Player toggled ready in the lobby.
    PlayerReady = 10,
    /// Full lobby state.
    LobbyState = 11,
    /// The game starts for every player in the room.
    GameStart = 12,
    /// Client fired.
    PlayerShoot = 13,
    /// Server spawned a projectile.
    SpawnProjectile = 14,
    /// Server spawned an enemy.
    SpawnEnemy = 15,
    /// Debug request to spawn a boss.
    SpawnBossRequest = 16,
    /// Score changed.
    PlayerScoreUpdate = 17,
    /// Lobby settings changed.
    LobbySettingsUpdate = 18,
    /// State of every player in one packet.
    AllPlayersState = 19,
}

/// Returned when a `type` byte does not name a known [`PacketKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownPacketKind(pub u8);

impl fmt::Display for UnknownPacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown packet kind {}", self.0)
    }
}

impl std::error::Error for UnknownPacketKind {}

impl PacketKind {
    /// Returns the wire discriminator.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<PacketKind> for u8 {
    fn from(kind: PacketKind) -> Self {
        kind.as_u8()
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = UnknownPacketKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::PlayerDisconnect,
            2 => Self::JoinRoom,
            3 => Self::JoinRoomAccepted,
            4 => Self::GameStartRequest,
            5 => Self::RoomAdminUpdate,
            6 => Self::PlayerJoin,
            7 => Self::PlayerState,
            8 => Self::EntityDestroy,
            9 => Self::PlayerInput,
            10 => Self::PlayerReady,
            11 => Self::LobbyState,
            12 => Self::GameStart,
            13 => Self::PlayerShoot,
            14 => Self::SpawnProjectile,
            15 => Self::SpawnEnemy,
            16 => Self::SpawnBossRequest,
            17 => Self::PlayerScoreUpdate,
            18 => Self::LobbySettingsUpdate,
            19 => Self::AllPlayersState,
            other => return Err(UnknownPacketKind(other)),
        })
    }
}

/// A fixed-layout payload bound to one packet kind.
pub trait Payload: Pod {
    /// Kind written into the transport header.
    const KIND: PacketKind;

    /// Copies the payload into an owned byte buffer.
    fn to_bytes(&self) -> Vec<u8> {
        bytemuck::bytes_of(self).to_vec()
    }

    /// Reads a payload from bytes, `None` if the length does not match.
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != std::mem::size_of::<Self>() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(bytes))
    }
}

/// Length of the NUL-padded player name.
pub const PLAYER_NAME_LEN: usize = 32;

/// Join request - Client -> Server.
///
/// Size: 36 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct JoinRoom {
    /// Player name, NUL padded.
    pub name: [u8; PLAYER_NAME_LEN],
    /// Room to join. 0 creates a room, 1 joins any public room.
    pub join_code: u32,
}

impl JoinRoom {
    /// Builds a join request, truncating the name so it stays NUL terminated.
    #[must_use]
    pub fn new(name: &str, join_code: u32) -> Self {
        let mut buf = [0u8; PLAYER_NAME_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(PLAYER_NAME_LEN - 1);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { name: buf, join_code }
    }

    /// Returns the player name up to the first NUL.
    #[must_use]
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(PLAYER_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

impl Payload for JoinRoom {
    const KIND: PacketKind = PacketKind::JoinRoom;
}

/// Join accepted - Server -> Client.
///
/// Size: 12 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct JoinRoomAccepted {
    /// Room the player joined.
    pub room_code: u32,
    /// Server-side entity id of the player.
    pub player_server_id: u32,
    /// 1 if the player owns the room.
    pub admin: u8,
    /// Padding.
    pub _pad: [u8; 3],
}

impl Payload for JoinRoomAccepted {
    const KIND: PacketKind = PacketKind::JoinRoomAccepted;
}

/// Player input - Client -> Server.
///
/// Size: 12 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PlayerInput {
    /// Server entity id of the player.
    pub player_id: u32,
    /// Client tick this input belongs to.
    pub tick: u32,
    /// Horizontal direction (-1, 0, 1).
    pub move_x: i8,
    /// Vertical direction (-1, 0, 1).
    pub move_y: i8,
    /// Non-zero while the fire button is held.
    pub fire: u8,
    /// Padding.
    pub _pad: u8,
}

impl Payload for PlayerInput {
    const KIND: PacketKind = PacketKind::PlayerInput;
}

/// Authoritative player state - Server -> Client.
///
/// Size: 16 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PlayerState {
    /// Server entity id.
    pub player_id: u32,
    /// Position X.
    pub pos_x: f32,
    /// Position Y.
    pub pos_y: f32,
    /// Remaining health.
    pub health: u16,
    /// Remaining lives.
    pub lives: u16,
}

impl Payload for PlayerState {
    const KIND: PacketKind = PacketKind::PlayerState;
}

/// Entity removal - Server -> Client.
///
/// Size: 4 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct EntityDestroy {
    /// Server entity id.
    pub entity_id: u32,
}

impl Payload for EntityDestroy {
    const KIND: PacketKind = PacketKind::EntityDestroy;
}
