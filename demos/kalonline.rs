//! Example: KalOnline character selection
//!
//! Answers the client's opening handshake and login so the game client
//! reaches its character selection screen.
//!
//! Run with: `cargo run --example kalonline`

use std::sync::Arc;

use async_trait::async_trait;
use packet_server::config::Config;
use packet_server::utils::logging::init_logging;
use packet_server::{values, ConnectionObserver, FieldKind, Packet, Server, Session, Value};
use tracing::{error, info, warn};

/// Client → server
mod c2s {
    pub const ANS_CODE: u8 = 4;
    pub const LOGIN: u8 = 8;
    pub const CONNECT: u8 = 9;
    pub const SECOND_LOGIN: u8 = 10;
}

/// Server → client
mod s2c {
    pub const PLAYER_INFO: u8 = 114;
    pub const CODE: u8 = 125;
    pub const ANS_LOGIN: u8 = 149;
}

struct GameEvents;

#[async_trait]
impl ConnectionObserver for GameEvents {
    async fn on_connect(&self, session: &Arc<Session>) {
        info!(peer = %session.peer_addr(), "Client connected");
    }

    async fn on_disconnect(&self, session: &Arc<Session>) {
        info!(peer = %session.peer_addr(), "Client disconnected");
    }

    async fn on_unknown_packet(&self, _session: &Arc<Session>, packet: Packet) {
        warn!(packet_type = packet.packet_type(), "Unknown packet");
    }
}

#[tokio::main]
async fn main() -> packet_server::Result<()> {
    let config = Config::from_env()?;
    config.validate_strict()?;
    init_logging(&config.logging)?;

    let server = Server::from_config(&config)
        .observer(GameEvents)
        .on(c2s::CONNECT, |session, _packet| async move {
            session
                .send(
                    s2c::CODE,
                    values![0i32, 0u8, 604_800i32, 0i32, 0i32, 0u64, 0u8, 0u8, 2u8],
                )
                .await;
        })
        .on(c2s::ANS_CODE, |_session, _packet| async {})
        .on(c2s::LOGIN, |session, mut packet| async move {
            let fields = packet.read_schema(&[FieldKind::Str, FieldKind::Str, FieldKind::Str]);
            let [login, password, mac] = [0, 1, 2].map(|i| {
                fields[i]
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned()
            });
            info!(%login, %password, %mac, "Login");

            session.send(s2c::ANS_LOGIN, values![1u8]).await;
        })
        .on(c2s::SECOND_LOGIN, |session, _packet| async move {
            let mut fields = values![0u8, 0u8, 0i32, 1u8, 1i32, "Liplay", 4u8, 11u8, 60u8, 0i32];
            fields.extend(std::iter::repeat(Value::U16(5)).take(5));
            fields.extend(values![0u8, 0u8, 0u8]);

            session.send(s2c::PLAYER_INFO, fields).await;
        })
        .build();

    let address = server.config().address.clone();
    if let Err(e) = server.start(&address).await {
        error!(error = %e, "Server failed");
        return Err(e);
    }
    Ok(())
}
