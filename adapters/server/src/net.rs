//! Socket handling: the lobby, one reader thread per client and the hub that
//! feeds client traffic to the simulation thread.

use std::{
    collections::{BTreeMap, VecDeque},
    io::ErrorKind,
    net::{Shutdown, SocketAddr, TcpListener, TcpStream},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use keybound_core::PlayerNumber;
use keybound_protocol::{write_message, FrameReader, IntentMessage, LobbyMessage, ServerMessage};
use tracing::{debug, info, warn};

use crate::game::{PlayerEvent, Transport};

const LOG_TARGET: &str = "keybound::net";
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Identifies a socket independently of the seat it ends up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ConnectionId(u64);

/// Traffic forwarded by the reader threads.
#[derive(Debug)]
enum ClientEvent {
    Intent {
        connection: ConnectionId,
        intent: IntentMessage,
    },
    Malformed {
        connection: ConnectionId,
        error: String,
    },
    Closed {
        connection: ConnectionId,
    },
}

#[derive(Debug)]
struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    fn send(&mut self, message: &ServerMessage) -> bool {
        match write_message(&mut self.stream, message) {
            Ok(()) => true,
            Err(error) => {
                warn!(target: LOG_TARGET, peer = %self.peer, %error, "send failed");
                false
            }
        }
    }

    fn close(&self) {
        if let Err(error) = self.stream.shutdown(Shutdown::Both) {
            debug!(target: LOG_TARGET, peer = %self.peer, %error, "shutdown failed");
        }
    }
}

/// Seated clients plus the channel their reader threads write into.
#[derive(Debug)]
pub(crate) struct Hub {
    seats: BTreeMap<PlayerNumber, Connection>,
    events: Receiver<ClientEvent>,
    pending: VecDeque<PlayerEvent>,
}

impl Hub {
    /// Accepts clients until `max_players` are connected.
    ///
    /// Every connect and disconnect is announced to the lobby. Seats are
    /// numbered in connection order once the lobby is full.
    pub(crate) fn gather(listener: &TcpListener, max_players: u8) -> Result<Self> {
        listener
            .set_nonblocking(true)
            .context("failed to make the listener non-blocking")?;

        let (sender, events) = unbounded();
        let mut lobby: Vec<Connection> = Vec::new();
        let mut next_id = 0_u64;

        while lobby.len() < usize::from(max_players) {
            match listener.accept() {
                Ok((stream, peer)) => match admit(stream, peer, ConnectionId(next_id), &sender) {
                    Ok(connection) => {
                        next_id += 1;
                        info!(target: LOG_TARGET, %peer, "client joined the lobby");
                        lobby.push(connection);
                        announce(&mut lobby, false);
                    }
                    Err(error) => {
                        warn!(target: LOG_TARGET, %peer, error = ?error, "client rejected");
                    }
                },
                Err(error) if error.kind() == ErrorKind::WouldBlock => {}
                Err(error) => warn!(target: LOG_TARGET, %error, "accept failed"),
            }

            match events.recv_timeout(ACCEPT_POLL) {
                Ok(ClientEvent::Closed { connection }) => {
                    let before = lobby.len();
                    lobby.retain(|client| client.id != connection);
                    if lobby.len() != before {
                        info!(target: LOG_TARGET, "client left the lobby");
                        announce(&mut lobby, false);
                    }
                }
                Ok(ClientEvent::Intent { .. } | ClientEvent::Malformed { .. }) => {
                    debug!(target: LOG_TARGET, "ignoring traffic received in the lobby");
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {}
            }
        }

        announce(&mut lobby, true);
        let seats: BTreeMap<PlayerNumber, Connection> = lobby
            .into_iter()
            .enumerate()
            .filter_map(|(index, connection)| {
                PlayerNumber::from_index(index).map(|player| (player, connection))
            })
            .collect();
        for (player, connection) in &seats {
            info!(target: LOG_TARGET, player = player.get(), peer = %connection.peer, "seated");
        }

        Ok(Self {
            seats,
            events,
            pending: VecDeque::new(),
        })
    }

    fn player_of(&self, connection: ConnectionId) -> Option<PlayerNumber> {
        self.seats
            .iter()
            .find(|(_, seat)| seat.id == connection)
            .map(|(player, _)| *player)
    }

    fn evict(&mut self, player: PlayerNumber) {
        if let Some(connection) = self.seats.remove(&player) {
            info!(target: LOG_TARGET, player = player.get(), peer = %connection.peer, "evicted");
            connection.close();
            self.pending.push_back(PlayerEvent::Disconnected(player));
        }
    }

    fn translate(&mut self, event: ClientEvent) -> Option<PlayerEvent> {
        match event {
            ClientEvent::Intent { connection, intent } => self
                .player_of(connection)
                .map(|player| PlayerEvent::Intent(player, intent)),
            ClientEvent::Malformed { connection, error } => self
                .player_of(connection)
                .map(|player| PlayerEvent::Malformed(player, error)),
            ClientEvent::Closed { connection } => {
                let player = self.player_of(connection)?;
                self.evict(player);
                self.pending.pop_front()
            }
        }
    }
}

impl Transport for Hub {
    fn send(&mut self, player: PlayerNumber, message: &ServerMessage) -> bool {
        let Some(connection) = self.seats.get_mut(&player) else {
            return false;
        };
        if connection.send(message) {
            return true;
        }
        self.evict(player);
        false
    }

    fn next_event(&mut self, timeout: Duration) -> Option<PlayerEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(event) => {
                    if let Some(event) = self.translate(event) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(remaining);
                    return None;
                }
            }
        }
    }
}

fn admit(
    stream: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    events: &Sender<ClientEvent>,
) -> Result<Connection> {
    stream
        .set_nonblocking(false)
        .context("failed to make the client socket blocking")?;
    stream
        .set_nodelay(true)
        .context("failed to disable Nagle's algorithm")?;
    let reader = stream
        .try_clone()
        .context("failed to clone the client socket")?;
    spawn_reader(id, reader, events.clone())?;
    Ok(Connection { id, peer, stream })
}

fn spawn_reader(id: ConnectionId, stream: TcpStream, events: Sender<ClientEvent>) -> Result<()> {
    let _handle = thread::Builder::new()
        .name(format!("client-{}", id.0))
        .spawn(move || read_client(id, stream, &events))
        .context("failed to spawn a client reader")?;
    Ok(())
}

fn read_client(connection: ConnectionId, stream: TcpStream, events: &Sender<ClientEvent>) {
    let mut reader = FrameReader::new(stream);
    loop {
        let event = match reader.read_message::<IntentMessage>() {
            Ok(Some(intent)) => ClientEvent::Intent { connection, intent },
            Ok(None) => break,
            Err(error) if error.is_fatal() => {
                debug!(target: LOG_TARGET, connection = connection.0, %error, "reader stopped");
                break;
            }
            Err(error) => ClientEvent::Malformed {
                connection,
                error: error.to_string(),
            },
        };
        if events.send(event).is_err() {
            return;
        }
    }
    let _ = events.send(ClientEvent::Closed { connection });
}

/// Sends the roster to everyone in the lobby, dropping clients that cannot be reached.
fn announce(lobby: &mut Vec<Connection>, start: bool) {
    let message = ServerMessage::Lobby(LobbyMessage {
        players: lobby.iter().map(|client| client.peer.to_string()).collect(),
        start,
    });
    lobby.retain_mut(|client| {
        let delivered = client.send(&message);
        if !delivered {
            client.close();
        }
        delivered
    });
}
