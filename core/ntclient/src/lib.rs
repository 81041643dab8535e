//! FILENAME: core/ntclient/src/lib.rs
//! SignBench Telemetry Client
//!
//! A networked key/value session against a robot: dial, subscribe to every
//! topic, keep a map of announced entries, fan inbound updates out to
//! registered listeners and accept fire-and-forget writes. A dropped
//! session reconnects forever on a fixed delay.

mod error;
mod proto;

#[cfg(test)]
mod tests;

pub use error::ClientError;
pub use proto::{EntryUpdate, EntryValue};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use proto::WireMessage;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Listener = Arc<dyn Fn(EntryUpdate) + Send + Sync>;

const DEFAULT_PORT: u16 = 5810;
const DIAL_TIMEOUT: Duration = Duration::from_secs(2);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);
/// Inbound updates waiting for listener dispatch; overflow drops the update.
const DISPATCH_QUEUE: usize = 256;

#[derive(Debug, Clone)]
struct EntryMeta {
    id: u32,
    value_type: String,
    flags: u32,
}

#[derive(Default)]
struct Shared {
    /// Set for the lifetime of the session task; the task never exits, so
    /// this stays set once a first session has been established.
    started: AtomicBool,
    connected: AtomicBool,
    /// key -> announced metadata
    entries: Mutex<HashMap<String, EntryMeta>>,
    /// announced id -> key
    ids: Mutex<HashMap<u32, String>>,
    listeners: Mutex<Vec<Listener>>,
    /// Present only while a session is up; outbound frames go through it.
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct Client {
    shared: Arc<Shared>,
    identity: String,
    reconnect_delay: Duration,
}

impl Client {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            identity: identity.into(),
            reconnect_delay: Duration::from_millis(1000),
        }
    }

    /// Fixed delay between reconnect attempts. Configure once, before
    /// `start`; sessions already running keep the delay they started with.
    pub fn set_reconnect_delay(&mut self, delay: Duration) {
        self.reconnect_delay = delay;
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Server-announced id for a key, if the server has announced it.
    pub fn key_id(&self, key: &str) -> Option<u32> {
        let entries = self.shared.entries.lock().ok()?;
        entries.get(key).map(|meta| meta.id)
    }

    pub fn add_listener(&self, listener: impl Fn(EntryUpdate) + Send + Sync + 'static) {
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.push(Arc::new(listener));
        }
    }

    pub fn clear_listeners(&self) {
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.clear();
        }
    }

    /// Establish a session with the robot at `address` (bare host gets the
    /// default port). `Ok(true)` means the session is up, `Ok(false)` means
    /// nothing answered in time ("no robot"), `Err` is a transport failure.
    ///
    /// Once a session is up it survives this call: a drop later triggers
    /// fixed-delay reconnect attempts, forever. While the session task is
    /// alive (connected or mid reconnect gap) `start` does not dial; it
    /// reports the current link state.
    pub async fn start(&self, address: &str) -> Result<bool, ClientError> {
        // Exactly one session task per client. The reconnect loop owns the
        // link once it exists; a second `start` must not race it with a
        // second dial.
        if self
            .shared
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(self.is_connected());
        }

        let url = session_url(address, &self.identity);
        let session = match Session::open(&url).await {
            Ok(Some(session)) => session,
            no_session => {
                self.shared.started.store(false, Ordering::SeqCst);
                return no_session.map(|_| false);
            }
        };

        self.shared.connected.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let delay = self.reconnect_delay;
        tokio::spawn(async move {
            session.run(Arc::clone(&shared)).await;
            loop {
                tokio::time::sleep(delay).await;
                match Session::open(&url).await {
                    Ok(Some(session)) => session.run(Arc::clone(&shared)).await,
                    Ok(None) => debug!("reconnect: no robot at {url}"),
                    Err(e) => debug!("reconnect attempt failed: {e}"),
                }
            }
        });

        Ok(true)
    }

    /// Change the value of a server-announced entry.
    pub fn update(&self, id: u32, value: EntryValue) -> Result<(), ClientError> {
        self.send(WireMessage::Update { id, value })
    }

    /// Create an entry the server has not announced yet.
    pub fn assign(
        &self,
        key: &str,
        value: EntryValue,
        persistent: bool,
    ) -> Result<(), ClientError> {
        self.send(WireMessage::Publish {
            name: key.to_string(),
            value_type: value.type_name().to_string(),
            persistent,
            value,
        })
    }

    fn send(&self, message: WireMessage) -> Result<(), ClientError> {
        let frame = Message::text(proto::encode(&[message])?);
        let guard = self
            .shared
            .outbound
            .lock()
            .map_err(|_| ClientError::NotConnected)?;
        let sender = guard.as_ref().ok_or(ClientError::NotConnected)?;
        sender.send(frame).map_err(|_| ClientError::NotConnected)
    }
}

fn session_url(address: &str, identity: &str) -> String {
    if address.contains(':') {
        format!("ws://{address}/nt/{identity}")
    } else {
        format!("ws://{address}:{DEFAULT_PORT}/nt/{identity}")
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// One live websocket session: the dialed socket plus the server's first
/// frame, consumed during the handshake.
struct Session {
    socket: Socket,
    first: Message,
}

impl Session {
    /// Dial and subscribe, then wait for the server's first frame.
    /// `Ok(None)` is the "no robot" outcome: nothing answered in time.
    async fn open(url: &str) -> Result<Option<Self>, ClientError> {
        let (mut socket, _) = match timeout(DIAL_TIMEOUT, connect_async(url)).await {
            Err(_) => return Ok(None),
            Ok(dialed) => dialed?,
        };

        socket.send(Message::text(proto::subscribe_all(1)?)).await?;

        match timeout(HANDSHAKE_TIMEOUT, socket.next()).await {
            Err(_) | Ok(None) => Ok(None),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(Some(Ok(first))) => Ok(Some(Session { socket, first })),
        }
    }

    /// Pump the session until the socket drops. Inbound frames update the
    /// entry maps and feed the bounded dispatch queue; outbound frames come
    /// from `Client::send`.
    async fn run(self, shared: Arc<Shared>) {
        let Session { socket, first } = self;
        let (mut sink, mut stream) = socket.split();

        shared.connected.store(true, Ordering::SeqCst);

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        if let Ok(mut outbound) = shared.outbound.lock() {
            *outbound = Some(out_tx.clone());
        }

        let (in_tx, mut in_rx) = mpsc::channel::<EntryUpdate>(DISPATCH_QUEUE);
        let dispatch_shared = Arc::clone(&shared);
        let dispatcher = tokio::spawn(async move {
            while let Some(update) = in_rx.recv().await {
                let listeners: Vec<Listener> = match dispatch_shared.listeners.lock() {
                    Ok(guard) => guard.clone(),
                    Err(_) => break,
                };
                for listener in &listeners {
                    listener(update.clone());
                }
            }
        });

        handle_frame(&shared, &in_tx, first);

        loop {
            tokio::select! {
                inbound = stream.next() => match inbound {
                    Some(Ok(frame)) => handle_frame(&shared, &in_tx, frame),
                    Some(Err(e)) => {
                        warn!("telemetry socket error: {e}");
                        break;
                    }
                    None => break,
                },
                queued = out_rx.recv() => match queued {
                    Some(frame) => {
                        if sink.send(frame).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        // Tear down only what this session still owns; a successor session
        // may already have installed its own sender.
        if let Ok(mut outbound) = shared.outbound.lock() {
            if outbound
                .as_ref()
                .is_some_and(|sender| sender.same_channel(&out_tx))
            {
                *outbound = None;
                shared.connected.store(false, Ordering::SeqCst);
            }
        }

        drop(in_tx);
        let _ = dispatcher.await;
    }
}

fn handle_frame(shared: &Shared, queue: &mpsc::Sender<EntryUpdate>, frame: Message) {
    let Message::Text(text) = frame else {
        return;
    };
    let messages = match proto::decode(text.as_str()) {
        Ok(messages) => messages,
        Err(e) => {
            debug!("discarding malformed frame: {e}");
            return;
        }
    };

    for message in messages {
        match message {
            WireMessage::Announce {
                name,
                id,
                value_type,
                flags,
                value,
            } => {
                if let (Ok(mut entries), Ok(mut ids)) =
                    (shared.entries.lock(), shared.ids.lock())
                {
                    entries.insert(
                        name.clone(),
                        EntryMeta {
                            id,
                            value_type: value_type.clone(),
                            flags,
                        },
                    );
                    ids.insert(id, name.clone());
                }
                if let Some(value) = value {
                    enqueue(
                        queue,
                        EntryUpdate {
                            key: name,
                            value,
                            value_type,
                            msg_type: "announce".to_string(),
                            id,
                            flags,
                        },
                    );
                }
            }
            WireMessage::Unannounce { name, id } => {
                if let (Ok(mut entries), Ok(mut ids)) =
                    (shared.entries.lock(), shared.ids.lock())
                {
                    entries.remove(&name);
                    ids.remove(&id);
                }
            }
            WireMessage::Update { id, value } => {
                let key = shared
                    .ids
                    .lock()
                    .ok()
                    .and_then(|ids| ids.get(&id).cloned());
                let Some(key) = key else {
                    debug!("update for unknown entry id {id}");
                    continue;
                };
                let (value_type, flags) = shared
                    .entries
                    .lock()
                    .ok()
                    .and_then(|entries| {
                        entries
                            .get(&key)
                            .map(|meta| (meta.value_type.clone(), meta.flags))
                    })
                    .unwrap_or_else(|| (value.type_name().to_string(), 0));
                enqueue(
                    queue,
                    EntryUpdate {
                        key,
                        value,
                        value_type,
                        msg_type: "update".to_string(),
                        id,
                        flags,
                    },
                );
            }
            // Client -> server messages echoed back are not ours to handle.
            WireMessage::Subscribe { .. } | WireMessage::Publish { .. } => {}
        }
    }
}

fn enqueue(queue: &mpsc::Sender<EntryUpdate>, update: EntryUpdate) {
    let key = update.key.clone();
    if queue.try_send(update).is_err() {
        warn!("inbound telemetry queue full, dropping update for {key}");
    }
}
