use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use session_logging::{session_debug, session_info, session_warn};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::NetError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Writer = SplitSink<WsStream, Message>;
type Reader = SplitStream<WsStream>;

type Handler<F> = Box<dyn Fn(F) + Send>;
type CloseCallback = Box<dyn Fn(bool) + Send>;

struct Wait<F> {
    id: u64,
    predicate: Box<dyn Fn(&F) -> bool + Send>,
    tx: oneshot::Sender<Result<F, NetError>>,
}

struct Shared<F> {
    name: &'static str,
    writer: Mutex<Option<Writer>>,
    open: AtomicBool,
    finished: AtomicBool,
    closed_by_user: AtomicBool,
    // Bumped on every connect so a read task from an earlier connection
    // cannot tear down its successor.
    epoch: AtomicU64,
    handler: StdMutex<Option<Handler<F>>>,
    waits: StdMutex<Vec<Wait<F>>>,
    next_wait_id: AtomicU64,
    on_close: StdMutex<Option<CloseCallback>>,
}

/// One duplex channel with its own lifecycle, generic over the inbound
/// frame type. Cloning shares the underlying connection.
pub struct Channel<F> {
    shared: Arc<Shared<F>>,
}

impl<F> Clone for Channel<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F> Channel<F>
where
    F: DeserializeOwned + Clone + Send + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                writer: Mutex::new(None),
                open: AtomicBool::new(false),
                finished: AtomicBool::new(true),
                closed_by_user: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                handler: StdMutex::new(None),
                waits: StdMutex::new(Vec::new()),
                next_wait_id: AtomicU64::new(0),
                on_close: StdMutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Registers the inbound frame handler. Exactly one handler per channel:
    /// a later registration replaces the earlier one. Register before any
    /// traffic starts or early frames are dropped.
    pub fn set_handler(&self, handler: impl Fn(F) + Send + 'static) {
        *self.shared.handler.lock().expect("handler lock") = Some(Box::new(handler));
    }

    /// Registers the close callback; the argument is `true` for an explicit
    /// `close()` and `false` for an unexpected drop.
    pub fn set_on_close(&self, callback: impl Fn(bool) + Send + 'static) {
        *self.shared.on_close.lock().expect("on_close lock") = Some(Box::new(callback));
    }

    /// Connects the channel. Idempotent: returns immediately if already
    /// open.
    pub async fn connect(&self, endpoint: &Url, connect_timeout: Duration) -> Result<(), NetError> {
        if self.is_open() {
            return Ok(());
        }

        let connected = tokio::time::timeout(connect_timeout, connect_async(endpoint.as_str()))
            .await
            .map_err(|_| NetError::Timeout(connect_timeout))?
            .map_err(|err| NetError::WebSocket(err.to_string()))?;
        let (writer, reader) = connected.0.split();

        *self.shared.writer.lock().await = Some(writer);
        self.shared.closed_by_user.store(false, Ordering::SeqCst);
        self.shared.finished.store(false, Ordering::SeqCst);
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.open.store(true, Ordering::SeqCst);
        session_info!("{}: connected to {endpoint}", self.shared.name);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            read_loop(&shared, reader).await;
            finish_close(&shared, epoch);
        });
        Ok(())
    }

    /// Sends one outbound frame. Fails with `NotConnected` unless the
    /// channel is open; nothing is queued on the caller's behalf.
    pub async fn send<T: Serialize>(&self, message: &T) -> Result<(), NetError> {
        if !self.is_open() {
            return Err(NetError::NotConnected);
        }
        let text = serde_json::to_string(message).map_err(|err| NetError::Protocol(err.to_string()))?;
        let mut writer = self.shared.writer.lock().await;
        match writer.as_mut() {
            Some(sink) => sink
                .send(Message::Text(text.into()))
                .await
                .map_err(|err| NetError::WebSocket(err.to_string())),
            None => Err(NetError::NotConnected),
        }
    }

    /// Waits for the first inbound frame satisfying `predicate`.
    ///
    /// The transient matcher is removed on success, on timeout, and when the
    /// channel closes (pending waits fail eagerly with `Closed`). Frames
    /// that satisfy a wait still reach the regular handler.
    pub async fn request<P>(&self, predicate: P, timeout: Duration) -> Result<F, NetError>
    where
        P: Fn(&F) -> bool + Send + 'static,
    {
        if !self.is_open() {
            return Err(NetError::NotConnected);
        }
        let (tx, rx) = oneshot::channel();
        let id = self.shared.next_wait_id.fetch_add(1, Ordering::Relaxed);
        self.shared.waits.lock().expect("waits lock").push(Wait {
            id,
            predicate: Box::new(predicate),
            tx,
        });

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            // Sender dropped without resolving; only happens on teardown.
            Ok(Err(_)) => Err(NetError::Closed),
            Err(_) => {
                self.remove_wait(id);
                Err(NetError::Timeout(timeout))
            }
        }
    }

    /// Closes the channel and suppresses any automatic reconnect.
    pub async fn close(&self) {
        self.shared.closed_by_user.store(true, Ordering::SeqCst);
        self.shared.open.store(false, Ordering::SeqCst);
        if let Some(mut sink) = self.shared.writer.lock().await.take() {
            let _ = sink.close().await;
        }
        finish_close(&self.shared, self.shared.epoch.load(Ordering::SeqCst));
    }

    fn remove_wait(&self, id: u64) {
        self.shared
            .waits
            .lock()
            .expect("waits lock")
            .retain(|wait| wait.id != id);
    }
}

async fn read_loop<F>(shared: &Arc<Shared<F>>, mut reader: Reader)
where
    F: DeserializeOwned + Clone + Send + 'static,
{
    while let Some(item) = reader.next().await {
        match item {
            Ok(Message::Text(text)) => dispatch(shared, text.as_str()),
            Ok(Message::Ping(payload)) => {
                let mut writer = shared.writer.lock().await;
                if let Some(sink) = writer.as_mut() {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
            }
            Ok(Message::Close(_)) => {
                session_info!("{}: peer closed the connection", shared.name);
                break;
            }
            Ok(_) => {}
            Err(err) => {
                session_warn!("{}: websocket error: {err}", shared.name);
                break;
            }
        }
    }
}

/// Decodes one frame and routes it: a matching transient wait first, then
/// the registered handler. Malformed payloads are logged and dropped; they
/// never resolve a wait and never kill the loop.
fn dispatch<F>(shared: &Arc<Shared<F>>, text: &str)
where
    F: DeserializeOwned + Clone + Send + 'static,
{
    let frame: F = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            session_warn!("{}: dropping malformed frame: {err}", shared.name);
            return;
        }
    };

    let resolved = {
        let mut waits = shared.waits.lock().expect("waits lock");
        waits
            .iter()
            .position(|wait| (wait.predicate)(&frame))
            .map(|index| waits.remove(index))
    };
    if let Some(wait) = resolved {
        let _ = wait.tx.send(Ok(frame.clone()));
    }

    let handler = shared.handler.lock().expect("handler lock");
    match handler.as_ref() {
        Some(handler) => handler(frame),
        None => session_debug!("{}: frame arrived before a handler was set", shared.name),
    }
}

/// Runs exactly once per connection teardown: marks the channel closed,
/// fails outstanding waits, and notifies the close callback.
fn finish_close<F>(shared: &Arc<Shared<F>>, epoch: u64) {
    if shared.epoch.load(Ordering::SeqCst) != epoch
        || shared.finished.swap(true, Ordering::SeqCst)
    {
        return;
    }
    shared.open.store(false, Ordering::SeqCst);

    let waits: Vec<Wait<F>> = std::mem::take(&mut *shared.waits.lock().expect("waits lock"));
    for wait in waits {
        let _ = wait.tx.send(Err(NetError::Closed));
    }

    let by_user = shared.closed_by_user.load(Ordering::SeqCst);
    let on_close = shared.on_close.lock().expect("on_close lock");
    if let Some(callback) = on_close.as_ref() {
        callback(by_user);
    }
}
