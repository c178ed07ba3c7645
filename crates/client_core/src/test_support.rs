//! Transport doubles and an in-process chat server for tests.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::protocol::{
    ClientRequest, JoinRejected, OnlineUsers, Presence, ServerEvent, ServerSummary,
    UsernameCheckResponse, WireMessage,
};
use tokio::{net::TcpListener, sync::broadcast};
use url::Url;

use crate::transport::{Transport, TransportConnector, TransportError, TransportEvent};

#[derive(Default)]
struct ConnectorLog {
    opened: Vec<Url>,
    frames: Vec<String>,
    closed: bool,
}

/// Connector whose transports record every outbound frame.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    log: Arc<Mutex<ConnectorLog>>,
}

impl RecordingConnector {
    pub fn opened(&self) -> Vec<Url> {
        self.log.lock().expect("log").opened.clone()
    }

    pub fn frames(&self) -> Vec<String> {
        self.log.lock().expect("log").frames.clone()
    }

    pub fn requests(&self) -> Vec<ClientRequest> {
        self.frames()
            .iter()
            .map(|frame| ClientRequest::decode(frame).expect("client frame"))
            .collect()
    }

    pub fn closed(&self) -> bool {
        self.log.lock().expect("log").closed
    }
}

impl TransportConnector for RecordingConnector {
    fn open(
        &self,
        server_url: &Url,
        events: tokio::sync::mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.log
            .lock()
            .expect("log")
            .opened
            .push(server_url.clone());
        Ok(Box::new(RecordingTransport {
            log: Arc::clone(&self.log),
            events,
        }))
    }
}

/// Reports `Disconnected` on close, like the socket task does.
struct RecordingTransport {
    log: Arc<Mutex<ConnectorLog>>,
    events: tokio::sync::mpsc::Sender<TransportEvent>,
}

impl Transport for RecordingTransport {
    fn send_text(&self, frame: String) -> Result<(), TransportError> {
        let mut log = self.log.lock().expect("log");
        if log.closed {
            return Err(TransportError::Closed);
        }
        log.frames.push(frame);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        self.log.lock().expect("log").closed = true;
        let _ = self.events.try_send(TransportEvent::Disconnected {
            reason: Some("client closed connection".to_string()),
        });
        Ok(())
    }
}

pub fn frame(event: ServerEvent) -> TransportEvent {
    TransportEvent::Frame(event.to_frame().expect("server frame"))
}

#[derive(Debug, Clone, Copy)]
enum Audience {
    Only(u64),
    All,
    AllExcept(u64),
}

impl Audience {
    fn includes(self, connection_id: u64) -> bool {
        match self {
            Self::Only(id) => id == connection_id,
            Self::All => true,
            Self::AllExcept(id) => id != connection_id,
        }
    }
}

#[derive(Default)]
struct Room {
    online: Vec<(u64, String)>,
    received: Vec<ClientRequest>,
}

impl Room {
    fn users(&self) -> Vec<String> {
        self.online.iter().map(|(_, name)| name.clone()).collect()
    }

    fn name_of(&self, connection_id: u64) -> Option<String> {
        self.online
            .iter()
            .find(|(id, _)| *id == connection_id)
            .map(|(_, name)| name.clone())
    }

    fn remove(&mut self, connection_id: u64) -> Option<String> {
        let index = self.online.iter().position(|(id, _)| *id == connection_id)?;
        Some(self.online.remove(index).1)
    }
}

#[derive(Clone)]
struct ServerState {
    room: Arc<Mutex<Room>>,
    frames: broadcast::Sender<(Audience, String)>,
    next_connection: Arc<AtomicU64>,
    servers: Arc<Vec<ServerSummary>>,
}

impl ServerState {
    fn emit(&self, audience: Audience, event: ServerEvent) {
        let frame = event.to_frame().expect("server frame");
        let _ = self.frames.send((audience, frame));
    }

    fn handle(&self, connection_id: u64, request: ClientRequest) {
        let mut room = self.room.lock().expect("room");
        room.received.push(request.clone());
        match request {
            ClientRequest::JoinRoom { username } => {
                if room.online.iter().any(|(_, name)| username == *name.as_str()) {
                    self.emit(
                        Audience::Only(connection_id),
                        ServerEvent::JoinError(JoinRejected {
                            message: "用户名已存在".to_string(),
                        }),
                    );
                    return;
                }
                room.online
                    .push((connection_id, username.as_str().to_string()));
                let online_users = room.users();
                self.emit(
                    Audience::AllExcept(connection_id),
                    ServerEvent::UserJoined(Presence {
                        username: username.into_inner(),
                    }),
                );
                self.emit(
                    Audience::Only(connection_id),
                    ServerEvent::JoinSuccess(OnlineUsers {
                        online_users: online_users.clone(),
                    }),
                );
                self.emit(
                    Audience::All,
                    ServerEvent::UpdateUsers(OnlineUsers { online_users }),
                );
            }
            ClientRequest::SendMessage { message, timestamp } => {
                let Some(username) = room.name_of(connection_id) else {
                    return;
                };
                self.emit(
                    Audience::All,
                    ServerEvent::NewMessage(WireMessage {
                        username,
                        kind: "normal".to_string(),
                        message,
                        timestamp: Some(timestamp),
                        ..WireMessage::default()
                    }),
                );
            }
            ClientRequest::LeaveRoom => {
                if let Some(username) = room.remove(connection_id) {
                    self.emit(
                        Audience::AllExcept(connection_id),
                        ServerEvent::UserLeft(Presence { username }),
                    );
                }
            }
        }
    }

    fn drop_connection(&self, connection_id: u64) {
        let mut room = self.room.lock().expect("room");
        if let Some(username) = room.remove(connection_id) {
            self.emit(
                Audience::AllExcept(connection_id),
                ServerEvent::UserLeft(Presence { username }),
            );
            self.emit(
                Audience::All,
                ServerEvent::UpdateUsers(OnlineUsers {
                    online_users: room.users(),
                }),
            );
        }
    }
}

/// Minimal chat server with the same room semantics the client expects.
pub struct TestChatServer {
    pub origin: Url,
    state: ServerState,
}

impl TestChatServer {
    pub async fn spawn(servers: Vec<ServerSummary>) -> Self {
        let (frames, _) = broadcast::channel(256);
        let state = ServerState {
            room: Arc::new(Mutex::new(Room::default())),
            frames,
            next_connection: Arc::new(AtomicU64::new(1)),
            servers: Arc::new(servers),
        };
        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/servers", get(list_servers))
            .route("/api/check_username", get(check_username))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr: SocketAddr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            origin: Url::parse(&format!("http://{addr}/")).expect("origin"),
            state,
        }
    }

    pub fn online(&self) -> Vec<String> {
        self.state.room.lock().expect("room").users()
    }

    pub fn received(&self) -> Vec<ClientRequest> {
        self.state.room.lock().expect("room").received.clone()
    }

    pub fn broadcast(&self, event: ServerEvent) {
        self.state.emit(Audience::All, event);
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: ServerState, socket: WebSocket) {
    let connection_id = state.next_connection.fetch_add(1, Ordering::SeqCst);
    let (mut sender, mut receiver) = socket.split();
    let mut frames_rx = state.frames.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok((audience, frame)) = frames_rx.recv().await {
            if !audience.includes(connection_id) {
                continue;
            }
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => {
                if let Ok(request) = ClientRequest::decode(&text) {
                    state.handle(connection_id, request);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.drop_connection(connection_id);
    send_task.abort();
}

async fn list_servers(State(state): State<ServerState>) -> Json<Vec<ServerSummary>> {
    Json(state.servers.as_ref().clone())
}

#[derive(Deserialize)]
struct CheckUsernameQuery {
    username: String,
}

async fn check_username(
    State(state): State<ServerState>,
    Query(q): Query<CheckUsernameQuery>,
) -> Json<UsernameCheckResponse> {
    let exists = state
        .room
        .lock()
        .expect("room")
        .online
        .iter()
        .any(|(_, name)| *name == q.username);
    Json(UsernameCheckResponse { exists })
}
