//! Realtime agent engine client implementation.
//!
//! This module provides the WebSocket client that implements the
//! [`AgentEngine`] trait against an event-streamed realtime engine endpoint
//! (e.g. OpenAI's Realtime API).
//!
//! # Protocol
//!
//! - Endpoint: `wss://<engine-host>/...?model=<model>`
//! - Transport: WebSocket with one JSON event per text frame
//! - Auth: `Authorization: Bearer <api key>`
//!
//! A spawned pump task owns the socket after connecting: it serializes
//! outgoing [`ClientEvent`]s from an mpsc channel onto the sink and parses
//! incoming frames into [`EngineEvent`]s delivered through the receiver
//! handed to the session via `take_events`. When the socket ends, for any
//! reason, the event channel closes and the owning session observes the
//! disconnect as end-of-stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use super::base::{AgentEngine, ConnectionState, EngineConfig, EngineError, EngineResult};
use super::events::{ClientEvent, EngineEvent, SessionBootstrap};

/// Channel capacity for event queues in both directions.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Realtime Engine Client
// =============================================================================

/// WebSocket client for an event-streamed realtime agent engine.
pub struct RealtimeEngineClient {
    /// Configuration
    config: EngineConfig,
    /// Parsed engine endpoint
    endpoint: Url,
    /// Connection state
    state: ConnectionState,
    /// Connected flag shared with the pump task
    connected: Arc<AtomicBool>,
    /// Sender half of the outgoing event channel
    outgoing: Option<mpsc::Sender<ClientEvent>>,
    /// Receiver half of the engine event channel, handed out once
    events: Option<mpsc::Receiver<EngineEvent>>,
    /// Pump task handle
    pump: Option<JoinHandle<()>>,
}

impl RealtimeEngineClient {
    /// Create a new client from configuration.
    ///
    /// Fails fast on a missing credential or a malformed endpoint so the
    /// session can report the problem before any handshake is attempted.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        if config.api_key.is_empty() {
            return Err(EngineError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let endpoint = Url::parse(&config.url)
            .map_err(|e| EngineError::InvalidConfiguration(format!("engine URL: {e}")))?;

        match endpoint.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(EngineError::InvalidConfiguration(format!(
                    "engine URL scheme must be ws or wss, got: {other}"
                )));
            }
        }

        if endpoint.host_str().is_none() {
            return Err(EngineError::InvalidConfiguration(
                "engine URL must have a host".to_string(),
            ));
        }

        Ok(Self {
            config,
            endpoint,
            state: ConnectionState::Disconnected,
            connected: Arc::new(AtomicBool::new(false)),
            outgoing: None,
            events: None,
            pump: None,
        })
    }

    /// Build the WebSocket URL with the model parameter.
    fn build_ws_url(&self) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("model", &self.config.model);
        url.to_string()
    }

    /// Build the upgrade request with authentication headers.
    fn build_request(&self) -> EngineResult<http::Request<()>> {
        // checked in new()
        let host = self
            .endpoint
            .host_str()
            .ok_or_else(|| EngineError::InvalidConfiguration("engine URL must have a host".to_string()))?
            .to_string();

        http::Request::builder()
            .uri(self.build_ws_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| EngineError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl AgentEngine for RealtimeEngineClient {
    async fn connect(&mut self) -> EngineResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;

        let request = self.build_request()?;
        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| {
                self.state = ConnectionState::Failed;
                EngineError::ConnectionFailed(e.to_string())
            })?;

        tracing::info!(endpoint = %self.endpoint, "Connected to agent engine");

        let (mut ws_sink, mut ws_source) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<ClientEvent>(EVENT_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(EVENT_CHANNEL_CAPACITY);

        let connected = self.connected.clone();
        connected.store(true, Ordering::SeqCst);
        self.state = ConnectionState::Connected;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Outgoing events from the owning session
                    outgoing = out_rx.recv() => {
                        let Some(event) = outgoing else {
                            // Session dropped the sender: intentional close
                            break;
                        };
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize engine event: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send engine event: {}", e);
                            break;
                        }
                    }

                    // Incoming frames from the engine
                    incoming = ws_source.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<EngineEvent>(&text) {
                                    Ok(event) => {
                                        if event_tx.send(event).await.is_err() {
                                            // Session stopped listening
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to parse engine event: {} - {}", e, text);
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                tracing::info!("Engine closed the WebSocket");
                                break;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong to engine: {}", e);
                                    break;
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::error!("Engine WebSocket error: {}", e);
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
            // event_tx drops here, ending the session's event stream
            tracing::debug!("Engine connection task ended");
        });

        self.pump = Some(handle);
        self.events = Some(event_rx);
        self.outgoing = Some(out_tx);

        // Bootstrap the session with instructions and text-only modality
        let bootstrap = ClientEvent::SessionUpdate {
            session: SessionBootstrap::text_only(self.config.instructions.clone()),
        };
        self.send_event(bootstrap).await?;

        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<EngineEvent>> {
        self.events.take()
    }

    async fn send_event(&mut self, event: ClientEvent) -> EngineResult<()> {
        match &self.outgoing {
            Some(tx) => tx.send(event).await.map_err(|_| EngineError::Closed),
            None => Err(EngineError::NotConnected),
        }
    }

    async fn close(&mut self) -> EngineResult<()> {
        // Dropping the sender lets the pump task wind down on its own;
        // aborting covers a pump blocked on the socket.
        self.outgoing = None;
        if let Some(handle) = self.pump.take() {
            handle.abort();
        }
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!(endpoint = %self.endpoint, "Disconnected from agent engine");
        }
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connection_state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            self.state
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
