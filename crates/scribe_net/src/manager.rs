use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use session_logging::session_warn;

use crate::channel::Channel;
use crate::endpoint::EndpointResolver;
use crate::error::NetError;
use crate::frame::{ChatFrame, ChatRequest, JobFrame, JobRequest};
use crate::reconnect::ReconnectPolicy;

/// Transport tunables. Defaults match the backend's expectations.
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub connect_timeout: Duration,
    pub reconnect_base_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub clear_history_timeout: Duration,
    pub campaign_id: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            reconnect_base_delay: Duration::from_secs(1),
            max_reconnect_attempts: 5,
            clear_history_timeout: Duration::from_secs(5),
            campaign_id: "default".to_string(),
        }
    }
}

/// What to start the import job from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPayload {
    Url(String),
    RawJson(String),
}

impl ImportPayload {
    fn into_request(self) -> JobRequest {
        match self {
            ImportPayload::Url(url) => JobRequest::CreateCharacter {
                url: Some(url),
                json_data: None,
            },
            ImportPayload::RawJson(json_data) => JobRequest::CreateCharacter {
                url: None,
                json_data: Some(json_data),
            },
        }
    }
}

/// Transport-side events delivered to the session layer, in the order the
/// channels produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    JobChannelOpened,
    Job(JobFrame),
    /// The job channel dropped without an explicit close. A close during an
    /// in-flight job is a job failure; the channel never reconnects.
    JobChannelClosed,
    JobOpenFailed { error: String },
    Chat(ChatFrame),
    ChatOpenFailed { error: String },
    ChatReconnecting { attempt: u32, delay: Duration },
    ChatReconnected,
    /// Reconnect attempts exhausted; terminal until the caller re-opens.
    ChatConnectionLost { error: String },
    ChatSendFailed { error: String },
    ClearHistoryFailed { error: String },
}

/// Owns both duplex channels: the one-shot import job channel and the
/// reconnecting conversational channel.
pub struct ConnectionManager {
    config: NetConfig,
    resolver: EndpointResolver,
    job: Channel<JobFrame>,
    chat: Channel<ChatFrame>,
    chat_backoff: Arc<StdMutex<ReconnectPolicy>>,
    events: Sender<NetEvent>,
}

impl ConnectionManager {
    pub fn new(resolver: EndpointResolver, config: NetConfig, events: Sender<NetEvent>) -> Self {
        let job = Channel::new("job-channel");
        let chat = Channel::new("chat-channel");
        let chat_backoff = Arc::new(StdMutex::new(ReconnectPolicy::new(
            config.reconnect_base_delay,
            config.max_reconnect_attempts,
        )));

        let manager = Self {
            config,
            resolver,
            job,
            chat,
            chat_backoff,
            events,
        };
        manager.install_handlers();
        manager
    }

    fn install_handlers(&self) {
        let events = self.events.clone();
        self.job.set_handler(move |frame| {
            let _ = events.send(NetEvent::Job(frame));
        });

        let events = self.events.clone();
        self.job.set_on_close(move |by_user| {
            if !by_user {
                let _ = events.send(NetEvent::JobChannelClosed);
            }
        });

        let events = self.events.clone();
        self.chat.set_handler(move |frame| {
            let _ = events.send(NetEvent::Chat(frame));
        });

        let chat = self.chat.clone();
        let resolver = self.resolver.clone();
        let connect_timeout = self.config.connect_timeout;
        let backoff = Arc::clone(&self.chat_backoff);
        let events = self.events.clone();
        self.chat.set_on_close(move |by_user| {
            if !by_user {
                spawn_chat_reconnect(
                    chat.clone(),
                    resolver.clone(),
                    connect_timeout,
                    Arc::clone(&backoff),
                    events.clone(),
                );
            }
        });
    }

    /// Opens the job channel and submits the import request. The channel is
    /// one job per connection; reopening after a finished job starts a new
    /// run.
    pub async fn start_import(&self, payload: ImportPayload) {
        let endpoint = match self.resolver.job_endpoint() {
            Ok(endpoint) => endpoint,
            Err(err) => {
                let _ = self.events.send(NetEvent::JobOpenFailed {
                    error: err.to_string(),
                });
                return;
            }
        };
        if let Err(err) = self.job.connect(&endpoint, self.config.connect_timeout).await {
            let _ = self.events.send(NetEvent::JobOpenFailed {
                error: err.to_string(),
            });
            return;
        }
        let _ = self.events.send(NetEvent::JobChannelOpened);

        if let Err(err) = self.job.send(&payload.into_request()).await {
            let _ = self.events.send(NetEvent::JobOpenFailed {
                error: err.to_string(),
            });
        }
    }

    /// Opens the conversational channel. Idempotent while it is open.
    pub async fn open_chat(&self) {
        let endpoint = match self.resolver.chat_endpoint() {
            Ok(endpoint) => endpoint,
            Err(err) => {
                let _ = self.events.send(NetEvent::ChatOpenFailed {
                    error: err.to_string(),
                });
                return;
            }
        };
        match self.chat.connect(&endpoint, self.config.connect_timeout).await {
            Ok(()) => self.chat_backoff.lock().expect("backoff lock").reset(),
            Err(err) => {
                let _ = self.events.send(NetEvent::ChatOpenFailed {
                    error: err.to_string(),
                });
            }
        }
    }

    pub async fn send_chat(&self, message: String, character_name: String) {
        let request = ChatRequest::Message {
            message,
            character_name,
            campaign_id: self.config.campaign_id.clone(),
        };
        if let Err(err) = self.chat.send(&request).await {
            let _ = self.events.send(NetEvent::ChatSendFailed {
                error: err.to_string(),
            });
        }
    }

    /// Clear-history round trip: the send is paired with a bounded wait for
    /// the server's `history_cleared` confirmation.
    pub async fn clear_history(&self, character_name: String) {
        let request = ChatRequest::ClearHistory {
            character_name,
            campaign_id: self.config.campaign_id.clone(),
        };
        if let Err(err) = self.chat.send(&request).await {
            let _ = self.events.send(NetEvent::ClearHistoryFailed {
                error: err.to_string(),
            });
            return;
        }
        let confirmation = self
            .chat
            .request(
                |frame| matches!(frame, ChatFrame::HistoryCleared),
                self.config.clear_history_timeout,
            )
            .await;
        if let Err(err) = confirmation {
            let _ = self.events.send(NetEvent::ClearHistoryFailed {
                error: err.to_string(),
            });
        }
    }

    pub async fn close_job(&self) {
        self.job.close().await;
    }

    pub async fn shutdown(&self) {
        self.job.close().await;
        self.chat.close().await;
    }
}

fn spawn_chat_reconnect(
    chat: Channel<ChatFrame>,
    resolver: EndpointResolver,
    connect_timeout: Duration,
    backoff: Arc<StdMutex<ReconnectPolicy>>,
    events: Sender<NetEvent>,
) {
    tokio::spawn(async move {
        loop {
            let delay = backoff.lock().expect("backoff lock").next_delay();
            let Some(delay) = delay else {
                let _ = events.send(NetEvent::ChatConnectionLost {
                    error: NetError::Connectivity.to_string(),
                });
                return;
            };
            let attempt = backoff.lock().expect("backoff lock").attempt();
            let _ = events.send(NetEvent::ChatReconnecting { attempt, delay });
            tokio::time::sleep(delay).await;

            let endpoint = match resolver.chat_endpoint() {
                Ok(endpoint) => endpoint,
                Err(err) => {
                    let _ = events.send(NetEvent::ChatConnectionLost {
                        error: err.to_string(),
                    });
                    return;
                }
            };
            match chat.connect(&endpoint, connect_timeout).await {
                Ok(()) => {
                    backoff.lock().expect("backoff lock").reset();
                    let _ = events.send(NetEvent::ChatReconnected);
                    return;
                }
                Err(err) => {
                    session_warn!("chat-channel: reconnect attempt {attempt} failed: {err}");
                }
            }
        }
    });
}
