use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use scribe_core::{ChatMsg, Effect, ImportSource, JobMsg, MetadataKind, Msg, StageId};
use scribe_net::{ChatFrame, ImportPayload, JobFrame, NetConfig, NetEvent, SessionNet, StageKey};
use session_logging::{session_info, session_warn};

use crate::config::SessionConfig;

/// Name sent on chat frames before an import has produced one.
const FALLBACK_CHARACTER_NAME: &str = "Adventurer";

/// Epoch milliseconds from the wall clock; stamped at the platform boundary
/// so the core stays clock-free.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Executes core effects against the transport and pumps transport events
/// back into the message queue.
pub struct EffectRunner {
    net: Arc<SessionNet>,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(config: &SessionConfig, msg_tx: mpsc::Sender<Msg>) -> Self {
        let net = Arc::new(SessionNet::new(
            config.host.clone(),
            NetConfig {
                campaign_id: config.campaign_id.clone(),
                ..NetConfig::default()
            },
        ));
        let runner = Self { net, msg_tx };
        runner.spawn_event_pump();
        runner.net.open_chat();
        runner
    }

    pub fn run(&self, effect: Effect) {
        match effect {
            Effect::OpenJobChannel { source } => {
                let payload = match source {
                    ImportSource::Url(url) => {
                        session_info!("starting import from {url}");
                        ImportPayload::Url(url)
                    }
                    ImportSource::RawJson(raw) => {
                        session_info!("starting import from pasted JSON ({} bytes)", raw.len());
                        ImportPayload::RawJson(raw)
                    }
                };
                self.net.start_import(payload);
            }
            Effect::SendChat {
                text,
                character_name,
            } => {
                let name = character_name.unwrap_or_else(|| FALLBACK_CHARACTER_NAME.to_string());
                self.net.send_chat(text, name);
            }
            Effect::ClearHistory { character_name } => {
                let name = character_name.unwrap_or_else(|| FALLBACK_CHARACTER_NAME.to_string());
                self.net.clear_history(name);
            }
            Effect::ScheduleAutoAdvance { delay_ms } => {
                let tx = self.msg_tx.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(delay_ms));
                    let _ = tx.send(Msg::AutoAdvanceDue);
                });
            }
            // Draft effects are handled by the session, which owns the store.
            Effect::SaveDraft | Effect::ClearDraft => {
                session_warn!("draft effect reached the runner; dropped");
            }
        }
    }

    pub fn shutdown(&self) {
        self.net.shutdown();
    }

    fn spawn_event_pump(&self) {
        let net = Arc::clone(&self.net);
        let msg_tx = self.msg_tx.clone();
        thread::spawn(move || loop {
            if let Some(event) = net.try_recv() {
                // One job per connection: drop the channel once it reports a
                // terminal frame.
                if matches!(
                    event,
                    NetEvent::Job(JobFrame::JobComplete { .. })
                        | NetEvent::Job(JobFrame::JobError { .. })
                ) {
                    net.close_job();
                }
                if let Some(msg) = map_event(event) {
                    if msg_tx.send(msg).is_err() {
                        return;
                    }
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }
        });
    }
}

fn map_event(event: NetEvent) -> Option<Msg> {
    match event {
        NetEvent::JobChannelOpened => None,
        NetEvent::Job(frame) => Some(Msg::Job(map_job_frame(frame))),
        NetEvent::JobChannelClosed => Some(Msg::Job(JobMsg::ChannelClosed)),
        NetEvent::JobOpenFailed { error } => Some(Msg::Job(JobMsg::JobError {
            error,
            stage: None,
        })),
        NetEvent::Chat(frame) => map_chat_frame(frame).map(Msg::Chat),
        NetEvent::ChatOpenFailed { error } => Some(Msg::ChatConnectionLost { reason: error }),
        NetEvent::ChatReconnecting { attempt, delay } => {
            session_info!("chat reconnect attempt {attempt} in {delay:?}");
            None
        }
        NetEvent::ChatReconnected => {
            session_info!("chat channel reconnected");
            None
        }
        NetEvent::ChatConnectionLost { error } => {
            Some(Msg::ChatConnectionLost { reason: error })
        }
        NetEvent::ChatSendFailed { error } => {
            Some(Msg::Chat(ChatMsg::StreamError { error }))
        }
        NetEvent::ClearHistoryFailed { error } => {
            Some(Msg::Chat(ChatMsg::ClearHistoryFailed { error }))
        }
    }
}

fn map_job_frame(frame: JobFrame) -> JobMsg {
    match frame {
        JobFrame::FetchStarted { url } => JobMsg::FetchStarted { url },
        JobFrame::FetchComplete { name } => JobMsg::FetchComplete { name },
        JobFrame::StageStarted { stage } => JobMsg::StageStarted {
            stage: map_stage(stage),
        },
        JobFrame::StageProgress { stage, message } => JobMsg::StageProgress {
            stage: map_stage(stage),
            message,
        },
        JobFrame::StageComplete {
            stage,
            completed,
            execution_time_ms,
        } => JobMsg::StageComplete {
            stage: map_stage(stage),
            completed,
            execution_time_ms,
        },
        JobFrame::StageError { stage, error } => JobMsg::StageError {
            stage: map_stage(stage),
            error,
        },
        JobFrame::AssemblyStarted => JobMsg::AssemblyStarted,
        JobFrame::JobComplete { summary, data } => JobMsg::JobComplete { summary, data },
        JobFrame::JobError { error, stage } => JobMsg::JobError {
            error,
            stage: stage.map(map_stage),
        },
    }
}

fn map_chat_frame(frame: ChatFrame) -> Option<ChatMsg> {
    match frame {
        ChatFrame::ResponseChunk { content } => Some(ChatMsg::Chunk { content }),
        ChatFrame::ResponseComplete => Some(ChatMsg::Complete {
            timestamp_ms: now_ms(),
        }),
        ChatFrame::Error { error } => Some(ChatMsg::StreamError { error }),
        ChatFrame::MessageReceived => Some(ChatMsg::Ack),
        ChatFrame::HistoryCleared => Some(ChatMsg::HistoryCleared),
        ChatFrame::Pong => None,
        ChatFrame::RoutingMetadata { data } => Some(ChatMsg::Metadata {
            kind: MetadataKind::Routing,
            data,
        }),
        ChatFrame::EntitiesMetadata { data } => Some(ChatMsg::Metadata {
            kind: MetadataKind::Entities,
            data,
        }),
        ChatFrame::ContextSources { data } => Some(ChatMsg::Metadata {
            kind: MetadataKind::ContextSources,
            data,
        }),
        ChatFrame::PerformanceMetrics { data } => Some(ChatMsg::Metadata {
            kind: MetadataKind::PerformanceMetrics,
            data,
        }),
        ChatFrame::FeedbackId { data } => Some(ChatMsg::FeedbackId { id: data.id }),
    }
}

fn map_stage(stage: StageKey) -> StageId {
    match stage {
        StageKey::Core => StageId::Core,
        StageKey::Stats => StageId::Stats,
        StageKey::Inventory => StageId::Inventory,
        StageKey::Spells => StageId::Spells,
        StageKey::Features => StageId::Features,
        StageKey::Background => StageId::Background,
    }
}
