use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::endpoint::EndpointResolver;
use crate::manager::{ConnectionManager, ImportPayload, NetConfig, NetEvent};

enum NetCommand {
    StartImport { payload: ImportPayload },
    OpenChat,
    SendChat { message: String, character_name: String },
    ClearHistory { character_name: String },
    CloseJob,
    Shutdown,
}

/// Sync handle over the transport: a dedicated thread hosts the tokio
/// runtime, commands go in over one mpsc pair and `NetEvent`s come back
/// over another. The session layer polls `try_recv` from its own loop.
pub struct SessionNet {
    cmd_tx: mpsc::Sender<NetCommand>,
    event_rx: Mutex<mpsc::Receiver<NetEvent>>,
}

impl SessionNet {
    pub fn new(host: impl Into<String>, config: NetConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let resolver = EndpointResolver::new(host);

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let manager = Arc::new(ConnectionManager::new(resolver, config, event_tx));
            while let Ok(command) = cmd_rx.recv() {
                if matches!(command, NetCommand::Shutdown) {
                    runtime.block_on(manager.shutdown());
                    break;
                }
                let manager = Arc::clone(&manager);
                runtime.spawn(async move {
                    handle_command(&manager, command).await;
                });
            }
        });

        Self {
            cmd_tx,
            event_rx: Mutex::new(event_rx),
        }
    }

    pub fn start_import(&self, payload: ImportPayload) {
        let _ = self.cmd_tx.send(NetCommand::StartImport { payload });
    }

    pub fn open_chat(&self) {
        let _ = self.cmd_tx.send(NetCommand::OpenChat);
    }

    pub fn send_chat(&self, message: impl Into<String>, character_name: impl Into<String>) {
        let _ = self.cmd_tx.send(NetCommand::SendChat {
            message: message.into(),
            character_name: character_name.into(),
        });
    }

    pub fn clear_history(&self, character_name: impl Into<String>) {
        let _ = self.cmd_tx.send(NetCommand::ClearHistory {
            character_name: character_name.into(),
        });
    }

    /// Explicitly closes the one-shot job channel after a finished run.
    pub fn close_job(&self) {
        let _ = self.cmd_tx.send(NetCommand::CloseJob);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(NetCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<NetEvent> {
        self.event_rx.lock().expect("event receiver lock").try_recv().ok()
    }
}

async fn handle_command(manager: &ConnectionManager, command: NetCommand) {
    match command {
        NetCommand::StartImport { payload } => manager.start_import(payload).await,
        NetCommand::OpenChat => manager.open_chat().await,
        NetCommand::SendChat {
            message,
            character_name,
        } => manager.send_chat(message, character_name).await,
        NetCommand::ClearHistory { character_name } => {
            manager.clear_history(character_name).await
        }
        NetCommand::CloseJob => manager.close_job().await,
        NetCommand::Shutdown => unreachable!("handled by the command loop"),
    }
}
