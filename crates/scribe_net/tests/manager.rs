use std::sync::mpsc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use scribe_net::{
    ConnectionManager, EndpointResolver, ImportPayload, JobFrame, NetConfig, NetEvent, StageKey,
};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

fn test_config() -> NetConfig {
    NetConfig {
        connect_timeout: Duration::from_secs(2),
        clear_history_timeout: Duration::from_millis(300),
        campaign_id: "emberfall".to_string(),
        ..NetConfig::default()
    }
}

/// Accepts connections forever; each gets the same scripted conversation.
async fn script_server<F, Fut>(script: F) -> String
where
    F: Fn(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            script(ws).await;
        }
    });
    addr.to_string()
}

fn drain(events: &mpsc::Receiver<NetEvent>, deadline: Duration) -> Vec<NetEvent> {
    let end = Instant::now() + deadline;
    let mut seen = Vec::new();
    while Instant::now() < end {
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    seen
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn an_import_run_streams_job_frames_in_order() {
    let host = script_server(|mut ws| async move {
        let inbound = ws.next().await.expect("request").expect("ws ok");
        assert!(inbound.to_text().expect("text").contains("create_character"));

        for raw in [
            r#"{"type":"fetch_started","url":"https://example.com/characters/1"}"#,
            r#"{"type":"fetch_complete","name":"Mira"}"#,
            r#"{"type":"stage_started","stage":"core"}"#,
            r#"{"type":"stage_complete","stage":"core","completed":1,"execution_time_ms":11}"#,
            r#"{"type":"job_complete","summary":"1 section"}"#,
        ] {
            ws.send(Message::Text(raw.into())).await.expect("send");
        }
        let _ = ws.close(None).await;
    })
    .await;

    let (event_tx, event_rx) = mpsc::channel();
    let manager = ConnectionManager::new(EndpointResolver::new(host), test_config(), event_tx);

    manager
        .start_import(ImportPayload::Url(
            "https://example.com/characters/1".to_string(),
        ))
        .await;

    let events = tokio::task::spawn_blocking(move || drain(&event_rx, Duration::from_secs(1)))
        .await
        .expect("drain");
    let job_frames: Vec<JobFrame> = events
        .iter()
        .filter_map(|event| match event {
            NetEvent::Job(frame) => Some(frame.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(
        job_frames,
        vec![
            JobFrame::FetchStarted {
                url: "https://example.com/characters/1".to_string()
            },
            JobFrame::FetchComplete {
                name: "Mira".to_string()
            },
            JobFrame::StageStarted {
                stage: StageKey::Core
            },
            JobFrame::StageComplete {
                stage: StageKey::Core,
                completed: 1,
                execution_time_ms: 11
            },
            JobFrame::JobComplete {
                summary: "1 section".to_string(),
                data: None
            },
        ]
    );
    // The server hanging up after the job is reported; the session layer
    // decides whether a run was still in flight.
    assert!(events.contains(&NetEvent::JobChannelClosed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clear_history_times_out_when_unconfirmed() {
    let host = script_server(|mut ws| async move {
        // Swallow the clear_history request and never confirm.
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let (event_tx, event_rx) = mpsc::channel();
    let manager = ConnectionManager::new(EndpointResolver::new(host), test_config(), event_tx);

    manager.open_chat().await;
    manager.clear_history("Mira".to_string()).await;

    let events = tokio::task::spawn_blocking(move || drain(&event_rx, Duration::from_millis(500)))
        .await
        .expect("drain");
    assert!(events
        .iter()
        .any(|event| matches!(event, NetEvent::ClearHistoryFailed { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn an_unreachable_job_backend_fails_asynchronously() {
    // Nothing is listening on this port.
    let (event_tx, event_rx) = mpsc::channel();
    let manager = ConnectionManager::new(
        EndpointResolver::new("127.0.0.1:1"),
        test_config(),
        event_tx,
    );

    manager
        .start_import(ImportPayload::RawJson("{}".to_string()))
        .await;

    let events = tokio::task::spawn_blocking(move || drain(&event_rx, Duration::from_millis(300)))
        .await
        .expect("drain");
    assert!(events
        .iter()
        .any(|event| matches!(event, NetEvent::JobOpenFailed { .. })));
}
