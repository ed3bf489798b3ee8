use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

use voodoo_player::{
    AvailabilityPoller, Configuration, HttpAvailabilityCheck, SessionController, SessionState,
    TracingEngine,
};

pub async fn cmd_watch(
    user_id: &str,
    stream_id: &str,
    show_preview: bool,
    interval_ms: u64,
    timeout_secs: Option<u64>,
    config: Configuration,
) -> Result<()> {
    let poller = AvailabilityPoller::new(Arc::new(HttpAvailabilityCheck::new()?))
        .with_interval(Duration::from_millis(interval_ms));
    let session = SessionController::spawn(Arc::new(TracingEngine::new()), poller, config);

    session
        .load_user_stream(user_id, stream_id, show_preview)
        .await?;

    let snapshot = session.snapshot();
    if let Some(ref descriptor) = snapshot.descriptor {
        eprintln!("🎬 Stream: {}/{}", descriptor.user_id, descriptor.id);
        eprintln!("   Canonical: {}", descriptor.canonical_url);
    }
    if snapshot.state.is_waiting_for_live() {
        eprintln!("⏳ Waiting for the stream to go live (Ctrl-C to stop)");
    }

    let timeout = async {
        match timeout_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };

    let outcome = tokio::select! {
        result = session.wait_for_state(SessionState::Playing) => {
            let snapshot = result?;
            if let Some(url) = snapshot.current_item {
                println!("{url}");
            }
            eprintln!("🔴 LIVE");
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("⏹  Stopped");
            Ok(())
        }
        () = timeout => Err(timeout_secs.unwrap_or_default()),
    };

    session.shutdown().await?;

    if let Err(secs) = outcome {
        bail!("stream did not go live within {secs}s");
    }
    Ok(())
}
