//! Session loop: drives one pipeline from PLAYING to NULL.
//!
//! Runs on the recorder's background thread inside a current-thread tokio
//! runtime. Bus messages arrive through an unbounded channel fed by the
//! bus sync handler; a stop request arrives through the cancellation token.

use std::path::PathBuf;
use std::sync::mpsc::SyncSender;
use std::time::{Duration, Instant};

use chrono::Utc;
use gstreamer as gst;
use gstreamer::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::caps::CameraCaps;
use crate::error::{RecorderError, Result};
use crate::recorder::RecordingSummary;
use crate::stats::SharedStats;

/// Everything the session thread owns.
pub(crate) struct Session {
    pub pipeline: gst::Pipeline,
    pub bus_rx: mpsc::UnboundedReceiver<gst::Message>,
    pub cancel: CancellationToken,
    pub stats: SharedStats,
    pub caps: CameraCaps,
    pub output: PathBuf,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

/// Thread entry point. The start outcome goes to `ready_tx`; the return
/// value is what `Recorder::stop` hands back.
pub(crate) fn run(
    session: Session,
    ready_tx: SyncSender<Result<()>>,
) -> Result<RecordingSummary> {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            shutdown(&session.pipeline);
            let _ = ready_tx.send(Err(e.into()));
            return Err(RecorderError::SessionLost);
        }
    };
    rt.block_on(drive(session, ready_tx))
}

async fn drive(
    session: Session,
    ready_tx: SyncSender<Result<()>>,
) -> Result<RecordingSummary> {
    let Session {
        pipeline,
        mut bus_rx,
        cancel,
        stats,
        caps,
        output,
        start_timeout,
        stop_timeout,
    } = session;

    if let Err(e) = start_playing(&pipeline, &mut bus_rx, start_timeout).await {
        tracing::warn!("recording failed to start: {}", e);
        shutdown(&pipeline);
        let _ = ready_tx.send(Err(e));
        return Err(RecorderError::SessionLost);
    }

    let started_at = Utc::now();
    let started = Instant::now();
    stats.set_recording(true);
    if ready_tx.send(Ok(())).is_err() {
        tracing::debug!("start caller went away, stopping");
        cancel.cancel();
    }
    tracing::info!("recording {} to {}", caps, output.display());

    let mut failure = None;
    let mut finalized = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("stop requested");
                break;
            }
            msg = bus_rx.recv() => {
                let Some(msg) = msg else {
                    tracing::warn!("bus channel closed");
                    break;
                };
                match msg.view() {
                    gst::MessageView::Eos(..) => {
                        tracing::warn!("stream ended before stop was requested");
                        finalized = true;
                        break;
                    }
                    gst::MessageView::Error(err) => {
                        let e = RecorderError::from_error_message(err);
                        tracing::error!("{}", e);
                        failure = Some(e);
                        break;
                    }
                    gst::MessageView::Warning(w) => {
                        tracing::warn!(
                            "warning from {:?}: {}",
                            w.src().map(|s| s.path_string()),
                            w.error()
                        );
                    }
                    gst::MessageView::StateChanged(s) if is_from(&msg, &pipeline) => {
                        tracing::debug!(
                            "pipeline state {:?} -> {:?} (pending {:?})",
                            s.old(),
                            s.current(),
                            s.pending()
                        );
                        stats.set_recording(s.current() == gst::State::Playing);
                    }
                    _ => {}
                }
            }
        }
    }

    if failure.is_none() && !finalized {
        match finish_stream(&pipeline, &mut bus_rx, stop_timeout).await {
            Ok(done) => finalized = done,
            Err(e) => failure = Some(e),
        }
    }

    shutdown(&pipeline);
    stats.set_recording(false);

    if let Some(e) = failure {
        return Err(e);
    }

    let summary = RecordingSummary {
        output,
        caps,
        frame_count: stats.frame_count(),
        last_frame_time: stats.last_frame_time(),
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        started_at,
        finalized,
    };
    tracing::info!(
        "recording finished: {} frames in {:.0} ms -> {}",
        summary.frame_count,
        summary.duration_ms,
        summary.output.display()
    );
    Ok(summary)
}

/// Set PLAYING and wait for the pipeline itself to report it.
async fn start_playing(
    pipeline: &gst::Pipeline,
    bus_rx: &mut mpsc::UnboundedReceiver<gst::Message>,
    timeout: Duration,
) -> Result<()> {
    if let Err(e) = pipeline.set_state(gst::State::Playing) {
        // The bus usually carries a more useful error than the state change.
        while let Ok(msg) = bus_rx.try_recv() {
            if let gst::MessageView::Error(err) = msg.view() {
                return Err(RecorderError::from_error_message(err));
            }
        }
        return Err(e.into());
    }

    let wait = async {
        while let Some(msg) = bus_rx.recv().await {
            match msg.view() {
                gst::MessageView::Error(err) => {
                    return Err(RecorderError::from_error_message(err));
                }
                gst::MessageView::Eos(..) => {
                    return Err(RecorderError::Pipeline {
                        source_path: pipeline.path_string().to_string(),
                        message: "stream ended before recording started".to_string(),
                        debug: None,
                    });
                }
                gst::MessageView::StateChanged(s)
                    if is_from(&msg, pipeline) && s.current() == gst::State::Playing =>
                {
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(RecorderError::SessionLost)
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(RecorderError::StartTimeout(timeout.as_millis() as u64)),
    }
}

/// Send end-of-stream and wait for it to reach the sink, so the muxer
/// writes its trailer. Returns whether EOS arrived in time.
async fn finish_stream(
    pipeline: &gst::Pipeline,
    bus_rx: &mut mpsc::UnboundedReceiver<gst::Message>,
    timeout: Duration,
) -> Result<bool> {
    if !pipeline.send_event(gst::event::Eos::new()) {
        tracing::warn!("pipeline refused end-of-stream, output may be truncated");
        return Ok(false);
    }

    let wait = async {
        while let Some(msg) = bus_rx.recv().await {
            match msg.view() {
                gst::MessageView::Eos(..) => return Ok(()),
                gst::MessageView::Error(err) => {
                    return Err(RecorderError::from_error_message(err));
                }
                _ => {}
            }
        }
        Err(RecorderError::SessionLost)
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(Ok(())) => Ok(true),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            tracing::warn!(
                "no end-of-stream after {} ms, output may be truncated",
                timeout.as_millis()
            );
            Ok(false)
        }
    }
}

/// Route every bus message into a channel the session loop can await.
pub(crate) fn forward_bus(
    pipeline: &gst::Pipeline,
) -> Result<mpsc::UnboundedReceiver<gst::Message>> {
    let bus = pipeline.bus().ok_or(RecorderError::SessionLost)?;
    let (bus_tx, bus_rx) = mpsc::unbounded_channel();
    bus.set_sync_handler(move |_, msg| {
        let _ = bus_tx.send(msg.clone());
        gst::BusSyncReply::Drop
    });
    Ok(bus_rx)
}

fn is_from(msg: &gst::Message, pipeline: &gst::Pipeline) -> bool {
    msg.src() == Some(pipeline.upcast_ref::<gst::Object>())
}

fn shutdown(pipeline: &gst::Pipeline) {
    if let Err(e) = pipeline.set_state(gst::State::Null) {
        tracing::warn!("failed to set pipeline to NULL: {}", e);
    }
    if let Some(bus) = pipeline.bus() {
        bus.unset_sync_handler();
    }
}
