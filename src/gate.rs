//! 单槽准入控制 (Single-slot admission control)
//!
//! At most one detection pass runs at a time; frames arriving while the
//! slot is occupied are dropped, not queued. `DetectWorker` implements the
//! policy with a bounded(1) channel feeding a background thread, so the
//! feeding side (the UI/capture loop in the original) never blocks.
//! `BusyGate` is the same policy as a bare atomic flag for callers that
//! run detection on their own thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Result;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use image::RgbImage;

use crate::session::{DetectReport, YoloSession};

/// Atomic busy flag with an RAII guard. `try_acquire` either takes the
/// single slot or reports it occupied; dropping the guard frees it.
#[derive(Clone, Default)]
pub struct BusyGate {
    busy: Arc<AtomicBool>,
}

pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<BusyGuard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(BusyGuard {
                busy: Arc::clone(&self.busy),
            })
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Annotated frame coming back from the worker.
pub struct WorkerResult {
    pub image: RgbImage,
    pub report: DetectReport,
}

/// Background detection thread behind a capacity-1 frame slot.
pub struct DetectWorker {
    frame_tx: Option<Sender<RgbImage>>,
    result_rx: Receiver<Result<WorkerResult>>,
    dropped: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl DetectWorker {
    /// Moves the session onto its own thread. The session must already be
    /// initialized; failed frames surface on the result channel.
    pub fn spawn(mut session: YoloSession) -> Self {
        let (frame_tx, frame_rx) = bounded::<RgbImage>(1);
        let (result_tx, result_rx) = unbounded();

        let handle = std::thread::spawn(move || {
            for mut frame in frame_rx.iter() {
                let outcome = session
                    .detect_and_render(&mut frame)
                    .map(|report| WorkerResult {
                        image: frame,
                        report,
                    });
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            frame_tx: Some(frame_tx),
            result_rx,
            dropped: Arc::new(AtomicU64::new(0)),
            handle: Some(handle),
        }
    }

    /// Non-blocking admission: `true` if the frame took the slot, `false`
    /// if it was dropped because a pass is still in flight.
    pub fn offer(&self, frame: RgbImage) -> bool {
        let Some(tx) = &self.frame_tx else {
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Frames rejected so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Completed passes, in completion order.
    pub fn results(&self) -> &Receiver<Result<WorkerResult>> {
        &self.result_rx
    }

    /// Closes the frame slot, waits for in-flight work and returns the
    /// receiver so remaining results can be drained.
    pub fn finish(mut self) -> Receiver<Result<WorkerResult>> {
        self.frame_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.result_rx.clone()
    }
}

impl Drop for DetectWorker {
    fn drop(&mut self) {
        self.frame_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
