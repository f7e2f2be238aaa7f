//! Single-worker playback job queue
//!
//! Owns the pending job list, the currently-playing slot, and the global
//! suppression window. Commands arrive from the bus and HTTP tasks; exactly
//! one worker task drains the queue, so at most one job is ever playing and
//! jobs play in strict enqueue order. `kill` and `time_out` are the only
//! interruptions, and they discard work rather than reorder it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use tannoy_common::events::{EventBus, TannoyEvent};

use crate::playback::task::PlaybackTask;
use crate::rooms::RoomController;

/// How often the worker re-checks readiness of the job at the head of the queue
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pause before the worker restarts after a crashed iteration
const RESTART_BACKOFF: Duration = Duration::from_millis(500);

/// An enqueued playback job
pub struct Job {
    pub id: Uuid,
    pub rooms: Vec<String>,
    pub volume: u8,
    pub task: Arc<dyn PlaybackTask>,
}

/// Snapshot of the queue for the status endpoint
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStatus {
    pub queued: usize,
    pub playing: Option<String>,
    pub suppressed_for_secs: u64,
}

struct QueueState {
    pending: Mutex<VecDeque<Job>>,
    current: Mutex<Option<Arc<dyn PlaybackTask>>>,
    /// Playback suppression deadline. Only ever extended, never shortened.
    silent_until: Mutex<Option<Instant>>,
    wakeup: Notify,
    events: EventBus,
}

/// The playback queue coordinator.
///
/// Cloning shares the underlying queue; all clones feed the single worker
/// task spawned by [`SoundQueue::start`].
#[derive(Clone)]
pub struct SoundQueue {
    state: Arc<QueueState>,
}

impl SoundQueue {
    /// Create the queue and spawn its worker. The worker takes exclusive
    /// ownership of the room controller; room and volume actuation only
    /// ever happens from the worker, immediately before playback.
    pub fn start(events: EventBus, rooms: RoomController) -> Self {
        let state = Arc::new(QueueState {
            pending: Mutex::new(VecDeque::new()),
            current: Mutex::new(None),
            silent_until: Mutex::new(None),
            wakeup: Notify::new(),
            events,
        });
        let queue = Self { state };
        let worker = queue.clone();
        tokio::spawn(async move { worker.run(rooms).await });
        queue
    }

    /// Append a job to the queue.
    ///
    /// Dropped silently while the suppression window is open; the task's
    /// `prepare` hook is not invoked for dropped jobs. Runs entirely on the
    /// caller's task and never waits for worker progress.
    pub async fn enqueue(&self, rooms: Vec<String>, volume: u8, task: Arc<dyn PlaybackTask>) {
        let remaining = self.suppression_remaining().await;
        if !remaining.is_zero() {
            debug!(
                "in time-out for another {}s, not queueing {}",
                remaining.as_secs(),
                task.describe()
            );
            return;
        }
        let job = Job {
            id: Uuid::new_v4(),
            rooms,
            volume,
            task,
        };
        debug!(job = %job.id, "queueing rooms={:?} task={}", job.rooms, job.task.describe());
        job.task.prepare().await;
        self.state.pending.lock().await.push_back(job);
        self.state.wakeup.notify_one();
    }

    /// Flush every queued job and abort the one currently playing.
    ///
    /// Queued jobs are discarded without any lifecycle calls; only the
    /// in-flight task (if any) gets an `abort`. Safe to call at any time,
    /// including when the queue is empty and nothing is playing.
    pub async fn kill(&self) {
        self.state.events.emit(TannoyEvent::KillReceived {
            timestamp: Utc::now(),
        });
        let flushed = {
            let mut pending = self.state.pending.lock().await;
            let n = pending.len();
            pending.clear();
            n
        };
        debug!("flushed {} queued jobs", flushed);
        let current = self.state.current.lock().await.clone();
        match current {
            Some(task) => {
                debug!("stopping current task {}", task.describe());
                task.abort().await;
            }
            None => debug!("no current task to abort"),
        }
    }

    /// Open (or extend) the suppression window and kill current playback.
    ///
    /// The deadline only ever moves forward: a later, shorter time-out
    /// cannot shorten a window already in force.
    pub async fn time_out(&self, seconds: u64) {
        let requested = Instant::now() + Duration::from_secs(seconds);
        let remaining = {
            let mut silent_until = self.state.silent_until.lock().await;
            let deadline = match *silent_until {
                Some(current) => current.max(requested),
                None => requested,
            };
            *silent_until = Some(deadline);
            deadline.duration_since(Instant::now())
        };
        info!("in time-out for the next {}s", remaining.as_secs());
        self.state.events.emit(TannoyEvent::TimeOutEntered {
            remaining_secs: remaining.as_secs(),
            timestamp: Utc::now(),
        });
        self.kill().await;
    }

    /// Snapshot for the status endpoint.
    pub async fn status(&self) -> QueueStatus {
        QueueStatus {
            queued: self.state.pending.lock().await.len(),
            playing: self
                .state
                .current
                .lock()
                .await
                .as_ref()
                .map(|task| task.describe()),
            suppressed_for_secs: self.suppression_remaining().await.as_secs(),
        }
    }

    async fn suppression_remaining(&self) -> Duration {
        match *self.state.silent_until.lock().await {
            Some(deadline) => deadline.duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Worker entry point: serve jobs forever, restarting after a crashed
    /// iteration. The worker must never permanently die.
    async fn run(&self, mut rooms: RoomController) {
        loop {
            let serve = std::panic::AssertUnwindSafe(self.serve(&mut rooms)).catch_unwind();
            if serve.await.is_err() {
                error!("playback worker crashed, restarting");
                *self.state.current.lock().await = None;
                tokio::time::sleep(RESTART_BACKOFF).await;
            }
        }
    }

    /// One lifetime of the worker loop: dequeue, gate on readiness, actuate
    /// rooms and volume, play. Exits only by panicking.
    async fn serve(&self, rooms: &mut RoomController) {
        loop {
            let job = self.next_job().await;
            debug!(job = %job.id, "dequeued rooms={:?} task={}", job.rooms, job.task.describe());
            // Head-of-line blocking is deliberate: nothing behind this job
            // starts until it is ready or the queue is killed.
            while !job.task.is_ready().await {
                debug!(job = %job.id, "waiting for task to become ready");
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
            rooms.set_rooms(&job.rooms);
            rooms.set_volume(job.volume).await;
            *self.state.current.lock().await = Some(Arc::clone(&job.task));
            self.state.events.emit(TannoyEvent::NowPlaying {
                rooms: job.rooms.clone(),
                volume: job.volume,
                description: job.task.describe(),
                timestamp: Utc::now(),
            });
            info!(
                job = %job.id,
                "playing rooms={} volume={}% task={}",
                job.rooms.join("-"),
                job.volume,
                job.task.describe()
            );
            job.task.play().await;
            *self.state.current.lock().await = None;
        }
    }

    async fn next_job(&self) -> Job {
        loop {
            if let Some(job) = self.state.pending.lock().await.pop_front() {
                return job;
            }
            self.state.wakeup.notified().await;
        }
    }
}
