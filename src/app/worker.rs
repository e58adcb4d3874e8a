use super::config::ValidatedConfig;
use crate::buffer::{BatchMode, EventQueue};
use crate::domain::Event;
use crate::reliability::DiagnosticsSink;
use crate::sender::{
    Envelope, TransmissionStats, Transport, TransportFactory, TransportSettings, form_body,
};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const WORKER_THREAD_NAME: &str = "status-updater-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            _ => WorkerState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Running => 1,
            WorkerState::Stopped => 2,
        }
    }
}

/// State shared between the worker handle and its thread.
#[derive(Debug)]
struct WorkerShared {
    state: AtomicU8,
    stop_requested: AtomicBool,
    finished: Mutex<bool>,
    finished_signal: Condvar,
}

impl WorkerShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Idle.as_u8()),
            stop_requested: AtomicBool::new(false),
            finished: Mutex::new(false),
            finished_signal: Condvar::new(),
        }
    }

    fn mark_stopped(&self) {
        self.state
            .store(WorkerState::Stopped.as_u8(), Ordering::Release);
        *self.finished.lock() = true;
        self.finished_signal.notify_all();
    }
}

/// Background sender: one OS thread that drains the queue, posts each batch
/// and sleeps for a tick.
///
/// Lifecycle is `Idle -> Running -> Stopped`; a stopped worker cannot be
/// restarted. The first failed post is fatal: it is written to the
/// diagnostics sink and the thread exits without retrying.
pub struct Worker {
    config: ValidatedConfig,
    diagnostics: Arc<DiagnosticsSink>,
    queue: Arc<EventQueue<Event>>,
    stats: Arc<TransmissionStats>,
    factory: Arc<dyn TransportFactory>,
    settings: TransportSettings,
    tick_interval: Duration,
    batch_mode: BatchMode,
    shared: Arc<WorkerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ValidatedConfig,
        diagnostics: Arc<DiagnosticsSink>,
        queue: Arc<EventQueue<Event>>,
        stats: Arc<TransmissionStats>,
        factory: Arc<dyn TransportFactory>,
        settings: TransportSettings,
        tick_interval: Duration,
        batch_mode: BatchMode,
    ) -> Self {
        Self {
            config,
            diagnostics,
            queue,
            stats,
            factory,
            settings,
            tick_interval,
            batch_mode,
            shared: Arc::new(WorkerShared::new()),
            handle: Mutex::new(None),
        }
    }

    /// Spawns the worker thread. Only valid once, from `Idle`.
    pub fn execute(&self) -> bool {
        if self
            .shared
            .state
            .compare_exchange(
                WorkerState::Idle.as_u8(),
                WorkerState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            warn!(state = ?self.state(), "Worker cannot be started again");
            return false;
        }

        let worker_loop = WorkerLoop {
            config: self.config.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
            queue: Arc::clone(&self.queue),
            stats: Arc::clone(&self.stats),
            factory: Arc::clone(&self.factory),
            settings: self.settings.clone(),
            tick_interval: self.tick_interval,
            batch_mode: self.batch_mode,
            shared: Arc::clone(&self.shared),
        };

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop.run_guarded());

        match spawned {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                true
            }
            Err(e) => {
                self.diagnostics
                    .log(format!("Failed to spawn status update worker: {}", e));
                self.shared.mark_stopped();
                false
            }
        }
    }

    /// Asks the loop to exit at its next tick. Never blocks.
    pub fn request_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_finished(&self) -> bool {
        *self.shared.finished.lock()
    }

    /// Waits up to `timeout` for the thread to exit and joins it if it did.
    /// Returns whether the thread has finished.
    pub fn join_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        {
            let mut finished = self.shared.finished.lock();
            while !*finished {
                if self
                    .shared
                    .finished_signal
                    .wait_until(&mut finished, deadline)
                    .timed_out()
                {
                    break;
                }
            }
            if !*finished {
                return false;
            }
        }

        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            warn!("Status update worker thread panicked");
        }
        true
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("state", &self.state())
            .field("stop_requested", &self.stop_requested())
            .field("tick_interval", &self.tick_interval)
            .field("batch_mode", &self.batch_mode)
            .finish()
    }
}

/// Everything the worker thread owns.
struct WorkerLoop {
    config: ValidatedConfig,
    diagnostics: Arc<DiagnosticsSink>,
    queue: Arc<EventQueue<Event>>,
    stats: Arc<TransmissionStats>,
    factory: Arc<dyn TransportFactory>,
    settings: TransportSettings,
    tick_interval: Duration,
    batch_mode: BatchMode,
    shared: Arc<WorkerShared>,
}

impl WorkerLoop {
    fn run_guarded(self) {
        let shared = Arc::clone(&self.shared);
        let diagnostics = Arc::clone(&self.diagnostics);

        if panic::catch_unwind(AssertUnwindSafe(|| self.run())).is_err() {
            diagnostics.log("Status update worker panicked; status updates stopped");
            shared.stop_requested.store(true, Ordering::Release);
        }
        shared.mark_stopped();
    }

    fn run(self) {
        let mut transport = self
            .factory
            .create(self.config.networking_tool.as_deref(), &self.settings);

        info!(
            backend = transport.name(),
            url = %self.config.url,
            batch_mode = ?self.batch_mode,
            "Status update worker started"
        );

        loop {
            if self.shared.stop_requested.load(Ordering::Acquire) {
                break;
            }

            let batch = self.queue.take_batch(self.batch_mode);
            if !batch.is_empty()
                && let Err(reason) = self.transmit(transport.as_mut(), &batch)
            {
                self.stats.record_failure();
                error!(
                    backend = transport.name(),
                    events = batch.len(),
                    "Status update failed: {}", reason
                );
                self.diagnostics
                    .log(format!("{}; status updates stopped", reason));
                self.shared.stop_requested.store(true, Ordering::Release);
                break;
            }

            thread::sleep(self.tick_interval);
        }

        info!(
            pending = self.queue.len(),
            "Status update worker stopped"
        );
    }

    fn transmit(&self, transport: &mut dyn Transport, batch: &[Event]) -> Result<(), String> {
        let envelope = Envelope::new(&self.config.item_id, &self.config.client_key, batch);
        let json = envelope.to_json().map_err(|e| e.to_string())?;
        let body = form_body(&json);

        let start = Instant::now();
        transport
            .post(
                &self.config.url,
                &body,
                &self.config.username,
                &self.config.password,
            )
            .map_err(|e| e.to_string())?;

        let latency = start.elapsed();
        self.stats.record_success(batch.len(), body.len(), latency);
        debug!(
            events = batch.len(),
            bytes = body.len(),
            ?latency,
            "Status update posted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventKind;
    use crate::sender::{MockTransport, TransportError};

    /// Hands out a single pre-built transport.
    struct OnceFactory(Mutex<Option<Box<dyn Transport>>>);

    impl TransportFactory for OnceFactory {
        fn create(&self, _name: Option<&str>, _settings: &TransportSettings) -> Box<dyn Transport> {
            self.0
                .lock()
                .take()
                .expect("transport requested more than once")
        }
    }

    fn config() -> ValidatedConfig {
        ValidatedConfig {
            url: "http://localhost/updates".to_string(),
            item_id: "item-1".to_string(),
            client_key: "k".repeat(40),
            username: "user".to_string(),
            password: "pass".to_string(),
            networking_tool: None,
        }
    }

    fn worker_with(
        transport: MockTransport,
        queue: Arc<EventQueue<Event>>,
    ) -> (Worker, Arc<DiagnosticsSink>) {
        let diagnostics = Arc::new(DiagnosticsSink::new());
        let factory = Arc::new(OnceFactory(Mutex::new(Some(Box::new(transport)))));
        let worker = Worker::new(
            config(),
            Arc::clone(&diagnostics),
            queue,
            Arc::new(TransmissionStats::new()),
            factory,
            TransportSettings::default(),
            Duration::from_millis(10),
            BatchMode::Single,
        );
        (worker, diagnostics)
    }

    #[test]
    fn test_posts_queued_event_with_credentials() {
        let mut transport = MockTransport::new();
        transport.expect_name().return_const("mock");
        transport
            .expect_post()
            .withf(|url, body, user, pass| {
                url.to_string() == "http://localhost/updates"
                    && body.starts_with("post=")
                    && body.contains("hello")
                    && user.to_string() == "user"
                    && pass.to_string() == "pass"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let queue = Arc::new(EventQueue::new());
        queue.push(Event::new(EventKind::Message, "hello"));

        let (worker, diagnostics) = worker_with(transport, Arc::clone(&queue));
        assert_eq!(worker.state(), WorkerState::Idle);
        assert!(worker.execute());

        let deadline = Instant::now() + Duration::from_secs(2);
        while !queue.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(30));

        worker.request_stop();
        assert!(worker.join_for(Duration::from_secs(2)));
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_post_failure_stops_worker_and_logs() {
        let mut transport = MockTransport::new();
        transport.expect_name().return_const("mock");
        transport.expect_post().times(1).returning(|_, _, _, _| {
            Err(TransportError::Http {
                status: 500,
                body: "boom".to_string(),
            })
        });

        let queue = Arc::new(EventQueue::new());
        queue.push(Event::new(EventKind::Message, "first"));
        queue.push(Event::new(EventKind::Message, "never sent"));

        let (worker, diagnostics) = worker_with(transport, Arc::clone(&queue));
        assert!(worker.execute());
        assert!(worker.join_for(Duration::from_secs(2)));

        assert!(worker.stop_requested());
        assert_eq!(queue.len(), 1);
        let entries = diagnostics.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("500"));
        assert!(entries[0].contains("status updates stopped"));
    }

    #[test]
    fn test_worker_cannot_be_restarted() {
        let mut transport = MockTransport::new();
        transport.expect_name().return_const("mock");

        let (worker, _) = worker_with(transport, Arc::new(EventQueue::new()));
        assert!(worker.execute());
        assert!(!worker.execute());

        worker.request_stop();
        assert!(worker.join_for(Duration::from_secs(2)));
        assert!(!worker.execute());
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_join_for_times_out_while_running() {
        let mut transport = MockTransport::new();
        transport.expect_name().return_const("mock");

        let (worker, _) = worker_with(transport, Arc::new(EventQueue::new()));
        assert!(worker.execute());
        assert!(!worker.join_for(Duration::from_millis(30)));
        assert_eq!(worker.state(), WorkerState::Running);

        worker.request_stop();
        assert!(worker.join_for(Duration::from_secs(2)));
    }
}
