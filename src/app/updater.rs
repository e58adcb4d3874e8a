use super::config::{
    ConfigError, DEFAULT_CONFIG_FILE, PropertyMap, UpdaterOptions, ValidatedConfig,
};
use super::worker::{Worker, WorkerState};
use crate::buffer::EventQueue;
use crate::domain::{Event, EventKind, UpdaterError};
use crate::reliability::DiagnosticsSink;
use crate::sender::{StatsSnapshot, TransmissionStats};
use parking_lot::Mutex;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Mutable start/stop state, guarded as one unit.
///
/// The lock is only ever held for field updates; `stop()` sleeps and
/// `join_worker()` waits with it released.
#[derive(Debug, Default)]
struct Control {
    started: bool,
    /// Set while a `stop()` is in its grace period.
    stopping: bool,
    worker: Option<Arc<Worker>>,
    ignore_tls_peer_verification: bool,
    no_proxy: bool,
}

/// Entry point for the embedding application.
///
/// The configuration is validated once, at construction. A facade built
/// from a bad configuration logs every problem to its diagnostics sink,
/// flushes it to a file, and stays inert: `start()` returns `false` forever.
///
/// The `post_*` and `update_*` methods only enqueue; they never block on the
/// network and never fail. Events queued before `start()` are sent once
/// the worker runs.
pub struct Updater {
    config: Option<ValidatedConfig>,
    options: UpdaterOptions,
    queue: Arc<EventQueue<Event>>,
    diagnostics: Arc<DiagnosticsSink>,
    stats: Arc<TransmissionStats>,
    control: Mutex<Control>,
}

impl Updater {
    /// Reads `updater.properties` from the working directory.
    pub fn from_default_file() -> Self {
        Self::from_file(DEFAULT_CONFIG_FILE)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::load(PropertyMap::from_file(path), UpdaterOptions::default())
    }

    pub fn from_reader(reader: impl Read) -> Self {
        Self::load(PropertyMap::from_reader(reader), UpdaterOptions::default())
    }

    pub fn from_properties(text: &str) -> Self {
        Self::with_options(PropertyMap::parse(text), UpdaterOptions::default())
    }

    pub fn with_options(properties: PropertyMap, options: UpdaterOptions) -> Self {
        Self::load(Ok(properties), options)
    }

    /// General constructor: a failed load is treated like an invalid
    /// configuration.
    pub fn load(properties: Result<PropertyMap, ConfigError>, options: UpdaterOptions) -> Self {
        let diagnostics = Arc::new(match &options.diagnostics_dir {
            Some(dir) => DiagnosticsSink::in_dir(dir),
            None => DiagnosticsSink::new(),
        });

        let config = match properties {
            Ok(map) => ValidatedConfig::from_properties(&map),
            Err(e) => Err(vec![e]),
        };

        let config = match config {
            Ok(config) => {
                debug!(?config, "Status updater configured");
                Some(config)
            }
            Err(errors) => {
                warn!(
                    problems = errors.len(),
                    "Status updater configuration rejected, updates disabled"
                );
                for error in &errors {
                    diagnostics.log(error.to_string());
                }
                diagnostics.flush();
                None
            }
        };

        Self {
            config,
            options,
            queue: Arc::new(EventQueue::new()),
            diagnostics,
            stats: Arc::new(TransmissionStats::new()),
            control: Mutex::new(Control::default()),
        }
    }

    /// Strict constructor: returns the validation errors instead of
    /// producing an inert facade. Nothing is written to disk.
    pub fn try_with_options(
        properties: PropertyMap,
        options: UpdaterOptions,
    ) -> Result<Self, UpdaterError> {
        ValidatedConfig::from_properties(&properties).map_err(UpdaterError::InvalidConfig)?;
        Ok(Self::with_options(properties, options))
    }

    pub fn try_from_file(
        path: impl AsRef<Path>,
        options: UpdaterOptions,
    ) -> Result<Self, UpdaterError> {
        Self::try_with_options(PropertyMap::from_file(path)?, options)
    }

    pub fn start(&self) -> bool {
        let mut control = self.control.lock();
        if control.started {
            return true;
        }
        let Some(config) = &self.config else {
            debug!("start() ignored: configuration is invalid");
            return false;
        };

        let settings = self
            .options
            .transport_settings(control.ignore_tls_peer_verification, control.no_proxy);
        let worker = Worker::new(
            config.clone(),
            Arc::clone(&self.diagnostics),
            Arc::clone(&self.queue),
            Arc::clone(&self.stats),
            Arc::clone(&self.options.transport_factory),
            settings,
            self.options.tick_interval,
            self.options.batch_mode,
        );

        // Queued ahead of the spawn so the first tick already has work.
        self.enqueue(EventKind::WorkerStarted, "Status updates started");
        if !worker.execute() {
            return false;
        }

        info!(url = %config.url, item_id = %config.item_id, "Status updater started");
        control.started = true;
        control.worker = Some(Arc::new(worker));
        true
    }

    /// Enqueues the stop marker, waits `stop_grace` for the worker to send
    /// it, then signals the worker and flushes diagnostics. Does not join.
    ///
    /// Other facade calls are not blocked during the grace period. A second
    /// `stop()` racing with the first returns immediately.
    pub fn stop(&self) -> bool {
        let worker = {
            let mut control = self.control.lock();
            if !control.started || control.stopping {
                return true;
            }
            control.stopping = true;
            control.worker.clone()
        };

        self.enqueue(EventKind::WorkerStopped, "Status updates stopped");
        thread::sleep(self.options.stop_grace);

        if let Some(worker) = &worker {
            worker.request_stop();
        }
        {
            let mut control = self.control.lock();
            control.started = false;
            control.stopping = false;
        }

        let file = self.diagnostics.flush();
        info!(
            pending = self.queue.len(),
            diagnostics_file = %file,
            "Status updater stopped"
        );
        true
    }

    pub fn post_file_created(&self, path: impl AsRef<str>) {
        self.enqueue(EventKind::FileCreated, path.as_ref());
    }

    pub fn post_file_modified(&self, path: impl AsRef<str>) {
        self.enqueue(EventKind::FileModified, path.as_ref());
    }

    pub fn post_file_deleted(&self, path: impl AsRef<str>) {
        self.enqueue(EventKind::FileDeleted, path.as_ref());
    }

    pub fn post_message(&self, text: impl AsRef<str>) {
        self.enqueue(EventKind::Message, text.as_ref());
    }

    /// Percentage, clamped to `[0, 100]`.
    pub fn update_progress(&self, value: impl Into<f64>) {
        self.enqueue(EventKind::ProgressUpdated, &encode_percentage(value.into()));
    }

    /// Percentage, clamped to `[0, 100]`.
    pub fn update_convergence(&self, value: impl Into<f64>) {
        self.enqueue(
            EventKind::ConvergenceUpdated,
            &encode_percentage(value.into()),
        );
    }

    /// Applies to the next `start()`; a running worker keeps its settings.
    pub fn set_ignore_tls_peer_verification(&self, ignore: bool) {
        self.control.lock().ignore_tls_peer_verification = ignore;
    }

    /// Applies to the next `start()`; a running worker keeps its settings.
    pub fn set_no_proxy(&self, no_proxy: bool) {
        self.control.lock().no_proxy = no_proxy;
    }

    pub fn is_started(&self) -> bool {
        self.control.lock().started
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    pub fn worker_state(&self) -> Option<WorkerState> {
        self.control.lock().worker.as_ref().map(|worker| worker.state())
    }

    /// Bounded wait for the most recent worker thread to exit.
    /// Returns `true` if there is no worker or it has finished.
    pub fn join_worker(&self, timeout: Duration) -> bool {
        let worker = self.control.lock().worker.clone();
        match worker {
            Some(worker) => worker.join_for(timeout),
            None => true,
        }
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn diagnostics(&self) -> Arc<DiagnosticsSink> {
        Arc::clone(&self.diagnostics)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn options(&self) -> &UpdaterOptions {
        &self.options
    }

    fn enqueue(&self, kind: EventKind, payload: &str) {
        self.queue.push(Event::new(kind, payload));
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        let control = self.control.get_mut();
        if let Some(worker) = &control.worker {
            worker.request_stop();
        }
        if control.started {
            self.diagnostics.flush();
        }
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("config", &self.config)
            .field("options", &self.options)
            .field("queue", &self.queue)
            .field("control", &self.control)
            .finish()
    }
}

fn encode_percentage(value: f64) -> String {
    let clamped = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    };
    // `+ 0.0` turns -0.0 into 0.0
    format!("{}", clamped + 0.0)
}
