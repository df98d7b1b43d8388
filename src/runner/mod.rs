pub mod command;
pub mod rules;
pub mod session;
pub mod stream;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::release::ReleaseLookup;
use crate::ui::logs::SessionLogFile;

use command::{ScriptCatalog, UpdateCommand};
use rules::{Effect, PercentWindow, RuleSet};
pub use session::{Channel, SessionState, UpdateFailure, UpdateMode, UpdateSession};

/// Default pause between a terminal marker and the terminal state, so the
/// last line of the log stays readable.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_millis(2000);

/// How long a process gets to exit after SIGTERM before it is killed.
const TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// How long buffered output is still accepted after the process exited.
const DRAIN_WINDOW: Duration = Duration::from_millis(500);

/// The fragment a process-less session replays when the resolver found no
/// prerelease.
const NO_PRERELEASE_FRAGMENT: &str = "No prereleases found.\n";

// ---------------------------------------------------------------------------
// RunnerError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("an update session is already running")]
    AlreadyRunning,

    #[error("a full update needs the administrator password")]
    MissingCredential,

    #[error("failed to start the update process")]
    Spawn(#[source] std::io::Error),

    #[error("failed to load update scripts")]
    ScriptLoad(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// RunnerSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub shell: PathBuf,
    pub scripts: ScriptCatalog,
    pub grace_delay: Duration,
    /// Where session log files go. No log file is written when unset.
    pub log_dir: Option<PathBuf>,
    /// Extra environment for the script process.
    pub env: BTreeMap<String, String>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("/bin/zsh"),
            scripts: ScriptCatalog::embedded(),
            grace_delay: DEFAULT_GRACE_DELAY,
            log_dir: None,
            env: BTreeMap::new(),
        }
    }
}

impl RunnerSettings {
    /// Replace the embedded scripts with the ones found in `dir`.
    pub fn with_scripts_dir(mut self, dir: &std::path::Path) -> Result<Self, RunnerError> {
        self.scripts = ScriptCatalog::load_dir(dir).map_err(RunnerError::ScriptLoad)?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Read access to a session plus the ability to cancel it. Cloning a handle
/// is cheap; all clones observe the same session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<UpdateSession>,
    cancel: CancellationToken,
    /// Cancelled by the controller once the process is reaped and the log
    /// is flushed.
    finished: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.rx.borrow().id
    }

    /// A receiver that is notified on every change to the session.
    pub fn subscribe(&self) -> watch::Receiver<UpdateSession> {
        self.rx.clone()
    }

    pub fn snapshot(&self) -> UpdateSession {
        self.rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.rx.borrow().is_running()
    }

    /// True once the update process has been reaped. A session can reach a
    /// terminal state while its process is still shutting down.
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// Ask the update process to terminate. The state transition happens
    /// when the process exits, not here.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the session reaches a terminal state and its process is
    /// gone, then return the final session.
    pub async fn wait(&self) -> UpdateSession {
        let mut rx = self.rx.clone();
        // An error means the controller is gone; what it left behind is final.
        let _ = rx.wait_for(|s| s.state.is_terminal()).await;
        self.finished.cancelled().await;
        let session = rx.borrow().clone();
        session
    }
}

// ---------------------------------------------------------------------------
// UpdateRunner
// ---------------------------------------------------------------------------

/// Owns at most one running update session at a time.
pub struct UpdateRunner {
    settings: RunnerSettings,
    next_id: u64,
    current: Option<SessionHandle>,
}

impl UpdateRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self {
            settings,
            next_id: 1,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }

    /// Launch the script for `mode`/`channel` and return a handle to the new
    /// session, which is already Running. Must be called inside a tokio
    /// runtime.
    pub fn start(
        &mut self,
        mode: UpdateMode,
        channel: Channel,
        credential: Option<&str>,
    ) -> Result<SessionHandle, RunnerError> {
        self.ensure_idle()?;
        if mode.requires_credential() && credential.is_none_or(str::is_empty) {
            return Err(RunnerError::MissingCredential);
        }

        let update = UpdateCommand::build(
            &self.settings.shell,
            &self.settings.scripts,
            mode,
            channel,
            credential,
            self.settings.env.clone(),
        );
        let mut child = update.to_command().spawn().map_err(RunnerError::Spawn)?;
        info!(%mode, %channel, pid = ?child.id(), "update process started");

        let (frag_tx, frag_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            stream::spawn_fragment_reader(stdout, "stdout", frag_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            stream::spawn_fragment_reader(stderr, "stderr", frag_tx.clone());
        }
        drop(frag_tx);

        let rules = RuleSet::for_variant(mode, channel);
        Ok(self.launch(mode, channel, rules, Some(child), frag_rx))
    }

    /// Start a session after the release resolver has answered. A found
    /// release runs the script as usual; no prerelease produces a session
    /// without a process that ends exactly as if the script had reported it.
    pub fn start_after_check(
        &mut self,
        mode: UpdateMode,
        channel: Channel,
        credential: Option<&str>,
        lookup: &ReleaseLookup,
    ) -> Result<SessionHandle, RunnerError> {
        match lookup {
            ReleaseLookup::Found(tag) => {
                debug!(%tag, "release resolved, starting update");
                self.start(mode, channel, credential)
            }
            ReleaseLookup::NoPrereleaseFound => {
                self.ensure_idle()?;
                info!(%mode, %channel, "no prerelease published, nothing to run");
                let (frag_tx, frag_rx) = mpsc::unbounded_channel();
                let _ = frag_tx.send(NO_PRERELEASE_FRAGMENT.to_string());
                drop(frag_tx);
                let rules = RuleSet::for_variant(mode, Channel::Snapshot);
                Ok(self.launch(mode, channel, rules, None, frag_rx))
            }
        }
    }

    /// Cancel the current session, if any.
    pub fn cancel(&self) {
        if let Some(handle) = &self.current {
            handle.cancel();
        }
    }

    fn ensure_idle(&self) -> Result<(), RunnerError> {
        match &self.current {
            // The previous script may outlive its terminal state (grace delay,
            // SIGTERM window); never run two at once.
            Some(handle) if !handle.is_finished() => Err(RunnerError::AlreadyRunning),
            _ => Ok(()),
        }
    }

    fn launch(
        &mut self,
        mode: UpdateMode,
        channel: Channel,
        rules: RuleSet,
        child: Option<Child>,
        fragments: mpsc::UnboundedReceiver<String>,
    ) -> SessionHandle {
        let id = self.next_id;
        self.next_id += 1;

        let mut session = UpdateSession::new(id, mode, channel);
        session.begin();
        let (tx, rx) = watch::channel(session);
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();

        let controller = Controller {
            tx,
            tracker: ProgressTracker::new(rules),
            grace_delay: self.settings.grace_delay,
            log_dir: self.settings.log_dir.clone(),
            cancel: cancel.clone(),
            finished: finished.clone(),
        };
        tokio::spawn(controller.run(child, fragments));

        let handle = SessionHandle {
            rx,
            cancel,
            finished,
        };
        self.current = Some(handle.clone());
        handle
    }
}

// ---------------------------------------------------------------------------
// ProgressTracker — applies classified fragments to a session
// ---------------------------------------------------------------------------

/// Terminal outcome announced by the script but not yet applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Succeed,
    NothingToDo,
}

/// What the controller has to do after a fragment was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    StartGrace,
    Terminate,
}

#[derive(Debug)]
struct ProgressTracker {
    rules: RuleSet,
    window: Option<PercentWindow>,
    pending: Option<Pending>,
}

impl ProgressTracker {
    fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            window: None,
            pending: None,
        }
    }

    /// Append `fragment` to the log and apply it to the session.
    ///
    /// Each line segment of the fragment is matched against the rules, so a
    /// chunk that carries several markers applies all of them in order. The
    /// numeric fallback only sees fragments no rule claimed. Once an outcome
    /// is known, fragments are only logged.
    fn apply(&mut self, session: &mut UpdateSession, fragment: &str) -> Step {
        session.append_log(fragment);

        let mut claimed = false;
        for segment in fragment.split(['\n', '\r']) {
            if !session.is_running() || self.pending.is_some() {
                return Step::Continue;
            }
            let Some((effect, marker)) = self.rules.find_rule(segment) else {
                continue;
            };
            claimed = true;
            match effect {
                Effect::Checkpoint { percent, window } => {
                    session.advance_progress(*percent);
                    self.window = *window;
                }
                Effect::Succeed { percent } => {
                    if let Some(p) = percent {
                        session.advance_progress(*p);
                    }
                    self.pending = Some(Pending::Succeed);
                    return Step::StartGrace;
                }
                Effect::NothingToDo => {
                    self.pending = Some(Pending::NothingToDo);
                    return Step::StartGrace;
                }
                Effect::Fail(kind) => {
                    session.fail(kind.into_failure(segment, marker));
                    return Step::Terminate;
                }
                Effect::SuppressPercent => {}
            }
        }

        if !claimed && session.is_running() && self.pending.is_none() {
            if let (Some(window), Some(value)) = (self.window, self.rules.reported_percent(fragment)) {
                session.advance_progress(window.remap(value));
            }
        }
        Step::Continue
    }

    /// Apply the pending outcome once the grace delay is over.
    fn settle(&mut self, session: &mut UpdateSession) -> bool {
        match self.pending {
            Some(Pending::Succeed) => session.succeed(),
            Some(Pending::NothingToDo) => session.no_update(),
            None => false,
        }
    }

    /// The process is gone and its output drained. Without an announced
    /// outcome that is a failure, whatever the exit code.
    fn process_exited(&mut self, session: &mut UpdateSession, code: Option<i32>) -> bool {
        if self.pending.is_some() {
            return false;
        }
        session.fail(UpdateFailure::UnexpectedExit { code })
    }
}

// ---------------------------------------------------------------------------
// Controller — the single writer of a session
// ---------------------------------------------------------------------------

struct Controller {
    tx: watch::Sender<UpdateSession>,
    tracker: ProgressTracker,
    grace_delay: Duration,
    log_dir: Option<PathBuf>,
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl Controller {
    async fn run(mut self, mut child: Option<Child>, mut fragments: mpsc::UnboundedReceiver<String>) {
        let _finished = self.finished.clone().drop_guard();
        let mut log_file = self.open_log_file().await;

        let mut fragments_open = true;
        let mut exit_code: Option<Option<i32>> = None;
        let mut exit_evaluated = false;
        let mut grace_deadline: Option<Instant> = None;
        let mut kill_deadline: Option<Instant> = None;
        let mut drain_deadline: Option<Instant> = None;
        let mut cancel_seen = false;

        if child.is_none() {
            // Nothing to wait for.
            exit_code = Some(Some(0));
            drain_deadline = Some(Instant::now() + DRAIN_WINDOW);
        }

        loop {
            if exit_code.is_some() && !exit_evaluated && (!fragments_open || deadline_passed(drain_deadline)) {
                exit_evaluated = true;
                let code = exit_code.flatten();
                let mut failed = false;
                self.tx.send_modify(|s| failed = self.tracker.process_exited(s, code));
                if failed {
                    warn!(code = ?code, "update process exited without reporting an outcome");
                }
            }

            let state = self.tx.borrow().state;
            if exit_evaluated && state.is_terminal() {
                break;
            }

            tokio::select! {
                fragment = fragments.recv(), if fragments_open => {
                    let Some(fragment) = fragment else {
                        fragments_open = false;
                        continue;
                    };
                    if let Some(log) = log_file.as_mut() {
                        if let Err(e) = log.write(&fragment).await {
                            warn!(error = %e, "failed to write session log, disabling it");
                            log_file = None;
                        }
                    }
                    let mut step = Step::Continue;
                    self.tx.send_modify(|s| step = self.tracker.apply(s, &fragment));
                    match step {
                        Step::Continue => {}
                        Step::StartGrace => {
                            debug!(delay_ms = self.grace_delay.as_millis() as u64, "terminal marker seen");
                            grace_deadline = Some(Instant::now() + self.grace_delay);
                        }
                        Step::Terminate => {
                            let error = self.tx.borrow().error.clone();
                            warn!(error = ?error, "update script reported a failure");
                            if let Some(c) = child.as_mut().filter(|_| exit_code.is_none()) {
                                crate::platform::request_termination(c);
                                kill_deadline = Some(Instant::now() + TERMINATION_GRACE);
                            }
                        }
                    }
                }
                status = wait_child(&mut child), if exit_code.is_none() => {
                    let code = match status {
                        // None when killed by a signal.
                        Ok(status) => status.code(),
                        Err(e) => {
                            warn!(error = %e, "failed to wait on update process");
                            None
                        }
                    };
                    info!(code = ?code, "update process exited");
                    exit_code = Some(code);
                    kill_deadline = None;
                    drain_deadline = Some(Instant::now() + DRAIN_WINDOW);
                }
                _ = self.cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    if let Some(c) = child.as_mut().filter(|_| exit_code.is_none()) {
                        info!("cancellation requested, terminating update process");
                        crate::platform::request_termination(c);
                        kill_deadline = Some(Instant::now() + TERMINATION_GRACE);
                    }
                }
                _ = sleep_until(kill_deadline), if kill_deadline.is_some() => {
                    kill_deadline = None;
                    if let Some(c) = child.as_mut().filter(|_| exit_code.is_none()) {
                        warn!("update process ignored SIGTERM, killing it");
                        crate::platform::force_kill(c);
                    }
                }
                _ = sleep_until(grace_deadline), if grace_deadline.is_some() => {
                    grace_deadline = None;
                    let mut settled = false;
                    self.tx.send_modify(|s| settled = self.tracker.settle(s));
                    if settled {
                        let state = self.tx.borrow().state;
                        info!(state = %state, "update session finished");
                    }
                }
                _ = sleep_until(drain_deadline), if drain_deadline.is_some() && !exit_evaluated && fragments_open => {
                    debug!("output still open after exit, giving up on draining");
                }
            }
        }

        if let Some(log) = log_file {
            if let Err(e) = log.close().await {
                warn!(error = %e, "failed to flush session log");
            }
        }
        let session = self.tx.borrow();
        debug!(state = %session.state, error = ?session.error, "update controller stopped");
    }

    async fn open_log_file(&mut self) -> Option<SessionLogFile> {
        let dir = self.log_dir.as_ref()?;
        let started = self
            .tx
            .borrow()
            .started_at
            .map(|t| t.with_timezone(&chrono::Local))
            .unwrap_or_else(chrono::Local::now);
        match SessionLogFile::create(dir, started).await {
            Ok(file) => {
                let path = file.path().to_path_buf();
                debug!(path = %path.display(), "writing session log");
                self.tx.send_modify(|s| s.log_path = Some(path));
                Some(file)
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot create session log file");
                None
            }
        }
    }
}

async fn wait_child(child: &mut Option<Child>) -> std::io::Result<ExitStatus> {
    match child {
        Some(child) => child.wait().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
