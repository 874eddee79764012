//! Operation executor.
//!
//! Runs one resolved handler per invocation with:
//! - single-flight per user (a second command while one is running is answered
//!   with a busy notice, never queued)
//! - a per-command deadline, enforced by cooperative cancellation plus a grace
//!   period, after which the handler task is aborted
//! - guaranteed removal of the user's `ActiveOperation` on every exit path
//!
//! The active table is sharded by user id; locks are never held across an
//! `.await`, so unrelated users never wait on each other.

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinError,
    time::{sleep, timeout, Instant},
};
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};

use crate::{
    domain::{AttachmentRef, UserId},
    operation::{OperationContext, OperationError, OperationInput, Reply},
    registry::{CommandId, CommandSpec},
    router::InboundEvent,
};

pub const BUSY_MESSAGE: &str = "operation in progress";
pub const CAPACITY_MESSAGE: &str = "too many operations in progress";

const INTERNAL_ERROR_MESSAGE: &str = "⚠️ An error occurred while processing your request.\n\
🔧 Please try again or contact support if the problem persists.";
const TIMEOUT_MESSAGE: &str =
    "⏱ The operation did not complete in time. You can send the command again.";
const CANCELLED_MESSAGE: &str = "🛑 Operation cancelled. You can send the command again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    UserError,
    InternalError,
    Timeout,
}

/// The single result of one `execute` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub message: String,
    pub attachment: Option<AttachmentRef>,
}

impl ExecutionResult {
    pub fn ok(reply: Reply) -> Self {
        Self {
            outcome: Outcome::Ok,
            message: reply.text,
            attachment: reply.attachment,
        }
    }

    pub fn user_error(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::UserError,
            message: message.into(),
            attachment: None,
        }
    }

    /// Generic apology; details stay in the logs.
    pub fn internal_error() -> Self {
        Self {
            outcome: Outcome::InternalError,
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            attachment: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            outcome: Outcome::Timeout,
            message: TIMEOUT_MESSAGE.to_string(),
            attachment: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            outcome: Outcome::Timeout,
            message: CANCELLED_MESSAGE.to_string(),
            attachment: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.outcome == Outcome::UserError && self.message == BUSY_MESSAGE
    }
}

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Deadline for bare invocations (menu taps that only reply with text).
    pub instant_deadline: Duration,
    /// Deadline for invocations that carry a file, link or argument.
    pub file_deadline: Duration,
    pub deadline_overrides: HashMap<CommandId, Duration>,
    /// How long a cancelled handler may take to unwind before it is aborted.
    pub cancel_grace: Duration,
    /// Global cap on concurrently running operations (`None` = unbounded).
    pub max_in_flight: Option<usize>,
    pub shards: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            instant_deadline: Duration::from_secs(5),
            file_deadline: Duration::from_secs(300),
            deadline_overrides: HashMap::new(),
            cancel_grace: Duration::from_secs(2),
            max_in_flight: None,
            shards: 16,
        }
    }
}

impl ExecutorConfig {
    pub fn deadline_for(&self, command: CommandId, input: &OperationInput) -> Duration {
        if let Some(d) = self.deadline_overrides.get(&command) {
            return *d;
        }
        if input.is_none() {
            self.instant_deadline
        } else {
            self.file_deadline
        }
    }
}

/// An in-flight operation for one user.
#[derive(Clone, Debug)]
pub struct ActiveOperation {
    pub command: CommandId,
    pub started_at: Instant,
    pub cancel: CancellationToken,
}

type Shard = Mutex<HashMap<UserId, ActiveOperation>>;

struct ActiveTable {
    shards: Vec<Shard>,
}

impl ActiveTable {
    fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1))
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    fn lock(&self, user_id: UserId) -> MutexGuard<'_, HashMap<UserId, ActiveOperation>> {
        let mut h = DefaultHasher::new();
        user_id.hash(&mut h);
        let idx = (h.finish() % self.shards.len() as u64) as usize;
        self.shards[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn try_claim(self: &Arc<Self>, user_id: UserId, command: CommandId) -> Option<ActiveSlot> {
        let mut shard = self.lock(user_id);
        if shard.contains_key(&user_id) {
            return None;
        }
        let cancel = CancellationToken::new();
        shard.insert(
            user_id,
            ActiveOperation {
                command,
                started_at: Instant::now(),
                cancel: cancel.clone(),
            },
        );
        Some(ActiveSlot {
            table: Arc::clone(self),
            user_id,
            cancel,
        })
    }

    fn get(&self, user_id: UserId) -> Option<ActiveOperation> {
        self.lock(user_id).get(&user_id).cloned()
    }

    fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }
}

/// Ownership of a user's active entry. Dropping it fires the cancellation
/// token and clears the entry, so a dropped `execute` future cannot leave a
/// handler running unobserved.
struct ActiveSlot {
    table: Arc<ActiveTable>,
    user_id: UserId,
    cancel: CancellationToken,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.table.lock(self.user_id).remove(&self.user_id);
    }
}

enum Stop {
    Deadline,
    Cancelled,
}

type TaskOutput = Result<Result<Reply, OperationError>, JoinError>;
type Task = AbortOnDropHandle<Result<Reply, OperationError>>;

pub struct Executor {
    cfg: ExecutorConfig,
    active: Arc<ActiveTable>,
    permits: Option<Arc<Semaphore>>,
}

impl Executor {
    pub fn new(cfg: ExecutorConfig) -> Self {
        let active = Arc::new(ActiveTable::new(cfg.shards));
        let permits = cfg.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        Self {
            cfg,
            active,
            permits,
        }
    }

    pub fn is_busy(&self, user_id: UserId) -> bool {
        self.active.get(user_id).is_some()
    }

    pub fn active(&self, user_id: UserId) -> Option<ActiveOperation> {
        self.active.get(user_id)
    }

    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    /// Request cooperative cancellation of the user's running operation.
    pub fn cancel(&self, user_id: UserId) -> bool {
        match self.active.get(user_id) {
            Some(op) => {
                op.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        spec: &CommandSpec,
        event: &InboundEvent,
        input: OperationInput,
    ) -> ExecutionResult {
        let Some(slot) = self.active.try_claim(user_id, spec.id) else {
            tracing::info!(%user_id, command = %spec.id, "rejected: operation in progress");
            return ExecutionResult::user_error(BUSY_MESSAGE);
        };

        let _permit = match self.acquire_permit() {
            Ok(p) => p,
            Err(()) => {
                tracing::warn!(%user_id, command = %spec.id, "rejected: in-flight limit reached");
                return ExecutionResult::user_error(CAPACITY_MESSAGE);
            }
        };

        let deadline = self.cfg.deadline_for(spec.id, &input);
        let ctx = OperationContext::new(
            user_id,
            event.chat_id,
            spec.id,
            spec.input_kind,
            input,
            slot.cancel.clone(),
        );

        let started = Instant::now();
        let handler = Arc::clone(&spec.handler);
        // Declared after the slot: if this future is dropped the task is
        // aborted first, then the slot cancels and clears the entry.
        let mut task: Task =
            AbortOnDropHandle::new(tokio::spawn(async move { handler.run(ctx).await }));

        let stop = tokio::select! {
            biased;
            res = &mut task => {
                let result = self.finish(user_id, spec.id, res, None);
                log_finished(user_id, spec.id, &result, started);
                return result;
            }
            _ = sleep(deadline) => Stop::Deadline,
            _ = slot.cancel.cancelled() => Stop::Cancelled,
        };

        slot.cancel.cancel();
        let res = self.wind_down(task).await;
        let result = self.finish(user_id, spec.id, res, Some(stop));
        log_finished(user_id, spec.id, &result, started);
        result
    }

    fn acquire_permit(&self) -> Result<Option<OwnedSemaphorePermit>, ()> {
        match &self.permits {
            None => Ok(None),
            Some(sem) => Arc::clone(sem)
                .try_acquire_owned()
                .map(Some)
                .map_err(|_| ()),
        }
    }

    /// Give a cancelled handler its grace period, then abort it. Either way the
    /// handler future has been dropped by the time this returns.
    async fn wind_down(&self, mut task: Task) -> TaskOutput {
        match timeout(self.cfg.cancel_grace, &mut task).await {
            Ok(res) => res,
            Err(_) => {
                task.abort();
                task.await
            }
        }
    }

    fn finish(
        &self,
        user_id: UserId,
        command: CommandId,
        res: TaskOutput,
        stop: Option<Stop>,
    ) -> ExecutionResult {
        if let Some(stop) = stop {
            if let Some(failure) = unwind_failure(&res) {
                tracing::warn!(
                    %user_id,
                    %command,
                    %failure,
                    "operation did not unwind cleanly"
                );
            }
            return match stop {
                Stop::Deadline => ExecutionResult::timeout(),
                Stop::Cancelled => ExecutionResult::cancelled(),
            };
        }

        match res {
            Ok(Ok(reply)) => ExecutionResult::ok(reply),
            Ok(Err(OperationError::Invalid(msg))) => ExecutionResult::user_error(msg),
            Ok(Err(OperationError::Cancelled)) => ExecutionResult::cancelled(),
            Ok(Err(OperationError::Fault(e))) => {
                tracing::error!(%user_id, %command, error = %e, "operation failed");
                ExecutionResult::internal_error()
            }
            Err(e) => {
                tracing::error!(%user_id, %command, error = %e, "operation task panicked");
                ExecutionResult::internal_error()
            }
        }
    }
}

/// What went wrong while a stopped handler was winding down, if anything.
/// A cooperative `Cancelled` or a late reply is a clean unwind.
fn unwind_failure(res: &TaskOutput) -> Option<String> {
    match res {
        Ok(Ok(_)) | Ok(Err(OperationError::Cancelled)) => None,
        Ok(Err(OperationError::Invalid(msg))) => Some(format!("rejected input: {msg}")),
        Ok(Err(OperationError::Fault(e))) => Some(format!("fault: {e}")),
        Err(e) if e.is_cancelled() => Some("ignored cancellation; aborted".to_string()),
        Err(e) => Some(format!("panicked: {e}")),
    }
}

fn log_finished(user_id: UserId, command: CommandId, result: &ExecutionResult, started: Instant) {
    tracing::info!(
        %user_id,
        %command,
        outcome = ?result.outcome,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "operation finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::ChatId,
        errors::Error,
        operation::Operation,
        registry::CommandSpec,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Operation for Counting {
        async fn run(&self, _ctx: OperationContext) -> Result<Reply, OperationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::text("done"))
        }
    }

    /// Blocks until released (or cancelled).
    struct Gated {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Operation for Gated {
        async fn run(&self, ctx: OperationContext) -> Result<Reply, OperationError> {
            self.started.notify_one();
            tokio::select! {
                _ = self.release.notified() => Ok(Reply::text("released")),
                _ = ctx.cancelled() => Err(OperationError::Cancelled),
            }
        }
    }

    struct Failing(fn() -> OperationError);

    #[async_trait]
    impl Operation for Failing {
        async fn run(&self, _ctx: OperationContext) -> Result<Reply, OperationError> {
            Err((self.0)())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Operation for Panicking {
        async fn run(&self, _ctx: OperationContext) -> Result<Reply, OperationError> {
            panic!("handler blew up");
        }
    }

    /// Sets its flag when dropped: stands in for a file handle or connection.
    struct ReleaseHook(Arc<AtomicBool>);

    impl Drop for ReleaseHook {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Holds a resource and sleeps past any deadline without checking for cancellation.
    struct Stubborn {
        released: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Operation for Stubborn {
        async fn run(&self, _ctx: OperationContext) -> Result<Reply, OperationError> {
            let _resource = ReleaseHook(Arc::clone(&self.released));
            sleep(Duration::from_secs(30)).await;
            Ok(Reply::text("too late"))
        }
    }

    /// Works in steps and checks the cancellation flag between them.
    struct Cooperative {
        observed_cancel: Arc<AtomicBool>,
        released: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Operation for Cooperative {
        async fn run(&self, ctx: OperationContext) -> Result<Reply, OperationError> {
            let _resource = ReleaseHook(Arc::clone(&self.released));
            loop {
                if ctx.checkpoint().is_err() {
                    self.observed_cancel.store(true, Ordering::SeqCst);
                    return Err(OperationError::Cancelled);
                }
                sleep(Duration::from_millis(10)).await;
            }
        }
    }

    /// Hands the cancellation flag to a detached worker, then sleeps without
    /// checking it, like a handler that delegates I/O to a background task.
    struct Delegating {
        worker_saw_cancel: Arc<AtomicBool>,
        released: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Operation for Delegating {
        async fn run(&self, ctx: OperationContext) -> Result<Reply, OperationError> {
            let _resource = ReleaseHook(Arc::clone(&self.released));
            let worker_ctx = ctx.clone();
            let seen = Arc::clone(&self.worker_saw_cancel);
            tokio::spawn(async move {
                worker_ctx.cancelled().await;
                seen.store(true, Ordering::SeqCst);
            });
            sleep(Duration::from_secs(30)).await;
            Ok(Reply::text("too late"))
        }
    }

    /// Fails with a fault instead of unwinding quietly once cancelled.
    struct FaultsOnCancel;

    #[async_trait]
    impl Operation for FaultsOnCancel {
        async fn run(&self, ctx: OperationContext) -> Result<Reply, OperationError> {
            ctx.cancelled().await;
            Err(OperationError::Fault(Error::External("upload torn down".to_string())))
        }
    }

    async fn wait_for(flag: &AtomicBool) {
        timeout(Duration::from_secs(2), async {
            while !flag.load(Ordering::SeqCst) {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("flag was never set");
    }

    fn spec_with(id: CommandId, op: Arc<dyn Operation>) -> CommandSpec {
        CommandSpec::builtin(id).with_handler(op)
    }

    fn event(user: i64) -> InboundEvent {
        InboundEvent::text(UserId(user), ChatId(user), "🔒")
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            instant_deadline: Duration::from_millis(100),
            file_deadline: Duration::from_millis(100),
            cancel_grace: Duration::from_millis(100),
            ..ExecutorConfig::default()
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
        })
    }

    fn gated() -> Arc<Gated> {
        Arc::new(Gated {
            started: Notify::new(),
            release: Notify::new(),
        })
    }

    async fn assert_accepts_next(exec: &Executor, user: i64) {
        assert!(!exec.is_busy(UserId(user)));
        let next = spec_with(CommandId::DecryptFile, counting());
        let res = exec
            .execute(UserId(user), &next, &event(user), OperationInput::None)
            .await;
        assert_eq!(res.outcome, Outcome::Ok);
    }

    #[tokio::test]
    async fn successful_run_returns_reply() {
        let exec = Executor::new(fast_config());
        let op = counting();
        let spec = spec_with(CommandId::EncryptFile, op.clone());
        let res = exec
            .execute(UserId(1), &spec, &event(1), OperationInput::None)
            .await;
        assert_eq!(res, ExecutionResult::ok(Reply::text("done")));
        assert_eq!(op.calls.load(Ordering::SeqCst), 1);
        assert_eq!(exec.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_command_from_same_user_is_rejected_while_first_runs() {
        let exec = Arc::new(Executor::new(ExecutorConfig::default()));
        let slow = gated();
        let first_spec = spec_with(CommandId::EncryptFile, slow.clone());

        let exec2 = Arc::clone(&exec);
        let first = tokio::spawn(async move {
            exec2
                .execute(UserId(1), &first_spec, &event(1), OperationInput::None)
                .await
        });
        slow.started.notified().await;
        assert!(exec.is_busy(UserId(1)));
        assert_eq!(
            exec.active(UserId(1)).map(|a| a.command),
            Some(CommandId::EncryptFile)
        );

        let second_op = counting();
        let second_spec = spec_with(CommandId::DecryptFile, second_op.clone());
        let res = exec
            .execute(UserId(1), &second_spec, &event(1), OperationInput::None)
            .await;
        assert_eq!(res, ExecutionResult::user_error(BUSY_MESSAGE));
        assert!(res.is_busy());
        assert_eq!(second_op.calls.load(Ordering::SeqCst), 0);

        slow.release.notify_one();
        let first_res = first.await.unwrap();
        assert_eq!(first_res.outcome, Outcome::Ok);
        assert_accepts_next(&exec, 1).await;
    }

    #[tokio::test]
    async fn active_entry_is_cleared_after_user_error() {
        let exec = Executor::new(fast_config());
        let spec = spec_with(
            CommandId::CloudDownload,
            Arc::new(Failing(|| OperationError::Invalid("bad link".to_string()))),
        );
        let res = exec
            .execute(UserId(2), &spec, &event(2), OperationInput::None)
            .await;
        assert_eq!(res, ExecutionResult::user_error("bad link"));
        assert_accepts_next(&exec, 2).await;
    }

    #[tokio::test]
    async fn active_entry_is_cleared_after_internal_error() {
        let exec = Executor::new(fast_config());
        let spec = spec_with(
            CommandId::CloudUpload,
            Arc::new(Failing(|| {
                OperationError::Fault(Error::External("provider unavailable".to_string()))
            })),
        );
        let res = exec
            .execute(UserId(3), &spec, &event(3), OperationInput::None)
            .await;
        assert_eq!(res.outcome, Outcome::InternalError);
        assert!(!res.message.contains("provider unavailable"));
        assert_accepts_next(&exec, 3).await;
    }

    #[tokio::test]
    async fn panicking_handler_is_contained() {
        let exec = Executor::new(fast_config());
        let spec = spec_with(CommandId::SocialDownload, Arc::new(Panicking));
        let res = exec
            .execute(UserId(4), &spec, &event(4), OperationInput::None)
            .await;
        assert_eq!(res.outcome, Outcome::InternalError);
        assert_accepts_next(&exec, 4).await;
    }

    #[tokio::test]
    async fn deadline_aborts_stubborn_handler_and_releases_resources() {
        let exec = Executor::new(fast_config());
        let released = Arc::new(AtomicBool::new(false));
        let spec = spec_with(
            CommandId::TelegramUpload,
            Arc::new(Stubborn {
                released: Arc::clone(&released),
            }),
        );

        let started = Instant::now();
        let res = exec
            .execute(UserId(5), &spec, &event(5), OperationInput::None)
            .await;
        assert_eq!(res, ExecutionResult::timeout());
        assert!(released.load(Ordering::SeqCst));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_accepts_next(&exec, 5).await;
    }

    #[tokio::test]
    async fn dropped_execute_cancels_and_aborts_its_handler() {
        let cfg = ExecutorConfig {
            instant_deadline: Duration::from_secs(30),
            ..fast_config()
        };
        let exec = Executor::new(cfg);
        let worker_saw_cancel = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));
        let spec = spec_with(
            CommandId::TelegramUpload,
            Arc::new(Delegating {
                worker_saw_cancel: Arc::clone(&worker_saw_cancel),
                released: Arc::clone(&released),
            }),
        );

        let res = timeout(
            Duration::from_millis(50),
            exec.execute(UserId(7), &spec, &event(7), OperationInput::None),
        )
        .await;
        assert!(res.is_err());
        assert!(!exec.is_busy(UserId(7)));

        wait_for(&worker_saw_cancel).await;
        wait_for(&released).await;
        assert_accepts_next(&exec, 7).await;
    }

    #[tokio::test]
    async fn fault_while_winding_down_still_reports_timeout() {
        let exec = Executor::new(fast_config());
        let spec = spec_with(CommandId::CloudUpload, Arc::new(FaultsOnCancel));
        let res = exec
            .execute(UserId(8), &spec, &event(8), OperationInput::None)
            .await;
        assert_eq!(res, ExecutionResult::timeout());
        assert_accepts_next(&exec, 8).await;
    }

    #[test]
    fn unwind_failures_are_described() {
        assert_eq!(unwind_failure(&Ok(Ok(Reply::text("late")))), None);
        assert_eq!(unwind_failure(&Ok(Err(OperationError::Cancelled))), None);
        let fault = unwind_failure(&Ok(Err(OperationError::Fault(Error::External(
            "upload torn down".to_string(),
        )))));
        assert_eq!(fault.as_deref(), Some("fault: external error: upload torn down"));
        assert_eq!(
            unwind_failure(&Ok(Err(OperationError::Invalid("bad".to_string())))).as_deref(),
            Some("rejected input: bad")
        );
    }

    #[tokio::test]
    async fn aborted_handler_is_reported_as_ignoring_cancellation() {
        let task = tokio::spawn(async {
            sleep(Duration::from_secs(30)).await;
            Ok::<_, OperationError>(Reply::text("never"))
        });
        task.abort();
        let res: TaskOutput = task.await;
        assert_eq!(
            unwind_failure(&res).as_deref(),
            Some("ignored cancellation; aborted")
        );
    }

    #[tokio::test]
    async fn deadline_is_observed_cooperatively() {
        let cfg = ExecutorConfig {
            cancel_grace: Duration::from_secs(5),
            ..fast_config()
        };
        let exec = Executor::new(cfg);
        let observed = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));
        let spec = spec_with(
            CommandId::ScrapeMediaDownload,
            Arc::new(Cooperative {
                observed_cancel: Arc::clone(&observed),
                released: Arc::clone(&released),
            }),
        );

        let started = Instant::now();
        let res = exec
            .execute(UserId(6), &spec, &event(6), OperationInput::None)
            .await;
        assert_eq!(res.outcome, Outcome::Timeout);
        assert!(observed.load(Ordering::SeqCst));
        assert!(released.load(Ordering::SeqCst));
        // Unwound at a checkpoint, well before the grace period ran out.
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_accepts_next(&exec, 6).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_user_does_not_delay_other_users() {
        let exec = Arc::new(Executor::new(ExecutorConfig::default()));
        let slow = gated();
        let slow_spec = spec_with(CommandId::CloudUpload, slow.clone());

        let exec_a = Arc::clone(&exec);
        let user_a = tokio::spawn(async move {
            exec_a
                .execute(UserId(10), &slow_spec, &event(10), OperationInput::None)
                .await
        });
        slow.started.notified().await;

        let instant = spec_with(CommandId::EncryptFile, counting());
        let started = Instant::now();
        let res = exec
            .execute(UserId(11), &instant, &event(11), OperationInput::None)
            .await;
        assert_eq!(res.outcome, Outcome::Ok);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(exec.is_busy(UserId(10)));

        slow.release.notify_one();
        assert_eq!(user_a.await.unwrap().outcome, Outcome::Ok);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_stops_running_operation() {
        let exec = Arc::new(Executor::new(ExecutorConfig::default()));
        assert!(!exec.cancel(UserId(20)));

        let slow = gated();
        let spec = spec_with(CommandId::TelegramDownload, slow.clone());
        let exec2 = Arc::clone(&exec);
        let run = tokio::spawn(async move {
            exec2
                .execute(UserId(20), &spec, &event(20), OperationInput::None)
                .await
        });
        slow.started.notified().await;

        assert!(exec.cancel(UserId(20)));
        let res = run.await.unwrap();
        assert_eq!(res, ExecutionResult::cancelled());
        assert_accepts_next(&exec, 20).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn in_flight_cap_rejects_other_users_when_full() {
        let cfg = ExecutorConfig {
            max_in_flight: Some(1),
            ..ExecutorConfig::default()
        };
        let exec = Arc::new(Executor::new(cfg));
        let slow = gated();
        let spec = spec_with(CommandId::CloudDownload, slow.clone());
        let exec2 = Arc::clone(&exec);
        let run = tokio::spawn(async move {
            exec2
                .execute(UserId(30), &spec, &event(30), OperationInput::None)
                .await
        });
        slow.started.notified().await;

        let other = spec_with(CommandId::EncryptFile, counting());
        let res = exec
            .execute(UserId(31), &other, &event(31), OperationInput::None)
            .await;
        assert_eq!(res, ExecutionResult::user_error(CAPACITY_MESSAGE));
        assert!(!exec.is_busy(UserId(31)));

        slow.release.notify_one();
        run.await.unwrap();
        assert_accepts_next(&exec, 31).await;
    }

    #[test]
    fn deadline_depends_on_input_and_overrides() {
        let mut cfg = ExecutorConfig::default();
        assert_eq!(
            cfg.deadline_for(CommandId::EncryptFile, &OperationInput::None),
            Duration::from_secs(5)
        );
        assert_eq!(
            cfg.deadline_for(
                CommandId::EncryptFile,
                &OperationInput::Attachment(AttachmentRef::new("f"))
            ),
            Duration::from_secs(300)
        );
        cfg.deadline_overrides
            .insert(CommandId::EncryptFile, Duration::from_secs(42));
        assert_eq!(
            cfg.deadline_for(CommandId::EncryptFile, &OperationInput::None),
            Duration::from_secs(42)
        );
    }
}
