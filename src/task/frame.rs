use std::{
    fmt,
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
    thread,
};

use futures_lite::FutureExt;
use parking_lot::Mutex;

use crate::{
    error::{Error, Panicked, Result, UsageError},
    executors::context,
};

use super::promise::{Continuation, Promise};

type Body<T> = Pin<Box<dyn Future<Output = thread::Result<Result<T>>> + Send>>;

/// Process-unique identifier of a task, assigned when the task is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value of this id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of resuming a frame once.
#[derive(Debug)]
#[must_use = "a step names the frame the driver has to resume next"]
pub enum Step {
    /// Control moves to this frame: either a task the resumed body started awaiting, or
    /// the continuation of a body that just completed.
    Transfer(FrameRef),
    /// The body is waiting on something that is not a task; the same frame has to be
    /// resumed again once the waker passed to [`FrameRef::resume`] fires.
    Suspended,
    /// The root task of the chain completed; its result is ready to be read.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Created,
    Running,
    SuspendedNested,
    Completed,
    Done,
    TornDown,
}

pub(crate) trait Resume: Send + Sync {
    fn resume(self: Arc<Self>, cx: &mut Context<'_>) -> Step;

    fn task_id(&self) -> TaskId;

    fn finished(&self) -> bool;
}

/// Type-erased, shared reference to a task's execution state.
///
/// Continuations are stored as `FrameRef`s, and drivers step them with
/// [`resume`](FrameRef::resume). A `FrameRef` keeps the frame's allocation alive but does
/// not own the body: the owning [`Task`](crate::Task) does, and when it is dropped the body
/// is torn down and resuming the frame panics with [`UsageError::Destroyed`].
#[derive(Clone)]
pub struct FrameRef(Arc<dyn Resume>);

impl FrameRef {
    /// Resumes the frame until it suspends or completes, and reports where control goes
    /// next.
    ///
    /// Each call runs exactly one step; a loop that keeps calling `resume` on whatever the
    /// previous step named is what chains awaits together without growing the stack.
    ///
    /// # Panics
    /// With a [`UsageError`] payload when the frame is already done, already running, or
    /// torn down, or when it completes without a continuation.
    pub fn resume(&self, cx: &mut Context<'_>) -> Step {
        Arc::clone(&self.0).resume(cx)
    }

    /// Id of the task this frame belongs to
    pub fn id(&self) -> TaskId {
        self.0.task_id()
    }

    /// Whether the task reached its done state
    pub fn is_done(&self) -> bool {
        self.0.finished()
    }
}

impl fmt::Debug for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrameRef").field(&self.id()).finish()
    }
}

struct State<T> {
    stage: Stage,
    promise: Promise<T>,
}

/// The execution state of one task: its suspended body plus its promise.
pub(crate) struct Frame<T> {
    id: TaskId,
    body: Mutex<Option<Body<T>>>,
    state: Mutex<State<T>>,
}

impl<T: Send + 'static> Frame<T> {
    pub(crate) fn new<F>(future: F) -> Arc<Self>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let id: TaskId = TaskId::next();
        tracing::trace!(task.id = %id, "task created");
        let body: Body<T> = Box::pin(AssertUnwindSafe(future).catch_unwind());
        Arc::new(Self {
            id,
            body: Mutex::new(Some(body)),
            state: Mutex::new(State {
                stage: Stage::Created,
                promise: Promise::new(),
            }),
        })
    }

    pub(crate) fn frame_ref(self: &Arc<Self>) -> FrameRef {
        FrameRef(Arc::clone(self) as Arc<dyn Resume>)
    }

    /// Makes the driver loop the continuation and returns the frame to resume first
    pub(crate) fn begin(self: &Arc<Self>) -> FrameRef {
        self.link(Continuation::Root);
        self.frame_ref()
    }

    fn enter_running(&self) {
        let mut state = self.state.lock();
        match state.stage {
            Stage::Created => tracing::trace!(task.id = %self.id, "task started"),
            Stage::SuspendedNested => {}
            Stage::Running => UsageError::AlreadyRunning.raise(),
            Stage::Completed | Stage::Done => UsageError::ResumedAfterDone.raise(),
            Stage::TornDown => UsageError::Destroyed.raise(),
        }
        state.stage = Stage::Running;
    }

    fn complete(&self, output: thread::Result<Result<T>>) -> Step {
        let outcome: Result<T> = match output {
            Ok(outcome) => outcome,
            Err(payload) => match payload.downcast::<UsageError>() {
                Ok(usage) => panic::resume_unwind(usage),
                Err(payload) => Err(Error::new(Panicked::from_payload(payload))),
            },
        };
        // locals of the finished body go away before anyone is resumed
        let body: Option<Body<T>> = self.body.lock().take();
        drop(body);
        tracing::trace!(task.id = %self.id, ok = outcome.is_ok(), "task completed");

        let continuation: Continuation = {
            let mut state = self.state.lock();
            state.promise.complete(outcome);
            state.stage = Stage::Completed;
            let Some(continuation) = state.promise.take_continuation() else {
                UsageError::MissingContinuation.raise();
            };
            state.stage = Stage::Done;
            continuation
        };
        match continuation {
            Continuation::Frame(next) => Step::Transfer(next),
            Continuation::Root => Step::Finished,
        }
    }
}

impl<T> Frame<T> {
    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn stage(&self) -> Stage {
        self.state.lock().stage
    }

    pub(crate) fn is_done(&self) -> bool {
        self.stage() == Stage::Done
    }

    pub(crate) fn link(&self, continuation: Continuation) {
        let mut state = self.state.lock();
        if state.stage == Stage::TornDown {
            UsageError::Destroyed.raise();
        }
        state.promise.set_continuation(continuation);
    }

    pub(crate) fn take_result(&self) -> Result<T> {
        let mut state = self.state.lock();
        match state.stage {
            Stage::Done => state.promise.take_result(),
            Stage::TornDown => UsageError::Destroyed.raise(),
            _ => UsageError::NotCompleted.raise(),
        }
    }

    /// Drops the body at its current suspension point without resuming it
    pub(crate) fn teardown(&self) {
        let body: Option<Body<T>> = self.body.lock().take();
        let continuation: Option<Continuation> = {
            let mut state = self.state.lock();
            if state.stage != Stage::Done {
                state.stage = Stage::TornDown;
            }
            state.promise.take_continuation()
        };
        if body.is_some() {
            tracing::trace!(task.id = %self.id, "task torn down");
        }
        // both may own other frames, so they are dropped with no lock held
        drop(continuation);
        drop(body);
    }
}

impl<T: Send + 'static> Resume for Frame<T> {
    fn resume(self: Arc<Self>, cx: &mut Context<'_>) -> Step {
        self.enter_running();
        let (poll, transfer) = {
            let mut body = self.body.lock();
            let Some(future) = body.as_mut() else {
                UsageError::Destroyed.raise();
            };
            context::enter(self.frame_ref(), || future.as_mut().poll(cx))
        };
        match poll {
            Poll::Pending => {
                self.state.lock().stage = Stage::SuspendedNested;
                match transfer {
                    Some(next) => {
                        tracing::trace!(task.id = %self.id, to = %next.id(), "transfer into awaited task");
                        Step::Transfer(next)
                    }
                    None => Step::Suspended,
                }
            }
            Poll::Ready(output) => {
                drop(transfer);
                self.complete(output)
            }
        }
    }

    fn task_id(&self) -> TaskId {
        self.id
    }

    fn finished(&self) -> bool {
        self.is_done()
    }
}
