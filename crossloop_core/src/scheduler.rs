use std::future::Future;
use std::io;
use std::panic::resume_unwind;
use std::sync::{Arc, Mutex};
use std::thread;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::bridge::wrap;
use crate::defer::defer;
use crate::error::Error;
use crate::handle::{LoopHandle, LoopMessage};
use crate::promise::Promise;

/// Constructs the runtime a scheduler loop runs on.
pub type RuntimePolicy = Box<dyn FnOnce() -> io::Result<Runtime> + Send>;

fn default_runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Configures and creates a [`SchedulerThread`].
pub struct SchedulerBuilder {
    name: Option<String>,
    runtime: Option<RuntimePolicy>,
}

impl SchedulerBuilder {
    /// Names the background thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the default runtime construction policy (a current-thread
    /// runtime with timers and I/O enabled).
    pub fn runtime(
        mut self,
        policy: impl FnOnce() -> io::Result<Runtime> + Send + 'static,
    ) -> Self {
        self.runtime = Some(Box::new(policy));
        self
    }

    /// Creates the scheduler thread without starting it.
    pub fn build(self) -> SchedulerThread {
        SchedulerThread {
            lifecycle: Mutex::new(Lifecycle::Idle {
                name: self.name,
                runtime: self.runtime,
            }),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates the scheduler thread and starts it.
    pub fn spawn(self) -> Result<SchedulerThread, Error> {
        let scheduler = self.build();
        scheduler.start()?;
        Ok(scheduler)
    }
}

enum Lifecycle {
    Idle {
        name: Option<String>,
        runtime: Option<RuntimePolicy>,
    },
    Running {
        join: Option<thread::JoinHandle<()>>,
    },
    Stopped {
        // Left over by a non-blocking shutdown; a later blocking shutdown
        // reaps it.
        join: Option<thread::JoinHandle<()>>,
    },
}

/// A background thread that owns a private event loop from [`start`] until
/// [`shutdown`].
///
/// The loop exists only inside the background thread and becomes visible to
/// other threads once startup completes. Work reaches it exclusively through
/// [`LoopHandle::call_soon`] and [`LoopHandle::spawn`]; [`submit`] wraps the
/// latter so the caller can await the result under its own affinity.
///
/// The underlying OS thread is one-shot: once a scheduler has stopped it
/// cannot be started again, and [`start`] reports [`Error::AlreadyStarted`].
/// Dropping a running scheduler shuts it down and joins the thread, so a
/// scheduler owned by a scope never outlives it, even when the scope
/// unwinds.
///
/// [`start`]: SchedulerThread::start
/// [`shutdown`]: SchedulerThread::shutdown
/// [`submit`]: SchedulerThread::submit
pub struct SchedulerThread {
    lifecycle: Mutex<Lifecycle>,
    slot: Arc<Mutex<Option<LoopHandle>>>,
}

impl SchedulerThread {
    /// Returns a builder for configuring a scheduler thread.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder {
            name: None,
            runtime: None,
        }
    }

    /// Creates a scheduler thread with the default configuration, without
    /// starting it.
    pub fn new() -> SchedulerThread {
        Self::builder().build()
    }

    /// Launches the background thread and blocks until its loop exists.
    ///
    /// A no-op when the loop is already running. Fails with
    /// [`Error::AlreadyStarted`] once the scheduler has stopped, and with
    /// [`Error::LoopConstruction`] when the background thread cannot build
    /// its runtime; in that case the thread has already exited without
    /// running anything. A panic in the runtime policy resumes on the
    /// calling thread.
    pub fn start(&self) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        match &mut *lifecycle {
            Lifecycle::Running { join } => {
                if self.slot.lock().unwrap().is_some() {
                    return Ok(());
                }
                // The loop stopped behind our back, through its own handle;
                // the thread is spent.
                let join = join.take();
                *lifecycle = Lifecycle::Stopped { join: None };
                drop(lifecycle);
                if let Some(join) = join {
                    join_loop_thread(join);
                }
                Err(Error::AlreadyStarted)
            }
            Lifecycle::Stopped { .. } => Err(Error::AlreadyStarted),
            Lifecycle::Idle { name, runtime } => {
                let name = name.take();
                let policy = runtime.take().unwrap_or_else(|| Box::new(default_runtime));
                let slot = Arc::clone(&self.slot);
                let (ready_tx, ready_rx) = crossbeam_channel::bounded::<io::Result<()>>(1);

                let mut builder = thread::Builder::new();
                if let Some(name) = &name {
                    builder = builder.name(name.clone());
                }
                let join = match builder.spawn(move || run_loop(name, policy, slot, ready_tx)) {
                    Ok(join) => join,
                    Err(err) => {
                        *lifecycle = Lifecycle::Stopped { join: None };
                        return Err(Error::LoopConstruction(err));
                    }
                };

                match ready_rx.recv() {
                    Ok(Ok(())) => {
                        *lifecycle = Lifecycle::Running { join: Some(join) };
                        Ok(())
                    }
                    Ok(Err(err)) => {
                        *lifecycle = Lifecycle::Stopped { join: None };
                        drop(lifecycle);
                        join_loop_thread(join);
                        Err(Error::LoopConstruction(err))
                    }
                    Err(_) => {
                        // The thread died before signaling; surface whatever
                        // took it down.
                        *lifecycle = Lifecycle::Stopped { join: None };
                        drop(lifecycle);
                        match join.join() {
                            Err(payload) => resume_unwind(payload),
                            Ok(()) => Err(Error::LoopConstruction(io::Error::new(
                                io::ErrorKind::Other,
                                "scheduler thread exited before signaling readiness",
                            ))),
                        }
                    }
                }
            }
        }
    }

    /// Handle to the owned loop.
    ///
    /// Fails with [`Error::NotRunning`] before startup completes and after
    /// the loop exits.
    pub fn handle(&self) -> Result<LoopHandle, Error> {
        self.slot.lock().unwrap().clone().ok_or(Error::NotRunning)
    }

    /// Runs `work` on the owned loop and returns a promise observable under
    /// the caller's own affinity.
    ///
    /// Fails synchronously with [`Error::NotRunning`] when the scheduler was
    /// never started or has stopped; misuse never turns into a hang.
    pub fn submit<F>(&self, work: F) -> Result<Promise<F::Output>, Error>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let target = self.handle()?;
        let source = target.spawn(work)?;
        Ok(wrap(&source, &target))
    }

    /// Stops the loop and, when `wait` is set, blocks until the background
    /// thread has fully exited.
    ///
    /// A no-op when the scheduler was never started, and safe to call any
    /// number of times. The stop instruction travels through the loop's own
    /// scheduling queue, so the loop finishes the callback it is in before
    /// winding down. A panic on the background thread is resumed here when
    /// joining.
    pub fn shutdown(&self, wait: bool) {
        let mut join = None;
        {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            match &mut *lifecycle {
                Lifecycle::Idle { .. } => return,
                Lifecycle::Running { join: pending } => {
                    if let Some(handle) = &*self.slot.lock().unwrap() {
                        let _ = handle.request_stop();
                    }
                    let pending = pending.take();
                    if wait {
                        *lifecycle = Lifecycle::Stopped { join: None };
                        join = pending;
                    } else {
                        *lifecycle = Lifecycle::Stopped { join: pending };
                    }
                }
                Lifecycle::Stopped { join: pending } => {
                    if wait {
                        join = pending.take();
                    }
                }
            }
        }
        if let Some(join) = join {
            join_loop_thread(join);
        }
    }

    /// Releases the scheduler without stopping its loop.
    ///
    /// The loop keeps running until something requests a stop through its
    /// handle. Used for fire-and-forget loops that stop themselves.
    pub fn detach(self) {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        *lifecycle = Lifecycle::Stopped { join: None };
    }
}

impl Default for SchedulerThread {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SchedulerThread {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

fn join_loop_thread(join: thread::JoinHandle<()>) {
    if let Err(payload) = join.join() {
        if !thread::panicking() {
            resume_unwind(payload);
        }
    }
}

fn run_loop(
    name: Option<String>,
    policy: RuntimePolicy,
    slot: Arc<Mutex<Option<LoopHandle>>>,
    ready: crossbeam_channel::Sender<io::Result<()>>,
) {
    let name = name.unwrap_or_else(|| "scheduler".to_owned());
    log::trace!("scheduler loop '{name}' starting");
    let _exit = defer(move || log::trace!("scheduler loop '{name}' exiting"));

    let runtime = match policy() {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = LoopHandle::new(tx);

    // The loop becomes visible to other threads here, just before the
    // starting caller is released.
    *slot.lock().unwrap() = Some(handle.clone());
    let visible = Arc::clone(&slot);
    let _clear = defer(move || {
        visible.lock().unwrap().take();
    });

    LoopHandle::set_current(Some(handle));
    let _reset = defer(|| LoopHandle::set_current(None));

    if ready.send(Ok(())).is_err() {
        // The starting thread gave up; nothing can reach this loop.
        return;
    }

    let local = LocalSet::new();
    local.block_on(&runtime, async move {
        while let Some(message) = rx.recv().await {
            match message {
                LoopMessage::Call(f) => f(),
                LoopMessage::Stop => break,
            }
        }
    });
    // Dropping the local set cancels whatever is still in flight; each
    // task's settle guard reports the cancellation to its awaiter.
}

/// Runs one future on a throwaway scheduler thread.
///
/// The loop stops itself once the work settles (with a value, a panic, or a
/// cancellation) and the thread exits on its own; the caller only awaits
/// the returned promise.
pub fn run_in_thread<F>(work: F) -> Result<Promise<F::Output>, Error>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let scheduler = SchedulerThread::builder().name("crossloop-oneshot").spawn()?;
    let target = scheduler.handle()?;
    let stopper = target.clone();
    let source = target.spawn(async move {
        let _stop = defer(move || {
            let _ = stopper.request_stop();
        });
        work.await
    })?;
    let observed = wrap(&source, &target);
    scheduler.detach();
    Ok(observed)
}
