//! Session driver: one task per editing session.
//!
//! Everything flows through a single `select!` loop, so the session
//! needs no locks: commands from the handle, the debounce deadline, and
//! the in-flight save's completion are serialized by the event order.
//! Exactly one save is outstanding at a time; closing the driver lets an
//! in-flight save finish on its detached task, but the result never
//! reaches the (already closed) session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use autosave_core::client::{SaveClient, SaveError};
use autosave_core::entity::Editable;
use autosave_core::remote::RemoteCopy;
use autosave_core::scheduler::SaveStatus;
use autosave_core::session::EditSession;
use autosave_core::time;

/// Commands the application sends into the driver.
pub enum SessionCommand<E: Editable> {
    /// Merge a local field change.
    Edit(E::Patch),
    /// An authoritative copy arrived from the data source.
    Remote(RemoteCopy<E>),
    /// Save any unsaved content now (manual retry affordance).
    Flush,
    /// Query save status.
    Status(oneshot::Sender<SaveStatus>),
    /// Query the current buffer contents.
    Snapshot(oneshot::Sender<E>),
    /// Close the session.
    Close,
}

/// Handle to a running session driver.
pub struct SessionHandle<E: Editable> {
    tx: mpsc::UnboundedSender<SessionCommand<E>>,
    task: Option<JoinHandle<()>>,
}

impl<E: Editable> SessionHandle<E> {
    /// Merge a local field change into the session's buffer.
    pub fn edit(&self, patch: E::Patch) {
        let _ = self.tx.send(SessionCommand::Edit(patch));
    }

    /// Deliver an authoritative copy.
    pub fn remote(&self, copy: RemoteCopy<E>) {
        let _ = self.tx.send(SessionCommand::Remote(copy));
    }

    /// Ask for an immediate save of any unsaved content.
    pub fn flush(&self) {
        let _ = self.tx.send(SessionCommand::Flush);
    }

    /// Current save status, or `None` if the driver is gone.
    pub async fn status(&self) -> Option<SaveStatus> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Status(tx)).ok()?;
        rx.await.ok()
    }

    /// Current buffer contents, or `None` if the driver is gone.
    pub async fn snapshot(&self) -> Option<E> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    /// Close the session and wait for the driver task to finish.
    pub async fn close(mut self) {
        let _ = self.tx.send(SessionCommand::Close);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Spawn a driver task owning `session`, saving through `client`.
pub fn spawn_session<E, C>(session: EditSession<E>, client: Arc<C>) -> SessionHandle<E>
where
    E: Editable + Send + 'static,
    E::Patch: Send,
    C: SaveClient<E> + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let driver = Driver {
        session,
        client,
        rx,
        in_flight: None,
        epoch: tokio::time::Instant::now(),
        base_ms: time::now_ms(),
    };
    let task = tokio::spawn(driver.run());
    SessionHandle {
        tx,
        task: Some(task),
    }
}

struct Driver<E: Editable, C> {
    session: EditSession<E>,
    client: Arc<C>,
    rx: mpsc::UnboundedReceiver<SessionCommand<E>>,
    /// The one outstanding save, if any.
    in_flight: Option<JoinHandle<Result<E, SaveError>>>,
    /// Tokio-clock epoch, so paused-time tests drive the debounce.
    epoch: tokio::time::Instant,
    base_ms: u64,
}

impl<E, C> Driver<E, C>
where
    E: Editable + Send + 'static,
    E::Patch: Send,
    C: SaveClient<E> + 'static,
{
    fn now_ms(&self) -> u64 {
        self.base_ms + self.epoch.elapsed().as_millis() as u64
    }

    /// Await the outstanding save, or park forever when there is none.
    async fn await_in_flight(
        in_flight: &mut Option<JoinHandle<Result<E, SaveError>>>,
    ) -> Result<Result<E, SaveError>, tokio::task::JoinError> {
        match in_flight {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    }

    async fn run(mut self) {
        loop {
            // While a save is outstanding no second one may start, so
            // the debounce timer stays unarmed until it resolves.
            let sleep_for = if self.in_flight.is_some() {
                None
            } else {
                self.session
                    .next_deadline_ms()
                    .map(|deadline| Duration::from_millis(deadline.saturating_sub(self.now_ms())))
            };

            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Edit(patch)) => {
                            self.session.apply_edit(patch, self.now_ms());
                        }
                        Some(SessionCommand::Remote(copy)) => {
                            let outcome = self.session.observe_remote(copy, self.now_ms());
                            debug!(?outcome, "remote copy classified");
                        }
                        Some(SessionCommand::Flush) => {
                            self.session.flush(self.now_ms());
                        }
                        Some(SessionCommand::Status(reply)) => {
                            let _ = reply.send(self.session.status());
                        }
                        Some(SessionCommand::Snapshot(reply)) => {
                            let _ = reply.send(self.session.entity().clone());
                        }
                        Some(SessionCommand::Close) | None => break,
                    }
                }
                result = Self::await_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    let now = self.now_ms();
                    match result {
                        Ok(outcome) => self.session.complete_save(outcome, now),
                        Err(join_err) => {
                            error!("save task failed: {join_err}");
                            self.session
                                .complete_save(Err(SaveError::Network(join_err.to_string())), now);
                        }
                    }
                }
                _ = tokio::time::sleep(sleep_for.unwrap_or_default()), if sleep_for.is_some() => {
                    self.issue_due_save();
                }
            }
        }

        info!("session closing");
        self.session.close();
        // A still-outstanding save task keeps running detached; its
        // result has nowhere to land.
    }

    fn issue_due_save(&mut self) {
        let now = self.now_ms();
        if let Some(pending) = self.session.poll(now) {
            debug!(creating = pending.creating, "save issued");
            let client = Arc::clone(&self.client);
            self.in_flight = Some(tokio::spawn(async move {
                client.save(&pending.entity).await
            }));
        }
    }
}
