//! Batched event ingestion.
//!
//! [`EventLogger`] decouples mail-processing threads from the backing store:
//! `log` enqueues onto an unbounded channel and returns immediately, and a
//! single flusher task owns the buffer, so a flush can never observe a torn
//! batch and events logged mid-flush simply queue behind it. Delivery is
//! best-effort: a failed flush is retained for the next trigger and never
//! surfaced to the mail-processing caller.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use tokio::{
  sync::{mpsc, oneshot},
  task::JoinHandle,
  time::{self, MissedTickBehavior},
};

use cahoot_core::{Error, Result, event::Event, store::EventStore};

use crate::config::LoggerConfig;

enum Command {
  Log(Event),
  Flush(oneshot::Sender<Result<()>>),
  Shutdown(oneshot::Sender<Result<()>>),
}

// ─── EventLogger ─────────────────────────────────────────────────────────────

/// Handle to the flusher task.
pub struct EventLogger {
  tx:   mpsc::UnboundedSender<Command>,
  task: Mutex<Option<JoinHandle<()>>>,
}

impl EventLogger {
  /// Spawn the flusher task on the current tokio runtime.
  pub fn spawn<S>(store: Arc<S>, config: LoggerConfig) -> Self
  where
    S: EventStore + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_flusher(store, config, rx));
    Self { tx, task: Mutex::new(Some(task)) }
  }

  /// Enqueue one event. Never fails or blocks the caller; after shutdown the
  /// event is dropped with a warning.
  pub fn log(&self, event: Event) {
    if self.tx.send(Command::Log(event)).is_err() {
      tracing::warn!("event logger is shut down; dropping event");
    }
  }

  /// Force an immediate flush of any partial batch and wait for it.
  /// Reports the flush outcome, unlike the fire-and-forget `log` path.
  pub async fn flush_now(&self) -> Result<()> {
    let (ack, done) = oneshot::channel();
    self
      .tx
      .send(Command::Flush(ack))
      .map_err(|_| Error::LoggerClosed)?;
    done.await.map_err(|_| Error::LoggerClosed)?
  }

  /// Drain the buffer, stop the flusher task, and wait for it to exit.
  pub async fn shutdown(&self) -> Result<()> {
    let (ack, done) = oneshot::channel();
    self
      .tx
      .send(Command::Shutdown(ack))
      .map_err(|_| Error::LoggerClosed)?;
    let outcome = done.await.map_err(|_| Error::LoggerClosed)?;

    let task = self
      .task
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .take();
    if let Some(task) = task {
      let _ = task.await;
    }
    outcome
  }
}

// ─── Flusher task ────────────────────────────────────────────────────────────

async fn run_flusher<S: EventStore>(
  store: Arc<S>,
  config: LoggerConfig,
  mut rx: mpsc::UnboundedReceiver<Command>,
) {
  let mut buffer: Vec<Event> = Vec::with_capacity(config.batch_size);

  // tokio panics on a zero interval.
  let period = config.flush_interval.max(Duration::from_millis(1));
  let mut ticker = time::interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      command = rx.recv() => match command {
        Some(Command::Log(event)) => {
          buffer.push(event);
          if buffer.len() >= config.batch_size {
            let _ = flush(&*store, &mut buffer).await;
            ticker.reset();
          }
          enforce_cap(&mut buffer, config.max_buffered);
        }
        Some(Command::Flush(ack)) => {
          let outcome = flush(&*store, &mut buffer).await;
          ticker.reset();
          let _ = ack.send(outcome);
        }
        Some(Command::Shutdown(ack)) => {
          let _ = ack.send(flush(&*store, &mut buffer).await);
          break;
        }
        // All senders dropped: drain the tail and exit.
        None => {
          let _ = flush(&*store, &mut buffer).await;
          break;
        }
      },
      _ = ticker.tick() => {
        if !buffer.is_empty() {
          let _ = flush(&*store, &mut buffer).await;
        }
      }
    }
  }
}

/// Send the whole buffer as one batch. On success the buffer is cleared; on
/// failure it is retained for the next trigger.
async fn flush<S: EventStore>(store: &S, buffer: &mut Vec<Event>) -> Result<()> {
  if buffer.is_empty() {
    return Ok(());
  }
  match store.append(buffer).await {
    Ok(()) => {
      tracing::debug!(count = buffer.len(), "flushed event batch");
      buffer.clear();
      Ok(())
    }
    Err(err) => {
      tracing::warn!(
        error = %err,
        pending = buffer.len(),
        "event flush failed; batch retained for retry"
      );
      Err(Error::backend(err))
    }
  }
}

/// Bound the buffer while the backend is down; oldest events go first.
fn enforce_cap(buffer: &mut Vec<Event>, max_buffered: usize) {
  if buffer.len() > max_buffered {
    let overflow = buffer.len() - max_buffered;
    buffer.drain(..overflow);
    tracing::warn!(dropped = overflow, "event buffer over capacity");
  }
}
