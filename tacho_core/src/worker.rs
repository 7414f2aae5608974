//! Periodic background workers.
//!
//! Each `PeriodicWorker` owns one named thread that runs a task on a fixed
//! cadence until the worker is dropped. Dropping closes the shutdown channel,
//! which wakes the thread immediately, then joins it.
use crossbeam_channel as xch;
use std::thread::JoinHandle;
use std::time::Duration;

pub struct PeriodicWorker {
    name: &'static str,
    /// Dropping the sender disconnects the channel and stops the loop.
    shutdown: Option<xch::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl PeriodicWorker {
    pub fn spawn<F>(name: &'static str, period: Duration, mut task: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = xch::bounded::<()>(0);
        let ticker = xch::tick(period);
        let join_handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                loop {
                    xch::select! {
                        recv(rx) -> _ => break,
                        recv(ticker) -> _ => task(),
                    }
                }
                tracing::trace!(worker = name, "worker thread exiting cleanly");
            })?;
        tracing::debug!(worker = name, period_ms = period.as_millis() as u64, "worker started");
        Ok(Self {
            name,
            shutdown: Some(tx),
            join_handle: Some(join_handle),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                tracing::warn!(worker = self.name, "worker thread panicked");
            }
        }
    }
}
