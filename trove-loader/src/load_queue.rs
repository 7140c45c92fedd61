use crate::loader::{LoadState, LoaderShared};
use crossbeam_channel::{Receiver, Sender};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, MutexGuard};
use std::thread::JoinHandle;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadQueueState {
    // Nothing queued, the worker is waiting for a push or a stop
    Idle,
    // The worker is loading queued names
    Draining,
    // join() was called, pushes are ignored
    Stopped,
}

// Thread that takes names out of the request channel and loads them, ends when the finish channel
// is signalled
struct LoadQueueWorkerThread {
    finish_tx: Sender<()>,
    join_handle: JoinHandle<()>,
}

/// FIFO of model names to preload, drained by a single background thread.
///
/// Names are loaded with the same create-or-fetch routine as `ModelLoader::load_model`, so a
/// name that is queued several times or that is also requested directly is still only kept
/// once. Queued names are loaded in push order.
pub struct LoadQueue {
    shared: Arc<LoaderShared>,
    // None once stopped
    request_tx: Option<Sender<String>>,
    worker: Option<LoadQueueWorkerThread>,
    // Names pushed but not finished loading yet
    pending_count: Arc<AtomicUsize>,
}

impl LoadQueue {
    pub(crate) fn start(
        shared: Arc<LoaderShared>,
        thread_name: &str,
    ) -> std::io::Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<String>();
        let (finish_tx, finish_rx) = crossbeam_channel::bounded(1);
        let pending_count = Arc::new(AtomicUsize::new(0));

        let worker_shared = shared.clone();
        let worker_pending_count = pending_count.clone();
        let join_handle = std::thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || {
                Self::pump(
                    &worker_shared,
                    &request_rx,
                    &finish_rx,
                    &worker_pending_count,
                )
            })?;

        log::debug!("Started load queue worker {:?}", thread_name);

        Ok(LoadQueue {
            shared,
            request_tx: Some(request_tx),
            worker: Some(LoadQueueWorkerThread {
                finish_tx,
                join_handle,
            }),
            pending_count,
        })
    }

    // Body of the worker thread
    fn pump(
        shared: &LoaderShared,
        request_rx: &Receiver<String>,
        finish_rx: &Receiver<()>,
        pending_count: &AtomicUsize,
    ) {
        profiling::register_thread!("LoadQueue worker");
        loop {
            crossbeam_channel::select! {
                recv(request_rx) -> msg => {
                    match msg {
                        Ok(name) => Self::process(shared, pending_count, name),
                        // All senders are gone and the channel is empty
                        Err(_) => break,
                    }
                },
                recv(finish_rx) -> _msg => {
                    // Names pushed before the stop was requested are still loaded
                    while let Ok(name) = request_rx.try_recv() {
                        Self::process(shared, pending_count, name);
                    }
                    break;
                }
            }
        }

        log::debug!("Load queue worker stopped");
    }

    fn process(
        shared: &LoaderShared,
        pending_count: &AtomicUsize,
        name: String,
    ) {
        profiling::scope!("LoadQueue::process");
        log::trace!("Preloading {:?}", name);

        // There is no caller to hand failures to, so they end here
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| shared.load(&name, true)));
        match result {
            Ok(Ok(model)) => log::debug!("Preloaded {:?} as {}", name, model.id),
            Ok(Err(error)) => log::warn!("Preload of {:?} failed: {}", name, error),
            Err(_) => log::error!("Parser panicked while preloading {:?}", name),
        }

        pending_count.fetch_sub(1, Ordering::AcqRel);
    }

    /// Appends `name` to the queue. Returns false, and drops the name, if the queue was stopped.
    pub fn push(
        &self,
        name: &str,
    ) -> bool {
        let request_tx = match &self.request_tx {
            Some(request_tx) => request_tx,
            None => {
                log::warn!("Ignoring preload of {:?}, the load queue is stopped", name);
                return false;
            }
        };

        self.pending_count.fetch_add(1, Ordering::AcqRel);
        if let Err(error) = request_tx.send(name.trim().to_string()) {
            // Only happens if the worker died
            self.pending_count.fetch_sub(1, Ordering::AcqRel);
            log::error!(
                "Could not queue preload of {:?}, the load queue worker is gone",
                error.into_inner()
            );
            return false;
        }

        true
    }

    /// Takes the lock shared by the cache and the queue. While the guard is held the worker can't
    /// insert anything into the cache.
    pub fn grab_lock(&self) -> MutexGuard<'_, LoadState> {
        self.shared.lock_state()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_count.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoadQueueState {
        if self.request_tx.is_none() {
            LoadQueueState::Stopped
        } else if self.pending_count() > 0 {
            LoadQueueState::Draining
        } else {
            LoadQueueState::Idle
        }
    }

    /// Stops accepting pushes, lets the worker finish everything already queued and waits for it
    /// to exit. Calling it again does nothing.
    pub fn join(&mut self) {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return,
        };

        self.request_tx = None;
        // Fails only if the worker already exited
        let _ = worker.finish_tx.send(());
        if worker.join_handle.join().is_err() {
            log::error!("Load queue worker thread panicked");
        }
    }
}

impl Drop for LoadQueue {
    fn drop(&mut self) {
        self.join();
    }
}
