//! Many-reader/one-writer access coordinator.
//!
//! Implemented as a reader-count gate over an exclusive write gate: the
//! first reader to arrive takes the write gate on behalf of all readers and
//! the last one out returns it. Readers never wait for each other, so a
//! steady stream of them can hold a writer off indefinitely. That reader
//! preference is a deliberate property of the design, asserted by the tests
//! below, not an accident to be fixed.

use std::sync::RwLock;

use tokio::sync::{Mutex, Semaphore};

use super::sync_failure;

pub struct SharedLock<T> {
    /// Count of readers currently inside the gate.
    readers: Mutex<usize>,
    /// Single-permit gate held by the writer, or by the reader cohort as a
    /// whole while the count is nonzero.
    write_gate: Semaphore,
    /// The guarded value. Never contended across the gate: readers only
    /// take the shared side while the cohort holds the write gate, writers
    /// only take the exclusive side while holding it alone.
    data: RwLock<T>,
}

impl<T> SharedLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            readers: Mutex::new(0),
            write_gate: Semaphore::new(1),
            data: RwLock::new(value),
        }
    }

    /// Run a read-only query under shared access.
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.enter_read().await;
        let out = {
            let guard = match self.data.read() {
                Ok(guard) => guard,
                Err(_) => sync_failure("shared lock poisoned on read"),
            };
            f(&guard)
        };
        self.exit_read().await;
        out
    }

    /// Run a mutation under exclusive access.
    pub async fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let permit = match self.write_gate.acquire().await {
            Ok(permit) => permit,
            Err(_) => sync_failure("write gate closed"),
        };
        let out = {
            let mut guard = match self.data.write() {
                Ok(guard) => guard,
                Err(_) => sync_failure("shared lock poisoned on write"),
            };
            f(&mut guard)
        };
        drop(permit);
        out
    }

    async fn enter_read(&self) {
        let mut readers = self.readers.lock().await;
        *readers += 1;
        if *readers == 1 {
            // First reader in: claim the write gate for the cohort. Later
            // readers queue on `readers` until this acquire completes, the
            // same order the gate would impose anyway.
            match self.write_gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => sync_failure("write gate closed"),
            }
        }
    }

    async fn exit_read(&self) {
        let mut readers = self.readers.lock().await;
        *readers -= 1;
        if *readers == 0 {
            self.write_gate.add_permits(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn read_sees_written_value() {
        let lock = SharedLock::new(7u32);
        lock.write(|v| *v = 42).await;
        assert_eq!(lock.read(|v| *v).await, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn writers_never_overlap_readers() {
        let lock = Arc::new(SharedLock::new(0u64));
        let active_readers = Arc::new(AtomicUsize::new(0));
        let active_writers = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(AtomicUsize::new(0));
        let peak_readers = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let lock = Arc::clone(&lock);
            let readers = Arc::clone(&active_readers);
            let writers = Arc::clone(&active_writers);
            let violations = Arc::clone(&violations);
            let peak = Arc::clone(&peak_readers);
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    lock.read(|_| {
                        let now = readers.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        if writers.load(Ordering::SeqCst) != 0 {
                            violations.fetch_add(1, Ordering::SeqCst);
                        }
                        std::thread::sleep(Duration::from_micros(100));
                        readers.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
                }
            }));
        }
        for _ in 0..2 {
            let lock = Arc::clone(&lock);
            let readers = Arc::clone(&active_readers);
            let writers = Arc::clone(&active_writers);
            let violations = Arc::clone(&violations);
            tasks.push(tokio::spawn(async move {
                for _ in 0..25 {
                    lock.write(|v| {
                        let others = writers.fetch_add(1, Ordering::SeqCst);
                        if others != 0 || readers.load(Ordering::SeqCst) != 0 {
                            violations.fetch_add(1, Ordering::SeqCst);
                        }
                        *v += 1;
                        std::thread::sleep(Duration::from_micros(100));
                        writers.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert_eq!(lock.read(|v| *v).await, 50);
        // Shared access really is shared.
        assert!(peak_readers.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_are_preferred_over_a_waiting_writer() {
        let lock = Arc::new(SharedLock::new(()));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        // First reader parks inside the gate.
        let first_reader = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move {
                lock.read(move |_| {
                    ready_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .await;
            })
        };
        ready_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // A writer arrives and must wait.
        let wrote = Arc::new(AtomicUsize::new(0));
        let writer = {
            let lock = Arc::clone(&lock);
            let wrote = Arc::clone(&wrote);
            tokio::spawn(async move {
                lock.write(|_| {
                    wrote.fetch_add(1, Ordering::SeqCst);
                })
                .await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(wrote.load(Ordering::SeqCst), 0, "writer got in past a reader");

        // A second reader still gets through while the writer is parked.
        let second = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { lock.read(|_| ()).await })
        };
        tokio::time::timeout(Duration::from_secs(5), second)
            .await
            .expect("second reader blocked behind the writer")
            .unwrap();
        assert_eq!(wrote.load(Ordering::SeqCst), 0);

        // Last reader out hands the gate to the writer.
        release_tx.send(()).unwrap();
        first_reader.await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), writer)
            .await
            .expect("writer never admitted")
            .unwrap();
        assert_eq!(wrote.load(Ordering::SeqCst), 1);
    }
}
