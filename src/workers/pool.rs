//! # Pool de Workers
//! src/workers/pool.rs
//!
//! Pool de tamaño fijo que drena una cola FIFO compartida. No sabe nada de
//! HTTP: ejecuta cualquier `FnOnce() + Send`.
//!
//! ## Sincronización
//!
//! - La cola es la única estructura mutable compartida y la protege un
//!   solo `Mutex` junto con un `Condvar`.
//! - El flag `running` es atómico y se lee sin tomar el lock.
//! - Un pánico dentro de una tarea se atrapa en el loop del worker, se
//!   loguea y el worker sigue con la siguiente tarea.

use crate::logging::Logger;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Unidad de trabajo diferida
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Estado compartido entre el pool y sus workers
struct Shared {
    /// Cola FIFO sin límite de tareas pendientes
    queue: Mutex<VecDeque<Task>>,

    /// Despierta workers cuando hay tareas o cuando se pide detener
    available: Condvar,

    running: AtomicBool,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pool de threads de tamaño fijo
pub struct WorkerPool {
    shared: Arc<Shared>,

    /// Cantidad de workers que se crean en `start()`
    size: usize,

    /// Handles de los workers vivos (vacío si el pool no corre)
    handles: Vec<JoinHandle<()>>,

    logger: Logger,
}

impl WorkerPool {
    /// Crea un pool detenido con `size` workers (0 se trata como 1)
    pub fn new(size: usize, logger: Logger) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
                running: AtomicBool::new(false),
            }),
            size: size.max(1),
            handles: Vec::new(),
            logger,
        }
    }

    /// Pool con un worker por CPU disponible
    pub fn with_available_parallelism(logger: Logger) -> Self {
        Self::new(num_cpus::get(), logger)
    }

    /// Lanza exactamente `size` workers. No hace nada si ya corre.
    pub fn start(&mut self) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }

        for id in 0..self.size {
            let shared = Arc::clone(&self.shared);
            let logger = self.logger.clone();

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || {
                    let _log_guard = logger.install();
                    worker_loop(&shared, id);
                });

            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(e) => self.logger.in_scope(|| {
                    tracing::error!(worker = id, error = %e, "failed to spawn worker thread");
                }),
            }
        }

        self.logger.in_scope(|| {
            tracing::debug!(workers = self.handles.len(), "worker pool started");
        });
    }

    /// Detiene el pool: las tareas en ejecución terminan, las que seguían
    /// en cola se descartan.
    pub fn stop(&mut self) {
        self.join_workers();

        let abandoned = std::mem::take(&mut *self.shared.lock_queue());
        if !abandoned.is_empty() {
            self.logger.in_scope(|| {
                tracing::debug!(abandoned = abandoned.len(), "dropping queued tasks on stop");
            });
        }
    }

    /// Baja el flag, despierta a todos y espera a que terminen
    fn join_workers(&mut self) {
        {
            // Con el lock tomado para que ningún worker se pierda el aviso
            let _queue = self.shared.lock_queue();
            if !self.shared.running.swap(false, Ordering::AcqRel) {
                return;
            }
        }
        self.shared.available.notify_all();

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                self.logger.in_scope(|| tracing::error!("worker thread exited by panic"));
            }
        }
    }

    /// Encola una tarea. Si el pool no está corriendo la tarea se descarta
    /// y retorna `false`.
    pub fn enqueue<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        {
            // Mismo lock con el que `stop()` apaga el flag
            let mut queue = self.shared.lock_queue();
            if !self.shared.running.load(Ordering::Acquire) {
                return false;
            }
            queue.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
        true
    }

    /// Cambia la cantidad de workers (0 se trata como 1)
    ///
    /// Si el pool corría se detiene, se reemplazan los workers y se vuelve
    /// a lanzar; las tareas en cola se conservan.
    pub fn resize(&mut self, new_size: usize) {
        let was_running = self.is_running();

        if was_running {
            self.join_workers();
        }

        self.size = new_size.max(1);

        if was_running {
            self.start();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Cantidad de workers configurada
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tareas esperando un worker (solo para diagnóstico)
    pub fn queue_len(&self) -> usize {
        self.shared.lock_queue().len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Shared, id: usize) {
    loop {
        let task = {
            let mut queue = shared.lock_queue();
            loop {
                if !shared.running.load(Ordering::Acquire) {
                    tracing::trace!(worker = id, "worker exiting");
                    return;
                }
                if let Some(task) = queue.pop_front() {
                    break task;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            tracing::error!(
                worker = id,
                panic = %panic_message(payload.as_ref()),
                "task panicked, worker keeps running"
            );
        }
    }
}

/// Texto de un payload de pánico (`&str` o `String`)
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
