//! # Workers
//! src/workers/mod.rs
//!
//! Ejecutor genérico de tareas. El servidor lo usa para atender cada
//! conexión aceptada en un worker, pero el pool no depende de HTTP.

pub mod pool;

pub use pool::{Task, WorkerPool};
