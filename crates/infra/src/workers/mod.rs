//! Background workers.

pub mod change_worker;

pub use change_worker::{ChangeWorker, WorkerError, WorkerHandle};
