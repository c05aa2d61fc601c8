//! Inspect and repair the event logs of digitization batches so the pipeline scheduler
//! re-processes them.

pub mod cli;
pub mod config;
pub mod model;
pub mod restart;
pub mod storage;
