//! Domain core of the ZK-PRET gateway.
//!
//! Holds the job model and its in-memory store, the background job runner,
//! and the executor adapter that drives the external proof toolchain. Has no
//! HTTP dependencies so the lifecycle logic can be tested in isolation.

pub mod error;
pub mod job;
pub mod job_events;
pub mod runner;
pub mod store;
pub mod tools;
pub mod types;
