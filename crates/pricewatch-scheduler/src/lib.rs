//! # Pricewatch Scheduler
//!
//! Runs every enabled monitor on its own recurring interval inside one
//! process, with per-task failure isolation and cooperative shutdown.
//!
//! ## Architecture
//! ```text
//! run_service
//!   ├── HealthServer (axum listener, started first)
//!   ├── signal handlers → shared shutdown flag (set once)
//!   └── one task loop per enabled scraper
//!         IDLE: sleep in ≤10s slices, re-checking the flag
//!         DUE → RUNNING: run_scraper_safe (error boundary) → record
//!         back to IDLE with next due = completion + interval
//! ```
//!
//! Runs of the same task never overlap; runs of different tasks are
//! unordered. A run already in progress is allowed to finish; shutdown
//! only stops future scheduling, bounding exit latency to one slice.

pub mod loops;
pub mod runner;
pub mod service;

pub use loops::{SLEEP_SLICE, run_task_loop};
pub use runner::{RunOutcome, run_job, run_scraper_safe};
pub use service::{SchedulerService, install_signal_handlers, run_service, run_single_pass};
