//! Structured span field names used across the engine.
//!
//! Consistent names keep log queries stable across subsystems.

/// Engine: units fully processed in a run.
pub const UNITS_PROCESSED: &str = "units_processed";

/// Engine: units handed to the work queue by the enumerator.
pub const UNITS_ENUMERATED: &str = "units_enumerated";

/// Engine: number of drain attempts preempted by a pending mutation.
pub const PREEMPTIONS: &str = "preemptions";

/// Queue: configured capacity.
pub const QUEUE_CAPACITY: &str = "queue_capacity";

/// Pool: worker count.
pub const WORKERS: &str = "workers";

/// Engine: total problems across all presentations.
pub const TOTAL_PROBLEMS: &str = "total_problems";

/// Engine: wall-clock run time in milliseconds.
pub const ELAPSED_MS: &str = "elapsed_ms";

/// Global runner: time spent building the declaration graph in milliseconds.
pub const GRAPH_BUILD_TIME: &str = "graph_build_time";
