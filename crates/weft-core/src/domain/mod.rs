/// Identifier value objects
pub mod ids;

/// Flow and step graph model
pub mod flow;

/// Execution counting and cycle detection
pub mod reachability;

/// Execution records and metrics
pub mod record;

/// Repository interfaces
pub mod repository;
