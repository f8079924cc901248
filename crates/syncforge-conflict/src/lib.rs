//! # syncforge-conflict
//!
//! Conflict detection and resolution (C3): runs the four checks from
//! spec.md §4.3 over an incoming update and, when conflicts are found,
//! resolves them with a pluggable [`ResolutionStrategy`].
//!
//! ```text
//! StatusUpdate --detect()--> Vec<Conflict> --resolve()--> Resolution
//! ```

mod detector;
mod error;
mod history;
mod resolver;
mod rules;

pub use detector::{ConflictConfig, ConflictDetector};
pub use error::{ConflictError, Result};
pub use resolver::{
    default_system_priority, ConflictResolver, ManualStrategy, MergeStrategy,
    PriorityBasedStrategy, ResolutionStrategy, TimestampBasedStrategy,
};
pub use rules::BusinessRule;
