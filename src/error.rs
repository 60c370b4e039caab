use thiserror::Error;

use crate::seed::SeedKey;

/// The topological sort could not place every registered seed, which means
/// the missing ones form or depend on at least one dependency cycle.
///
/// The reported set is an over-approximation: it contains every seed that
/// could not be scheduled, which includes seeds that merely depend on a cycle
/// without being part of it. All truly cyclic seeds are always included.
#[derive(Debug, Error)]
#[error(
    "circular dependency detected in seeds: {}. Please review your seed dependencies to eliminate cycles.",
    join(.0)
)]
pub struct CycleError(pub Vec<SeedKey>);

#[derive(Debug, Error)]
pub enum SeederError {
    /// The same seed type was registered more than once.
    #[error(
        "duplicate seed registration detected: {}. Each seed type may only be registered once.",
        join(.0)
    )]
    Duplicate(Vec<SeedKey>),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// A seed's unit of work failed; seeds after it were not executed.
    #[error("seed '{0}' failed:\n{1}")]
    Seed(SeedKey, anyhow::Error),
}

pub(crate) fn join(keys: &[SeedKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
