//! Per-run execution context.

/// The execution context for a single seeding run.
///
/// A `Scope` is created once per call to [`Seeder::run`](crate::Seeder::run)
/// and owns the shared data `G` supplied by the caller. Seed factories and the
/// seeds themselves only ever borrow it, so it is guaranteed to be released
/// when the run completes, fails, or is abandoned.
pub struct Scope<G: Send + Sync = ()> {
    data: G,
}

impl<G: Send + Sync> Scope<G> {
    pub(crate) fn new(data: G) -> Self {
        Self { data }
    }

    /// Shared data for the current run.
    pub fn data(&self) -> &G {
        &self.data
    }
}
