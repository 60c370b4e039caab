#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod error;
mod graph;
mod scope;
mod seed;
mod utils;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

pub use crate::error::{CycleError, SeederError};
pub use crate::scope::Scope;
pub use crate::seed::{Seed, SeedKey, SeedResult};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;

use crate::graph::DependencyGraph;
use crate::seed::{SeedEntry, SeedFactory};

// ******************************
// *        Registration        *
// ******************************

/// A builder struct for creating a [`Seeder`] with registered seeds.
///
/// Registration is explicit: every seed type is added with [`add_seed`]
/// (for `Default`-constructible seeds) or [`add_seed_with`] (with a factory
/// closure). Registration order matters — it is the tie-break between seeds
/// that become eligible at the same time, so it fixes the execution order.
///
/// [`add_seed`]: Self::add_seed
/// [`add_seed_with`]: Self::add_seed_with
pub struct SeederConfig<G: Send + Sync = ()> {
    entries: Vec<SeedEntry<G>>,
}

impl<G: Send + Sync + 'static> Default for SeederConfig<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Send + Sync + 'static> SeederConfig<G> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register the seed type `S`, constructed with `Default` once per run.
    pub fn add_seed<S>(self) -> Self
    where
        S: Seed<G> + Default + 'static,
    {
        self.add_seed_with(|_| S::default())
    }

    /// Register the seed type `S` with an explicit factory.
    ///
    /// The factory runs once per seed per run, against the live [`Scope`],
    /// immediately before the seed executes. It is never invoked during
    /// registration or dependency resolution, so it may freely hand out
    /// scope-bound collaborators.
    pub fn add_seed_with<S, F>(mut self, factory: F) -> Self
    where
        S: Seed<G> + 'static,
        F: Fn(&Scope<G>) -> S + Send + Sync + 'static,
    {
        let factory: SeedFactory<G> =
            Arc::new(move |scope| Box::new(factory(scope)) as Box<dyn Seed<G>>);

        self.entries.push(SeedEntry::new::<S>(factory));
        self
    }

    /// Finalize the registration and produce a [`Seeder`].
    ///
    /// Registering the same seed type more than once is a configuration
    /// error and is rejected here, before any graph work begins.
    pub fn finish(self) -> Result<Seeder<G>, SeederError> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();

        for entry in &self.entries {
            if !seen.insert(entry.key) && !duplicates.contains(&entry.key) {
                duplicates.push(entry.key);
            }
        }

        if !duplicates.is_empty() {
            return Err(SeederError::Duplicate(duplicates));
        }

        Ok(Seeder {
            entries: self.entries,
        })
    }
}

// ******************************
// *           Engine           *
// ******************************

/// Executes a fixed set of registered seeds in dependency order, exactly once
/// per call to [`run`](Self::run).
///
/// The `G` type parameter is the shared data container owned by the per-run
/// [`Scope`], though it can be replaced with the `()` Unit if you don't need
/// to pass any data.
pub struct Seeder<G: Send + Sync = ()> {
    entries: Vec<SeedEntry<G>>,
}

impl<G: Send + Sync + 'static> Seeder<G> {
    pub fn config() -> SeederConfig<G> {
        SeederConfig::new()
    }

    /// Resolve the execution order without running anything.
    ///
    /// This is a pure function over the registered set — safe to call
    /// repeatedly, for instance to visualize or dry-run a seeding plan.
    pub fn resolve(&self) -> Result<Vec<SeedKey>, CycleError> {
        let order = self.resolve_indices()?;
        Ok(order.into_iter().map(|i| self.entries[i].key).collect())
    }

    fn resolve_indices(&self) -> Result<Vec<usize>, CycleError> {
        let nodes: Vec<(SeedKey, &[SeedKey])> = self
            .entries
            .iter()
            .map(|entry| (entry.key, entry.dependencies.as_slice()))
            .collect();

        let graph = DependencyGraph::build(&nodes);
        let order = graph.sort();

        if order.len() < graph.len() {
            let sorted: HashSet<usize> = order.iter().copied().collect();
            let stuck = (0..self.entries.len())
                .filter(|i| !sorted.contains(i))
                .map(|i| self.entries[i].key)
                .collect();

            return Err(CycleError(stuck));
        }

        Ok(order)
    }

    /// Run every registered seed once, in dependency order.
    ///
    /// This will:
    /// 1. Resolve the execution order, aborting on a dependency cycle.
    /// 2. Create one [`Scope`] owning `data` for the entire run.
    /// 3. For each seed in order, build a fresh instance from its factory and
    ///    await its unit of work before moving to the next seed.
    ///
    /// Seeds never run concurrently. The first failure aborts the run with
    /// the failing seed's identity; seeds that already completed keep their
    /// side effects. The scope is released on every exit path.
    pub async fn run(&mut self, data: G) -> Result<(), SeederError> {
        let s = Instant::now();

        tracing::debug!("resolving seed dependencies using topological sort");
        let order = self.resolve_indices()?;

        for (position, &index) in order.iter().enumerate() {
            let entry = &self.entries[index];
            if entry.dependencies.is_empty() {
                tracing::debug!("{}. {} (no dependencies)", position + 1, entry.key);
            } else {
                tracing::debug!(
                    "{}. {} (depends on: {})",
                    position + 1,
                    entry.key,
                    error::join(&entry.dependencies)
                );
            }
        }

        let bar = ProgressBar::new(order.len() as u64).with_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Error setting progress bar template")
                .progress_chars("#>-"),
        );

        let scope = Scope::new(data);

        for &index in &order {
            let entry = &self.entries[index];
            bar.set_message(entry.key.to_string());
            tracing::trace!("executing seed: {}", entry.key);

            let seed = (entry.factory)(&scope);
            seed.run(&scope)
                .await
                .map_err(|err| SeederError::Seed(entry.key, err))?;

            bar.inc(1);
        }

        bar.finish_with_message(format!(
            "Seeded {} seeds {}",
            order.len(),
            utils::as_overhead(s)
        ));
        tracing::debug!("all seeds have been seeded");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Log {
        order: Mutex<Vec<&'static str>>,
        built: AtomicUsize,
    }

    impl Log {
        fn push(&self, name: &'static str) {
            self.order.lock().unwrap().push(name);
        }

        fn order(&self) -> Vec<&'static str> {
            self.order.lock().unwrap().clone()
        }
    }

    macro_rules! seed {
        ($name:ident) => {
            seed!($name, []);
        };
        ($name:ident, [$($dep:ty),*]) => {
            #[derive(Default)]
            struct $name;

            #[async_trait]
            impl Seed<Arc<Log>> for $name {
                fn depends_on() -> Vec<SeedKey> {
                    vec![$(SeedKey::of::<$dep>()),*]
                }

                async fn run(&self, scope: &Scope<Arc<Log>>) -> SeedResult {
                    scope.data().push(stringify!($name));
                    Ok(())
                }
            }
        };
    }

    #[tokio::test]
    async fn seeds_run_in_dependency_order() {
        seed!(A);
        seed!(B, [A]);
        seed!(C, [B]);

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<C>()
            .add_seed::<A>()
            .add_seed::<B>()
            .finish()
            .unwrap();

        seeder.run(log.clone()).await.unwrap();
        assert_eq!(log.order(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn diamond_places_both_branches_between_root_and_sink() {
        seed!(A);
        seed!(B, [A]);
        seed!(C, [A]);
        seed!(D, [B, C]);

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<D>()
            .add_seed::<B>()
            .add_seed::<C>()
            .add_seed::<A>()
            .finish()
            .unwrap();

        seeder.run(log.clone()).await.unwrap();

        let order = log.order();
        let pos = |name| order.iter().position(|&n| n == name).unwrap();
        assert!(pos("A") < pos("B"));
        assert!(pos("A") < pos("C"));
        assert!(pos("B") < pos("D"));
        assert!(pos("C") < pos("D"));
    }

    #[test]
    fn resolution_is_deterministic() {
        seed!(A);
        seed!(B, [A]);
        seed!(C);
        seed!(D, [A]);

        let build = || {
            Seeder::config()
                .add_seed::<C>()
                .add_seed::<D>()
                .add_seed::<A>()
                .add_seed::<B>()
                .finish()
                .unwrap()
        };

        let first = build().resolve().unwrap();
        let second = build().resolve().unwrap();
        assert_eq!(first, second);

        // Same seeder, repeated calls.
        let seeder = build();
        assert_eq!(seeder.resolve().unwrap(), seeder.resolve().unwrap());
    }

    #[test]
    fn resolve_executes_nothing() {
        seed!(A);
        seed!(B, [A]);

        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let seeder = Seeder::config()
            .add_seed_with(move |_: &Scope<Arc<Log>>| {
                counter.fetch_add(1, Ordering::SeqCst);
                A
            })
            .add_seed::<B>()
            .finish()
            .unwrap();

        let order = seeder.resolve().unwrap();
        assert_eq!(order, vec![SeedKey::of::<A>(), SeedKey::of::<B>()]);
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn two_node_cycle_names_both_seeds() {
        seed!(A, [B]);
        seed!(B, [A]);

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<A>()
            .add_seed::<B>()
            .finish()
            .unwrap();

        let err = seeder.run(log.clone()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("circular dependency"));
        assert!(message.contains("A"));
        assert!(message.contains("B"));
        assert!(log.order().is_empty());
    }

    #[test]
    fn three_node_cycle_names_all_seeds() {
        seed!(A, [B]);
        seed!(B, [C]);
        seed!(C, [A]);

        let seeder = Seeder::config()
            .add_seed::<A>()
            .add_seed::<B>()
            .add_seed::<C>()
            .finish()
            .unwrap();

        let err = seeder.resolve().unwrap_err();
        assert_eq!(
            err.0,
            vec![SeedKey::of::<A>(), SeedKey::of::<B>(), SeedKey::of::<C>()]
        );
    }

    #[tokio::test]
    async fn cycle_report_includes_transitive_dependents() {
        seed!(A, [B]);
        seed!(B, [A]);
        seed!(C, [B]);
        seed!(D);

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<A>()
            .add_seed::<B>()
            .add_seed::<C>()
            .add_seed::<D>()
            .finish()
            .unwrap();

        let err = seeder.run(log.clone()).await.unwrap_err();
        let message = err.to_string();

        // C only depends on the cycle, but the unresolved set reports it too.
        assert!(message.contains("A") && message.contains("B") && message.contains("C"));
        assert!(!message.contains("D"));

        // A cycle aborts the run before anything executes.
        assert!(log.order().is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected_before_any_run() {
        seed!(A);
        seed!(B);

        let result = Seeder::config()
            .add_seed::<A>()
            .add_seed::<B>()
            .add_seed::<A>()
            .finish();

        match result {
            Err(SeederError::Duplicate(keys)) => {
                assert_eq!(keys, vec![SeedKey::of::<A>()]);
            }
            _ => panic!("expected duplicate registration error"),
        }
    }

    #[tokio::test]
    async fn unknown_dependency_is_silently_ignored() {
        struct NeverRegistered;

        seed!(A, [NeverRegistered]);
        seed!(B, [A]);

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<B>()
            .add_seed::<A>()
            .finish()
            .unwrap();

        seeder.run(log.clone()).await.unwrap();
        assert_eq!(log.order(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn first_failure_stops_the_run() {
        seed!(A);
        seed!(C, [A]);

        #[derive(Default)]
        struct Failing;

        #[async_trait]
        impl Seed<Arc<Log>> for Failing {
            fn depends_on() -> Vec<SeedKey> {
                vec![SeedKey::of::<A>()]
            }

            async fn run(&self, _: &Scope<Arc<Log>>) -> SeedResult {
                anyhow::bail!("connection refused")
            }
        }

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<A>()
            .add_seed::<Failing>()
            .add_seed::<C>()
            .finish()
            .unwrap();

        let err = seeder.run(log.clone()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failing"));
        assert!(message.contains("connection refused"));

        // A ran and keeps its side effects; C never ran.
        assert_eq!(log.order(), vec!["A"]);
    }

    #[tokio::test]
    async fn factories_build_one_fresh_instance_per_seed_per_run() {
        seed!(A);
        seed!(B, [A]);

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed_with(|scope: &Scope<Arc<Log>>| {
                scope.data().built.fetch_add(1, Ordering::SeqCst);
                A
            })
            .add_seed_with(|scope: &Scope<Arc<Log>>| {
                scope.data().built.fetch_add(1, Ordering::SeqCst);
                B
            })
            .finish()
            .unwrap();

        seeder.run(log.clone()).await.unwrap();
        assert_eq!(log.built.load(Ordering::SeqCst), 2);

        seeder.run(log.clone()).await.unwrap();
        assert_eq!(log.built.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn scope_is_released_when_a_seed_fails() {
        struct Guard {
            dropped: Arc<AtomicBool>,
        }

        impl Drop for Guard {
            fn drop(&mut self) {
                self.dropped.store(true, Ordering::SeqCst);
            }
        }

        struct Failing;

        #[async_trait]
        impl Seed<Guard> for Failing {
            async fn run(&self, _: &Scope<Guard>) -> SeedResult {
                anyhow::bail!("boom")
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let mut seeder = Seeder::config()
            .add_seed_with(|_: &Scope<Guard>| Failing)
            .finish()
            .unwrap();

        let guard = Guard {
            dropped: dropped.clone(),
        };
        assert!(seeder.run(guard).await.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shorthand_dependency_is_respected() {
        seed!(A);

        #[derive(Default)]
        struct Shorthand;

        #[async_trait]
        impl Seed<Arc<Log>> for Shorthand {
            fn depends_on_one() -> Option<SeedKey> {
                Some(SeedKey::of::<A>())
            }

            async fn run(&self, scope: &Scope<Arc<Log>>) -> SeedResult {
                scope.data().push("Shorthand");
                Ok(())
            }
        }

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<Shorthand>()
            .add_seed::<A>()
            .finish()
            .unwrap();

        seeder.run(log.clone()).await.unwrap();
        assert_eq!(log.order(), vec!["A", "Shorthand"]);
    }

    #[tokio::test]
    async fn legacy_dependency_is_respected() {
        seed!(A);

        #[derive(Default)]
        struct Legacy;

        #[async_trait]
        impl Seed<Arc<Log>> for Legacy {
            #[allow(deprecated)]
            fn legacy_dependency() -> Option<SeedKey> {
                Some(SeedKey::of::<A>())
            }

            async fn run(&self, scope: &Scope<Arc<Log>>) -> SeedResult {
                scope.data().push("Legacy");
                Ok(())
            }
        }

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<Legacy>()
            .add_seed::<A>()
            .finish()
            .unwrap();

        seeder.run(log.clone()).await.unwrap();
        assert_eq!(log.order(), vec!["A", "Legacy"]);
    }

    #[tokio::test]
    async fn registration_order_breaks_ties() {
        seed!(A);
        seed!(B);
        seed!(C);

        let log = Arc::new(Log::default());
        let mut seeder = Seeder::config()
            .add_seed::<B>()
            .add_seed::<C>()
            .add_seed::<A>()
            .finish()
            .unwrap();

        seeder.run(log.clone()).await.unwrap();
        assert_eq!(log.order(), vec!["B", "C", "A"]);
    }
}
