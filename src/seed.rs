//! All the seed-related abstractions.
//!
//! A [`Seed`] is a named unit of initialization work with declared
//! prerequisites. Seeds are identified nominally by their concrete type, so
//! every registered seed type maps to exactly one [`SeedKey`].
//!
//! ## Declaring prerequisites
//!
//! A seed can declare what must run before it through three sources, read
//! with a fixed precedence:
//!
//! 1. [`Seed::depends_on`] — an explicit list, wins whenever it is non-empty.
//! 2. [`Seed::depends_on_one`] — shorthand for a single prerequisite.
//! 3. [`Seed::legacy_dependency`] — deprecated single field, read only when
//!    the other two are empty.
//!
//! The first populated source wins and the rest are ignored, even if they are
//! also set. Declarations are static per-type metadata, which is what makes
//! it safe for the engine to execute a different instance of the same seed
//! type than the one the declarations were read from.

use std::any::{TypeId, type_name};
use std::collections::HashSet;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;

use crate::Scope;

/// Result from a single executed seed.
pub type SeedResult = anyhow::Result<()>;

/// Nominal identity of a registered seed type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeedKey {
    id: TypeId,
    name: &'static str,
}

impl SeedKey {
    /// The key of the seed type `S`.
    pub fn of<S: 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    /// Fully qualified type name of the seed.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without the module path, used in messages.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl Display for SeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl Debug for SeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedKey({})", self.name)
    }
}

/// A named unit of initialization work, executed at most once per run, after
/// every seed it depends on has completed.
///
/// The `G` type parameter is the shared data container owned by the per-run
/// [`Scope`], which can be replaced with the `()` Unit if you don't need to
/// pass any data.
#[async_trait]
pub trait Seed<G = ()>: Send + Sync
where
    G: Send + Sync,
{
    /// Seeds that must complete before this one, in declaration order.
    /// Highest-precedence declaration source.
    fn depends_on() -> Vec<SeedKey>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Shorthand for declaring a single prerequisite. Ignored whenever
    /// [`Seed::depends_on`] is non-empty.
    fn depends_on_one() -> Option<SeedKey>
    where
        Self: Sized,
    {
        None
    }

    /// Single prerequisite as declared by seeds written against the old
    /// interface. Read only when both other sources are empty.
    #[deprecated(note = "declare prerequisites with `depends_on` instead")]
    fn legacy_dependency() -> Option<SeedKey>
    where
        Self: Sized,
    {
        None
    }

    /// Performs the seeding operation. Called by the engine after all
    /// declared prerequisites have completed.
    async fn run(&self, scope: &Scope<G>) -> SeedResult;
}

/// The three dependency declaration sources of a seed type, captured before
/// normalization.
pub(crate) struct DependencySpec {
    pub list: Vec<SeedKey>,
    pub single: Option<SeedKey>,
    pub legacy: Option<SeedKey>,
}

impl DependencySpec {
    /// Capture the declarations of the seed type `S`.
    pub(crate) fn of<S, G>() -> Self
    where
        S: Seed<G>,
        G: Send + Sync,
    {
        #[allow(deprecated)]
        let legacy = S::legacy_dependency();

        Self {
            list: S::depends_on(),
            single: S::depends_on_one(),
            legacy,
        }
    }

    /// Collapse the sources into one ordered dependency list. The first
    /// populated source wins; duplicates keep their first occurrence.
    pub(crate) fn normalize(self) -> Vec<SeedKey> {
        let picked = if !self.list.is_empty() {
            self.list
        } else if let Some(key) = self.single {
            vec![key]
        } else if let Some(key) = self.legacy {
            vec![key]
        } else {
            Vec::new()
        };

        let mut seen = HashSet::new();
        picked.into_iter().filter(|key| seen.insert(*key)).collect()
    }
}

/// Factory producing a fresh seed instance bound to the current run's scope.
pub(crate) type SeedFactory<G> = Arc<dyn Fn(&Scope<G>) -> Box<dyn Seed<G>> + Send + Sync>;

/// Registration record for a single seed type.
pub(crate) struct SeedEntry<G: Send + Sync> {
    pub key: SeedKey,
    /// Normalized at registration time; dependency declarations are static
    /// per-type metadata, so they cannot change between runs.
    pub dependencies: Vec<SeedKey>,
    pub factory: SeedFactory<G>,
}

impl<G: Send + Sync> SeedEntry<G> {
    pub(crate) fn new<S>(factory: SeedFactory<G>) -> Self
    where
        S: Seed<G> + 'static,
    {
        Self {
            key: SeedKey::of::<S>(),
            dependencies: DependencySpec::of::<S, G>().normalize(),
            factory,
        }
    }
}
