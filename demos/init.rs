//! A small end-to-end seeding run against an in-memory "database".
//!
//! Run with `cargo run --example init --features logging`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tanemaki::{Scope, Seed, SeedKey, SeedResult, Seeder};

#[derive(Default)]
struct Database {
    tables: Mutex<BTreeMap<&'static str, Vec<String>>>,
}

impl Database {
    fn insert(&self, table: &'static str, row: impl Into<String>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .push(row.into());
    }

    fn rows(&self, table: &'static str) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

type Db = Arc<Database>;

#[derive(Default)]
struct SystemConfiguration;

#[async_trait]
impl Seed<Db> for SystemConfiguration {
    async fn run(&self, scope: &Scope<Db>) -> SeedResult {
        tracing::info!("seeding system configuration");
        scope.data().insert("settings", "maintenance_mode=off");
        scope.data().insert("settings", "locale=en");
        Ok(())
    }
}

#[derive(Default)]
struct UserRoles;

#[async_trait]
impl Seed<Db> for UserRoles {
    fn depends_on() -> Vec<SeedKey> {
        vec![SeedKey::of::<SystemConfiguration>()]
    }

    async fn run(&self, scope: &Scope<Db>) -> SeedResult {
        tracing::info!("seeding user roles");
        for role in ["admin", "editor", "reader"] {
            scope.data().insert("roles", role);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Users;

#[async_trait]
impl Seed<Db> for Users {
    fn depends_on() -> Vec<SeedKey> {
        vec![SeedKey::of::<UserRoles>()]
    }

    async fn run(&self, scope: &Scope<Db>) -> SeedResult {
        tracing::info!("seeding users");
        anyhow::ensure!(
            !scope.data().rows("roles").is_empty(),
            "roles must exist before users"
        );
        scope.data().insert("users", "admin@example.com");
        Ok(())
    }
}

#[derive(Default)]
struct Categories;

#[async_trait]
impl Seed<Db> for Categories {
    fn depends_on() -> Vec<SeedKey> {
        vec![SeedKey::of::<SystemConfiguration>()]
    }

    async fn run(&self, scope: &Scope<Db>) -> SeedResult {
        tracing::info!("seeding categories");
        for category in ["news", "guides"] {
            scope.data().insert("categories", category);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Content;

#[async_trait]
impl Seed<Db> for Content {
    fn depends_on() -> Vec<SeedKey> {
        vec![SeedKey::of::<Categories>(), SeedKey::of::<Users>()]
    }

    async fn run(&self, scope: &Scope<Db>) -> SeedResult {
        tracing::info!("seeding content");
        scope.data().insert("content", "welcome post");
        Ok(())
    }
}

#[derive(Default)]
struct AuditLog;

#[async_trait]
impl Seed<Db> for AuditLog {
    fn depends_on_one() -> Option<SeedKey> {
        Some(SeedKey::of::<Users>())
    }

    async fn run(&self, scope: &Scope<Db>) -> SeedResult {
        tracing::info!("seeding audit log");
        scope.data().insert("audit", "database seeded");
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tanemaki::init_logging()?;

    let mut seeder = Seeder::config()
        .add_seed::<Content>()
        .add_seed::<AuditLog>()
        .add_seed::<Users>()
        .add_seed::<UserRoles>()
        .add_seed::<Categories>()
        .add_seed::<SystemConfiguration>()
        .finish()?;

    for key in seeder.resolve()? {
        tracing::info!("planned: {key}");
    }

    let database = Arc::new(Database::default());
    seeder.run(database.clone()).await?;

    for table in ["settings", "roles", "users", "categories", "content", "audit"] {
        tracing::info!("{table}: {} rows", database.rows(table).len());
    }

    Ok(())
}
