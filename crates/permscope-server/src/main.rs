//! permscope CLI
//!
//! Evaluates scoped permissions against seeded grant data.
//!
//! # Usage
//!
//! ```bash
//! # Check permissions for an actor under an organization/project/branch
//! permscope --config demos/permscope.yaml check --actor dev --org org-a \
//!     --project p1 --branch b1 branch:auth:admin project:settings:read
//!
//! # Is the actor the organization owner?
//! permscope --seed demos/seed.json owner --actor olivia --org org-a
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use permscope_domain::cache::register_pool_cache_metrics;
use permscope_domain::model::ScopeContext;
use permscope_domain::resolver::PermissionEngine;
use permscope_server::handlers::batch::BatchCheckRequest;
use permscope_server::observability::init_logging;
use permscope_server::{
    BatchCheckHandler, CacheInvalidatingStore, ServerConfig, StoreDirectoryReader, StoreGrantReader,
};
use permscope_storage::{MemoryPermissionStore, SeedData};

/// permscope - scoped permission resolution
#[derive(Parser, Debug)]
#[command(name = "permscope")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// Seed file (JSON), overrides storage.seed_path
    #[arg(short, long)]
    seed: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check one or more `entity:resource:action` permissions
    Check {
        #[command(flatten)]
        target: Target,

        /// Permissions to check
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Check whether the actor owns the organization
    Owner {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Actor to evaluate; omitted means unauthenticated
    #[arg(long)]
    actor: Option<String>,

    /// Organization id
    #[arg(long)]
    org: String,

    /// Project id
    #[arg(long)]
    project: Option<String>,

    /// Branch id
    #[arg(long)]
    branch: Option<String>,
}

impl Target {
    fn scope(&self) -> ScopeContext {
        ScopeContext {
            organization_id: self.org.clone(),
            project_id: self.project.clone(),
            branch_id: self.branch.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::from_env()?,
    };

    init_logging(config.logging_config());
    register_pool_cache_metrics();

    let engine_config = config.engine_config();
    let store = Arc::new(CacheInvalidatingStore::new(
        MemoryPermissionStore::new_shared(),
        engine_config.cache.clone(),
    ));
    if let Some(path) = cli.seed.as_ref().or(config.storage.seed_path.as_ref()) {
        let seed = SeedData::from_path(path)?;
        seed.apply(store.as_ref())
            .await
            .with_context(|| format!("failed to apply seed data from {path}"))?;
    }

    let engine = Arc::new(PermissionEngine::with_config(
        Arc::new(StoreGrantReader::new(Arc::clone(&store))),
        Arc::new(StoreDirectoryReader::new(Arc::clone(&store))),
        engine_config,
    ));

    match cli.command {
        Command::Check {
            target,
            permissions,
        } => {
            let handler =
                BatchCheckHandler::new(Arc::clone(&engine)).with_max_items(config.batch.max_items);
            let request = BatchCheckRequest::new(target.actor.clone(), target.scope(), permissions);
            info!(scope = %request.scope, "evaluating permissions");

            let response = handler.check(request).await?;
            for result in response.results {
                match (result.outcome, result.error) {
                    (Some(o), _) => println!(
                        "{} can={} loading={} success={}",
                        result.permission, o.can, o.is_loading, o.is_success
                    ),
                    (None, error) => println!(
                        "{} error={}",
                        result.permission,
                        error.unwrap_or_default()
                    ),
                }
            }
        }
        Command::Owner { target } => {
            let outcome = engine
                .is_organization_owner(target.actor.as_deref(), &target.scope())
                .await;
            println!(
                "owner={} loading={} success={}",
                outcome.is_owner, outcome.is_loading, outcome.is_success
            );
        }
    }

    Ok(())
}
