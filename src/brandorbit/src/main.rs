//! BrandOrbit — multi-tenant marketing platform, privacy & deletion core.
//!
//! Main entry point that wires the privacy pipeline, spawns the scheduled
//! cascade worker, and starts the API server.

use clap::Parser;
use orbit_api::{ApiServer, AppState};
use orbit_content::ContentStore;
use orbit_core::config::AppConfig;
use orbit_platform::{AuditRecorder, OrgDirectory, Role, RoleDirectory};
use orbit_platform::tenancy::PlanTier;
use orbit_privacy::export::ExportCollector;
use orbit_privacy::{DeletionQueue, DeletionWorker, DsrLedger, PrivacyPipeline};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "brandorbit")]
#[command(about = "Multi-tenant marketing platform — privacy & deletion core")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "BRANDORBIT__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Cascade worker poll interval in seconds (overrides config)
    #[arg(long, env = "BRANDORBIT__PRIVACY__WORKER_INTERVAL_SECS")]
    worker_interval: Option<u64>,

    /// Skip the scheduled cascade worker (API-only mode)
    #[arg(long, default_value_t = false)]
    api_only: bool,

    /// Seed a demo organization with content and an admin account
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brandorbit=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("BrandOrbit starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(interval) = cli.worker_interval {
        config.privacy.worker_interval_secs = interval;
    }

    info!(
        service = %config.service_name,
        http_port = config.api.http_port,
        worker_interval_secs = config.privacy.worker_interval_secs,
        grace_period_hours = config.privacy.grace_period_hours,
        "Configuration loaded"
    );

    // Wire the privacy core
    let ledger = Arc::new(DsrLedger::new());
    let queue = Arc::new(DeletionQueue::new());
    let orgs = Arc::new(OrgDirectory::new());
    let roles = Arc::new(RoleDirectory::new());
    let audit = Arc::new(AuditRecorder::new());
    let store = Arc::new(ContentStore::new());

    if cli.seed_demo {
        seed_demo(&orgs, &roles, &store);
    }

    let collector = ExportCollector::new(store.clone(), orgs.clone());
    let worker = Arc::new(DeletionWorker::new(
        queue.clone(),
        store.clone(),
        orgs.clone(),
        ledger.clone(),
        audit.clone(),
        &config.privacy,
    ));
    let pipeline = Arc::new(PrivacyPipeline::new(
        ledger,
        queue,
        orgs,
        roles,
        audit.clone(),
        collector,
        worker.clone(),
        &config.privacy,
    ));

    // Spawn the scheduled cascade worker
    if !cli.api_only {
        let worker_for_schedule = worker.clone();
        let interval_secs = config.privacy.worker_interval_secs;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                worker_for_schedule.run_once();
            }
        });
        info!(interval_secs, "Cascade deletion worker scheduled");
    } else {
        info!("Running in API-only mode (no cascade worker)");
    }

    // Start API server
    let state = AppState {
        pipeline,
        audit,
        service_name: config.service_name.clone(),
        start_time: Instant::now(),
    };
    let api_server = ApiServer::new(config, state);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        tracing::error!(error = %e, "Failed to start metrics exporter");
    }

    info!("BrandOrbit is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}

/// Seed one demo organization, a member with content, and an admin account.
fn seed_demo(orgs: &OrgDirectory, roles: &RoleDirectory, store: &ContentStore) {
    let owner = Uuid::new_v4();
    let org = orgs.create_org("Acme Creative".into(), owner, PlanTier::Professional);
    store.seed_demo_content(org.id, owner);

    let admin = Uuid::new_v4();
    roles.assign(admin, Role::Admin);

    info!(
        org_id = %org.id,
        owner_id = %owner,
        admin_id = %admin,
        "Demo data seeded"
    );
}
