// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    crm::CrmClient,
    db::Repositories,
    services::{
        auth::AuthService,
        identity::{GatewayIdentityProvider, IdentityProvider},
        import::LeadImportService,
        jobs::JobsService,
    },
};

/// Everything the CRM-facing workflows need, resolved once at startup and
/// injected explicitly instead of read from ambient globals.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub organization_id: Option<String>,
    /// Fixed sales-process checklist template copied onto new jobs.
    pub checklist_template_id: Option<String>,
    /// Org-level grant key used on the admin path (deployment policy).
    pub admin_grant_key: Option<String>,
    /// Outside production, created customer names get a "[TEST] " prefix.
    pub is_production: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub repos: Repositories,
    pub auth_service: AuthService,
    pub import_service: LeadImportService,
    pub jobs_service: JobsService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret =
            env::var("IDENTITY_JWT_SECRET").expect("IDENTITY_JWT_SECRET must be set");
        let identity_api_url =
            env::var("IDENTITY_API_URL").expect("IDENTITY_API_URL must be set");
        let crm_endpoint = env::var("CRM_ENDPOINT").expect("CRM_ENDPOINT must be set");

        let crm_config = Arc::new(CrmConfig {
            organization_id: env::var("CRM_ORGANIZATION_ID").ok(),
            checklist_template_id: env::var("CRM_CHECKLIST_TEMPLATE_ID").ok(),
            admin_grant_key: env::var("CRM_ADMIN_GRANT_KEY").ok(),
            is_production: env::var("APP_ENV").map(|e| e == "production").unwrap_or(false),
        });

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("database connection established");

        // Dependency graph: repositories first, then the services on top.
        let repos = Repositories::new(db_pool.clone());
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(GatewayIdentityProvider::new(jwt_secret, identity_api_url));
        let crm = Arc::new(CrmClient::new(crm_endpoint));

        let auth_service = AuthService::new(
            identity,
            Arc::new(repos.clone()),
            crm_config.admin_grant_key.clone(),
        );
        let import_service = LeadImportService::new(
            crm.clone(),
            Arc::new(repos.clone()),
            crm_config.clone(),
        );
        let jobs_service =
            JobsService::new(crm, Arc::new(repos.clone()), crm_config.clone());

        Ok(Self {
            db_pool,
            repos,
            auth_service,
            import_service,
            jobs_service,
        })
    }
}
