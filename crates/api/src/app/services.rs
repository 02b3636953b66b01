//! Store wiring for the API.
//!
//! `DATABASE_URL` selects the Postgres adapters; without it every store is
//! in-memory, optionally seeded from `SITEOPS_FIXTURES`.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use siteops_auth::{
    AccessError, ActorContext, ActorResolver, AuthorizedScope, FallbackPolicy, MappingSource,
    ProfileActorResolver, ProfileStore, ScopeResolution, SiteDirectory, SiteSetResolver,
};
use siteops_infra::{
    AppConfig, FixtureError, Fixtures, InMemoryMappingStore, InMemoryProfileStore, InMemoryRecordStore,
    InMemorySiteDirectory, PostgresMappingSource, PostgresProfileStore, PostgresRecordStore,
    PostgresSiteDirectory, RecordStore,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Fixtures(#[from] FixtureError),
}

/// Everything a handler needs, behind the policy's seams.
pub struct AppServices {
    pub resolver: SiteSetResolver<Arc<dyn MappingSource>>,
    pub directory: Arc<dyn SiteDirectory>,
    pub actors: Arc<dyn ActorResolver>,
    pub records: Arc<dyn RecordStore>,
}

impl AppServices {
    pub fn new(
        mappings: Arc<dyn MappingSource>,
        directory: Arc<dyn SiteDirectory>,
        profiles: Arc<dyn ProfileStore>,
        records: Arc<dyn RecordStore>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            resolver: SiteSetResolver::new(mappings, policy),
            directory,
            actors: Arc::new(ProfileActorResolver::new(profiles)),
            records,
        }
    }

    /// Fresh per request; nothing is cached between calls.
    pub async fn scope_for(&self, actor: &ActorContext) -> Result<AuthorizedScope, AccessError> {
        self.resolver.resolve(actor).await
    }

    pub async fn explain_scope_for(&self, actor: &ActorContext) -> Result<ScopeResolution, AccessError> {
        self.resolver.resolve_detailed(actor).await
    }
}

/// In-memory stores, kept as concrete handles so tests and fixtures can seed them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackends {
    pub mappings: Arc<InMemoryMappingStore>,
    pub directory: Arc<InMemorySiteDirectory>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub records: Arc<InMemoryRecordStore>,
}

impl InMemoryBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, fixtures: &Fixtures) {
        fixtures.apply(&self.mappings, &self.directory, &self.profiles, &self.records);
    }

    pub fn services(&self, policy: FallbackPolicy) -> AppServices {
        AppServices::new(
            self.mappings.clone(),
            self.directory.clone(),
            self.profiles.clone(),
            self.records.clone(),
            policy,
        )
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServiceError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await?;
            tracing::info!("using postgres stores");
            Ok(AppServices::new(
                Arc::new(PostgresMappingSource::new(pool.clone())),
                Arc::new(PostgresSiteDirectory::new(pool.clone())),
                Arc::new(PostgresProfileStore::new(pool.clone())),
                Arc::new(PostgresRecordStore::new(pool)),
                config.fallback,
            ))
        }
        None => {
            let backends = InMemoryBackends::new();
            if let Some(path) = &config.fixtures_path {
                backends.seed(&Fixtures::load(path)?);
            }
            tracing::info!("using in-memory stores");
            Ok(backends.services(config.fallback))
        }
    }
}
