use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::Value;

use siteops_api::app::{self, InMemoryBackends};
use siteops_auth::{
    ActorProfile, ContractStatus, FallbackPolicy, FallbackTrigger, LegacyPartnerSiteMapping,
    PartnerSiteMapping, SessionClaims,
};
use siteops_core::{OrganizationId, PartnerCompanyId, RecordId, SiteId, UserId};
use siteops_infra::{RecordKind, RecordStatus, SiteRecord};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(backends: &InMemoryBackends, policy: FallbackPolicy) -> Self {
        // Same router as prod, over seeded in-memory stores, on an ephemeral port.
        let app = app::router(Arc::new(backends.services(policy)), JWT_SECRET);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId) -> String {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user_id,
        email: None,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn profile(role: &str) -> ActorProfile {
    let user_id = UserId::new();
    ActorProfile {
        user_id,
        email: format!("{role}@example.com"),
        role: role.to_string(),
        organization_id: None,
        is_restricted: None,
        restricted_org_id: None,
        site_id: None,
        partner_company_id: None,
    }
}

fn record(org: OrganizationId, site: SiteId, kind: RecordKind, day: u32) -> SiteRecord {
    SiteRecord {
        id: RecordId::new(),
        organization_id: org,
        site_id: site,
        kind,
        title: format!("{} on day {day}", kind.as_str()),
        status: RecordStatus::Pending,
        recorded_on: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        approved_by: None,
    }
}

fn primary(partner: PartnerCompanyId, site: SiteId, active: bool) -> PartnerSiteMapping {
    PartnerSiteMapping {
        partner_company_id: partner,
        site_id: site,
        is_active: active,
        start_date: None,
        end_date: None,
    }
}

fn legacy(partner: PartnerCompanyId, site: SiteId, status: ContractStatus) -> LegacyPartnerSiteMapping {
    LegacyPartnerSiteMapping {
        partner_company_id: partner,
        site_id: site,
        contract_status: status,
    }
}

/// Two organizations with one site each and one record per site.
struct World {
    backends: InMemoryBackends,
    org_1: OrganizationId,
    org_2: OrganizationId,
    site_1: SiteId,
    site_2: SiteId,
    record_1: SiteRecord,
    record_2: SiteRecord,
}

impl World {
    fn new() -> Self {
        let backends = InMemoryBackends::new();
        let (org_1, org_2) = (OrganizationId::new(), OrganizationId::new());
        let (site_1, site_2) = (SiteId::new(), SiteId::new());
        backends.directory.insert_site(site_1, org_1);
        backends.directory.insert_site(site_2, org_2);

        let record_1 = record(org_1, site_1, RecordKind::MaterialRequest, 3);
        let record_2 = record(org_2, site_2, RecordKind::Shipment, 4);
        backends.records.insert(record_1.clone());
        backends.records.insert(record_2.clone());

        Self {
            backends,
            org_1,
            org_2,
            site_1,
            site_2,
            record_1,
            record_2,
        }
    }

    fn actor(&self, profile: ActorProfile) -> String {
        let token = mint_jwt(profile.user_id);
        self.backends.profiles.upsert(profile);
        token
    }

    fn restricted_admin(&self) -> String {
        self.actor(ActorProfile {
            organization_id: Some(self.org_1),
            is_restricted: Some(true),
            restricted_org_id: Some(self.org_1),
            ..profile("admin")
        })
    }

    fn partner(&self, partner: PartnerCompanyId) -> String {
        self.actor(ActorProfile {
            partner_company_id: Some(partner),
            ..profile("partner")
        })
    }
}

fn ids(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let world = World::new();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let world = World::new();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/records")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authentication_required");
    assert_eq!(body["message"], "Sign in required.");

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_or_foreign_tokens_are_rejected() {
    let world = World::new();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;
    let client = reqwest::Client::new();
    let admin = profile("system_admin");
    let user_id = admin.user_id;
    world.backends.profiles.upsert(admin);

    let now = Utc::now();
    let expired = SessionClaims {
        sub: user_id,
        email: None,
        issued_at: now - ChronoDuration::hours(2),
        expires_at: now - ChronoDuration::hours(1),
    };
    let expired = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &expired,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    let res = client.get(srv.url("/records")).bearer_auth(expired).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Valid signature, but no profile row behind the subject.
    let orphan = mint_jwt(UserId::new());
    let res = client.get(srv.url("/records")).bearer_auth(orphan).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn restricted_admin_lists_only_its_organization() {
    let world = World::new();
    let token = world.restricted_admin();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .get(srv.url("/records"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(ids(&body), vec![world.record_1.id.to_string()]);
    assert_eq!(body[0]["site_id"], world.site_1.to_string());
}

#[tokio::test]
async fn restricted_admin_cannot_approve_another_organizations_record() {
    let world = World::new();
    let token = world.restricted_admin();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .post(srv.url(&format!("/records/{}/approve", world.record_2.id)))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["message"], "You do not have permission to access this record.");
    let text = body.to_string();
    assert!(!text.contains(&world.org_2.to_string()));
    assert!(!text.contains(&world.site_2.to_string()));

    assert_eq!(world.backends.records.write_calls(), 0);
    let stored = world.backends.records.snapshot(world.record_2.id);
    assert_eq!(stored.map(|r| r.status), Some(RecordStatus::Pending));
}

#[tokio::test]
async fn restricted_admin_cannot_approve_a_record_on_another_organizations_site() {
    let world = World::new();
    // Claims org_1 in its own column, but sits on site_2, which org_2 owns.
    let stray = record(world.org_1, world.site_2, RecordKind::DailyReport, 5);
    world.backends.records.insert(stray.clone());
    let token = world.restricted_admin();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/records"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(!ids(&body).contains(&stray.id.to_string()));

    let res = client
        .post(srv.url(&format!("/records/{}/approve", stray.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert_eq!(world.backends.records.write_calls(), 0);
    let stored = world.backends.records.snapshot(stray.id);
    assert_eq!(stored.map(|r| r.status), Some(RecordStatus::Pending));
}

#[tokio::test]
async fn restricted_admin_approves_within_its_organization() {
    let world = World::new();
    let token = world.restricted_admin();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .post(srv.url(&format!("/records/{}/approve", world.record_1.id)))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "approved");
    assert_eq!(world.backends.records.write_calls(), 1);
}

#[tokio::test]
async fn restricted_admin_without_organization_is_denied() {
    let world = World::new();
    let token = world.actor(ActorProfile {
        is_restricted: Some(true),
        ..profile("admin")
    });
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .get(srv.url("/records"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(world.backends.records.list_calls(), 0);
}

#[tokio::test]
async fn partner_without_mappings_gets_an_empty_list_without_a_query() {
    let world = World::new();
    let partner = PartnerCompanyId::new();
    world.backends.mappings.insert_primary(primary(partner, world.site_1, false));
    world
        .backends
        .mappings
        .insert_legacy(legacy(partner, world.site_2, ContractStatus::Active));
    let token = world.partner(partner);
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .get(srv.url("/records"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!([]));
    assert_eq!(world.backends.records.list_calls(), 0);
    assert_eq!(world.backends.mappings.legacy_reads(), 0);
}

#[tokio::test]
async fn legacy_fallback_grants_non_terminated_sites_when_enabled() {
    let world = World::new();
    let partner = PartnerCompanyId::new();
    world
        .backends
        .mappings
        .insert_legacy(legacy(partner, world.site_1, ContractStatus::Active));
    world
        .backends
        .mappings
        .insert_legacy(legacy(partner, world.site_2, ContractStatus::parse("TERMINATED")));
    let token = world.partner(partner);
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::enabled(FallbackTrigger::OnEmptyOrError)).await;

    let res = reqwest::Client::new()
        .get(srv.url("/records"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(ids(&body), vec![world.record_1.id.to_string()]);
    assert_eq!(world.backends.mappings.legacy_reads(), 1);
}

#[tokio::test]
async fn active_primary_mapping_wins_over_legacy() {
    let world = World::new();
    let partner = PartnerCompanyId::new();
    world.backends.mappings.insert_primary(primary(partner, world.site_2, true));
    world
        .backends
        .mappings
        .insert_legacy(legacy(partner, world.site_1, ContractStatus::Active));
    let token = world.partner(partner);
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::enabled(FallbackTrigger::OnEmptyOrError)).await;

    let res = reqwest::Client::new()
        .get(srv.url("/records"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    let body: Value = res.json().await.unwrap();
    assert_eq!(ids(&body), vec![world.record_2.id.to_string()]);
    assert_eq!(world.backends.mappings.legacy_reads(), 0);
}

#[tokio::test]
async fn unreadable_mappings_deny_with_service_unavailable() {
    let world = World::new();
    let partner = PartnerCompanyId::new();
    world.backends.mappings.fail_primary(true);
    let token = world.partner(partner);
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .get(srv.url("/records"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unavailable");
    assert_eq!(world.backends.records.list_calls(), 0);
}

#[tokio::test]
async fn partner_denial_uses_company_wording_and_writes_nothing() {
    let world = World::new();
    let partner = PartnerCompanyId::new();
    world.backends.mappings.insert_primary(primary(partner, world.site_1, true));
    let token = world.partner(partner);
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url(&format!("/records/{}/approve", world.record_2.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "This record is not available to your company.");
    assert_eq!(world.backends.records.write_calls(), 0);

    let res = client
        .post(srv.url(&format!("/records/{}/approve", world.record_1.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn approve_rejects_malformed_and_unknown_ids() {
    let world = World::new();
    let token = world.actor(profile("system_admin"));
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/records/not-a-uuid/approve"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url(&format!("/records/{}/approve", RecordId::new())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(world.backends.records.write_calls(), 0);
}

#[tokio::test]
async fn analytics_rejects_inverted_date_range_for_every_actor() {
    let world = World::new();
    let admin = world.actor(profile("system_admin"));
    let empty_partner = world.partner(PartnerCompanyId::new());
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;
    let client = reqwest::Client::new();

    for token in [admin, empty_partner] {
        let res = client
            .get(srv.url("/analytics/summary?from=2024-06-30&to=2024-06-01"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn analytics_counts_only_scoped_records_in_range() {
    let world = World::new();
    world
        .backends
        .records
        .insert(record(world.org_1, world.site_1, RecordKind::DailyReport, 20));
    world
        .backends
        .records
        .insert(record(world.org_1, world.site_1, RecordKind::DailyReport, 28));
    let token = world.actor(ActorProfile {
        organization_id: Some(world.org_1),
        site_id: Some(world.site_1),
        ..profile("site_manager")
    });
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .get(srv.url("/analytics/summary?from=2024-06-01&to=2024-06-25"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["by_kind"]["material_request"], 1);
    assert_eq!(body["by_kind"]["daily_report"], 1);
    assert!(body["by_kind"].get("shipment").is_none());
    assert_eq!(body["pending"], 2);
}

#[tokio::test]
async fn whoami_explains_the_resolved_scope() {
    let world = World::new();
    let token = world.restricted_admin();
    let srv = TestServer::spawn(&world.backends, FallbackPolicy::disabled()).await;

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "admin");
    assert_eq!(body["scope"]["mode"], "org");
    assert_eq!(body["scope"]["org_id"], world.org_1.to_string());
}
