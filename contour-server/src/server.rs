// contour-server/src/server.rs
// ============================================================================
// Module: Contour HTTP Server
// Description: Resolution and administration endpoints over axum.
// Purpose: Expose the resolution core with strict status-code mapping.
// Dependencies: contour-core, axum, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! The HTTP surface serves resolution (`GET /config/{app_id}/{version}`),
//! specification administration, composition diagnostics, and a health
//! probe. Request contexts are assembled at the edge: the user-agent header
//! is parsed, the peer IP is geolocated (the request's single suspension
//! point, bridged through `spawn_blocking`), and malformed JSON query values
//! are treated as absent rather than rejected.
//!
//! Status mapping: 200 on success, 404 for unknown specifications, 400 for
//! validation and composition failures on admin routes, 500 for unexpected
//! errors including composition failures raised during resolution.
//!
//! Security posture: all request inputs are untrusted; bodies are decoded
//! with strict types and identifier components are sanitized by the
//! persistence layer before touching disk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Json;
use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::USER_AGENT;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use contour_core::AppId;
use contour_core::ClientGeo;
use contour_core::Environment;
use contour_core::GeoLocation;
use contour_core::GeoLocator;
use contour_core::LoadCondition;
use contour_core::MatchedRule;
use contour_core::ParsedUserAgent;
use contour_core::RequestContext;
use contour_core::ResolutionStrategy;
use contour_core::ResolveError;
use contour_core::Resolver;
use contour_core::Rule;
use contour_core::RuleId;
use contour_core::RulePatch;
use contour_core::SpecPersistence;
use contour_core::SpecVersion;
use contour_core::Specification;
use contour_core::TemplateId;
use contour_core::Timestamp;
use contour_core::UserAgentParser;
use contour_core::UserId;
use contour_core::ValidationReport;
use contour_core::runtime::compose_rules;
use contour_core::runtime::evaluate_load_condition;
use contour_core::runtime::instantiate_template;
use contour_core::runtime::validate_config;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::telemetry::ApiMetricEvent;
use crate::telemetry::ApiMetrics;
use crate::telemetry::ApiOutcome;
use crate::telemetry::ApiRoute;

// ============================================================================
// SECTION: Application State
// ============================================================================

/// Shared server state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Resolution orchestrator over the in-memory store.
    resolver: Arc<Resolver>,
    /// Durable persistence behind the store.
    persistence: Arc<dyn SpecPersistence + Send + Sync>,
    /// User-agent parsing capability.
    ua_parser: Arc<dyn UserAgentParser + Send + Sync>,
    /// IP geolocation capability.
    geo: Arc<dyn GeoLocator + Send + Sync>,
    /// Metrics sink.
    metrics: Arc<dyn ApiMetrics>,
}

impl AppState {
    /// Assembles server state from its collaborators.
    #[must_use]
    pub fn new(
        resolver: Arc<Resolver>,
        persistence: Arc<dyn SpecPersistence + Send + Sync>,
        ua_parser: Arc<dyn UserAgentParser + Send + Sync>,
        geo: Arc<dyn GeoLocator + Send + Sync>,
        metrics: Arc<dyn ApiMetrics>,
    ) -> Self {
        Self {
            resolver,
            persistence,
            ua_parser,
            geo,
            metrics,
        }
    }
}

/// Builds the API router over the given state.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(list_specs).post(create_spec))
        .route(
            "/config/{app_id}/{version}",
            get(resolve_config).put(replace_spec).delete(delete_spec),
        )
        .route("/rules/compose", post(compose_endpoint))
        .route("/rules/from-template", post(from_template))
        .route("/rules/test-conditions", post(test_conditions))
        .with_state(state)
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Query parameters accepted by the resolution endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ResolveQuery {
    /// Environment override label.
    pub env: Option<String>,
    /// End-user identifier for rollout bucketing.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// Client-provided country code.
    pub country: Option<String>,
    /// Client-provided region code.
    pub region: Option<String>,
    /// JSON-encoded feature-flag mapping.
    pub flags: Option<String>,
    /// JSON-encoded custom-context mapping.
    pub context: Option<String>,
}

/// Resolution response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveResponse {
    /// Application identifier.
    app_id: AppId,
    /// Specification version.
    version: SpecVersion,
    /// Effective configuration document.
    config: Value,
    /// Matched rules in match order.
    matched_rules: Vec<MatchedRule>,
    /// Schema findings for the effective configuration.
    validation: ValidationReport,
    /// Effective context attributes echoed back to the caller.
    context: ContextEcho,
}

/// Effective context attributes echoed in resolution responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextEcho {
    /// Effective operating system name.
    os: Option<String>,
    /// Effective device type.
    device: Option<String>,
    /// Effective country code.
    geo_country: Option<String>,
    /// Effective region code.
    geo_region: Option<String>,
}

/// Specification summary returned by the listing endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpecSummary {
    /// Application identifier.
    app_id: AppId,
    /// Specification version.
    version: SpecVersion,
    /// Target environment.
    environment: Environment,
    /// Number of rules in the specification.
    rule_count: usize,
    /// Last update timestamp.
    updated_at: Timestamp,
}

/// Composition request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposeRequest {
    /// Source rules to compose, in order.
    source_rules: Vec<Rule>,
    /// Identifier for the composed rule.
    new_rule_id: RuleId,
    /// Combination strategy; defaults to deep merge.
    #[serde(default)]
    strategy: Option<ResolutionStrategy>,
}

/// Template instantiation request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FromTemplateRequest {
    /// Application identifier of the owning specification.
    app_id: AppId,
    /// Specification version.
    version: SpecVersion,
    /// Template to instantiate.
    template_id: TemplateId,
    /// Overrides applied over the template.
    #[serde(default)]
    overrides: RulePatch,
}

/// Conditional-rule diagnostics request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestConditionsRequest {
    /// Application identifier of the owning specification.
    app_id: AppId,
    /// Specification version.
    version: SpecVersion,
    /// Request context to evaluate the gates against.
    #[serde(default)]
    context: RequestContext,
}

/// Per-gate outcome in conditional-rule diagnostics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GateEvaluation {
    /// Gated rule identifier.
    rule_id: RuleId,
    /// Whether every load condition held.
    loaded: bool,
    /// Per-condition outcomes in declaration order.
    conditions: Vec<GateConditionOutcome>,
}

/// One load-condition outcome.
#[derive(Debug, Serialize)]
struct GateConditionOutcome {
    /// Load-condition kind label.
    #[serde(rename = "type")]
    kind: &'static str,
    /// Whether the condition held.
    satisfied: bool,
}

/// Conditional-rule diagnostics response body.
#[derive(Debug, Serialize)]
struct TestConditionsResponse {
    /// Identifiers of rules whose gates all held.
    loaded: Vec<RuleId>,
    /// Per-gate evaluations.
    evaluations: Vec<GateEvaluation>,
}

// ============================================================================
// SECTION: Resolution Handler
// ============================================================================

/// `GET /config/{app_id}/{version}` — resolve the effective configuration.
async fn resolve_config(
    State(state): State<AppState>,
    Path((app_id, version)): Path<(String, String)>,
    Query(query): Query<ResolveQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let parsed_ua = state.ua_parser.parse(&user_agent);
    let geo = lookup_geo(&state, peer.ip().to_string()).await;
    let context = build_context(query, user_agent, parsed_ua, geo, version.clone());

    let app_id = AppId::new(app_id);
    let version = SpecVersion::new(version);
    let response = match state.resolver.resolve(&app_id, &version, &context) {
        Ok(resolution) => {
            let echo = ContextEcho {
                os: context.effective_os().map(str::to_string),
                device: context.effective_device().map(str::to_string),
                geo_country: context.effective_country().map(str::to_string),
                geo_region: context.effective_region().map(str::to_string),
            };
            Json(ResolveResponse {
                app_id: resolution.app_id,
                version: resolution.version,
                config: resolution.config,
                matched_rules: resolution.matched_rules,
                validation: resolution.validation,
                context: echo,
            })
            .into_response()
        }
        Err(err @ ResolveError::NotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, err.to_string())
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    record(&state, ApiRoute::Resolve, &response, started);
    response
}

/// Geolocates the peer address off the async runtime.
async fn lookup_geo(state: &AppState, ip: String) -> Option<GeoLocation> {
    let locator = Arc::clone(&state.geo);
    tokio::task::spawn_blocking(move || locator.locate(&ip)).await.ok().flatten()
}

/// Assembles the request context from transport inputs.
///
/// Malformed JSON query values (`flags`, `context`) are treated as absent;
/// unknown environment labels are ignored. The path version doubles as the
/// client application version.
fn build_context(
    query: ResolveQuery,
    user_agent: String,
    parsed_ua: ParsedUserAgent,
    geo: Option<GeoLocation>,
    app_version: String,
) -> RequestContext {
    let feature_flags: BTreeMap<String, bool> = query
        .flags
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();
    let custom: Map<String, Value> = query
        .context
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();
    let client_geo = (query.country.is_some() || query.region.is_some()).then(|| ClientGeo {
        country: query.country.clone(),
        region: query.region.clone(),
    });

    RequestContext {
        user_agent,
        parsed_ua,
        app_version,
        os: None,
        device: None,
        geo_country: geo.as_ref().and_then(|location| location.country.clone()),
        geo_region: geo.as_ref().and_then(|location| location.region.clone()),
        client_geo,
        timestamp: now_timestamp(),
        environment: query.env.as_deref().and_then(Environment::parse),
        feature_flags,
        user_id: query.user_id.map(UserId::new),
        custom,
    }
}

// ============================================================================
// SECTION: Administration Handlers
// ============================================================================

/// `GET /config` — list specification summaries.
async fn list_specs(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = match state.resolver.store().list() {
        Ok(specs) => {
            let summaries: Vec<SpecSummary> = specs
                .iter()
                .map(|spec| SpecSummary {
                    app_id: spec.app_id.clone(),
                    version: spec.version.clone(),
                    environment: spec.environment,
                    rule_count: spec.rules.len(),
                    updated_at: spec.updated_at,
                })
                .collect();
            Json(summaries).into_response()
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    record(&state, ApiRoute::ListSpecs, &response, started);
    response
}

/// `POST /config` — create a specification after validating its default.
async fn create_spec(State(state): State<AppState>, Json(mut spec): Json<Specification>) -> Response {
    let started = Instant::now();
    let response = match validate_new_spec(&spec) {
        Err(body) => body,
        Ok(()) => {
            let now = now_timestamp();
            if spec.created_at == Timestamp::default() {
                spec.created_at = now;
            }
            store_spec(&state, spec, now)
        }
    };
    record(&state, ApiRoute::CreateSpec, &response, started);
    response
}

/// `PUT /config/{app_id}/{version}` — replace, preserving identity fields.
async fn replace_spec(
    State(state): State<AppState>,
    Path((app_id, version)): Path<(String, String)>,
    Json(mut spec): Json<Specification>,
) -> Response {
    let started = Instant::now();
    let app_id = AppId::new(app_id);
    let version = SpecVersion::new(version);

    let response = match state.resolver.store().get(&app_id, &version) {
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("specification not found: {app_id}@{version}"),
        ),
        Ok(Some(existing)) => {
            spec.id = existing.id;
            spec.app_id = existing.app_id;
            spec.version = existing.version;
            spec.created_at = existing.created_at;
            match validate_new_spec(&spec) {
                Err(body) => body,
                Ok(()) => store_spec(&state, spec, now_timestamp()),
            }
        }
    };
    record(&state, ApiRoute::ReplaceSpec, &response, started);
    response
}

/// `DELETE /config/{app_id}/{version}` — remove a specification.
async fn delete_spec(
    State(state): State<AppState>,
    Path((app_id, version)): Path<(String, String)>,
) -> Response {
    let started = Instant::now();
    let app_id = AppId::new(app_id);
    let version = SpecVersion::new(version);

    let response = match state.resolver.store().delete(&app_id, &version) {
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            format!("specification not found: {app_id}@{version}"),
        ),
        Ok(true) => {
            state.resolver.invalidate_caches();
            match state.persistence.remove(&app_id, &version) {
                Ok(()) => Json(json!({ "deleted": true })).into_response(),
                Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            }
        }
    };
    record(&state, ApiRoute::DeleteSpec, &response, started);
    response
}

/// Validates structure and default-config schema for create/replace.
fn validate_new_spec(spec: &Specification) -> Result<(), Response> {
    if let Err(err) = spec.validate() {
        return Err(error_response(StatusCode::BAD_REQUEST, err.to_string()));
    }
    let report = validate_config(&spec.default_config, &spec.schema);
    if !report.valid {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "default config failed schema validation",
                "errors": report.errors,
            })),
        )
            .into_response());
    }
    Ok(())
}

/// Saves to the in-memory store, persists, and invalidates loader caches.
fn store_spec(state: &AppState, spec: Specification, now: Timestamp) -> Response {
    let stored = match state.resolver.store().save(spec, now) {
        Ok(stored) => stored,
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    state.resolver.invalidate_caches();
    match state.persistence.persist(&stored) {
        Ok(()) => Json(stored).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

// ============================================================================
// SECTION: Diagnostics Handlers
// ============================================================================

/// `POST /rules/compose` — compose rules from the request body.
async fn compose_endpoint(
    State(state): State<AppState>,
    Json(request): Json<ComposeRequest>,
) -> Response {
    let started = Instant::now();
    let sources: Vec<&Rule> = request.source_rules.iter().collect();
    let response = match compose_rules(
        &sources,
        request.new_rule_id,
        request.strategy.unwrap_or_default(),
    ) {
        Ok(rule) => Json(rule).into_response(),
        Err(err) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    record(&state, ApiRoute::ComposeRules, &response, started);
    response
}

/// `POST /rules/from-template` — instantiate a specification template.
async fn from_template(
    State(state): State<AppState>,
    Json(request): Json<FromTemplateRequest>,
) -> Response {
    let started = Instant::now();
    let response = match state.resolver.store().get(&request.app_id, &request.version) {
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("specification not found: {}@{}", request.app_id, request.version),
        ),
        Ok(Some(spec)) => {
            match instantiate_template(&spec.rule_templates, &request.template_id, &request.overrides)
            {
                Ok(rule) => Json(rule).into_response(),
                Err(err) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
            }
        }
    };
    record(&state, ApiRoute::FromTemplate, &response, started);
    response
}

/// `POST /rules/test-conditions` — evaluate conditional-rule gates.
async fn test_conditions(
    State(state): State<AppState>,
    Json(request): Json<TestConditionsRequest>,
) -> Response {
    let started = Instant::now();
    let response = match state.resolver.store().get(&request.app_id, &request.version) {
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("specification not found: {}@{}", request.app_id, request.version),
        ),
        Ok(Some(spec)) => {
            let mut loaded = Vec::new();
            let mut evaluations = Vec::new();
            for conditional in &spec.conditional_rules {
                let conditions: Vec<GateConditionOutcome> = conditional
                    .load_conditions
                    .iter()
                    .map(|condition| GateConditionOutcome {
                        kind: load_condition_kind(condition),
                        satisfied: evaluate_load_condition(condition, &spec, &request.context),
                    })
                    .collect();
                let all_satisfied = conditions.iter().all(|outcome| outcome.satisfied);
                if all_satisfied {
                    loaded.push(conditional.rule_id.clone());
                }
                evaluations.push(GateEvaluation {
                    rule_id: conditional.rule_id.clone(),
                    loaded: all_satisfied,
                    conditions,
                });
            }
            Json(TestConditionsResponse {
                loaded,
                evaluations,
            })
            .into_response()
        }
    };
    record(&state, ApiRoute::TestConditions, &response, started);
    response
}

/// Returns the stable label for a load-condition kind.
const fn load_condition_kind(condition: &LoadCondition) -> &'static str {
    match condition {
        LoadCondition::Environment(_) => "environment",
        LoadCondition::FeatureFlag { .. } => "feature_flag",
        LoadCondition::PercentageRollout { .. } => "percentage_rollout",
        LoadCondition::Custom { .. } => "custom",
        LoadCondition::Unknown => "unknown",
    }
}

// ============================================================================
// SECTION: Health
// ============================================================================

/// `GET /health` — liveness probe.
async fn health(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = Json(json!({ "status": "ok" })).into_response();
    record(&state, ApiRoute::Health, &response, started);
    response
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a JSON error body with the given status.
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Records one request metric event.
fn record(state: &AppState, route: ApiRoute, response: &Response, started: Instant) {
    state.metrics.record(&ApiMetricEvent {
        route,
        outcome: ApiOutcome::from_status(response.status().as_u16()),
        latency: started.elapsed(),
    });
}

/// Reads the host clock as a core timestamp.
#[must_use]
pub fn now_timestamp() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}
