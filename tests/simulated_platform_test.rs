//! End-to-end runs against the simulated platform: role calls go through the
//! engine, applied changes come back through the event router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{guild_store, RecordingAuditEmitter, GUILD, MEMBER_ROLE, USER};
use rolekeeper::adapters::memory::{FaultScript, SimulatedPlatform};
use rolekeeper::domain::models::{ConvergenceKey, ConvergenceRequest, EngineConfig, Outcome};
use rolekeeper::{ConvergenceEngine, RunReport};

async fn run(script: FaultScript, request: ConvergenceRequest) -> (SimulatedPlatform, RunReport) {
    run_with(script, request, |_| {}).await
}

async fn run_with(
    script: FaultScript,
    request: ConvergenceRequest,
    seed: impl FnOnce(&SimulatedPlatform),
) -> (SimulatedPlatform, RunReport) {
    let (platform, updates) = SimulatedPlatform::new(script);
    seed(&platform);
    let engine = ConvergenceEngine::new(
        Arc::new(platform.clone()),
        guild_store(false).await,
        EngineConfig::default(),
    );
    engine.router().spawn(updates);

    let report = engine
        .start_convergence(request)
        .await
        .unwrap()
        .outcome()
        .await
        .unwrap();
    (platform, report)
}

fn grant() -> ConvergenceRequest {
    ConvergenceRequest::grant(ConvergenceKey::new(GUILD, USER), "linked account")
        .with_max_tries(5)
        .with_period(Duration::from_secs(1))
}

fn propagating(delay_ms: u64) -> FaultScript {
    FaultScript {
        propagation_delay: Duration::from_millis(delay_ms),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_grant_converges_after_propagation() {
    let (platform, report) = run(propagating(300), grant()).await;

    assert_eq!(report.outcome, Outcome::Confirmed);
    assert_eq!(report.attempts, 1);
    assert_eq!(platform.member_roles(GUILD, USER), vec![MEMBER_ROLE.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_grant_survives_transient_failures() {
    let script = FaultScript {
        fail_first: 2,
        ..propagating(100)
    };
    let (platform, report) = run(script, grant()).await;

    assert_eq!(report.outcome, Outcome::Confirmed);
    assert_eq!(report.attempts, 3);
    assert_eq!(platform.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_accepted_but_dropped_change_is_retried() {
    let script = FaultScript {
        ignore_first: 1,
        ..propagating(100)
    };
    let (platform, report) = run(script, grant()).await;

    assert_eq!(report.outcome, Outcome::Confirmed);
    assert_eq!(report.attempts, 2);
    assert_eq!(platform.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_platform_ends_run_immediately() {
    let script = FaultScript {
        forbidden: true,
        ..Default::default()
    };
    let (platform, report) = run(script, grant()).await;

    assert_eq!(report.outcome, Outcome::PermanentActionError);
    assert_eq!(platform.call_count(), 1);
    assert!(platform.member_roles(GUILD, USER).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_call_dropped_exhausts_budget() {
    let script = FaultScript {
        ignore_first: u32::MAX,
        ..Default::default()
    };
    let (platform, report) = run(script, grant().with_max_tries(3)).await;

    assert_eq!(report.outcome, Outcome::RetryBudgetExhausted);
    assert_eq!(platform.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_propagation_hits_deadline() {
    let request = grant().with_timeout(Duration::from_secs(2));
    let (platform, report) = run(propagating(10_000), request).await;

    assert_eq!(report.outcome, Outcome::DeadlineExceeded);
    // Applied on the platform, just never observed in time.
    assert_eq!(platform.member_roles(GUILD, USER), vec![MEMBER_ROLE.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_revoke_converges() {
    let request = ConvergenceRequest::revoke(ConvergenceKey::new(GUILD, USER), "left server");
    let (platform, report) = run_with(propagating(50), request, |platform| {
        platform.set_member_roles(GUILD, USER, &[MEMBER_ROLE, "other"]);
    })
    .await;

    assert_eq!(report.outcome, Outcome::Confirmed);
    assert_eq!(platform.member_roles(GUILD, USER), vec!["other".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_change_is_audited() {
    let (platform, updates) = SimulatedPlatform::new(propagating(100));
    let audit = RecordingAuditEmitter::new();
    let engine = ConvergenceEngine::new(
        Arc::new(platform),
        guild_store(true).await,
        EngineConfig::default(),
    )
    .with_audit_emitter(audit.clone());
    engine.router().spawn(updates);

    let report = engine
        .start_convergence(grant())
        .await
        .unwrap()
        .outcome()
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Confirmed);
    assert_eq!(audit.records().len(), 1);
    assert_eq!(audit.records()[0].action.label(), "Grant role");
}
