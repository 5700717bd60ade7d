//! End-to-end tests for the planner service.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use adplan_core::audit::{AuditDocument, AuditError, AuditStore, InMemoryAuditStore};
use adplan_core::catalog::Channel;
use adplan_core::error::EngineError;
use adplan_core::generation::{GenerationClient, ScriptedGenerationClient};
use adplan_core::pruning::PassState;
use adplan_core::validate::Violation;
use adplan_core::{Planner, RequestError};

use common::{
    ITEM_PATH, catalog_source, plan_text, registry, request, strict_profile, uniform_plan,
};

struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn record(&self, _document: &AuditDocument) -> Result<(), AuditError> {
        Err(AuditError::Backend(anyhow::anyhow!("database is down")))
    }
}

fn planner(
    client: &Arc<ScriptedGenerationClient>,
    count: i64,
    passes: u8,
) -> (Planner, Arc<InMemoryAuditStore>) {
    let audit = Arc::new(InMemoryAuditStore::new());
    let planner = Planner::new(
        registry(strict_profile(0.25, passes)),
        Arc::new(catalog_source(count, 5000.0)),
        client.clone() as Arc<dyn GenerationClient>,
    )
    .with_audit_store(audit.clone());
    (planner, audit)
}

#[tokio::test]
async fn accepted_plan_becomes_priced_result() {
    let client = Arc::new(ScriptedGenerationClient::from_texts([
        uniform_plan(6, 5000.0),
        uniform_plan(4, 5000.0),
    ]));
    let (planner, audit) = planner(&client, 6, 4);

    let result = planner.plan(&request(20_000.0)).await.unwrap();

    assert_eq!(result.selected_inventory.len(), 4);
    assert_eq!(result.pricing.total, 20_000.0);
    assert_eq!(result.pricing.remaining_budget, 0.0);
    assert_eq!(result.algorithm.id, common::PROFILE_ID);

    let line = &result.selected_inventory[0].items[0];
    assert_eq!(line.item_path, ITEM_PATH);
    assert_eq!(line.item_cost, 5000.0);
    assert_eq!(line.specifications["dimensions"], "10x12");
    assert!(line.audience.is_some());

    assert!(result.estimated_performance.reach > 0);
    assert!(!result.warnings.iter().any(|w| w.contains("hard limit")));
    assert!(result.warnings.iter().any(|w| w.starts_with("4 publications selected")));

    let docs = audit.documents();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].state, PassState::Accepted);
    assert_eq!(docs[0].diff.removed_publications, vec![5, 6]);
    assert_eq!(docs[0].before.line_item_total, 30_000.0);
    assert_eq!(docs[0].after.line_item_total, 20_000.0);
}

#[tokio::test]
async fn understated_rates_never_yield_an_over_budget_result() {
    let understated: Vec<(i64, f64)> = (1..=6).map(|id| (id, 1.0)).collect();
    let client = Arc::new(ScriptedGenerationClient::from_texts([
        plan_text(&understated, 3000.0),
        uniform_plan(4, 5000.0),
    ]));
    let (planner, audit) = planner(&client, 6, 4);

    let result = planner.plan(&request(20_000.0)).await.unwrap();

    assert_eq!(client.call_count(), 2);
    assert_eq!(result.pricing.total, 20_000.0);
    for publication in &result.selected_inventory {
        assert!(publication.publication_total <= 5000.0);
    }
    let docs = audit.documents();
    assert_eq!(docs[0].state, PassState::Accepted);
    assert_eq!(docs[0].before.total_cost, Some(18_000.0));
    assert_eq!(docs[0].before.line_item_total, 30_000.0);
}

#[tokio::test]
async fn persistent_understated_rates_are_reported_as_over_budget() {
    let understated: Vec<(i64, f64)> = (1..=6).map(|id| (id, 1.0)).collect();
    let client = Arc::new(ScriptedGenerationClient::from_texts(vec![
        plan_text(&understated, 3000.0);
        2
    ]));
    let (planner, _) = planner(&client, 6, 1);

    let result = planner.plan(&request(20_000.0)).await.unwrap();

    assert_eq!(result.pricing.total, 30_000.0);
    assert_eq!(
        result.warnings[0],
        "plan still breaks 1 hard limit(s) after 1 correction pass(es)"
    );
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.contains("total cost $30,000.00 exceeds the budget ceiling of $20,000.00"))
    );
}

#[tokio::test]
async fn negative_quantity_cannot_offset_spend() {
    let mut profile = strict_profile(0.25, 1);
    profile.constraints.min_publication_spend = 0.0;
    let offsetting = [(1, 1.0), (2, 1.0), (3, 1.0), (4, 1.0), (5, -0.1)];
    let client = Arc::new(ScriptedGenerationClient::from_texts(vec![
        plan_text(&offsetting, 5000.0);
        2
    ]));
    let audit = Arc::new(InMemoryAuditStore::new());
    let planner = Planner::new(
        registry(profile),
        Arc::new(catalog_source(5, 5000.0)),
        client.clone() as Arc<dyn GenerationClient>,
    )
    .with_audit_store(audit.clone());

    let result = planner.plan(&request(20_000.0)).await.unwrap();

    assert_eq!(client.call_count(), 2);
    assert_eq!(result.pricing.total, 20_000.0);
    assert_eq!(result.selected_inventory.len(), 4);
    assert!(
        result
            .selected_inventory
            .iter()
            .flat_map(|p| &p.items)
            .all(|line| line.quantity > 0.0 && line.item_cost > 0.0)
    );
    assert!(result.warnings.iter().any(|w| w.contains("must be positive")));
    assert!(result.warnings.iter().any(|w| w.starts_with("dropped Print Edition - Full Page from publication #5")));

    let docs = audit.documents();
    assert_eq!(docs[0].state, PassState::Exhausted);
    assert!(docs[0].violations.iter().any(|v| matches!(
        v,
        Violation::InvalidLine { publication_id: 5, .. }
    )));
}

#[tokio::test]
async fn exhausted_plan_carries_violation_warnings() {
    let client = Arc::new(ScriptedGenerationClient::from_texts(vec![
        uniform_plan(6, 5000.0);
        2
    ]));
    let (planner, audit) = planner(&client, 6, 1);

    let result = planner.plan(&request(20_000.0)).await.unwrap();

    assert_eq!(client.call_count(), 2);
    assert_eq!(result.pricing.total, 30_000.0);
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w == "plan still breaks 1 hard limit(s) after 1 correction pass(es)"),
        "warnings: {:?}",
        result.warnings
    );
    assert!(result.warnings.iter().any(|w| w.contains("exceeds the budget ceiling")));
    assert_eq!(audit.documents()[0].state, PassState::Exhausted);
}

#[tokio::test]
async fn empty_catalog_fails_before_any_call() {
    let client = Arc::new(ScriptedGenerationClient::from_texts([uniform_plan(1, 5000.0)]));
    let (planner, audit) = planner(&client, 0, 4);

    let err = planner.plan(&request(20_000.0)).await.unwrap_err();

    assert!(matches!(err.kind(), EngineError::CatalogEmpty { hub_id } if hub_id == "metro"));
    assert_eq!(client.call_count(), 0);
    assert!(audit.documents().is_empty());
}

#[tokio::test]
async fn filtered_out_channels_count_as_empty_catalog() {
    let client = Arc::new(ScriptedGenerationClient::from_texts([uniform_plan(1, 5000.0)]));
    let (planner, _) = planner(&client, 3, 4);
    let mut req = request(20_000.0);
    req.exclude_channels = Some(vec![Channel::Print]);

    let err = planner.plan(&req).await.unwrap_err();
    assert!(matches!(err.kind(), EngineError::CatalogEmpty { .. }));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn errors_carry_request_context() {
    let client = Arc::new(ScriptedGenerationClient::default());
    let (planner, _) = planner(&client, 3, 4);
    let mut req = request(20_000.0);
    req.strategy_profile_id = "no-such-profile".to_string();
    let request_id = Uuid::new_v4();

    let err = planner.plan_with_id(request_id, &req).await.unwrap_err();

    assert_eq!(err.request_id, request_id);
    assert_eq!(err.hub_id, "metro");
    assert_eq!(err.profile_id, "no-such-profile");
    assert!(matches!(err.kind(), EngineError::UnknownProfile(_)));
    let source = std::error::Error::source(&err).expect("cause preserved");
    assert!(source.to_string().contains("no-such-profile"));
}

#[tokio::test]
async fn invalid_request_is_rejected_up_front() {
    let client = Arc::new(ScriptedGenerationClient::default());
    let (planner, _) = planner(&client, 3, 4);

    let err = planner.plan(&request(-1.0)).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        EngineError::InvalidRequest(RequestError::InvalidBudget(b)) if *b == -1.0
    ));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_request() {
    let client = Arc::new(ScriptedGenerationClient::from_texts([uniform_plan(4, 5000.0)]));
    let (planner, _) = planner(&client, 6, 4);
    let planner = planner.with_audit_store(Arc::new(FailingAuditStore));

    let result = planner.plan(&request(20_000.0)).await.unwrap();
    assert_eq!(result.selected_inventory.len(), 4);
}
