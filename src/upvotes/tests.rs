//! Tests for aggregation, write-back, and the page walker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::predicate::eq;
use rstest::rstest;
use serde_json::{Value, json};
use tokio::sync::Notify;

use super::{
    ItemOutcome, ItemScore, Mutator, RunCounters, RunOutcome, RunSettings, Walker, WriteOutcome,
    WriteTarget, aggregate,
};
use crate::github::cursor::{InnerCursorSet, OuterCursor};
use crate::github::error::UpvoteError;
use crate::github::gateway::{MockFieldMutationGateway, MockProjectGateway, ProjectGateway};
use crate::github::locator::{FieldId, ProjectId, ProjectItemId};
use crate::github::models::{
    ConnectionKind, ProjectItem, ProjectItemPage, ProjectItemsPage, ProjectMetadata, SkipReason,
};
use crate::github::pagination::{Connection, PageInfo};
use crate::github::rate_limit::{RateLimit, RateLimitGovernor};

fn page_info(end_cursor: Option<&str>, has_next_page: bool) -> Value {
    json!({ "endCursor": end_cursor, "hasNextPage": has_next_page })
}

fn connection(nodes: Vec<Value>, total: u64, end_cursor: Option<&str>, has_next: bool) -> Value {
    json!({
        "totalCount": total,
        "pageInfo": page_info(end_cursor, has_next),
        "nodes": nodes
    })
}

fn empty_connection() -> Value {
    connection(Vec::new(), 0, None, false)
}

fn reactable(reactions: u64) -> Value {
    json!({ "reactions": { "totalCount": reactions } })
}

fn quiet_comments(count: u64) -> Value {
    let nodes = (0..count).map(|_| reactable(0)).collect();
    connection(nodes, count, Some("comments-end"), false)
}

fn issue_with(id: &str, closed: bool, reactions: u64, comments: Value, timeline: Value) -> Value {
    json!({
        "id": id,
        "isArchived": false,
        "type": "ISSUE",
        "upvotes": null,
        "content": {
            "__typename": "Issue",
            "closed": closed,
            "reactions": { "totalCount": reactions },
            "comments": comments,
            "timelineItems": timeline,
            "trackedIssues": empty_connection(),
            "trackedInIssues": empty_connection()
        }
    })
}

fn parse(value: Value) -> ProjectItem {
    serde_json::from_value(value).expect("project item should deserialise")
}

fn simple_issue(id: &str, reactions: u64, comments: u64) -> ProjectItem {
    parse(issue_with(
        id,
        false,
        reactions,
        quiet_comments(comments),
        empty_connection(),
    ))
}

fn items_page(
    items: Vec<ProjectItem>,
    end_cursor: Option<&str>,
    has_next: bool,
    remaining: u64,
) -> ProjectItemsPage {
    let total = u64::try_from(items.len()).expect("small page");
    ProjectItemsPage {
        items: Connection::new(
            items,
            PageInfo::new(end_cursor.map(ToOwned::to_owned), has_next),
            total,
        ),
        rate_limit: RateLimit::new(remaining, 1),
    }
}

fn target() -> WriteTarget {
    WriteTarget {
        project_id: ProjectId::new("PVT_1"),
        field_id: FieldId::new("PVTF_1"),
    }
}

fn live_mutator(
    gateway: MockFieldMutationGateway,
    governor: &Arc<RateLimitGovernor>,
) -> Mutator<MockFieldMutationGateway> {
    Mutator::live(
        Arc::new(gateway),
        target(),
        Arc::clone(governor),
        Duration::ZERO,
    )
}

fn walker(
    gateway: MockProjectGateway,
    mutator: Mutator<MockFieldMutationGateway>,
    governor: Arc<RateLimitGovernor>,
    settings: RunSettings,
) -> Walker<MockProjectGateway, MockFieldMutationGateway> {
    Walker::new(Arc::new(gateway), mutator, governor, settings)
}

fn score_of(outcome: ItemOutcome) -> u64 {
    match outcome {
        ItemOutcome::Scored(score) => score.score,
        ItemOutcome::Skipped { reason, .. } => {
            panic!("expected a score, item skipped as {reason:?}")
        }
    }
}

#[tokio::test]
async fn linked_issue_scenario_scores_seven() {
    let item = parse(issue_with(
        "PVTI_example",
        false,
        2,
        quiet_comments(3),
        connection(
            vec![json!({
                "__typename": "ConnectedEvent",
                "source": {
                    "__typename": "Issue",
                    "comments": { "totalCount": 1 },
                    "reactions": { "totalCount": 0 }
                }
            })],
            1,
            Some("timeline-1"),
            false,
        ),
    ));
    let mut gateway = MockProjectGateway::new();
    gateway.expect_project_item().never();

    let outcome = aggregate(&gateway, &RateLimitGovernor::default(), &item)
        .await
        .expect("item should aggregate");

    assert_eq!(score_of(outcome), 7);
}

#[rstest]
#[case::untouched(0, 0)]
#[case::reactions_only(0, 4)]
#[case::comments_only(6, 0)]
#[case::both(3, 9)]
#[tokio::test]
async fn base_score_is_comments_plus_reactions(#[case] comments: u64, #[case] reactions: u64) {
    let item = simple_issue("PVTI_base", reactions, comments);
    let gateway = MockProjectGateway::new();

    let outcome = aggregate(&gateway, &RateLimitGovernor::default(), &item)
        .await
        .expect("item should aggregate");

    assert_eq!(score_of(outcome), comments + reactions);
}

#[tokio::test]
async fn bare_timeline_events_add_exactly_one_each() {
    let item = parse(issue_with(
        "PVTI_timeline",
        false,
        0,
        quiet_comments(0),
        connection(
            vec![
                json!({ "__typename": "ReferencedEvent" }),
                json!({ "__typename": "SubscribedEvent" }),
                json!({ "__typename": "CrossReferencedEvent", "source": null }),
            ],
            3,
            Some("timeline-3"),
            false,
        ),
    ));
    let gateway = MockProjectGateway::new();

    let outcome = aggregate(&gateway, &RateLimitGovernor::default(), &item)
        .await
        .expect("item should aggregate");

    assert_eq!(score_of(outcome), 3);
}

fn comments_page(cursor: &str, has_next: bool) -> Value {
    connection(vec![reactable(1); 3], 12, Some(cursor), has_next)
}

#[tokio::test]
async fn every_comment_page_is_counted_once() {
    let first = parse(issue_with(
        "PVTI_paged",
        false,
        0,
        comments_page("comments-3", true),
        connection(
            vec![json!({ "__typename": "SubscribedEvent" })],
            1,
            Some("timeline-1"),
            false,
        ),
    ));
    let mut gateway = MockProjectGateway::new();
    gateway
        .expect_project_item()
        .times(3)
        .returning(|item_id, cursors| {
            assert_eq!(
                cursors.cursor(ConnectionKind::TimelineItems),
                Some("timeline-1"),
                "exhausted timeline cursor stays frozen"
            );
            let (next_cursor, has_next) = match cursors.cursor(ConnectionKind::Comments) {
                Some("comments-3") => ("comments-6", true),
                Some("comments-6") => ("comments-9", true),
                Some("comments-9") => ("comments-12", false),
                other => panic!("unexpected comments cursor {other:?}"),
            };
            // The refreshed item repeats the exhausted timeline page.
            let item = parse(issue_with(
                item_id.as_str(),
                false,
                0,
                comments_page(next_cursor, has_next),
                connection(
                    vec![json!({ "__typename": "SubscribedEvent" })],
                    1,
                    None,
                    false,
                ),
            ));
            Ok(ProjectItemPage {
                item,
                rate_limit: RateLimit::new(4000, 1),
            })
        });
    let governor = RateLimitGovernor::default();

    let outcome = aggregate(&gateway, &governor, &first)
        .await
        .expect("item should aggregate");

    // 12 comments as base, 4 pages of 3 single-reaction comments, 1 event.
    assert_eq!(score_of(outcome), 12 + 12 + 1);
    assert_eq!(governor.remaining(), Some(4000));
}

#[tokio::test]
async fn inner_query_failure_aborts_the_item() {
    let item = parse(issue_with(
        "PVTI_broken",
        false,
        0,
        comments_page("comments-3", true),
        empty_connection(),
    ));
    let mut gateway = MockProjectGateway::new();
    gateway.expect_project_item().times(1).returning(|_, _| {
        Err(UpvoteError::Network {
            message: "connection reset".to_owned(),
        })
    });

    let result = aggregate(&gateway, &RateLimitGovernor::default(), &item).await;

    assert!(
        matches!(result, Err(UpvoteError::Network { .. })),
        "expected network error, got {result:?}"
    );
}

fn archived_item() -> ProjectItem {
    let mut value = issue_with("PVTI_archived", false, 5, quiet_comments(1), empty_connection());
    value["isArchived"] = json!(true);
    parse(value)
}

fn draft_item() -> ProjectItem {
    parse(json!({
        "id": "PVTI_draft",
        "isArchived": false,
        "type": "DRAFT_ISSUE",
        "content": { "__typename": "DraftIssue" }
    }))
}

fn closed_item() -> ProjectItem {
    parse(issue_with(
        "PVTI_closed",
        true,
        5,
        quiet_comments(1),
        empty_connection(),
    ))
}

#[rstest]
#[case::sequential(false)]
#[case::concurrent(true)]
#[tokio::test]
async fn skipped_items_never_reach_the_mutator(#[case] concurrency: bool) {
    let mut gateway = MockProjectGateway::new();
    gateway.expect_project_items().times(1).returning(|_, _| {
        Ok(items_page(
            vec![archived_item(), draft_item(), closed_item()],
            Some("page-1"),
            false,
            4000,
        ))
    });
    let mut mutations = MockFieldMutationGateway::new();
    mutations.expect_update_number_field().never();
    let governor = Arc::new(RateLimitGovernor::default());
    let settings = RunSettings {
        concurrency,
        ..RunSettings::default()
    };

    let report = walker(
        gateway,
        live_mutator(mutations, &governor),
        Arc::clone(&governor),
        settings,
    )
    .run()
    .await;

    assert_eq!(report.outcome, RunOutcome::Done);
    assert_eq!(report.counters.skipped, 3);
    assert_eq!(report.counters.scored, 0);
}

#[rstest]
#[case::sequential(false)]
#[case::concurrent(true)]
#[tokio::test]
async fn dry_run_scores_without_mutating(#[case] concurrency: bool) {
    let mut gateway = MockProjectGateway::new();
    gateway.expect_project_items().times(1).returning(|_, _| {
        Ok(items_page(
            vec![simple_issue("PVTI_1", 1, 2), simple_issue("PVTI_2", 3, 4)],
            Some("page-1"),
            false,
            4000,
        ))
    });
    let governor = Arc::new(RateLimitGovernor::default());
    let settings = RunSettings {
        concurrency,
        ..RunSettings::default()
    };

    let report = walker(
        gateway,
        Mutator::dry_run(Arc::clone(&governor)),
        Arc::clone(&governor),
        settings,
    )
    .run()
    .await;

    assert_eq!(report.outcome, RunOutcome::Done);
    assert_eq!(report.counters.scored, 2);
    assert_eq!(report.counters.written, 0);
    assert_eq!(report.cursor, OuterCursor::start(), "done resets the cursor");
}

#[rstest]
#[case::sequential(false)]
#[case::concurrent(true)]
#[tokio::test]
async fn resumed_run_only_processes_items_after_cursor(#[case] concurrency: bool) {
    let mut gateway = MockProjectGateway::new();
    gateway
        .expect_project_items()
        .withf(|cursor, page_size| cursor.as_deref() == Some("page-1") && *page_size == 2)
        .times(1)
        .returning(|_, _| {
            Ok(items_page(
                vec![simple_issue("PVTI_3", 1, 0), simple_issue("PVTI_4", 0, 2)],
                Some("page-2"),
                false,
                4000,
            ))
        });
    let mut mutations = MockFieldMutationGateway::new();
    mutations
        .expect_update_number_field()
        .withf(|update| {
            matches!(
                (update.item_id.as_str(), update.value.number),
                ("PVTI_3", 1) | ("PVTI_4", 2)
            )
        })
        .times(2)
        .returning(|_| Ok(()));
    let governor = Arc::new(RateLimitGovernor::default());
    let settings = RunSettings {
        page_size: 2,
        concurrency,
        start: OuterCursor::resume_from(Some("page-1")),
    };

    let report = walker(
        gateway,
        live_mutator(mutations, &governor),
        Arc::clone(&governor),
        settings,
    )
    .run()
    .await;

    assert_eq!(report.outcome, RunOutcome::Done);
    assert_eq!(report.counters.written, 2);
}

#[tokio::test]
async fn low_budget_halts_after_last_complete_page() {
    let mut gateway = MockProjectGateway::new();
    let mut sequence = mockall::Sequence::new();
    gateway
        .expect_project_items()
        .withf(|cursor, _| cursor.is_start())
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| {
            Ok(items_page(
                vec![simple_issue("PVTI_1", 1, 1)],
                Some("page-1"),
                true,
                500,
            ))
        });
    gateway
        .expect_project_items()
        .withf(|cursor, _| cursor.as_deref() == Some("page-1"))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| {
            Ok(items_page(
                vec![simple_issue("PVTI_2", 2, 2)],
                Some("page-2"),
                true,
                15,
            ))
        });
    let governor = Arc::new(RateLimitGovernor::new(10));

    let report = walker(
        gateway,
        Mutator::dry_run(Arc::clone(&governor)),
        Arc::clone(&governor),
        RunSettings::default(),
    )
    .run()
    .await;

    assert_eq!(report.outcome, RunOutcome::RateLimited);
    assert!(report.outcome.is_success(), "halting is not an error");
    assert_eq!(report.cursor.output_value(), "page-2");
    assert_eq!(report.counters.scored, 2);
    assert_eq!(report.rate_limit_cost, 501 - 15);
}

#[rstest]
#[case::sequential(false)]
#[case::concurrent(true)]
#[tokio::test]
async fn failure_keeps_cursor_at_last_complete_page(#[case] concurrency: bool) {
    let mut gateway = MockProjectGateway::new();
    let mut sequence = mockall::Sequence::new();
    gateway
        .expect_project_items()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| {
            Ok(items_page(
                vec![simple_issue("PVTI_1", 1, 1)],
                Some("page-1"),
                true,
                4000,
            ))
        });
    gateway
        .expect_project_items()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| {
            let paged = parse(issue_with(
                "PVTI_2",
                false,
                0,
                comments_page("comments-3", true),
                empty_connection(),
            ));
            Ok(items_page(
                vec![simple_issue("PVTI_ok", 1, 0), paged],
                Some("page-2"),
                false,
                3990,
            ))
        });
    gateway
        .expect_project_item()
        .with(eq(ProjectItemId::new("PVTI_2")), mockall::predicate::always())
        .returning(|_, _| {
            Err(UpvoteError::GraphQl {
                operation: "project item".to_owned(),
                messages: vec!["Something went wrong".to_owned()],
            })
        });
    let governor = Arc::new(RateLimitGovernor::default());
    let settings = RunSettings {
        concurrency,
        ..RunSettings::default()
    };

    let report = walker(
        gateway,
        Mutator::dry_run(Arc::clone(&governor)),
        Arc::clone(&governor),
        settings,
    )
    .run()
    .await;

    assert!(
        matches!(report.outcome, RunOutcome::Failed(UpvoteError::GraphQl { .. })),
        "expected GraphQl failure, got {:?}",
        report.outcome
    );
    assert_eq!(report.cursor.output_value(), "page-1");
}

#[tokio::test]
async fn mutation_failure_halts_the_run() {
    let mut gateway = MockProjectGateway::new();
    gateway.expect_project_items().times(1).returning(|_, _| {
        Ok(items_page(
            vec![simple_issue("PVTI_1", 1, 1)],
            Some("page-1"),
            true,
            4000,
        ))
    });
    let mut mutations = MockFieldMutationGateway::new();
    mutations.expect_update_number_field().times(1).returning(|_| {
        Err(UpvoteError::Authentication {
            message: "Resource not accessible by integration".to_owned(),
        })
    });
    let governor = Arc::new(RateLimitGovernor::default());

    let report = walker(
        gateway,
        live_mutator(mutations, &governor),
        Arc::clone(&governor),
        RunSettings::default(),
    )
    .run()
    .await;

    assert!(!report.outcome.is_success());
    assert!(report.cursor.is_start());
}

#[rstest]
#[case::sequential(false)]
#[case::concurrent(true)]
#[tokio::test]
async fn items_page_without_end_cursor_fails_instead_of_refetching(#[case] concurrency: bool) {
    let mut gateway = MockProjectGateway::new();
    gateway.expect_project_items().times(1).returning(|_, _| {
        Ok(items_page(
            vec![simple_issue("PVTI_1", 1, 1)],
            None,
            true,
            4000,
        ))
    });
    let mut mutations = MockFieldMutationGateway::new();
    mutations.expect_update_number_field().never();
    let governor = Arc::new(RateLimitGovernor::default());
    let settings = RunSettings {
        concurrency,
        start: OuterCursor::resume_from(Some("page-0")),
        ..RunSettings::default()
    };

    let report = walker(
        gateway,
        live_mutator(mutations, &governor),
        Arc::clone(&governor),
        settings,
    )
    .run()
    .await;

    assert!(
        matches!(
            report.outcome,
            RunOutcome::Failed(UpvoteError::MalformedResponse { .. })
        ),
        "expected malformed response, got {:?}",
        report.outcome
    );
    assert_eq!(report.cursor.output_value(), "page-0");
    assert_eq!(report.counters.scored, 0);
}

#[tokio::test]
async fn short_budget_halts_concurrent_page_before_admitting_workers() {
    let mut gateway = MockProjectGateway::new();
    gateway
        .expect_project_items()
        .withf(|cursor, _| cursor.as_deref() == Some("page-0"))
        .times(1)
        .returning(|_, _| {
            let mut items: Vec<ProjectItem> = (1..=8)
                .map(|n| simple_issue(&format!("PVTI_{n}"), 1, 1))
                .collect();
            items.push(closed_item());
            Ok(items_page(items, Some("page-1"), true, 12))
        });
    gateway.expect_project_item().never();
    let mut mutations = MockFieldMutationGateway::new();
    mutations.expect_update_number_field().never();
    let governor = Arc::new(RateLimitGovernor::new(10));
    let settings = RunSettings {
        concurrency: true,
        start: OuterCursor::resume_from(Some("page-0")),
        ..RunSettings::default()
    };

    let report = walker(
        gateway,
        live_mutator(mutations, &governor),
        Arc::clone(&governor),
        settings,
    )
    .run()
    .await;

    assert_eq!(report.outcome, RunOutcome::RateLimited);
    assert_eq!(report.cursor.output_value(), "page-0");
    assert_eq!(
        report.counters,
        RunCounters::default(),
        "nothing on a halted page is counted"
    );
}

/// Serves one page holding a failing item and an item whose follow-up query
/// waits until `release` is notified.
struct StallingGateway {
    release: Arc<Notify>,
    resumed: Arc<AtomicBool>,
}

#[async_trait]
impl ProjectGateway for StallingGateway {
    async fn project_metadata(&self) -> Result<ProjectMetadata, UpvoteError> {
        Err(UpvoteError::Configuration {
            message: "metadata is not served".to_owned(),
        })
    }

    async fn project_items(
        &self,
        _cursor: &OuterCursor,
        _page_size: u8,
    ) -> Result<ProjectItemsPage, UpvoteError> {
        let paged = |id: &str| {
            parse(issue_with(
                id,
                false,
                0,
                comments_page("comments-3", true),
                empty_connection(),
            ))
        };
        Ok(items_page(
            vec![paged("PVTI_stalled"), paged("PVTI_failing")],
            Some("page-1"),
            false,
            4000,
        ))
    }

    async fn project_item(
        &self,
        item_id: &ProjectItemId,
        _cursors: &InnerCursorSet,
    ) -> Result<ProjectItemPage, UpvoteError> {
        if item_id.as_str() == "PVTI_stalled" {
            self.release.notified().await;
            self.resumed.store(true, Ordering::SeqCst);
        }
        Err(UpvoteError::GraphQl {
            operation: "project item".to_owned(),
            messages: vec![format!("{item_id} could not be loaded")],
        })
    }
}

#[tokio::test]
async fn first_task_failure_cancels_sibling_tasks() {
    let release = Arc::new(Notify::new());
    let resumed = Arc::new(AtomicBool::new(false));
    let gateway = StallingGateway {
        release: Arc::clone(&release),
        resumed: Arc::clone(&resumed),
    };
    let mut mutations = MockFieldMutationGateway::new();
    mutations.expect_update_number_field().never();
    let governor = Arc::new(RateLimitGovernor::default());
    let settings = RunSettings {
        concurrency: true,
        ..RunSettings::default()
    };

    let report = Walker::new(
        Arc::new(gateway),
        live_mutator(mutations, &governor),
        Arc::clone(&governor),
        settings,
    )
    .run()
    .await;

    assert!(
        matches!(report.outcome, RunOutcome::Failed(UpvoteError::GraphQl { .. })),
        "expected GraphQl failure, got {:?}",
        report.outcome
    );
    assert!(report.cursor.is_start());
    assert_eq!(report.counters.scored, 0);

    release.notify_one();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(
        !resumed.load(Ordering::SeqCst),
        "stalled sibling should have been aborted"
    );
}

fn scored(previous: Option<f64>) -> ItemScore {
    ItemScore {
        item_id: ProjectItemId::new("PVTI_1"),
        score: 5,
        previous,
    }
}

#[rstest]
#[case::unset(None, WriteOutcome::Written)]
#[case::stale(Some(4.0), WriteOutcome::Written)]
#[case::current(Some(5.0), WriteOutcome::Unchanged)]
#[tokio::test]
async fn mutator_skips_unchanged_values(
    #[case] previous: Option<f64>,
    #[case] expected: WriteOutcome,
) {
    let mut mutations = MockFieldMutationGateway::new();
    let expected_calls = usize::from(expected == WriteOutcome::Written);
    mutations
        .expect_update_number_field()
        .times(expected_calls)
        .returning(|_| Ok(()));
    let governor = Arc::new(RateLimitGovernor::default());
    governor.observe(RateLimit::new(100, 0));

    let outcome = live_mutator(mutations, &governor)
        .apply(&scored(previous))
        .await
        .expect("apply should succeed");

    assert_eq!(outcome, expected);
    let expected_remaining = 100 - u64::try_from(expected_calls).expect("small count");
    assert_eq!(governor.remaining(), Some(expected_remaining));
}

#[tokio::test]
async fn dry_run_mutator_reports_without_writing() {
    let governor = Arc::new(RateLimitGovernor::default());
    let mutator = Mutator::<MockFieldMutationGateway>::dry_run(Arc::clone(&governor));

    let outcome = mutator
        .apply(&scored(None))
        .await
        .expect("dry run should succeed");

    assert_eq!(outcome, WriteOutcome::DryRun);
    assert!(!mutator.is_live());
}

#[rstest]
fn skip_reason_labels_are_stable() {
    assert_eq!(SkipReason::Redacted.as_str(), "redacted");
}
