//! End-to-end tests for the section merge pipeline.
#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use forma_app::{FormPipeline, PipelineStatus, Schedulers};
use forma_core::{
    EvaluationResult, FormError, FormId, PipelineError, ProducerError, RuleEffect, StreamKind,
};
use forma_testkit::{
    field, hide, section, sections, uids, RecordingErrorReporter, RecordingSink,
    ScriptedRuleEvaluator, ScriptedSectionSource,
};

/// Long enough for every queued task on the test runtime to settle.
const SETTLE: Duration = Duration::from_millis(50);

struct Harness {
    sections: Arc<ScriptedSectionSource>,
    rules: Arc<ScriptedRuleEvaluator>,
    reporter: Arc<RecordingErrorReporter>,
    sink: Arc<RecordingSink>,
    pipeline: FormPipeline,
}

impl Harness {
    fn new() -> Self {
        let sections = Arc::new(ScriptedSectionSource::new());
        let rules = Arc::new(ScriptedRuleEvaluator::new());
        let reporter = Arc::new(RecordingErrorReporter::new());
        let pipeline = FormPipeline::new(
            FormId::new("event-1"),
            sections.clone(),
            rules.clone(),
            reporter.clone(),
            Schedulers::try_current().unwrap(),
        );
        Self {
            sections,
            rules,
            reporter,
            sink: Arc::new(RecordingSink::new()),
            pipeline,
        }
    }

    fn attach(&self) {
        self.pipeline.attach(self.sink.clone()).unwrap();
    }

    async fn wait_for_merges(&self, count: usize) {
        self.sections.wait_for_subscriptions(count).await;
        self.rules.wait_for_subscriptions(count).await;
    }
}

#[tokio::test]
async fn attach_runs_one_merge_immediately() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections.emit(0, sections(&["s1", "s2"]));
    h.rules.emit(0, EvaluationResult::empty());

    let renders = h.sink.wait_for_renders(1).await;
    assert_eq!(uids(&renders[0]), ["s1", "s2"]);

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.sink.render_count(), 1);
    assert_eq!(h.sections.subscription_count(), 1);
    assert_eq!(h.sections.subscribed_forms(), [FormId::new("event-1")]);
    assert!(h.reporter.errors().is_empty());
}

#[tokio::test]
async fn hidden_section_is_removed_from_render() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections.emit(0, sections(&["s1", "s2"]));
    h.rules.emit(0, EvaluationResult::Effects(vec![hide("s1")]));

    let renders = h.sink.wait_for_renders(1).await;
    assert_eq!(uids(&renders[0]), ["s2"]);
}

#[tokio::test]
async fn field_effects_reach_the_sink() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections
        .emit(0, vec![section("s1").with_fields(vec![field("f1"), field("f2")])]);
    h.rules.emit(
        0,
        EvaluationResult::Effects(vec![
            RuleEffect::HideField { field: "f1".into() },
            RuleEffect::AssignValue {
                field: "f2".into(),
                value: "42".to_string(),
            },
        ]),
    );

    let renders = h.sink.wait_for_renders(1).await;
    let fields = &renders[0][0].fields;
    assert!(!fields[0].visible);
    assert_eq!(fields[1].value.as_deref(), Some("42"));
}

#[tokio::test]
async fn evaluation_failure_renders_sections_unchanged() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections.emit(0, sections(&["s1"]));
    h.rules.emit(0, EvaluationResult::failure("bad expr"));

    let renders = h.sink.wait_for_renders(1).await;
    assert_eq!(uids(&renders[0]), ["s1"]);

    let errors = h.reporter.wait_for_errors(1).await;
    assert_matches!(&errors[0], FormError::Evaluation(failure) if failure.message == "bad expr");
}

#[tokio::test]
async fn pairs_follow_emission_order() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections.emit(0, sections(&["a", "b"]));
    h.sections.emit(0, sections(&["a", "b", "c"]));
    h.rules.emit(0, EvaluationResult::Effects(vec![hide("a")]));
    h.rules.emit(0, EvaluationResult::Effects(vec![hide("c")]));

    let renders = h.sink.wait_for_renders(2).await;
    assert_eq!(uids(&renders[0]), ["b"]);
    assert_eq!(uids(&renders[1]), ["a", "b"]);
}

#[tokio::test]
async fn recheck_supersedes_the_previous_merge() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections.emit(0, sections(&["old"]));
    assert!(h.pipeline.check_sections());
    h.wait_for_merges(2).await;

    // The first merge is gone; its late rule result must not render.
    h.rules.emit(0, EvaluationResult::empty());
    h.sections.emit(1, sections(&["new"]));
    h.rules.emit(1, EvaluationResult::empty());

    let renders = h.sink.wait_for_renders(1).await;
    assert_eq!(uids(&renders[0]), ["new"]);

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.sink.render_count(), 1);
    assert!(!h.sections.is_subscribed(0));
    assert!(!h.rules.is_subscribed(0));
}

#[tokio::test]
async fn every_recheck_starts_a_fresh_pair() {
    let h = Harness::new();
    h.attach();

    for _ in 0..3 {
        assert!(h.pipeline.check_sections());
    }
    h.wait_for_merges(4).await;

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.sections.subscription_count(), 4);
    assert!(h.sections.is_subscribed(3));
    assert!(!h.sections.is_subscribed(2));
}

#[tokio::test]
async fn detach_mid_merge_suppresses_delivery() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections.emit(0, sections(&["s1"]));
    h.pipeline.detach();
    h.rules.emit(0, EvaluationResult::empty());

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.sink.render_count(), 0);
    assert_eq!(h.pipeline.status(), PipelineStatus::Detached);
    assert!(!h.sections.is_subscribed(0));
    assert!(!h.rules.is_subscribed(0));
}

#[tokio::test]
async fn second_attach_is_rejected() {
    let h = Harness::new();
    h.attach();

    let other = Arc::new(RecordingSink::new());
    assert_matches!(
        h.pipeline.attach(other),
        Err(PipelineError::AlreadyAttached { form }) if form == FormId::new("event-1")
    );
    assert_eq!(h.pipeline.status(), PipelineStatus::Attached);
}

#[tokio::test]
async fn detach_is_idempotent_and_allows_reattach() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.pipeline.detach();
    h.pipeline.detach();
    assert!(!h.pipeline.check_sections());
    assert!(h.pipeline.trigger().is_none());

    h.attach();
    h.wait_for_merges(2).await;
    h.sections.emit(1, sections(&["again"]));
    h.rules.emit(1, EvaluationResult::empty());

    let renders = h.sink.wait_for_renders(1).await;
    assert_eq!(uids(&renders[0]), ["again"]);
}

#[tokio::test]
async fn recheck_while_detached_is_ignored() {
    let h = Harness::new();
    assert!(!h.pipeline.check_sections());
    assert!(!h.pipeline.request_recheck("manual"));

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.sections.subscription_count(), 0);
}

#[tokio::test]
async fn producer_failure_is_reported_and_waits_for_recheck() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.sections.fail(0, ProducerError::new("disk gone"));

    let errors = h.reporter.wait_for_errors(1).await;
    assert_matches!(
        &errors[0],
        FormError::Producer { stream: StreamKind::Sections, error } if error.message == "disk gone"
    );

    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.sections.subscription_count(), 1);
    assert_eq!(h.sink.render_count(), 0);

    assert!(h.pipeline.check_sections());
    h.wait_for_merges(2).await;
    h.sections.emit(1, sections(&["s1"]));
    h.rules.emit(1, EvaluationResult::empty());

    let renders = h.sink.wait_for_renders(1).await;
    assert_eq!(uids(&renders[0]), ["s1"]);
}

#[tokio::test]
async fn rule_stream_failure_names_the_rule_stream() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    h.rules.fail(0, ProducerError::new("engine crashed"));

    let errors = h.reporter.wait_for_errors(1).await;
    assert_eq!(errors[0].stream(), Some(StreamKind::RuleEffects));
}

#[tokio::test]
async fn trigger_outlives_borrow_of_pipeline() {
    let h = Harness::new();
    h.attach();
    let trigger = h.pipeline.trigger().unwrap();

    let remote = tokio::spawn(async move { trigger.request_recheck("remote") });
    assert!(remote.await.unwrap());

    h.wait_for_merges(2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn multi_threaded_runtime_delivers_latest_merge_only() {
    let h = Harness::new();
    h.attach();
    h.wait_for_merges(1).await;

    for _ in 0..5 {
        h.pipeline.check_sections();
    }
    h.wait_for_merges(6).await;

    for index in 0..5 {
        h.sections.emit(index, sections(&["stale"]));
        h.rules.emit(index, EvaluationResult::empty());
    }
    h.sections.emit(5, sections(&["fresh"]));
    h.rules.emit(5, EvaluationResult::empty());

    h.sink.wait_for_renders(1).await;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(uids(&h.sink.last().unwrap()), ["fresh"]);
    assert_eq!(h.sink.render_count(), 1);
}
