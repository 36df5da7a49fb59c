/*!
 * End-to-end tests of the translation pipeline over a content tree
 */

use anyhow::Result;
use futures::future::AbortHandle;
use std::sync::atomic::Ordering;

use yamtwai::app_controller::Controller;
use yamtwai::errors::{PipelineError, Stage};
use yamtwai::providers::mock::MockProvider;
use yamtwai::{FrontmatterRewriter, RunReport};

use crate::common;

async fn run(controller: &Controller, provider: MockProvider) -> Result<RunReport> {
    common::init_test_logging();
    let (_handle, registration) = AbortHandle::new_pair();
    controller
        .run_with_service(common::mock_service(provider), registration)
        .await
}

#[tokio::test]
async fn test_run_withTwoLanguages_shouldWriteMarkedOutputsNextToSource() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    let source = common::sample_post("안녕하세요");
    let source_path = common::create_test_file(&content, "post.md", &source)?;

    let controller = Controller::with_config(common::test_config(&content, &["en", "fr"]))?.with_progress(false);
    let provider = MockProvider::working().with_custom_response(common::echo_source);
    let counter = provider.request_counter();

    let report = run(&controller, provider).await?;

    assert!(report.is_success());
    assert_eq!(report.completed_documents, 1);
    assert_eq!(report.written.len(), 2);
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    for language in ["en", "fr"] {
        let output = common::read(&content.join(format!("post.{}.md", language)));
        let metadata = FrontmatterRewriter::read_metadata(&output)?.expect("output has frontmatter");
        assert_eq!(metadata.get("translated"), Some(&serde_yaml::Value::Bool(true)));
        assert!(output.starts_with("---\ntitle: 안녕하세요\ndate: 2024-05-01\ndraft: false\ntranslated: true\n---\n"));
    }

    // Source untouched
    assert_eq!(common::read(&source_path), source);
    Ok(())
}

#[tokio::test]
async fn test_run_twice_shouldWriteNothingTheSecondTime() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "post.md", &common::sample_post("제목"))?;

    let controller = Controller::with_config(common::test_config(&content, &["en", "fr"]))?.with_progress(false);

    let first = run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;
    assert_eq!(first.written.len(), 2);
    let first_output = common::read(&content.join("post.fr.md"));

    let provider = MockProvider::working().with_custom_response(common::echo_source);
    let counter = provider.request_counter();
    let second = run(&controller, provider).await?;

    assert!(second.is_success());
    assert!(second.written.is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(common::read(&content.join("post.fr.md")), first_output);
    Ok(())
}

#[tokio::test]
async fn test_run_withIgnoreRules_shouldSkipMatchingDocuments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "posts/kept.md", &common::sample_post("유지"))?;
    common::create_test_file(&content, "drafts/secret.md", &common::sample_post("비밀"))?;
    common::create_test_file(&content, "drafts/deep/nested.md", &common::sample_post("중첩"))?;

    let mut config = common::test_config(&content, &["en"]);
    config.ignore_rules = vec!["drafts/**".to_string()];
    let controller = Controller::with_config(config)?.with_progress(false);

    let report = run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;

    assert_eq!(report.written.len(), 1);
    assert!(content.join("posts/kept.en.md").exists());
    assert!(!content.join("drafts/secret.en.md").exists());
    assert!(!content.join("drafts/deep/nested.en.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withLanguageDirectoryRule_shouldMirrorTreeUnderLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "ko/docs/intro.md", &common::sample_post("소개"))?;

    let mut config = common::test_config(&content, &["en", "ja"]);
    config.target_path_rule = "{language}/{origin}/{fileName}.md".to_string();
    let controller = Controller::with_config(config)?.with_progress(false);

    let report = run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;
    assert_eq!(report.written.len(), 2);
    assert!(content.join("en/docs/intro.md").exists());
    assert!(content.join("ja/docs/intro.md").exists());

    // Outputs carry the marker, so they are neither sources nor pending
    let plan = controller.dry_run()?;
    assert!(plan.jobs.is_empty());
    assert_eq!(plan.marked_outputs.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_withHistoryLedger_shouldRecordOutputsAndSkipThemLater() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    let history = temp_dir.path().join("state/history");
    common::create_test_file(&content, "post.md", "# 제목 없음\n")?;

    let mut config = common::test_config(&content, &["fr"]);
    config.use_translated_marker = false;
    config.history_path = Some(history.to_string_lossy().to_string());
    let controller = Controller::with_config(config)?.with_progress(false);

    let report = run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;
    assert_eq!(report.written.len(), 1);

    let ledger = common::read(&history);
    assert_eq!(ledger.lines().count(), 1);
    assert!(ledger.trim_end().ends_with("post.fr.md"));

    let provider = MockProvider::working().with_custom_response(common::echo_source);
    let counter = provider.request_counter();
    let second = run(&controller, provider).await?;

    assert!(second.written.is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withRetranslate_shouldTranslateAgainAndRewriteLedger() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    let history = temp_dir.path().join("history");
    common::create_test_file(&content, "post.md", &common::sample_post("제목"))?;
    common::create_test_file(temp_dir.path(), "history", "/old/run/stale.fr.md\n")?;

    let mut config = common::test_config(&content, &["fr"]);
    config.history_path = Some(history.to_string_lossy().to_string());

    let controller = Controller::with_config(config.clone())?.with_progress(false);
    run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;
    assert!(common::read(&history).contains("stale.fr.md"));

    config.retranslate = true;
    let controller = Controller::with_config(config)?.with_progress(false);
    let provider = MockProvider::working().with_custom_response(common::echo_source);
    let counter = provider.request_counter();
    let report = run(&controller, provider).await?;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(report.written.len(), 1);

    let ledger = common::read(&history);
    assert!(!ledger.contains("stale.fr.md"));
    assert_eq!(ledger.lines().count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_withOneFailingDocument_shouldContinueWithOthers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "a.md", "---\ntitle: BROKEN\n---\nbody\n")?;
    common::create_test_file(&content, "b.md", &common::sample_post("정상"))?;

    let controller = Controller::with_config(common::test_config(&content, &["en", "fr"]))?.with_progress(false);
    let provider = MockProvider::working()
        .with_custom_response(common::echo_source)
        .failing_on("BROKEN");

    let report = run(&controller, provider).await?;

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.completed_documents, 1);
    assert!(report.failures[0].to_string().contains("a.md"));
    assert!(!content.join("a.en.md").exists());
    assert!(!content.join("a.fr.md").exists());
    assert!(content.join("b.en.md").exists());
    assert!(content.join("b.fr.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withFailFast_shouldStopAtFirstFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "a.md", "---\ntitle: BROKEN\n---\nbody\n")?;
    common::create_test_file(&content, "b.md", &common::sample_post("정상"))?;

    let mut config = common::test_config(&content, &["en"]);
    config.fail_fast = true;
    let controller = Controller::with_config(config)?.with_progress(false);
    let provider = MockProvider::working()
        .with_custom_response(common::echo_source)
        .failing_on("BROKEN");

    let result = run(&controller, provider).await;

    assert!(result.is_err());
    assert!(!content.join("b.en.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withMalformedMarker_shouldReportDocumentAndTranslateOthers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "odd.md", "---\ntitle: x\ntranslated: maybe\n---\nbody\n")?;
    common::create_test_file(&content, "fine.md", &common::sample_post("정상"))?;

    let controller = Controller::with_config(common::test_config(&content, &["en"]))?.with_progress(false);
    let report = run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].to_string().contains("odd.md"));
    assert!(content.join("fine.en.md").exists());
    assert!(!content.join("odd.en.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withCollidingOutputs_shouldFailBeforeAnyCall() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "docs/index.md", &common::sample_post("가"))?;
    common::create_test_file(&content, "blog/index.md", &common::sample_post("나"))?;

    // Without {origin} both documents land on en/index.md
    let mut config = common::test_config(&content, &["en"]);
    config.target_path_rule = "{language}/{fileName}.md".to_string();
    let controller = Controller::with_config(config)?.with_progress(false);

    let provider = MockProvider::working().with_custom_response(common::echo_source);
    let counter = provider.request_counter();
    let error = run(&controller, provider).await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::DestinationCollision { .. })
    ));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(!content.join("en/index.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_whenAborted_shouldReturnAbortedAndWriteNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "post.md", &common::sample_post("제목"))?;

    let controller = Controller::with_config(common::test_config(&content, &["en"]))?.with_progress(false);
    let (handle, registration) = AbortHandle::new_pair();
    handle.abort();

    let error = controller
        .run_with_service(common::mock_service(MockProvider::slow(50)), registration)
        .await
        .unwrap_err();

    assert!(matches!(error.downcast_ref::<PipelineError>(), Some(PipelineError::Aborted)));
    assert!(!content.join("post.en.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withPlainPost_shouldPrependMarkerAndBeIdempotent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    let source = "# 안녕하세요\n\n본문입니다.\n";
    let source_path = common::create_test_file(&content, "post.md", source)?;

    let controller = Controller::with_config(common::test_config(&content, &["en", "fr"]))?.with_progress(false);

    let first = run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;
    assert_eq!(first.written.len(), 2);
    for language in ["en", "fr"] {
        let output = common::read(&content.join(format!("post.{}.md", language)));
        assert_eq!(output, format!("---\ntranslated: true\n---\n{}", source));
    }
    assert_eq!(common::read(&source_path), source);

    let provider = MockProvider::working().with_custom_response(common::echo_source);
    let counter = provider.request_counter();
    let second = run(&controller, provider).await?;

    assert!(second.written.is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withFailFastAndMalformedMarker_shouldStopBeforeAnyCall() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "odd.md", "---\ntitle: x\ntranslated: maybe\n---\nbody\n")?;
    common::create_test_file(&content, "fine.md", &common::sample_post("정상"))?;

    let mut config = common::test_config(&content, &["en"]);
    config.fail_fast = true;
    let controller = Controller::with_config(config)?.with_progress(false);

    let provider = MockProvider::working().with_custom_response(common::echo_source);
    let counter = provider.request_counter();
    let error = run(&controller, provider).await.unwrap_err();

    let pipeline_error = error.downcast_ref::<PipelineError>().expect("pipeline error");
    assert_eq!(pipeline_error.stage(), Some(Stage::StateTracking));
    assert!(pipeline_error.to_string().contains("odd.md"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(!content.join("fine.en.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withRetranslateAndEveryDocumentFailing_shouldClearLedger() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    let history = temp_dir.path().join("history");
    common::create_test_file(&content, "a.md", "---\ntitle: BROKEN\n---\nbody\n")?;
    common::create_test_file(temp_dir.path(), "history", "/old/run/stale.en.md\n")?;

    let mut config = common::test_config(&content, &["en"]);
    config.history_path = Some(history.to_string_lossy().to_string());
    config.retranslate = true;
    let controller = Controller::with_config(config)?.with_progress(false);

    let provider = MockProvider::working()
        .with_custom_response(common::echo_source)
        .failing_on("BROKEN");
    let report = run(&controller, provider).await?;

    assert_eq!(report.failures.len(), 1);
    assert!(report.written.is_empty());
    assert_eq!(common::read(&history), "");
    Ok(())
}

#[tokio::test]
async fn test_run_withoutRecursion_shouldOnlyTranslateTopLevelFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().join("notes");
    common::create_test_file(&dir, "top.md", &common::sample_post("위"))?;
    common::create_test_file(&dir, "sub/deep.md", &common::sample_post("아래"))?;

    let mut config = common::test_config(&dir, &["en", "ja"]);
    config.target_path_rule = "{language}/{origin}/{fileName}.md".to_string();
    config.use_single_directory(&dir.to_string_lossy());
    let controller = Controller::with_config(config)?
        .with_progress(false)
        .with_recursion(false);

    let report = run(&controller, MockProvider::working().with_custom_response(common::echo_source)).await?;

    assert_eq!(report.written.len(), 2);
    assert!(dir.join("top.en.md").exists());
    assert!(dir.join("top.ja.md").exists());
    assert!(!dir.join("sub/deep.en.md").exists());

    // Outputs sit next to the source, so the next walk sees their marker
    let plan = controller.dry_run()?;
    assert!(plan.jobs.is_empty());
    assert_eq!(plan.marked_outputs.len(), 2);
    Ok(())
}
