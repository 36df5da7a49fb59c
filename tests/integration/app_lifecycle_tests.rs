/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use yamtwai::app_config::{Config, TranslationProvider};
use yamtwai::app_controller::Controller;

use crate::common;

/// Test the controller with a config file written to disk
#[test]
fn test_controller_withConfigFromFile_shouldPlanPendingDocuments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "ko/posts/first.md", &common::sample_post("첫 글"))?;
    common::create_test_file(&content, "ko/posts/second.md", &common::sample_post("둘째 글"))?;

    let config_path = temp_dir.path().join("conf.json");
    let mut config = common::test_config(&content, &["en", "ja"]);
    config.target_path_rule = "{language}/{origin}/{fileName}.md".to_string();
    config.translation.provider = TranslationProvider::Ollama;
    config.save(&config_path)?;

    let controller = Controller::with_config(Config::load_or_create(&config_path)?)?.with_progress(false);
    let plan = controller.dry_run()?;

    assert_eq!(plan.jobs.len(), 2);
    assert_eq!(plan.unit_count(), 4);
    let outputs: Vec<_> = plan.jobs[0].targets.iter().map(|t| t.output_path.clone()).collect();
    assert_eq!(outputs, vec![content.join("en/posts/first.md"), content.join("ja/posts/first.md")]);
    Ok(())
}

/// Test that a dry run never touches the tree or the ledger
#[test]
fn test_dryRun_shouldNotWriteOutputsOrLedger() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    let history = temp_dir.path().join("history");
    common::create_test_file(&content, "post.md", &common::sample_post("제목"))?;

    let mut config = common::test_config(&content, &["en"]);
    config.history_path = Some(history.to_string_lossy().to_string());
    let controller = Controller::with_config(config)?;

    let plan = controller.dry_run()?;

    assert_eq!(plan.unit_count(), 1);
    assert!(!content.join("post.en.md").exists());
    assert!(!history.exists());
    Ok(())
}

/// Test that invalid configurations are rejected up front
#[test]
fn test_controller_withInvalidConfig_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path(), &["en"]);
    config.target_path_rule = "{origin}/{fileName}.md".to_string();

    assert!(Controller::with_config(config).is_err());
    Ok(())
}

/// Test that marker-less outputs recorded in the ledger are not sources
#[test]
fn test_plan_withMarkerDisabled_shouldExcludeRecordedOutputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    let history = temp_dir.path().join("history");
    common::create_test_file(&content, "post.md", "# 원문\n")?;
    let output = common::create_test_file(&content, "post.en.md", "# Original\n")?;
    common::create_test_file(temp_dir.path(), "history", &format!("{}\n", output.display()))?;

    let mut config = common::test_config(&content, &["en"]);
    config.use_translated_marker = false;
    config.history_path = Some(history.to_string_lossy().to_string());
    let controller = Controller::with_config(config)?;

    let plan = controller.dry_run()?;

    assert!(plan.jobs.is_empty());
    assert_eq!(plan.up_to_date, vec!["post.md".to_string()]);
    Ok(())
}

/// Test that a config without marker and without ledger is rejected
#[test]
fn test_withConfig_withoutAnyExistenceCheck_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_test_file(&content, "post.md", "# 원문\n")?;

    let mut config = common::test_config(&content, &["fr"]);
    config.use_translated_marker = false;
    assert!(Controller::with_config(config.clone()).is_err());

    config.history_path = Some(temp_dir.path().join("history").to_string_lossy().to_string());
    assert!(Controller::with_config(config).is_ok());
    Ok(())
}
