/*!
 * Tests for the frontmatter-preserving rewriter
 */

use anyhow::Result;
use serde_yaml::Value;
use yamtwai::errors::RewriteError;
use yamtwai::frontmatter::{FrontmatterRewriter, FrontmatterUpdates, repair_quotes};

use crate::common;

#[test]
fn test_rewrite_withUpdateAndNewKey_shouldKeepOrderAndStyle() -> Result<()> {
    let content = "---\nA: plain value\nB: old\nC: \"double\"   # keep me\n---\nBody\n";
    let updates = FrontmatterUpdates::new().set("B", "new").set("D", true);

    let rewritten = FrontmatterRewriter::rewrite(content, &updates)?;

    assert_eq!(
        rewritten,
        "---\nA: plain value\nB: new\nC: \"double\"   # keep me\nD: true\n---\nBody\n"
    );
    let keys: Vec<String> = FrontmatterRewriter::read_metadata(&rewritten)?
        .expect("metadata present")
        .keys()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();
    assert_eq!(keys, vec!["A", "B", "C", "D"]);
    Ok(())
}

#[test]
fn test_rewrite_withMismatchedQuotes_shouldRepairTitle() -> Result<()> {
    let content = "---\ntitle: \"Hello: World'\n---\ntext\n";
    let rewritten = FrontmatterRewriter::rewrite(content, &FrontmatterUpdates::new().set("translated", true))?;

    let metadata = FrontmatterRewriter::read_metadata(&rewritten)?.expect("metadata present");
    assert_eq!(metadata.get("title"), Some(&Value::String("Hello: World".to_string())));
    assert!(rewritten.contains("title: \"Hello: World\"\n"));
    Ok(())
}

#[test]
fn test_repairQuotes_shouldLeaveValidLinesAlone() {
    let metadata = "title: \"Fine\"\ndate: 2024-01-01\n# comment: 'x\"\ntags: [a, b]\n";
    assert_eq!(repair_quotes(metadata), metadata);
}

#[test]
fn test_rewrite_shouldCopyBodyByteForByte() -> Result<()> {
    let body = "\n\n---\nnot: metadata\n---\n  trailing spaces  \n```yaml\na: 1\n```";
    let content = format!("---\ntitle: x\n---{}", body);

    let rewritten = FrontmatterRewriter::rewrite(&content, &FrontmatterUpdates::new().set("translated", true))?;
    assert!(rewritten.ends_with(body));
    Ok(())
}

#[test]
fn test_rewrite_withScalarMetadata_shouldFail() {
    let result = FrontmatterRewriter::rewrite("---\njust text\n---\n", &FrontmatterUpdates::new());
    assert!(matches!(result, Err(RewriteError::NotAMapping(_))));
}

#[test]
fn test_writeKeyValues_withOddList_shouldFailWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out/post.md");

    let result = FrontmatterRewriter::write_key_values(
        &path,
        "---\ntitle: x\n---\n",
        &[Value::from("translated"), Value::from(true), Value::from("orphan")],
    );

    assert!(matches!(result, Err(RewriteError::OddKeyValues(3))));
    assert!(!path.exists());
    Ok(())
}

#[test]
fn test_write_shouldCreateParentDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("fr/docs/post.md");

    FrontmatterRewriter::write(&path, "---\ntitle: Bonjour\n---\nTexte\n", &FrontmatterUpdates::new().set("translated", true))?;

    assert_eq!(common::read(&path), "---\ntitle: Bonjour\ntranslated: true\n---\nTexte\n");
    Ok(())
}
