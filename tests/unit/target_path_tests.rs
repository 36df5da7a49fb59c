/*!
 * Tests for output path templates
 */

use std::path::{Path, PathBuf};
use yamtwai::target_path::{TargetPathRule, origin_dir};

#[test]
fn test_resolveFor_withDefaultRule_shouldPlaceOutputNextToSource() {
    let rule = TargetPathRule::default();
    let path = rule.resolve_for(Path::new("content"), "posts/hello.md", "ko", "en").unwrap();
    assert_eq!(path, PathBuf::from("content/posts/hello.en.md"));
}

#[test]
fn test_resolveFor_withSourceLanguageDirectory_shouldDropIt() {
    let rule = TargetPathRule::new("{language}/{origin}/{fileName}.md");
    let path = rule.resolve_for(Path::new("/site/content"), "ko/docs/intro.md", "ko", "ja").unwrap();
    assert_eq!(path, PathBuf::from("/site/content/ja/docs/intro.md"));
}

#[test]
fn test_resolve_shouldBePure() {
    let rule = TargetPathRule::new("./{origin}/{fileName}.{language}.md");
    let first = rule.resolve(Path::new("root"), "a/b", "fr", "post");
    let second = rule.resolve(Path::new("root"), "a/b", "fr", "post");
    assert_eq!(first, second);
    assert_eq!(first, PathBuf::from("root/a/b/post.fr.md"));
}

#[test]
fn test_originDir_shouldHandleRootAndNestedPaths() {
    assert_eq!(origin_dir("post.md", "en"), ".");
    assert_eq!(origin_dir("en/post.md", "en"), ".");
    assert_eq!(origin_dir("blog/2024/post.md", "en"), "blog/2024");
}

#[test]
fn test_validate_withoutLanguagePlaceholder_shouldFail() {
    assert!(TargetPathRule::new("{origin}/{fileName}.md").validate().is_err());
    assert!(TargetPathRule::default().validate().is_ok());
}
