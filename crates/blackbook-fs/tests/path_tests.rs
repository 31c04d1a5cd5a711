use std::path::{Path, PathBuf};

use blackbook_fs::NormalizedPath;
use blackbook_fs::path::{is_glob, is_url, resolve_with_home};
use rstest::rstest;

const HOME: &str = "/home/tester";

#[rstest]
#[case("~", None, "/home/tester")]
#[case("~/.claude/agents", None, "/home/tester/.claude/agents")]
#[case("~/.claude", Some("/srv/repo"), "/home/tester/.claude")]
#[case("/etc/tool.conf", Some("/srv/repo"), "/etc/tool.conf")]
#[case("agents/reviewer.md", Some("/srv/repo"), "/srv/repo/agents/reviewer.md")]
#[case("agents", Some("~/dotfiles"), "/home/tester/dotfiles/agents")]
#[case("agents", None, "agents")]
#[case("agents", Some(""), "agents")]
#[case("~bob/x", Some("/srv/repo"), "~bob/x")]
fn resolves_path_specs(#[case] spec: &str, #[case] base: Option<&str>, #[case] expected: &str) {
    let resolved = resolve_with_home(spec, base, Some(Path::new(HOME)));
    assert_eq!(resolved, PathBuf::from(expected));
}

#[test]
fn urls_pass_through_unchanged() {
    let spec = "https://example.com/agents/reviewer.md";
    let resolved = resolve_with_home(spec, Some("/srv/repo"), Some(Path::new(HOME)));
    assert_eq!(resolved, PathBuf::from(spec));
}

#[test]
fn tilde_without_home_is_left_alone() {
    assert_eq!(resolve_with_home("~/x", None, None), PathBuf::from("~/x"));
}

#[rstest]
#[case("https://example.com/a.md", true)]
#[case("git+ssh://host/repo", true)]
#[case("file:///tmp/a", true)]
#[case("agents/*.md", false)]
#[case("C:/agents", false)]
fn detects_urls(#[case] spec: &str, #[case] expected: bool) {
    assert_eq!(is_url(spec), expected);
}

#[rstest]
#[case("agents/*.md", true)]
#[case("agents/reviewer?.md", true)]
#[case("agents/[ab].md", true)]
#[case("agents/reviewer.md", false)]
#[case("https://example.com/*.md", false)]
fn detects_globs(#[case] spec: &str, #[case] expected: bool) {
    assert_eq!(is_glob(spec), expected);
}

#[test]
fn normalized_path_uses_forward_slashes() {
    let path = NormalizedPath::new("skills\\review\\SKILL.md");
    assert_eq!(path.as_str(), "skills/review/SKILL.md");
    assert_eq!(path.file_name(), Some("SKILL.md"));
    assert_eq!(path.extension(), Some("md"));
}

#[test]
fn normalized_join_from_empty_is_segment() {
    let path = NormalizedPath::new("").join("a.md");
    assert_eq!(path.as_str(), "a.md");
    assert_eq!(NormalizedPath::new("dir/").join("a.md").as_str(), "dir/a.md");
}
