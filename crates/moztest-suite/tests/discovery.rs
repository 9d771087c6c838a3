use std::path::Path;

use moztest_suite::{MozillaTestSuite, SuiteConfig, TestSuite};

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, b"// test\n").expect("write file");
}

fn suite(root: &Path) -> MozillaTestSuite {
    MozillaTestSuite::new("mozilla", root, SuiteConfig::default())
}

fn ids(suite: &MozillaTestSuite) -> Vec<String> {
    suite
        .list_tests()
        .expect("list tests")
        .iter()
        .map(|t| t.path().to_string())
        .collect()
}

#[test]
fn identifiers_are_sorted_with_files_before_subdirectories() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    for rel in [
        "data/js1_5/Array/foo.js",
        "data/js1_5/Array/bar.js",
        "data/js1_5/Array/sub/zed.js",
        "data/js1_5/Array/notes.txt",
        "data/js1_5/zz.js",
        "data/ecma/Date/a.js",
        "data/ecma_3/b.js",
    ] {
        touch(root, rel);
    }

    assert_eq!(
        ids(&suite(root)),
        vec![
            "ecma/Date/a",
            "ecma_3/b",
            "js1_5/zz",
            "js1_5/Array/bar",
            "js1_5/Array/foo",
            "js1_5/Array/sub/zed",
        ]
    );
}

#[test]
fn hidden_vcs_and_framework_entries_are_skipped() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    for rel in [
        "data/shell.js",
        "data/top.js",
        "data/other/ignored.js",
        "data/js1_5/shell.js",
        "data/js1_5/Array/browser.js",
        "data/js1_5/Array/jsref.js",
        "data/js1_5/Array/template.js",
        "data/js1_5/Array/keep.js",
        "data/js1_5/.hidden/x.js",
        "data/js1_5/.svn/y.js",
        "data/js1_5/CVS/z.js",
        "data/js1_5/Array/.svn/text-base/q.js",
        "data/js1_5/Array/deep/shell.js",
    ] {
        touch(root, rel);
    }

    assert_eq!(ids(&suite(root)), vec!["js1_5/Array/keep"]);
}

#[test]
fn listing_is_deterministic() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    for rel in [
        "data/js1_2/regexp/b.js",
        "data/js1_2/regexp/a.js",
        "data/js1_2/String/c.js",
        "data/js1_1/d-n.js",
    ] {
        touch(root, rel);
    }

    let s = suite(root);
    let first = ids(&s);
    assert_eq!(first.len(), 4);
    assert_eq!(first, ids(&s));
}

#[test]
fn missing_corpus_lists_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    assert!(ids(&suite(tmp.path())).is_empty());
}

#[test]
fn configured_directories_replace_the_default_allow_list() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    touch(root, "data/js1_5/a.js");
    touch(root, "data/extra/b.mjs");
    touch(root, "data/extra/c.js");

    let config = SuiteConfig {
        test_dirs: vec!["extra".to_string()],
        script_extension: ".mjs".to_string(),
        ..SuiteConfig::default()
    };
    let s = MozillaTestSuite::new("custom", root, config);
    let cases = s.list_tests().expect("list tests");
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].path().as_str(), "extra/b");
    assert_eq!(cases[0].suite(), "custom");
}

#[cfg(unix)]
#[test]
fn symlinked_directory_with_script_name_is_not_a_test() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    touch(root, "data/js1_5/real/a.js");
    std::os::unix::fs::symlink(root.join("data/js1_5/real"), root.join("data/js1_5/linked.js"))
        .expect("symlink");

    assert_eq!(ids(&suite(root)), vec!["js1_5/real/a"]);
}
