use std::fs;

use forge_shaderc::includer::{expand_includes, IncludeDir, Includer};

#[test]
fn working_directory_wins_over_include_directories() {
    let working = tempfile::tempdir().unwrap();
    let extra = tempfile::tempdir().unwrap();
    fs::write(working.path().join("common.glsl"), "// working copy\n").unwrap();
    fs::write(extra.path().join("common.glsl"), "// include-dir copy\n").unwrap();

    let mut includer = Includer::new(
        working.path(),
        vec![IncludeDir::new(extra.path().to_path_buf())],
    );
    let resolved = includer.resolve("common.glsl").unwrap();
    assert_eq!(resolved.resolved_path, working.path().join("common.glsl"));
    assert_eq!(resolved.content, "// working copy\n");
}

#[test]
fn include_directories_are_searched_in_declaration_order() {
    let working = tempfile::tempdir().unwrap();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(first.path().join("util.glsl"), "// first\n").unwrap();
    fs::write(second.path().join("util.glsl"), "// second\n").unwrap();

    let mut includer = Includer::new(
        working.path(),
        vec![
            IncludeDir::new(first.path().to_path_buf()),
            IncludeDir::new(second.path().to_path_buf()),
        ],
    );
    let resolved = includer.resolve("util.glsl").unwrap();
    assert_eq!(resolved.content, "// first\n");
}

#[test]
fn every_resolution_is_logged_in_order() {
    let working = tempfile::tempdir().unwrap();
    fs::write(working.path().join("a.glsl"), "// a\n").unwrap();
    fs::write(working.path().join("b.glsl"), "// b\n").unwrap();

    let mut includer = Includer::new(working.path(), Vec::new());
    includer.resolve("b.glsl").unwrap();
    includer.resolve("a.glsl").unwrap();
    includer.resolve("b.glsl").unwrap();

    let logged: Vec<_> = includer
        .resolved_files()
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(logged, ["b.glsl", "a.glsl", "b.glsl"]);
}

#[test]
fn expansion_splices_nested_includes() {
    let working = tempfile::tempdir().unwrap();
    fs::write(
        working.path().join("outer.glsl"),
        "// outer\n#include \"inner.glsl\"\n",
    )
    .unwrap();
    fs::write(working.path().join("inner.glsl"), "// inner\n").unwrap();

    let mut includer = Includer::new(working.path(), Vec::new());
    let expanded = expand_includes(
        "#include \"outer.glsl\"\nvoid main() {}\n",
        "main.frag",
        &mut includer,
    )
    .unwrap();
    assert_eq!(expanded, "// outer\n// inner\nvoid main() {}\n");
}

#[test]
fn missing_include_is_a_located_compile_error() {
    let working = tempfile::tempdir().unwrap();
    let mut includer = Includer::new(working.path(), Vec::new());
    let err = expand_includes(
        "// line one\n#include \"nope.glsl\"\n",
        "main.frag",
        &mut includer,
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("main.frag:2"), "{message}");
    assert!(message.contains("'nope.glsl' not found"), "{message}");
}

#[test]
fn cyclic_includes_are_rejected() {
    let working = tempfile::tempdir().unwrap();
    fs::write(working.path().join("a.glsl"), "#include \"b.glsl\"\n").unwrap();
    fs::write(working.path().join("b.glsl"), "#include \"a.glsl\"\n").unwrap();

    let mut includer = Includer::new(working.path(), Vec::new());
    let err = expand_includes("#include \"a.glsl\"\n", "main.frag", &mut includer).unwrap_err();
    assert!(err.to_string().contains("cyclic include"), "{err}");
}
