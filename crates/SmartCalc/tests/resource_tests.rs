mod common;

use std::fs;
use std::path::Path;

use common::shipped_resources;
use smart_calc::{CalcError, Culture, Interpreter, InterpreterConfig, ResourceSource};
use tokio_util::sync::CancellationToken;

fn copy_invariant(to: &Path) {
    let target = to.join("invariant");
    fs::create_dir_all(&target).unwrap();
    for file in ["grammar.json", "units.json", "functions.json"] {
        fs::copy(shipped_resources().join("invariant").join(file), target.join(file)).unwrap();
    }
}

fn display(config: &InterpreterConfig, text: &str) -> Vec<String> {
    Interpreter::new(config)
        .unwrap()
        .evaluate_document(text, &CancellationToken::new())
        .unwrap()
        .lines
        .into_iter()
        .map(|line| line.display_text)
        .collect()
}

#[test]
fn shipped_directory_matches_embedded_tables() {
    let text = "1\u{a0}234,5 km en m\nracine(16)\n1 h + 30 min";
    let embedded = InterpreterConfig::new(Culture::new("fr-fr"));
    let directory = embedded
        .clone()
        .with_resources(ResourceSource::Directory(shipped_resources()));
    assert_eq!(display(&embedded, text), display(&directory, text));
}

#[test]
fn culture_overlay_extends_invariant_tables() {
    let dir = tempfile::tempdir().unwrap();
    copy_invariant(dir.path());
    let german = dir.path().join("de-de");
    fs::create_dir_all(&german).unwrap();
    fs::write(
        german.join("units.json"),
        r#"{ "unit_aliases": { "Meilen": "mi", "Stunden": "h" } }"#,
    )
    .unwrap();
    fs::write(
        german.join("functions.json"),
        r#"{ "functions": { "wurzel": "sqrt" } }"#,
    )
    .unwrap();

    let config = InterpreterConfig::new(Culture::new("de-DE"))
        .with_resources(ResourceSource::Directory(dir.path().to_path_buf()));
    assert_eq!(
        display(&config, "3 Meilen in km\nwurzel(16)\n2 Stunden in min\n2024-05-01"),
        vec!["4.828032 km", "4", "120 min", "2024-05-01"]
    );
}

#[test]
fn missing_invariant_tables_prevent_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = InterpreterConfig::new(Culture::new("en-us"))
        .with_resources(ResourceSource::Directory(dir.path().to_path_buf()));
    match Interpreter::new(&config) {
        Err(CalcError::ResourceLoad { culture, .. }) => assert_eq!(culture, "en-us"),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("interpreter started without tables"),
    }
}

#[test]
fn corrupt_overlay_prevents_start() {
    let dir = tempfile::tempdir().unwrap();
    copy_invariant(dir.path());
    let broken = dir.path().join("xx-broken");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("units.json"), "{ not json").unwrap();

    let config = InterpreterConfig::new(Culture::new("xx-broken"))
        .with_resources(ResourceSource::Directory(dir.path().to_path_buf()));
    assert!(matches!(
        Interpreter::new(&config),
        Err(CalcError::ResourceLoad { .. })
    ));
}
