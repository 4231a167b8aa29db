#![cfg(test)]

use anyhow::Result;
use css_media_queries::DEFAULT_BREAKPOINTS;
use std::io::Write as _;
use style_collect::{collect_file, collect_str};
use tempfile::NamedTempFile;

#[test]
fn document_rules_become_css() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let source = r#"{
        "options": { "prefix": "app" },
        "rules": [
            { "selector": ".btn", "dedupe": true, "style": { "color": "red", "paddingTop": 4 } },
            { "selector": ".btn", "dedupe": true, "style": { "color": "blue" } },
            { "selector": ".btn", "breakpoint": "phone", "style": { "padding": "2px" } },
            { "style": { "display": "flex" } }
        ]
    }"#;
    let collected = collect_str(source)?;

    let phone = DEFAULT_BREAKPOINTS
        .iter()
        .find(|(name, _)| *name == "phone")
        .map(|(_, condition)| *condition)
        .unwrap_or_default();
    let minted = collected.names.last().cloned().unwrap_or_default();
    assert!(minted.starts_with("app-"));
    assert_eq!(collected.names.first().map(String::as_str), Some("btn"));
    assert_eq!(
        collected.css,
        format!(
            ".{minted} {{ display: flex; }}\n\
             .btn {{ color: red; padding-top: 4; }}\n\
             @media {phone} {{ .btn {{ padding: 2px; }} }}"
        )
    );
    Ok(())
}

#[test]
fn documents_are_read_from_files() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r##"{{ "rules": [ {{ "selector": "#main", "style": {{ "margin": "0 auto" }} }} ] }}"##
    )?;
    let collected = collect_file(file.path())?;
    assert_eq!(collected.css, "#main { margin: 0 auto; }");
    assert_eq!(collected.names, vec!["main".to_owned()]);
    Ok(())
}

#[test]
fn malformed_documents_are_reported() {
    let _ = env_logger::builder().is_test(true).try_init();
    let result = collect_str(r#"{ "rules": [ { "selector": ".x" } ] }"#);
    let message = result.map_err(|err| err.to_string()).err();
    assert_eq!(message.as_deref(), Some("parsing style document"));
}
