#![cfg(test)]

use css_cssom::{HeadlessBackend, StyleSheetBackend};
use css_media_queries::Breakpoints;
use css_rule_engine::{BucketKind, DefineOptions, EngineOptions, StyleEngine, StyleError};
use serde_json::json;

fn engine(options: EngineOptions) -> Result<StyleEngine<HeadlessBackend>, StyleError> {
    let _ = env_logger::builder().is_test(true).try_init();
    StyleEngine::new(HeadlessBackend::new(), options)
}

#[test]
fn breakpoint_rules_nest_in_media_shells() -> Result<(), StyleError> {
    let engine = engine(EngineOptions::default())?;
    let phone = engine.define(
        json!({ "fontSize": "14px" }),
        DefineOptions::new().selector(".title").breakpoint("phone"),
    )?;
    let tablet = engine.define(
        json!({ "fontSize": "18px" }),
        DefineOptions::new().selector(".title").breakpoint("tablet"),
    )?;

    assert_eq!(phone.bucket(), &BucketKind::Screen("phone".into()));
    assert_ne!(phone.id(), tablet.id());
    assert_eq!(engine.rule_count(&BucketKind::Dynamic)?, 0);
    assert_eq!(engine.rule_count(&BucketKind::Static)?, 0);
    assert_eq!(engine.rule_count(phone.bucket())?, 1);
    assert_eq!(engine.rule_count(tablet.bucket())?, 1);
    assert_eq!(
        engine.collect_css(),
        "@media screen and (max-width: 599px) { .title { font-size: 14px; } }\n\
         @media screen and (min-width: 768px) and (max-width: 1023px) { .title { font-size: 18px; } }"
    );
    Ok(())
}

#[test]
fn base_rules_stay_ahead_of_shells() -> Result<(), StyleError> {
    let engine = engine(EngineOptions::default())?;
    engine.define(
        json!({ "padding": "4px" }),
        DefineOptions::new().selector(".box").breakpoint("phone"),
    )?;
    engine.define(json!({ "padding": "8px" }), DefineOptions::new().selector(".box"))?;

    let first_selector = engine.with_backend(|backend| {
        let sheet = backend.sheets().get(1).copied();
        sheet.and_then(|list| backend.selector_text_at(list, 0).ok().flatten())
    });
    assert_eq!(first_selector.as_deref(), Some(".box"));
    Ok(())
}

#[test]
fn unknown_breakpoints_fall_back_to_the_top_level() -> Result<(), StyleError> {
    let engine = engine(EngineOptions::default())?;
    let handle = engine.define(
        json!({ "color": "red" }),
        DefineOptions::new().breakpoint("watch"),
    )?;
    assert_eq!(handle.bucket(), &BucketKind::Static);
    assert_eq!(engine.bucket_kinds(), vec![BucketKind::Dynamic, BucketKind::Static]);
    Ok(())
}

#[test]
fn custom_breakpoints_come_from_options() -> Result<(), StyleError> {
    let breakpoints = Breakpoints::empty().with("print", "print");
    let engine = engine(EngineOptions::default().with_breakpoints(breakpoints))?;
    let handle = engine.define(
        json!({ "display": "none" }),
        DefineOptions::new().selector(".nav").breakpoint("print"),
    )?;
    assert_eq!(handle.bucket(), &BucketKind::Screen("print".into()));
    assert_eq!(engine.collect_css(), "@media print { .nav { display: none; } }");
    Ok(())
}

#[test]
fn removing_a_breakpoint_rule_keeps_the_shell() -> Result<(), StyleError> {
    let engine = engine(EngineOptions::default())?;
    let handle = engine.define(
        json!({ "color": "red" }),
        DefineOptions::new().selector(".a").breakpoint("desktop"),
    )?;
    assert!(engine.remove(&handle)?);
    assert_eq!(engine.rule_count(handle.bucket())?, 0);
    assert!(engine.bucket_kinds().contains(handle.bucket()));
    Ok(())
}
