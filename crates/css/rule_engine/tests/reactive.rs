#![cfg(test)]

use css_cssom::HeadlessBackend;
use css_rule_engine::{
    BucketKind, ComponentScope, DefineOptions, EngineOptions, LiveStyleMap, ReactiveStyleSource,
    StyleEngine, StyleError,
};
use css_style_attr::StyleMap;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn engine() -> Result<StyleEngine<HeadlessBackend>, StyleError> {
    let _ = env_logger::builder().is_test(true).try_init();
    StyleEngine::new(HeadlessBackend::new(), EngineOptions::default())
}

fn live(color: &str) -> LiveStyleMap {
    LiveStyleMap::new(StyleMap::new().with("color", color))
}

#[test]
fn bound_rules_follow_their_source() -> Result<(), StyleError> {
    let engine = engine()?;
    let source = live("red");
    let handle = engine.define(source.clone(), DefineOptions::new().selector(".live"))?;
    assert!(engine.is_bound(&handle));
    assert_eq!(source.listener_count(), 1);

    source.set("color", "blue");
    source.set("fontWeight", "bold");

    assert_eq!(
        engine.declaration_text(&handle).as_deref(),
        Some("color: blue; font-weight: bold;")
    );
    assert_eq!(engine.collect_css(), ".live { color: blue; font-weight: bold; }");
    Ok(())
}

#[test]
fn plain_define_clears_the_binding() -> Result<(), StyleError> {
    let engine = engine()?;
    let source = live("red");
    let opts = DefineOptions::new().selector(".once");
    let handle = engine.define(source.clone(), opts)?;

    engine.define(json!({ "color": "green" }), opts)?;
    assert!(!engine.is_bound(&handle));
    assert_eq!(source.listener_count(), 0);

    source.set("color", "pink");
    assert_eq!(engine.collect_css(), ".once { color: green; }");
    Ok(())
}

#[test]
fn live_define_rebinds() -> Result<(), StyleError> {
    let engine = engine()?;
    let first = live("red");
    let second = live("blue");
    let opts = DefineOptions::new().selector(".swap");
    engine.define(first.clone(), opts)?;
    let handle = engine.define(second.clone(), opts)?;

    assert_eq!(first.listener_count(), 0);
    assert_eq!(second.listener_count(), 1);
    assert_eq!(engine.declaration_text(&handle).as_deref(), Some("color: blue;"));

    first.set("color", "black");
    second.set("color", "white");
    assert_eq!(engine.collect_css(), ".swap { color: white; }");
    Ok(())
}

#[test]
fn bind_and_unbind_an_existing_rule() -> Result<(), StyleError> {
    let engine = engine()?;
    let handle = engine.define(json!({ "color": "red" }), DefineOptions::new().selector(".b"))?;
    let source = live("orange");
    let shared: Rc<dyn ReactiveStyleSource> = Rc::new(source.clone());

    assert!(engine.bind(&handle, &shared)?);
    assert_eq!(engine.collect_css(), ".b { color: orange; }");
    source.set("color", "purple");
    assert_eq!(engine.collect_css(), ".b { color: purple; }");

    assert!(engine.unbind(&handle));
    assert!(!engine.unbind(&handle));
    source.set("color", "gray");
    assert_eq!(engine.collect_css(), ".b { color: purple; }");

    assert!(engine.remove(&handle)?);
    assert!(!engine.bind(&handle, &shared)?);
    Ok(())
}

#[test]
fn notifications_after_teardown_are_ignored() -> Result<(), StyleError> {
    let engine = engine()?;
    let scope = ComponentScope::new();
    let source = live("red");
    engine.define(source.clone(), DefineOptions::new().scope(&scope))?;

    scope.end();
    assert_eq!(source.listener_count(), 0);
    source.set("color", "blue");

    assert_eq!(engine.rule_count(&BucketKind::Dynamic)?, 0);
    assert_eq!(engine.live_rule_count(), 0);
    Ok(())
}

#[test]
fn removal_inside_a_notification_never_reinserts() -> Result<(), StyleError> {
    let engine = engine()?;
    let source = live("red");
    let slot = Rc::new(RefCell::new(None));

    // Registered before the engine binds, so it runs first on each change.
    let remover_engine = engine.clone();
    let remover_slot = Rc::clone(&slot);
    let _remover = source.watch(Rc::new(move |_: &StyleMap| {
        if let Some(handle) = remover_slot.borrow_mut().take() {
            let removed = remover_engine.remove(&handle);
            assert!(matches!(removed, Ok(true)));
        }
    }));

    let handle = engine.define(source.clone(), DefineOptions::new().selector(".gone"))?;
    *slot.borrow_mut() = Some(handle.clone());

    source.set("color", "blue");

    assert!(!engine.is_live(&handle));
    assert_eq!(engine.with_backend(HeadlessBackend::style_rule_count), 0);
    Ok(())
}

#[test]
fn dedupe_hit_keeps_the_existing_binding() -> Result<(), StyleError> {
    let engine = engine()?;
    let first = live("red");
    let second = live("blue");
    let opts = DefineOptions::new().selector(".d").dedupe(true);

    let handle = engine.define(first.clone(), opts)?;
    let again = engine.define(second.clone(), opts)?;

    assert_eq!(handle, again);
    assert_eq!(first.listener_count(), 1);
    assert_eq!(second.listener_count(), 0);
    assert_eq!(engine.collect_css(), ".d { color: red; }");

    second.set("margin", "0");
    assert_eq!(engine.collect_css(), ".d { color: red; }");
    first.set("color", "green");
    assert_eq!(engine.collect_css(), ".d { color: green; }");
    Ok(())
}
