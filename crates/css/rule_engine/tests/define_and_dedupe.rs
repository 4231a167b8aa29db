#![cfg(test)]

use css_cssom::{BackendOp, HeadlessBackend, StyleSheetBackend};
use css_rule_engine::{BucketKind, DefineOptions, EngineOptions, StyleEngine, StyleError};
use css_selectors::NameGenerator;
use css_style_attr::StyleMap;
use serde_json::json;

fn engine() -> Result<StyleEngine<HeadlessBackend>, StyleError> {
    let _ = env_logger::builder().is_test(true).try_init();
    StyleEngine::with_name_generator(
        HeadlessBackend::new(),
        EngineOptions::default(),
        NameGenerator::with_epoch(0),
    )
}

#[test]
fn deduplicated_defines_insert_once() -> Result<(), StyleError> {
    let engine = engine()?;
    let opts = DefineOptions::new().selector(".btn").dedupe(true);

    let first = engine.define(json!({ "color": "red" }), opts)?;
    let second = engine.define(json!({ "color": "blue" }), opts)?;

    assert_eq!(first, second);
    assert_eq!(first.bucket(), &BucketKind::Static);
    assert_eq!(engine.with_backend(HeadlessBackend::style_rule_count), 1);
    // A dedupe hit never re-diffs.
    assert_eq!(engine.declaration_text(&first).as_deref(), Some("color: red;"));
    Ok(())
}

#[test]
fn redefining_patches_only_what_changed() -> Result<(), StyleError> {
    let engine = engine()?;
    let opts = DefineOptions::new().selector(".card");
    engine.define(json!({ "color": "red", "fontSize": "12px" }), opts)?;
    let inserted = engine.with_backend_mut(HeadlessBackend::take_operations);
    assert!(matches!(inserted.last(), Some(BackendOp::Insert { .. })));

    let handle = engine.define(json!({ "color": "blue" }), opts)?;

    let ops = engine.with_backend_mut(HeadlessBackend::take_operations);
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], BackendOp::RemoveProperty { name, .. } if name == "font-size"));
    assert!(matches!(&ops[1], BackendOp::SetProperty { name, .. } if name == "color"));
    assert_eq!(engine.collect_css(), ".card { color: blue; }");
    assert_eq!(engine.declaration_text(&handle).as_deref(), Some("color: blue;"));
    Ok(())
}

#[test]
fn identical_redefinition_touches_nothing() -> Result<(), StyleError> {
    let engine = engine()?;
    let opts = DefineOptions::new().selector(".same");
    engine.define(json!({ "margin": "0" }), opts)?;
    engine.with_backend_mut(HeadlessBackend::take_operations);
    engine.define(json!({ "margin": "0" }), opts)?;
    assert!(engine.with_backend_mut(HeadlessBackend::take_operations).is_empty());
    Ok(())
}

#[test]
fn style_maps_serialize_with_hyphenated_names() -> Result<(), StyleError> {
    let engine = engine()?;
    let style = json!({
        "backgroundColor": "red",
        "WebkitTransition": "all 1s",
        "--gap": "4px",
        "width": null,
        "height": "",
        "opacity": 0.5,
        "color": "red !important"
    });
    let handle = engine.define(style, DefineOptions::new())?;
    assert_eq!(
        engine.declaration_text(&handle).as_deref(),
        Some(
            "background-color: red; -webkit-transition: all 1s; --gap: 4px; opacity: 0.5; \
             color: red !important;"
        )
    );
    Ok(())
}

#[test]
fn typed_maps_are_accepted() -> Result<(), StyleError> {
    let engine = engine()?;
    let style = StyleMap::new().with("paddingTop", "2px").with("zIndex", 3);
    let handle = engine.define(style, DefineOptions::new().selector("panel"))?;
    assert_eq!(handle.name(), "panel");
    assert_eq!(handle.selector_text(), ".panel");
    assert_eq!(engine.collect_css(), ".panel { padding-top: 2px; z-index: 3; }");
    Ok(())
}

#[test]
fn generated_selectors_are_unique() -> Result<(), StyleError> {
    let engine = engine()?;
    let first = engine.define(json!({ "color": "red" }), DefineOptions::new())?;
    let second = engine.define(json!({ "color": "red" }), DefineOptions::new())?;
    let hover = engine.define(
        json!({ "color": "green" }),
        DefineOptions::new().selector(":hover").prefix("link"),
    )?;

    assert_ne!(first.name(), second.name());
    assert_eq!(hover.name(), "link-aaaa2");
    assert_eq!(hover.selector_text(), ".link-aaaa2:hover");
    assert_eq!(engine.rule_count(&BucketKind::Dynamic)?, 2);
    // An explicit selector without an owning scope persists.
    assert_eq!(hover.bucket(), &BucketKind::Static);
    Ok(())
}

#[test]
fn remove_happens_exactly_once() -> Result<(), StyleError> {
    let engine = engine()?;
    let keep = engine.define(json!({ "color": "red" }), DefineOptions::new().selector(".keep"))?;
    let drop_me = engine.define(json!({ "color": "blue" }), DefineOptions::new().selector(".drop"))?;

    assert!(engine.remove(&drop_me)?);
    assert!(!engine.remove(&drop_me)?);
    assert!(engine.is_live(&keep));
    assert_eq!(engine.collect_css(), ".keep { color: red; }");

    // The selector is free again and gets a fresh rule.
    let again = engine.define(json!({ "color": "blue" }), DefineOptions::new().selector(".drop"))?;
    assert_ne!(again.id(), drop_me.id());
    assert_eq!(engine.rule_count(&BucketKind::Static)?, 2);
    Ok(())
}

#[test]
fn configure_changes_prefix_and_persistence() -> Result<(), StyleError> {
    let engine = engine()?;
    engine.configure(
        EngineOptions::default()
            .with_prefix("app")
            .with_persist_unscoped_selectors(false),
    );
    assert!(engine.make_class_name(None).starts_with("app-"));
    assert_eq!(engine.make_class_name(Some("x")), "x-aaaa1");

    let handle = engine.define(json!({ "color": "red" }), DefineOptions::new().selector(".x"))?;
    assert_eq!(handle.bucket(), &BucketKind::Dynamic);
    Ok(())
}

#[test]
fn rule_missing_from_its_bucket_is_inserted_again() -> Result<(), StyleError> {
    let engine = engine()?;
    let opts = DefineOptions::new().selector(".moved");
    let handle = engine.define(json!({ "color": "red" }), opts)?;
    assert_eq!(handle.bucket(), &BucketKind::Static);

    let lists = engine.with_backend(|backend| backend.sheets().to_vec());
    let Some(&static_list) = lists.get(1) else {
        return Err(StyleError::UnsupportedEnvironment("static sheet missing".into()));
    };
    engine.with_backend_mut(|backend| backend.delete_rule(static_list, 0))?;
    assert_eq!(engine.with_backend(HeadlessBackend::style_rule_count), 0);

    let again = engine.define(json!({ "color": "blue", "margin": "0" }), opts)?;

    assert_eq!(again.id(), handle.id());
    assert_eq!(engine.with_backend(HeadlessBackend::style_rule_count), 1);
    assert_eq!(
        engine.with_backend(|backend| backend.list_text(static_list))?,
        ".moved { color: blue; margin: 0; }"
    );
    assert_eq!(
        engine.declaration_text(&again).as_deref(),
        Some("color: blue; margin: 0;")
    );
    Ok(())
}
