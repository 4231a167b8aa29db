//! Server-side style collection.
//!
//! Reads a JSON style document, defines every rule on a headless
//! [`StyleEngine`], and returns the resulting stylesheet text together with the
//! class names that were minted, so a server can inline the CSS and hand the
//! names to its templates.

#![forbid(unsafe_code)]

use anyhow::{Context as _, Result};
use css_cssom::HeadlessBackend;
use css_rule_engine::{DefineOptions, EngineOptions, StyleEngine};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Top-level input document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StyleDocument {
    pub options: EngineOptions,
    pub rules: Vec<RuleEntry>,
}

/// One `define` call.
#[derive(Debug, Deserialize)]
pub struct RuleEntry {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub breakpoint: Option<String>,
    #[serde(default)]
    pub dedupe: bool,
    pub style: Value,
}

/// Result of a collection run.
#[derive(Debug, Serialize)]
pub struct Collected {
    pub css: String,
    /// Class or id token for each rule, in document order.
    pub names: Vec<String>,
}

/// Define every rule of `document` and collect the stylesheet.
///
/// # Errors
/// Fails on the first rule the engine rejects, naming its position.
pub fn collect(document: &StyleDocument) -> Result<Collected> {
    let engine = StyleEngine::new(HeadlessBackend::new(), document.options.clone())
        .context("creating headless style engine")?;
    let mut names = Vec::with_capacity(document.rules.len());
    for (position, entry) in document.rules.iter().enumerate() {
        let mut options = DefineOptions::new().dedupe(entry.dedupe);
        if let Some(selector) = entry.selector.as_deref() {
            options = options.selector(selector);
        }
        if let Some(breakpoint) = entry.breakpoint.as_deref() {
            options = options.breakpoint(breakpoint);
        }
        let handle = engine
            .define(entry.style.clone(), options)
            .with_context(|| format!("rule #{position} could not be defined"))?;
        debug!("rule #{position} -> {} ({})", handle.selector_text(), handle.bucket());
        names.push(handle.name().to_owned());
    }
    let css = engine.collect_css();
    info!("collected {} rules into {} bytes of CSS", names.len(), css.len());
    Ok(Collected { css, names })
}

/// Parse a JSON style document and collect it.
///
/// # Errors
/// Malformed JSON, or any error from [`collect`].
pub fn collect_str(source: &str) -> Result<Collected> {
    let document: StyleDocument =
        serde_json::from_str(source).context("parsing style document")?;
    collect(&document)
}

/// Read a JSON style document from `path` and collect it.
///
/// # Errors
/// I/O failures, or any error from [`collect_str`].
pub fn collect_file(path: &Path) -> Result<Collected> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading style document {}", path.display()))?;
    collect_str(&source)
}
