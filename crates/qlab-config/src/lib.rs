//! qlab-config
//!
//! Layered YAML configuration.
//!
//! - Layers merge in order: earlier documents are the base, later documents
//!   override (mappings merge recursively, everything else is replaced).
//! - The merged document is canonicalized to compact JSON (sorted keys) and
//!   hashed with SHA-256 so two processes can tell whether they run the same
//!   effective config.
//! - `report_unused_keys` lists leaves that nothing in the workspace reads.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

/// Env var holding comma-separated layer paths, in merge order.
pub const CONFIG_PATHS_ENV: &str = "QLAB_CONFIG";

/// JSON-pointer prefixes read by code in this workspace.
///
/// A leaf is consumed when it equals one of these or sits below one.
/// `/strategy` is consumed whole: every key under it is a free-form parameter.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/daemon/addr",
    "/stream/ticks",
    "/stream/interval_ms",
    "/strategy",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Normalized consumed prefixes (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted, unique).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Report config leaves not covered by [`CONSUMED_POINTERS`].
///
/// `Warn` always returns the report. `Fail` errors when any leaf is unused.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    report_unused_keys_with(CONSUMED_POINTERS, config_json, policy)
}

/// Same as [`report_unused_keys`] against an explicit prefix registry.
pub fn report_unused_keys_with(
    consumed: &[&str],
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed_prefixes: Vec<String> = consumed
        .iter()
        .map(|p| normalize_pointer(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let unused_leaf_pointers: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|p| covers(p, leaf)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s): {}",
            report.unused_leaf_pointers.len(),
            preview(&report.unused_leaf_pointers, 12)
        );
    }

    Ok(report)
}

/// Leading "/" enforced, trailing "/" stripped (root stays "/").
fn normalize_pointer(p: &str) -> String {
    let trimmed = p.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// "/a/b" covers "/a/b" and "/a/b/c" but not "/a/bc". "/" covers everything.
fn covers(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match leaf.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                let token = k.replace('~', "~0").replace('/', "~1");
                collect_leaf_pointers(child, &format!("{prefix}/{token}"), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_leaf_pointers(child, &format!("{prefix}/{i}"), out);
            }
        }
        _ if prefix.is_empty() => out.push("/".to_string()),
        _ => out.push(prefix.to_string()),
    }
}

fn preview(items: &[String], n: usize) -> String {
    format!("{:?}", items.iter().take(n).collect::<Vec<_>>())
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Config with no layers: `{}`.
    pub fn empty() -> Self {
        finish(Value::Object(Default::default()))
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<_>>>()?;

    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }
    Ok(finish(merged))
}

/// Load the layers named by [`CONFIG_PATHS_ENV`].
///
/// Unset or blank means no layers. Blank entries between commas are skipped.
pub fn load_from_env() -> Result<LoadedConfig> {
    let raw = std::env::var(CONFIG_PATHS_ENV).unwrap_or_default();
    let paths = split_layer_paths(&raw);
    if paths.is_empty() {
        return Ok(LoadedConfig::empty());
    }
    load_layered_yaml(&paths)
        .with_context(|| format!("failed to load layers from {CONFIG_PATHS_ENV}={raw}"))
}

fn split_layer_paths(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect()
}

fn finish(config_json: Value) -> LoadedConfig {
    // serde_json's default Map is ordered by key, so compact output is canonical.
    let canonical_json = config_json.to_string();
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    LoadedConfig {
        config_hash,
        canonical_json,
        config_json,
    }
}

fn deep_merge(base: Value, over: Value) -> Value {
    match (base, over) {
        (Value::Object(mut base_map), Value::Object(over_map)) => {
            for (k, over_val) in over_map {
                let base_val = base_map.remove(&k).unwrap_or(Value::Null);
                base_map.insert(k, deep_merge(base_val, over_val));
            }
            Value::Object(base_map)
        }
        (_, over) => over,
    }
}
