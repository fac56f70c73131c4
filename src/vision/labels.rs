// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class label mapping
//!
//! A single normalized `class_id -> name` table, built once when the model
//! is loaded and shared read-only by every request.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

/// Matches one `id: 'name'` entry of the Python dict literal that
/// Ultralytics writes into the `names` metadata of exported models.
fn metadata_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(\d+)\s*:\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#)
            .expect("label metadata regex is valid")
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    names: BTreeMap<u32, String>,
}

impl LabelMap {
    /// Build from an ordered list; the position is the class id
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (id as u32, name.into()))
                .collect(),
        }
    }

    /// Build from explicit `(id, name)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            names: pairs.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }

    /// Parse the `names` metadata entry of an Ultralytics export,
    /// e.g. `{0: 'person', 1: 'bicycle'}`
    pub fn from_ultralytics_metadata(raw: &str) -> Result<Self> {
        let names: BTreeMap<u32, String> = metadata_entry_regex()
            .captures_iter(raw)
            .filter_map(|caps| {
                let id = caps.get(1)?.as_str().parse::<u32>().ok()?;
                let name = caps.get(2).or_else(|| caps.get(3))?.as_str();
                Some((id, unescape(name)))
            })
            .collect();

        if names.is_empty() {
            anyhow::bail!("no class names found in model metadata: {:?}", raw);
        }
        Ok(Self { names })
    }

    /// Load a label file: a JSON array, a JSON object of id -> name,
    /// or plain text with one name per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid label file {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('[') {
            let names: Vec<String> = serde_json::from_str(trimmed)?;
            return Ok(Self::from_names(names));
        }
        if trimmed.starts_with('{') {
            if let Ok(map) = serde_json::from_str::<BTreeMap<String, String>>(trimmed) {
                let mut names = BTreeMap::new();
                for (key, name) in map {
                    let id = key
                        .trim()
                        .parse::<u32>()
                        .with_context(|| format!("class id '{}' is not an integer", key))?;
                    names.insert(id, name);
                }
                return Ok(Self { names });
            }
            return Self::from_ultralytics_metadata(trimmed);
        }

        Ok(Self::from_names(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        ))
    }

    /// Resolve a class id; unknown ids fall back to their decimal form
    pub fn name(&self, class_id: u32) -> Cow<'_, str> {
        match self.names.get(&class_id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(class_id.to_string()),
        }
    }

    pub fn get(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn unescape(name: &str) -> String {
    name.replace("\\'", "'").replace("\\\"", "\"")
}
