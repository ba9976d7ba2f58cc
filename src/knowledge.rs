// src/knowledge.rs
//! Static disease knowledge base: records, the field selector, and JSON loading.
//!
//! The shipped dataset lives in `data/knowledge_base.json` and is embedded into the binary.
//! A different file can be loaded at startup (see `config`), but it goes through the same
//! validation: unique, lowercase, non-empty ids and at least one record.
//!
//! Array order matters: it is the identifier iteration order the entity matcher scans.

use anyhow::{anyhow, bail, Context};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const EMBEDDED_KB: &str = include_str!("../data/knowledge_base.json");

static DEFAULT_KB: Lazy<Arc<KnowledgeBase>> = Lazy::new(|| {
    Arc::new(KnowledgeBase::from_json_str(EMBEDDED_KB).expect("valid embedded knowledge base"))
});

/// One disease entry. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub id: String,
    pub title: String,
    pub info: String,
    pub prevention: String,
    pub care: String,
}

/// Which text of a record a reply should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    /// Symptoms / general information.
    Info,
    Prevention,
    /// Care / treatment.
    Care,
}

impl InfoField {
    pub fn as_str(self) -> &'static str {
        match self {
            InfoField::Info => "info",
            InfoField::Prevention => "prevention",
            InfoField::Care => "care",
        }
    }
}

impl DiseaseRecord {
    #[inline]
    pub fn field(&self, field: InfoField) -> &str {
        match field {
            InfoField::Info => &self.info,
            InfoField::Prevention => &self.prevention,
            InfoField::Care => &self.care,
        }
    }
}

/// Read-only id → record mapping that remembers load order.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    records: Vec<DiseaseRecord>,
    index: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// The dataset compiled into the binary. Parsed once, shared afterwards.
    pub fn embedded() -> Arc<KnowledgeBase> {
        DEFAULT_KB.clone()
    }

    /// Load from a JSON file containing an array of records.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge base at {}", path.display()))?;
        Self::from_json_str(&data)
            .with_context(|| format!("Invalid knowledge base in {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let records: Vec<DiseaseRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// Build from records, rejecting duplicates instead of letting a later one shadow an earlier one.
    pub fn from_records(records: Vec<DiseaseRecord>) -> anyhow::Result<Self> {
        if records.is_empty() {
            bail!("knowledge base has no records");
        }

        let mut index = HashMap::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            if rec.id.trim().is_empty() {
                bail!("record #{i} has an empty id");
            }
            if rec.id != rec.id.to_lowercase() {
                bail!("record id `{}` must be lowercase", rec.id);
            }
            if index.insert(rec.id.clone(), i).is_some() {
                return Err(anyhow!("duplicate record id `{}`", rec.id));
            }
        }

        Ok(Self { records, index })
    }

    pub fn get(&self, id: &str) -> Option<&DiseaseRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identifiers in load order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiseaseRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
