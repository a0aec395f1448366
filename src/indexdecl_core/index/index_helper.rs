// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use bson::{Bson, Document};
use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use crate::{Error, IndexModel, Result};
use crate::filter::Predicate;
use crate::utils::bson::{documents_equivalent, stacked_key, try_get_document_value};

/// Validates a key pattern and returns it in declaration order.
/// Only ascending fields are accepted.
pub(crate) fn normalize_keys(keys: &Document) -> Result<IndexMap<String, i8>> {
    if keys.is_empty() {
        return Err(Error::EmptyKeyPattern);
    }

    let mut result = IndexMap::with_capacity(keys.len());
    for (key_name, value_of_key) in keys.iter() {
        let ascending = match value_of_key {
            Bson::Int32(1) | Bson::Int64(1) => true,
            Bson::Double(d) => *d == 1.0,
            _ => false,
        };
        if !ascending || key_name.is_empty() {
            return Err(Error::InvalidOrderOfIndex(key_name.clone()));
        }
        result.insert(key_name.clone(), 1);
    }

    Ok(result)
}

pub(crate) fn default_index_name(keys: &IndexMap<String, i8>) -> String {
    keys.iter()
        .map(|(name, order)| format!("{}_{}", name, order))
        .collect::<Vec<String>>()
        .join("_")
}

pub(crate) fn same_key_pattern(a: &Document, b: &Document) -> bool {
    match (normalize_keys(a), normalize_keys(b)) {
        (Ok(a), Ok(b)) => a.keys().eq(b.keys()),
        _ => documents_equivalent(a, b),
    }
}

/// Explains how `existing` differs from `wanted`, or `None` when both
/// describe the same index.
pub(crate) fn describe_difference(existing: &IndexModel, wanted: &IndexModel) -> Result<Option<String>> {
    let existing_name = existing.name()?;
    let wanted_name = wanted.name()?;

    if !same_key_pattern(&existing.keys, &wanted.keys) {
        return Ok(Some(format!(
            "index '{}' already exists with key {}", existing_name, existing.keys,
        )));
    }
    if existing_name != wanted_name {
        return Ok(Some(format!(
            "an equivalent index already exists with a different name: '{}'", existing_name,
        )));
    }
    if existing.is_unique() != wanted.is_unique() {
        return Ok(Some(format!(
            "existing index has unique: {}, declared unique: {}",
            existing.is_unique(), wanted.is_unique(),
        )));
    }

    let same_filter = match (existing.partial_filter_expression(), wanted.partial_filter_expression()) {
        (None, None) => true,
        (Some(a), Some(b)) => documents_equivalent(a, b),
        _ => false,
    };
    if !same_filter {
        return Ok(Some(format!(
            "existing partial filter {} differs from declared {}",
            display_filter(existing.partial_filter_expression()),
            display_filter(wanted.partial_filter_expression()),
        )));
    }

    Ok(None)
}

fn display_filter(filter: Option<&Document>) -> String {
    filter.map_or_else(|| "(none)".to_string(), |f| f.to_string())
}

/// A key value extracted from a document for one index.
pub(crate) struct IndexKey {
    pub bytes: Vec<u8>,
    pub values: Vec<Bson>,
}

/// The compiled form of an [`IndexModel`] kept by the engine.
#[derive(Debug, Clone)]
pub(crate) struct IndexInfo {
    pub name: String,
    pub keys: IndexMap<String, i8>,
    pub model: IndexModel,
    filter: Option<Predicate>,
}

impl IndexInfo {

    pub fn from_model(model: IndexModel) -> Result<IndexInfo> {
        let keys = normalize_keys(&model.keys)?;
        let name = model.name()?;
        let filter = match model.partial_filter_expression() {
            Some(filter) => Some(Predicate::compile(filter)?),
            None => None,
        };
        Ok(IndexInfo {
            name,
            keys,
            model,
            filter,
        })
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.model.is_unique()
    }

    /// Returns `None` when the partial filter excludes the document.
    /// A missing field indexes as `null`.
    pub fn index_key(&self, doc: &Document) -> Result<Option<IndexKey>> {
        if let Some(filter) = &self.filter {
            if !filter.matches(doc) {
                return Ok(None);
            }
        }

        let values = self.keys
            .keys()
            .map(|key| try_get_document_value(doc, key).unwrap_or(Bson::Null))
            .collect::<Vec<Bson>>();
        let bytes = stacked_key(&values)?;

        Ok(Some(IndexKey { bytes, values }))
    }

    /// Renders a key value as `{ "email": "a@x.com" }`.
    pub fn display_key(&self, key: &IndexKey) -> String {
        let mut doc = Document::new();
        for (name, value) in self.keys.keys().zip(key.values.iter()) {
            doc.insert(name.clone(), value.clone());
        }
        doc.to_string()
    }

}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub(crate) enum IndexHelperOperation {
    Insert,
    Delete,
}

/// Index key -> primary keys of the documents holding it.
#[derive(Debug, Default, Clone)]
pub(crate) struct IndexEntries {
    entries: HashMap<Vec<u8>, HashSet<Vec<u8>>>,
}

impl IndexEntries {

    pub fn execute(&mut self, op: IndexHelperOperation, key: &IndexKey, pkey: &[u8]) {
        match op {
            IndexHelperOperation::Insert => {
                self.entries
                    .entry(key.bytes.clone())
                    .or_insert_with(HashSet::new)
                    .insert(pkey.to_vec());
            }
            IndexHelperOperation::Delete => {
                let emptied = match self.entries.get_mut(&key.bytes) {
                    Some(owners) => {
                        owners.remove(pkey);
                        owners.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    self.entries.remove(&key.bytes);
                }
            }
        }
    }

    /// True if a document other than `pkey` already holds `key`.
    pub fn is_taken_by_other(&self, key: &IndexKey, pkey: &[u8]) -> bool {
        self.entries
            .get(&key.bytes)
            .map_or(false, |owners| owners.iter().any(|owner| owner.as_slice() != pkey))
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.values().map(|owners| owners.len()).sum()
    }

}
