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

use bson::oid::ObjectId;
use bson::{Bson, Document};
use indexmap::IndexMap;
use log::debug;
use crate::{DeleteResult, Error, IndexModel, Result, UpdateResult};
use crate::errors::{ConflictingIndexError, DuplicateKeyError};
use crate::filter::Predicate;
use crate::index::{
    describe_difference,
    same_key_pattern,
    IndexBuilder,
    IndexEntries,
    IndexHelperOperation,
    IndexInfo,
    IndexKey,
};
use crate::utils::bson::{set_document_value, stacked_key, values_equivalent};

const ID_KEY: &str = "_id";

struct IndexState {
    info: IndexInfo,
    entries: IndexEntries,
}

/// Documents and indexes of one collection.
///
/// Every method either applies completely or leaves the state untouched.
#[derive(Default)]
pub(crate) struct CollectionState {
    docs: IndexMap<Vec<u8>, Document>,
    indexes: IndexMap<String, IndexState>,
}

impl CollectionState {

    pub fn create_index(&mut self, ns: &str, model: IndexModel) -> Result<String> {
        let info = IndexInfo::from_model(model)?;

        for existing in self.indexes.values() {
            let same_name = existing.info.name == info.name;
            if !same_name && !same_key_pattern(&existing.info.model.keys, &info.model.keys) {
                continue;
            }
            return match describe_difference(&existing.info.model, &info.model)? {
                None => Ok(existing.info.name.clone()),
                Some(reason) => Err(ConflictingIndexError {
                    ns: ns.to_string(),
                    name: info.name.clone(),
                    keys: info.model.keys.clone(),
                    reason,
                }.into()),
            };
        }

        let entries = IndexBuilder::new(ns, &info).execute(self.docs.iter())?;
        let name = info.name.clone();
        debug!("built index {} on {} over {} documents", name, ns, self.docs.len());

        self.indexes.insert(name.clone(), IndexState { info, entries });

        Ok(name)
    }

    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        match self.indexes.shift_remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::IndexNotFound(name.to_string())),
        }
    }

    pub fn list_indexes(&self) -> Vec<IndexModel> {
        self.indexes
            .values()
            .map(|state| {
                let mut model = state.info.model.clone();
                let options = model.options.get_or_insert_with(Default::default);
                options.name = Some(state.info.name.clone());
                model
            })
            .collect()
    }

    /// Keys of `doc` for every index, failing if a unique index already
    /// holds one of them for another document.
    fn checked_index_keys(&self, ns: &str, doc: &Document, pkey: &[u8]) -> Result<Vec<Option<IndexKey>>> {
        let mut result = Vec::with_capacity(self.indexes.len());

        for state in self.indexes.values() {
            let key = state.info.index_key(doc)?;
            if let Some(key) = &key {
                if state.info.is_unique() && state.entries.is_taken_by_other(key, pkey) {
                    return Err(Error::DuplicateKey(Box::new(DuplicateKeyError {
                        name: state.info.name.clone(),
                        key: state.info.display_key(key),
                        ns: ns.to_string(),
                    })));
                }
            }
            result.push(key);
        }

        Ok(result)
    }

    fn index_keys(&self, doc: &Document) -> Result<Vec<Option<IndexKey>>> {
        self.indexes
            .values()
            .map(|state| state.info.index_key(doc))
            .collect()
    }

    fn update_entries(&mut self, op: IndexHelperOperation, keys: &[Option<IndexKey>], pkey: &[u8]) {
        for (state, key) in self.indexes.values_mut().zip(keys.iter()) {
            if let Some(key) = key {
                state.entries.execute(op, key, pkey);
            }
        }
    }

    pub fn insert_one(&mut self, ns: &str, mut doc: Document) -> Result<Bson> {
        if doc.get(ID_KEY).is_none() {
            doc.insert(ID_KEY, ObjectId::new());
        }
        let id = doc.get(ID_KEY).cloned().unwrap_or(Bson::Null);
        let pkey = stacked_key(&[id.clone()])?;

        if self.docs.contains_key(&pkey) {
            return Err(Error::DataExist(id.to_string()));
        }

        let keys = self.checked_index_keys(ns, &doc, &pkey)?;
        self.update_entries(IndexHelperOperation::Insert, &keys, &pkey);
        self.docs.insert(pkey, doc);

        Ok(id)
    }

    pub fn update_one(&mut self, ns: &str, query: &Predicate, update: &Document) -> Result<UpdateResult> {
        let pkey = match self.first_match(query) {
            Some(pkey) => pkey,
            None => return Ok(UpdateResult::default()),
        };
        let old_doc = match self.docs.get(&pkey) {
            Some(doc) => doc.clone(),
            None => return Ok(UpdateResult::default()),
        };

        let new_doc = apply_update(&old_doc, update)?;
        if new_doc == old_doc {
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: 0,
            });
        }

        let new_keys = self.checked_index_keys(ns, &new_doc, &pkey)?;
        let old_keys = self.index_keys(&old_doc)?;

        self.update_entries(IndexHelperOperation::Delete, &old_keys, &pkey);
        self.update_entries(IndexHelperOperation::Insert, &new_keys, &pkey);
        self.docs.insert(pkey, new_doc);

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }

    pub fn delete_one(&mut self, query: &Predicate) -> Result<DeleteResult> {
        let pkey = match self.first_match(query) {
            Some(pkey) => pkey,
            None => return Ok(DeleteResult::default()),
        };

        if let Some(doc) = self.docs.get(&pkey) {
            let keys = self.index_keys(doc)?;
            self.update_entries(IndexHelperOperation::Delete, &keys, &pkey);
        }
        self.docs.shift_remove(&pkey);

        Ok(DeleteResult { deleted_count: 1 })
    }

    pub fn find(&self, query: Option<&Predicate>) -> Vec<Document> {
        self.docs
            .values()
            .filter(|doc| query.map_or(true, |q| q.matches(doc)))
            .cloned()
            .collect()
    }

    #[inline]
    pub fn count_documents(&self) -> u64 {
        self.docs.len() as u64
    }

    fn first_match(&self, query: &Predicate) -> Option<Vec<u8>> {
        self.docs
            .iter()
            .find(|(_, doc)| query.matches(doc))
            .map(|(pkey, _)| pkey.clone())
    }

}

/// Applies a `$set` update; no other update operator is understood.
fn apply_update(doc: &Document, update: &Document) -> Result<Document> {
    if update.is_empty() {
        return Err(Error::UnknownUpdateOperation(String::new()));
    }

    let mut result = doc.clone();
    for (op, fields) in update {
        let fields = match (op.as_str(), fields) {
            ("$set", Bson::Document(fields)) => fields,
            _ => return Err(Error::UnknownUpdateOperation(op.clone())),
        };
        for (key, value) in fields {
            if key == ID_KEY {
                let unchanged = doc.get(ID_KEY).map_or(false, |id| values_equivalent(id, value));
                if !unchanged {
                    return Err(Error::UnableToUpdatePrimaryKey);
                }
                continue;
            }
            set_document_value(&mut result, key, value.clone());
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::filter::Predicate;
    use crate::{Error, IndexModel, IndexOptions};
    use super::CollectionState;

    const NS: &str = "authentication_service.customers";

    fn active_email() -> IndexModel {
        IndexModel::new(
            doc! { "email": 1 },
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! { "active": true })
                .build(),
        )
    }

    #[test]
    fn test_create_index_is_idempotent() {
        let mut state = CollectionState::default();
        assert_eq!(state.create_index(NS, active_email()).unwrap(), "email_1");
        assert_eq!(state.create_index(NS, active_email()).unwrap(), "email_1");
        assert_eq!(state.list_indexes().len(), 1);
    }

    #[test]
    fn test_failed_update_leaves_state() {
        let mut state = CollectionState::default();
        state.create_index(NS, active_email()).unwrap();
        state.insert_one(NS, doc! { "_id": 1, "email": "a@x.com", "active": true }).unwrap();
        state.insert_one(NS, doc! { "_id": 2, "email": "a@x.com", "active": false }).unwrap();

        let query = Predicate::compile(&doc! { "_id": 2 }).unwrap();
        let err = state.update_one(NS, &query, &doc! { "$set": { "active": true } }).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));

        let docs = state.find(Some(&query));
        assert_eq!(docs[0].get_bool("active").unwrap(), false);
    }

    #[test]
    fn test_update_rejects_other_operators() {
        let mut state = CollectionState::default();
        state.insert_one(NS, doc! { "_id": 1, "n": 1 }).unwrap();
        let query = Predicate::compile(&doc! { "_id": 1 }).unwrap();

        let err = state.update_one(NS, &query, &doc! { "$inc": { "n": 1 } }).unwrap_err();
        assert!(err.to_string().contains("$inc"));

        let err = state.update_one(NS, &query, &doc! { "$set": { "_id": 2 } }).unwrap_err();
        assert!(matches!(err, Error::UnableToUpdatePrimaryKey));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let mut state = CollectionState::default();
        state.insert_one(NS, doc! { "_id": "x" }).unwrap();
        let err = state.insert_one(NS, doc! { "_id": "x" }).unwrap_err();
        assert!(matches!(err, Error::DataExist(_)));
    }
}
