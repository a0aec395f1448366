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

use std::sync::{Mutex, Weak};
use bson::{Bson, Document};
use serde::Serialize;
use crate::{DeleteResult, Error, IndexModel, InsertOneResult, Result, UpdateResult};
use crate::filter::Predicate;
use crate::memory::collection_state::CollectionState;
use crate::memory::memory_client::ClientInner;

/// A collection of the in-memory engine.
///
/// Queries understand field equality, `$eq`, `$exists` and `$and`;
/// updates understand `$set`.
///
/// Indexes are single-key: a write that puts an array or an embedded
/// document into an indexed field of a covered document fails with
/// [`Error::NotAValidKeyType`]. Multikey indexing is not supported.
#[derive(Clone)]
pub struct MemoryCollection {
    inner: Weak<Mutex<ClientInner>>,
    db: String,
    name: String,
}

impl MemoryCollection {

    pub(crate) fn new(inner: Weak<Mutex<ClientInner>>, db: &str, name: &str) -> MemoryCollection {
        MemoryCollection {
            inner,
            db: db.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `database.collection`
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.db, self.name)
    }

    fn write<R>(&self, f: impl FnOnce(&mut CollectionState, &str) -> Result<R>) -> Result<R> {
        if self.name.is_empty() || self.name.contains('$') {
            return Err(Error::IllegalCollectionName(self.name.clone()));
        }
        let inner = self.inner.upgrade().ok_or(Error::DbIsClosed)?;
        let mut guard = inner.lock()?;
        let ns = self.namespace();
        let state = guard
            .databases
            .entry(self.db.clone())
            .or_default()
            .collections
            .entry(self.name.clone())
            .or_default();
        f(state, &ns)
    }

    fn read<R>(&self, f: impl FnOnce(Option<&CollectionState>) -> R) -> Result<R> {
        let inner = self.inner.upgrade().ok_or(Error::DbIsClosed)?;
        let guard = inner.lock()?;
        let state = guard
            .databases
            .get(&self.db)
            .and_then(|db| db.collections.get(&self.name));
        Ok(f(state))
    }

    /// Creates the index, building it over the documents already stored.
    ///
    /// Creating an identical index again returns its name. An index with
    /// the same key or name but different options is rejected, and so is a
    /// unique index that the stored documents already violate.
    pub fn create_index(&self, index: IndexModel) -> Result<String> {
        self.write(|state, ns| state.create_index(ns, index))
    }

    /// Drops the index specified by `name` from this collection.
    pub fn drop_index(&self, name: impl AsRef<str>) -> Result<()> {
        self.write(|state, _| state.drop_index(name.as_ref()))
    }

    pub fn list_indexes(&self) -> Result<Vec<IndexModel>> {
        self.read(|state| state.map(|s| s.list_indexes()).unwrap_or_default())
    }

    /// Inserts `doc` into the collection.
    ///
    /// Fails with [`Error::NotAValidKeyType`] when an indexed field of a
    /// covered document holds an array or a document.
    pub fn insert_one(&self, doc: impl Serialize) -> Result<InsertOneResult> {
        let doc = bson::to_document(&doc)?;
        let inserted_id = self.write(|state, ns| state.insert_one(ns, doc))?;
        Ok(InsertOneResult { inserted_id })
    }

    /// Updates up to one document matching `query`. Only `$set` is supported.
    pub fn update_one(&self, query: Document, update: Document) -> Result<UpdateResult> {
        let query = Predicate::compile(&query)?;
        self.write(|state, ns| state.update_one(ns, &query, &update))
    }

    /// Deletes up to one document found matching `query`.
    pub fn delete_one(&self, query: Document) -> Result<DeleteResult> {
        let query = Predicate::compile(&query)?;
        self.write(|state, _| state.delete_one(&query))
    }

    pub fn find(&self, filter: impl Into<Option<Document>>) -> Result<Vec<Document>> {
        let query = match filter.into() {
            Some(filter) => Some(Predicate::compile(&filter)?),
            None => None,
        };
        self.read(|state| {
            state
                .map(|s| s.find(query.as_ref()))
                .unwrap_or_default()
        })
    }

    /// Finds a single document in the collection matching `filter`.
    pub fn find_one(&self, filter: impl Into<Option<Document>>) -> Result<Option<Document>> {
        Ok(self.find(filter)?.into_iter().next())
    }

    /// Finds a document by its `_id`.
    pub fn find_by_id(&self, id: impl Into<Bson>) -> Result<Option<Document>> {
        let mut filter = Document::new();
        filter.insert("_id", id.into());
        self.find_one(filter)
    }

    /// Return the size of all data in the collection.
    pub fn count_documents(&self) -> Result<u64> {
        self.read(|state| state.map_or(0, |s| s.count_documents()))
    }

}
