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

use std::sync::{Arc, Mutex, Weak};
use indexmap::IndexMap;
use log::debug;
use crate::{Connector, DatabaseHandle, Error, IndexModel, Result};
use crate::memory::collection_state::CollectionState;
use crate::memory::MemoryCollection;

const ILLEGAL_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

#[derive(Default)]
pub(crate) struct DatabaseState {
    pub(crate) collections: IndexMap<String, CollectionState>,
}

#[derive(Default)]
pub(crate) struct ClientInner {
    pub(crate) databases: IndexMap<String, DatabaseState>,
}

///
/// An in-process document store that enforces unique and partial
/// indexes the way the server does.
///
/// Cloning a client is cheap; clones share the same data. Databases and
/// collections handed out by a client stop working once every clone of
/// the client has been dropped.
///
/// # Example
///
/// ```rust
/// use indexdecl_core::{MemoryClient, IndexModel, IndexOptions};
/// use indexdecl_core::bson::doc;
///
/// let client = MemoryClient::new();
/// let customers = client.database("customer_service").unwrap().collection("customers");
///
/// customers.create_index(IndexModel::new(
///     doc! { "email": 1 },
///     IndexOptions::builder()
///         .unique(true)
///         .partial_filter_expression(doc! { "active": true })
///         .build(),
/// )).unwrap();
///
/// customers.insert_one(doc! { "email": "a@x.com", "active": true }).unwrap();
/// assert!(customers.insert_one(doc! { "email": "a@x.com", "active": true }).is_err());
/// customers.insert_one(doc! { "email": "a@x.com", "active": false }).unwrap();
/// ```
#[derive(Clone, Default)]
pub struct MemoryClient {
    inner: Arc<Mutex<ClientInner>>,
}

impl MemoryClient {

    pub fn new() -> MemoryClient {
        MemoryClient::default()
    }

    /// Selects a database, creating it on first use.
    pub fn database(&self, name: &str) -> Result<MemoryDatabase> {
        if name.is_empty() || name.contains(ILLEGAL_DATABASE_CHARS) {
            return Err(Error::IllegalDatabaseName(name.to_string()));
        }

        let mut inner = self.inner.lock()?;
        if !inner.databases.contains_key(name) {
            debug!("creating database {}", name);
            inner.databases.insert(name.to_string(), DatabaseState::default());
        }

        Ok(MemoryDatabase {
            inner: Arc::downgrade(&self.inner),
            name: name.to_string(),
        })
    }

    pub fn list_database_names(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock()?;
        Ok(inner.databases.keys().cloned().collect())
    }

}

impl Connector for MemoryClient {

    fn open_database<'a>(&'a self, name: &str) -> Result<Box<dyn DatabaseHandle + 'a>> {
        Ok(Box::new(self.database(name)?))
    }

}

#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Weak<Mutex<ClientInner>>,
    name: String,
}

impl MemoryDatabase {

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection::new(self.inner.clone(), &self.name, name)
    }

}

impl DatabaseHandle for MemoryDatabase {

    fn name(&self) -> &str {
        &self.name
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>> {
        self.collection(collection).list_indexes()
    }

    fn create_index(&self, collection: &str, index: IndexModel) -> Result<String> {
        self.collection(collection).create_index(index)
    }

}

#[cfg(test)]
mod tests {
    use crate::{Connector, Error};
    use super::MemoryClient;

    #[test]
    fn test_illegal_database_name() {
        let client = MemoryClient::new();
        assert!(matches!(client.database("a.b"), Err(Error::IllegalDatabaseName(_))));
        assert!(matches!(client.database(""), Err(Error::IllegalDatabaseName(_))));
    }

    #[test]
    fn test_databases_are_created_lazily() {
        let client = MemoryClient::new();
        assert!(client.list_database_names().unwrap().is_empty());

        let handle = client.open_database("customer_service").unwrap();
        assert_eq!(handle.name(), "customer_service");
        assert_eq!(client.list_database_names().unwrap(), vec!["customer_service"]);
    }

    #[test]
    fn test_closed_client() {
        let client = MemoryClient::new();
        let db = client.database("customer_service").unwrap();
        drop(client);
        let err = db.collection("customers").count_documents().unwrap_err();
        assert!(matches!(err, Error::DbIsClosed));
    }
}
