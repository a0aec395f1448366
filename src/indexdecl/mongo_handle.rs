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

use bson::Document;
use log::debug;
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, Credential};
use mongodb::sync::{Client, Collection, Database};
use indexdecl_core::{
    ConflictingIndexError,
    Connector,
    DatabaseHandle,
    DuplicateKeyError,
    Error,
    IndexModel,
    IndexOptions,
    Result,
};
use crate::config::Config;

const NAMESPACE_NOT_FOUND: i32 = 26;
const INDEX_OPTIONS_CONFLICT: i32 = 85;
const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
const DUPLICATE_KEY: i32 = 11000;

/// Opens databases on a MongoDB deployment.
pub struct MongoConnector {
    client: Client,
}

impl MongoConnector {

    pub fn connect(uri: &str, config: &Config) -> Result<MongoConnector> {
        let mut options = ClientOptions::parse(uri)
            .run()
            .map_err(|err| map_mongo_error(err, None))?;
        if let Some((user, pwd)) = config.credentials() {
            options.credential = Some(
                Credential::builder()
                    .username(user.to_string())
                    .password(pwd.to_string())
                    .build()
            );
        }
        options.app_name = Some("indexdecl".to_string());

        let client = Client::with_options(options).map_err(|err| map_mongo_error(err, None))?;
        Ok(MongoConnector { client })
    }

}

impl Connector for MongoConnector {

    fn open_database<'a>(&'a self, name: &str) -> Result<Box<dyn DatabaseHandle + 'a>> {
        Ok(Box::new(MongoDatabase {
            db: self.client.database(name),
            name: name.to_string(),
        }))
    }

}

pub struct MongoDatabase {
    db: Database,
    name: String,
}

impl MongoDatabase {

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

}

impl DatabaseHandle for MongoDatabase {

    fn name(&self) -> &str {
        &self.name
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>> {
        let cursor = match self.collection(collection).list_indexes().run() {
            Ok(cursor) => cursor,
            Err(err) if command_code(&err) == Some(NAMESPACE_NOT_FOUND) => {
                debug!("collection {}.{} does not exist yet", self.name, collection);
                return Ok(vec![]);
            }
            Err(err) => return Err(map_mongo_error(err, None)),
        };

        let mut result = vec![];
        for model in cursor {
            let model = model.map_err(|err| map_mongo_error(err, None))?;
            result.push(from_mongo_model(model));
        }
        Ok(result)
    }

    fn create_index(&self, collection: &str, index: IndexModel) -> Result<String> {
        let target = IndexTarget {
            ns: format!("{}.{}", self.name, collection),
            name: index.name()?,
            keys: index.keys.clone(),
        };
        let created = self.collection(collection)
            .create_index(to_mongo_model(&index))
            .run()
            .map_err(|err| map_mongo_error(err, Some(&target)))?;
        Ok(created.index_name)
    }

}

/// The index a failed command was about.
pub(crate) struct IndexTarget {
    pub ns: String,
    pub name: String,
    pub keys: Document,
}

fn command_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => Some(cmd.code),
        _ => None,
    }
}

pub(crate) fn map_mongo_error(err: MongoError, target: Option<&IndexTarget>) -> Error {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => map_command_error(cmd.code, &cmd.message, target),
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            Error::ConnectionFailure(err.to_string())
        }
        _ => Error::Backend(err.to_string()),
    }
}

pub(crate) fn map_command_error(code: i32, message: &str, target: Option<&IndexTarget>) -> Error {
    match (code, target) {
        (INDEX_OPTIONS_CONFLICT | INDEX_KEY_SPECS_CONFLICT, Some(target)) => {
            ConflictingIndexError {
                ns: target.ns.clone(),
                name: target.name.clone(),
                keys: target.keys.clone(),
                reason: message.to_string(),
            }.into()
        }
        (DUPLICATE_KEY, Some(target)) => {
            Error::UniquenessViolationOnCreate(Box::new(DuplicateKeyError {
                name: target.name.clone(),
                key: duplicate_key_of(message),
                ns: target.ns.clone(),
            }))
        }
        _ => Error::Backend(format!("command failed with code {}: {}", code, message)),
    }
}

/// Pulls the `dup key: { ... }` part out of a server message.
fn duplicate_key_of(message: &str) -> String {
    match message.find("dup key: ") {
        Some(pos) => message[pos + "dup key: ".len()..].trim().to_string(),
        None => message.to_string(),
    }
}

pub(crate) fn to_mongo_model(index: &IndexModel) -> mongodb::IndexModel {
    let mut options = mongodb::options::IndexOptions::default();
    if let Some(ours) = &index.options {
        options.name = ours.name.clone();
        options.unique = ours.unique;
        options.partial_filter_expression = ours.partial_filter_expression.clone();
    }
    mongodb::IndexModel::builder()
        .keys(index.keys.clone())
        .options(options)
        .build()
}

pub(crate) fn from_mongo_model(model: mongodb::IndexModel) -> IndexModel {
    let options = model.options.map(|options| IndexOptions {
        name: options.name,
        unique: options.unique,
        partial_filter_expression: options.partial_filter_expression,
    });
    IndexModel::new(model.keys, options)
}
