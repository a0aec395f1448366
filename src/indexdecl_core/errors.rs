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

use bson::ser::Error as BsonErr;
use bson::Document;
use std::fmt;
use std::io;
use std::sync::PoisonError;
use thiserror::Error;

#[derive(Debug)]
pub struct BtWrapper<T> {
    pub source: T,
    pub backtrace: std::backtrace::Backtrace,
}

#[derive(Debug)]
pub struct DuplicateKeyError {
    pub name: String, // index name
    pub key: String,  // offending key value
    pub ns: String,   // database.collection
}

#[derive(Debug)]
pub struct ConflictingIndexError {
    pub ns: String,
    pub name: String,
    pub keys: Document,
    pub reason: String,
}

#[derive(Debug)]
pub struct ConflictingDeclarationsError {
    pub ns: String,
    pub first: u32,
    pub second: u32,
    pub reason: String,
}

#[derive(Debug)]
pub struct InvalidDeclarationError {
    pub id: u32,
    pub ns: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct MigrationOrderError {
    pub database: String,
    pub previous: u32,
    pub current: u32,
}

impl fmt::Display for MigrationOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.previous == self.current {
            write!(
                f,
                "migration id {} is declared more than once in database '{}'",
                self.current, self.database
            )
        } else {
            write!(
                f,
                "migration id {} follows {} in database '{}', ids must increase",
                self.current, self.previous, self.database
            )
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("conflicting index definition on {}, index: {}, key: {}: {}", .0.ns, .0.name, .0.keys, .0.reason)]
    ConflictingIndexDefinition(Box<ConflictingIndexError>),
    #[error("existing documents violate unique index on {}, index: {}, key: {}", .0.ns, .0.name, .0.key)]
    UniquenessViolationOnCreate(Box<DuplicateKeyError>),
    #[error("duplicate key error collection: {}, index: {}, key: {}", .0.ns, .0.name, .0.key)]
    DuplicateKey(Box<DuplicateKeyError>),
    #[error("connection failure: {0}")]
    ConnectionFailure(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("conflicting declarations {} and {} on {}: {}", .0.first, .0.second, .0.ns, .0.reason)]
    ConflictingDeclarations(Box<ConflictingDeclarationsError>),
    #[error("{0}")]
    DuplicateMigrationId(Box<MigrationOrderError>),
    #[error("{0}")]
    MigrationOrder(Box<MigrationOrderError>),
    #[error("invalid declaration {} on {}: {}", .0.id, .0.ns, .0.reason)]
    InvalidDeclaration(Box<InvalidDeclarationError>),
    #[error("invalid order of index: {0}")]
    InvalidOrderOfIndex(String),
    #[error("index key pattern must not be empty")]
    EmptyKeyPattern,
    #[error("index '{0}' not found")]
    IndexNotFound(String),
    #[error("database name '{0}' is illegal")]
    IllegalDatabaseName(String),
    #[error("collection name '{0}' is illegal")]
    IllegalCollectionName(String),
    #[error("unsupported filter operator: '{0}'")]
    UnsupportedFilterOperator(String),
    #[error("unknown update operation: '{0}'")]
    UnknownUpdateOperation(String),
    #[error("it's illegal to update '_id' field")]
    UnableToUpdatePrimaryKey,
    #[error("item with primary key exists, key: '{0}'")]
    DataExist(String),
    #[error("type '{0}' is not a valid key type")]
    NotAValidKeyType(String),
    #[error("database '{0}' is not part of the manifest")]
    UnknownDatabase(String),
    #[error("manifest parse error: {0}")]
    ManifestParse(Box<serde_json::Error>),
    #[error("io error: {}, backtrace: {}", .0.source, .0.backtrace)]
    IOErr(Box<BtWrapper<io::Error>>),
    #[error("bson error: {}, backtrace: {}", .0.source, .0.backtrace)]
    BsonErr(Box<BtWrapper<BsonErr>>),
    #[error("the database is closed")]
    DbIsClosed,
    #[error("the mutex is poisoned")]
    LockError,
    #[error("multiple errors: {}", display_multiple(.0))]
    Multiple(Vec<Error>),
}

fn display_multiple(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("; ")
}

impl Error {
    pub(crate) fn add(self, next: Error) -> Error {
        match self {
            Error::Multiple(mut result) => {
                result.push(next);
                Error::Multiple(result)
            }
            _ => {
                let result = vec![self, next];
                Error::Multiple(result)
            }
        }
    }

    /// Flattens an aggregated error into its parts.
    pub fn into_vec(self) -> Vec<Error> {
        match self {
            Error::Multiple(errors) => errors,
            other => vec![other],
        }
    }

    /// True for failures that stem from the state of the target database
    /// rather than from the declarations themselves.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Error::UniquenessViolationOnCreate(_) | Error::DuplicateKey(_)
        )
    }
}

impl From<BsonErr> for Error {
    fn from(error: BsonErr) -> Self {
        Error::BsonErr(Box::new(BtWrapper {
            source: error,
            backtrace: std::backtrace::Backtrace::capture(),
        }))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::ManifestParse(Box::new(error))
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::LockError
    }
}

impl From<ConflictingIndexError> for Error {
    fn from(value: ConflictingIndexError) -> Self {
        Error::ConflictingIndexDefinition(Box::new(value))
    }
}

impl From<ConflictingDeclarationsError> for Error {
    fn from(value: ConflictingDeclarationsError) -> Self {
        Error::ConflictingDeclarations(Box::new(value))
    }
}

impl From<InvalidDeclarationError> for Error {
    fn from(value: InvalidDeclarationError) -> Self {
        Error::InvalidDeclaration(Box::new(value))
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::IOErr(Box::new(BtWrapper {
            source: value,
            backtrace: std::backtrace::Backtrace::capture(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DuplicateKeyError, MigrationOrderError};
    use crate::Error;

    #[test]
    fn print_value_size() {
        let size = std::mem::size_of::<Error>();
        assert!(size <= 32);
    }

    #[test]
    fn test_add_flattens() {
        let err = Error::EmptyKeyPattern
            .add(Error::LockError)
            .add(Error::DbIsClosed);
        let parts = err.into_vec();
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_duplicate_key_message() {
        let err = Error::UniquenessViolationOnCreate(Box::new(DuplicateKeyError {
            name: "email_1".to_string(),
            key: "{ \"email\": \"a@x.com\" }".to_string(),
            ns: "authentication_service.customers".to_string(),
        }));
        assert!(err.is_data_integrity());
        assert_eq!(
            err.to_string(),
            "existing documents violate unique index on authentication_service.customers, index: email_1, key: { \"email\": \"a@x.com\" }",
        );
    }

    #[test]
    fn test_migration_order_message() {
        let err = Error::DuplicateMigrationId(Box::new(MigrationOrderError {
            database: "authentication_service".to_string(),
            previous: 3,
            current: 3,
        }));
        assert!(err.to_string().contains("declared more than once"));
    }
}
