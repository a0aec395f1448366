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

use hashbrown::HashSet;
use indexmap::IndexMap;
use crate::{Error, IndexDeclaration, Result};
use crate::errors::{
    ConflictingDeclarationsError,
    InvalidDeclarationError,
    MigrationOrderError,
};
use crate::filter::Predicate;
use crate::index::normalize_keys;
use crate::utils::bson::documents_equivalent;

const ILLEGAL_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

fn invalid(decl: &IndexDeclaration, reason: impl Into<String>) -> Error {
    InvalidDeclarationError {
        id: decl.id,
        ns: decl.namespace(),
        reason: reason.into(),
    }.into()
}

pub(crate) fn validate_declaration(decl: &IndexDeclaration) -> Result<()> {
    if decl.database.is_empty() || decl.database.contains(ILLEGAL_DATABASE_CHARS) {
        return Err(invalid(decl, format!("database name '{}' is illegal", decl.database)));
    }
    if decl.collection.is_empty() || decl.collection.contains('$') {
        return Err(invalid(decl, format!("collection name '{}' is illegal", decl.collection)));
    }
    if let Err(err) = normalize_keys(&decl.keys) {
        return Err(invalid(decl, err.to_string()));
    }
    if let Some(filter) = &decl.partial_filter_expression {
        if let Err(err) = Predicate::compile(filter) {
            return Err(invalid(decl, err.to_string()));
        }
    }
    if let Some(name) = &decl.name {
        if name.is_empty() || name == "_id_" {
            return Err(invalid(decl, format!("index name '{}' is illegal", name)));
        }
    }
    Ok(())
}

/// Checks one database's declarations as a whole: each must be well
/// formed, ids must increase, and no two may claim the same constraint
/// space on a collection.
pub(crate) fn validate_database(database: &str, decls: &[&IndexDeclaration]) -> Result<()> {
    let mut error: Option<Error> = None;
    let mut push = |err: Error| {
        error = Some(match error.take() {
            Some(current) => current.add(err),
            None => err,
        });
    };

    for decl in decls {
        if let Err(err) = validate_declaration(decl) {
            push(err);
        }
    }

    let mut seen = HashSet::new();
    let mut previous: Option<u32> = None;
    for decl in decls {
        if !seen.insert(decl.id) {
            push(Error::DuplicateMigrationId(Box::new(MigrationOrderError {
                database: database.to_string(),
                previous: decl.id,
                current: decl.id,
            })));
        } else if let Some(prev) = previous {
            if decl.id < prev {
                push(Error::MigrationOrder(Box::new(MigrationOrderError {
                    database: database.to_string(),
                    previous: prev,
                    current: decl.id,
                })));
            }
        }
        previous = Some(decl.id);
    }

    for (i, a) in decls.iter().enumerate() {
        for b in decls.iter().skip(i + 1) {
            if a.collection != b.collection {
                continue;
            }
            if let Some(reason) = conflict_between(a, b) {
                push(ConflictingDeclarationsError {
                    ns: a.namespace(),
                    first: a.id,
                    second: b.id,
                    reason,
                }.into());
            }
        }
    }

    match error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn conflict_between(a: &IndexDeclaration, b: &IndexDeclaration) -> Option<String> {
    let (a_keys, b_keys) = match (normalize_keys(&a.keys), normalize_keys(&b.keys)) {
        (Ok(a_keys), Ok(b_keys)) => (a_keys, b_keys),
        // reported by validate_declaration
        _ => return None,
    };

    if a_keys.keys().eq(b_keys.keys()) {
        return Some(format!("both declare key {}", a.keys));
    }

    if let (Ok(a_name), Ok(b_name)) = (a.index_name(), b.index_name()) {
        if a_name == b_name {
            return Some(format!("both declare an index named '{}'", a_name));
        }
    }

    if !(a.unique && b.unique) || !same_filter(a, b) {
        return None;
    }

    let (narrow, wide) = if is_subset_of(&a_keys, &b_keys) {
        (a, b)
    } else if is_subset_of(&b_keys, &a_keys) {
        (b, a)
    } else {
        return None;
    };

    Some(format!(
        "unique key {} makes unique key {} redundant; keep exactly one of them",
        narrow.keys, wide.keys,
    ))
}

fn same_filter(a: &IndexDeclaration, b: &IndexDeclaration) -> bool {
    match (&a.partial_filter_expression, &b.partial_filter_expression) {
        (None, None) => true,
        (Some(a), Some(b)) => documents_equivalent(a, b),
        _ => false,
    }
}

fn is_subset_of(a: &IndexMap<String, i8>, b: &IndexMap<String, i8>) -> bool {
    a.len() < b.len() && a.keys().all(|key| b.contains_key(key))
}
