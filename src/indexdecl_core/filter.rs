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

//! Predicates for partial filter expressions and simple equality queries.
//!
//! Only the operators a partial index needs are understood: plain field
//! equality (dotted paths allowed), `$eq`, `$exists` and `$and`.

use bson::{Bson, Document};
use crate::{Error, Result};
use crate::utils::bson::{try_get_document_value, values_equivalent};

#[derive(Debug, Clone)]
pub(crate) enum Predicate {
    And(Vec<Predicate>),
    Eq(String, Bson),
    Exists(String, bool),
}

impl Predicate {

    pub(crate) fn compile(filter: &Document) -> Result<Predicate> {
        let mut parts = Vec::with_capacity(filter.len());

        for (key, value) in filter {
            if key == "$and" {
                let items = match value {
                    Bson::Array(items) => items,
                    _ => return Err(Error::UnsupportedFilterOperator(format!("$and: {}", value))),
                };
                for item in items {
                    match item {
                        Bson::Document(sub) => parts.push(Predicate::compile(sub)?),
                        _ => return Err(Error::UnsupportedFilterOperator(format!("$and: {}", item))),
                    }
                }
            } else if key.starts_with('$') {
                return Err(Error::UnsupportedFilterOperator(key.clone()));
            } else {
                Predicate::compile_field(key, value, &mut parts)?;
            }
        }

        Ok(Predicate::And(parts))
    }

    fn compile_field(key: &str, value: &Bson, parts: &mut Vec<Predicate>) -> Result<()> {
        let ops = match value {
            Bson::Document(ops) if is_operator_doc(ops) => ops,
            _ => {
                parts.push(Predicate::Eq(key.to_string(), value.clone()));
                return Ok(());
            }
        };

        for (op, operand) in ops {
            match op.as_str() {
                "$eq" => parts.push(Predicate::Eq(key.to_string(), operand.clone())),
                "$exists" => parts.push(Predicate::Exists(key.to_string(), truthy(operand))),
                _ => return Err(Error::UnsupportedFilterOperator(op.clone())),
            }
        }

        Ok(())
    }

    pub(crate) fn matches(&self, doc: &Document) -> bool {
        match self {
            Predicate::And(parts) => parts.iter().all(|p| p.matches(doc)),
            Predicate::Eq(path, expected) => match try_get_document_value(doc, path) {
                Some(actual) => values_equivalent(&actual, expected),
                None => matches!(expected, Bson::Null),
            },
            Predicate::Exists(path, wanted) => {
                try_get_document_value(doc, path).is_some() == *wanted
            }
        }
    }

}

fn is_operator_doc(doc: &Document) -> bool {
    doc.keys().next().map_or(false, |k| k.starts_with('$'))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use super::Predicate;

    #[test]
    fn test_active_filter() {
        let p = Predicate::compile(&doc! { "active": true }).unwrap();
        assert!(p.matches(&doc! { "email": "a@x.com", "active": true }));
        assert!(!p.matches(&doc! { "email": "a@x.com", "active": false }));
        assert!(!p.matches(&doc! { "email": "a@x.com" }));
        assert!(!p.matches(&doc! { "active": 1 }));
    }

    #[test]
    fn test_operators() {
        let p = Predicate::compile(&doc! {
            "$and": [
                { "profile.kind": { "$eq": "staff" } },
                { "deleted_at": { "$exists": false } },
            ]
        }).unwrap();
        assert!(p.matches(&doc! { "profile": { "kind": "staff" } }));
        assert!(!p.matches(&doc! { "profile": { "kind": "staff" }, "deleted_at": 1 }));
        assert!(!p.matches(&doc! { "profile": { "kind": "customer" } }));
    }

    #[test]
    fn test_null_matches_missing() {
        let p = Predicate::compile(&doc! { "vat_code": null }).unwrap();
        assert!(p.matches(&doc! {}));
    }

    #[test]
    fn test_unsupported_operator() {
        let err = Predicate::compile(&doc! { "age": { "$gt": 3 } }).unwrap_err();
        assert!(err.to_string().contains("$gt"));

        let err = Predicate::compile(&doc! { "$or": [] }).unwrap_err();
        assert!(err.to_string().contains("$or"));
    }
}
