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

use std::path::Path;
use bson::Document;
use serde::{Deserialize, Serialize};
use crate::{Error, IndexModel, IndexOptions, Result};
use crate::declaration::validate::{validate_database, validate_declaration};

/// One index the system requires, addressed by database and collection.
///
/// The `id` orders declarations within a database and must be unique there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDeclaration {
    pub id: u32,

    pub database: String,

    pub collection: String,

    #[serde(rename = "key")]
    pub keys: Document,

    #[serde(default)]
    pub unique: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_filter_expression: Option<Document>,

    /// Overrides the generated index name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IndexDeclaration {

    pub fn index_model(&self) -> IndexModel {
        IndexModel::new(
            self.keys.clone(),
            IndexOptions {
                name: self.name.clone(),
                unique: Some(self.unique),
                partial_filter_expression: self.partial_filter_expression.clone(),
            },
        )
    }

    pub fn index_name(&self) -> Result<String> {
        self.index_model().name()
    }

    /// `database.collection`
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }

}

/// The declarations of a single database, validated and in id order.
#[derive(Debug, Clone)]
pub struct DatabasePlan {
    pub database: String,
    pub declarations: Vec<IndexDeclaration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub declarations: Vec<IndexDeclaration>,
}

impl Manifest {

    pub fn from_json(json: &str) -> Result<Manifest> {
        let manifest = serde_json::from_str::<Manifest>(json)?;
        Ok(manifest)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Manifest> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Manifest::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Database names in order of first appearance.
    pub fn databases(&self) -> Vec<&str> {
        let mut result: Vec<&str> = vec![];
        for decl in &self.declarations {
            if !result.contains(&decl.database.as_str()) {
                result.push(decl.database.as_str());
            }
        }
        result
    }

    fn declarations_of(&self, database: &str) -> Vec<&IndexDeclaration> {
        self.declarations
            .iter()
            .filter(|decl| decl.database == database)
            .collect()
    }

    /// Validates the declarations of `database` and returns them in id order.
    pub fn plan(&self, database: &str) -> Result<DatabasePlan> {
        let decls = self.declarations_of(database);
        if decls.is_empty() {
            return Err(Error::UnknownDatabase(database.to_string()));
        }

        validate_database(database, &decls)?;

        let mut declarations = decls.into_iter().cloned().collect::<Vec<IndexDeclaration>>();
        declarations.sort_by_key(|decl| decl.id);

        Ok(DatabasePlan {
            database: database.to_string(),
            declarations,
        })
    }

    /// One plan per database. A database that fails validation does not
    /// affect the others.
    pub fn plans(&self) -> Vec<(String, Result<DatabasePlan>)> {
        self.databases()
            .into_iter()
            .map(|database| (database.to_string(), self.plan(database)))
            .collect()
    }

    /// Validates every database, collecting all problems.
    pub fn validate(&self) -> Result<()> {
        let mut error: Option<Error> = None;

        for decl in &self.declarations {
            if decl.database.is_empty() {
                let err = validate_declaration(decl).err();
                error = merge(error, err);
            }
        }

        for database in self.databases() {
            if database.is_empty() {
                continue;
            }
            let err = validate_database(database, &self.declarations_of(database)).err();
            error = merge(error, err);
        }

        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

}

fn merge(current: Option<Error>, next: Option<Error>) -> Option<Error> {
    match (current, next) {
        (Some(current), Some(next)) => Some(current.add(next)),
        (None, next) => next,
        (current, None) => current,
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use super::Manifest;

    const SAMPLE: &str = r#"{
        "declarations": [
            {
                "id": 1,
                "database": "customer_service",
                "collection": "customers",
                "key": { "email": 1 },
                "unique": true,
                "partialFilterExpression": { "active": true }
            }
        ]
    }"#;

    #[test]
    fn test_parse() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        assert_eq!(manifest.declarations.len(), 1);

        let decl = &manifest.declarations[0];
        assert_eq!(decl.namespace(), "customer_service.customers");
        assert_eq!(decl.index_name().unwrap(), "email_1");
        assert_eq!(decl.partial_filter_expression, Some(doc! { "active": true }));

        let model = decl.index_model();
        assert!(model.is_unique());
    }

    #[test]
    fn test_parse_error() {
        let err = Manifest::from_json("{ \"declarations\": [ { \"id\": 1 } ] }").unwrap_err();
        assert!(err.to_string().starts_with("manifest parse error"));
    }

    #[test]
    fn test_json_round_trip_keeps_field_names() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"partialFilterExpression\""));
        assert!(json.contains("\"key\""));
        assert!(!json.contains("\"name\""));
    }

    #[test]
    fn test_unknown_database() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let err = manifest.plan("billing_service").unwrap_err();
        assert!(err.to_string().contains("billing_service"));
    }
}
