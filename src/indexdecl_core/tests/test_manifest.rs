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

use std::fs;
use std::path::PathBuf;
use indexdecl_core::bson::doc;
use indexdecl_core::{builtin_manifest, Applier, Error, Manifest, MemoryClient};
use crate::common::declaration;

mod common;

fn mk_manifest_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("{}.json", name));
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn test_from_path() {
    let path = mk_manifest_path("test-manifest-from-path");
    let manifest = builtin_manifest().unwrap();
    fs::write(&path, manifest.to_json().unwrap()).unwrap();

    let loaded = Manifest::from_path(&path).unwrap();
    assert_eq!(loaded.declarations, manifest.declarations);
    assert_eq!(
        loaded.databases(),
        vec!["authentication_service", "customer_service", "restaurant_service"],
    );

    let _ = fs::remove_file(&path);
}

#[test]
fn test_from_path_missing_file() {
    let path = mk_manifest_path("test-manifest-missing");
    let err = Manifest::from_path(&path).unwrap_err();
    assert!(matches!(err, Error::IOErr(_)));
}

#[test]
fn test_malformed_manifest() {
    let err = Manifest::from_json(r#"{ "declarations": [ { "id": "one" } ] }"#).unwrap_err();
    assert!(matches!(err, Error::ManifestParse(_)));
}

#[test]
fn test_minimal_declaration_defaults() {
    let manifest = Manifest::from_json(r#"{
        "declarations": [
            { "id": 1, "database": "audit_service", "collection": "events", "key": { "at": 1 } }
        ]
    }"#).unwrap();

    let decl = &manifest.declarations[0];
    assert!(!decl.unique);
    assert!(decl.partial_filter_expression.is_none());
    assert_eq!(decl.index_name().unwrap(), "at_1");
    manifest.validate().unwrap();
}

#[test]
fn test_builtin_validate_reports_staff_only() {
    let manifest = builtin_manifest().unwrap();
    let errors = manifest.validate().unwrap_err().into_vec();
    assert_eq!(errors.len(), 1);

    match &errors[0] {
        Error::ConflictingDeclarations(inner) => {
            assert_eq!(inner.ns, "authentication_service.staff");
            assert_eq!(inner.first, 3);
            assert_eq!(inner.second, 4);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_databases_are_independent() {
    let manifest = builtin_manifest().unwrap();
    let client = MemoryClient::new();
    let applier = Applier::default();

    let mut applied = vec![];
    let mut failed = vec![];
    for (database, plan) in manifest.plans() {
        match plan.and_then(|plan| applier.apply_with(&client, &plan)) {
            Ok(_) => applied.push(database),
            Err(_) => failed.push(database),
        }
    }

    assert_eq!(applied, vec!["customer_service", "restaurant_service"]);
    assert_eq!(failed, vec!["authentication_service"]);
}

#[test]
fn test_dropping_one_staff_declaration_resolves_conflict() {
    let mut manifest = builtin_manifest().unwrap();
    manifest.declarations.retain(|decl| !(decl.database == "authentication_service" && decl.id == 4));
    manifest.validate().unwrap();

    let plan = manifest.plan("authentication_service").unwrap();
    let ids = plan.declarations.iter().map(|decl| decl.id).collect::<Vec<u32>>();
    assert_eq!(ids, vec![1, 3]);

    let client = MemoryClient::new();
    let report = Applier::default().apply_with(&client, &plan).unwrap();
    assert_eq!(report.declarations.len(), 2);

    let staff = client.database("authentication_service").unwrap().collection("staff");
    staff.insert_one(doc! { "email": "s@x.com", "restaurant_id": "r1", "active": true }).unwrap();
    staff.insert_one(doc! { "email": "s@x.com", "restaurant_id": "r2", "active": true }).unwrap();
}

#[test]
fn test_ids_must_increase() {
    let manifest = Manifest {
        declarations: vec![
            declaration(7, "order_service", "orders", doc! { "number": 1 }),
            declaration(2, "order_service", "carts", doc! { "customer_id": 1 }),
        ],
    };
    let err = manifest.plan("order_service").unwrap_err();
    assert!(matches!(err, Error::MigrationOrder(_)));
    assert!(err.to_string().contains("ids must increase"));

    // gaps are fine
    let manifest = Manifest {
        declarations: vec![
            declaration(2, "order_service", "carts", doc! { "customer_id": 1 }),
            declaration(7, "order_service", "orders", doc! { "number": 1 }),
        ],
    };
    let plan = manifest.plan("order_service").unwrap();
    assert_eq!(plan.declarations[1].id, 7);
}

#[test]
fn test_duplicate_ids_rejected() {
    let manifest = Manifest {
        declarations: vec![
            declaration(2, "order_service", "orders", doc! { "number": 1 }),
            declaration(2, "order_service", "carts", doc! { "customer_id": 1 }),
        ],
    };
    let errors = manifest.plan("order_service").unwrap_err().into_vec();
    assert!(errors.iter().any(|e| matches!(e, Error::DuplicateMigrationId(_))));
}

#[test]
fn test_unknown_database() {
    let manifest = builtin_manifest().unwrap();
    let err = manifest.plan("billing_service").unwrap_err();
    assert!(matches!(err, Error::UnknownDatabase(_)));
}
