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

use indexdecl_core::bson::{doc, Bson, Document};
use indexdecl_core::{
    Applier,
    DatabasePlan,
    IndexDeclaration,
    IndexModel,
    IndexOptions,
    MemoryClient,
    Result,
};

#[allow(dead_code)]
pub fn active_unique(keys: Document) -> IndexModel {
    IndexModel::new(
        keys,
        IndexOptions::builder()
            .unique(true)
            .partial_filter_expression(doc! { "active": true })
            .build(),
    )
}

#[allow(dead_code)]
pub fn declaration(id: u32, database: &str, collection: &str, keys: Document) -> IndexDeclaration {
    IndexDeclaration {
        id,
        database: database.to_string(),
        collection: collection.to_string(),
        keys,
        unique: true,
        partial_filter_expression: Some(doc! { "active": true }),
        name: None,
    }
}

#[allow(dead_code)]
pub fn single_plan(decl: &IndexDeclaration) -> DatabasePlan {
    DatabasePlan {
        database: decl.database.clone(),
        declarations: vec![decl.clone()],
    }
}

/// A client with the given declarations already applied.
#[allow(dead_code)]
pub fn prepare_client(decls: &[IndexDeclaration]) -> Result<MemoryClient> {
    let client = MemoryClient::new();
    let applier = Applier::default();
    for decl in decls {
        applier.apply_with(&client, &single_plan(decl))?;
    }
    Ok(client)
}

/// A document holding `value` in every key field of `decl`.
#[allow(dead_code)]
pub fn doc_for(decl: &IndexDeclaration, value: &str, active: bool) -> Document {
    let mut doc = Document::new();
    for key in decl.keys.keys() {
        doc.insert(key.clone(), Bson::String(value.to_string()));
    }
    doc.insert("active", active);
    doc
}
