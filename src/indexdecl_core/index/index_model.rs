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
use serde::{Deserialize, Serialize};
use crate::Result;
use crate::index::index_helper::{default_index_name, normalize_keys};

/// An index as the server describes it: the key pattern plus options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexModel {
    #[serde(rename = "key")]
    pub keys: Document,

    /// The options for the index.
    #[serde(flatten)]
    pub options: Option<IndexOptions>,
}

impl IndexModel {

    pub fn new(keys: Document, options: impl Into<Option<IndexOptions>>) -> IndexModel {
        IndexModel {
            keys,
            options: options.into(),
        }
    }

    /// The explicit name, or the name the server would generate
    /// (`email_1_restaurant_id_1`).
    pub fn name(&self) -> Result<String> {
        if let Some(name) = self.options.as_ref().and_then(|o| o.name.as_ref()) {
            return Ok(name.clone());
        }
        let keys = normalize_keys(&self.keys)?;
        Ok(default_index_name(&keys))
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|options| options.unique)
            .unwrap_or(false)
    }

    #[inline]
    pub fn partial_filter_expression(&self) -> Option<&Document> {
        self.options
            .as_ref()
            .and_then(|options| options.partial_filter_expression.as_ref())
    }

}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {

    /// Specifies a name outside the default generated name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Forces the index to be unique so the collection will not accept documents where the index
    /// key value matches an existing value in the index. The default value is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,

    /// Restricts the index to the documents matching this filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_filter_expression: Option<Document>,

}

impl IndexOptions {
    pub fn builder() -> IndexOptionsBuilder {
        IndexOptionsBuilder::default()
    }
}

#[derive(Default)]
pub struct IndexOptionsBuilder {
    name: Option<String>,
    unique: Option<bool>,
    partial_filter_expression: Option<Document>,
}

impl IndexOptionsBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn partial_filter_expression(mut self, filter: Document) -> Self {
        self.partial_filter_expression = Some(filter);
        self
    }

    pub fn build(self) -> IndexOptions {
        IndexOptions {
            name: self.name,
            unique: self.unique,
            partial_filter_expression: self.partial_filter_expression,
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use super::{IndexModel, IndexOptions};

    #[test]
    fn test_default_name() {
        let model = IndexModel::new(doc! { "email": 1, "restaurant_id": 1 }, None);
        assert_eq!(model.name().unwrap(), "email_1_restaurant_id_1");
        assert!(!model.is_unique());
    }

    #[test]
    fn test_explicit_name() {
        let model = IndexModel::new(
            doc! { "email": 1 },
            IndexOptions::builder().name("uniq_active_email").unique(true).build(),
        );
        assert_eq!(model.name().unwrap(), "uniq_active_email");
        assert!(model.is_unique());
    }

    #[test]
    fn test_serde_shape() {
        let model = IndexModel::new(
            doc! { "vat_code": 1 },
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! { "active": true })
                .build(),
        );
        let doc = bson::to_document(&model).unwrap();
        assert_eq!(doc, doc! {
            "key": { "vat_code": 1 },
            "unique": true,
            "partialFilterExpression": { "active": true },
        });
    }
}
