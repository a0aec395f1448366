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

use bson::Bson;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    /// The `_id` field of the document inserted.
    pub inserted_id: Bson,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// The number of documents that matched the query.
    #[serde(serialize_with = "bson::serde_helpers::serialize_u64_as_i64")]
    pub matched_count: u64,

    /// The number of documents that were modified by the operation.
    #[serde(serialize_with = "bson::serde_helpers::serialize_u64_as_i64")]
    pub modified_count: u64,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// The number of documents deleted by the operation.
    #[serde(serialize_with = "bson::serde_helpers::serialize_u64_as_i64")]
    pub deleted_count: u64,
}

/// What converging one declaration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexOutcome {
    Created,
    /// An identical index was already present.
    Unchanged,
    /// Dry run: the index is missing and would be created.
    WouldCreate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationReport {
    pub id: u32,
    pub collection: String,
    pub index_name: String,
    pub outcome: IndexOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub database: String,
    pub declarations: Vec<DeclarationReport>,
}

impl ApplyReport {

    pub fn new(database: &str) -> ApplyReport {
        ApplyReport {
            database: database.to_string(),
            declarations: vec![],
        }
    }

    pub fn count(&self, outcome: IndexOutcome) -> usize {
        self.declarations
            .iter()
            .filter(|report| report.outcome == outcome)
            .count()
    }

}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::results::{ApplyReport, DeclarationReport, IndexOutcome, UpdateResult};

    #[test]
    fn test_serde_update_result() {
        let result = UpdateResult { matched_count: 1, modified_count: 0 };
        let doc = bson::to_document(&result).unwrap();
        assert_eq!(doc, doc! { "matchedCount": 1i64, "modifiedCount": 0i64 });
    }

    #[test]
    fn test_serde_apply_report() {
        let report = ApplyReport {
            database: "customer_service".to_string(),
            declarations: vec![DeclarationReport {
                id: 1,
                collection: "customers".to_string(),
                index_name: "email_1".to_string(),
                outcome: IndexOutcome::WouldCreate,
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"database":"customer_service","declarations":[{"id":1,"collection":"customers","indexName":"email_1","outcome":"wouldCreate"}]}"#,
        );
        assert_eq!(report.count(IndexOutcome::WouldCreate), 1);
        assert_eq!(report.count(IndexOutcome::Created), 0);
    }
}
