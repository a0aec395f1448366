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
use crate::Result;
use crate::errors::DuplicateKeyError;
use crate::index::{IndexEntries, IndexHelperOperation, IndexInfo};

/// Builds the entries of a new index over the documents already stored
/// in a collection.
pub(crate) struct IndexBuilder<'a, 'b> {
    ns: &'a str,
    index_info: &'b IndexInfo,
}

impl<'a, 'b> IndexBuilder<'a, 'b> {

    #[inline]
    pub fn new(ns: &'a str, index_info: &'b IndexInfo) -> IndexBuilder<'a, 'b> {
        IndexBuilder {
            ns,
            index_info,
        }
    }

    /// Fails on the first pair of covered documents that collide on a
    /// unique index; nothing is built in that case.
    pub fn execute<'d, I>(&self, docs: I) -> Result<IndexEntries>
    where
        I: IntoIterator<Item = (&'d Vec<u8>, &'d Document)>,
    {
        let mut entries = IndexEntries::default();

        for (pkey, doc) in docs {
            let key = match self.index_info.index_key(doc)? {
                Some(key) => key,
                None => continue,
            };

            if self.index_info.is_unique() && entries.is_taken_by_other(&key, pkey) {
                return Err(crate::Error::UniquenessViolationOnCreate(Box::new(DuplicateKeyError {
                    name: self.index_info.name.clone(),
                    key: self.index_info.display_key(&key),
                    ns: self.ns.to_string(),
                })));
            }

            entries.execute(IndexHelperOperation::Insert, &key, pkey);
        }

        Ok(entries)
    }

}
