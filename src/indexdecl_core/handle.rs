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

use crate::{IndexModel, Result};

/// A logical database the applier can converge.
///
/// Implemented by the in-memory engine and by the MongoDB handle of the
/// command-line tool.
pub trait DatabaseHandle {

    fn name(&self) -> &str;

    /// Indexes currently defined on `collection`, names filled in.
    /// A collection that does not exist yet has none.
    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>>;

    /// Creates the index and returns its name. Creating an identical
    /// index again is not an error.
    fn create_index(&self, collection: &str, index: IndexModel) -> Result<String>;

}

/// Selects (and lazily creates) a logical database by name.
pub trait Connector: Send + Sync {

    fn open_database<'a>(&'a self, name: &str) -> Result<Box<dyn DatabaseHandle + 'a>>;

}
