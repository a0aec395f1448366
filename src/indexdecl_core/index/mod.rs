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

mod index_helper;
mod index_model;
mod index_builder;

pub(crate) use index_helper::{
    describe_difference,
    normalize_keys,
    same_key_pattern,
    IndexEntries,
    IndexHelperOperation,
    IndexInfo,
    IndexKey,
};
pub(crate) use index_builder::IndexBuilder;
pub use index_model::{IndexModel, IndexOptions, IndexOptionsBuilder};
