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

//! Partial-unique index declarations for document databases.
//!
//! Each service owns one logical database whose collections carry
//! uniqueness constraints limited to active records (`{ active: true }`).
//! This crate keeps those constraints as data and converges databases onto
//! them.
//!
//! # Usage
//!
//! [Manifest]: ./struct.Manifest.html
//! [Applier]: ./struct.Applier.html
//!
//! A [Manifest] lists the declarations, each with an explicit migration id.
//! [Manifest::plan] validates one database and returns its declarations in
//! order, and an [Applier] ensures each declared index exists on anything
//! implementing [DatabaseHandle].
//!
//! ```rust
//! use indexdecl_core::{builtin_manifest, Applier, MemoryClient};
//!
//! let manifest = builtin_manifest().unwrap();
//! let plan = manifest.plan("customer_service").unwrap();
//!
//! let client = MemoryClient::new();
//! let report = Applier::default().apply_with(&client, &plan).unwrap();
//! assert_eq!(report.declarations.len(), 1);
//! ```
//!

mod errors;
mod filter;
mod utils;
mod index;
mod declaration;
mod handle;
mod applier;
mod memory;
mod options;
mod results;

pub use bson;

pub use errors::{
    Error,
    BtWrapper,
    ConflictingDeclarationsError,
    ConflictingIndexError,
    DuplicateKeyError,
    InvalidDeclarationError,
    MigrationOrderError,
};
pub use index::{IndexModel, IndexOptions, IndexOptionsBuilder};
pub use declaration::{builtin_manifest, DatabasePlan, IndexDeclaration, Manifest};
pub use handle::{Connector, DatabaseHandle};
pub use applier::Applier;
pub use memory::{MemoryClient, MemoryCollection, MemoryDatabase};
pub use options::{ApplyOptions, ApplyOptionsBuilder};
pub use results::{
    ApplyReport,
    DeclarationReport,
    DeleteResult,
    IndexOutcome,
    InsertOneResult,
    UpdateResult,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Return the version of package version in string.
/// Defined in `Cargo.toml`.
pub fn get_version() -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    VERSION.into()
}
