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

//! The declaration set shipped with the library.
//!
//! The two `staff` declarations of `authentication_service` (ids 3 and 4)
//! both claim uniqueness over `email`; that database is rejected at load
//! time until one of them is removed.

use crate::{Manifest, Result};

const BUILTIN_MANIFEST: &str = include_str!("builtin_manifest.json");

pub fn builtin_manifest() -> Result<Manifest> {
    Manifest::from_json(BUILTIN_MANIFEST)
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::Error;
    use super::builtin_manifest;

    #[test]
    fn test_builtin_declarations() {
        let manifest = builtin_manifest().unwrap();
        assert_eq!(manifest.declarations.len(), 5);
        assert_eq!(
            manifest.databases(),
            vec!["authentication_service", "customer_service", "restaurant_service"],
        );
        for decl in &manifest.declarations {
            assert!(decl.unique);
            assert_eq!(decl.partial_filter_expression, Some(doc! { "active": true }));
        }
    }

    #[test]
    fn test_builtin_plans() {
        let manifest = builtin_manifest().unwrap();

        let customer = manifest.plan("customer_service").unwrap();
        assert_eq!(customer.declarations.len(), 1);
        assert_eq!(customer.declarations[0].index_name().unwrap(), "email_1");

        let restaurant = manifest.plan("restaurant_service").unwrap();
        assert_eq!(restaurant.declarations[0].collection, "customers");
        assert_eq!(restaurant.declarations[0].index_name().unwrap(), "vat_code_1");

        let err = manifest.plan("authentication_service").unwrap_err();
        assert!(matches!(err, Error::ConflictingDeclarations(_)));
    }
}
