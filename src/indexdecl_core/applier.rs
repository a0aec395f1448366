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

use log::{debug, error, info};
use crate::{
    ApplyOptions,
    ApplyReport,
    Connector,
    DatabaseHandle,
    DatabasePlan,
    DeclarationReport,
    IndexDeclaration,
    IndexOutcome,
    Result,
};
use crate::errors::ConflictingIndexError;
use crate::index::{describe_difference, same_key_pattern};

/// Converges a database onto its declared indexes.
///
/// Declarations are handled one at a time in id order. The first failure
/// ends the run for that database and is returned unchanged; indexes
/// created before it are kept.
pub struct Applier {
    options: ApplyOptions,
}

impl Applier {

    pub fn new(options: ApplyOptions) -> Applier {
        Applier { options }
    }

    pub fn apply_with(&self, connector: &dyn Connector, plan: &DatabasePlan) -> Result<ApplyReport> {
        let mut report = ApplyReport::new(&plan.database);
        self.apply_with_into(connector, plan, &mut report)?;
        Ok(report)
    }

    pub fn apply(&self, handle: &dyn DatabaseHandle, plan: &DatabasePlan) -> Result<ApplyReport> {
        let mut report = ApplyReport::new(handle.name());
        self.apply_into(handle, plan, &mut report)?;
        Ok(report)
    }

    /// Like [`Applier::apply_with`], but records into `report` so the
    /// outcomes reached before a failure are kept.
    pub fn apply_with_into(&self, connector: &dyn Connector, plan: &DatabasePlan, report: &mut ApplyReport) -> Result<()> {
        let handle = connector.open_database(&plan.database)?;
        self.apply_into(handle.as_ref(), plan, report)
    }

    pub fn apply_into(&self, handle: &dyn DatabaseHandle, plan: &DatabasePlan, report: &mut ApplyReport) -> Result<()> {
        for decl in &plan.declarations {
            let outcome = match self.ensure_index(handle, decl) {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(
                        "declaration {} on {}.{} failed after {} created: {}",
                        decl.id,
                        handle.name(),
                        decl.collection,
                        report.count(IndexOutcome::Created),
                        err,
                    );
                    return Err(err);
                }
            };

            report.declarations.push(DeclarationReport {
                id: decl.id,
                collection: decl.collection.clone(),
                index_name: decl.index_name()?,
                outcome,
            });
        }

        info!(
            "database {}: {} created, {} unchanged, {} pending",
            handle.name(),
            report.count(IndexOutcome::Created),
            report.count(IndexOutcome::Unchanged),
            report.count(IndexOutcome::WouldCreate),
        );

        Ok(())
    }

    /// Ensures a single declared index exists on `handle`.
    pub fn ensure_index(&self, handle: &dyn DatabaseHandle, decl: &IndexDeclaration) -> Result<IndexOutcome> {
        let wanted = decl.index_model();
        let wanted_name = wanted.name()?;
        let ns = format!("{}.{}", handle.name(), decl.collection);

        for existing in handle.list_indexes(&decl.collection)? {
            let same_name = existing.name()? == wanted_name;
            if !same_name && !same_key_pattern(&existing.keys, &wanted.keys) {
                continue;
            }

            return match describe_difference(&existing, &wanted)? {
                None => {
                    debug!("index {} on {} is up to date", wanted_name, ns);
                    Ok(IndexOutcome::Unchanged)
                }
                Some(reason) => Err(ConflictingIndexError {
                    ns,
                    name: wanted_name,
                    keys: decl.keys.clone(),
                    reason,
                }.into()),
            };
        }

        if self.options.is_dry_run() {
            debug!("index {} on {} would be created", wanted_name, ns);
            return Ok(IndexOutcome::WouldCreate);
        }

        let created = handle.create_index(&decl.collection, wanted)?;
        info!("created index {} on {}", created, ns);

        Ok(IndexOutcome::Created)
    }

}

impl Default for Applier {
    fn default() -> Self {
        Applier::new(ApplyOptions::default())
    }
}
