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

use std::fmt::Write;
use serde::Serialize;
use indexdecl_core::{ApplyReport, DeclarationReport, IndexOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseStatus {
    Applied,
    /// The declarations of the database did not validate; nothing was sent.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRun {
    pub database: String,
    pub status: DatabaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub declarations: Vec<DeclarationReport>,
}

impl DatabaseRun {

    pub fn applied(report: ApplyReport) -> DatabaseRun {
        DatabaseRun {
            database: report.database,
            status: DatabaseStatus::Applied,
            error: None,
            declarations: report.declarations,
        }
    }

    pub fn skipped(database: &str, error: String) -> DatabaseRun {
        DatabaseRun {
            database: database.to_string(),
            status: DatabaseStatus::Skipped,
            error: Some(error),
            declarations: vec![],
        }
    }

    /// `partial` holds what was done before the failure; those indexes stay.
    pub fn failed(partial: ApplyReport, error: String) -> DatabaseRun {
        DatabaseRun {
            database: partial.database,
            status: DatabaseStatus::Failed,
            error: Some(error),
            declarations: partial.declarations,
        }
    }

}

/// Everything one `apply` invocation did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub dry_run: bool,
    pub databases: Vec<DatabaseRun>,
}

impl RunReport {

    pub fn new(dry_run: bool) -> RunReport {
        let now = chrono::Utc::now().to_rfc3339();
        RunReport {
            started_at: now.clone(),
            finished_at: now,
            dry_run,
            databases: vec![],
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = chrono::Utc::now().to_rfc3339();
    }

    pub fn is_success(&self) -> bool {
        self.databases
            .iter()
            .all(|run| run.status == DatabaseStatus::Applied)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for run in &self.databases {
            let _ = writeln!(out, "{} ({})", run.database, status_str(run.status));
            for decl in &run.declarations {
                let _ = writeln!(
                    out,
                    "  {:>4}  {}.{}  {}",
                    decl.id,
                    decl.collection,
                    decl.index_name,
                    outcome_str(decl.outcome),
                );
            }
            if let Some(error) = &run.error {
                let _ = writeln!(out, "  error: {}", error);
            }
        }
        let failed = self.databases.iter().filter(|run| run.status != DatabaseStatus::Applied).count();
        let _ = writeln!(out, "{} database(s), {} failed", self.databases.len(), failed);
        out
    }

}

fn status_str(status: DatabaseStatus) -> &'static str {
    match status {
        DatabaseStatus::Applied => "applied",
        DatabaseStatus::Skipped => "skipped",
        DatabaseStatus::Failed => "failed",
    }
}

fn outcome_str(outcome: IndexOutcome) -> &'static str {
    match outcome {
        IndexOutcome::Created => "created",
        IndexOutcome::Unchanged => "unchanged",
        IndexOutcome::WouldCreate => "would create",
    }
}
