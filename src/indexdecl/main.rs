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

//! Command line tool that converges MongoDB databases onto their declared
//! partial-unique indexes.
//!
//! ```text
//! indexdecl list
//! indexdecl validate --manifest indexes.json
//! indexdecl apply --database customer_service --dry-run
//! indexdecl apply --memory --report json
//! ```
//!
//! The connection is configured through `MONGO_URI`, `MONGO_USER` and
//! `MONGO_PWD`. Without `--manifest` (or `INDEXDECL_MANIFEST`) the built-in
//! manifest is used.

mod config;
mod mongo_handle;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command as App};
use env_logger::Env;
use futures::future::join_all;
use log::{error, info, warn};
use indexdecl_core::{
    builtin_manifest,
    get_version,
    Applier,
    ApplyOptions,
    ApplyReport,
    Connector,
    IndexDeclaration,
    Manifest,
    MemoryClient,
};
use crate::config::Config;
use crate::mongo_handle::MongoConnector;
use crate::report::{DatabaseRun, RunReport};

fn manifest_arg() -> Arg {
    Arg::new("manifest")
        .long("manifest")
        .short('m')
        .value_name("PATH")
        .help("the manifest of index declarations, defaults to the built-in one")
        .num_args(1)
}

fn build_app() -> App {
    App::new("indexdecl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Applies partial-unique index declarations to MongoDB databases")
        .author("Vincent Chan <okcdz@diverse.space>")
        .subcommand_required(true)
        .arg(
            Arg::new("log")
                .help("print log")
                .long("log")
                .short('l')
                .action(ArgAction::SetTrue)
                .global(true)
        )
        .subcommand(App::new("list")
            .about("print the declarations of every database in id order")
            .arg(manifest_arg())
        )
        .subcommand(App::new("validate")
            .about("check the manifest without touching any database")
            .arg(manifest_arg())
        )
        .subcommand(App::new("apply")
            .about("create the declared indexes that are missing")
            .arg(manifest_arg())
            .arg(
                Arg::new("database")
                    .long("database")
                    .short('d')
                    .value_name("NAME")
                    .help("only apply this database, may be repeated")
                    .action(ArgAction::Append)
            )
            .arg(
                Arg::new("memory")
                    .long("memory")
                    .help("apply against a fresh in-memory engine")
                    .action(ArgAction::SetTrue)
            )
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .help("report what would be created without creating it")
                    .action(ArgAction::SetTrue)
            )
            .arg(
                Arg::new("report")
                    .long("report")
                    .value_parser(["text", "json"])
                    .default_value("text")
                    .num_args(1)
            )
        )
}

fn init_logger(should_log: bool) {
    let level = if should_log { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() {
    let matches = build_app().get_matches();
    let config = Config::from_env();

    let result = match matches.subcommand() {
        Some(("list", sub)) => {
            init_logger(sub.get_flag("log"));
            run_list(&config, sub)
        }
        Some(("validate", sub)) => {
            init_logger(sub.get_flag("log"));
            run_validate(&config, sub)
        }
        Some(("apply", sub)) => {
            init_logger(sub.get_flag("log"));
            run_apply(&config, sub).await
        }
        _ => Err(anyhow!("unknown subcommand")),
    };

    let code = match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("error: {:#}", err);
            1
        }
    };
    std::process::exit(code);
}

fn load_manifest(config: &Config, sub: &ArgMatches) -> Result<Manifest> {
    let path = sub
        .get_one::<String>("manifest")
        .map(PathBuf::from)
        .or_else(|| config.manifest.clone());

    match path {
        Some(path) => {
            info!("loading manifest {}", path.display());
            Manifest::from_path(&path)
                .with_context(|| format!("failed to load manifest {}", path.display()))
        }
        None => Ok(builtin_manifest()?),
    }
}

fn describe(decl: &IndexDeclaration) -> String {
    let mut line = format!(
        "  {:>4}  {}  {}  {}",
        decl.id,
        decl.collection,
        decl.index_name().unwrap_or_else(|_| "?".to_string()),
        decl.keys,
    );
    if decl.unique {
        line.push_str("  unique");
    }
    if let Some(filter) = &decl.partial_filter_expression {
        line.push_str(&format!("  partial: {}", filter));
    }
    line
}

fn run_list(config: &Config, sub: &ArgMatches) -> Result<bool> {
    let manifest = load_manifest(config, sub)?;

    for database in manifest.databases() {
        println!("{}", database);

        let mut decls = manifest.declarations
            .iter()
            .filter(|decl| decl.database == database)
            .collect::<Vec<&IndexDeclaration>>();
        decls.sort_by_key(|decl| decl.id);
        for decl in decls {
            println!("{}", describe(decl));
        }

        if let Err(err) = manifest.plan(database) {
            for err in err.into_vec() {
                println!("  ! {}", err);
            }
        }
    }

    Ok(true)
}

fn run_validate(config: &Config, sub: &ArgMatches) -> Result<bool> {
    let manifest = load_manifest(config, sub)?;

    match manifest.validate() {
        Ok(()) => {
            println!(
                "{} declaration(s) in {} database(s) are valid",
                manifest.declarations.len(),
                manifest.databases().len(),
            );
            Ok(true)
        }
        Err(err) => {
            for err in err.into_vec() {
                eprintln!("{}", err);
            }
            Ok(false)
        }
    }
}

async fn connect(config: &Config, memory: bool) -> Result<Arc<dyn Connector>> {
    if memory {
        info!("using the in-memory engine");
        return Ok(Arc::new(MemoryClient::new()));
    }

    let uri = config.mongo_uri
        .clone()
        .ok_or_else(|| anyhow!("MONGO_URI is not set, pass --memory to use the in-memory engine"))?;
    let config = config.clone();

    // the sync driver blocks on its own runtime
    let connector = tokio::task::spawn_blocking(move || MongoConnector::connect(&uri, &config)).await??;
    Ok(Arc::new(connector))
}

async fn run_apply(config: &Config, sub: &ArgMatches) -> Result<bool> {
    info!("indexdecl_core {}", get_version());
    let manifest = load_manifest(config, sub)?;
    let dry_run = sub.get_flag("dry-run");
    let connector = connect(config, sub.get_flag("memory")).await?;
    let selected = sub
        .get_many::<String>("database")
        .map(|values| values.cloned().collect::<Vec<String>>());

    let report = apply_manifest(&manifest, selected, connector, dry_run).await;

    match sub.get_one::<String>("report").map(String::as_str) {
        Some("json") => println!("{}", report.to_json()?),
        _ => print!("{}", report.to_text()),
    }

    Ok(report.is_success())
}

/// Applies every selected database of `manifest` in parallel, one blocking
/// task each. A database that fails validation is skipped.
async fn apply_manifest(
    manifest: &Manifest,
    selected: Option<Vec<String>>,
    connector: Arc<dyn Connector>,
    dry_run: bool,
) -> RunReport {
    let plans = match selected {
        Some(selected) => selected
            .into_iter()
            .map(|database| {
                let plan = manifest.plan(&database);
                (database, plan)
            })
            .collect::<Vec<_>>(),
        None => manifest.plans(),
    };

    let mut report = RunReport::new(dry_run);

    let runs = plans.into_iter().map(|(database, plan)| {
        let connector = connector.clone();
        async move {
            let plan = match plan {
                Ok(plan) => plan,
                Err(err) => {
                    warn!("skipping database {}: {}", database, err);
                    return DatabaseRun::skipped(&database, err.to_string());
                }
            };

            let task = tokio::task::spawn_blocking(move || {
                let applier = Applier::new(ApplyOptions::builder().dry_run(dry_run).build());
                let mut applied = ApplyReport::new(&plan.database);
                let result = applier.apply_with_into(connector.as_ref(), &plan, &mut applied);
                (applied, result)
            });

            match task.await {
                Ok((applied, Ok(()))) => DatabaseRun::applied(applied),
                Ok((applied, Err(err))) => {
                    error!("database {} failed: {}", database, err);
                    DatabaseRun::failed(applied, err.to_string())
                }
                Err(err) => DatabaseRun::failed(ApplyReport::new(&database), format!("task failed: {}", err)),
            }
        }
    });

    report.databases = join_all(runs).await;
    report.finish();
    report
}
