// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

use super::{
    cli::{ConfigOpts, ListOpts, RunOpts},
    execution::{exec_list, exec_run},
};
use crate::{
    Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use clap::Subcommand;
use cts_runner::catalog::Catalog;

/// Lists and runs cases from a test catalog, selected by query.
///
/// Queries have the form `suite:file,path:test,path:key=value;...`, and every level may end in a
/// wildcard (`suite:*`, `suite:file:*`, `suite:file:test:*`).
#[derive(Debug, clap::Parser)]
#[command(
    version,
    bin_name = "cts",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct CtsApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(subcommand)]
    command: Command,
}

impl CtsApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app against `catalog`.
    ///
    /// Returns the exit code.
    pub fn exec(
        self,
        catalog: &Catalog,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        match self.command {
            Command::List(opts) => exec_list(opts, catalog, output, output_writer),
            Command::Run(opts) => exec_run(opts, &self.config_opts, catalog, output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List cases, or the tree of queries above them
    ///
    /// Without a query, every suite in the catalog is listed.
    List(ListOpts),
    /// Run cases and report their results
    ///
    /// Without a query, every suite in the catalog is run. The process exits with code 100 if a
    /// case failed without an expectation anticipating it, and with code 4 if no cases matched.
    Run(RunOpts),
}
