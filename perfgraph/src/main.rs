//! Perfgraph turns the perfdata of monitoring check results into metrics and selects the graphs
//! and perfometers that show them.
//!
//! Perfdata fields are translated into canonical metrics using the translation rules of the
//! check command, resolved against declared metrics for their title, unit and color, and then
//! matched against graph templates and perfometers. Derived values are computed from expressions
//! in reverse polish notation.
//!
//! # Workspace Crates
//!
//! Perfgraph is split into the following workspace crates:
//!
//!  - `perfgraph`: Main entry point and command line interface.
//!  - [`perfgraph-base-schema`]: Metric names, units, number formatting and colors.
//!  - [`perfgraph-common`]: Common macros.
//!  - [`perfgraph-config`]: Configuration and plugin bundle loading.
//!  - [`perfgraph-expression`]: Metric expressions and their evaluation.
//!  - [`perfgraph-graphs`]: Graph templates and perfometers.
//!  - [`perfgraph-log`]: Error reporting and logging.
//!  - [`perfgraph-metrics`]: Perfdata parsing and metric translation.
//!
//! [`perfgraph-base-schema`]: ../perfgraph_base_schema/index.html
//! [`perfgraph-common`]: ../perfgraph_common/index.html
//! [`perfgraph-config`]: ../perfgraph_config/index.html
//! [`perfgraph-expression`]: ../perfgraph_expression/index.html
//! [`perfgraph-graphs`]: ../perfgraph_graphs/index.html
//! [`perfgraph-log`]: ../perfgraph_log/index.html
//! [`perfgraph-metrics`]: ../perfgraph_metrics/index.html

mod cli;
mod cliapp;
mod setup;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            perfgraph_log::ensure_error(&err);
            1
        }
    };

    process::exit(exit_code);
}
