//! This module implements the definition of the command line app.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use perfgraph_base_schema::units::{Notation, Precision, UnitSpec};

/// Translates perfdata into metrics and selects the graphs that show them.
#[derive(Debug, Parser)]
#[command(name = "perfgraph", version, about, max_term_width = 100)]
pub struct Cli {
    /// The path to the config folder.
    #[arg(short, long, global = true, env = "PERFGRAPH_CONFIG", default_value = ".perfgraph")]
    pub config: PathBuf,

    /// The output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output formats of all commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines.
    Text,
    /// Pretty printed JSON.
    Json,
}

/// The perfdata of a check result.
#[derive(Debug, Args)]
pub struct PerfDataArgs {
    /// The perfdata string, for example `util=12;80;90;0;100`.
    pub perf_data: String,

    /// The check command that produced the perfdata.
    #[arg(short = 'k', long)]
    pub check_command: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parses perfdata and translates it into metrics.
    Translate(PerfDataArgs),

    /// Evaluates an expression against translated perfdata.
    Evaluate {
        /// The expression in reverse polish notation, for example `user,system,+`.
        expression: String,

        #[command(flatten)]
        perf_data: PerfDataArgs,
    },

    /// Lists and evaluates the graphs that apply to translated perfdata.
    Graphs(PerfDataArgs),

    /// Shows the perfometer that applies to translated perfdata.
    Perfometer(PerfDataArgs),

    /// Renders a value in a unit.
    Render(RenderArgs),

    /// Manage the configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Creates a new config folder.
    Init,
    /// Shows the effective configuration.
    Show,
}

/// Notations selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NotationArg {
    Decimal,
    Si,
    Iec,
    StandardScientific,
    EngineeringScientific,
    Time,
}

/// Precisions selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PrecisionArg {
    Auto,
    Strict,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// The value to render.
    #[arg(allow_negative_numbers = true)]
    pub value: f64,

    /// How the value is scaled.
    #[arg(long, value_enum, default_value_t = NotationArg::Decimal)]
    pub notation: NotationArg,

    /// The unit symbol.
    #[arg(long, default_value = "")]
    pub symbol: String,

    /// How fractional digits are chosen.
    #[arg(long, value_enum, default_value_t = PrecisionArg::Auto)]
    pub precision: PrecisionArg,

    /// The number of fractional digits.
    #[arg(long, default_value_t = 2)]
    pub digits: u8,
}

impl RenderArgs {
    /// Builds the unit specification from the arguments.
    pub fn unit_spec(&self) -> UnitSpec {
        let symbol = self.symbol.clone();
        let notation = match self.notation {
            NotationArg::Decimal => Notation::Decimal { symbol },
            NotationArg::Si => Notation::Si { symbol },
            NotationArg::Iec => Notation::Iec { symbol },
            NotationArg::StandardScientific => Notation::StandardScientific { symbol },
            NotationArg::EngineeringScientific => Notation::EngineeringScientific { symbol },
            NotationArg::Time => Notation::Time,
        };

        let precision = match self.precision {
            PrecisionArg::Auto => Precision::Auto {
                digits: self.digits,
            },
            PrecisionArg::Strict => Precision::Strict {
                digits: self.digits,
            },
        };

        UnitSpec::new(notation, precision)
    }
}
