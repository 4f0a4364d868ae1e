use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use perfgraph_base_schema::units::{UnitInfo, UnitRegistry};
use perfgraph_config::{Config, MinimalConfig, Plugins};
use perfgraph_expression::parse_expression;
use perfgraph_graphs::{evaluate_graph_templates, find_matching_perfometer};
use perfgraph_metrics::{
    ResolutionContext, TranslatedMetrics, parse_perf_data, translate_metrics,
};
use serde::Serialize;

use crate::cliapp::{Cli, Command, ConfigCommand, OutputFormat, PerfDataArgs, RenderArgs};
use crate::setup;

/// Runs the command line application.
pub fn execute() -> Result<()> {
    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();

    if let Command::Config(ConfigCommand::Init) = cli.command {
        return run(&cli, &Config::default(), &Plugins::default(), &mut stdout);
    }

    let config = load_config(&cli)?;
    setup::init_logging(&config);
    setup::dump_spawn_infos(&config);

    let plugins = config.plugins().context("failed to load plugin bundles")?;
    setup::dump_plugin_infos(&plugins);

    run(&cli, &config, &plugins, &mut stdout)
}

/// Loads the config, falling back to defaults if the folder has not been initialized.
fn load_config(cli: &Cli) -> Result<Config> {
    if !Config::config_exists(&cli.config) {
        return Ok(Config::default());
    }

    Config::from_path(&cli.config)
        .with_context(|| format!("could not load config from {}", cli.config.display()))
}

fn init_config<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    if Config::config_exists(path) {
        anyhow::bail!("there is already a config in {}", path.display());
    }

    MinimalConfig {
        plugins: vec!["plugins".into()],
    }
    .save_in_folder(path)
    .context("failed to write config")?;

    writeln!(out, "initialized config in {}", path.display())?;
    Ok(())
}

/// Executes a command with loaded configuration and plugins.
pub fn run<W: Write>(cli: &Cli, config: &Config, plugins: &Plugins, out: &mut W) -> Result<()> {
    match &cli.command {
        Command::Translate(args) => {
            let metrics = translate(args, config, plugins)?;
            match cli.format {
                OutputFormat::Json => write_json(out, &metrics),
                OutputFormat::Text => {
                    for (name, metric) in &metrics {
                        let rendered = metric.unit.render(metric.value);
                        writeln!(out, "{name}\t{rendered}\t{}", metric.title)?;
                    }
                    Ok(())
                }
            }
        }
        Command::Evaluate {
            expression,
            perf_data,
        } => {
            let metrics = translate(perf_data, config, plugins)?;
            let parsed = parse_expression(expression)
                .with_context(|| format!("invalid expression '{expression}'"))?;
            let evaluated = parsed
                .evaluate(&metrics, &plugins.units)
                .with_context(|| format!("failed to evaluate '{expression}'"))?;

            match cli.format {
                OutputFormat::Json => write_json(
                    out,
                    &EvaluationOutput {
                        value: evaluated.value,
                        rendered: evaluated.render(),
                        unit: evaluated.unit.clone(),
                        color: evaluated.color.clone(),
                    },
                ),
                OutputFormat::Text => {
                    writeln!(out, "{}", evaluated.render())?;
                    Ok(())
                }
            }
        }
        Command::Graphs(args) => {
            let metrics = translate(args, config, plugins)?;
            let graphs = evaluate_graph_templates(
                &plugins.graphs,
                &plugins.metrics,
                &metrics,
                &plugins.units,
            );

            match cli.format {
                OutputFormat::Json => write_json(out, &graphs),
                OutputFormat::Text => {
                    for graph in &graphs {
                        writeln!(out, "{}: {}", graph.id, graph.title)?;
                        for line in &graph.metrics {
                            writeln!(
                                out,
                                "  {} {} = {}",
                                line.line_type,
                                line.title,
                                line.render()
                            )?;
                        }
                    }
                    Ok(())
                }
            }
        }
        Command::Perfometer(args) => {
            let metrics = translate(args, config, plugins)?;
            let perfometer = find_matching_perfometer(plugins.graphs.perfometers(), &metrics);

            match cli.format {
                OutputFormat::Json => write_json(out, &perfometer),
                OutputFormat::Text => {
                    match perfometer {
                        Some(perfometer) => writeln!(out, "{}", perfometer.name())?,
                        None => writeln!(out, "no perfometer applies")?,
                    }
                    Ok(())
                }
            }
        }
        Command::Render(args) => render(args, &plugins.units, cli.format, out),
        Command::Config(ConfigCommand::Show) => {
            write!(out, "{}", config.to_yaml_string()?)?;
            Ok(())
        }
        Command::Config(ConfigCommand::Init) => init_config(&cli.config, out),
    }
}

fn translate(
    args: &PerfDataArgs,
    config: &Config,
    plugins: &Plugins,
) -> Result<TranslatedMetrics> {
    let perf_data = parse_perf_data(
        &args.perf_data,
        args.check_command.as_deref(),
        config.parse_options(),
    )
    .context("failed to parse perfdata")?;

    Ok(translate_metrics(
        &perf_data.samples,
        perf_data.check_command.as_deref(),
        &plugins.metrics,
        &plugins.units,
        ResolutionContext::new(),
    ))
}

fn render<W: Write>(
    args: &RenderArgs,
    units: &UnitRegistry,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let unit = units.parse_or_add_unit(&args.unit_spec());
    let rendered = unit.render(args.value);

    match format {
        OutputFormat::Json => write_json(
            out,
            &EvaluationOutput {
                value: args.value,
                rendered,
                unit,
                color: String::new(),
            },
        ),
        OutputFormat::Text => {
            writeln!(out, "{rendered}")?;
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct EvaluationOutput {
    value: f64,
    rendered: String,
    unit: Arc<UnitInfo>,
    #[serde(skip_serializing_if = "String::is_empty")]
    color: String,
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use perfgraph_config::PluginBundle;
    use similar_asserts::assert_eq;

    use super::*;

    fn plugins() -> Plugins {
        let bundle: PluginBundle = serde_json::from_value(serde_json::json!({
            "graph_info": [{
                "id": "cpu_utilization",
                "title": "CPU utilization",
                "metrics": [["user", "stack"], ["system", "stack"]],
            }],
            "check_metrics": {
                "check_mk-kernel_util": {"user_time": {"name": "user"}},
            },
        }))
        .unwrap();

        let mut plugins = Plugins::default();
        plugins.add_bundle(&bundle);
        plugins
    }

    fn run_cli(args: &[&str]) -> String {
        let cli = Cli::parse_from(std::iter::once("perfgraph").chain(args.iter().copied()));
        let mut out = Vec::new();
        run(&cli, &Config::default(), &plugins(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_translate_text() {
        let output = run_cli(&[
            "translate",
            "user_time=3 system=1",
            "--check-command",
            "check_mk-kernel_util",
        ]);

        assert_eq!(output, "system\t1\tSystem\nuser\t3\tUser\n");
    }

    #[test]
    fn test_evaluate_text() {
        let output = run_cli(&[
            "evaluate",
            "user,system,+,100,MAX",
            "user=101.0;;;; system=0.1;;;; io_wait=0.01;;;;",
        ]);

        assert_eq!(output, "101.1\n");
    }

    #[test]
    fn test_graphs_text() {
        let output = run_cli(&["graphs", "user=1 system=2 load1=0.5"]);

        insta::assert_snapshot!(output, @r"
        cpu_utilization: CPU utilization
          stack User = 1
          stack System = 2
        METRIC_load1: Load1
          area Load1 = 0.5
        ");
    }

    #[test]
    fn test_perfometer_none() {
        let output = run_cli(&["perfometer", "user=1"]);
        assert_eq!(output, "no perfometer applies\n");

        let output = run_cli(&["--format", "json", "perfometer", "user=1"]);
        assert_eq!(output, "null\n");
    }

    #[test]
    fn test_render() {
        let output = run_cli(&["render", "123456.789", "--notation", "si", "--symbol", "unit"]);
        assert_eq!(output, "123.46 kunit\n");
    }

    #[test]
    fn test_config_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        let path = path.to_str().unwrap();

        let output = run_cli(&["--config", path, "config", "init"]);
        assert_eq!(output, format!("initialized config in {path}\n"));
        assert!(Config::config_exists(path));

        let cli = Cli::parse_from(["perfgraph", "--config", path, "config", "init"]);
        let error = run(&cli, &Config::default(), &plugins(), &mut Vec::new()).unwrap_err();
        assert!(error.to_string().starts_with("there is already a config in "));
    }

    #[test]
    fn test_evaluate_error() {
        let cli = Cli::parse_from(["perfgraph", "evaluate", "user,+", "user=1"]);
        let error = run(&cli, &Config::default(), &plugins(), &mut Vec::new()).unwrap_err();

        assert_eq!(error.to_string(), "invalid expression 'user,+'");
    }
}
