use perfgraph_config::{Config, Plugins};

/// Initializes logging from the config.
pub fn init_logging(config: &Config) {
    perfgraph_log::init(config.logging());
}

/// Print spawn infos to the log.
pub fn dump_spawn_infos(config: &Config) {
    if config.path().as_os_str().is_empty() {
        perfgraph_log::debug!("running without config folder");
    } else {
        perfgraph_log::debug!("running from config folder {}", config.path().display());
    }
    perfgraph_log::debug!("  log level: {}", config.logging().level);
    perfgraph_log::debug!("  debug mode: {}", config.debug());
}

/// Print the number of loaded plugin items to the log.
pub fn dump_plugin_infos(plugins: &Plugins) {
    perfgraph_log::debug!(
        "loaded {} graph templates",
        plugins.graphs.templates(&plugins.metrics).len()
    );
    perfgraph_log::debug!("loaded {} perfometers", plugins.graphs.perfometers().count());
    perfgraph_log::debug!("loaded {} units", plugins.units.len());
}
