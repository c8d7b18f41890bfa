use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use vmscale_plot::plot::parse_cli;
use vmscale_plot::{plot_metrics, Table};

fn main() {
    let config = parse_cli();
    let default_filter = if config.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder().with_env_filter(env).init();

    info!(
        "read data from {} and plot to {}",
        config.csvin.display(),
        config.outdir.display()
    );
    let table = match Table::from_csv(&config.csvin) {
        Ok(t) => t,
        Err(e) => {
            error!("failed loading {}: {}", config.csvin.display(), e);
            process::exit(1);
        }
    };
    match plot_metrics(&table, &config.outdir, &config.options) {
        Ok(charts) => info!("plotted {} metrics", charts.len()),
        Err(e) => {
            error!("failed plotting: {}", e);
            process::exit(1);
        }
    }
}
