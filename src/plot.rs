use super::{PlotOptions, VERSION};
use clap::{value_t, App, Arg};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Everything the plot app needs from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    pub csvin: PathBuf,
    pub outdir: PathBuf,
    pub options: PlotOptions,
    pub verbose: bool,
}

fn build_app() -> App<'static, 'static> {
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("name of the csv file with the benchmark results")
        .short("f")
        .long("csvfile")
        .takes_value(true)
        .required(true);
    let arg_outdir = Arg::with_name("output_dir")
        .help("directory for the png charts, defaults to the directory of the csv file")
        .short("o")
        .long("outdir")
        .takes_value(true);
    let arg_step = Arg::with_name("vm_step")
        .help("number of VMs added by each data row")
        .short("s")
        .long("step")
        .takes_value(true)
        .default_value("4")
        .validator(validate_step);
    let arg_parallel = Arg::with_name("parallel")
        .help("plot the metrics in parallel")
        .short("p")
        .long("parallel")
        .takes_value(false);
    let arg_verbose = Arg::with_name("verbose")
        .help("print verbose information")
        .short("v")
        .long("verbose")
        .takes_value(false);
    App::new("vmscale_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot every benchmark metric against the number of VMs")
        .arg(arg_csvin)
        .arg(arg_outdir)
        .arg(arg_step)
        .arg(arg_parallel)
        .arg(arg_verbose)
}

fn validate_step(v: String) -> Result<(), String> {
    match v.parse::<f64>() {
        Ok(s) if s.is_finite() && s > 0. => Ok(()),
        _ => Err(format!("step must be a positive number, got {}", v)),
    }
}

/// Takes the CLI arguments that control the plotting of the metrics,
/// exits with the clap message on invalid arguments.
pub fn parse_cli() -> PlotConfig {
    parse_cli_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<PlotConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = build_app().get_matches_from_safe(args)?;
    let csvin = PathBuf::from(cli_args.value_of("input_csvfile").unwrap_or_default());
    let outdir = match cli_args.value_of("output_dir") {
        Some(p) => PathBuf::from(p),
        None => default_outdir(&csvin),
    };
    let vm_step = value_t!(cli_args, "vm_step", f64)?;
    Ok(PlotConfig {
        csvin,
        outdir,
        options: PlotOptions {
            vm_step,
            parallel: cli_args.is_present("parallel"),
        },
        verbose: cli_args.is_present("verbose"),
    })
}

fn default_outdir(csvin: &Path) -> PathBuf {
    match csvin.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
