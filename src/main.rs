use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use log::info;
use recalib_lib::{calibration_config_expander, ExpanderOptions};

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("recalib-expand")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Expand a human-readable calibration config into per-parameter prior sections")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("Config file with a [calibration] section")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Write the expanded config here instead of stdout")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ifo")
                .long("ifo")
                .value_name("LABEL")
                .help("Interferometer to expand (repeatable); inferred from keys when omitted")
                .action(ArgAction::Append),
        )
        .get_matches();

    let input = matches
        .get_one::<PathBuf>("input")
        .context("missing INPUT argument")?;
    let output = matches.get_one::<PathBuf>("output");
    let options = match matches.get_many::<String>("ifo") {
        Some(ifos) => ExpanderOptions::with_interferometers(ifos.cloned()),
        None => ExpanderOptions::default(),
    };

    let expanded = calibration_config_expander(input, output.map(PathBuf::as_path), &options)
        .with_context(|| format!("Failed to expand {}", input.display()))?;

    info!(
        "{} variable parameters after expansion",
        expanded.variable_params().len()
    );
    if output.is_none() {
        print!("{}", expanded.to_toml_string()?);
    }
    Ok(())
}
