use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use credit_cli::commands;
use credit_cli::util::{load_pipeline_config, resolve_data_path};

fn data_arg(help: &'static str) -> Arg {
    Arg::new("data")
        .help(help)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("CREDIT_LOG", "error,credit=info"))
        .init();

    let matches = Command::new("credit")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("Credit-risk scoring pipeline: train, serve, store and monitor")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Path to the pipeline configuration file (YAML or JSON)")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a data file against the credit schema")
                .arg(data_arg("Data file to validate. Defaults to train_data from the config.")),
        )
        .subcommand(
            Command::new("train")
                .about("Fit the configured pipeline and save the model artifact")
                .arg(data_arg("Training data. Overrides train_data from the config.")),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Stratified k-fold ROC-AUC of the configured pipeline")
                .arg(data_arg("Training data. Overrides train_data from the config.")),
        )
        .subcommand(
            Command::new("best-model")
                .about("Refit the best tracked run, log it and register the model")
                .arg(data_arg("Training data. Overrides train_data from the config.")),
        )
        .subcommand(
            Command::new("predict")
                .about("Score rows against the serving endpoint and store the results")
                .arg(data_arg("Rows to score").required(true)),
        )
        .subcommand(
            Command::new("ping").about("Send a canned batch to the serving endpoint"),
        )
        .subcommand(
            Command::new("monitor")
                .about("Write the drift report for stored predictions")
                .arg(
                    Arg::new("reference")
                        .short('r')
                        .long("reference")
                        .help("Reference data. Overrides reference_data from the config.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("HTML report path. Overrides report_path from the config.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let Some((name, sub_m)) = matches.subcommand() else {
        unreachable!("Subcommand is required by CLI configuration")
    };

    match dispatch(name, sub_m) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("{} failed: {:#}", name, e);
            std::process::exit(1)
        }
    }
}

fn dispatch(name: &str, matches: &ArgMatches) -> Result<()> {
    let config = load_pipeline_config(matches.get_one::<PathBuf>("config"))?;
    let data = |what: &str| {
        resolve_data_path(
            matches.get_one::<PathBuf>("data"),
            config.train_data.as_ref(),
            what,
        )
    };

    match name {
        "validate" => {
            let path = data("data file")?;
            if !commands::run_validate(&config, &path)? {
                anyhow::bail!("{} does not match the credit schema", path.display());
            }
            println!("{}: OK", path.display());
        }
        "train" => {
            let score = commands::run_train(&config, &data("training data")?)?;
            println!("roc_auc\t{:.6}", score);
            println!("model\t{}", config.model_path().display());
        }
        "evaluate" => {
            let scores = commands::run_evaluate(&config, &data("training data")?)?;
            for (fold, score) in scores.iter().enumerate() {
                println!("fold_{}\t{:.6}", fold, score);
            }
            println!("mean\t{:.6}", scores.iter().sum::<f64>() / scores.len() as f64);
        }
        "best-model" => {
            let version = commands::run_best_model(&config, &data("training data")?)?;
            println!(
                "registered\t{}\tversion {}",
                config.registered_model_name(),
                version
            );
        }
        "predict" => {
            let path = resolve_data_path(matches.get_one::<PathBuf>("data"), None, "data file")?;
            let probs = commands::run_predict(&config, &path)?;
            println!("Preds_Prob");
            for p in probs {
                println!("{}", p);
            }
        }
        "ping" => {
            commands::run_ping(&config)?;
            println!("{}: OK", config.scoring_endpoint);
        }
        "monitor" => {
            let report = commands::run_monitor(
                &config,
                matches.get_one::<PathBuf>("reference"),
                matches.get_one::<PathBuf>("output"),
            )?;
            let output = matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| config.report_path.clone());
            println!(
                "drifted_columns\t{}/{}\ndataset_drift\t{}\nreport\t{}",
                report.drift.n_drifted,
                report.drift.columns.len(),
                report.drift.dataset_drift,
                output.display()
            );
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
    Ok(())
}
