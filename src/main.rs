use clap::Parser;

use serialcam::cli::{self, Args, Command};
use serialcam::config::Config;
use serialcam::signal::{setup_ctrlc_handler, StopToken};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    args.apply_to(&mut config);

    let stop = StopToken::new();
    if let Err(e) = setup_ctrlc_handler(stop.clone()) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let result = match args.command {
        Command::ListPorts => {
            cli::list_ports();
            Ok(())
        }
        Command::Config { action } => {
            cli::handle_config_action(action, &config, args.config.as_deref());
            Ok(())
        }
        Command::Stream { .. } => cli::run_stream(&config, &stop),
        Command::Download { .. } => cli::run_download(&config, &stop),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
