//! Elasticblink — show Elasticsearch cluster health on a BlinkStick.

use clap::{Parser, ValueEnum};

use elasticblink_lib::monitor::ShutdownFlag;

mod cli;

/// Exit code for fatal configuration, device or self-test errors.
const EXIT_FAILURE: i32 = 1;
/// Exit code after an operator interrupt (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum YesNo {
    Yes,
    No,
}

#[derive(Parser)]
#[command(
    name = "elasticblink",
    version,
    about = "Watch an Elasticsearch cluster and show its health on a BlinkStick"
)]
struct Args {
    /// Path to the configuration file (.json, or .toml)
    #[arg(short = 'k', long)]
    config: std::path::PathBuf,

    /// Cycle red, green, blue and ping Elasticsearch before polling
    #[arg(short = 't', long, value_enum, default_value_t = YesNo::Yes)]
    initialisation_test: YesNo,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_target(false)
        .init();

    let shutdown = ShutdownFlag::new();
    let handler_flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.request()) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }

    let options = cli::MonitorOptions {
        config_path: args.config,
        self_test: args.initialisation_test == YesNo::Yes,
    };

    let result = cli::run(options, shutdown.clone());
    if let Err(e) = &result {
        eprintln!("Error: {e}");
    }
    std::process::exit(exit_code(&result, shutdown.is_requested()));
}

/// Process exit code: 1 on a fatal error, 130 after Ctrl+C, 0 otherwise.
fn exit_code(result: &elasticblink_lib::error::Result<()>, interrupted: bool) -> i32 {
    match result {
        Err(_) => EXIT_FAILURE,
        Ok(()) if interrupted => EXIT_INTERRUPTED,
        Ok(()) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elasticblink_lib::ElasticblinkError;
    use elasticblink_lib::config::ConfigError;

    #[test]
    fn interrupted_run_exits_130() {
        assert_eq!(exit_code(&Ok(()), true), 130);
    }

    #[test]
    fn fatal_error_exits_1() {
        let err = Err(ElasticblinkError::Config(ConfigError::MissingClusterName));
        assert_eq!(exit_code(&err, false), 1);
        let err = Err(ElasticblinkError::SelfTest("ping failed".into()));
        assert_eq!(exit_code(&err, true), 1);
    }

    #[test]
    fn clean_return_exits_0() {
        assert_eq!(exit_code(&Ok(()), false), 0);
    }
}
