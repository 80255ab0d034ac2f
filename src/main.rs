use clap::error::ErrorKind;
use clap::CommandFactory;
use sshlogtool::cli::{Args, Mode};
use sshlogtool::config::Config;
use sshlogtool::history::run_history;
use sshlogtool::parser::LogParser;
use sshlogtool::report::Reporter;
use sshlogtool::watcher::LiveWatcher;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logging goes to stderr so stdout stays clean for reports
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse_normalized(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        },
    };

    if let Some(shell) = args.completions {
        clap_complete::generate(
            shell,
            &mut Args::command(),
            "sshlogtool",
            &mut std::io::stdout(),
        );
        return;
    }

    if args.mode().is_none() {
        eprintln!("{}", Args::usage());
        eprintln!("Choose one mode: -history, -last or -watch");
        process::exit(1);
    }

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let result = match config.mode {
        Mode::History | Mode::Last => {
            let mut reporter = Reporter::stdio(config.no_color);
            run_history(&config, &LogParser::new(), &mut reporter)
        }
        Mode::Watch => {
            let mut watcher = LiveWatcher::new(config.clone(), Reporter::stdio(config.no_color));
            watcher.run().await
        }
    };

    match result {
        Ok(_) => {
            info!("sshlogtool completed successfully");
            process::exit(0);
        }
        Err(e) => {
            let mut reporter = Reporter::stdio(config.no_color);
            let _ = reporter.print_error(&format!("{:#}", e));
            process::exit(1);
        }
    }
}
