use std::io::IsTerminal;
use std::panic;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::FmtSubscriber;

mod args;
mod replay;
mod stress;
mod validators;

use crate::args::CliArgs;
use crate::args::Commands;
use crate::args::LoggingLevel;
use crate::stress::StressConfig;

/// Exit the main thread if any thread panics. A panicking worker may have
/// left the store half updated, so carrying on would only hide it.
fn panic_thread_hook() {
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        std::process::exit(1);
    }));
}

/// Starts `parking_lot`'s deadlock detector.
fn start_deadlock_detector() {
    std::thread::spawn(move || loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
        for deadlock in parking_lot::deadlock::check_deadlock() {
            for deadlock in deadlock {
                eprintln!(
                    "Found a deadlock! {:?}: {:?}",
                    deadlock.thread_id(),
                    deadlock.backtrace()
                );
            }
        }
    });
}

fn main() -> anyhow::Result<()> {
    panic_thread_hook();
    let args = CliArgs::parse();
    if args.enable_deadlock_detector {
        start_deadlock_detector();
    }

    let level_filter = match args.logging {
        LoggingLevel::Trace => Level::TRACE,
        LoggingLevel::Debug => Level::DEBUG,
        LoggingLevel::Info => Level::INFO,
        LoggingLevel::Warn => Level::WARN,
        LoggingLevel::Error => Level::ERROR,
    };

    // Logs go to stderr so stdout only carries the exposition.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Commands::Replay { metric, path } => {
            let exposition = replay::run(metric.opts(), &path)?;
            print!("{exposition}");
        }
        Commands::Stress {
            duration,
            writers,
            group_deleters,
            index_deleters,
        } => {
            let summary = stress::run(&StressConfig {
                duration,
                writers,
                group_deleters,
                index_deleters,
            })?;
            println!(
                "operations={} removed={} indexed={} exported={}",
                summary.operations, summary.removed, summary.indexed, summary.exported
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_cmd::Command;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert()
    }

    #[test]
    fn cli_replay() {
        let mut operations = tempfile::NamedTempFile::new().unwrap();
        writeln!(operations, "# two conditions, one removed").unwrap();
        writeln!(operations, "set-group 1 ctrl;Ready;True,Reconciled").unwrap();
        writeln!(operations, "set-group 1 ctrl;Ready;False,Failed").unwrap();
        writeln!(operations, "set-group 1 ctrl;Synced;True,Reconciled").unwrap();
        writeln!(operations, "delete-group ctrl;Synced").unwrap();

        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.args([
            "--logging",
            "error",
            "replay",
            "--namespace",
            "demo",
            "--name",
            "condition",
            "--outer-labels",
            "controller",
            "--sub-labels",
            "condition",
            "--extra-labels",
            "status,reason",
            "--path",
        ])
        .arg(operations.path());

        let output = cmd.assert().success().get_output().stdout.clone();
        let actual = String::from_utf8(output).unwrap();
        insta::assert_snapshot!(actual, @r###"
        # HELP demo_condition Series replayed by gaugevecset
        # TYPE demo_condition gauge
        demo_condition{condition="Ready",controller="ctrl",reason="Failed",status="False"} 1
        "###);
    }

    #[test]
    fn cli_replay_missing_file() {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.args([
            "replay",
            "--name",
            "condition",
            "--outer-labels",
            "controller",
            "--path",
            "/nonexistent/operations.txt",
        ]);
        cmd.assert().failure();
    }

    #[rstest]
    // The case tuples are: (duration to try, error string - if expected)
    #[case::one_second("1", "")]
    #[case::zero("0", "duration must be at least one second")]
    #[case::not_a_number("soon", "`soon' isn't a valid number of seconds")]
    #[trace]
    fn stress_duration(#[case] duration: String, #[case] expected_msg: String) {
        let execname = env!("CARGO_PKG_NAME");
        let myargs = vec![execname, "stress", "--duration", duration.as_str()];
        let result = CliArgs::try_parse_from(myargs.iter());
        match result {
            Ok(config) => match config.command {
                Commands::Stress { duration: d, .. } => {
                    assert_eq!(d.as_secs(), duration.parse::<u64>().unwrap());
                }
                other => panic!("unexpected command {:?}", other),
            },
            Err(err) => {
                let actual_message = err.to_string();
                assert!(actual_message.contains(expected_msg.as_str()));
            }
        }
    }

    #[test]
    fn stress_defaults() {
        let config = CliArgs::try_parse_from(["gaugevecset", "stress"]).unwrap();
        let defaults = StressConfig::default();
        match config.command {
            Commands::Stress {
                duration,
                writers,
                group_deleters,
                index_deleters,
            } => {
                assert_eq!(duration, defaults.duration);
                assert_eq!(writers, defaults.writers);
                assert_eq!(group_deleters, defaults.group_deleters);
                assert_eq!(index_deleters, defaults.index_deleters);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
