//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pinchbar - Remap scroll, click and pinch gestures system-wide
#[derive(Parser, Debug)]
#[command(name = "pinchbar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the event tap and remap events until stopped
    Run {
        /// Stop after this many seconds (0 = until stopped)
        #[arg(short, long, default_value = "0")]
        duration: u64,

        /// Use this application's preset instead of following the frontmost app
        #[arg(short, long)]
        app: Option<String>,

        /// Log every event with its outputs
        #[arg(long)]
        log_events: bool,
    },

    /// Feed a JSON-lines event script through the engine
    Replay {
        /// Script file (stdin if omitted)
        input: Option<PathBuf>,

        /// Output file for the produced events (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Application whose preset is appended to the chain
        #[arg(short, long)]
        app: Option<String>,
    },

    /// List presets and their application assignments
    Presets {
        /// Show every flag entry of each preset
        #[arg(short, long)]
        detailed: bool,
    },

    /// Check Accessibility permissions
    Check {
        /// Ask the system to show the permission prompt
        #[arg(short, long)]
        prompt: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or check configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the default config file path
    Path,

    /// Validate a config file
    Validate {
        /// File to validate (the active config if omitted)
        file: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_run_command_with_defaults() {
        let cli = Cli::try_parse_from(["pinchbar", "run"]).unwrap();

        match cli.command {
            Commands::Run { duration, app, log_events } => {
                assert_eq!(duration, 0);
                assert!(app.is_none());
                assert!(!log_events);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_command_with_all_options() {
        let args = ["pinchbar", "run", "--duration", "30", "--app", "Cubase", "--log-events"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Run { duration, app, log_events } => {
                assert_eq!(duration, 30);
                assert_eq!(app.as_deref(), Some("Cubase"));
                assert!(log_events);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_replay_command() {
        let args = ["pinchbar", "replay", "script.jsonl", "-o", "out.jsonl", "-a", "Cubase"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Replay { input, output, app } => {
                assert_eq!(input, Some(PathBuf::from("script.jsonl")));
                assert_eq!(output, Some(PathBuf::from("out.jsonl")));
                assert_eq!(app.as_deref(), Some("Cubase"));
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_parse_replay_stdin() {
        let cli = Cli::try_parse_from(["pinchbar", "replay"]).unwrap();

        match cli.command {
            Commands::Replay { input, output, app } => {
                assert!(input.is_none());
                assert!(output.is_none());
                assert!(app.is_none());
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_parse_presets_and_check() {
        let cli = Cli::try_parse_from(["pinchbar", "presets", "-d"]).unwrap();
        assert!(matches!(cli.command, Commands::Presets { detailed: true }));

        let cli = Cli::try_parse_from(["pinchbar", "check", "--prompt"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { prompt: true }));
    }

    #[test]
    fn test_cli_parse_init_command() {
        let cli = Cli::try_parse_from(["pinchbar", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { force: true }));

        let cli = Cli::try_parse_from(["pinchbar", "init"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { force: false }));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["pinchbar", "-v", "-c", "/custom/config.toml", "presets"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));

        let cli = Cli::try_parse_from(["pinchbar", "run", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_config_actions() {
        let cli = Cli::try_parse_from(["pinchbar", "config", "show"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { action: ConfigAction::Show }));

        let cli = Cli::try_parse_from(["pinchbar", "config", "path"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { action: ConfigAction::Path }));

        let cli = Cli::try_parse_from(["pinchbar", "config", "validate", "my.toml"]).unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Validate { file },
            } => assert_eq!(file, Some(PathBuf::from("my.toml"))),
            _ => panic!("Expected Config Validate"),
        }
    }

    #[test]
    fn test_cli_invalid_command_fails() {
        assert!(Cli::try_parse_from(["pinchbar", "record"]).is_err());
        assert!(Cli::try_parse_from(["pinchbar", "config"]).is_err());
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for name in ["run", "replay", "presets", "check", "init", "config"] {
            assert!(subcommands.contains(&name), "missing {name}");
        }
        cmd.debug_assert();
    }
}
