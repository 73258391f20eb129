//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};

use subpatch::exit_codes;
use subpatch::settings::Settings;

use crate::commands;

/// subpatch - Adding subprojects into a git repo, the superproject
#[derive(Parser, Debug)]
#[command(name = "subpatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show more information, like homepage, repo and license
    #[arg(long)]
    info: bool,

    /// Suppress output to stdout
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        env = "SUBPATCH_LOG"
    )]
    log_level: String,

    /// Fetch branches and tags with their full history
    ///
    /// The env var accepts `1`, `yes`, `on` and `true`. Empty, `0`, `no`,
    /// `off` and `false` keep shallow fetches.
    #[arg(
        long,
        global = true,
        hide = true,
        env = "SUBPATCH_NO_SHALLOW_FETCH",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    no_shallow_fetch: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configure the superproject to use subpatch
    Configure(commands::configure::ConfigureArgs),

    /// Fetch and add a subproject
    Add(commands::add::AddArgs),

    /// Fetch and update a subproject
    Update(commands::update::UpdateArgs),

    /// List all subprojects
    List,

    /// Prints a summary of all subprojects
    Status,

    /// Apply a patch to the subtree and add it to the patch list
    Apply(commands::apply::ApplyArgs),

    /// Remove the topmost patch from the subtree
    Pop(commands::pop::PopArgs),

    /// Add the next patch to the subtree
    Push(commands::push::PushArgs),

    /// Update the diff of the current patch from the staging area
    Sync,

    /// Commands to modify or query the subtree of a subproject
    #[command(subcommand)]
    Subtree(commands::subtree::SubtreeCommands),
}

impl Cli {
    /// Execute the CLI command and return the process exit code.
    pub fn execute(self) -> Result<u8> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .init();

        let settings = Settings::default()
            .quiet(self.quiet)
            .shallow_fetch(!self.no_shallow_fetch);

        if self.info {
            show_info();
            return Ok(exit_codes::SUCCESS);
        }

        let Some(command) = self.command else {
            eprintln!("{}", Cli::command().render_help());
            return Ok(exit_codes::USAGE);
        };

        match command {
            Commands::Configure(args) => commands::configure::execute(args, &settings),
            Commands::Add(args) => commands::add::execute(args, &settings),
            Commands::Update(args) => commands::update::execute(args, &settings),
            Commands::List => commands::list::execute(&settings),
            Commands::Status => commands::status::execute(&settings),
            Commands::Apply(args) => commands::apply::execute(args, &settings),
            Commands::Pop(args) => commands::pop::execute(args, &settings),
            Commands::Push(args) => commands::push::execute(args, &settings),
            Commands::Sync => commands::sync::execute(&settings),
            Commands::Subtree(command) => commands::subtree::execute(command, &settings),
        }
    }
}

fn show_info() {
    println!("homepage:  https://subpatch.net");
    println!("git repo:  https://github.com/lengfeld/subpatch");
    println!("license:   {}", env!("CARGO_PKG_LICENSE"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["subpatch", "pop", "-a", "-q", "--log-level", "debug"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Some(Commands::Pop(ref args)) if args.all));
    }

    #[test]
    fn test_parse_subtree_checksum() {
        let cli = Cli::try_parse_from(["subpatch", "subtree", "checksum", "--check"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Subtree(_))));
    }

    #[test]
    fn test_no_shallow_fetch_flag_and_env() {
        let cli = Cli::try_parse_from(["subpatch", "--no-shallow-fetch", "list"]).unwrap();
        assert!(cli.no_shallow_fetch);

        // Only this test touches the variable
        std::env::set_var("SUBPATCH_NO_SHALLOW_FETCH", "1");
        let enabled = Cli::try_parse_from(["subpatch", "list"]).map(|cli| cli.no_shallow_fetch);
        std::env::set_var("SUBPATCH_NO_SHALLOW_FETCH", "0");
        let disabled = Cli::try_parse_from(["subpatch", "list"]).map(|cli| cli.no_shallow_fetch);
        std::env::remove_var("SUBPATCH_NO_SHALLOW_FETCH");

        assert!(enabled.unwrap());
        assert!(!disabled.unwrap());
    }

    #[test]
    fn test_parse_without_command() {
        let cli = Cli::try_parse_from(["subpatch"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.info);
    }
}
