//! # Subtree Command Implementation
//!
//! Commands that query or modify the subtree of the current subproject.
//!
//! `subtree checksum` compares the content hash of the subtree with the one
//! recorded in the metadata. The hash covers staged changes and excludes the
//! `patches` directory and the metadata file.

use anyhow::Result;
use clap::{Args, Subcommand};

use subpatch::error::Error;
use subpatch::exit_codes;
use subpatch::metadata::{self, Metadata};
use subpatch::settings::Settings;

use super::current_subproject;

#[derive(Subcommand, Debug)]
pub enum SubtreeCommands {
    /// Query or modify the checksum of the subtree
    Checksum(ChecksumArgs),
}

/// Exactly one of the modes must be given.
#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Print the checksum stored in the metadata
    #[arg(long)]
    pub get: bool,

    /// Calculate and print the checksum of the subtree
    #[arg(long)]
    pub calc: bool,

    /// Compare the checksum of the subtree with the metadata. Exits with 1 on
    /// mismatch.
    #[arg(long)]
    pub check: bool,

    /// Store the checksum of the subtree in the metadata
    #[arg(long)]
    pub write: bool,
}

/// Execute a `subtree` subcommand.
pub fn execute(command: SubtreeCommands, settings: &Settings) -> Result<u8> {
    match command {
        SubtreeCommands::Checksum(args) => checksum(args, settings),
    }
}

fn stored_checksum(metadata: Metadata) -> subpatch::error::Result<String> {
    metadata
        .checksum
        .ok_or_else(|| Error::invalid_argument("No checksum in metadata found!"))
}

fn checksum(args: ChecksumArgs, settings: &Settings) -> Result<u8> {
    let modes = [args.get, args.calc, args.check, args.write];
    if modes.iter().filter(|&&mode| mode).count() != 1 {
        return Err(
            Error::invalid_argument("You must exactly use one of --get, --calc, --write or --check!").into(),
        );
    }

    let (superx, _super_paths, sub_paths) = current_subproject()?;
    let helper = superx.helper();
    let sub = &sub_paths.super_to_sub_relpath;

    if args.get {
        let stored = stored_checksum(Metadata::read(&sub_paths.metadata_abspath)?)?;
        println!("{}", stored);
    } else if args.calc {
        println!("{}", helper.get_sha1_for_subtree(sub)?);
    } else if args.check {
        let calculated = helper.get_sha1_for_subtree(sub)?;
        let stored = stored_checksum(Metadata::read(&sub_paths.metadata_abspath)?)?;

        if calculated != stored {
            if !settings.quiet {
                println!(
                    "Subtree's checksum {} does not match checksum {} in the metadata.",
                    calculated, stored
                );
            }
            return Ok(exit_codes::CHECK_FAILED);
        }
        if !settings.quiet {
            println!("Subtree's checksum {} matches the metdata!", calculated);
        }
    } else {
        let calculated = helper.get_sha1_for_subtree(sub)?;
        metadata::write_checksum(&sub_paths.metadata_abspath, &calculated)?;
        helper.add(&[sub_paths.super_to_metadata_relpath()])?;
    }
    Ok(exit_codes::SUCCESS)
}
