// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Build automation and package tooling for Depot.
// Run with: cargo xtask <command>

mod commands;
mod helpers;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{ci, package};

#[derive(Parser)]
#[command(name = "xtask", version, about = "Build automation and package tooling")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build all crates in the workspace.
    Build,
    /// Run all tests in the workspace.
    Test,
    /// Run `cargo check` on all crates.
    Check,
    /// Format all code in the workspace.
    Format,
    /// Run clippy on all crates with warnings as errors.
    Clippy,
    /// Run all CI tasks (build, test, check, format, clippy).
    All,
    /// Pack a source directory into a package.
    Pack(package::PackArgs),
    /// Check a package's manifest and every bundle against their hashes.
    Verify(package::VerifyArgs),
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let Some(command) = Cli::parse().command else {
        println!("{}", helpers::BANNER);
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Build => ci::run(&ci::BUILD_TASK),
        Command::Test => ci::run(&ci::TEST_TASK),
        Command::Check => ci::run(&ci::CHECK_TASK),
        Command::Format => ci::run(&ci::FORMAT_TASK),
        Command::Clippy => ci::run(&ci::CLIPPY_TASK),
        Command::All => ci::all(),
        Command::Pack(args) => package::pack(args),
        Command::Verify(args) => package::verify(args),
    }
}
