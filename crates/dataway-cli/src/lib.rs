//! `dataway` command-line utilities.
//!
//! This crate powers the `dataway` binary (see `crates/dataway-cli/src/main.rs`).
//! The public surface is intentionally small: most logic lives in internal modules and is
//! dispatched from [`run`].

mod analyze;
mod cli;
mod config;
mod gen_check;
mod init;
mod migrate_cmd;
mod queries;
mod schema;
mod sql_check;
mod sql_validate;

/// Runs the `dataway` CLI with an argv-style argument list.
///
/// Most callers should pass `std::env::args().collect()`.
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Gen(cmd) => match cmd {
            cli::GenCommand::Check(args) => gen_check::run(args).await,
            cli::GenCommand::Init(args) => init::run(args),
            cli::GenCommand::Schema(args) => schema::run(args).await,
        },
        cli::Command::Sql(cmd) => match cmd {
            cli::SqlCommand::Check(args) => sql_check::run(args).await,
        },
        cli::Command::Migrate(cmd) => migrate_cmd::run(cmd).await,
    }
}
