/// abibind main entry point
use anyhow::Result;
use clap::Command;
use tracing_subscriber::EnvFilter;

use abibind_ethereum::codegen::cli::{
    build_generate_command, build_link_command, build_wait_command, handle_generate_command,
    handle_link_command, handle_wait_command,
};

fn cli() -> Command {
    Command::new("abibind")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Typed contract bindings and library-linking deployment for Ethereum ABIs")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(build_generate_command())
        .subcommand(build_link_command())
        .subcommand(build_wait_command())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so generated code can be piped from stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("generate", sub)) => handle_generate_command(sub).await?,
        Some(("link", sub)) => handle_link_command(sub).await?,
        Some(("wait", sub)) => handle_wait_command(sub).await?,
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_subcommands_registered() {
        let names: Vec<_> = cli().get_subcommands().map(|c| c.get_name().to_string()).collect();
        assert_eq!(names, ["generate", "link", "wait"]);
    }
}
