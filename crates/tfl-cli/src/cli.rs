use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tfl",
    about = "Trade Finance Ledger: accounts, invoices, and trade offers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ledger state file
    #[arg(long, global = true, default_value = "tfl-state.json")]
    pub store: PathBuf,

    /// TOML ledger configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Principal making the call
    #[arg(long = "as", global = true, value_name = "PRINCIPAL")]
    pub principal: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reset the indexes and register participants
    Init(InitArgs),
    /// Call a mutating function
    Invoke(CallArgs),
    /// Call a read-only function
    Query(CallArgs),
    /// Verify or rebuild an index
    Index(IndexArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Alternating NAME ROLE pairs, e.g. `alice supplier bob buyer`
    pub participants: Vec<String>,
}

#[derive(Args)]
pub struct CallArgs {
    pub function: String,
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand)]
pub enum IndexAction {
    /// Compare an index with the stored records
    Verify { target: IndexTarget },
    /// Rewrite an index from the stored records
    Rebuild { target: IndexTarget },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum IndexTarget {
    Accounts,
    Invoices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_invoke_with_negative_amount() {
        let cli = Cli::try_parse_from([
            "tfl", "--as", "alice", "invoke", "transfer_balance", "A001", "B001", "-5",
        ])
        .unwrap();
        assert_eq!(cli.principal.as_deref(), Some("alice"));
        match cli.command {
            Command::Invoke(call) => {
                assert_eq!(call.function, "transfer_balance");
                assert_eq!(call.args, vec!["A001", "B001", "-5"]);
            }
            _ => panic!("expected invoke"),
        }
    }

    #[test]
    fn parses_index_and_globals() {
        let cli = Cli::try_parse_from([
            "tfl", "index", "rebuild", "invoices", "--store", "s.json", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.store, PathBuf::from("s.json"));
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Command::Index(IndexArgs {
                action: IndexAction::Rebuild {
                    target: IndexTarget::Invoices
                }
            })
        ));
    }
}
