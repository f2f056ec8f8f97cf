use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use tfl_gate::StaticIdentity;
use tfl_ledger::{Chaincode, IndexReport, LedgerConfig};
use tfl_store::FileLedgerStore;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    let store = FileLedgerStore::open(&cli.store)
        .with_context(|| format!("opening ledger state {}", cli.store.display()))?;
    let identity = StaticIdentity::new(cli.principal.clone().unwrap_or_default());
    let chaincode = Chaincode::new(Arc::new(store), Arc::new(identity), config)?;

    match cli.command {
        Command::Init(args) => cmd_init(&chaincode, &args, cli.format),
        Command::Invoke(call) => {
            let out = chaincode.invoke(&call.function, &call.args)?;
            print_output(&call.function, &out, cli.format)
        }
        Command::Query(call) => {
            let out = chaincode.query(&call.function, &call.args)?;
            print_output(&call.function, &out, cli.format)
        }
        Command::Index(args) => cmd_index(&chaincode, args.action, cli.format),
    }
}

fn cmd_init(chaincode: &Chaincode, args: &InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    chaincode.init(&args.participants)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "participants": args.participants.len() / 2 })),
        OutputFormat::Text => {
            println!("{} Ledger initialised", "✓".green().bold());
            for pair in args.participants.chunks(2) {
                println!("  {} {}", pair[0].bold(), pair[1].cyan());
            }
        }
    }
    Ok(())
}

fn cmd_index(chaincode: &Chaincode, action: IndexAction, format: OutputFormat) -> anyhow::Result<()> {
    let (report, rebuilt) = match action {
        IndexAction::Verify { target: IndexTarget::Accounts } => (chaincode.accounts().verify_index()?, false),
        IndexAction::Verify { target: IndexTarget::Invoices } => (chaincode.invoices().verify_index()?, false),
        IndexAction::Rebuild { target: IndexTarget::Accounts } => (chaincode.accounts().rebuild_index()?, true),
        IndexAction::Rebuild { target: IndexTarget::Invoices } => (chaincode.invoices().rebuild_index()?, true),
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, rebuilt),
    }
    Ok(())
}

fn print_report(report: &IndexReport, rebuilt: bool) {
    if report.is_consistent() {
        println!("{} Index {} is consistent", "✓".green().bold(), report.index.bold());
        return;
    }
    let verdict = if rebuilt { "rebuilt".green() } else { "diverges".red() };
    println!("Index {} {}", report.index.bold(), verdict);
    for id in &report.missing {
        println!("  {} {}", "missing:".yellow(), id);
    }
    for id in &report.dangling {
        println!("  {} {}", "dangling:".red(), id);
    }
    for id in &report.duplicates {
        println!("  {} {}", "duplicate:".red(), id);
    }
}

fn print_output(function: &str, out: &[u8], format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render(function, out, format)?);
    Ok(())
}

/// Format a function result. JSON results are pretty-printed; anything else
/// is shown as text, or as a JSON string in JSON mode.
fn render(function: &str, out: &[u8], format: OutputFormat) -> anyhow::Result<String> {
    let parsed = serde_json::from_slice::<serde_json::Value>(out).ok();
    let text = String::from_utf8_lossy(out);
    Ok(match (format, parsed) {
        (OutputFormat::Json, Some(value)) => serde_json::to_string_pretty(&value)?,
        (OutputFormat::Json, None) if out.is_empty() => "null".to_string(),
        (OutputFormat::Json, None) => serde_json::to_string(&text)?,
        (OutputFormat::Text, Some(value)) => serde_json::to_string_pretty(&value)?,
        (OutputFormat::Text, None) if out.is_empty() => {
            format!("{} {}", "✓".green().bold(), function)
        }
        (OutputFormat::Text, None) => text.into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_formats() {
        colored::control::set_override(false);
        assert_eq!(render("ping", b"Hello, world!", OutputFormat::Text).unwrap(), "Hello, world!");
        assert_eq!(
            render("ping", b"Hello, world!", OutputFormat::Json).unwrap(),
            "\"Hello, world!\""
        );
        assert_eq!(render("write", b"", OutputFormat::Json).unwrap(), "null");
        assert_eq!(render("write", b"", OutputFormat::Text).unwrap(), "✓ write");
        assert_eq!(render("delete", b"true", OutputFormat::Text).unwrap(), "true");
    }

    #[test]
    fn end_to_end_against_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let open = |who: &str| {
            let store = FileLedgerStore::open(&path).unwrap();
            Chaincode::new(
                Arc::new(store),
                Arc::new(StaticIdentity::new(who)),
                LedgerConfig::default(),
            )
            .unwrap()
        };
        let args = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        open("").init(&args(&["s", "supplier", "y", "payer"])).unwrap();
        open("")
            .invoke("create_invoice", &args(&["INV1", "100.00", "s", "y"]))
            .unwrap();
        let out = open("").query("get_invoices", &args(&["y"])).unwrap();
        let listed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(listed[0]["invoiceid"], "INV1");
        assert_eq!(listed[0]["buyer"], "UNDEFINED");
    }
}
