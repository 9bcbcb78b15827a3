use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::PathBuf;

use bank_ledger::config::Config;
use bank_ledger::logging::init_logging;
use bank_ledger::{
    insert_transactions, list_transactions, load_csv, open_database, verify_count, write_csv,
    FixedTenant, ListParams, SqliteStore,
};

#[derive(Parser, Debug)]
#[command(name = "bank-ledger", version, about = "Import, list and export bank transactions")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "bank-ledger.toml")]
    config: PathBuf,

    /// SQLite database (overrides config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Organization to scope listings to (overrides config file)
    #[arg(long)]
    company: Option<String>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a bank feed CSV; rows already present are skipped
    Import { csv: PathBuf },

    /// Print matching transactions as JSON
    List(FilterArgs),

    /// Write matching transactions as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Bank account name contains
    #[arg(long, default_value = "")]
    name: String,

    /// Description contains (legacy)
    #[arg(long, default_value = "")]
    filter: String,

    /// all, unmatched, matched, converted, deposits, withdrawals (comma separated)
    #[arg(long, default_value = "")]
    client_status: String,

    /// active, archived, deleted (comma separated)
    #[arg(long, default_value = "")]
    status: String,

    /// column|asc or column|desc
    #[arg(long, default_value = "")]
    sort: String,
}

impl From<FilterArgs> for ListParams {
    fn from(args: FilterArgs) -> Self {
        ListParams {
            name: args.name,
            filter: args.filter,
            client_status: args.client_status,
            status: args.status,
            sort: args.sort,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    if let Some(company) = cli.company {
        config.tenant.company_id = Some(company);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging);

    match cli.command {
        Command::Import { csv } => run_import(&config, csv),
        Command::List(filters) => run_list(&config, filters.into()),
        Command::Export { filters, output } => run_export(&config, filters.into(), output),
    }
}

fn tenant(config: &Config) -> Result<FixedTenant> {
    match &config.tenant.company_id {
        Some(company_id) => Ok(FixedTenant::new(company_id.clone())),
        None => bail!("no organization given: pass --company or set tenant.company_id"),
    }
}

fn run_import(config: &Config, csv_path: PathBuf) -> Result<()> {
    let transactions = load_csv(&csv_path)?;
    println!("✓ Loaded {} transactions from {:?}", transactions.len(), csv_path);

    let conn = open_database(&config.database.path)?;
    let summary = insert_transactions(&conn, &transactions)?;
    println!("✓ Inserted: {} transactions", summary.inserted);
    println!("✓ Skipped duplicates: {}", summary.duplicates);

    let count = verify_count(&conn)?;
    println!("✓ Database contains {} transactions", count);

    Ok(())
}

fn run_list(config: &Config, params: ListParams) -> Result<()> {
    let scope = tenant(config)?;
    let conn = open_database(&config.database.path)?;
    let transactions = list_transactions(&SqliteStore::new(&conn), &scope, &params)?;

    println!("{}", serde_json::to_string_pretty(&transactions)?);
    Ok(())
}

fn run_export(config: &Config, params: ListParams, output: Option<PathBuf>) -> Result<()> {
    let scope = tenant(config)?;
    let conn = open_database(&config.database.path)?;
    let transactions = list_transactions(&SqliteStore::new(&conn), &scope, &params)?;

    match output {
        Some(path) => {
            write_csv(File::create(&path)?, &transactions)?;
            eprintln!("✓ Exported {} transactions to {:?}", transactions.len(), path);
        }
        None => write_csv(io::stdout().lock(), &transactions)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_filters() {
        let cli = Cli::try_parse_from([
            "bank-ledger",
            "--company",
            "acme",
            "list",
            "--client-status",
            "matched,deposits",
            "--sort",
            "deposit|asc",
        ])
        .unwrap();

        assert_eq!(cli.company.as_deref(), Some("acme"));
        match cli.command {
            Command::List(filters) => {
                let params: ListParams = filters.into();
                assert_eq!(params.client_status, "matched,deposits");
                assert_eq!(params.sort, "deposit|asc");
                assert_eq!(params.name, "");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_tenant_required() {
        assert!(tenant(&Config::default()).is_err());
    }
}
