//! Developer CLI for sqlbridge.
//!
//! Runs SQL against a database image kept in a host directory, going
//! through the same provider, envelope and dispatcher an embedding host
//! uses. Result rows are printed as one JSON object per line.
//!
//! Usage:
//!   sqlbridge exec --dir ./data --db notes.db "SELECT * FROM notes"
//!   sqlbridge capabilities --unsupported

mod rows;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{bail, eyre, Result, WrapErr};
use sqlbridge_core::{ApiMember, BridgeConfig, DirImageStore, Provider};
use strum::IntoEnumIterator;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sqlbridge")]
#[command(about = "Run SQL through the sqlbridge host provider")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute SQL statements against a stored database image
    Exec {
        /// Directory holding database images
        #[arg(long, env = "SQLBRIDGE_DIR", value_name = "DIR")]
        dir: PathBuf,

        /// Storage name of the database
        #[arg(long, value_name = "NAME")]
        db: String,

        /// JSON bridge configuration file
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Statements to run, in order
        #[arg(required = true, value_name = "SQL")]
        sql: Vec<String>,
    },
    /// List native API members and whether the bridge routes them
    Capabilities {
        /// Only list members that are not routed
        #[arg(long)]
        unsupported: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Exec {
            dir,
            db,
            config,
            sql,
        } => {
            let config = config
                .as_deref()
                .map(load_config)
                .transpose()?
                .unwrap_or_default();
            exec(&dir, &db, config, &sql, &mut out)
        }
        Command::Capabilities { unsupported } => capabilities(unsupported, &mut out),
    }
}

fn load_config(path: &Path) -> Result<BridgeConfig> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config '{}'", path.display()))?;
    BridgeConfig::from_json(&text)
        .wrap_err_with(|| format!("failed to parse config '{}'", path.display()))
}

/// Opens `name` under `dir`, runs every statement and closes it again.
///
/// The database is closed even when a statement fails, so changes made by
/// earlier statements still reach storage.
fn exec<W: Write>(
    dir: &Path,
    name: &str,
    config: BridgeConfig,
    sql: &[String],
    out: &mut W,
) -> Result<()> {
    let store = DirImageStore::new(dir)
        .wrap_err_with(|| format!("cannot use image directory '{}'", dir.display()))?;
    let mut provider = Provider::in_process(Arc::new(store), config);
    let db = provider
        .open(name)
        .into_result()
        .map_err(|code| eyre!("open {name} failed with {code}"))?;
    info!("opened {name} in {}", dir.display());

    let result = sql
        .iter()
        .try_for_each(|statement| rows::run(&mut provider, db, statement, &mut *out));
    let code = provider.close(db);
    result?;
    if !code.is_ok() {
        bail!("close {name} failed with {code}");
    }
    Ok(())
}

fn capabilities<W: Write>(only_unsupported: bool, out: &mut W) -> Result<()> {
    for member in ApiMember::iter() {
        let supported = member.is_supported();
        if only_unsupported && supported {
            continue;
        }
        let status = if supported { "bridged" } else { "unsupported" };
        writeln!(out, "{}\t{status}", member.symbol())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(dir: &Path, sql: &[&str]) -> Vec<serde_json::Value> {
        let sql: Vec<String> = sql.iter().map(ToString::to_string).collect();
        let mut out = Vec::new();
        exec(dir, "cli.db", BridgeConfig::default(), &sql, &mut out).expect("exec");
        String::from_utf8(out)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json row"))
            .collect()
    }

    #[test]
    fn test_exec_prints_rows_and_persists() {
        let dir = tempfile::tempdir().expect("temp dir");
        let rows = run(
            dir.path(),
            &[
                "CREATE TABLE t (id INTEGER PRIMARY KEY, body TEXT, data BLOB, score REAL)",
                "INSERT INTO t (body, data, score) VALUES ('hi', x'dead', 1.5)",
            ],
        );
        assert!(rows.is_empty());

        let rows = run(dir.path(), &["SELECT id, body, data, score, NULL AS empty FROM t"]);
        assert_eq!(
            rows,
            vec![serde_json::json!({
                "id": 1,
                "body": "hi",
                "data": "dead",
                "score": 1.5,
                "empty": null,
            })]
        );
    }

    #[test]
    fn test_failed_statement_keeps_earlier_changes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sql = vec![
            "CREATE TABLE t (v INTEGER)".to_string(),
            "INSERT INTO missing VALUES (1)".to_string(),
        ];
        let mut out = Vec::new();
        let err = exec(dir.path(), "cli.db", BridgeConfig::default(), &sql, &mut out)
            .expect_err("second statement fails");
        assert!(err.to_string().contains("no such table"), "{err}");

        let rows = run(dir.path(), &["SELECT count(*) AS n FROM t"]);
        assert_eq!(rows, vec![serde_json::json!({ "n": 0 })]);
    }

    #[test]
    fn test_read_only_open_of_missing_image_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = BridgeConfig::from_json(r#"{"open_mode":"read_only"}"#).expect("config");
        let mut out = Vec::new();
        let err = exec(dir.path(), "absent.db", config, &["SELECT 1".to_string()], &mut out)
            .expect_err("nothing to open");
        assert!(err.to_string().contains("absent.db"), "{err}");
    }

    #[test]
    fn test_capabilities_filter() {
        let mut out = Vec::new();
        capabilities(true, &mut out).expect("capabilities");
        let listing = String::from_utf8(out).expect("utf-8 output");
        assert!(listing.contains("sqlite3_exec\tunsupported"));
        assert!(!listing.contains("bridged"));

        let mut out = Vec::new();
        capabilities(false, &mut out).expect("capabilities");
        let listing = String::from_utf8(out).expect("utf-8 output");
        assert!(listing.contains("sqlite3_prepare_v2\tbridged"));
    }
}
