// Entry point and high-level CLI flow.
//
// - Option [1] loads both datasets and prints load diagnostics.
// - Option [2] renders every view, writes one CSV per view and summary.json.
// - Option [3] runs the data explorer on the transaction table.
// - Option [4] exports the transaction table as loaded.
// With `--report` the binary loads, runs option [2] once and exits.
use anyhow::{Context, Result};
use branch_report::cli::Args;
use branch_report::config::{Config, DEFAULT_CONFIG_FILE};
use branch_report::error::Condition;
use branch_report::explore::{numeric_columns, ChartKind, ExploreRequest};
use branch_report::loader::{self, LoadReport};
use branch_report::output;
use branch_report::schema;
use branch_report::table::Table;
use branch_report::types::{DescribeRow, Outcome, TestResultRow};
use branch_report::util;
use branch_report::views::{self, CatalogEntry};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The two tables of a session. Loaded once, read by every view.
struct Datasets {
    transactions: Table,
    sme: Table,
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Ask a yes/no question until the answer is `Y` or `N`.
fn prompt_yes_no(question: &str) -> bool {
    loop {
        let resp = prompt(&format!("{} (Y/N): ", question)).to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }
    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;
    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

fn print_load_report(label: &str, report: &LoadReport) {
    match &report.condition {
        Some(condition) => println!("Warning: {} ({}). Continuing without it.", condition, label),
        None => {
            println!(
                "Processing {}... ({} rows, {} columns loaded)",
                label,
                util::format_int(report.total_rows),
                report.columns
            );
            if report.invalid_dates > 0 {
                println!(
                    "Note: {} rows have an unparseable date and are left out of date views.",
                    util::format_int(report.invalid_dates)
                );
            }
            if report.skipped_rows > 0 {
                println!(
                    "Note: {} rows skipped due to parse errors.",
                    util::format_int(report.skipped_rows)
                );
            }
        }
    }
}

/// Handle option [1]: load both datasets.
fn handle_load(config: &Config) -> Datasets {
    let options = config.loader_options();
    let (transactions, tx_report) = loader::load(&config.sources.transactions, &options);
    print_load_report("transactions", &tx_report);
    let (sme, sme_report) = loader::load(&config.sources.sme, &options);
    print_load_report("SME loans", &sme_report);
    println!();
    Datasets { transactions, sme }
}

fn output_dir(config: &Config) -> Result<PathBuf> {
    let dir = PathBuf::from(&config.report.output_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(dir)
}

fn render_catalog(entries: &[CatalogEntry], dir: &Path, preview_rows: usize) {
    for (key, result) in entries {
        match result {
            Ok(view) => {
                let file = dir.join(format!("view_{}.csv", key.as_str()));
                if let Err(e) = output::write_table_csv(&file, &view.table) {
                    error!("Write error: {}", e);
                }
                output::preview_view(view, preview_rows);
                println!("(Full table exported to {})\n", file.display());
            }
            Err(condition) => {
                println!("{}", key.title());
                println!("Unavailable: {}\n", condition);
            }
        }
    }
}

fn print_summary_tables<T>(title: &str, outcome: &Outcome<T>, rows: Vec<DescribeRow>) {
    println!("{}\n", title);
    match outcome {
        Outcome::Value(_) => output::preview_table_rows(&rows, rows.len()),
        Outcome::Unavailable(reason) => println!("N/A ({})\n", reason),
    }
}

/// Handle option [2]: render every view, write the CSVs and summary.json.
fn handle_generate_reports(data: &Datasets, config: &Config) -> Result<()> {
    let dir = output_dir(config)?;
    let opts = config.view_options();
    let preview_rows = config.report.preview_rows;

    println!("Generating reports...");
    println!("Outputs saved to {}\n", dir.display());

    println!("== Transactions ==\n");
    render_catalog(&views::transaction_views(&data.transactions, &opts), &dir, preview_rows);
    println!("== SME Loans ==\n");
    render_catalog(&views::sme_views(&data.sme, &opts), &dir, preview_rows);

    let summary = views::summary_report(&data.transactions, &data.sme);
    println!("== Summary Statistics ==\n");
    let overall: Vec<DescribeRow> = [
        ("transaction amount", summary.transactions.numeric(schema::AMOUNT)),
        ("loan amount", summary.sme.numeric(schema::LOAN_AMOUNT)),
        ("credit score", summary.sme.numeric(schema::CREDIT_SCORE)),
    ]
    .into_iter()
    .filter_map(|(label, stats)| stats.map(|s| DescribeRow::new(label.to_string(), s)))
    .collect();
    println!("Numeric Columns\n");
    output::preview_table_rows(&overall, overall.len());
    for column in schema::SUMMARIZED_CATEGORICALS {
        if let Some(counts) = summary.transactions.categorical(column) {
            let line: Vec<String> = counts
                .iter()
                .map(|c| format!("{} {}", c.value, util::format_int(c.count)))
                .collect();
            println!("{}: {}", column, line.join(", "));
        }
    }
    println!();

    let payroll_rows = match &summary.payroll_amounts {
        Outcome::Value(s) => vec![DescribeRow::new("payroll amount".to_string(), s)],
        Outcome::Unavailable(_) => Vec::new(),
    };
    print_summary_tables("Payroll Amounts", &summary.payroll_amounts, payroll_rows);
    let loan_rows = match &summary.loan_amounts {
        Outcome::Value(s) => vec![DescribeRow::new("loan amount".to_string(), s)],
        Outcome::Unavailable(_) => Vec::new(),
    };
    print_summary_tables("SME Loan Amounts", &summary.loan_amounts, loan_rows);
    let channel_rows = match &summary.amount_by_channel {
        Outcome::Value(groups) => groups.iter().map(DescribeRow::from).collect(),
        Outcome::Unavailable(_) => Vec::new(),
    };
    print_summary_tables(
        "Transaction Amounts by Channel",
        &summary.amount_by_channel,
        channel_rows,
    );

    println!("Mine Employees vs Others (Welch t-test on amount)\n");
    match &summary.mine_employee_t_test {
        Outcome::Value(r) => output::preview_table_rows(&[TestResultRow::from(r)], 1),
        Outcome::Unavailable(reason) => println!("N/A ({})\n", reason),
    }

    let summary_file = dir.join("summary.json");
    if let Err(e) = output::write_json(&summary_file, &summary) {
        error!("Write error: {}", e);
    }
    println!("(Summary statistics exported to {})\n", summary_file.display());
    Ok(())
}

fn ask_request(table: &Table) -> Result<ExploreRequest, Condition> {
    println!("Columns: {}", table.column_names().join(", "));
    println!("Numeric: {}", numeric_columns(table).join(", "));
    let x = prompt("X-axis: ");
    let y = prompt("Y-axis (blank for none): ");
    let y = if y.is_empty() { None } else { Some(y) };

    let names: Vec<&str> = ChartKind::ALL.iter().map(|k| k.name()).collect();
    let kind = loop {
        match prompt(&format!("Chart type [{}]: ", names.join("/"))).parse::<ChartKind>() {
            Ok(k) => break k,
            Err(e) => println!("{}", e),
        }
    };
    let cumulative = prompt_yes_no("Cumulative");
    ExploreRequest::new(x, y, kind.semantics(cumulative))
}

/// Handle option [3]: one explorer request over the transaction table.
fn handle_explore(data: &Datasets, config: &Config) -> Result<()> {
    if data.transactions.width() == 0 {
        println!("Warning: the transaction table is empty; nothing to explore.\n");
        return Ok(());
    }
    let view = match ask_request(&data.transactions)
        .and_then(|req| views::explore_view(&data.transactions, &req))
    {
        Ok(v) => v,
        Err(condition) => {
            warn!("Explorer request rejected: {}", condition);
            println!("Warning: {}\n", condition);
            return Ok(());
        }
    };
    println!();
    output::preview_view(&view, config.report.preview_rows);
    let file = output_dir(config)?.join("view_explore.csv");
    if let Err(e) = output::write_table_csv(&file, &view.table) {
        error!("Write error: {}", e);
    }
    println!("(Full table exported to {})\n", file.display());
    Ok(())
}

/// Handle option [4]: write the transaction table exactly as loaded.
fn handle_export(data: &Datasets, config: &Config) -> Result<()> {
    let file = output_dir(config)?.join("transactions_export.csv");
    output::write_table_csv(&file, &data.transactions)
        .with_context(|| format!("Failed to export {}", file.display()))?;
    println!(
        "Exported {} transactions to {}\n",
        util::format_int(data.transactions.len()),
        file.display()
    );
    Ok(())
}

fn run_menu(config: &Config) -> Result<()> {
    let mut data: Option<Datasets> = None;
    loop {
        println!("Select an option:");
        println!("[1] Load the files");
        println!("[2] Generate Reports");
        println!("[3] Explore the Data");
        println!("[4] Export Transactions");
        println!("[0] Exit\n");
        let choice = read_choice();
        debug!("Menu choice: {}", choice);
        match (choice.as_str(), &data) {
            ("1", _) => data = Some(handle_load(config)),
            ("0", _) => {
                println!("Exiting the program.");
                return Ok(());
            }
            ("2" | "3" | "4", None) => {
                println!("Error: No data loaded. Please load the files first (option 1).\n");
            }
            ("2", Some(d)) => {
                println!();
                handle_generate_reports(d, config)?;
                if !prompt_yes_no("Back to Report Selection") {
                    println!("Exiting the program.");
                    return Ok(());
                }
            }
            ("3", Some(d)) => handle_explore(d, config)?,
            ("4", Some(d)) => handle_export(d, config)?,
            _ => println!("Invalid choice. Please enter 0-4.\n"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse_args();
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    if args.init_config {
        return handle_init_config();
    }
    init_logging(&args)?;

    let config = Config::resolve(&args)?;
    info!(
        "Sources: transactions={} sme={}",
        config.sources.transactions, config.sources.sme
    );

    if args.report {
        let data = handle_load(&config);
        return handle_generate_reports(&data, &config);
    }
    run_menu(&config)
}
