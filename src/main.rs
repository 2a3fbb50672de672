mod cli;

use chrono::{Local, NaiveDate};
use clap::Parser;
use cli::{Cli, Commands, OutputFormat, QuoteKind, StatusFilter, SweepKind};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use tracing::{error, info};

use renewal_tracker::{
    config::Config,
    documents::DocumentMapper,
    error::{self, TrackerError},
    renewal::{self, BatchReclassifier, RenewalLifecycle, RenewalStage, SweepMode},
    storage::{Database, DocStatus, RenewalRecord},
    utils,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("renewal_tracker=debug,info")
        .init();

    let cli = Cli::parse();

    let config = match Config::load_from(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let today = Local::now().date_naive();

    let result = match cli.command {
        Commands::Init => initialize(&config),
        Commands::Company { name, currency } => add_company(&config, &name, &currency),
        Commands::Rate { from, to, rate } => add_rate(&config, &from, &to, &rate),
        Commands::Save { file } => {
            info!("Saving record from {}", file);
            save_record(&config, &file, today)
        }
        Commands::Submit { name } => {
            info!("Submitting {}", name);
            submit_record(&config, &name, today)
        }
        Commands::Cancel { name, yes } => cancel_record(&config, &name, yes),
        Commands::Show { name, format } => show_record(&config, &name, format),
        Commands::List { stage, status, format } => list_records(&config, stage, status, format),
        Commands::Stage { name } => update_stage(&config, &name, today),
        Commands::Sweep { mode, format } => {
            info!("Running stage sweep...");
            run_sweep(&config, mode, format, today)
        }
        Commands::Quote { name, kind } => make_quote(&config, &name, kind, today),
        Commands::Stats { format } => show_stats(&config, format),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn open_db(config: &Config) -> error::Result<Database> {
    Database::new(&config.database.path)
}

fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Initializing renewal tracker...".green());
    let _db = open_db(config)?;
    println!("{}", "✓ Database initialized".green());
    println!("{}", "✓ Configuration loaded".green());
    println!("\n{}", "Configuration:".cyan());
    println!("  Database:             {}", config.database.path);
    println!("  Full checkpoint:      every {} records", config.sweep.full_commit_interval);
    println!("  Critical checkpoint:  every {} records", config.sweep.critical_commit_interval);
    println!("  Critical window:      {} days", config.sweep.critical_window_days);
    println!("  RFQ schedule:         +{} days", config.documents.rfq_schedule_days);
    println!("  Quotation validity:   {} days", config.documents.quotation_validity_days);

    println!("\n{}", "Next steps:".cyan());
    println!("  {} to register a company", "renewal-tracker company \"Ostec Ltd\" GHS".yellow());
    println!("  {} to store a rate", "renewal-tracker rate USD GHS 15.5".yellow());
    println!("  {} to save a record", "renewal-tracker save record.json".yellow());
    Ok(())
}

fn add_company(config: &Config, name: &str, currency: &str) -> error::Result<()> {
    let db = open_db(config)?;
    db.upsert_company(name, &currency.to_uppercase())?;
    println!("✓ Company {} uses {}", name.cyan(), currency.to_uppercase());
    Ok(())
}

fn add_rate(config: &Config, from: &str, to: &str, rate: &str) -> error::Result<()> {
    let rate: Decimal = rate
        .parse()
        .map_err(|e| TrackerError::Other(anyhow::anyhow!("Invalid exchange rate {}: {}", rate, e)))?;
    if rate <= Decimal::ZERO {
        return Err(TrackerError::Other(anyhow::anyhow!("Exchange rate must be positive")));
    }

    let db = open_db(config)?;
    db.upsert_exchange_rate(&from.to_uppercase(), &to.to_uppercase(), rate)?;
    println!("✓ 1 {} = {} {}", from.to_uppercase(), rate, to.to_uppercase());
    Ok(())
}

fn save_record(config: &Config, file: &str, today: NaiveDate) -> error::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let mut record: RenewalRecord = serde_json::from_str(&content)?;

    let db = open_db(config)?;
    RenewalLifecycle::new(&db).save(&mut record, today)?;

    println!("{} {}", "✓ Saved".green(), record.name.cyan());
    println!("  Exchange rate:  {}", record.exchange_rate.unwrap_or(Decimal::ONE));
    println!("  Net total:      {}", utils::format_money(record.net_total, &record.currency));
    println!("  Net total base: {}", utils::format_money(record.net_total_base, "(base)"));
    Ok(())
}

fn submit_record(config: &Config, name: &str, today: NaiveDate) -> error::Result<()> {
    let db = open_db(config)?;
    let record = RenewalLifecycle::new(&db).submit(name, today)?;

    println!("{} {}", "✓ Submitted".green(), record.name.cyan());
    println!("  Stage:          {}", utils::format_stage(record.renewal_stage));
    println!("  Days remaining: {}", utils::format_days_remaining(record.days_remaining));
    Ok(())
}

fn cancel_record(config: &Config, name: &str, yes: bool) -> error::Result<()> {
    if !yes && !utils::confirm_action(&format!("Cancel {}?", name)) {
        println!("Aborted");
        return Ok(());
    }

    let db = open_db(config)?;
    RenewalLifecycle::new(&db).cancel(name)?;
    println!("{} {}", "✓ Cancelled".yellow(), name);
    Ok(())
}

fn show_record(config: &Config, name: &str, format: OutputFormat) -> error::Result<()> {
    let db = open_db(config)?;
    let record = db.get_record(name)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("{}", format!("=== {} ===", record.name).cyan().bold());
    println!("Company:        {}", record.company);
    println!("Status:         {}", record.docstatus);
    println!("Currency:       {}", record.currency);
    println!("Exchange rate:  {}", record.exchange_rate.map(|r| r.to_string()).unwrap_or_default());
    println!(
        "License:        {} → {}",
        record.license_start.map(|d| d.to_string()).unwrap_or_default(),
        record.license_end.map(|d| d.to_string()).unwrap_or_default()
    );
    println!("Stage:          {}", utils::format_stage(record.renewal_stage));
    println!("Days remaining: {}", utils::format_days_remaining(record.days_remaining));
    if let Some(modified) = &record.modified {
        println!("Modified:       {}", utils::format_timestamp(modified));
    }

    if !record.items.is_empty() {
        println!("\n{}", "Items:".yellow());
        utils::print_table_border(96);
        utils::print_table_row(
            &["Item Code", "Item Name", "Qty", "Rate", "Amount", "Base Amount"],
            &[14, 28, 8, 12, 12, 14],
        );
        utils::print_table_border(96);
        for item in &record.items {
            utils::print_table_row(
                &[
                    &item.item_code,
                    &item.item_name,
                    &item.qty.to_string(),
                    &format!("{:.2}", item.rate),
                    &format!("{:.2}", item.amount),
                    &format!("{:.2}", item.base_amount),
                ],
                &[14, 28, 8, 12, 12, 14],
            );
        }
        utils::print_table_border(96);
    }

    println!("\nNet total:      {}", utils::format_money(record.net_total, &record.currency));
    println!("Net total base: {}", format!("{:.2}", record.net_total_base).yellow());
    Ok(())
}

fn list_records(
    config: &Config,
    stage: Option<String>,
    status: StatusFilter,
    format: OutputFormat,
) -> error::Result<()> {
    let stage = stage.map(|s| s.parse::<RenewalStage>()).transpose()?;
    let status = match status {
        StatusFilter::All => None,
        StatusFilter::Draft => Some(DocStatus::Draft),
        StatusFilter::Submitted => Some(DocStatus::Submitted),
        StatusFilter::Cancelled => Some(DocStatus::Cancelled),
    };

    let db = open_db(config)?;
    let records = db.list_records(stage, status)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("Found {} records", records.len());
    if records.is_empty() {
        return Ok(());
    }

    utils::print_table_border(110);
    utils::print_table_row(
        &["Name", "Company", "Status", "License End", "Stage", "Days Remaining"],
        &[16, 22, 10, 12, 20, 16],
    );
    utils::print_table_border(110);
    for record in &records {
        utils::print_table_row(
            &[
                &record.name,
                &record.company,
                &record.docstatus.to_string(),
                &record.license_end.map(|d| d.to_string()).unwrap_or_default(),
                record.renewal_stage.map(|s| s.label()).unwrap_or("-"),
                &utils::format_days_remaining(record.days_remaining),
            ],
            &[16, 22, 10, 12, 20, 16],
        );
    }
    utils::print_table_border(110);
    Ok(())
}

fn update_stage(config: &Config, name: &str, today: NaiveDate) -> error::Result<()> {
    let db = open_db(config)?;
    let response = renewal::update_renewal_stage(&db, name, today);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        return Err(TrackerError::Other(anyhow::anyhow!(
            "Stage update failed for {}",
            name
        )));
    }
    Ok(())
}

fn run_sweep(
    config: &Config,
    mode: SweepKind,
    format: OutputFormat,
    today: NaiveDate,
) -> error::Result<()> {
    let mode = match mode {
        SweepKind::Full => SweepMode::Full,
        SweepKind::Critical => SweepMode::Critical,
    };

    let db = open_db(config)?;
    let mut reclassifier = BatchReclassifier::new(&db, config.sweep.clone());

    if format == OutputFormat::Table {
        let progress = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} records") {
            progress.set_style(style);
        }
        reclassifier = reclassifier.with_progress(progress);
    }

    let summary = reclassifier.run(mode, today)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    summary.print_summary();

    if !summary.stage_changes.is_empty() {
        println!("\n{}", "Stage Changes:".yellow());
        for change in &summary.stage_changes {
            println!(
                "  {}  {} → {}  {}",
                change.name.cyan(),
                utils::format_stage(change.from),
                utils::format_stage(change.to),
                utils::format_days_remaining(change.days_remaining)
            );
        }
    }

    if !summary.failures.is_empty() {
        println!("\n{}", "Failures:".red());
        for failure in &summary.failures {
            println!("  {}  {}", failure.name, failure.error);
        }
    }
    Ok(())
}

fn make_quote(config: &Config, name: &str, kind: QuoteKind, today: NaiveDate) -> error::Result<()> {
    let db = open_db(config)?;
    let record = db.get_record(name)?;
    let mapper = DocumentMapper::new(config.documents.clone());

    let document = match kind {
        QuoteKind::Rfq => serde_json::to_string_pretty(&mapper.request_for_quotation(&record, today))?,
        QuoteKind::Supplier => serde_json::to_string_pretty(&mapper.supplier_quotation(&record, today))?,
        QuoteKind::Customer => serde_json::to_string_pretty(&mapper.customer_quotation(&record, today))?,
    };

    println!("{}", document);
    Ok(())
}

fn show_stats(config: &Config, format: OutputFormat) -> error::Result<()> {
    let db = open_db(config)?;
    let counts = db.stage_counts()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    let total: usize = counts.iter().map(|c| c.count).sum();
    println!("{}", "=== Renewal Stage Statistics ===".cyan().bold());
    println!("\nSubmitted records: {}", total);
    for count in &counts {
        println!("  {:<20} {}", utils::format_stage(count.stage), count.count);
    }
    Ok(())
}
