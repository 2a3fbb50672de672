use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "renewal-tracker")]
#[command(about = "License renewal tracking with stage sweeps and quotation generation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize database
    Init,

    /// Register a company and its base currency
    Company {
        name: String,
        currency: String,
    },

    /// Store an exchange rate for a currency pair
    Rate {
        from: String,
        to: String,
        rate: String,
    },

    /// Validate, recompute and save a draft record from a JSON file
    Save {
        file: String,
    },

    /// Submit a draft record and compute its renewal stage
    Submit {
        name: String,
    },

    /// Cancel a submitted record
    Cancel {
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show one record with its line items
    Show {
        name: String,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List records
    List {
        /// Filter by renewal stage label, e.g. "30 Days to Expiry"
        #[arg(short, long)]
        stage: Option<String>,

        /// Filter by status
        #[arg(long, value_enum, default_value = "all")]
        status: StatusFilter,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Recompute the renewal stage of one record
    Stage {
        name: String,
    },

    /// Recompute renewal stages across submitted records
    Sweep {
        #[arg(value_enum)]
        mode: SweepKind,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Generate a quotation document from a record
    Quote {
        name: String,

        #[arg(value_enum)]
        kind: QuoteKind,
    },

    /// Show stage statistics for submitted records
    Stats {
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    All,
    Draft,
    Submitted,
    Cancelled,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SweepKind {
    Full,
    Critical,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuoteKind {
    /// Request for quotation
    Rfq,
    /// Supplier quotation
    Supplier,
    /// Customer quotation
    Customer,
}
