//! Healthdash CLI - Patient admission dashboards from CSV
//!
//! # Commands
//!
//! ```bash
//! healthdash serve                          # Start HTTP server (port 3000)
//! healthdash inspect patients.csv           # Columns, age range, selector domains
//! healthdash dashboard patients.csv         # Dashboard JSON over the full domain
//! healthdash dashboard patients.csv --age-min 30 --gender Female -o out.json
//! ```

use clap::{Parser, Subcommand};
use healthdash::models::COL_BILLING_AMOUNT;
use healthdash::{
    build_dashboard, build_dataset, compute_age_bounds, derive_columns, load_file,
    parse_file_auto, Dataset, FilterCriteria, ServerConfig,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "healthdash")]
#[command(about = "Interactive dashboards over patient admission CSV files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides HEALTHDASH_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show what a CSV file offers to the dashboard
    Inspect {
        /// Input CSV file
        input: PathBuf,
    },

    /// Compute the dashboard for a CSV file
    Dashboard {
        /// Input CSV file
        input: PathBuf,

        /// Lower age bound (default: youngest patient)
        #[arg(long)]
        age_min: Option<i64>,

        /// Upper age bound (default: oldest patient)
        #[arg(long)]
        age_max: Option<i64>,

        /// Gender to include, repeatable (default: all)
        #[arg(long = "gender")]
        genders: Vec<String>,

        /// Admission type to include, repeatable (default: all)
        #[arg(long = "admission-type")]
        admission_types: Vec<String>,

        /// Include the filtered rows
        #[arg(long)]
        rows: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(port).await,

        Commands::Inspect { input } => cmd_inspect(&input),

        Commands::Dashboard {
            input,
            age_min,
            age_max,
            genders,
            admission_types,
            rows,
            output,
        } => {
            let selection = Selection {
                age_min,
                age_max,
                genders,
                admission_types,
            };
            cmd_dashboard(&input, selection, rows, output.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config = config.with_port(port);
    }
    healthdash::server::start_server(config).await
}

fn cmd_inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load_file(input)?;

    println!();
    println!("📊 {} rows", dataset.len());
    match compute_age_bounds(&dataset) {
        Ok((min, max)) => println!("   Age range: {} - {}", min, max),
        Err(e) => println!("   Age range: unavailable ({})", e),
    }
    println!("   Genders: {}", dataset.gender_options().join(", "));
    println!("   Admission types: {}", dataset.admission_type_options().join(", "));
    println!(
        "   Billing: {}",
        if dataset.has_column(COL_BILLING_AMOUNT) { "present" } else { "missing" }
    );
    println!(
        "   Diagnosis chart: {}",
        if dataset.has_diagnosis_column { "available" } else { "unavailable" }
    );
    println!(
        "   Monthly chart: {}",
        if dataset.admission_month_usable { "available" } else { "unavailable" }
    );

    Ok(())
}

/// Selector values given on the command line; `None`/empty means the full domain.
struct Selection {
    age_min: Option<i64>,
    age_max: Option<i64>,
    genders: Vec<String>,
    admission_types: Vec<String>,
}

impl Selection {
    fn into_criteria(self, dataset: &Dataset) -> FilterCriteria {
        let mut criteria = FilterCriteria::full_domain(dataset);
        if let Some(min) = self.age_min {
            criteria.age_min = min;
        }
        if let Some(max) = self.age_max {
            criteria.age_max = max;
        }
        if !self.genders.is_empty() {
            criteria.allowed_genders = self.genders.into_iter().collect();
        }
        if !self.admission_types.is_empty() {
            criteria.allowed_admission_types = self.admission_types.into_iter().collect();
        }
        criteria
    }
}

fn cmd_dashboard(
    input: &Path,
    selection: Selection,
    include_rows: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let parsed = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", parsed.encoding);
    eprintln!("   Rows: {}", parsed.table.rows.len());

    let dataset = derive_columns(build_dataset(parsed)?);
    let criteria = selection.into_criteria(&dataset);
    eprintln!(
        "   Criteria: age {}-{}, {} gender(s), {} admission type(s)",
        criteria.age_min,
        criteria.age_max,
        criteria.allowed_genders.len(),
        criteria.allowed_admission_types.len()
    );

    let dashboard = build_dashboard(&dataset, &criteria, include_rows);
    eprintln!(
        "   Patients: {}, average billing: {}",
        dashboard.summary.patient_count, dashboard.average_billing_display
    );

    let json = serde_json::to_string_pretty(&dashboard)?;
    write_output(&json, output)?;

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
