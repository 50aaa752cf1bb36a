//! geofocus CLI - Debug tool for signal analytics
//!
//! Usage:
//!   geofocus-cli summary <files>...
//!   geofocus-cli cluster <files>... --eps 50 --min-samples 10
//!   geofocus-cli export <files>... --format csv --output out.csv
//!
//! This tool runs the analysis pipeline over signal export files and
//! prints the results, helping to inspect how a batch ingests, filters
//! and clusters before wiring it into a dashboard.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use geofocus::{
    AnalysisSession, ClusterParams, FilterParams, Result,
};

#[derive(Parser)]
#[command(name = "geofocus-cli")]
#[command(about = "Debug tool for signal ingestion, aggregation and clustering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print summary statistics and the most frequent devices
    Summary {
        /// Signal export JSON files
        files: Vec<PathBuf>,

        /// Number of top devices to list
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Run per-device DBSCAN clustering and print centroids
    Cluster {
        /// Signal export JSON files
        files: Vec<PathBuf>,

        /// Neighborhood radius in meters
        #[arg(long, default_value = "50")]
        eps: f64,

        /// Minimum points per cluster
        #[arg(long, default_value = "10")]
        min_samples: usize,

        /// Inclusive start hour filter (0-23)
        #[arg(long, default_value = "0")]
        start_hour: u8,

        /// Inclusive end hour filter (0-23)
        #[arg(long, default_value = "23")]
        end_hour: u8,

        /// Restrict to specific device identities
        #[arg(long)]
        device: Vec<String>,
    },

    /// Export the normalized batch as CSV or KML
    Export {
        /// Signal export JSON files
        files: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Kml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { files, top } => run_summary(&files, top),
        Commands::Cluster {
            files,
            eps,
            min_samples,
            start_hour,
            end_hour,
            device,
        } => run_cluster(
            &files,
            eps,
            min_samples,
            start_hour,
            end_hour,
            device,
            cli.verbose,
        ),
        Commands::Export {
            files,
            format,
            output,
        } => run_export(&files, format, &output),
    }
}

fn run_summary(files: &[PathBuf], top: usize) -> Result<()> {
    let session = AnalysisSession::from_files(files)?;
    let summary = session.summary();

    println!("Loaded {} signals", summary.total_rows);
    println!("Unique devices: {}", summary.unique_devices);
    if let (Some(first), Some(last)) = (summary.first_seen, summary.last_seen) {
        println!("Time span: {first} .. {last}");
    }

    println!("\nTop {top} devices:");
    for device in session.top_devices(top) {
        println!("  {:>8}  {}", device.count, device.registration_id);
    }

    Ok(())
}

fn run_cluster(
    files: &[PathBuf],
    eps: f64,
    min_samples: usize,
    start_hour: u8,
    end_hour: u8,
    devices: Vec<String>,
    verbose: bool,
) -> Result<()> {
    let mut session = AnalysisSession::from_files(files)?;

    let mut filter = FilterParams::new(start_hour, end_hour);
    if !devices.is_empty() {
        filter = filter.with_identities(devices);
    }

    let params = ClusterParams::new(eps, min_samples)?;
    let outcome = session.clusters(&filter, &params)?;

    println!(
        "{} clustered signals, {} centroids",
        outcome.labeled.len(),
        outcome.centroids.len()
    );

    for centroid in &outcome.centroids {
        println!(
            "  cluster {:>3}  {}  ({:.6}, {:.6})  {} points",
            centroid.cluster,
            centroid.registration_id,
            centroid.latitude,
            centroid.longitude,
            centroid.point_count
        );
    }

    if verbose {
        for labeled in &outcome.labeled {
            println!(
                "    [{}] {} @ ({:.6}, {:.6})",
                labeled.cluster,
                labeled.record.registration_id,
                labeled.record.latitude,
                labeled.record.longitude
            );
        }
    }

    Ok(())
}

fn run_export(files: &[PathBuf], format: ExportFormat, output: &PathBuf) -> Result<()> {
    let session = AnalysisSession::from_files(files)?;

    let content = match format {
        ExportFormat::Csv => session.export_csv()?,
        ExportFormat::Kml => session.export_kml(),
    };

    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;

    println!("Written: {} ({} rows)", output.display(), session.signals().len());
    Ok(())
}
