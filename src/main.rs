//! Interactive CLI for phototrack.
//!
//! Argument parsing, colored console output, confirmation prompts, and
//! the ready-to-paste retry hints printed when a run fails a gate. The
//! actual work happens in the library's pipeline.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use phototrack::config::Config;
use phototrack::error::PipelineError;
use phototrack::extract::ExtractStats;
use phototrack::filter::SkipStats;
use phototrack::geocode::NominatimGeocoder;
use phototrack::group::TripDays;
use phototrack::pipeline::{Pipeline, PipelineOptions, PipelineUi, RunReport, day_number};
use phototrack::resolve::{LocationResolution, UNKNOWN_CITY};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Extract a GPX travel track and per-day cities from geotagged photos"
)]
struct Cli {
    /// Folder scanned recursively for photos
    photo_folder: PathBuf,

    /// Base name for the output files
    #[arg(default_value = "track")]
    output_name: String,

    /// Expected first day of the trip (YYYY-MM-DD)
    #[arg(short = 's', long, value_name = "DATE")]
    expected_start: Option<NaiveDate>,

    /// Expected last day of the trip (YYYY-MM-DD)
    #[arg(short = 'e', long, value_name = "DATE")]
    expected_end: Option<NaiveDate>,

    /// Manually set a day's city, e.g. --day 2=Copenhagen (repeatable)
    #[arg(long = "day", value_name = "N=CITY", value_parser = parse_day_override)]
    days: Vec<(usize, String)>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Directory for the output files
    #[arg(long, value_name = "DIR", default_value = "gpx")]
    out_dir: PathBuf,

    /// Path to config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_day_override(value: &str) -> Result<(usize, String), String> {
    let (day, city) = value
        .split_once('=')
        .ok_or_else(|| format!("expected N=CITY, got {value:?}"))?;
    let day: usize = day
        .trim()
        .parse()
        .map_err(|_| format!("invalid day number {day:?}"))?;
    if day == 0 {
        return Err("day numbers start at 1".to_string());
    }
    let city = city.trim();
    if city.is_empty() {
        return Err("city name is empty".to_string());
    }
    Ok((day, city.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.photo_folder.exists() {
        eprintln!(
            "{} Photo folder not found: {}",
            "✗".red(),
            cli.photo_folder.display()
        );
        std::process::exit(1);
    }

    let config = Config::load_or_default(&cli.config)?;
    let overrides: BTreeMap<usize, String> = cli.days.iter().cloned().collect();

    print_header("Photo GPS extraction & validation");
    println!("  Photo folder: {}", cli.photo_folder.display());
    println!("  Output name:  {}", cli.output_name);
    for (day, city) in &overrides {
        println!("  {} day {day}: {city}", "Manual".blue());
    }

    let options = PipelineOptions {
        photo_folder: cli.photo_folder.clone(),
        output_name: cli.output_name.clone(),
        out_dir: cli.out_dir.clone(),
        expected_start: cli.expected_start,
        expected_end: cli.expected_end,
        overrides,
    };

    let geocoder = NominatimGeocoder::new(&config.geocoder_url, &config.user_agent)?;
    let pipeline = Pipeline::new(options, config);
    let mut ui = ConsoleUi {
        auto_yes: cli.yes,
        resolving_announced: false,
    };

    match pipeline.run(&geocoder, &mut ui).await {
        Ok(Some(report)) => {
            print_report(&report, &pipeline);
            Ok(())
        }
        Ok(None) => {
            println!("{}", "Cancelled".yellow());
            Ok(())
        }
        Err(err) => {
            report_failure(&err, &cli);
            std::process::exit(1);
        }
    }
}

/// Console implementation of the pipeline's UI hooks.
struct ConsoleUi {
    auto_yes: bool,
    resolving_announced: bool,
}

impl PipelineUi for ConsoleUi {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.auto_yes {
            return true;
        }
        print!("\n{} (y/n): ", prompt.yellow());
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn scanned(&mut self, stats: &ExtractStats) {
        println!("\n{} Scan complete", "✓".green());
        println!("  Total photos: {}", stats.total.to_string().blue());
        println!("  With GPS:     {}", stats.with_gps.to_string().green());
        println!(
            "  Without GPS:  {}",
            stats.without_gps().to_string().yellow()
        );
    }

    fn grouped(&mut self, trip: &TripDays, skips: &SkipStats) {
        println!("\n{} Date range analyzed", "✓".green());
        if let Some((first, last)) = trip.span() {
            println!("  First day:  {}", first.to_string().blue());
            println!("  Last day:   {}", last.to_string().blue());
        }
        println!("  Total days: {}", trip.total_days().to_string().blue());
        if skips.skipped > 0 {
            println!(
                "  {} {} record(s) skipped (incomplete GPS or time)",
                "!".yellow(),
                skips.skipped
            );
            for reason in &skips.reasons {
                println!("    - {reason}");
            }
        }
    }

    fn day_resolved(&mut self, day: usize, resolution: &LocationResolution) {
        if !self.resolving_announced {
            println!("\n{}", "Resolving cities (OpenStreetMap)...".yellow());
            self.resolving_announced = true;
        }

        let city = if resolution.manual {
            format!("{} (manual)", resolution.primary_city.blue())
        } else if resolution.primary_city == UNKNOWN_CITY {
            resolution.primary_city.red().to_string()
        } else {
            resolution.primary_city.green().to_string()
        };
        println!("  Day {day:2} ({}): {city}", resolution.date);

        if resolution.all_cities.len() > 1 {
            println!("          also: {}", resolution.all_cities[1..].join(", "));
        }
        println!("          {} photo(s)", resolution.photo_count);
    }

    fn coverage_ok(&mut self, total_days: usize, cities: &[String]) {
        println!("\n{} Every day has a location", "✓".green());
        println!("  Total days:     {total_days}");
        println!("  Cities visited: {}", cities.join(", "));
    }
}

fn print_header(text: &str) {
    let line = "=".repeat(60);
    println!("{}", line.green());
    println!("{}", text.green());
    println!("{}", line.green());
}

fn print_report(report: &RunReport, pipeline: &Pipeline) {
    print_header("Done!");
    println!("  GPX track:    {}", report.gpx_path.display().to_string().green());
    println!("  GPS dump:     {}", pipeline.dump_path().display());
    println!("  Trip summary: {}", report.summary_path.display());
    println!(
        "  {} track point(s) across {} day(s)",
        report.track_points, report.total_days
    );
    println!("\nNext steps:");
    println!("  1. Open Lightroom's Map module");
    println!("  2. Map > Tracklog > Load Tracklog...");
    println!("  3. Select {}", report.gpx_path.display());
}

/// Prints the failure and, for gate failures the user can fix with
/// overrides, a ready-to-paste retry command.
fn report_failure(err: &anyhow::Error, cli: &Cli) {
    eprintln!("\n{} {err:#}", "✗".red());

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::IncompleteRange {
            missing,
            trip_start,
        }) => {
            for date in missing {
                eprintln!("  missing: {date}");
            }
            let days: Vec<usize> = missing
                .iter()
                .map(|d| day_number(*trip_start, *d) as usize)
                .collect();
            print_retry_hint(cli, &days);
        }
        Some(PipelineError::CoverageGap(days)) => {
            for (day, date) in days {
                eprintln!("  day {day}: {date}");
            }
            let days: Vec<usize> = days.iter().map(|(day, _)| *day).collect();
            print_retry_hint(cli, &days);
        }
        _ => {}
    }
}

fn print_retry_hint(cli: &Cli, days: &[usize]) {
    let mut command = format!(
        "phototrack {} {}",
        cli.photo_folder.display(),
        cli.output_name
    );
    if let Some(start) = cli.expected_start {
        command.push_str(&format!(" -s {start}"));
    }
    if let Some(end) = cli.expected_end {
        command.push_str(&format!(" -e {end}"));
    }
    for day in days {
        command.push_str(&format!(" --day {day}=\"CityName\""));
    }

    eprintln!("\nSupply the missing cities manually and re-run:");
    eprintln!("  {}", command.blue());
}
