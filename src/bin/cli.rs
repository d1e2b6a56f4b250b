//! stopmatch CLI - Reconcile an agency stop catalog with mapped features
//!
//! Usage:
//!   stopmatch-cli match --stops <file> --features <file> [--config <file>] [--output <dir>]
//!   stopmatch-cli validate --matches <file> --expectations <file>
//!
//! Catalogs are JSON arrays of `AgencyStop` and `MappedFeature` records.
//! `match` writes candidates.json, matches.json and diagnostics.json;
//! `validate` checks a match set against curated expectations and exits
//! non-zero when any of them fails.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stopmatch::{
    AgencyStop, MappedFeature, Match, MatchConfig, MatchExpectation, MatchOutcome, Result,
    StopMatcher, validate_outcome,
};

#[derive(Parser)]
#[command(name = "stopmatch-cli")]
#[command(about = "Match official transit stops to community-mapped stop features", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print per-stop details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate candidates, assign and resolve conflicts
    Match {
        /// JSON array of agency stops
        #[arg(long)]
        stops: PathBuf,

        /// JSON array of mapped features
        #[arg(long)]
        features: PathBuf,

        /// JSON matcher configuration; missing keys use defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a match set against curated expectations
    Validate {
        /// matches.json written by `match`
        #[arg(long)]
        matches: PathBuf,

        /// JSON array of expectations
        #[arg(long)]
        expectations: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Match {
            stops,
            features,
            config,
            output,
        } => run_match(&stops, &features, config.as_deref(), output.as_deref(), cli.verbose)
            .map(|_| true),
        Commands::Validate {
            matches,
            expectations,
        } => run_validate(&matches, &expectations),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn run_match(
    stops_path: &Path,
    features_path: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    println!("\n{}", "=".repeat(60));
    println!("STOP MATCHING");
    println!("{}", "=".repeat(60));

    let stops: Vec<AgencyStop> = read_json(stops_path)?;
    let features: Vec<MappedFeature> = read_json(features_path)?;
    let config: MatchConfig = match config_path {
        Some(path) => read_json(path)?,
        None => MatchConfig::default(),
    };
    println!(
        "Loaded {} agency stops and {} mapped features",
        stops.len(),
        features.len()
    );

    let matcher = StopMatcher::new(features, config)?;
    let outcome = matcher.run(&stops)?;

    print_summary(&outcome);
    if verbose {
        print_details(&stops, &outcome);
    }

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
        write_json(&dir.join("candidates.json"), &outcome.candidates)?;
        write_json(&dir.join("matches.json"), &outcome.matches)?;
        write_json(&dir.join("diagnostics.json"), &outcome.diagnostics)?;
        println!("\nResults written to: {}", dir.display());
    }

    Ok(())
}

fn print_summary(outcome: &MatchOutcome) {
    let d = &outcome.diagnostics;
    println!("\n--- Summary ---");
    println!("  Stops:               {}", d.stops_total);
    println!("  Unlocated:           {}", d.stops_unlocated);
    println!("  Without name:        {}", d.stops_without_name);
    println!("  Without candidates:  {}", d.unmatched_without_candidates.len());
    println!("  Candidates:          {}", d.candidate_count);
    println!(
        "  Groups:              {} ({} collapsed, {} split)",
        d.group_count, d.groups_collapsed, d.groups_split
    );
    println!(
        "  Conflicts dropped:   {} per feature, {} per stop",
        d.feature_conflicts_dropped, d.agency_duplicates_dropped
    );
    println!("  Matched:             {}/{}", d.matched_stops, d.stops_total);
}

fn print_details(stops: &[AgencyStop], outcome: &MatchOutcome) {
    println!("\n--- Per stop ---");
    for stop in stops {
        match outcome.match_for_stop(&stop.id) {
            Some(m) => println!(
                "  [OK] {} -> {} rating {:.4}, {:.0}m, name {:.2} ({:?}), direction {:?}",
                stop.id,
                m.feature_id,
                m.rating,
                m.distance_m,
                m.name_similarity,
                m.matched_name,
                m.direction
            ),
            None => println!(
                "  [--] {} unmatched, {} candidates",
                stop.id,
                outcome.candidates_for_stop(&stop.id).count()
            ),
        }
    }
}

/// Returns `Ok(false)` when any expectation fails.
fn run_validate(matches_path: &Path, expectations_path: &Path) -> Result<bool> {
    let matches: Vec<Match> = read_json(matches_path)?;
    let expectations: Vec<MatchExpectation> = read_json(expectations_path)?;

    let outcome = MatchOutcome::from_matches(matches);
    let failures = validate_outcome(&outcome, &expectations);

    for failure in &failures {
        eprintln!("ERROR: {}", failure);
    }
    println!(
        "{}/{} expectations hold",
        expectations.len() - failures.len(),
        expectations.len()
    );

    Ok(failures.is_empty())
}
