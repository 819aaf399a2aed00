//! Stridelog CLI
//!
//! Terminal dashboard for the running log:
//! - Weekly view with per-day mileage and goal progress
//! - Mileage trend over 4 weeks, 12 weeks or 6 months
//! - Run logging, editing and GPX/FIT import
//! - Per-run metrics, splits and elevation charts

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

use stridelog::api::dto::{GoalUpsert, RunCreate, RunRead, RunUpdate};
use stridelog::calendar::week_range;
use stridelog::client::{ClientError, StravaSyncRequest, StridelogClient};
use stridelog::config::{Config, LoggingConfig};
use stridelog::dashboard::{chart_rows, week_summary, ChartMetric, MileageRange};
use stridelog::format::{fmt_hhmmss, fmt_miles, fmt_pace_sec, to_12h};
use stridelog::storage::RunType;
use stridelog::units::parse_hhmmss;

#[derive(Parser)]
#[command(name = "stridelog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Running log dashboard")]
#[command(long_about = "Stridelog tracks your runs, weekly mileage and goals.\nImport GPX/FIT files or sync from Strava for splits, heart rate and elevation.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL (default: from config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    format: OutputFormat,

    /// Config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChartKind {
    Hr,
    Pace,
}

impl From<ChartKind> for ChartMetric {
    fn from(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Hr => ChartMetric::HeartRate,
            ChartKind::Pace => ChartMetric::Pace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show one Monday–Sunday week
    Week {
        /// Weeks relative to this week (0 = this week, -1 = last week)
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },

    /// Weekly mileage trend
    Mileage {
        /// Display range: 4w, 12w or 6m
        #[arg(short, long, default_value = "12w")]
        range: MileageRange,
    },

    /// Log a run
    Log {
        /// Distance in miles
        distance: f64,
        /// Duration as HH:MM:SS
        duration: String,
        /// Date (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Start time, e.g. 06:30 or "6:30 AM"
        #[arg(short, long)]
        start_time: Option<String>,
        #[arg(short, long, default_value = "Run")]
        title: String,
        /// easy, workout, long or race
        #[arg(long = "type", default_value = "easy")]
        run_type: RunType,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Edit a run
    Edit {
        id: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        start_time: Option<String>,
        /// Remove the start time
        #[arg(long, conflicts_with = "start_time")]
        clear_start_time: bool,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        distance: Option<f64>,
        #[arg(long)]
        duration: Option<String>,
        #[arg(long = "type")]
        run_type: Option<RunType>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a run
    Delete { id: i64 },

    /// Import a GPX or FIT file
    Import {
        path: PathBuf,
        /// Attach to an existing run instead of creating one
        #[arg(long)]
        run: Option<i64>,
    },

    /// Show a run with its metrics, splits and chart
    Show {
        id: i64,
        /// Series plotted against elevation
        #[arg(long, value_enum, default_value_t = ChartKind::Hr)]
        chart: ChartKind,
    },

    /// Rebuild a run's derived data from its stored file
    Reprocess { id: i64 },

    /// Weekly goals
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// Miles per run type
    Stats {
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },

    /// Export runs as CSV
    Export {
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Populate the log with a demo training block
    Seed {
        #[arg(short, long, default_value_t = 16)]
        weeks: usize,
    },

    /// Show API status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Strava account linking and sync
    Strava {
        #[command(subcommand)]
        action: StravaAction,
    },
}

#[derive(Subcommand)]
enum GoalAction {
    /// Show the goal for a week
    Get {
        /// Any day of the week (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Set the goal for a week
    Set {
        miles: f64,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum StravaAction {
    /// Print the authorization URL
    AuthUrl,
    /// Import recent activities
    Sync {
        #[arg(long)]
        weeks: Option<u32>,
        /// Comma-separated activity types (default: Run)
        #[arg(long)]
        types: Option<String>,
        #[arg(long)]
        max_activities: Option<u32>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long)]
        start_page: Option<u32>,
    },
}

/// Log the underlying error and surface a generic message
fn failed(message: &'static str) -> impl FnOnce(ClientError) -> anyhow::Error {
    move |err| {
        tracing::error!(error = %err, "{}", message);
        anyhow::anyhow!("{}: {}", message, err)
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn api_url(cli_url: Option<String>, config: &Config) -> String {
    cli_url.unwrap_or_else(|| {
        let host = match config.server.host.as_str() {
            "0.0.0.0" | "" => "127.0.0.1",
            other => other,
        };
        format!("http://{}:{}", host, config.server.port)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref()).context("Failed to load configuration")?;

    // Quiet by default so table output stays readable; RUST_LOG still wins
    LoggingConfig {
        level: "warn".to_string(),
        format: config.logging.format.clone(),
    }
    .init();

    let client = StridelogClient::new(api_url(cli.api_url, &config));
    // Same zone the server buckets weeks in
    let today = config.athlete.timezone.today();
    let format = cli.format;

    match cli.command {
        Commands::Week { offset } => {
            let range = week_range(today, offset.min(0));
            let runs = client
                .list_runs(Some(range.start), Some(range.end))
                .await
                .map_err(failed("Failed to load runs"))?;
            let goal = client
                .goal(range.start)
                .await
                .map_err(failed("Failed to load weekly goal"))?;
            let summary = week_summary(&runs, range, goal.as_ref());

            if format == OutputFormat::Json {
                return print_json(&json!({ "summary": summary, "runs": runs }));
            }

            println!(
                "Week of {} – {}",
                range.start.format("%a %b %-d"),
                range.end.format("%a %b %-d, %Y")
            );
            println!();

            let max_day = summary.daily.iter().cloned().fold(0.0, f64::max);
            for (day, miles) in range.days().zip(summary.daily.iter()) {
                println!("{:<10} {:<30} {}", day.format("%a %m/%d"), bar(*miles, max_day, 30), fmt_miles(*miles));
            }
            println!();

            match (summary.goal_miles, summary.progress_pct) {
                (Some(goal), Some(pct)) => println!(
                    "Total: {}   Goal: {} ({:.1}%)",
                    fmt_miles(summary.total_miles),
                    fmt_miles(goal),
                    pct
                ),
                _ => println!("Total: {}   Goal: not set", fmt_miles(summary.total_miles)),
            }

            if !runs.is_empty() {
                println!();
                print_runs(&runs);
            }
        }

        Commands::Mileage { range } => {
            let series = client
                .weekly_mileage(MileageRange::SixMonths.weeks() as u32)
                .await
                .map_err(failed("Failed to load weekly mileage"))?;
            let points = range.slice(&series);

            if format == OutputFormat::Json {
                return print_json(&points);
            }

            println!("Weekly mileage ({})", range);
            println!();
            let max_week = points.iter().map(|p| p.total_mileage).fold(0.0, f64::max);
            for point in points {
                println!(
                    "{:<12} {:<40} {}",
                    point.week_start.format("%b %-d"),
                    bar(point.total_mileage, max_week, 40),
                    fmt_miles(point.total_mileage)
                );
            }
            let total: f64 = points.iter().map(|p| p.total_mileage).sum();
            if !points.is_empty() {
                println!();
                println!("Average: {}/week", fmt_miles(total / points.len() as f64));
            }
        }

        Commands::Log {
            distance,
            duration,
            date,
            start_time,
            title,
            run_type,
            notes,
        } => {
            let run = client
                .create_run(&RunCreate {
                    date: date.unwrap_or(today),
                    start_time,
                    title,
                    notes,
                    distance_mi: distance,
                    duration,
                    run_type,
                })
                .await
                .map_err(failed("Failed to log run"))?;

            if format == OutputFormat::Json {
                return print_json(&run);
            }
            println!("Logged run {}: {} on {} ({})", run.id, fmt_miles(run.distance_mi), run.date, run.pace);
        }

        Commands::Edit {
            id,
            date,
            start_time,
            clear_start_time,
            title,
            distance,
            duration,
            run_type,
            notes,
        } => {
            let start_time = if clear_start_time {
                Some(None)
            } else {
                start_time.map(Some)
            };
            let changes = RunUpdate {
                date: date.map(|d| d.to_string()),
                start_time,
                title,
                notes: notes.map(Some),
                distance_mi: distance,
                duration,
                run_type,
            };

            let run = client
                .update_run(id, &changes)
                .await
                .map_err(failed("Failed to update run"))?;

            if format == OutputFormat::Json {
                return print_json(&run);
            }
            println!("Updated run {}", run.id);
            print_runs(std::slice::from_ref(&run));
        }

        Commands::Delete { id } => {
            let response = client.delete_run(id).await.map_err(failed("Failed to delete run"))?;
            println!("{}", response.message);
        }

        Commands::Import { path, run } => {
            if !path.exists() {
                anyhow::bail!("File not found: {:?}", path);
            }

            match run {
                Some(run_id) => {
                    let response = client
                        .upload_file(run_id, &path)
                        .await
                        .map_err(failed("Failed to upload file"))?;
                    if format == OutputFormat::Json {
                        return print_json(&response);
                    }
                    println!("{} (file {}) for run {}", response.message, response.file_id, run_id);
                }
                None => {
                    let created = client
                        .import_file(&path)
                        .await
                        .map_err(failed("Failed to import file"))?;
                    if format == OutputFormat::Json {
                        return print_json(&created);
                    }
                    println!("Imported run {}", created.id);
                    print_runs(std::slice::from_ref(&created));
                }
            }
        }

        Commands::Show { id, chart } => {
            let run = client.get_run(id).await.map_err(failed("Failed to load run"))?;
            let metrics = client.metrics(id).await.map_err(failed("Failed to load metrics"))?;
            let splits = client.splits(id).await.map_err(failed("Failed to load splits"))?;
            let series = client.series(id).await.map_err(failed("Failed to load series"))?;
            let rows = series
                .as_ref()
                .map(|s| chart_rows(s, chart.into()))
                .unwrap_or_default();

            if format == OutputFormat::Json {
                return print_json(&json!({
                    "run": run,
                    "metrics": metrics,
                    "splits": splits,
                    "chart": rows,
                }));
            }

            print_runs(std::slice::from_ref(&run));
            if let Some(notes) = run.notes.as_deref().filter(|n| !n.is_empty()) {
                println!("Notes: {}", notes);
            }

            match &metrics {
                Some(m) => {
                    println!();
                    println!("Metrics:");
                    if let Some(avg) = m.avg_hr {
                        println!("  Avg HR: {} bpm", avg);
                    }
                    if let Some(max) = m.max_hr {
                        println!("  Max HR: {} bpm", max);
                    }
                    if let Some(gain) = m.elev_gain_ft {
                        println!("  Elevation gain: {:.0} ft", gain);
                    }
                    if let Some(loss) = m.elev_loss_ft {
                        println!("  Elevation loss: {:.0} ft", loss);
                    }
                    if let Some(moving) = m.moving_time_sec {
                        println!("  Moving time: {}", fmt_hhmmss(moving as f64));
                    }
                    if let Some(device) = &m.device {
                        println!("  Device: {}", device);
                    }
                    if let Some(zones) = &m.hr_zones {
                        let total = (zones.z1 + zones.z2 + zones.z3 + zones.z4 + zones.z5).max(1) as f64;
                        println!("  HR zones (max {} bpm):", zones.hr_max);
                        for (label, secs) in [("Z1", zones.z1), ("Z2", zones.z2), ("Z3", zones.z3), ("Z4", zones.z4), ("Z5", zones.z5)] {
                            println!(
                                "    {} {:>8} {:>5.1}%",
                                label,
                                fmt_hhmmss(secs as f64),
                                secs as f64 / total * 100.0
                            );
                        }
                    }
                }
                None => {
                    println!();
                    println!("No metrics. Import a GPX/FIT file for this run to see details.");
                }
            }

            if !splits.is_empty() {
                println!();
                println!("{:<6} {:>8} {:>9} {:>9} {:>7} {:>7} {:>8}", "Split", "Miles", "Time", "Pace", "AvgHR", "MaxHR", "Gain ft");
                println!("{}", "-".repeat(60));
                for split in &splits {
                    let pace = if split.distance_mi > 0.0 {
                        fmt_pace_sec(split.duration_sec as f64 / split.distance_mi)
                    } else {
                        "-".to_string()
                    };
                    println!(
                        "{:<6} {:>8.2} {:>9} {:>9} {:>7} {:>7} {:>8}",
                        split.idx,
                        split.distance_mi,
                        fmt_hhmmss(split.duration_sec as f64),
                        pace,
                        opt(split.avg_hr),
                        opt(split.max_hr),
                        split.elev_gain_ft.map(|g| format!("{:.0}", g)).unwrap_or_else(|| "-".to_string()),
                    );
                }
            }

            if !rows.is_empty() {
                let label = match chart {
                    ChartKind::Hr => "HR",
                    ChartKind::Pace => "Pace",
                };
                println!();
                println!("{:>8} {:>10} {:>10}", "Mile", "Elev ft", label);
                println!("{}", "-".repeat(30));
                for row in &rows {
                    let value = match (row.value, chart) {
                        (Some(v), ChartKind::Pace) => fmt_pace_sec(v),
                        (Some(v), ChartKind::Hr) => format!("{:.0}", v),
                        (None, _) => "-".to_string(),
                    };
                    let elev = row.elev_ft.map(|e| format!("{:.0}", e)).unwrap_or_else(|| "-".to_string());
                    println!("{:>8.2} {:>10} {:>10}", row.d, elev, value);
                }
            }
        }

        Commands::Reprocess { id } => {
            let response = client.reprocess(id).await.map_err(failed("Failed to reprocess run"))?;
            if format == OutputFormat::Json {
                return print_json(&response);
            }
            println!("{} run {} from {} ({})", response.message, response.run_id, response.file, response.source);
        }

        Commands::Goal { action } => match action {
            GoalAction::Get { date } => {
                let goal = client
                    .goal(date.unwrap_or(today))
                    .await
                    .map_err(failed("Failed to load weekly goal"))?;
                if format == OutputFormat::Json {
                    return print_json(&goal);
                }
                match goal {
                    Some(goal) => {
                        println!("Week of {}: {}", goal.week_start, fmt_miles(goal.goal_miles));
                        if let Some(notes) = goal.notes {
                            println!("Notes: {}", notes);
                        }
                    }
                    None => println!("Goal not set"),
                }
            }
            GoalAction::Set { miles, date, notes } => {
                let goal = client
                    .set_goal(date.unwrap_or(today), &GoalUpsert { goal_miles: miles, notes })
                    .await
                    .map_err(failed("Failed to save weekly goal"))?;
                if format == OutputFormat::Json {
                    return print_json(&goal);
                }
                println!("Goal for week of {} set to {}", goal.week_start, fmt_miles(goal.goal_miles));
            }
        },

        Commands::Stats { start_date, end_date } => {
            let stats = client
                .stats(start_date, end_date)
                .await
                .map_err(failed("Failed to load stats"))?;
            if format == OutputFormat::Json {
                return print_json(&stats);
            }
            println!("Total: {}", fmt_miles(stats.total_miles));
            for run_type in RunType::all() {
                println!("  {:<8} {}", run_type.as_str(), fmt_miles(stats.by_type.get(*run_type)));
            }
        }

        Commands::Export {
            start_date,
            end_date,
            output,
        } => {
            let data = client
                .export(start_date, end_date)
                .await
                .map_err(failed("Failed to export runs"))?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &data)?;
                    println!("Exported to {:?}", path);
                }
                None => print!("{}", data),
            }
        }

        Commands::Seed { weeks } => {
            let plan = stridelog::seed::plan(today, weeks);
            let mut runs = 0;
            for week in &plan {
                client
                    .set_goal(
                        week.week_start,
                        &GoalUpsert {
                            goal_miles: week.goal_miles,
                            notes: None,
                        },
                    )
                    .await
                    .map_err(failed("Failed to save weekly goal"))?;
                for run in &week.runs {
                    client.create_run(run).await.map_err(failed("Failed to log run"))?;
                    runs += 1;
                }
            }
            println!("Seed complete: {} weeks, {} runs created.", plan.len(), runs);
        }

        Commands::Status => match client.health().await {
            Ok(health) => {
                if format == OutputFormat::Json {
                    return print_json(&health);
                }
                println!("Stridelog v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("API Status: {} (v{})", health.status, health.version);
                println!("Storage: {}", health.storage);
                if let Some(runs) = health.runs {
                    println!("Runs: {}", runs);
                }
                println!("Uptime: {}", format_duration(health.uptime_seconds));
            }
            Err(ClientError::Connect { url, source }) => {
                tracing::error!(error = %source, "Cannot connect to API");
                eprintln!("Cannot connect to Stridelog API at {}", url);
                eprintln!();
                eprintln!("Make sure the API server is running:");
                eprintln!("  cargo run --bin stridelog-api");
                std::process::exit(1);
            }
            Err(e) => return Err(failed("Failed to load status")(e)),
        },

        Commands::Config { output } => {
            let config = stridelog::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", config),
            }
        }

        Commands::Strava { action } => match action {
            StravaAction::AuthUrl => {
                let url = client
                    .strava_auth_url()
                    .await
                    .map_err(failed("Failed to get Strava authorization URL"))?;
                println!("Open this URL to link Strava:");
                println!("{}", url);
            }
            StravaAction::Sync {
                weeks,
                types,
                max_activities,
                start_date,
                end_date,
                start_page,
            } => {
                let report = client
                    .strava_sync(&StravaSyncRequest {
                        weeks,
                        types,
                        max_activities,
                        start_date,
                        end_date,
                        start_page,
                    })
                    .await
                    .map_err(failed("Strava sync failed"))?;
                if format == OutputFormat::Json {
                    return print_json(&report);
                }
                println!("Imported {} activities", report.imported);
                if let Some(note) = report.note {
                    println!("{}", note);
                }
            }
        },
    }

    Ok(())
}

fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * width as f64).round().max(1.0) as usize;
    "#".repeat(len.min(width))
}

fn opt(value: Option<u16>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_runs(runs: &[RunRead]) {
    println!(
        "{:<5} {:<11} {:<9} {:<24} {:>9} {:>9} {:>9} {:<8}",
        "ID", "Date", "Start", "Title", "Miles", "Time", "Pace", "Type"
    );
    println!("{}", "-".repeat(92));

    for run in runs {
        let start = to_12h(run.start_time.as_deref()).unwrap_or_else(|| "-".to_string());
        let time = parse_hhmmss(&run.duration)
            .map(|s| fmt_hhmmss(s as f64))
            .unwrap_or_else(|_| run.duration.clone());
        let title: String = run.title.chars().take(24).collect();
        println!(
            "{:<5} {:<11} {:<9} {:<24} {:>9.2} {:>9} {:>9} {:<8}",
            run.id,
            run.date.to_string(),
            start,
            title,
            run.distance_mi,
            time,
            run.pace,
            run.run_type.as_str()
        );
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
