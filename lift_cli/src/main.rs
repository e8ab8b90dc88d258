use chrono::Utc;
use clap::{Parser, Subcommand};
use lift_core::config::data_paths;
use lift_core::history::last_workout_dates;
use lift_core::review::{
    group_by_week, history_rows, set_reps, set_slot_weight, summarize_session, SlotSummary, Trend,
};
use lift_core::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration as StdDuration;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Guided strength workout tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List workout templates and when each was last done
    Templates,

    /// Start a workout, replacing any workout in progress
    Start { template_id: String },

    /// Show where the current workout stands (default)
    Status,

    /// Choose the weight for the current exercise
    Weight {
        /// Weight in kg
        #[arg(required_unless_present = "same")]
        kg: Option<f64>,

        /// Reuse the weight from last time
        #[arg(long, conflicts_with = "kg")]
        same: bool,
    },

    /// Log the reps of the current set
    Log { reps: u32 },

    /// Skip the running rest
    Skip,

    /// Throw away the workout in progress
    Discard,

    /// Run the workout interactively with a live rest countdown
    Session {
        /// Template to start; resumes the workout in progress when omitted
        template_id: Option<String>,
    },

    /// Show completed sessions grouped by week
    History {
        /// One row per exercise instead
        #[arg(long)]
        table: bool,
    },

    /// Correct a logged session
    Edit {
        session_id: String,
        slot_id: String,

        /// New weight for every set of the slot
        #[arg(long)]
        weight: Option<f64>,

        /// Set number to change (1-3)
        #[arg(long, requires = "reps")]
        set: Option<u32>,

        /// New reps for --set
        #[arg(long, requires = "set")]
        reps: Option<u32>,
    },

    /// Delete a logged session
    Delete { session_id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    lift_core::logging::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Templates => cmd_templates(catalog, &config, &data_dir),
        Commands::Start { template_id } => cmd_start(catalog, &config, &data_dir, &template_id),
        Commands::Status => cmd_status(catalog, &config, &data_dir),
        Commands::Weight { kg, same } => cmd_weight(catalog, &config, &data_dir, kg, same),
        Commands::Log { reps } => cmd_log(catalog, &config, &data_dir, reps),
        Commands::Skip => cmd_skip(catalog, &config, &data_dir),
        Commands::Discard => cmd_discard(catalog, &config, &data_dir),
        Commands::Session { template_id } => cmd_session(catalog, &config, &data_dir, template_id),
        Commands::History { table } => cmd_history(catalog, &config, &data_dir, table),
        Commands::Edit {
            session_id,
            slot_id,
            weight,
            set,
            reps,
        } => cmd_edit(
            catalog,
            &config,
            &data_dir,
            &session_id,
            &slot_id,
            weight,
            set.zip(reps),
        ),
        Commands::Delete { session_id } => cmd_delete(catalog, &config, &data_dir, &session_id),
    }
}

/// Build a controller over the data directory and pick up any workout in
/// progress
fn open_controller<'c>(
    catalog: &'c Catalog,
    config: &Config,
    data_dir: &Path,
    notifier: Box<dyn RestNotifier>,
) -> WorkoutController<'c> {
    let (active_path, history_path, _) = data_paths(data_dir);
    let mut ctl = WorkoutController::new(
        catalog,
        config.progression.clone(),
        Box::new(FileActiveStore::new(active_path)),
        Box::new(JsonlHistoryStore::new(history_path)),
        notifier,
    );
    if let Err(e) = ctl.load_history() {
        tracing::warn!("Could not load history: {}", e);
    }
    ctl.resume();
    ctl
}

/// Notices for one-shot commands go to a file an external agent can watch
fn file_notifier(config: &Config, data_dir: &Path) -> Box<dyn RestNotifier> {
    if config.rest.notifications {
        let (_, _, notice_path) = data_paths(data_dir);
        Box::new(SignalFileNotifier::new(notice_path))
    } else {
        Box::new(NoopNotifier)
    }
}

fn cmd_templates(catalog: &Catalog, config: &Config, data_dir: &Path) -> Result<()> {
    let ctl = open_controller(catalog, config, data_dir, Box::new(NoopNotifier));
    let last_dates = last_workout_dates(ctl.history());

    for template in catalog.templates() {
        let last = last_dates
            .get(&template.id)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Never".to_string());
        println!(
            "  {:<8} {:<40} {:>2} exercises   last: {}",
            template.id,
            template.name,
            template.slots.len(),
            last
        );
    }

    if let Some(state) = ctl.active() {
        println!();
        println!(
            "Workout in progress: {} ({}% done). Continue with `lift status` or `lift discard`.",
            state.template.name,
            (state.progress() * 100.0).round()
        );
    }
    Ok(())
}

fn cmd_start(catalog: &Catalog, config: &Config, data_dir: &Path, template_id: &str) -> Result<()> {
    let mut ctl = open_controller(catalog, config, data_dir, file_notifier(config, data_dir));
    if let Some(previous) = ctl.active() {
        println!("Replacing workout in progress: {}", previous.template.name);
    }
    let now = Utc::now();
    ctl.start(template_id, now)?;
    print_status(&ctl, now);
    Ok(())
}

fn cmd_status(catalog: &Catalog, config: &Config, data_dir: &Path) -> Result<()> {
    let mut ctl = open_controller(catalog, config, data_dir, file_notifier(config, data_dir));
    let now = Utc::now();
    ctl.tick(now);
    print_status(&ctl, now);
    Ok(())
}

fn cmd_weight(
    catalog: &Catalog,
    config: &Config,
    data_dir: &Path,
    kg: Option<f64>,
    same: bool,
) -> Result<()> {
    let mut ctl = open_controller(catalog, config, data_dir, file_notifier(config, data_dir));
    let now = Utc::now();
    ctl.tick(now);

    match kg {
        Some(kg) if !same => ctl.set_weight(kg)?,
        _ => {
            let kg = ctl.accept_suggested_weight()?;
            println!("Same as last time: {} kg", kg);
        }
    }
    print_status(&ctl, now);
    Ok(())
}

fn cmd_log(catalog: &Catalog, config: &Config, data_dir: &Path, reps: u32) -> Result<()> {
    let mut ctl = open_controller(catalog, config, data_dir, file_notifier(config, data_dir));
    let now = Utc::now();
    ctl.tick(now);

    let elapsed = ctl.active().map(|s| s.elapsed_seconds(now));
    let events = ctl.log_set(reps, now)?;
    if events.is_empty() {
        println!("Choose a weight first: `lift weight <kg>`");
        return Ok(());
    }

    let completed = report_events(&ctl, &events, elapsed);
    if !completed {
        print_status(&ctl, now);
    }
    Ok(())
}

fn cmd_skip(catalog: &Catalog, config: &Config, data_dir: &Path) -> Result<()> {
    let mut ctl = open_controller(catalog, config, data_dir, file_notifier(config, data_dir));
    let now = Utc::now();
    if ctl.skip_rest() {
        println!("Rest skipped.");
    } else {
        println!("Not resting.");
    }
    print_status(&ctl, now);
    Ok(())
}

fn cmd_discard(catalog: &Catalog, config: &Config, data_dir: &Path) -> Result<()> {
    let mut ctl = open_controller(catalog, config, data_dir, file_notifier(config, data_dir));
    match ctl.active() {
        Some(state) => println!("Discarded {}.", state.template.name),
        None => println!("No workout in progress."),
    }
    ctl.discard();
    Ok(())
}

enum Input {
    Line(String),
    Tick,
    Eof,
}

fn cmd_session(
    catalog: &Catalog,
    config: &Config,
    data_dir: &Path,
    template_id: Option<String>,
) -> Result<()> {
    let notifier: Box<dyn RestNotifier> = if config.rest.notifications {
        Box::new(ThreadNotifier::new(|notice: &RestNotice| {
            eprintln!("\x07\n{}", notice.message());
        }))
    } else {
        Box::new(NoopNotifier)
    };
    let mut ctl = open_controller(catalog, config, data_dir, notifier);

    match template_id {
        Some(id) => ctl.start(&id, Utc::now())?,
        None if ctl.active().is_some() => println!("Resuming workout in progress."),
        None => {
            return Err(Error::Workout(
                "no workout in progress; pass a template id (see `lift templates`)".into(),
            ))
        }
    }

    let (tx, rx) = mpsc::channel();
    let stdin_tx = tx.clone();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if stdin_tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = stdin_tx.send(Input::Eof);
    });
    std::thread::spawn(move || loop {
        std::thread::sleep(StdDuration::from_secs(1));
        if tx.send(Input::Tick).is_err() {
            break;
        }
    });

    print_session_help();
    print_status(&ctl, Utc::now());
    prompt()?;

    let mut last_shown = None;
    while let Ok(input) = rx.recv() {
        let now = Utc::now();
        match input {
            Input::Tick => match ctl.tick(now) {
                TickOutcome::Resting { remaining } if last_shown != Some(remaining) => {
                    last_shown = Some(remaining);
                    print!("\r  Rest {}   ", clock(remaining));
                    io::stdout().flush()?;
                }
                TickOutcome::Elapsed => {
                    last_shown = None;
                    println!();
                    print_status(&ctl, now);
                    prompt()?;
                }
                _ => {}
            },
            Input::Eof => break,
            Input::Line(line) => {
                let line = line.trim().to_lowercase();
                match line.as_str() {
                    "" => {}
                    "q" | "quit" => {
                        println!("Progress saved. Resume with `lift session`.");
                        return Ok(());
                    }
                    "d" | "discard" => {
                        ctl.discard();
                        println!("Workout discarded.");
                        return Ok(());
                    }
                    "k" | "skip" => {
                        ctl.skip_rest();
                    }
                    "=" | "same" => {
                        if let Err(e) = ctl.accept_suggested_weight() {
                            println!("  {}", e);
                        }
                    }
                    "?" | "help" => print_session_help(),
                    other => {
                        if session_number(&mut ctl, other, now)? {
                            return Ok(());
                        }
                    }
                }
                last_shown = None;
                if ctl.active().is_some() {
                    print_status(&ctl, now);
                    prompt()?;
                }
            }
        }
    }
    Ok(())
}

/// A bare number is a weight while one is needed, otherwise reps.
///
/// Returns true once the workout is complete.
fn session_number(ctl: &mut WorkoutController<'_>, input: &str, now: chrono::DateTime<Utc>) -> Result<bool> {
    let weight_input = input.strip_prefix('w').map(str::trim);
    let awaiting_weight = matches!(ctl.phase(now), WorkoutPhase::AwaitingWeight { .. });

    if weight_input.is_some() || awaiting_weight {
        let raw = weight_input.unwrap_or(input);
        match raw.parse::<f64>() {
            Ok(kg) => {
                if let Err(e) = ctl.set_weight(kg) {
                    println!("  {}", e);
                }
            }
            Err(_) => println!("  Not a weight: {}", raw),
        }
        return Ok(false);
    }

    let Ok(reps) = input.parse::<u32>() else {
        println!("  Unknown input '{}'. Type ? for help.", input);
        return Ok(false);
    };
    let elapsed = ctl.active().map(|s| s.elapsed_seconds(now));
    match ctl.log_set(reps, now) {
        Ok(events) => Ok(report_events(ctl, &events, elapsed)),
        Err(e) => {
            println!("  {}", e);
            Ok(false)
        }
    }
}

fn cmd_history(catalog: &Catalog, config: &Config, data_dir: &Path, table: bool) -> Result<()> {
    let ctl = open_controller(catalog, config, data_dir, Box::new(NoopNotifier));
    if ctl.history().is_empty() {
        println!("No workouts logged yet.");
        return Ok(());
    }

    if table {
        println!(
            "{:<16} {:<24} {:<36} {:>7} {:>4} {:>4} {:>4}",
            "Date", "Workout", "Exercise", "Kg", "S1", "S2", "S3"
        );
        for row in history_rows(catalog, ctl.history()) {
            let reps: Vec<String> = row
                .reps
                .iter()
                .map(|r| r.map(|r| r.to_string()).unwrap_or_else(|| "-".into()))
                .collect();
            println!(
                "{:<16} {:<24} {:<36} {:>7} {:>4} {:>4} {:>4}",
                row.date.format("%Y-%m-%d %H:%M"),
                row.template_name,
                row.exercise_name,
                row.weight_kg,
                reps[0],
                reps[1],
                reps[2]
            );
        }
        return Ok(());
    }

    for (monday, sessions) in group_by_week(ctl.history()) {
        println!("Week of {}", monday.format("%Y-%m-%d"));
        for session in sessions {
            let name = catalog
                .template(&session.template_id)
                .map(|t| t.name.as_str())
                .unwrap_or(&session.template_id);
            println!(
                "  {}  {}  [{}]",
                session.date.format("%a %Y-%m-%d %H:%M"),
                name,
                session.id
            );
            for slot in summarize_session(catalog, ctl.history(), session) {
                println!("    {}", summary_line(&slot));
            }
        }
        println!();
    }
    Ok(())
}

fn cmd_edit(
    catalog: &Catalog,
    config: &Config,
    data_dir: &Path,
    session_id: &str,
    slot_id: &str,
    weight: Option<f64>,
    set_reps_change: Option<(u32, u32)>,
) -> Result<()> {
    if weight.is_none() && set_reps_change.is_none() {
        return Err(Error::History("nothing to change; pass --weight or --set/--reps".into()));
    }

    let mut ctl = open_controller(catalog, config, data_dir, Box::new(NoopNotifier));
    let mut session = ctl
        .history()
        .iter()
        .find(|s| s.id == session_id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

    if let Some(kg) = weight {
        set_slot_weight(&mut session, slot_id, kg)?;
    }
    if let Some((set_number, reps)) = set_reps_change {
        set_reps(&mut session, slot_id, set_number, reps, &config.progression)?;
    }
    ctl.update_session(session)?;
    println!("Session {} updated.", session_id);
    Ok(())
}

fn cmd_delete(catalog: &Catalog, config: &Config, data_dir: &Path, session_id: &str) -> Result<()> {
    let mut ctl = open_controller(catalog, config, data_dir, Box::new(NoopNotifier));
    if !ctl.history().iter().any(|s| s.id == session_id) {
        return Err(Error::NotFound(format!("session {}", session_id)));
    }
    ctl.delete_session(session_id)?;
    println!("Session {} deleted.", session_id);
    Ok(())
}

/// Print what happened on a log. Returns true if the workout finished.
fn report_events(ctl: &WorkoutController<'_>, events: &[WorkoutEvent], elapsed: Option<i64>) -> bool {
    let mut completed = false;
    for event in events {
        match event {
            WorkoutEvent::ProgressionUnlocked {
                exercise_name, reps, ..
            } => {
                println!(
                    "\n★ Progression unlocked for {} ({}). Add weight next time!",
                    exercise_name,
                    join_reps(reps.iter().copied())
                );
            }
            WorkoutEvent::RestStarted(notice) => {
                if !matches!(events.last(), Some(WorkoutEvent::WorkoutCompleted(_))) {
                    println!("Rest {}s. Next up: {}", notice.duration, notice.next_up);
                }
            }
            WorkoutEvent::WorkoutCompleted(session) => {
                completed = true;
                print_summary(ctl, session, elapsed);
            }
        }
    }
    completed
}

fn print_summary(ctl: &WorkoutController<'_>, session: &WorkoutSession, elapsed: Option<i64>) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  WORKOUT COMPLETE");
    println!("╰─────────────────────────────────────────╯");
    if let Some(secs) = elapsed {
        println!("  Time: {}", clock(secs.max(0) as u64));
    }
    println!();
    // The finished session is already in the controller's history
    for slot in summarize_session(ctl.catalog(), ctl.history(), session) {
        println!("  {}", summary_line(&slot));
    }
    println!();
}

fn summary_line(slot: &SlotSummary) -> String {
    let mark = match slot.trend {
        Trend::Improved => "↑",
        Trend::Declined => "↓",
        Trend::Same => "=",
        Trend::NoPrevious => "·",
    };
    let weight = slot.sets.first().map(|s| s.weight_kg).unwrap_or_default();
    format!(
        "{} {} ({}): {} kg x {}",
        mark,
        slot.exercise_name,
        slot.slot_id,
        weight,
        join_reps(slot.sets.iter().map(|s| s.repetitions))
    )
}

fn print_status(ctl: &WorkoutController<'_>, now: chrono::DateTime<Utc>) {
    let phase = ctl.phase(now);
    let Some(state) = ctl.active() else {
        match phase {
            WorkoutPhase::Complete => println!("Workout complete."),
            _ => println!("No workout in progress. Start one with `lift start <template>`."),
        }
        return;
    };

    let exercise = ctl
        .current_exercise()
        .map(|e| format!("{} [{}]", e.name, e.muscle_group))
        .unwrap_or_default();
    println!(
        "\n{}  ·  exercise {}/{}  ·  {:.0}% done  ·  {}",
        state.template.name,
        state.current_slot_index + 1,
        state.template.slots.len(),
        state.progress() * 100.0,
        clock(state.elapsed_seconds(now) as u64)
    );
    println!("  {}", exercise);

    match phase {
        WorkoutPhase::AwaitingWeight { suggested } => {
            println!("  Enter weight (kg) for set 1");
            if let Some(kg) = suggested {
                println!("  Last time: {} kg (use `same`)", kg);
            }
        }
        WorkoutPhase::ReadyToLog { weight_kg, target } => {
            println!(
                "  Set {} of {} at {} kg. Target: {} reps",
                state.current_set_index + 1,
                SETS_PER_SLOT,
                weight_kg,
                target
            );
        }
        WorkoutPhase::Resting { remaining, next_up } => {
            println!("  Resting {}. Next up: {}", clock(remaining), next_up);
        }
        WorkoutPhase::Idle | WorkoutPhase::Complete => {}
    }
}

fn print_session_help() {
    println!("─────────────────────────────────────────");
    println!("  <number>   weight when asked, otherwise reps");
    println!("  w <kg>     set weight");
    println!("  =          same weight as last time");
    println!("  k          skip rest");
    println!("  d          discard workout");
    println!("  q          save and quit");
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn join_reps(reps: impl Iterator<Item = u32>) -> String {
    reps.map(|r| r.to_string()).collect::<Vec<_>>().join("/")
}
