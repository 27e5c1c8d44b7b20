use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use aufsichtsplan::config::{self, Config, PlannerKind};
use aufsichtsplan::export::{floor_tables, week_table, write_plan_csv};
use aufsichtsplan::gpu::{
    clear_lessons, generate_gpu009, import_gpu001_file, lesson_stats, update_attendance_from_lessons,
};
use aufsichtsplan::models::{monday_of_week, Attendance, DateRange, TeacherId};
use aufsichtsplan::optimize::optimize_week;
use aufsichtsplan::roster::import_roster_file;
use aufsichtsplan::scheduler::{audit_plan, GreedyPlanner, PlanKpi};
use aufsichtsplan::store::Store;
use aufsichtsplan::update::{install_update, GithubReleases, Updater};
use aufsichtsplan::validation::validate_input;
use aufsichtsplan::version::{VersionInfo, VERSION};
use aufsichtsplan::views::{apply_manual_changes, week_counts, CellEdit};

mod ui;

#[derive(Parser)]
#[command(
    name = "aufsicht",
    version,
    about = "Plan break supervision duties for a school week"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Store file (overrides config and environment)")]
    store: Option<PathBuf>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "More log output (-v, -vv)")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Teacher roster and quotas
    Teachers {
        #[command(subcommand)]
        action: TeacherAction,
    },
    /// Attendance days
    Attendance {
        #[command(subcommand)]
        action: AttendanceAction,
    },
    /// Supervision areas
    Floors {
        #[command(subcommand)]
        action: FloorAction,
    },
    /// Timetable lessons (GPU001)
    Lessons {
        #[command(subcommand)]
        action: LessonAction,
    },
    /// Supervision plan of a week
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// Check teachers and floors for inconsistencies
    Validate,
    /// Self-update from published releases
    Update {
        #[command(subcommand)]
        action: UpdateAction,
    },
    /// Print version information
    Version {
        /// Print the version descriptor as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TeacherAction {
    /// List teachers
    List,
    /// Import a CSV roster
    Import {
        file: PathBuf,
        /// Field delimiter (default from config)
        #[arg(short, long)]
        delimiter: Option<char>,
    },
    /// Exempt teachers from supervision
    Exempt {
        #[arg(required = true)]
        ids: Vec<TeacherId>,
        /// Remove the exemption instead
        #[arg(long)]
        off: bool,
    },
    /// Set the duty quota of teachers
    Quota {
        target: u32,
        #[arg(required = true)]
        ids: Vec<TeacherId>,
    },
    /// Set or clear a teacher's preferred floor
    Prefer {
        id: TeacherId,
        /// Floor id; omit to clear
        #[arg(long)]
        floor: Option<u32>,
    },
    /// Delete a teacher and their duties
    Delete { id: TeacherId },
}

#[derive(Subcommand)]
enum AttendanceAction {
    /// List attendance days
    List,
    /// Set attendance by last name, e.g. `Mo,Mi,Fr` or `Mo-Fr`
    Set { last_name: String, days: String },
}

#[derive(Subcommand)]
enum FloorAction {
    /// List floors in display order
    List,
    /// Add a floor
    Add {
        name: String,
        #[arg(long, default_value = "1")]
        required: u32,
        #[arg(long, default_value = "0")]
        order: i32,
    },
    /// Change a floor's display order
    Order { id: u32, order: i32 },
    /// Delete a floor with its duties
    Delete { id: u32 },
}

#[derive(Subcommand)]
enum LessonAction {
    /// Import a GPU001.TXT timetable
    Import { file: PathBuf },
    /// Lesson counts
    Stats,
    /// Remove all lessons
    Clear,
    /// Set every teacher's attendance to their lesson days
    DeriveAttendance,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlannerArg {
    Greedy,
    Optimize,
}

impl From<PlannerArg> for PlannerKind {
    fn from(arg: PlannerArg) -> Self {
        match arg {
            PlannerArg::Greedy => PlannerKind::Greedy,
            PlannerArg::Optimize => PlannerKind::Optimize,
        }
    }
}

#[derive(Subcommand)]
enum PlanAction {
    /// Generate the plan of a week
    Generate {
        /// Any date in the week (default: today)
        #[arg(long)]
        week: Option<NaiveDate>,
        #[arg(long, value_enum)]
        planner: Option<PlannerArg>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the week table
    Show {
        #[arg(long)]
        week: Option<NaiveDate>,
        /// One table per floor
        #[arg(long)]
        by_floor: bool,
    },
    /// Duties per teacher
    Counts {
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// Coverage, fairness and rule violations
    Kpi {
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// Export GPU009 for the timetable software
    Gpu009 {
        #[arg(long)]
        week: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export the week as CSV
    Csv {
        #[arg(long)]
        week: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the week with edited cells from a JSON file
    Edit {
        file: PathBuf,
        #[arg(long)]
        week: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum UpdateAction {
    /// Check for a newer release
    Check,
    /// Download and install the newest release
    Install {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Executable to replace (default: this one)
        #[arg(long)]
        target: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "aufsichtsplan=warn",
        1 => "aufsichtsplan=info",
        _ => "aufsichtsplan=debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        ui::display_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Version { json } = cli.command {
        let info = VersionInfo::current();
        if json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            println!("aufsicht {info}");
        }
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref()).context("loading configuration")?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path());

    match cli.command {
        Commands::Teachers { action } => teachers(action, &config, &store_path),
        Commands::Attendance { action } => attendance(action, &store_path),
        Commands::Floors { action } => floors(action, &store_path),
        Commands::Lessons { action } => lessons(action, &store_path),
        Commands::Plan { action } => plan(action, &config, &store_path),
        Commands::Validate => validate(&store_path),
        Commands::Update { action } => update(action, &config),
        Commands::Version { .. } => Ok(()),
    }
}

fn open_store(path: &Path) -> Result<Store> {
    Store::open(path).with_context(|| format!("opening store {}", path.display()))
}

fn week_range(week: Option<NaiveDate>) -> DateRange {
    let date = week.unwrap_or_else(|| chrono::Local::now().date_naive());
    DateRange::school_week(monday_of_week(date))
}

fn teachers(action: TeacherAction, config: &Config, store_path: &Path) -> Result<()> {
    let mut store = open_store(store_path)?;
    match action {
        TeacherAction::List => {
            ui::display_heading(&format!("{} teachers", store.teachers.len()));
            for t in store.teachers_sorted() {
                let floor = t
                    .preferred_floor
                    .and_then(|id| store.floor(id))
                    .map(|f| f.name.as_str())
                    .unwrap_or("-");
                println!(
                    "{:>4}  {:<6} {:<24} quota {:>2}  {:<16} floor {:<8} lessons {:>3}{}",
                    t.id,
                    t.abbreviation.as_deref().unwrap_or(""),
                    t.full_name(),
                    t.target_duties,
                    t.attendance.to_string(),
                    floor,
                    t.lessons.len(),
                    if t.exempt { "  (exempt)" } else { "" }
                );
            }
            return Ok(());
        }
        TeacherAction::Import { file, delimiter } => {
            let delimiter = match delimiter {
                Some(c) if c.is_ascii() => c as u8,
                Some(c) => bail!("delimiter {c:?} is not an ASCII character"),
                None => config.roster_delimiter(),
            };
            let summary = import_roster_file(&file, delimiter, &mut store.teachers)?;
            ui::display_success(&format!(
                "{} created, {} updated, {} skipped",
                summary.created, summary.updated, summary.skipped
            ));
        }
        TeacherAction::Exempt { ids, off } => {
            let changed = store.bulk_set_exempt(&ids, !off);
            ui::display_success(&format!("{changed} teacher(s) changed"));
        }
        TeacherAction::Quota { target, ids } => {
            let changed = store.bulk_set_quota(&ids, target);
            ui::display_success(&format!("quota {target} set for {changed} teacher(s)"));
        }
        TeacherAction::Prefer { id, floor } => {
            store.set_preferred_floor(id, floor)?;
            ui::display_success("preferred floor updated");
        }
        TeacherAction::Delete { id } => {
            let removed = store.delete_teacher(id)?;
            ui::display_success(&format!("teacher {id} deleted with {removed} duties"));
        }
    }
    store.save()?;
    Ok(())
}

fn attendance(action: AttendanceAction, store_path: &Path) -> Result<()> {
    let mut store = open_store(store_path)?;
    match action {
        AttendanceAction::List => {
            for t in store.teachers_sorted() {
                println!(
                    "{:>4} {:<15} {:<15} {:>3} {}",
                    t.id,
                    t.last_name,
                    t.first_name,
                    t.attendance.bits(),
                    t.attendance
                );
            }
            Ok(())
        }
        AttendanceAction::Set { last_name, days } => {
            let attendance: Attendance = days.parse()?;
            let matched = store.set_attendance_by_last_name(&last_name, attendance);
            if matched == 0 {
                ui::display_warning(&format!("no teacher with last name '{last_name}'"));
                return Ok(());
            }
            store.save()?;
            ui::display_success(&format!(
                "attendance of {last_name} set to {attendance} (code {})",
                attendance.bits()
            ));
            Ok(())
        }
    }
}

fn floors(action: FloorAction, store_path: &Path) -> Result<()> {
    let mut store = open_store(store_path)?;
    match action {
        FloorAction::List => {
            for f in store.floors_sorted() {
                println!(
                    "{:>4}  {:<20} {} per break  order {}",
                    f.id,
                    f.name,
                    f.required(),
                    f.order_index
                );
            }
            return Ok(());
        }
        FloorAction::Add {
            name,
            required,
            order,
        } => {
            let id = store.add_floor(&name, required, order)?;
            ui::display_success(&format!("floor '{}' has id {id}", name.trim()));
        }
        FloorAction::Order { id, order } => {
            store.reorder_floor(id, order)?;
            ui::display_success("floor order updated");
        }
        FloorAction::Delete { id } => {
            let removed = store.delete_floor(id)?;
            ui::display_success(&format!("floor {id} deleted with {removed} duties"));
        }
    }
    store.save()?;
    Ok(())
}

fn lessons(action: LessonAction, store_path: &Path) -> Result<()> {
    let mut store = open_store(store_path)?;
    match action {
        LessonAction::Import { file } => {
            let stats = import_gpu001_file(&file, &mut store.teachers)?;
            ui::display_success(&format!(
                "{} lines read, {} lessons imported, {} malformed, {} with unknown abbreviation",
                stats.processed, stats.imported, stats.errors, stats.unknown_teachers
            ));
        }
        LessonAction::Stats => {
            let stats = lesson_stats(&store.teachers);
            println!(
                "{} lessons, {} of {} teachers have lessons",
                stats.total_lessons, stats.teachers_with_lessons, stats.teachers_total
            );
            return Ok(());
        }
        LessonAction::Clear => {
            let removed = clear_lessons(&mut store.teachers);
            ui::display_success(&format!("{removed} lessons removed"));
        }
        LessonAction::DeriveAttendance => {
            let changed = update_attendance_from_lessons(&mut store.teachers);
            ui::display_success(&format!("attendance of {changed} teacher(s) updated"));
        }
    }
    store.save()?;
    Ok(())
}

fn check_input(store: &Store) -> Result<()> {
    if let Err(errors) = validate_input(&store.teachers, &store.floors) {
        for e in &errors {
            ui::display_error(&e.message);
        }
        bail!("{} validation error(s)", errors.len());
    }
    Ok(())
}

fn validate(store_path: &Path) -> Result<()> {
    let store = open_store(store_path)?;
    check_input(&store)?;
    ui::display_success("teachers and floors are consistent");
    Ok(())
}

fn plan(action: PlanAction, config: &Config, store_path: &Path) -> Result<()> {
    let mut store = open_store(store_path)?;
    let breaks = config.planning.breaks_per_day;

    match action {
        PlanAction::Generate {
            week,
            planner,
            seed,
        } => {
            check_input(&store)?;
            if store.floors.is_empty() {
                bail!("no floors defined");
            }
            let range = week_range(week);
            let seed = seed.or(config.planning.seed);
            let kind = planner.map(PlannerKind::from).unwrap_or(config.planning.planner);

            ui::display_status(&format!("planning week of {}", range.start));
            match kind {
                PlannerKind::Greedy => {
                    let outcome = GreedyPlanner::new()
                        .with_breaks_per_day(breaks)
                        .with_optional_seed(seed)
                        .plan(&store.teachers, &store.floors, &store.plan, range);
                    let s = &outcome.stats;
                    ui::display_success(&format!(
                        "{}/{} positions filled, {} slot(s) short, fallbacks {:?}",
                        s.filled_positions, s.required_positions, s.unfilled_slots, s.fallback_assignments
                    ));
                    store.plan = outcome.plan;
                }
                PlannerKind::Optimize => {
                    let mut solver = config.solver.clone();
                    solver.seed = seed.or(solver.seed);
                    let outcome = optimize_week(
                        &store.teachers,
                        &store.floors,
                        &store.plan,
                        range.start,
                        breaks,
                        &solver,
                    );
                    let r = &outcome.result;
                    ui::display_success(&format!(
                        "{}: {} assignments, shortfall {}, max deviation {}, {} iterations in {:.2?}",
                        r.status,
                        r.assignments.len(),
                        r.total_shortfall,
                        r.max_dev,
                        r.iterations,
                        r.wall_time
                    ));
                    store.plan = outcome.plan;
                }
            }
            store.save()?;
            print!(
                "{}",
                week_table(&store.plan, &store.teachers, &store.floors, range.start, breaks)
            );
        }
        PlanAction::Show { week, by_floor } => {
            let range = week_range(week);
            let text = if by_floor {
                floor_tables(&store.plan, &store.teachers, &store.floors, range.start, breaks)
            } else {
                week_table(&store.plan, &store.teachers, &store.floors, range.start, breaks)
            };
            print!("{text}");
        }
        PlanAction::Counts { week } => {
            let range = week_range(week);
            let (rows, total) = week_counts(&store.plan, &store.teachers, &range);
            for r in rows {
                println!(
                    "{:<6} {:<24} {:>2} / {:>2}",
                    r.abbreviation,
                    format!("{}, {}", r.last_name, r.first_name),
                    r.count,
                    r.target
                );
            }
            println!("total {total}");
        }
        PlanAction::Kpi { week } => {
            let range = week_range(week);
            let kpi = PlanKpi::calculate(&store.plan, &store.teachers, &store.floors, &range, breaks);
            println!(
                "coverage {:.1}% ({}/{}), shortfall {}",
                kpi.coverage * 100.0,
                kpi.filled_positions,
                kpi.required_positions,
                kpi.shortfall
            );
            println!(
                "max deviation {}, over {}, under {}, daily excess {}",
                kpi.max_deviation, kpi.total_over, kpi.total_under, kpi.daily_excess
            );
            let violations = audit_plan(&store.plan, &store.teachers, &range);
            if !violations.is_empty() {
                ui::display_heading(&format!("{} rule violation(s)", violations.len()));
                for v in violations {
                    println!("  {:?}: {}", v.kind, v.message);
                }
            }
        }
        PlanAction::Gpu009 { week, output } => {
            let range = week_range(week);
            let text = generate_gpu009(&store.plan, &store.teachers, &store.floors, &range);
            match output {
                Some(path) => {
                    fs::write(&path, text)?;
                    ui::display_success(&format!("written {}", path.display()));
                }
                None => print!("{text}"),
            }
        }
        PlanAction::Csv { week, output } => {
            let range = week_range(week);
            match output {
                Some(path) => {
                    let file = fs::File::create(&path)?;
                    let rows = write_plan_csv(file, &store.plan, &store.teachers, &store.floors, &range)?;
                    ui::display_success(&format!("{rows} rows written to {}", path.display()));
                }
                None => {
                    write_plan_csv(
                        std::io::stdout().lock(),
                        &store.plan,
                        &store.teachers,
                        &store.floors,
                        &range,
                    )?;
                }
            }
        }
        PlanAction::Edit { file, week } => {
            let range = week_range(week);
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let edits: Vec<CellEdit> = serde_json::from_str(&text)?;
            let summary = apply_manual_changes(&mut store, range.start, &edits)?;
            store.save()?;
            for name in &summary.unknown_teachers {
                ui::display_warning(&format!("teacher '{name}' not found"));
            }
            ui::display_success(&format!(
                "{} assignments saved from {} cells",
                summary.created_assignments, summary.total_cells
            ));
        }
    }
    Ok(())
}

fn update(action: UpdateAction, config: &Config) -> Result<()> {
    let source = GithubReleases::new(
        &config.update.repository,
        Duration::from_secs(config.update.timeout_secs),
    )?;
    let updater = Updater::new(source, VERSION, config.update.asset_name.clone());

    ui::display_status("checking for updates...");
    let Some(info) = updater.check_for_updates()? else {
        ui::display_success(&format!("version {VERSION} is up to date"));
        return Ok(());
    };
    ui::display_success(&format!(
        "version {} available ({} bytes, published {})",
        info.version, info.size, info.published_at
    ));
    if !info.release_notes.is_empty() {
        println!("{}", info.release_notes);
    }

    let UpdateAction::Install { yes, target } = action else {
        return Ok(());
    };
    if !yes && !ui::confirm_action(&format!("Install version {}?", info.version))? {
        println!("Update cancelled.");
        return Ok(());
    }

    let target = match target {
        Some(path) => path,
        None => std::env::current_exe()?,
    };
    let downloaded = updater.download_update(&info, &mut ui::display_progress)?;
    install_update(downloaded.path(), &target)?;
    ui::display_success(&format!("updated to {}", info.version));
    Ok(())
}
