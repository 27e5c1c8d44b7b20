use std::fs;
use std::io::Write;

use chrono::NaiveDate;

use aufsichtsplan::config::{load_config, PlannerKind};
use aufsichtsplan::gpu::{generate_gpu009, import_gpu001_file};
use aufsichtsplan::models::{DateRange, Weekday};
use aufsichtsplan::optimize::{optimize_week, SolverConfig, SolverStatus};
use aufsichtsplan::roster::import_roster_file;
use aufsichtsplan::scheduler::{audit_plan, GreedyPlanner, PlanKpi};
use aufsichtsplan::store::Store;
use aufsichtsplan::validation::validate_input;
use aufsichtsplan::views::{apply_manual_changes, week_counts, CellEdit};

const BREAKS: u8 = 4;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
}

/// Store with two floors and eight teachers teaching periods 1..=7 daily.
fn prepared_store(dir: &std::path::Path) -> Store {
    let roster = dir.join("kollegium.csv");
    let mut csv = String::from("Nachname;Vorname;Kürzel\n");
    for i in 1..=8 {
        csv.push_str(&format!("Lehrer{i};Vorname{i};T{i}\n"));
    }
    fs::write(&roster, csv).unwrap();

    let gpu001 = dir.join("GPU001.TXT");
    let mut file = fs::File::create(&gpu001).unwrap();
    let mut line_id = 0;
    for i in 1..=8 {
        for day in 1..=5 {
            for period in 1..=7 {
                line_id += 1;
                writeln!(file, "{line_id};\"5A\";\"T{i}\";\"MA\";\"101\";{day};{period};;").unwrap();
            }
        }
    }
    drop(file);

    let mut store = Store::open(dir.join("data").join("aufsichtsplan.json")).unwrap();
    store.add_floor("EG", 1, 0).unwrap();
    store.add_floor("OG", 1, 1).unwrap();

    let summary = import_roster_file(&roster, b';', &mut store.teachers).unwrap();
    assert_eq!(summary.created, 8);

    let stats = import_gpu001_file(&gpu001, &mut store.teachers).unwrap();
    assert_eq!(stats.imported, 8 * 5 * 7);
    assert_eq!(stats.errors, 0);

    let ids: Vec<u32> = store.teachers.iter().map(|t| t.id).collect();
    assert_eq!(store.bulk_set_quota(&ids, 5), 8);
    store
}

#[test]
fn test_greedy_week_roundtrip_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = prepared_store(dir.path());
    assert!(validate_input(&store.teachers, &store.floors).is_ok());

    let range = DateRange::school_week(monday());
    let outcome = GreedyPlanner::new()
        .with_breaks_per_day(BREAKS)
        .with_seed(7)
        .plan(&store.teachers, &store.floors, &store.plan, range);
    assert_eq!(outcome.stats.required_positions, 40);
    assert_eq!(outcome.stats.filled_positions, 40);
    assert_eq!(outcome.stats.unfilled_slots, 0);
    store.plan = outcome.plan;
    store.save().unwrap();

    let reopened = Store::open(store.path()).unwrap();
    assert_eq!(reopened.teachers, store.teachers);
    assert_eq!(reopened.floors, store.floors);
    assert_eq!(reopened.plan, store.plan);

    let kpi = PlanKpi::calculate(&reopened.plan, &reopened.teachers, &reopened.floors, &range, BREAKS);
    assert_eq!(kpi.shortfall, 0);
    assert!((kpi.coverage - 1.0).abs() < 1e-9);

    let text = generate_gpu009(&reopened.plan, &reopened.teachers, &reopened.floors, &range);
    assert_eq!(text.lines().count(), 40);
    assert!(text.ends_with('\n'));

    let (rows, total) = week_counts(&reopened.plan, &reopened.teachers, &range);
    assert_eq!(total, 40);
    assert_eq!(rows.len(), 8);

    // Every teacher teaches around every break, so no lesson rule is broken.
    let violations = audit_plan(&reopened.plan, &reopened.teachers, &range);
    assert!(violations
        .iter()
        .all(|v| v.kind != aufsichtsplan::models::ViolationKind::NoLesson));
}

#[test]
fn test_optimized_week_is_fair() {
    let dir = tempfile::tempdir().unwrap();
    let store = prepared_store(dir.path());

    let config = SolverConfig {
        seed: Some(11),
        ..SolverConfig::default()
    };
    let outcome = optimize_week(&store.teachers, &store.floors, &store.plan, monday(), BREAKS, &config);

    assert_eq!(outcome.result.total_shortfall, 0);
    assert_ne!(outcome.result.status, SolverStatus::Infeasible);
    assert!(outcome.result.max_dev <= 1);
    let range = DateRange::school_week(monday());
    assert_eq!(outcome.plan.assignments_in(&range).len(), 40);
}

#[test]
fn test_manual_edit_replaces_week() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = prepared_store(dir.path());
    let range = DateRange::school_week(monday());
    store.plan = GreedyPlanner::new()
        .with_seed(1)
        .plan(&store.teachers, &store.floors, &store.plan, range)
        .plan;

    let edits: Vec<CellEdit> = serde_json::from_str(
        r#"[
            {"day": 2, "break_index": 3, "floor": "OG", "teachers": ["T1", "Lehrer2, Vorname2"]},
            {"day": 0, "break_index": 1, "floor": "Pausenhof", "teachers": ["Niemand"]}
        ]"#,
    )
    .unwrap();
    let summary = apply_manual_changes(&mut store, monday(), &edits).unwrap();
    assert_eq!(summary.created_assignments, 2);
    assert_eq!(summary.unknown_teachers, vec!["Niemand".to_string()]);
    assert_eq!(summary.created_floors, vec!["Pausenhof".to_string()]);

    store.save().unwrap();
    let reopened = Store::open(store.path()).unwrap();
    let week = reopened.plan.assignments_in(&range);
    assert_eq!(week.len(), 2);
    assert!(week
        .iter()
        .all(|a| a.slot.weekday() == Some(Weekday::Wednesday) && a.break_index() == 3));
    assert!(reopened.floor_by_name("Pausenhof").is_some());
}

#[test]
fn test_config_file_selects_planner_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("plan.json");
    let config_path = dir.path().join("aufsichtsplan.toml");
    fs::write(
        &config_path,
        format!(
            "[planning]\nplanner = \"optimize\"\nbreaks_per_day = 3\n\n[store]\npath = {:?}\n",
            store_path.display().to_string()
        ),
    )
    .unwrap();

    let config = load_config(Some(&config_path)).unwrap();
    assert_eq!(config.planning.planner, PlannerKind::Optimize);
    assert_eq!(config.planning.breaks_per_day, 3);
    assert_eq!(config.store_path(), store_path);

    let store = Store::open(config.store_path()).unwrap();
    assert!(store.teachers.is_empty());
    assert!(!store_path.exists());
}
