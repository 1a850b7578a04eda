use milpkit::batch::solve_files;
use milpkit::utils::json::{load_json, save_json};
use milpkit::{Instance, OutputFormat, ProblemKind, SolveStatus, SolverConfig};

#[test]
fn routing_and_product_demos_solve() {
    let config = SolverConfig::default();
    for (kind, objective) in [
        (ProblemKind::Fleet, 85.0),
        (ProblemKind::Staff, 8.0),
        (ProblemKind::Product, 1445.0 + 60.0 * 745.0 / 115.0 + 45.0 * (33.0 - 5.0 * 745.0 / 115.0)),
    ] {
        let report = kind.demo().solve(kind.as_str(), &config);
        assert_eq!(report.status, SolveStatus::Optimal, "{kind}: {:?}", report.error);
        let got = report.objective.unwrap();
        assert!((got - objective).abs() < 1e-4, "{kind}: {got} != {objective}");
        assert!(report.variables > 0);
        assert!(report.constraints > 0);
    }
}

#[test]
fn schedule_demo_costs_111() {
    let report = ProblemKind::Schedule.demo().solve("schedule", &SolverConfig::default());
    assert_eq!(report.status, SolveStatus::Optimal, "{:?}", report.error);
    assert!((report.objective.unwrap() - 111.0).abs() < 1e-6);
    assert!(report.solution.starts_with("Execution cost: 111\nprocessor 1:\ntask 2: "));
    assert!(report.solution.contains("processor 3:\ntask 1: "));
}

#[test]
fn batch_keeps_going_past_unreadable_files() {
    let dir = std::env::temp_dir();
    let good = dir.join(format!("milpkit-batch-{}.json", std::process::id()));
    let missing = dir.join(format!("milpkit-batch-missing-{}.json", std::process::id()));
    save_json(&ProblemKind::Staff.demo(), &good).unwrap();

    let reports = solve_files(&[missing, good.clone()], &SolverConfig::default());
    std::fs::remove_file(&good).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].status, SolveStatus::InvalidInstance);
    assert_eq!(reports[0].kind, None);
    assert_eq!(reports[1].status, SolveStatus::Optimal);
    assert_eq!(reports[1].kind, Some(ProblemKind::Staff));
}

#[test]
fn instance_file_solves_like_the_demo() {
    let path = std::env::temp_dir().join(format!("milpkit-fleet-{}.json", std::process::id()));
    save_json(&ProblemKind::Fleet.demo(), &path).unwrap();
    let instance: Instance = load_json(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let report = instance.solve("fleet-file", &SolverConfig::default());
    assert_eq!(report.status, SolveStatus::Optimal);
    assert!(report.solution.contains("Vehicle 2:"));

    let csv = milpkit::report::format_reports(&[report], OutputFormat::Csv).unwrap();
    assert!(csv.lines().nth(1).unwrap().starts_with("fleet,fleet-file,optimal,"));
}

#[test]
fn hand_written_schedule_json_is_accepted() {
    let json = r#"{
        "kind": "schedule",
        "tasks": 2,
        "processors": 1,
        "edges": [{ "from": 0, "to": 1, "weight": 4.0 }],
        "exec_times": [[1.0, 2.0]],
        "deadline": 5.0,
        "cost_rates": [3.0]
    }"#;
    let instance: Instance = serde_json::from_str(json).unwrap();
    let report = instance.solve("tiny", &SolverConfig::default());
    assert_eq!(report.status, SolveStatus::Optimal);
    assert!((report.objective.unwrap() - 9.0).abs() < 1e-6);
}
