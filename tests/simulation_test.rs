use std::process::{Command, Output};

fn run_simulation(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_logistics_sim"))
        .args(args)
        .env("RUST_LOG", "warn,logistics_sim=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Pull the number after `label` out of the log output
fn logged_count(stderr: &str, label: &str) -> u64 {
    let line = stderr
        .lines()
        .find(|line| line.contains(label))
        .unwrap_or_else(|| panic!("Could not find '{}' line", label));

    // Format: "[2025-11-17T17:10:52Z INFO  logistics_sim] Deliveries completed: 2"
    let parts: Vec<&str> = line.split(label).collect();
    parts
        .get(1)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_else(|| panic!("Could not parse count from line: {}", line))
}

/// Test that the simulation runs headless without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_simulation(&["--ticks", "100", "--seed", "1"]);

    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that simulation statistics are logged
#[test]
fn test_simulation_statistics_logged() {
    let output = run_simulation(&["--ticks", "50", "--seed", "2"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for label in [
        "Money:",
        "Deliveries completed:",
        "Clients served:",
        "Clients abandoned:",
        "Service rate:",
        "Units discarded:",
        "Total nodes:",
        "Total vehicles:",
    ] {
        assert!(stderr.contains(label), "Missing '{}' statistic", label);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Final State ==="));
}

/// The demo network delivers its first order within a minute
#[test]
fn test_demo_orders_get_delivered() {
    let output = run_simulation(&["--ticks", "600", "--seed", "3"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(logged_count(&stderr, "Deliveries completed:") >= 1);
    assert_eq!(logged_count(&stderr, "Total nodes:"), 5);
}

/// A state written with --export can be picked up again with --import
#[test]
fn test_export_then_import() {
    let path = std::env::temp_dir().join(format!(
        "logistics_sim_cli_{}.json",
        std::process::id()
    ));
    let file = path.to_str().expect("temp path is not valid UTF-8");

    let first = run_simulation(&["--ticks", "80", "--seed", "4", "--export", file]);
    assert!(first.status.success(), "Export run failed");
    assert!(path.exists());

    let second = run_simulation(&["--ticks", "20", "--seed", "4", "--import", file]);
    std::fs::remove_file(&path).ok();
    assert!(
        second.status.success(),
        "Import run failed. stderr: {}",
        String::from_utf8_lossy(&second.stderr)
    );

    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("Imported 5 nodes"));
}

#[test]
fn test_missing_import_file_fails() {
    let output = run_simulation(&["--ticks", "1", "--import", "/nonexistent/save.json"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to import state"));
}
