use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const C_PLAN_CSV: &str = "\
工程,作業位置,要素作業,時間
1,A棚,部品取出,3
1,,歩行,2
1,B台,締付,4
2,C台,検査,5
2,,歩行,1
3,D台,梱包,6
";

fn write_plan(dir: &Path) -> PathBuf {
    let path = dir.join("plan.csv");
    std::fs::write(&path, C_PLAN_CSV).expect("write fixture");
    path
}

fn run_linekit(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_linekit"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to start linekit binary")
}

fn assert_success(output: &Output) -> String {
    assert!(
        output.status.success(),
        "Process exited with non-zero status: {}\nStdout: {}\nStderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn move_by_id_writes_default_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_plan(dir.path());

    let output = run_linekit(
        dir.path(),
        &[
            "move",
            "--input",
            input.to_str().unwrap(),
            "--move",
            "2=3",
            "--ids",
            "5",
            "--to",
            "2",
        ],
    );
    let stdout = assert_success(&output);

    assert!(stdout.contains("move ID 2 -> 3"), "{stdout}");
    assert!(stdout.contains("move ID 5 -> 2"), "{stdout}");
    assert!(stdout.contains("1: 6 (1 units)"), "{stdout}");
    assert!(stdout.contains("2: 8 (2 units)"), "{stdout}");
    assert!(stdout.contains("3: 7 (2 units)"), "{stdout}");
    assert!(stdout.contains("total=21 bottleneck=2 (8) efficiency=87.5%"), "{stdout}");
    assert!(stdout.contains("units_moved=2 rows_moved=2 warnings=0"), "{stdout}");

    let v_bytes = std::fs::read(dir.path().join("updated_process_plan.xlsx")).unwrap();
    assert!(v_bytes.starts_with(b"PK"));
}

#[test]
fn move_by_rule_keeps_units_whole() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_plan(dir.path());
    let path_out = dir.path().join("moved.xlsx");

    let output = run_linekit(
        dir.path(),
        &[
            "move",
            "--input",
            input.to_str().unwrap(),
            "--output",
            path_out.to_str().unwrap(),
            "--rule",
            "task=歩行,to=3",
        ],
    );
    let stdout = assert_success(&output);

    assert!(stdout.contains("move [task=歩行] -> 3"), "{stdout}");
    assert!(stdout.contains("1: 3 (1 units)"), "{stdout}");
    assert!(stdout.contains("3: 13 (3 units)"), "{stdout}");
    assert!(stdout.contains("units_moved=2 rows_moved=3"), "{stdout}");
    assert!(path_out.exists());
}

#[test]
fn move_unknown_id_warns_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_plan(dir.path());

    let output = run_linekit(
        dir.path(),
        &["move", "--input", input.to_str().unwrap(), "--move", "99=2"],
    );
    let stdout = assert_success(&output);

    assert!(stdout.contains("warning: ID:99 does not exist; skipped."), "{stdout}");
    assert!(stdout.contains("units_moved=0 rows_moved=0 warnings=1"), "{stdout}");
}

#[test]
fn move_to_unknown_process_fails_unless_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_plan(dir.path());
    let c_input = input.to_str().unwrap();

    let output = run_linekit(dir.path(), &["move", "--input", c_input, "--move", "1=9"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown target process: \"9\""), "{stderr}");
    assert!(!dir.path().join("updated_process_plan.xlsx").exists());

    let output = run_linekit(
        dir.path(),
        &["move", "--input", c_input, "--move", "1=9", "--allow-new-process"],
    );
    let stdout = assert_success(&output);
    assert!(stdout.contains("9: 6 (1 units)"), "{stdout}");
}

#[test]
fn list_targets_prints_other_stations() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_plan(dir.path());

    let output = run_linekit(
        dir.path(),
        &["move", "--input", input.to_str().unwrap(), "--list-targets"],
    );
    let stdout = assert_success(&output);

    assert!(stdout.contains("ID 1 (3): 1, 2"), "{stdout}");
    assert!(stdout.contains("ID 4 (1): 2, 3"), "{stdout}");
    assert!(!dir.path().join("updated_process_plan.xlsx").exists());
}

#[test]
fn move_without_rules_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_plan(dir.path());

    let output = run_linekit(dir.path(), &["move", "--input", input.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no moves given"), "{stderr}");
}
