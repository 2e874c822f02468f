use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const CONFIG: &str = "\
buffers
   eff addr: 3
    fp adds: 3
    fp muls: 2
       ints: 4
    reorder: 8
latencies:
   fp_add: 2
   fp_sub: 2
   fp_mul: 10
   fp_div: 40
";

#[test]
fn runs_a_small_trace_to_completion() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("pipesim.cfg");
    let trace_path = dir.path().join("trace.txt");
    fs::write(&config_path, CONFIG).unwrap();
    fs::write(&trace_path, "add r1,r2,r3:0\nsub r4,r1,r5:0\n").unwrap();

    let mut cmd = Command::cargo_bin("pipesim").unwrap();
    cmd.arg("--config").arg(&config_path).arg("--trace").arg(&trace_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Pipeline Simulation"))
        .stdout(predicate::str::contains("add r1,r2,r3:0"))
        .stdout(predicate::str::contains("reorder buffer delays:"));
}

#[test]
fn reads_trace_from_stdin_when_not_given() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("pipesim.cfg");
    fs::write(&config_path, CONFIG).unwrap();

    let mut cmd = Command::cargo_bin("pipesim").unwrap();
    cmd.arg("--config").arg(&config_path).write_stdin("add r1,r2,r3:0\n");
    cmd.assert().success().stdout(predicate::str::contains("add r1,r2,r3:0"));
}

#[test]
fn missing_config_file_is_a_clean_failure() {
    let mut cmd = Command::cargo_bin("pipesim").unwrap();
    cmd.arg("--config").arg("/nonexistent/pipesim.cfg").write_stdin("add r1,r2,r3:0\n");
    cmd.assert().failure().code(2).stderr(predicate::str::contains("pipesim:"));
}

#[test]
fn unknown_opcode_in_trace_is_a_clean_failure() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("pipesim.cfg");
    fs::write(&config_path, CONFIG).unwrap();

    let mut cmd = Command::cargo_bin("pipesim").unwrap();
    cmd.arg("--config").arg(&config_path).write_stdin("xor r1,r2,r3:0\n");
    cmd.assert().failure().code(2).stderr(predicate::str::contains("xor"));
}

#[test]
fn output_is_identical_across_runs() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("pipesim.cfg");
    fs::write(&config_path, CONFIG).unwrap();
    let trace = "fadd.s f1,f2,f3:0\nfadd.s f4,f1,f5:0\n";

    let run = || {
        let mut cmd = Command::cargo_bin("pipesim").unwrap();
        cmd.arg("--config").arg(&config_path).write_stdin(trace);
        cmd.assert().success().get_output().stdout.clone()
    };

    assert_eq!(run(), run());
}
