use std::process::{Command, Output};

fn nightwatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nightwatch"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run the nightwatch binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout is utf-8")
}

#[test]
fn exported_layout_imports_to_the_same_picture() {
    let generated = nightwatch(&["generate", "--seed", "11", "--export"]);
    assert!(generated.status.success());
    let text = stdout(&generated);
    let export = text
        .lines()
        .find(|line| line.starts_with("nightwatch:v1:"))
        .expect("layout string is printed");

    let imported = nightwatch(&["import", export]);
    assert!(imported.status.success());
    assert!(text.starts_with(&stdout(&imported)));
}

#[test]
fn generation_is_repeatable_for_a_seed() {
    let first = nightwatch(&["generate", "--seed", "5"]);
    let second = nightwatch(&["generate", "--seed", "5"]);

    assert!(first.status.success());
    assert_eq!(stdout(&first), stdout(&second));
    assert!(String::from_utf8_lossy(&first.stderr).contains("seed: 5"));
}

#[test]
fn simulation_prints_a_report() {
    let output = nightwatch(&["simulate", "--seed", "1", "--ticks", "20", "--show-view"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("ticks:"));
    assert!(text.contains('@'));
}

#[test]
fn garbage_layouts_are_rejected() {
    let output = nightwatch(&["import", "lantern:v1:3x3:e30"]);

    assert!(!output.status.success());
}
