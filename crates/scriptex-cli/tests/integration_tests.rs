use std::{fs, path::Path};

use assert_cmd::Command;
use rstest::rstest;

fn scripts_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scripts.yml"),
        "greeting:\n  file: greeting.rhai\ncounter:\n  file: counter.rhai\n  cache: STATIC\nbroken:\n  file: broken.rhai\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("greeting.rhai"),
        "// %player_name% is ignored here\nlet who = if args.len() > 0 { args[0] } else { \"world\" };\n`Hello, ${who}!`",
    )
    .unwrap();
    fs::write(
        dir.path().join("counter.rhai"),
        "let n = Data.get_or(\"n\", 0) + 1; Data.set(\"n\", n); n",
    )
    .unwrap();
    fs::write(dir.path().join("broken.rhai"), "throw \"nope\";").unwrap();
    dir
}

fn scriptex(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("scriptex").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("SCRIPTEX_CONFIG")
        .arg("--dir")
        .arg(dir);
    cmd
}

#[rstest]
#[case::no_args(&[], "Hello, world!\n")]
#[case::with_arg(&["Alex"], "Hello, Alex!\n")]
fn test_eval(#[case] args: &[&str], #[case] expected: &str) {
    let dir = scripts_dir();
    scriptex(dir.path())
        .arg("eval")
        .arg("greeting")
        .args(args)
        .assert()
        .success()
        .stdout(expected.to_string());
}

#[test]
fn test_eval_script_error_returns_sentinel() {
    let dir = scripts_dir();
    scriptex(dir.path())
        .args(["eval", "broken"])
        .assert()
        .success()
        .stdout("Script error (check console)\n");
}

#[test]
fn test_eval_unknown_script_fails() {
    let dir = scripts_dir();
    scriptex(dir.path()).args(["eval", "missing"]).assert().failure();
}

#[test]
fn test_eval_persists_data() {
    let dir = scripts_dir();
    scriptex(dir.path())
        .args(["eval", "counter"])
        .assert()
        .success()
        .stdout("1\n");
    scriptex(dir.path())
        .args(["eval", "counter"])
        .assert()
        .success()
        .stdout("2\n");

    let saved = fs::read_to_string(dir.path().join("data").join("counter_data.yml")).unwrap();
    assert!(saved.contains("n: 2"));
}

#[test]
fn test_list() {
    let dir = scripts_dir();
    let output = scriptex(dir.path()).arg("list").assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();

    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["broken (disabled)", "counter (STATIC)", "greeting (disabled)"]
    );
}

#[rstest]
#[case::arithmetic(&["parse", "1 + 1"], "2\n")]
#[case::static_value(&["--set", "server_name=Lobby", "parse", "\"%server_name%\""], "Lobby\n")]
#[case::player(&["parse", "Player.name", "--player", "Alex"], "Alex\n")]
#[case::offline_player(&["parse", "OfflinePlayer.is_online", "--player", "Alex", "--offline"], "false\n")]
#[case::library(&["parse", "numbers::format_thousands(1234567)"], "1,234,567\n")]
fn test_parse(#[case] args: &[&str], #[case] expected: &str) {
    let dir = scripts_dir();
    scriptex(dir.path())
        .args(args)
        .assert()
        .success()
        .stdout(expected.to_string());
}

#[test]
fn test_console() {
    let dir = scripts_dir();
    let output = scriptex(dir.path())
        .arg("console")
        .write_stdin("scriptex list\nsx parse anon 6 * 7\nbogus\nscriptex reload\nquit\nscriptex list\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec![
            "3 script(s) loaded: broken, counter, greeting",
            "42",
            "Unknown command bogus. Known commands: scriptex, sx",
            "Reloaded 3 script(s)",
        ]
    );
}

#[test]
fn test_missing_configuration_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    scriptex(dir.path()).arg("list").assert().success().stdout("");
}
