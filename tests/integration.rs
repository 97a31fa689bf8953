use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn gwp_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gwp"))
}

const LEXICON: &str = r#"
exclude = ["NOS"]

[entities.vvd]
name = "Volkspartij voor Vrijheid en Democratie"
keywords = ["VVD", "Rutte"]
handles = ["markrutte"]

[entities.cda]
keywords = ["CDA"]
handles = ["cdavandaag"]

[entities.pvv]
keywords = ["PVV"]
handles = ["geertwilderspvv"]
"#;

fn tweet(author: &str, text: &str, retweet_of: Option<&str>) -> String {
    match retweet_of {
        Some(target) => format!(
            r#"{{"text":"{}","lang":"nl","user":{{"screen_name":"{}"}},"retweeted_status":{{"user":{{"screen_name":"{}"}}}}}}"#,
            text, author, target
        ),
        None => format!(
            r#"{{"text":"{}","lang":"nl","user":{{"screen_name":"{}"}}}}"#,
            text, author
        ),
    }
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("lexicon.toml"), LEXICON).unwrap();

    // Create corpus
    let day1 = root.join("archive/2017/03/01/12");
    let day2 = root.join("archive/2017/03/02/12");
    fs::create_dir_all(&day1).unwrap();
    fs::create_dir_all(&day2).unwrap();
    fs::write(
        day1.join("00.json"),
        [
            tweet("x", "I support the VVD", None),
            tweet("x", "Go Rutte!", None),
            tweet("y", "CDA forever", None),
            tweet("w", "RT", Some("MarkRutte")),
        ]
        .join("\n"),
    )
    .unwrap();
    fs::write(
        day2.join("00.json"),
        [
            tweet("NOS", "VVD VVD", None),
            tweet("v", "PVV of CDA", None),
            "garbage".to_string(),
        ]
        .join("\n"),
    )
    .unwrap();

    let config_content = format!(
        r#"[corpus]
root = "{root}/archive"

[lexicon]
path = "{root}/config/lexicon.toml"

[pipeline]
strategy = "keyword"
mode = "tally"
sample_size = 10
threads = 2

[output]
sample_path = "{root}/out/{{period}}/{{entity}}.txt"
tally_path = "{root}/out/votes-{{period}}.csv"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("gwp.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_gwp(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = gwp_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run gwp binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_run_tally_writes_votes() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_gwp(&config_path, &["run"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("accepted votes: 2"), "stdout={}", stdout);
    assert!(stdout.contains("malformed: 1"));
    assert!(stdout.contains("ok"));

    let votes = fs::read_to_string(tmp.path().join("out/votes-all.csv")).unwrap();
    assert_eq!(votes, "cda,1\npvv,0\nvvd,1\n");
}

#[test]
fn test_run_tally_date_override() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_gwp(
        &config_path,
        &["run", "--since", "2017-03-02", "--until", "2017-03-02"],
    );
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);

    let votes =
        fs::read_to_string(tmp.path().join("out/votes-2017-03-02_2017-03-02.csv")).unwrap();
    assert_eq!(votes, "cda,0\npvv,0\nvvd,0\n");
}

#[test]
fn test_run_repost_strategy() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_gwp(&config_path, &["run", "--strategy", "repost"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);

    let votes = fs::read_to_string(tmp.path().join("out/votes-all.csv")).unwrap();
    assert_eq!(votes, "cda,0\npvv,0\nvvd,1\n");
}

#[test]
fn test_run_sample_writes_one_file_per_entity() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_gwp(&config_path, &["run", "--mode", "sample", "--seed", "7"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);

    let vvd = fs::read_to_string(tmp.path().join("out/all/vvd.txt")).unwrap();
    let mut lines: Vec<&str> = vvd.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["I support the VVD"]);

    let cda = fs::read_to_string(tmp.path().join("out/all/cda.txt")).unwrap();
    assert_eq!(cda, "CDA forever\n");

    let pvv = fs::read_to_string(tmp.path().join("out/all/pvv.txt")).unwrap();
    assert_eq!(pvv, "");
}

#[test]
fn test_run_sample_zero_size() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_gwp(&config_path, &["run", "--mode", "sample", "--sample-size", "0"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(
        fs::read_to_string(tmp.path().join("out/all/vvd.txt")).unwrap(),
        ""
    );
}

#[test]
fn test_run_sample_reports_failed_entity() {
    let (tmp, config_path) = setup_test_env();
    // Block the output directory with a regular file.
    fs::create_dir_all(tmp.path().join("out")).unwrap();
    fs::write(tmp.path().join("out/all"), "").unwrap();

    let (_, stderr, success) = run_gwp(&config_path, &["run", "--mode", "sample"]);
    assert!(!success);
    assert!(stderr.contains("could not be written"), "stderr={}", stderr);
}

#[test]
fn test_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_gwp(&config_path, &["run", "--dry-run"]);
    assert!(success, "dry run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("shards found: 2"));
    assert!(stdout.contains("records read: 7"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn test_classify_command() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_gwp(&config_path, &["classify", "Ik stem #VVD"]);
    assert!(success);
    assert_eq!(stdout.trim(), "vvd");

    let (stdout, _, _) = run_gwp(&config_path, &["classify", "VVD of CDA"]);
    assert_eq!(stdout.trim(), "none");

    let (stdout, _, _) = run_gwp(&config_path, &["classify", "VVD", "--author", "NOS"]);
    assert_eq!(stdout.trim(), "none");

    let (stdout, _, _) = run_gwp(
        &config_path,
        &["classify", "RT", "--strategy", "repost", "--repost-of", "MARKRUTTE"],
    );
    assert_eq!(stdout.trim(), "vvd");
}

#[test]
fn test_lexicon_command() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_gwp(&config_path, &["lexicon"]);
    assert!(success, "lexicon failed: stderr={}", stderr);
    assert!(stdout.contains("Volkspartij voor Vrijheid en Democratie"));
    assert!(stdout.contains("excluded authors: 1"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_gwp(&tmp.path().join("nope.toml"), &["lexicon"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
