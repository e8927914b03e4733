use std::fs;
use std::path::Path;

use deduce_bench::config::BenchConfig;
use deduce_bench::tournament::TournamentRunner;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn load_config(output_dir: &Path) -> BenchConfig {
    let snippet = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../bench/agents/first_candidates.rhai");
    let yaml = format!(
        r#"
run_id: "test_smoke"
games:
  count: 3
  seed: 4242
  keyword_pool: 16
  max_turns: 12
agents:
  - name: "easy"
    kind: "builtin"
    difficulty: "easy"
  - name: "hard"
    kind: "builtin"
    difficulty: "hard"
  - name: "scripted"
    kind: "custom"
    snippet: "{snippet}"
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
session:
  strategy:
    solver_timeout_ms: ~
logging:
  enable_structured: false
"#,
        snippet = snippet.display(),
        jsonl = output_dir.join("turns.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
    );

    let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn normalized_digest(jsonl: &str) -> String {
    let mut normalized = String::new();
    for line in jsonl.lines() {
        let mut value: serde_json::Value = serde_json::from_str(line).expect("row decodes to JSON");
        if let Some(obj) = value.as_object_mut() {
            if let Some(elapsed) = obj.get_mut("elapsed_ms") {
                *elapsed = serde_json::Value::from(0);
            }
        }
        normalized.push_str(&serde_json::to_string(&value).expect("re-serialize normalized row"));
        normalized.push('\n');
    }

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

fn run_once() -> (String, usize) {
    let dir = tempdir().expect("temp dir");
    let config = load_config(dir.path());
    let outputs = config.resolved_outputs();

    let runner = TournamentRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().expect("tournament completes");

    assert_eq!(summary.games_played, 3);
    assert!(summary.rows_written > 0);
    assert!(summary.summary_path.exists(), "summary markdown missing");
    assert!(summary.telemetry_path.is_none());

    let markdown = fs::read_to_string(&summary.summary_path).expect("summary readable");
    assert!(markdown.contains("| scripted | custom |"));
    assert!(markdown.contains("## Sandbox"));

    let jsonl = fs::read_to_string(&summary.jsonl_path).expect("jsonl readable");
    assert_eq!(jsonl.lines().count(), summary.rows_written);
    for line in jsonl.lines() {
        let row: serde_json::Value = serde_json::from_str(line).expect("row decodes");
        assert_eq!(row["run_id"], "test_smoke");
        assert_eq!(row["guess"].as_array().map(Vec::len), Some(3));
    }
    (normalized_digest(&jsonl), summary.rows_written)
}

#[test]
fn same_seed_writes_identical_turn_log() {
    let (first, first_rows) = run_once();
    let (second, second_rows) = run_once();
    assert_eq!(first_rows, second_rows);
    assert_eq!(
        first, second,
        "turn log differs between two runs with the same seed"
    );
}
