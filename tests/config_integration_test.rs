//! Config discovery from `.energylens.toml` and its effect on analysis.

use energylens::config::{load_config_from, CONFIG_FILE_NAME};
use energylens::pipeline::analyze;
use energylens::{AnalysisConfig, PatternId, SourceUnit};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const SOURCE: &str = indoc! {"
    out = ''
    for x in xs:
        out += str(x)
        print(x)
"};

#[test]
fn test_config_is_found_in_ancestor_directory() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("pkg").join("sub");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        indoc! {r#"
            [scoring]
            flag_penalty = 0

            [patterns]
            disabled = ["io_in_loop"]
        "#},
    )
    .unwrap();

    let config = load_config_from(&nested);
    assert_eq!(config.scoring.flag_penalty, 0);
    assert_eq!(config.patterns.disabled, vec![PatternId::IoInLoop]);

    let unit = SourceUnit::parse(SOURCE).unwrap();
    let report = analyze(&unit, &config).unwrap();
    let ids: Vec<_> = report.matches.iter().map(|m| m.pattern_id).collect();
    assert_eq!(ids, vec![PatternId::StringConcatInLoop]);
    // O(n) with penalties switched off.
    assert_eq!(report.classification.score, 29);
}

#[test]
fn test_nearest_config_wins() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("inner");
    fs::create_dir_all(&nested).unwrap();
    fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[report]\ntop = 5\n").unwrap();
    fs::write(nested.join(CONFIG_FILE_NAME), "[report]\ntop = 1\n").unwrap();

    assert_eq!(load_config_from(&nested).report.top, Some(1));
    assert_eq!(load_config_from(temp_dir.path()).report.top, Some(5));
}

#[test]
fn test_malformed_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[scoring\nflag_penalty = ").unwrap();
    let config = load_config_from(temp_dir.path());
    assert_eq!(config, AnalysisConfig::default());
}

#[test]
fn test_top_limits_suggestions() {
    let unit = SourceUnit::parse(SOURCE).unwrap();
    let mut config = AnalysisConfig::default();
    assert_eq!(analyze(&unit, &config).unwrap().suggestions.len(), 2);
    config.report.top = Some(1);
    let report = analyze(&unit, &config).unwrap();
    assert_eq!(report.suggestions.len(), 1);
    assert_eq!(report.suggestions[0].pattern_id, PatternId::StringConcatInLoop);
    assert_eq!(report.matches.len(), 2);
}
