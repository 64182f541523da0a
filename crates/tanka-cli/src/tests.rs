use std::path::Path;

use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["tanka"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn run_defaults_to_all_categories() {
    let cli = Cli::try_parse_from(["tanka", "run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            category: None,
            output: None,
            dry_run: false
        })
    ));
}

#[test]
fn run_with_category_and_output() {
    let cli = Cli::try_parse_from([
        "tanka",
        "run",
        "--category",
        "toilet-paper",
        "--output",
        "out.json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            category: Some(ref c),
            output: Some(ref o),
            dry_run: false,
        }) if c == "toilet-paper" && o.as_path() == Path::new("out.json")
    ));
}

#[test]
fn run_dry_run() {
    let cli = Cli::try_parse_from(["tanka", "run", "--dry-run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Run { dry_run: true, .. })
    ));
}

#[test]
fn categories_command() {
    let cli = Cli::try_parse_from(["tanka", "categories"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Categories)));
}

#[test]
fn extract_takes_title_and_measure() {
    let cli = Cli::try_parse_from([
        "tanka",
        "extract",
        "12ロール ダブル",
        "--measure",
        "Length",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Extract {
            ref title,
            description: None,
            measure: Some(Measure::Length),
        }) if title == "12ロール ダブル"
    ));
}

#[test]
fn extract_rejects_unknown_measure() {
    let result = Cli::try_parse_from(["tanka", "extract", "x", "--measure", "area"]);
    assert!(result.is_err());
}

#[test]
fn extract_requires_title() {
    assert!(Cli::try_parse_from(["tanka", "extract"]).is_err());
}
