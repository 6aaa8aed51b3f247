use super::*;

#[test]
fn test_pythia_schedule_shape() {
    let schedule = StepSchedule::pythia(PYTHIA_BUDGET);
    let raw: Vec<u64> = schedule.iter().map(Step::get).collect();
    assert_eq!(&raw[..11], &[0, 1, 2, 4, 8, 16, 32, 64, 128, 256, 512]);
    assert_eq!(raw[11], 1000);
    assert_eq!(raw.last().copied(), Some(143_000));
    assert_eq!(schedule.len(), 11 + 143);
    assert_eq!(schedule.latest(), Some(Step(143_000)));
}

#[test]
fn test_small_budget_caps_log_prefix() {
    let raw: Vec<u64> = StepSchedule::pythia(10).iter().map(Step::get).collect();
    assert_eq!(raw, vec![0, 1, 2, 4, 8]);
}

#[test]
fn test_numeric_not_lexical_ordering() {
    let schedule = StepSchedule::pythia(PYTHIA_BUDGET);
    let names: Vec<String> = schedule.iter().map(|s| s.file_name("safetensors")).collect();

    let mut lexical = names.clone();
    lexical.sort();
    assert_ne!(lexical, names, "lexical order must differ at the 512/1000 boundary");
    let pos_512 = lexical.iter().position(|n| n == "512.safetensors");
    let pos_1000 = lexical.iter().position(|n| n == "1000.safetensors");
    assert!(pos_1000 < pos_512);

    // Shuffle-ish: reverse, then sort by the implementation.
    let paths = names.iter().rev().map(PathBuf::from);
    let sorted = sort_checkpoint_files(paths);
    let sorted_steps: Vec<Step> = sorted.iter().map(|(s, _)| *s).collect();
    assert_eq!(sorted_steps, schedule.steps());
    assert!(sorted_steps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_sort_checkpoint_files_ignores_other_files() {
    let paths = vec![
        PathBuf::from("out/1000.safetensors"),
        PathBuf::from("out/README.md"),
        PathBuf::from("out/.tmp-512.safetensors"),
        PathBuf::from("out/512.safetensors"),
    ];
    let sorted = sort_checkpoint_files(paths);
    assert_eq!(
        sorted,
        vec![
            (Step(512), PathBuf::from("out/512.safetensors")),
            (Step(1000), PathBuf::from("out/1000.safetensors")),
        ]
    );
}

#[test]
fn test_step_from_file_name() {
    assert_eq!(Step::from_file_name("0.safetensors"), Some(Step(0)));
    assert_eq!(Step::from_file_name("143000.pt"), Some(Step(143_000)));
    assert_eq!(Step::from_file_name("step1000.safetensors"), None);
    assert_eq!(Step::from_file_name(".safetensors"), None);
}

#[test]
fn test_step_parse_and_revision() {
    assert_eq!("step512".parse::<Step>().expect("prefixed"), Step(512));
    assert_eq!("64".parse::<Step>().expect("bare"), Step(64));
    assert!("abc".parse::<Step>().is_err());
    assert_eq!(Step(2000).revision(), "step2000");
    assert_eq!(Step(2000).file_name("safetensors"), "2000.safetensors");
}

#[test]
fn test_schedule_new_sorts_and_dedups() {
    let schedule = StepSchedule::new([Step(1000), Step(2), Step(512), Step(2)]);
    assert_eq!(schedule.steps(), &[Step(2), Step(512), Step(1000)]);
    assert_eq!(schedule.truncated(2).steps(), &[Step(2), Step(512)]);
}
