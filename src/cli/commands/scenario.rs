//! Scenario command implementation

use super::report;
use crate::cli::ScenarioArgs;
use crate::harness::{BaseModel, CheckpointScenario, ScenarioConfig};

pub fn run_scenario(args: ScenarioArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_yaml(path).map_err(report)?,
        None => ScenarioConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let outcome = CheckpointScenario::new(config).run().map_err(report)?;
    println!(
        "base dim {} -> reloaded dim {}; steps {} + {} (resumed: {})",
        outcome.base_dimension,
        outcome.reloaded_dimension,
        outcome.first_run.global_steps,
        outcome.second_run.global_steps,
        outcome.second_run.resumed
    );
    for path in &outcome.checkpoints {
        println!("checkpoint: {}", path.display());
    }
    for (path, e) in &outcome.cleanup_failures {
        eprintln!("could not remove {}: {e}", path.display());
    }
    match &outcome.score {
        Some(score) if !score.passes() => Err(format!("STS test regressed: {score}")),
        Some(score) => {
            println!("{score}");
            Ok(())
        }
        None => Ok(()),
    }
}

fn apply_overrides(config: &mut ScenarioConfig, args: &ScenarioArgs) {
    if let Some(root) = &args.root {
        config.root.clone_from(root);
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(path) = &args.pretrained {
        config.base_model = BaseModel::Pretrained { path: path.clone() };
    }
    if args.expected.is_some() {
        config.expected_score = args.expected;
    }
    if args.keep {
        config.cleanup = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = ScenarioConfig::default();
        let args = ScenarioArgs {
            config: None,
            root: Some(PathBuf::from("/tmp/x")),
            data_dir: None,
            pretrained: Some(PathBuf::from("models/bert")),
            expected: Some(42.0),
            keep: true,
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.root, PathBuf::from("/tmp/x"));
        assert_eq!(config.data_dir, PathBuf::from("datasets"));
        assert_eq!(config.base_model, BaseModel::Pretrained { path: PathBuf::from("models/bert") });
        assert_eq!(config.expected_score, Some(42.0));
        assert!(!config.cleanup);
    }
}
