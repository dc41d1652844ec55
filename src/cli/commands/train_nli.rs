//! Train-nli command implementation

use std::path::Path;

use super::report;
use crate::cli::TrainNliArgs;
use crate::data::{read_nli, read_sts, DataLoader, DatasetPaths, InputExample};
use crate::eval::EmbeddingSimilarityEvaluator;
use crate::losses::SoftmaxLoss;
use crate::models::SentenceEmbedder;
use crate::train::{FitConfig, LoggingCallback, TrainObjective, Trainer};
use crate::Result;

/// NLI label count
const NLI_NUM_LABELS: usize = 3;

pub fn run_train_nli(args: TrainNliArgs) -> std::result::Result<(), String> {
    let config = fit_config(&args).map_err(report)?;

    let paths = DatasetPaths::in_dir(&args.data_dir);
    paths.ensure().map_err(report)?;
    let train = read_nli(&paths.nli, args.max_examples).map_err(report)?;
    let sts = read_sts(&paths.sts).map_err(report)?;

    let mut model = base_model(&args, &train).map_err(report)?;
    let evaluator = EmbeddingSimilarityEvaluator::from_input_examples(&sts.dev, "sts-dev")
        .map_err(report)?
        .with_csv(true);

    let loss = SoftmaxLoss::new(model.embedding_dimension(), NLI_NUM_LABELS, config.seed);
    let loader = DataLoader::with_seed(train, args.batch_size, true, config.seed);
    let mut objectives = vec![TrainObjective::new(loader, loss)];

    let mut trainer = Trainer::new(config);
    trainer.add_callback(LoggingCallback::default());
    let result = trainer.fit(&mut model, &mut objectives, Some(&evaluator)).map_err(report)?;

    println!(
        "trained {} steps over {} epoch(s); final loss {:.4}",
        result.global_steps, result.epochs_completed, result.final_loss
    );
    if let Some(best) = result.best_score {
        println!("best sts-dev: {:.2}, saved to {}", best * 100.0, args.output.display());
    }
    Ok(())
}

fn fit_config(args: &TrainNliArgs) -> Result<FitConfig> {
    let mut config = match &args.config {
        Some(path) => FitConfig::from_yaml(path)?,
        None => FitConfig::new(),
    };
    if let Some(epochs) = args.epochs {
        config = config.with_epochs(epochs);
    }
    if let Some(lr) = args.lr {
        config = config.with_lr(lr);
    }
    if let Some(root) = &args.checkpoint_path {
        config.checkpoint_path = Some(root.clone());
    }
    if args.amp {
        config = config.with_amp(true);
    }
    config = config.with_output_path(&args.output);
    config.validate()?;
    Ok(config)
}

fn base_model(args: &TrainNliArgs, train: &[InputExample]) -> Result<SentenceEmbedder> {
    match &args.model {
        Some(dir) if is_bundle(dir) => SentenceEmbedder::load(dir),
        Some(dir) => SentenceEmbedder::from_pretrained(dir),
        None => {
            let corpus: Vec<&str> =
                train.iter().flat_map(|e| e.texts().iter().map(String::as_str)).collect();
            SentenceEmbedder::from_corpus(&corpus, args.dimension, 0)
        }
    }
}

fn is_bundle(dir: &Path) -> bool {
    dir.join("modules.json").is_file()
}
