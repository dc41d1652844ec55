//! Eval-sts command implementation

use super::report;
use crate::cli::EvalStsArgs;
use crate::data::{read_sts, DatasetPaths};
use crate::eval::{EmbeddingSimilarityEvaluator, ScoreReport};
use crate::models::SentenceEmbedder;

pub fn run_eval_sts(args: EvalStsArgs) -> Result<(), String> {
    let paths = DatasetPaths::in_dir(&args.data_dir);
    paths.ensure().map_err(report)?;
    let splits = read_sts(&paths.sts).map_err(report)?;
    let (examples, name) = if args.dev { (&splits.dev, "sts-dev") } else { (&splits.test, "sts-test") };

    let model = SentenceEmbedder::load(&args.model).map_err(report)?;
    let evaluator = EmbeddingSimilarityEvaluator::from_input_examples(examples, name)
        .map_err(report)?
        .with_csv(args.output_dir.is_some());
    let correlation = model.evaluate(&evaluator, args.output_dir.as_deref()).map_err(report)?;

    match args.expected {
        Some(expected) => {
            let score = ScoreReport::from_correlation(correlation, expected);
            if !score.log() {
                return Err(format!("{name} regressed: {score}"));
            }
        }
        None => println!("{name}: {:.2}", correlation * 100.0),
    }
    Ok(())
}
