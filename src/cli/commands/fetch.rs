//! Fetch command implementation

use super::report;
use crate::cli::FetchArgs;
use crate::data::DatasetPaths;

pub fn run_fetch(args: FetchArgs) -> Result<(), String> {
    let paths = DatasetPaths::in_dir(&args.data_dir);
    let fetched = paths.ensure().map_err(report)?;
    println!(
        "{} archive(s) downloaded; STS at {}, NLI at {}",
        fetched,
        paths.sts.display(),
        paths.nli.display()
    );
    Ok(())
}
