use clap::Args;
use serde::Serialize;

use devdocs::artifacts::{self, PathReport};

use super::{CmdResult, SourceArgs};

#[derive(Args)]
pub struct CacheArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Serialize)]
pub struct CacheOutput {
    pub command: &'static str,
    pub present: usize,
    pub directories: Vec<PathReport>,
}

pub fn run(args: CacheArgs) -> CmdResult<CacheOutput> {
    let loaded = super::load_config(&args.source)?;
    let directories = artifacts::cache_report(&loaded.config, &loaded.workdir)?;
    let present = directories.iter().filter(|d| d.exists).count();

    Ok((
        CacheOutput {
            command: "cache",
            present,
            directories,
        },
        0,
    ))
}
