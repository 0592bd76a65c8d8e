use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use nand_extract::{FsWriter, NandContext, NandError};

/// Extracts the contents of a Wii or Wii U NAND dump into a directory tree.
#[derive(Debug, Parser)]
struct Cli {
    /// Path to the raw NAND image to extract.
    image: PathBuf,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

fn run(cli: &Cli) -> Result<(), NandError> {
    let mut ctx = NandContext::open(&cli.image)?;

    let output_root = cli.image.with_extension("");
    log::info!("extracting {} to {}", cli.image.display(), output_root.display());

    let mut writer = FsWriter::new(&output_root);
    nand_extract::extract(&mut ctx, &mut writer)?;

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::builder().filter_level(cli.verbosity.log_level_filter()).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
