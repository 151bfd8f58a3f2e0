mod error;
mod hashes;
mod image;
mod report;
#[cfg(test)]
mod test_image;


use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use umdfs::iso9660::{ExtentPolicy, WalkOptions};

use crate::error::Error;
use crate::image::IsoImage;


/// Extracts identifying data from a PSP UMD image into a JSON file.
#[derive(Parser)]
struct Opts {
    /// The UMD image (ISO9660) to inspect.
    pub iso_path: PathBuf,

    /// Where to write the JSON report. Defaults to the image path with `.json` appended.
    #[arg(long = "out")]
    pub out_path: Option<PathBuf>,

    /// How deeply nested directories may be.
    #[arg(long, default_value_t = 32)]
    pub max_depth: usize,

    /// Only read the first sector of each directory.
    #[arg(long)]
    pub first_sector_only: bool,

    /// Only log warnings and errors unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub quiet: bool,
}
impl Opts {
    fn out_path(&self) -> PathBuf {
        match &self.out_path {
            Some(op) => op.clone(),
            None => {
                let mut os_path = self.iso_path.clone().into_os_string();
                os_path.push(".json");
                PathBuf::from(os_path)
            },
        }
    }

    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            max_depth: self.max_depth,
            extent_policy: if self.first_sector_only {
                ExtentPolicy::FirstSectorOnly
            } else {
                ExtentPolicy::FullExtent
            },
        }
    }
}


fn run(opts: &Opts) -> Result<(), Error> {
    let out_path = opts.out_path();
    if out_path.exists() {
        return Err(Error::OutputExists(out_path));
    }

    let iso_file = File::open(&opts.iso_path)?;
    let mut image = IsoImage::open(BufReader::new(iso_file), &opts.walk_options())?;
    info!(
        "{}: volume {:?}, {} bytes, {} entries",
        opts.iso_path.display(), image.pvd().volume_identifier, image.size(), image.entries().len(),
    );

    let report = report::build_report(&mut image)?;
    report::write_report(&report, &out_path)?;
    info!("report written to {}", out_path.display());
    Ok(())
}


fn main() {
    let opts = Opts::parse();

    let default_level = if opts.quiet { LevelFilter::WARN } else { LevelFilter::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy()
        )
        .init();

    if let Err(e) = run(&opts) {
        error!("{}", e);
        std::process::exit(1);
    }
}
