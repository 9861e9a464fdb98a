use std::path::{Path, PathBuf};

use argh::FromArgs;
use indicatif::{ParallelProgressIterator, ProgressStyle};
use rand::{rngs::StdRng, SeedableRng};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use hawkeye::data::{
    encode::{encode_labels, encode_targets},
    label::{label_path_for, read_labels},
    DatasetConfig, DatasetError, LidarDataset, TargetStatistics,
};
use hawkeye::k3d::bev::BEV_CHANNELS;
use hawkeye::train::HawkeyeConfig;

#[derive(FromArgs, Debug)]
/// Inspect, check and summarize a LiDAR detection dataset.
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Inspect(InspectArgs),
    Stats(StatsArgs),
    Check(CheckArgs),
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "inspect")]
/// Build the first samples of a split and print their shapes.
struct InspectArgs {
    /// path to the JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// split directory; defaults to `<root_dir>/train`
    #[argh(option, short = 'd')]
    dir: Option<PathBuf>,

    /// number of samples to print
    #[argh(option, short = 'n', default = "5")]
    num_samples: usize,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "stats")]
/// Compute standardization constants over the training labels.
struct StatsArgs {
    /// path to the JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// write the constants to this JSON file instead of stdout
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// number of threads to use
    #[argh(option, short = 'j', default = "8")]
    num_threads: usize,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "check")]
/// Report scans without a readable label file.
struct CheckArgs {
    /// path to the JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<HawkeyeConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => HawkeyeConfig::from_json_file(path)?,
        None => HawkeyeConfig::default(),
    };
    Ok(config)
}

fn inspect(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    let dir = args
        .dir
        .unwrap_or_else(|| config.dataset.root_dir.join("train"));

    let mut rng = StdRng::seed_from_u64(config.training.seed);
    let dataset = LidarDataset::open(&dir, config.dataset.clone(), &mut rng)?;
    println!("{} samples in {}", dataset.len(), dir.display());

    for index in 0..dataset.len().min(args.num_samples) {
        let sample = dataset.get(index, &mut rng)?;
        let [_, rows, cols] = sample.bev.shape;
        let occupied = sample.bev.as_slice()[rows * cols..2 * rows * cols]
            .iter()
            .filter(|v| **v > 0.0)
            .count();
        println!(
            "{}: bev {BEV_CHANNELS}x{rows}x{cols} ({occupied} occupied cells), target {:?}, no_object {}",
            sample.id, sample.target.shape, sample.no_object
        );
    }
    Ok(())
}

fn stats(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .build_global()?;

    let dataset_config = DatasetConfig {
        augment: false,
        standardization: None,
        ..config.dataset.clone()
    };
    let mut rng = StdRng::seed_from_u64(config.training.seed);
    let dataset = LidarDataset::open(
        dataset_config.root_dir.join("train"),
        dataset_config.clone(),
        &mut rng,
    )?;

    if dataset.is_empty() {
        println!("No samples found in the training split");
        return Ok(());
    }

    let pb = indicatif::ProgressBar::new(dataset.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} ({eta}) {msg} {per_sec}",
    )?.progress_chars("##>-"));

    let stats = dataset
        .files()
        .par_iter()
        .progress_with(pb)
        .try_fold(TargetStatistics::new, |mut acc, path| {
            let label_path = label_path_for(path)
                .ok_or_else(|| DatasetError::InvalidFileName(path.clone()))?;
            let camera_boxes = read_labels(label_path, &dataset_config.target_class)?;
            let boxes = dataset_config.calibration.camera_to_lidar_boxes(&camera_boxes);
            let targets = encode_targets(&encode_labels(&boxes)?, None)?;
            acc.update(&targets);
            Ok::<_, DatasetError>(acc)
        })
        .try_reduce(TargetStatistics::new, |a, b| Ok(a.merge(b)))?;

    let Some(standardization) = stats.finish() else {
        println!("No {} objects found", dataset_config.target_class);
        return Ok(());
    };
    log::info!("computed constants over {} objects", stats.count());

    let json = serde_json::to_string_pretty(&standardization)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("wrote constants of {} objects to {}", stats.count(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn check(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    let mut rng = StdRng::seed_from_u64(config.training.seed);

    let mut problems = 0;
    for split in ["train", "val"] {
        let dir = config.dataset.root_dir.join(split);
        let dataset = LidarDataset::open(&dir, config.dataset.clone(), &mut rng)?;
        let mut files = dataset.files().to_vec();
        files.sort();

        for path in &files {
            let Some(label_path) = label_path_for(path) else {
                println!("{split}: invalid file name {}", path.display());
                problems += 1;
                continue;
            };
            if let Err(e) = read_labels(&label_path, &config.dataset.target_class) {
                println!("{split}: {}: {e}", path.display());
                problems += 1;
            }
        }
        println!("{split}: checked {} samples", files.len());
    }

    if problems > 0 {
        return Err(format!("{problems} samples have missing or malformed labels").into());
    }
    println!("all labels are readable");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    match args.command {
        Command::Inspect(args) => inspect(args),
        Command::Stats(args) => stats(args),
        Command::Check(args) => check(args),
    }
}
