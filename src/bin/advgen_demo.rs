//! Attacks a randomly initialised softmax classifier over a synthetic dataset and reports how
//! many predictions each adversarial batch flips.
use advgen::logging;
use advgen::{
    AdversarialBatchGenerator, Dataset, Fgsm, GeneratorConfig, SoftmaxClassifier, DEFAULT_EPS,
};
use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use ndarray::{Array1, Array4, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON generator config; overrides --total, --eps, --dims and --seed
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Examples per batch
    #[arg(long, default_value_t = 32)]
    total: usize,

    /// Perturbation magnitude
    #[arg(long, default_value_t = DEFAULT_EPS)]
    eps: f64,

    /// Image height, width and channels
    #[arg(long, num_args = 3, default_values_t = [8, 8, 1], value_name = "N")]
    dims: Vec<usize>,

    /// Seed for data, model and sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Size of the synthetic dataset
    #[arg(long, default_value_t = 256)]
    examples: usize,

    #[arg(long, default_value_t = 10)]
    classes: usize,

    /// Batches to generate before stopping
    #[arg(long, default_value_t = 5)]
    batches: usize,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// log4rs YAML configuration
    #[arg(long, value_name = "FILE")]
    log_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_level, args.log_config.as_deref())?;
    ensure!(args.classes > 0, "at least one class is required");

    let config = match &args.config {
        Some(path) => GeneratorConfig::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let config = GeneratorConfig::new(args.total, args.dims.clone()).with_eps(args.eps);
            match args.seed {
                Some(seed) => config.with_seed(seed),
                None => config,
            }
        }
    };
    let (h, w, c) = config
        .dims
        .as_image()
        .context("dims must be height, width and channels")?;

    let mut rng = config
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let images = Array4::random_using((args.examples, h, w, c), Uniform::new(0., 1.), &mut rng);
    let labels: Array1<usize> = (0..args.examples)
        .map(|_| rng.gen_range(0..args.classes))
        .collect();
    let dataset = Dataset::new(images, labels)?;
    let model = SoftmaxClassifier::random((h, w, c), args.classes, &mut rng);
    info!("Model: {}", model);
    info!("Dataset: {} images of {}", dataset.len(), dataset.image_shape());

    let generator = AdversarialBatchGenerator::with_rng(
        &model,
        &dataset,
        Fgsm::clipped(0., 1.),
        config,
        StdRng::from_rng(&mut rng)?,
    )?;
    info!("{}", generator);

    for (i, batch) in generator.take(args.batches).enumerate() {
        let batch = batch?;
        let mut flipped = 0;
        for (pos, &index) in batch.indices().iter().enumerate() {
            let clean = model.classify(dataset.batched_image(index, (h, w, c))?.view())?;
            let adversarial = model.classify(batch.image(pos).insert_axis(Axis(0)))?;
            if clean != adversarial {
                flipped += 1;
            }
        }
        info!(
            "batch {}: {} examples, {} predictions flipped",
            i,
            batch.len(),
            flipped
        );
    }
    Ok(())
}
