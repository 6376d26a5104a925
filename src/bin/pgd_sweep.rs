use log::{error, info};
use pgd_rs::config::SweepConfig;
use pgd_rs::dataset::{load_mnist, Dataset};
use pgd_rs::{logging, report, EvaluationContext, Result, DNN};
use std::env;
use std::path::PathBuf;
use std::process;

const DEFAULT_CONFIG: &str = "pgd.json";

fn run(config: &SweepConfig) -> Result<()> {
    let model = DNN::load(&config.model_path)?;
    info!("Loaded model: {}", model);
    let dataset = load_mnist(&config.images_path, &config.labels_path, config.max_samples)?;
    info!(
        "Loaded {} samples of shape {}",
        dataset.len(),
        dataset.image_shape()
    );

    let ctx = EvaluationContext::new(&model, &dataset)?
        .with_attack(config.attack_params())
        .with_sample_cap(config.samples_per_epsilon)
        .with_order(config.sample_order());
    let sweep = ctx.sweep(&config.epsilons)?;

    report::append_records(&config.records_path, &sweep)?;
    if let Some(dir) = &config.output_dir {
        let paths = report::write_example_grids(dir, &sweep)?;
        info!("Wrote {} example grids to {}", paths.len(), dir.display());
    }
    if let Some(path) = config.summary_path() {
        report::write_summary(&path, &sweep)?;
        info!("Wrote summary to {}", path.display());
    }
    info!("\n{}", report::accuracy_table(&sweep));
    Ok(())
}

fn main() {
    let config_path = env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = match SweepConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };
    let level = config.level_filter().unwrap_or(log::LevelFilter::Info);
    if let Err(e) = logging::init(config.log_config.as_deref(), level) {
        eprintln!("{}", e);
        process::exit(2);
    }
    if let Err(e) = run(&config) {
        error!("{}", e);
        process::exit(1);
    }
}
