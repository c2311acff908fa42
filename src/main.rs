use patchmatch::config::{load_config, OutputConfig};
use patchmatch::driver::{
    AcceptanceKind, DistanceKind, InitStrategy, PatchMatchDriver, PatchMatchParams,
};
use patchmatch::error::PatchMatchError;
use patchmatch::image::io::{load_mask_image, load_rgb_image, write_json_file, write_nnf_image};
use patchmatch::observer::{NoopObserver, SnapshotWriter};
use patchmatch::cancel::CancelToken;
use std::env;
use std::path::PathBuf;

fn main() {
    env_logger::init();
    let program = env::args()
        .next()
        .unwrap_or_else(|| "patchmatch".to_string());
    let cli = match parse_args(&program) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &PatchMatchError) -> i32 {
    match err {
        PatchMatchError::Io { .. } => 1,
        PatchMatchError::NoValidSourceRegions => 3,
        PatchMatchError::Cancelled => 4,
        _ => 2,
    }
}

fn run(cli: CliConfig) -> Result<(), PatchMatchError> {
    let (mut params, output) = match &cli.config {
        Some(path) => {
            let config = load_config(path)?;
            (config.params, config.output)
        }
        None => (PatchMatchParams::default(), OutputConfig::default()),
    };

    if let Some(radius) = cli.radius {
        params.patch_radius = radius;
    }
    if let Some(iterations) = cli.iterations {
        params.iterations = iterations;
    }
    if let Some(init) = cli.init {
        params.init_strategy = init;
    }
    if let Some(distance) = cli.distance {
        params.distance = distance;
    }
    if let Some(acceptance) = cli.acceptance {
        params.acceptance = acceptance;
    }
    if let Some(k) = cli.k {
        params.k = k;
    }
    if cli.deterministic {
        params.random = false;
    }

    let image = load_rgb_image(&cli.image)?;
    let source_mask = load_mask_image(&cli.source_mask)?;
    let target_mask = load_mask_image(&cli.target_mask)?;

    let mut driver = PatchMatchDriver::new(params);
    driver.set_image(image);
    driver.set_source_mask(source_mask);
    driver.set_target_mask(target_mask);

    let snapshot_dir = cli.snapshot_dir.or(output.snapshot_dir);
    let output_nnf = cli.output_nnf.clone();
    let report_out = cli.report.or(output.report_out);

    let cancel = CancelToken::new();
    let result = match snapshot_dir {
        Some(dir) => {
            let mut observer = SnapshotWriter::new(dir);
            driver.compute_with(None, &mut observer, &cancel)?
        }
        None => {
            let mut observer = NoopObserver;
            driver.compute_with(None, &mut observer, &cancel)?
        }
    };

    write_nnf_image(&result.nnf, &output_nnf)?;
    println!("NNF written to {}", output_nnf.display());

    let report = &result.report;
    println!(
        "{}x{} r={} target_pixels={} total_ms={:.1}",
        report.input.width,
        report.input.height,
        report.input.patch_radius,
        report.input.target_pixels,
        report.timings.total_ms
    );
    for iter in &report.iterations {
        println!(
            "  iter {} ({}): propagated={} searched={} total_score={:.4}",
            iter.iteration,
            iter.scan_order,
            iter.propagation_improved,
            iter.search_improved,
            iter.total_best_score
        );
    }
    println!(
        "  force-fill: filled={} still_invalid={}",
        report.force_fill.filled, report.force_fill.still_invalid
    );

    if let Some(path) = report_out {
        write_json_file(&path, report)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

struct CliConfig {
    image: PathBuf,
    source_mask: PathBuf,
    target_mask: PathBuf,
    output_nnf: PathBuf,
    radius: Option<u32>,
    iterations: Option<u32>,
    init: Option<InitStrategy>,
    distance: Option<DistanceKind>,
    acceptance: Option<AcceptanceKind>,
    k: Option<u32>,
    deterministic: bool,
    config: Option<PathBuf>,
    report: Option<PathBuf>,
    snapshot_dir: Option<PathBuf>,
}

fn parse_args(program: &str) -> Result<CliConfig, String> {
    let mut args = env::args().skip(1);
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut radius = None;
    let mut iterations = None;
    let mut init = None;
    let mut distance = None;
    let mut acceptance = None;
    let mut k = None;
    let mut deterministic = false;
    let mut config = None;
    let mut report = None;
    let mut snapshot_dir = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("{}", usage(program));
                std::process::exit(0);
            }
            "--radius" => {
                let value = expect_value(&mut args, "--radius", program)?;
                radius = Some(parse_number(&value, "--radius")?);
            }
            "--iters" => {
                let value = expect_value(&mut args, "--iters", program)?;
                iterations = Some(parse_number(&value, "--iters")?);
            }
            "--init" => {
                let value = expect_value(&mut args, "--init", program)?;
                init = Some(match value.as_str() {
                    "random" => InitStrategy::Random,
                    "boundary" => InitStrategy::Boundary,
                    other => return Err(format!("Unknown init strategy '{other}'. Use random|boundary.")),
                });
            }
            "--distance" => {
                let value = expect_value(&mut args, "--distance", program)?;
                distance = Some(match value.as_str() {
                    "ssd" => DistanceKind::Ssd,
                    "pca" => DistanceKind::Pca,
                    other => return Err(format!("Unknown distance '{other}'. Use ssd|pca.")),
                });
            }
            "--acceptance" => {
                let value = expect_value(&mut args, "--acceptance", program)?;
                acceptance = Some(match value.as_str() {
                    "ssd_better" => AcceptanceKind::SsdBetter,
                    "composite" => AcceptanceKind::Composite,
                    "accept_all" => AcceptanceKind::AcceptAll,
                    other => {
                        return Err(format!(
                            "Unknown acceptance '{other}'. Use ssd_better|composite|accept_all."
                        ))
                    }
                });
            }
            "--k" => {
                let value = expect_value(&mut args, "--k", program)?;
                k = Some(parse_number(&value, "--k")?);
            }
            "--deterministic" => {
                deterministic = true;
            }
            "--config" => {
                let value = expect_value(&mut args, "--config", program)?;
                config = Some(PathBuf::from(value));
            }
            "--report" => {
                let value = expect_value(&mut args, "--report", program)?;
                report = Some(PathBuf::from(value));
            }
            "--snapshot-dir" => {
                let value = expect_value(&mut args, "--snapshot-dir", program)?;
                snapshot_dir = Some(PathBuf::from(value));
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option '{arg}'\n{}", usage(program)));
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    if positional.len() != 4 {
        return Err(usage(program));
    }
    let mut positional = positional.into_iter();
    Ok(CliConfig {
        image: positional.next().expect("checked length"),
        source_mask: positional.next().expect("checked length"),
        target_mask: positional.next().expect("checked length"),
        output_nnf: positional.next().expect("checked length"),
        radius,
        iterations,
        init,
        distance,
        acceptance,
        k,
        deterministic,
        config,
        report,
        snapshot_dir,
    })
}

fn expect_value(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
    program: &str,
) -> Result<String, String> {
    args.next()
        .ok_or_else(|| format!("{flag} expects a value\n{}", usage(program)))
}

fn parse_number(value: &str, flag: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value '{value}' for {flag}"))
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} <image> <source_mask> <target_mask> <output_nnf.exr> \\\n         [--radius R] [--iters N] [--init random|boundary] [--distance ssd|pca] \\\n         [--acceptance ssd_better|composite|accept_all] [--k K] [--deterministic] \\\n         [--config run.json] [--report report.json] [--snapshot-dir dir]\n\n\
Computes the approximate nearest-neighbor field between patches of an image.\n\
Masks are grayscale images: pixels brighter than 127 are valid, the rest hole.\n\
Examples:\n  {program} image.png source.png target.png nnf.exr --radius 3 --iters 5\n  {program} image.png source.png target.png nnf.exr --init boundary --deterministic\n"
    )
}
