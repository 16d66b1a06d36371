use std::process::ExitCode;

use clap::Parser;

use fedora_fetch::config::Args;
use fedora_fetch::date::DateStamp;
use fedora_fetch::{Pipeline, RunReport};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(report) if !report.has_fatal() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<RunReport, Box<dyn std::error::Error>> {
    let json = args.json;
    let config = args.into_config(DateStamp::today())?;
    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run().await;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
    }
    Ok(report)
}

fn print_summary(report: &RunReport) {
    println!("version: {}", report.version);
    println!("run date: {}", report.run_date);

    for arch in &report.architectures {
        match (&arch.error, &arch.listing_url) {
            (Some(e), _) => println!("{}: discovery failed: {}", arch.arch, e),
            (None, Some(url)) => println!(
                "{}: {} artifact(s) from {}",
                arch.arch, arch.artifacts, url
            ),
            (None, None) => println!(
                "{}: no artifacts found ({} listing(s) probed)",
                arch.arch, arch.probes
            ),
        }
    }

    for artifact in &report.artifacts {
        let path = artifact.destination.display();
        if let Some(e) = &artifact.download_error {
            println!("  {} download failed: {}", path, e);
        } else if let Some(e) = &artifact.extraction_error {
            println!("  {} extraction failed: {}", path, e);
        } else if let (Some(layer), Some(build_file)) = (&artifact.layer, &artifact.build_file) {
            println!(
                "  {} -> {} + {}",
                path,
                layer.display(),
                build_file.display()
            );
        } else {
            println!("  {} downloaded", path);
        }
    }

    let extracted = report.extracted().count();
    println!(
        "{} of {} artifact(s) extracted{}",
        extracted,
        report.artifacts.len(),
        if report.has_fatal() { ", with failures" } else { "" }
    );
}
