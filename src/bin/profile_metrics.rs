use shield_align::config::batch::{self, BatchToolConfig};
use shield_align::io::{write_json_file, TextDirSource};
use shield_align::report::{summarize, BatchReport};
use shield_align::{analyze_source, ProfileAnalyzer};
use std::env;
use std::path::Path;
use std::time::Instant;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = batch::load_config(Path::new(&config_path))?;

    let start = Instant::now();
    let source = TextDirSource::new(&config.input_dir).with_suffix(config.suffix.clone());
    let analyzer = ProfileAnalyzer::new(config.params.clone());
    let entries = analyze_source(&source, &analyzer).map_err(|e| e.to_string())?;
    if entries.is_empty() {
        return Err(format!(
            "No '*{}' files in {}",
            config.suffix,
            config.input_dir.display()
        ));
    }
    let report = summarize(entries, config.group_by);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    print_text_summary(&report, &config, elapsed_ms);

    if let Some(path) = &config.output.json_out {
        write_json_file(path, &report)?;
        println!("\nJSON report written to {}", path.display());
    }
    Ok(())
}

fn print_text_summary(report: &BatchReport, config: &BatchToolConfig, elapsed_ms: f64) {
    let failed = report.failures().count();
    println!("Profile metrics");
    println!("  input: {}", config.input_dir.display());
    println!(
        "  profiles: {} ({} failed)  elapsed_ms: {:.3}",
        report.entries.len(),
        failed,
        elapsed_ms
    );

    if config.output.verbose {
        println!("\nPer profile");
        for entry in &report.entries {
            if let Ok(res) = &entry.result {
                println!(
                    "  {}: ratio={:.4} inner={:.3} outer={:.3} offset={}",
                    entry.id,
                    res.ratio,
                    res.inner_distance,
                    res.outer_distance,
                    fmt_opt(res.placement.positioning_offset)
                );
            }
        }
    }

    println!("\nGroups");
    for group in &report.groups {
        println!(
            "  [{}] n={} failed={} mean_ratio={} mean_offset={}",
            group.key,
            group.profiles,
            group.failures,
            fmt_opt(group.mean_ratio),
            fmt_opt(group.mean_positioning_offset)
        );
    }

    if failed > 0 {
        println!("\nFailures");
        for (id, err) in report.failures() {
            println!("  {id}: [{}] {err}", err.label());
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn usage() -> String {
    "Usage: profile_metrics <config.json>".to_string()
}
