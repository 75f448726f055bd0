use shield_align::{AnalyzerParams, ProfileAnalyzer, RowProfile};

fn main() {
    env_logger::init();

    // Demo stub: two shield walls around a cartridge valley, sampled over 0..=20
    let bump = |x: f64, center: f64| 10.0 * (-(x - center).powi(2) / 8.0).exp();
    let samples: Vec<f64> = (0..=20)
        .map(|i| {
            let x = i as f64;
            bump(x, 2.0) + bump(x, 18.0)
        })
        .collect();

    let profile = match RowProfile::new("demo", samples) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let analyzer = ProfileAnalyzer::new(AnalyzerParams::default());
    let report = analyzer.analyze_with_trace(&profile);
    match report.result {
        Ok(res) => println!(
            "valley={:.3} inner={:.3} outer={:.3} ratio={:.4} latency_ms={:.3}",
            res.valley.position,
            res.inner_distance,
            res.outer_distance,
            res.ratio,
            report.trace.timings.total_ms
        ),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
