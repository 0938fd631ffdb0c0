use crate::cli::WindowArgs;
use crate::exit_codes;
use crate::output;
use eegstream::{EEGDataStreamer, FilterSpec, FilterStatus, MontageCatalog, StreamerConfig};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct ChannelOutput<'a> {
    name: &'a str,
    samples: &'a [f64],
}

#[derive(Serialize)]
struct WindowOutput<'a> {
    file: String,
    montage: &'a str,
    start_time: f64,
    duration: f64,
    sample_rate: f64,
    filter: FilterSpec,
    filter_status: &'a FilterStatus,
    num_samples: usize,
    channels: Vec<ChannelOutput<'a>>,
}

pub fn execute(args: WindowArgs) -> i32 {
    let catalog = match &args.montage_dir {
        Some(dir) => match MontageCatalog::load(dir) {
            Ok(catalog) => catalog,
            Err(e) => return exit_codes::report(&e),
        },
        None => MontageCatalog::default(),
    };

    let config = match &args.config {
        Some(path) => match StreamerConfig::from_yaml_file(path) {
            Ok(config) => config,
            Err(e) => return exit_codes::report(&e),
        },
        None => StreamerConfig::default(),
    };

    let mut streamer = match EEGDataStreamer::new(Arc::new(catalog), config) {
        Ok(streamer) => streamer,
        Err(e) => return exit_codes::report(&e),
    };
    let meta = match streamer.open(&args.file) {
        Ok(meta) => meta,
        Err(e) => return exit_codes::report(&e),
    };

    let filter = FilterSpec::new(args.low, args.high);
    let window = match streamer.get_window(args.start, args.duration, &args.montage, &filter) {
        Ok(window) => window,
        Err(e) => return exit_codes::report(&e),
    };
    streamer.close();

    if let FilterStatus::PassedThroughUnfiltered { reason } = &window.filter_status {
        eprintln!("Warning: filter not applied: {}", reason);
    }

    let visible = window.visible_range();
    let start_time = window.time_at(visible.start);

    if args.json || args.output.is_some() {
        let result = WindowOutput {
            file: meta.file_path,
            montage: &args.montage,
            start_time,
            duration: visible.len() as f64 / window.sample_rate,
            sample_rate: window.sample_rate,
            filter,
            filter_status: &window.filter_status,
            num_samples: visible.len(),
            channels: window
                .channel_names
                .iter()
                .zip(&window.samples)
                .map(|(name, samples)| ChannelOutput {
                    name,
                    samples: &samples[visible.clone()],
                })
                .collect(),
        };
        return output::emit_json(&result, args.compact, args.output.as_deref());
    }

    println!(
        "{} | {} | {:.3}-{:.3} s | {} samples @ {} Hz",
        meta.file_path,
        args.montage,
        start_time,
        start_time + visible.len() as f64 / window.sample_rate,
        visible.len(),
        window.sample_rate
    );
    println!();
    println!("{:<16} {:>12} {:>12} {:>12}", "Channel", "Min", "Max", "Mean");
    println!("{}", "-".repeat(55));
    for (name, samples) in window.channel_names.iter().zip(&window.samples) {
        let samples = &samples[visible.clone()];
        if samples.is_empty() {
            println!("{:<16} {:>12} {:>12} {:>12}", name, "-", "-", "-");
            continue;
        }
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        println!("{:<16} {:>12.3} {:>12.3} {:>12.3}", name, min, max, mean);
    }

    exit_codes::SUCCESS
}
