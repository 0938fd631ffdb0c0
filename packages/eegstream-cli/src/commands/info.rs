use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use eegstream::SignalSource;
use serde::Serialize;

#[derive(Serialize)]
struct InfoOutput {
    file: String,
    sample_rate: f64,
    duration: f64,
    num_samples: usize,
    num_channels: usize,
    channels: Vec<String>,
}

pub fn execute(args: InfoArgs) -> i32 {
    let source = match SignalSource::open(&args.file) {
        Ok(source) => source,
        Err(e) => return exit_codes::report(&e),
    };
    let meta = match source.metadata() {
        Ok(meta) => meta,
        Err(e) => return exit_codes::report(&e),
    };
    source.close();

    let info = InfoOutput {
        file: meta.file_path.clone(),
        sample_rate: meta.sample_rate,
        duration: meta.duration,
        num_samples: meta.num_samples,
        num_channels: meta.num_channels(),
        channels: meta.channel_names,
    };

    if args.json {
        return output::emit_json(&info, false, None);
    }

    println!("File: {}", info.file);
    println!("Sample rate: {} Hz", info.sample_rate);
    println!("Duration: {:.3} s ({} samples)", info.duration, info.num_samples);
    println!("Channels ({}): {}", info.num_channels, info.channels.join(", "));

    exit_codes::SUCCESS
}
