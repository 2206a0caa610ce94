//! Offline renderer: plays a score through the voice driver into a WAV file.

mod args;
mod score;

use std::fs;

use anyhow::{Context, Result};
use tracing::Level;
use ym2149_voice_driver::{DriverConfig, StateLayout, TimedEvent, VoiceDriver, Ym2149Engine};

use args::CliArgs;
use score::Score;

/// Silence rendered after the last score event
const TAIL_SECONDS: f64 = 1.0;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    if args.show_help {
        CliArgs::print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    run(&args)
}

fn run(args: &CliArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => DriverConfig::default(),
    };

    let score = match &args.score {
        Some(path) => Score::load(path, args.sample_rate)?,
        None => Score::demo(args.sample_rate),
    };
    tracing::debug!(events = score.events().len(), "score ready");

    let mut driver = VoiceDriver::new(Ym2149Engine::new(), config);
    if let Some(path) = &args.state_in {
        let bytes =
            fs::read(path).with_context(|| format!("reading state {}", path.display()))?;
        driver.load_state(&bytes);
    }
    driver.prepare(args.sample_rate)?;

    let total = match args.seconds {
        Some(seconds) => (seconds * args.sample_rate as f64).round() as u64,
        None => score.end_sample() + (TAIL_SECONDS * args.sample_rate as f64) as u64,
    };

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: args.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.out, spec)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let mut left = vec![0.0f32; args.block];
    let mut right = vec![0.0f32; args.block];
    let mut events: Vec<TimedEvent> = Vec::new();
    let mut cursor = 0;
    let mut position = 0u64;

    while position < total {
        let len = (total - position).min(args.block as u64) as usize;
        score.block_events(&mut cursor, position, len, &mut events);

        // Samples the driver skips stay silent
        left[..len].fill(0.0);
        right[..len].fill(0.0);
        driver.render_block(&mut [&mut left[..len], &mut right[..len]], &events);

        for (&l, &r) in left[..len].iter().zip(&right[..len]) {
            writer.write_sample(to_i16(l))?;
            writer.write_sample(to_i16(r))?;
        }
        position += len as u64;
    }
    writer.finalize()?;

    tracing::info!(
        path = %args.out.display(),
        seconds = total as f64 / args.sample_rate as f64,
        "render finished"
    );

    if let Some(path) = &args.state_out {
        fs::write(path, driver.save_state(StateLayout::Extended))
            .with_context(|| format!("writing state {}", path.display()))?;
    }

    driver.release();
    Ok(())
}

#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
