use loopsmith::audio::export::export_wav;
use loopsmith::audio::loader::load_audio;
use loopsmith::config::random_mix_id;
use loopsmith::logging::setup_tracing;
use loopsmith::mixer::CHANNEL_COUNT;
use loopsmith::{
    ChannelParams, EngineError, EngineResult, EngineSettings, FxParams, FxRunner, JobRunner,
    LocalStorage, MixRunner, RhythmConfig, Storage,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = "\
Usage: loopsmith [--config <engine.ron>] [--seed <n>] <command>

Commands:
  generate <job_id> [channel]        Render sequence artifacts (all channels when omitted)
  fx <job_id> <channel> <random_id> <fx> <vol> <mute> <switch> <value>
                                     Post-process one channel (channel 'all' for every channel)
  mix <job_id> <random_id>           Mix six channel mixdowns into the master WAV
  render <audio> <pulses> <steps> <bpm> <scale> <key> <temperature> <out.wav>
                                     Render one sequence from a local file
  scales                             List the available scales
";

struct Cli {
    config: Option<PathBuf>,
    seed: Option<u64>,
    command: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> EngineResult<Cli> {
    let mut cli = Cli {
        config: None,
        seed: None,
        command: Vec::new(),
    };
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| usage("--config needs a path"))?;
                cli.config = Some(PathBuf::from(path));
            }
            "--seed" => {
                let seed = args.next().ok_or_else(|| usage("--seed needs a value"))?;
                cli.seed = Some(parse_number("seed", &seed)?);
            }
            _ => cli.command.push(arg),
        }
    }
    Ok(cli)
}

fn usage(message: &str) -> EngineError {
    EngineError::InvalidConfig(format!("{}\n\n{}", message, USAGE))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> EngineResult<T> {
    value
        .parse()
        .map_err(|_| EngineError::InvalidConfig(format!("invalid {} '{}'", name, value)))
}

/// `all` expands to every channel
fn parse_channels(value: Option<&str>) -> EngineResult<Vec<usize>> {
    match value {
        None | Some("all") => Ok((0..CHANNEL_COUNT).collect()),
        Some(ch) => Ok(vec![parse_number("channel", ch)?]),
    }
}

fn run(cli: Cli) -> EngineResult<()> {
    let settings = EngineSettings::load_or_default(cli.config.as_deref())?;
    let mut rng = match cli.seed.or(settings.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(settings.storage_root.clone()));
    let args: Vec<&str> = cli.command.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["generate", job_id, rest @ ..] => {
            let runner = JobRunner::new(storage, &settings)?;
            for channel in parse_channels(rest.first().copied())? {
                let key = runner.execute(job_id, channel, &mut rng)?;
                println!("{}", key);
            }
        }
        ["fx", job_id, channel, random_id, fx, vol, mute, switch, value] => {
            let random_id = match *random_id {
                "new" => random_mix_id(),
                id => id.to_string(),
            };
            let params = FxParams::parse(fx, vol, mute, switch, value)?;
            let runner = FxRunner::new(storage);
            for channel in parse_channels(Some(*channel))? {
                let key = runner.execute(job_id, channel, &random_id, &params, &mut rng)?;
                println!("{}", key);
            }
        }
        ["mix", job_id, random_id] => {
            let runner = MixRunner::new(storage, settings.export_settings());
            println!("{}", runner.execute(job_id, random_id)?);
        }
        ["render", audio, pulses, steps, bpm, scale, key, temperature, out] => {
            let runner = JobRunner::new(storage, &settings)?;
            let params = ChannelParams {
                channel: 0,
                bpm: parse_number("bpm", bpm)?,
                scale_value: scale.to_string(),
                key_value: key.to_string(),
                rhythm: RhythmConfig::new(
                    parse_number("pulses", pulses)?,
                    parse_number("steps", steps)?,
                )?,
                pitch_temperature: parse_number("temperature", temperature)?,
                source_path: audio.to_string(),
            };
            runner.engine().validate(&params)?;
            let source = load_audio(audio, settings.sample_rate)?;
            let sequence = runner.engine().generate(&params, &source.samples, &mut rng)?;
            export_wav(&sequence.validated, out, &settings.export_settings())?;
            println!(
                "{} ({} frames, notes {:?})",
                out,
                sequence.raw.len(),
                sequence.note_offsets
            );
        }
        ["scales"] => {
            let table = settings.load_scale_table()?;
            for name in table.scale_names() {
                println!("{}", name);
            }
        }
        [] => return Err(usage("missing command")),
        [other, ..] => return Err(usage(&format!("unknown or incomplete command '{}'", other))),
    }
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = setup_tracing() {
        eprintln!("{}", e);
    }

    let result = parse_args(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
