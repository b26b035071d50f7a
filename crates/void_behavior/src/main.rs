//! Behavior development runner
//!
//! Watches a behavior directory and drives the runtime at ~60 Hz so edits
//! can be tried against a handful of entities without an engine.
//!
//! Run with: cargo run -p void_behavior -- behaviors Player=Mover Enemy=Chaser
//!       or: void-behaviors behaviors Player=Mover --ticks 600 --config behaviors.toml

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use void_behavior::{
    BehaviorRuntime, EntityRef, EntityTable, HostEnvironment, RuntimeConfig, SwapReport,
};

/// Target frame time
const FRAME: Duration = Duration::from_millis(16);

const USAGE: &str = "usage: void-behaviors <dir> [Entity=Behavior ...] [--ticks N] [--config file]";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    source_dir: Option<PathBuf>,
    entities: Vec<(String, String)>,
    ticks: Option<u64>,
    config: Option<PathBuf>,
}

impl CliArgs {
    fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--ticks" => {
                    let value = args.next().ok_or("--ticks needs a value")?;
                    let ticks = value
                        .parse()
                        .map_err(|_| format!("invalid tick count '{}'", value))?;
                    parsed.ticks = Some(ticks);
                }
                "--config" => {
                    let value = args.next().ok_or("--config needs a file")?;
                    parsed.config = Some(PathBuf::from(value));
                }
                flag if flag.starts_with("--") => return Err(format!("unknown flag '{}'", flag)),
                declaration if declaration.contains('=') => {
                    let (entity, behavior) = declaration.split_once('=').unwrap_or_default();
                    if entity.is_empty() || behavior.is_empty() {
                        return Err(format!("invalid entity declaration '{}'", declaration));
                    }
                    parsed.entities.push((entity.to_string(), behavior.to_string()));
                }
                dir => {
                    if parsed.source_dir.is_some() {
                        return Err(format!("unexpected argument '{}'", dir));
                    }
                    parsed.source_dir = Some(PathBuf::from(dir));
                }
            }
        }

        Ok(parsed)
    }
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::FAILURE;
        }
    };

    let mut config = match RuntimeConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = &args.source_dir {
        config.source_dir = dir.clone();
    }

    let mut runtime = match BehaviorRuntime::new(config, Arc::new(HostEnvironment::standard())) {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start behavior runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut world = EntityTable::new();
    let mut labels: Vec<(EntityRef, String)> = Vec::new();
    for (label, behavior) in &args.entities {
        let entity = world.spawn_with(behavior.as_str());
        log::info!("{} is {} running {}", label, entity, behavior);
        labels.push((entity, label.clone()));
    }

    run(&mut runtime, &mut world, &labels, args.ticks);

    runtime.shutdown(&mut world);
    ExitCode::SUCCESS
}

fn run(
    runtime: &mut BehaviorRuntime,
    world: &mut EntityTable,
    labels: &[(EntityRef, String)],
    ticks: Option<u64>,
) {
    let mut last = Instant::now();
    let mut frame = 0u64;

    while ticks.map_or(true, |limit| frame < limit) {
        let start = Instant::now();
        let dt = start.duration_since(last).as_secs_f64();
        last = start;

        let report = runtime.tick(world, dt);
        if let Some(swap) = &report.swap {
            log_swap(swap, labels, &runtime.list_available_behavior_names());
        }
        if report.faults > 0 {
            log::debug!("Frame {}: {} callback fault(s)", frame, report.faults);
        }

        frame += 1;
        if let Some(remaining) = FRAME.checked_sub(start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    log::info!("Stopped after {} frame(s)", frame);
}

fn log_swap(report: &SwapReport, labels: &[(EntityRef, String)], behaviors: &[String]) {
    if let Some(stage) = report.failed_stage {
        log::error!(
            "Swap failed while {} with {} error(s); previous behaviors keep running",
            stage,
            report.errors().count()
        );
        return;
    }

    log::info!("Behaviors available: {}", behaviors.join(", "));
    for failure in &report.rebind_failures {
        let label = labels
            .iter()
            .find(|(entity, _)| *entity == failure.entity)
            .map(|(_, label)| label.as_str())
            .unwrap_or("?");
        log::warn!("{} lost its behavior: {}", label, failure.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_full_command_line() {
        let args = parse(&["behaviors", "Player=Mover", "--ticks", "10", "Enemy=Chaser", "--config", "b.toml"]).unwrap();
        assert_eq!(args.source_dir, Some(PathBuf::from("behaviors")));
        assert_eq!(
            args.entities,
            vec![
                ("Player".to_string(), "Mover".to_string()),
                ("Enemy".to_string(), "Chaser".to_string())
            ]
        );
        assert_eq!(args.ticks, Some(10));
        assert_eq!(args.config, Some(PathBuf::from("b.toml")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--ticks"]).is_err());
        assert!(parse(&["--ticks", "many"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["Player="]).is_err());
        assert!(parse(&["a", "b"]).is_err());
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }
}
