// src/main.rs - Host-side tool for checking a machine configuration and tracing moves
use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cnc_kinematics::alarm::AlarmLog;
use cnc_kinematics::config::{self, Config};
use cnc_kinematics::motion::{
    ActuatorVector, CartesianPoint, DispatchResult, MotionDispatcher, MotionRequest, QueuedPlanner,
};

/// Kinematics host CLI
#[derive(Parser, Debug)]
#[command(name = "kinematics-host", about = "Inspect machine kinematics and trace Cartesian moves into actuator commands.")]
struct Cli {
    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate a configuration, then show the calibration origin
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Dispatch successive moves from the home position through each point
    Trace {
        #[arg(short, long)]
        config: PathBuf,
        /// Treat every move as a rapid (one segment)
        #[arg(long)]
        rapid: bool,
        /// Feed rate for linear moves
        #[arg(long, default_value_t = 1000.0)]
        feed: f64,
        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
        /// Targets as X,Y[,Z]
        #[arg(required = true, value_parser = parse_point, allow_hyphen_values = true)]
        points: Vec<CartesianPoint>,
    },
    /// Convert motor positions to a Cartesian position
    Position {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(allow_negative_numbers = true)]
        a0: f64,
        #[arg(allow_negative_numbers = true)]
        a1: f64,
        #[arg(allow_negative_numbers = true)]
        a2: f64,
    },
}

fn parse_point(s: &str) -> Result<CartesianPoint, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y] => Ok(CartesianPoint::new(*x, *y, 0.0)),
        [x, y, z] => Ok(CartesianPoint::new(*x, *y, *z)),
        _ => Err(format!("expected X,Y or X,Y,Z, got '{}'", s)),
    }
}

fn load(path: &PathBuf) -> Result<Config, Box<dyn Error>> {
    let path = path.to_str().ok_or("config path is not valid UTF-8")?;
    tracing::info!("Loading configuration from: {}", path);
    let config = config::load_config(path)?;
    config.validate()?;
    Ok(config)
}

fn dispatcher(config: &Config) -> Result<MotionDispatcher<QueuedPlanner, AlarmLog>, Box<dyn Error>> {
    let mut dispatcher = MotionDispatcher::from_config(config, QueuedPlanner::new(), AlarmLog::new())?;
    let home = dispatcher.context().model().home_position();
    dispatcher.calibrate(home)?;
    Ok(dispatcher)
}

fn check(config: &Config) -> Result<(), Box<dyn Error>> {
    let dispatcher = dispatcher(config)?;
    let context = dispatcher.context();
    println!(
        "machine: {}",
        config.machine.name.as_deref().unwrap_or("unnamed")
    );
    println!("kinematics: {}", context.model().name());
    println!("segment length: {}", dispatcher.segmenter().max_segment_length());
    println!("directions: {:?}", context.directions());
    if let Some(origin) = context.origin() {
        println!("origin: {} -> actuators {}", origin.cartesian(), origin.actuators());
    }
    match dispatcher.validator() {
        Some(v) => println!("validator: on (tolerance {})", v.tolerance()),
        None => println!("validator: off"),
    }
    Ok(())
}

fn trace(
    config: &Config,
    rapid: bool,
    feed: f64,
    json: bool,
    points: &[CartesianPoint],
) -> Result<(), Box<dyn Error>> {
    let mut dispatcher = dispatcher(config)?;
    let mut current = dispatcher.context().model().home_position();
    for target in points {
        let request = if rapid {
            MotionRequest::rapid(current, *target)
        } else {
            MotionRequest::linear(current, *target, feed)
        };
        let result = dispatcher.convert_motion(&request)?;
        for planned in dispatcher.planner_mut().drain() {
            if json {
                println!("{}", serde_json::to_string(&planned)?);
            } else {
                println!("{}  F{:.3}", planned.motors, planned.params.feed_rate);
            }
        }
        match result {
            DispatchResult::Completed { segments } => {
                if json {
                    let line = serde_json::json!({ "target": target, "segments": segments });
                    println!("{}", line);
                } else {
                    println!("; {} reached in {} segment(s)", target, segments);
                }
                current = *target;
            }
            DispatchResult::Cancelled { submitted } => {
                println!("; cancelled after {} segment(s)", submitted);
                break;
            }
            DispatchResult::Faulted(kind) => return Err(kind.into()),
        }
    }
    let status = dispatcher.status();
    if json {
        println!("{}", serde_json::json!({ "motors": status.motors, "position": status.position }));
    } else if let Some(position) = status.position {
        println!("; final position {} (motors {})", position, status.motors);
    }
    Ok(())
}

fn position(config: &Config, motors: ActuatorVector) -> Result<(), Box<dyn Error>> {
    let dispatcher = dispatcher(config)?;
    let position = dispatcher.convert_position(&motors)?;
    println!("{}", position);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Check { config } => check(&load(config)?),
        Commands::Trace { config, rapid, feed, json, points } => {
            trace(&load(config)?, *rapid, *feed, *json, points)
        }
        Commands::Position { config, a0, a1, a2 } => {
            position(&load(config)?, ActuatorVector::new(*a0, *a1, *a2))
        }
    }
}
