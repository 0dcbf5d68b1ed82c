// Fly toward an AprilTag and land on the base station behind it
//
// Frames are replayed from a directory and tag detections from a JSON-lines
// recording, one line per frame. Set RUST_LOG=info to follow the flight.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use cognifly_servo::camera::open_with_retry;
use cognifly_servo::link::{Cognifly, DroneLink};
use cognifly_servo::{
    FlightOutcome, ImageDirectory, ReplayDetector, ServoConfig, ServoLoop, TagDetection, TagPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "follow_tag")]
#[command(about = "Follow an AprilTag with a Cognifly and land in front of it", long_about = None)]
struct Args {
    /// Directory of frames to replay
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Recorded tag detections, one JSON line per frame
    #[arg(short, long)]
    detections: PathBuf,

    /// Flight configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drone address, overrides the configuration
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServoConfig::from_json_file(path)?,
        None => ServoConfig::default(),
    };
    if let Some(host) = args.host {
        config.session.drone_host = host;
    }
    if let Some(frames) = args.frames {
        config.camera.frames_dir = frames;
    }

    let frames_dir = config.camera.frames_dir.clone();
    let source = open_with_retry(&config.camera, || ImageDirectory::open(&frames_dir)).await?;
    let detector = ReplayDetector::<TagDetection>::from_path(&args.detections)?;
    println!("Replaying {} frames, {} recorded", source.len(), detector.remaining());

    println!(
        "Connecting to {}:{} ...",
        config.session.drone_host, config.session.drone_port
    );
    let cognifly = Cognifly::connect(&config.session.drone_host, config.session.drone_port).await?;

    let policy = TagPolicy::new(config.tag, config.frame, config.session.command_duration);
    let mut servo = ServoLoop::new(source, detector, policy, cognifly, config.session);

    servo.take_off().await?;
    match servo.run().await? {
        FlightOutcome::Landed { frames } => println!("Landed after {} frames", frames),
        FlightOutcome::StreamEnded { frames } => {
            println!("No more frames after {}, landing", frames);
            servo.link().land().await?;
            tokio::time::sleep(Duration::from_secs(3)).await;
            servo.link().disarm().await?;
        }
    }

    let (_, _, _, cognifly) = servo.into_parts();
    cognifly.disconnect().await;
    Ok(())
}
