// Fly toward a detected object (a bottle by default) and land in front of it
//
// Frames are replayed from a directory and object detections from a JSON-lines
// recording, one line per frame.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use cognifly_servo::camera::open_with_retry;
use cognifly_servo::link::{Cognifly, DroneLink};
use cognifly_servo::{
    FlightOutcome, ImageDirectory, ObjectDetection, ObjectPolicy, ReplayDetector, ServoConfig,
    ServoLoop,
};

#[derive(Parser, Debug)]
#[command(name = "follow_object")]
#[command(about = "Follow a detected object with a Cognifly and land in front of it", long_about = None)]
struct Args {
    /// Directory of frames to replay
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Recorded object detections, one JSON line per frame
    #[arg(short, long)]
    detections: PathBuf,

    /// Flight configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Class to follow, overrides the configuration
    #[arg(long)]
    class_id: Option<u32>,

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
    if let Some(class_id) = args.class_id {
        config.object.class_id = class_id;
    }
    if let Some(frames) = args.frames {
        config.camera.frames_dir = frames;
    }

    let frames_dir = config.camera.frames_dir.clone();
    let source = open_with_retry(&config.camera, || ImageDirectory::open(&frames_dir)).await?;
    let detector = ReplayDetector::<ObjectDetection>::from_path(&args.detections)?;

    let cognifly = Cognifly::connect(&config.session.drone_host, config.session.drone_port).await?;
    println!("Connected to {}", cognifly.remote_addr());

    let policy = ObjectPolicy::new(config.object, config.frame, config.session.command_duration);
    let mut servo = ServoLoop::new(source, detector, policy, cognifly, config.session);

    servo.take_off().await?;
    match servo.run().await? {
        FlightOutcome::Landed { frames } => println!("Landed after {} frames", frames),
        FlightOutcome::StreamEnded { frames } => {
            println!("Stream ended after {} frames, landing", frames);
            servo.link().land().await?;
            tokio::time::sleep(Duration::from_secs(3)).await;
            servo.link().disarm().await?;
        }
    }

    let (_, _, _, cognifly) = servo.into_parts();
    cognifly.disconnect().await;
    Ok(())
}
