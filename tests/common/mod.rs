// Fakes shared by the integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cognifly_servo::{DroneCommand, Error, Frame, FrameSource, Result, VelocityCommand};
use cognifly_servo::link::DroneLink;
use image::RgbImage;
use nalgebra::{Matrix3, Point2, Rotation3, Vector3};
use tokio::time::Instant;

use cognifly_servo::geometry::BoundingBox;
use cognifly_servo::{ObjectDetection, TagDetection, TagPose};

/// Records every command with the (virtual) time it was sent
#[derive(Clone, Default)]
pub struct RecordingLink {
    pub log: Arc<Mutex<Vec<(Instant, DroneCommand)>>>,
}

impl RecordingLink {
    pub fn commands(&self) -> Vec<DroneCommand> {
        self.log.lock().unwrap().iter().map(|(_, c)| *c).collect()
    }

    pub fn timeline(&self) -> Vec<(Instant, DroneCommand)> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, command: DroneCommand) -> Result<()> {
        self.log.lock().unwrap().push((Instant::now(), command));
        Ok(())
    }
}

#[async_trait]
impl DroneLink for RecordingLink {
    async fn arm(&self) -> Result<()> {
        self.push(DroneCommand::Arm)
    }

    async fn disarm(&self) -> Result<()> {
        self.push(DroneCommand::Disarm)
    }

    async fn takeoff(&self) -> Result<()> {
        self.push(DroneCommand::Takeoff)
    }

    async fn land(&self) -> Result<()> {
        self.push(DroneCommand::Land)
    }

    async fn set_velocity(&self, command: VelocityCommand) -> Result<()> {
        self.push(DroneCommand::Velocity(command))
    }
}

/// Yields a fixed number of blank frames and counts the reads
pub struct BlankFrames {
    remaining: u64,
    pub reads: Arc<Mutex<u64>>,
}

impl BlankFrames {
    pub fn new(count: u64) -> Self {
        Self {
            remaining: count,
            reads: Arc::new(Mutex::new(0)),
        }
    }
}

impl FrameSource for BlankFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut reads = self.reads.lock().unwrap();
        *reads += 1;
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(Frame::new(*reads - 1, RgbImage::new(4, 4))))
    }
}

/// Frame source whose camera is unplugged
pub struct UnpluggedCamera;

impl FrameSource for UnpluggedCamera {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Err(Error::CameraUnavailable("unplugged".to_owned()))
    }
}

pub fn tag(tag_id: u32, x: f64, y: f64, depth: f64) -> TagDetection {
    tag_with_yaw(tag_id, x, y, depth, 0.0)
}

/// Tag whose pose yields the given yaw angle
pub fn tag_with_yaw(tag_id: u32, x: f64, y: f64, depth: f64, yaw: f64) -> TagDetection {
    let rotation: Matrix3<f64> = *Rotation3::from_euler_angles(yaw, 0.0, 0.0).matrix();
    TagDetection {
        tag_id,
        center: Point2::new(x, y),
        pose: Some(TagPose {
            rotation,
            translation: Vector3::new(0.0, 0.0, depth),
        }),
    }
}

/// Object with a box of the given center and width, 100 px high
pub fn object(class_id: u32, h_center: f64, v_center: f64, width: f64) -> ObjectDetection {
    ObjectDetection {
        class_id,
        score: 0.9,
        bbox: BoundingBox::new(
            h_center - width / 2.0,
            v_center - 50.0,
            h_center + width / 2.0,
            v_center + 50.0,
        ),
    }
}

pub fn velocities(commands: &[DroneCommand]) -> Vec<VelocityCommand> {
    commands
        .iter()
        .filter_map(|c| match c {
            DroneCommand::Velocity(v) => Some(*v),
            _ => None,
        })
        .collect()
}
