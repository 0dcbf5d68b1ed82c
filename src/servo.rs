//! # Visual-servoing loop
//!
//! [ServoLoop] ties together a frame source, a detector, a target policy and a drone link, all owned and
//! injected at construction. The loop is a two-state machine: while [FlightState::Running] it reads a frame,
//! runs the detector and hands every matching detection to the policy; as soon as the policy reports the
//! target reached it runs the landing maneuver and moves to [FlightState::Landed], after which no frame is
//! read anymore.
//!
//! Velocity commands are fire-and-forget: the loop goes on with the next frame without waiting for the drone.
//!
//! ``` no_run
//! # use cognifly_servo::{ServoConfig, ServoLoop, ImageDirectory, ReplayDetector, TagPolicy, TagDetection};
//! # use cognifly_servo::link::Cognifly;
//! # async fn fly() -> cognifly_servo::Result<()> {
//! let config = ServoConfig::default();
//! let source = ImageDirectory::open(&config.camera.frames_dir)?;
//! let detector = ReplayDetector::<TagDetection>::from_path("tags.jsonl")?;
//! let policy = TagPolicy::new(config.tag.clone(), config.frame, config.session.command_duration);
//! let drone = Cognifly::connect(&config.session.drone_host, config.session.drone_port).await?;
//!
//! let mut servo = ServoLoop::new(source, detector, policy, drone, config.session.clone());
//! servo.take_off().await?;
//! let outcome = servo.run().await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

use log::{debug, info};
use tokio::time::sleep;

use crate::camera::FrameSource;
use crate::config::{MatchPolicy, SessionConfig};
use crate::detection::Detector;
use crate::link::DroneLink;
use crate::target::{seconds, TargetPolicy};
use crate::Result;

/// State of the flight session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    /// Following the target
    Running,
    /// Landed and disarmed; terminal
    Landed,
}

/// Result of processing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No matching detection in the frame, nothing was sent
    NoTarget,
    /// The given number of velocity commands were sent
    Commanded(usize),
    /// The target was reached and the landing sequence ran
    Landed,
    /// The frame source has no more frames
    StreamEnded,
}

/// How a flight ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightOutcome {
    /// The target was reached and the drone landed and disarmed
    Landed {
        /// Frames processed, including the one that triggered the landing
        frames: u64,
    },
    /// The frame source ran out before the target was reached; the drone is still flying
    StreamEnded {
        /// Frames processed
        frames: u64,
    },
}

/// # The control loop
///
/// See the [servo module documentation](crate::servo) for more context and information.
pub struct ServoLoop<S, D, P, L> {
    source: S,
    detector: D,
    policy: P,
    link: L,
    session: SessionConfig,
    state: FlightState,
    frames: u64,
}

impl<S, D, P, L> ServoLoop<S, D, P, L>
where
    S: FrameSource,
    P: TargetPolicy,
    D: Detector<Detection = P::Detection>,
    L: DroneLink,
{
    /// Assemble a loop from its parts
    pub fn new(source: S, detector: D, policy: P, link: L, session: SessionConfig) -> Self {
        Self {
            source,
            detector,
            policy,
            link,
            session,
            state: FlightState::Running,
            frames: 0,
        }
    }

    /// Arm, take off and wait for the drone to stabilise
    pub async fn take_off(&self) -> Result<()> {
        info!("Arming");
        self.link.arm().await?;
        sleep(seconds(self.session.arm_delay)).await;

        info!("Taking off");
        self.link.takeoff().await?;
        sleep(seconds(self.session.takeoff_delay)).await;

        Ok(())
    }

    /// Process frames until the drone has landed or the frame source is exhausted
    pub async fn run(&mut self) -> Result<FlightOutcome> {
        while self.state == FlightState::Running {
            if self.step().await? == StepOutcome::StreamEnded {
                info!("Frame source exhausted after {} frames", self.frames);
                return Ok(FlightOutcome::StreamEnded {
                    frames: self.frames,
                });
            }
        }

        Ok(FlightOutcome::Landed {
            frames: self.frames,
        })
    }

    /// Process exactly one frame
    ///
    /// Once landed no frame is read and [StepOutcome::Landed] is returned again.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        if self.state == FlightState::Landed {
            return Ok(StepOutcome::Landed);
        }

        let frame = match self.source.next_frame()? {
            Some(frame) => frame,
            None => return Ok(StepOutcome::StreamEnded),
        };
        self.frames += 1;

        let detections = self.detector.detect(&frame)?;
        debug!("frame {}: {} detections", frame.sequence, detections.len());

        let mut commanded = 0;
        for detection in detections.iter() {
            if !self.policy.matches(detection) {
                continue;
            }

            if self.policy.is_reached(detection) {
                info!("Target reached on frame {}, landing", frame.sequence);
                self.land().await?;
                return Ok(StepOutcome::Landed);
            }

            let command = self.policy.compose(detection);
            self.link.set_velocity(command).await?;
            commanded += 1;

            if self.session.match_policy == MatchPolicy::FirstMatch {
                break;
            }
        }

        if commanded == 0 {
            Ok(StepOutcome::NoTarget)
        } else {
            Ok(StepOutcome::Commanded(commanded))
        }
    }

    async fn land(&mut self) -> Result<()> {
        let sequence = self.policy.landing_sequence();

        if let Some(burst) = sequence.burst {
            self.link.set_velocity(burst).await?;
            sleep(sequence.burst_wait).await;
        }
        self.link.land().await?;
        sleep(sequence.land_wait).await;
        self.link.disarm().await?;

        self.state = FlightState::Landed;
        info!("Landed and disarmed");
        Ok(())
    }

    /// Current state of the flight
    pub fn state(&self) -> FlightState {
        self.state
    }

    /// Number of frames processed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Target policy
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Drone link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Take the loop apart, giving back the frame source, detector, policy and link
    pub fn into_parts(self) -> (S, D, P, L) {
        (self.source, self.detector, self.policy, self.link)
    }
}
