//! # Drone link
//!
//! The control loop talks to the drone through the [DroneLink] trait. Every method only queues the command:
//! takeoff, land and velocity setpoints return before the drone has executed them, and a new velocity setpoint
//! supersedes the running one. Sequencing between commands is done by the caller with fixed waits.
//!
//! [Cognifly] is the network implementation. Tests and simulations substitute their own implementation.

mod cognifly;

pub use cognifly::{Cognifly, DEFAULT_PORT};

use async_trait::async_trait;

use crate::command::VelocityCommand;
use crate::Result;

/// Fire-and-forget command channel to a drone
#[async_trait]
pub trait DroneLink: Send + Sync {
    /// Arm the motors
    async fn arm(&self) -> Result<()>;

    /// Disarm the motors
    async fn disarm(&self) -> Result<()>;

    /// Start taking off, does not wait for the drone to be airborne
    async fn takeoff(&self) -> Result<()>;

    /// Start landing, does not wait for the drone to be on the ground
    async fn land(&self) -> Result<()>;

    /// Replace the current velocity setpoint
    async fn set_velocity(&self, command: VelocityCommand) -> Result<()>;
}
