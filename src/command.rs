//! # Drone commands
//!
//! Commands are the only messages exchanged between the control loop and the drone link. On the wire each
//! command is one datagram: a [CommandKind] byte followed, for velocity commands, by five little-endian
//! `f32` (`v_x`, `v_y`, `v_z`, `yaw_rate`, `duration`) and a drone-frame flag byte.
//!
//! ```
//! # use cognifly_servo::{DroneCommand, VelocityCommand};
//! let command = DroneCommand::Velocity(VelocityCommand::new(0.25, 0.0, -0.125, 0.0, 1.0));
//! let datagram: Vec<u8> = command.into();
//! assert_eq!(datagram.len(), 22);
//! assert_eq!(DroneCommand::from_bytes(&datagram).unwrap(), command);
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const VELOCITY_PAYLOAD_LENGTH: usize = 5 * 4 + 1;

/// Command type identifier, first byte of every datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CommandKind {
    /// Arm the motors
    Arm = 1,
    /// Disarm the motors
    Disarm = 2,
    /// Take off, returns immediately
    Takeoff = 3,
    /// Land, returns immediately
    Land = 4,
    /// Velocity setpoint
    Velocity = 5,
}

/// Four-axis velocity setpoint held for a duration
///
/// A new command supersedes the one being executed; nothing is queued on the drone side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Velocity along the drone x axis; negative moves forward, toward what the camera sees
    pub v_x: f64,
    /// Lateral velocity
    pub v_y: f64,
    /// Vertical velocity
    pub v_z: f64,
    /// Yaw rate
    pub yaw_rate: f64,
    /// How long the setpoint is held (seconds)
    pub duration: f64,
    /// Velocities are expressed in the drone body frame rather than the world frame
    pub drone_frame: bool,
}

impl VelocityCommand {
    /// Velocity setpoint in the drone frame
    pub fn new(v_x: f64, v_y: f64, v_z: f64, yaw_rate: f64, duration: f64) -> Self {
        Self {
            v_x,
            v_y,
            v_z,
            yaw_rate,
            duration,
            drone_frame: true,
        }
    }
}

/// Message sent to the drone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DroneCommand {
    /// Arm the motors
    Arm,
    /// Disarm the motors
    Disarm,
    /// Take off
    Takeoff,
    /// Land
    Land,
    /// Velocity setpoint
    Velocity(VelocityCommand),
}

impl DroneCommand {
    /// Type identifier of the command
    pub fn kind(&self) -> CommandKind {
        match self {
            DroneCommand::Arm => CommandKind::Arm,
            DroneCommand::Disarm => CommandKind::Disarm,
            DroneCommand::Takeoff => CommandKind::Takeoff,
            DroneCommand::Land => CommandKind::Land,
            DroneCommand::Velocity(_) => CommandKind::Velocity,
        }
    }

    /// Decode a datagram
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (&kind, payload) = bytes
            .split_first()
            .ok_or_else(|| Error::DecodeError("empty datagram".to_owned()))?;

        match CommandKind::try_from(kind)? {
            CommandKind::Arm => Ok(DroneCommand::Arm),
            CommandKind::Disarm => Ok(DroneCommand::Disarm),
            CommandKind::Takeoff => Ok(DroneCommand::Takeoff),
            CommandKind::Land => Ok(DroneCommand::Land),
            CommandKind::Velocity => {
                if payload.len() != VELOCITY_PAYLOAD_LENGTH {
                    return Err(Error::DecodeError(format!(
                        "velocity payload of {} bytes, expected {}",
                        payload.len(),
                        VELOCITY_PAYLOAD_LENGTH
                    )));
                }
                let field = |i: usize| -> Result<f64> {
                    Ok(f32::from_le_bytes(payload[i * 4..(i + 1) * 4].try_into()?) as f64)
                };
                Ok(DroneCommand::Velocity(VelocityCommand {
                    v_x: field(0)?,
                    v_y: field(1)?,
                    v_z: field(2)?,
                    yaw_rate: field(3)?,
                    duration: field(4)?,
                    drone_frame: payload[20] != 0,
                }))
            }
        }
    }
}

impl From<DroneCommand> for Vec<u8> {
    fn from(command: DroneCommand) -> Self {
        let mut datagram: Vec<u8> = vec![command.kind().into()];
        if let DroneCommand::Velocity(v) = command {
            datagram.reserve(VELOCITY_PAYLOAD_LENGTH);
            for value in [v.v_x, v.v_y, v.v_z, v.yaw_rate, v.duration].iter() {
                datagram.extend_from_slice(&(*value as f32).to_le_bytes());
            }
            datagram.push(v.drone_frame as u8);
        }
        datagram
    }
}
