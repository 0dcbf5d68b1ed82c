use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flume as channel;
use flume::Sender;
use futures::lock::Mutex;
use log::{debug, info, warn};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::command::{DroneCommand, VelocityCommand};
use crate::link::DroneLink;
use crate::{Error, Result};

/// UDP port the drone listens on by default
pub const DEFAULT_PORT: u16 = 8988;

/// # Network link to a Cognifly drone
///
/// Commands are queued on an unbounded channel and sent by an uplink task, one datagram each, so every
/// [DroneLink] method returns as soon as the command is queued. No acknowledgement is awaited.
///
/// The link is one-time use: once disconnected, either by [Cognifly::disconnect()] or by dropping it, a new one
/// has to be created.
///
/// ``` no_run
/// # use cognifly_servo::link::{Cognifly, DroneLink, DEFAULT_PORT};
/// # async fn fly() -> cognifly_servo::Result<()> {
/// let drone = Cognifly::connect("192.168.5.247", DEFAULT_PORT).await?;
/// drone.arm().await?;
/// drone.takeoff().await?;
/// drone.land().await?;
/// drone.disarm().await?;
/// drone.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct Cognifly {
    uplink: Sender<DroneCommand>,
    uplink_task: Mutex<Option<JoinHandle<()>>>,
    disconnect: Arc<AtomicBool>,
    remote: SocketAddr,
}

impl Cognifly {
    /// Open a link to the drone at `host:port`
    ///
    /// An error is returned if the host cannot be resolved or the local socket cannot be bound.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.connect((host, port)).await?;
        let remote = socket.peer_addr()?;

        let disconnect = Arc::new(AtomicBool::new(false));
        let disconnect_uplink = disconnect.clone();
        let (uplink, rx) = channel::unbounded::<DroneCommand>();

        // Queued commands are drained before the task honours a disconnect request
        let uplink_task = tokio::spawn(async move {
            loop {
                match tokio::time::timeout(Duration::from_millis(100), rx.recv_async()).await {
                    Ok(Ok(command)) => {
                        let datagram: Vec<u8> = command.into();
                        if let Err(e) = socket.send(&datagram).await {
                            warn!("Drone link closed: {}", e);
                            return;
                        }
                    }
                    Err(_) => {
                        if disconnect_uplink.load(Relaxed) {
                            return;
                        }
                    }
                    Ok(Err(flume::RecvError::Disconnected)) => return,
                }
            }
        });

        info!("Connected to drone at {}", remote);

        Ok(Cognifly {
            uplink,
            uplink_task: Mutex::new(Some(uplink_task)),
            disconnect,
            remote,
        })
    }

    /// Address of the drone
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Disconnect from the drone
    ///
    /// Commands already queued are sent first. Once this function returns the uplink task has ended and every
    /// further command fails with [Error::Disconnected].
    pub async fn disconnect(&self) {
        self.disconnect.store(true, Relaxed);

        if let Some(uplink_task) = self.uplink_task.lock().await.take() {
            let _ = uplink_task.await;
        }
    }

    async fn send(&self, command: DroneCommand) -> Result<()> {
        if self.disconnect.load(Relaxed) {
            return Err(Error::Disconnected);
        }
        debug!("-> {:?}", command);
        self.uplink.send_async(command).await?;

        Ok(())
    }
}

#[async_trait]
impl DroneLink for Cognifly {
    async fn arm(&self) -> Result<()> {
        self.send(DroneCommand::Arm).await
    }

    async fn disarm(&self) -> Result<()> {
        self.send(DroneCommand::Disarm).await
    }

    async fn takeoff(&self) -> Result<()> {
        self.send(DroneCommand::Takeoff).await
    }

    async fn land(&self) -> Result<()> {
        self.send(DroneCommand::Land).await
    }

    async fn set_velocity(&self, command: VelocityCommand) -> Result<()> {
        self.send(DroneCommand::Velocity(command)).await
    }
}

impl Drop for Cognifly {
    fn drop(&mut self) {
        self.disconnect.store(true, Relaxed);
    }
}
