// The Cognifly link against a local UDP socket standing in for the drone

use std::time::Duration;

use cognifly_servo::link::{Cognifly, DroneLink};
use cognifly_servo::{CommandKind, DroneCommand, Error, VelocityCommand};
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn receive(drone: &UdpSocket) -> Result<DroneCommand, Box<dyn std::error::Error>> {
    let mut buffer = [0u8; 64];
    let length = timeout(Duration::from_secs(2), drone.recv(&mut buffer)).await??;
    Ok(DroneCommand::from_bytes(&buffer[..length])?)
}

#[tokio::test]
async fn commands_reach_the_drone_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let drone = UdpSocket::bind("127.0.0.1:0").await?;
    let port = drone.local_addr()?.port();

    let link = Cognifly::connect("127.0.0.1", port).await?;
    assert_eq!(link.remote_addr().port(), port);

    let velocity = VelocityCommand::new(-0.25, 0.5, 0.125, -0.1875, 1.0);
    link.arm().await?;
    link.takeoff().await?;
    link.set_velocity(velocity).await?;
    link.land().await?;
    link.disarm().await?;

    assert_eq!(receive(&drone).await?, DroneCommand::Arm);
    assert_eq!(receive(&drone).await?, DroneCommand::Takeoff);
    assert_eq!(receive(&drone).await?, DroneCommand::Velocity(velocity));
    assert_eq!(receive(&drone).await?, DroneCommand::Land);
    assert_eq!(receive(&drone).await?, DroneCommand::Disarm);

    link.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn queued_commands_are_sent_before_disconnecting() -> Result<(), Box<dyn std::error::Error>> {
    let drone = UdpSocket::bind("127.0.0.1:0").await?;
    let link = Cognifly::connect("127.0.0.1", drone.local_addr()?.port()).await?;

    link.land().await?;
    link.disarm().await?;
    link.disconnect().await;

    assert_eq!(receive(&drone).await?, DroneCommand::Land);
    assert_eq!(receive(&drone).await?, DroneCommand::Disarm);

    match link.arm().await {
        Err(Error::Disconnected) => (),
        other => panic!("expected Disconnected, got {:?}", other),
    }
    Ok(())
}

#[test]
fn datagram_layout() {
    let arm: Vec<u8> = DroneCommand::Arm.into();
    assert_eq!(arm, vec![1]);
    let land: Vec<u8> = DroneCommand::Land.into();
    assert_eq!(land, vec![4]);

    let burst = VelocityCommand::new(-3.0, 0.0, 0.0, 0.0, 1.5);
    let datagram: Vec<u8> = DroneCommand::Velocity(burst).into();
    assert_eq!(datagram.len(), 22);
    assert_eq!(datagram[0], u8::from(CommandKind::Velocity));
    assert_eq!(&datagram[1..5], &(-3.0f32).to_le_bytes());
    assert_eq!(&datagram[17..21], &1.5f32.to_le_bytes());
    assert_eq!(datagram[21], 1);
}

#[test]
fn malformed_datagrams_are_rejected() {
    assert!(matches!(DroneCommand::from_bytes(&[]), Err(Error::DecodeError(_))));
    assert!(matches!(DroneCommand::from_bytes(&[42]), Err(Error::DecodeError(_))));
    assert!(matches!(
        DroneCommand::from_bytes(&[5, 0, 0, 0]),
        Err(Error::DecodeError(_))
    ));
}
