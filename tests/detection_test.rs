use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cognifly_servo::camera::open_with_retry;
use cognifly_servo::config::CameraConfig;
use cognifly_servo::{
    Detector, Error, Frame, FrameSource, ImageDirectory, ObjectDetection, ReplayDetector,
    TagDetection,
};
use image::{Rgb, RgbImage};

fn blank_frame() -> Frame {
    Frame::new(0, RgbImage::new(2, 2))
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cognifly-servo-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn recorded_tags_are_replayed_frame_by_frame() -> Result<(), Error> {
    let recording = concat!(
        r#"[{"tag_id":0,"center":[325.0,238.0],"pose":{"rotation":[1,0,0,0,1,0,0,0,1],"translation":[0.1,-0.2,3.05]}}]"#,
        "\n",
        "\n",
        r#"[{"tag_id":4,"center":[10.0,20.0]}]"#,
        "\n",
    );
    let mut detector = ReplayDetector::<TagDetection>::from_reader(Cursor::new(recording))?;
    assert_eq!(detector.remaining(), 3);

    let first = detector.detect(&blank_frame())?;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].tag_id, 0);
    assert_eq!(first[0].center.x, 325.0);
    let pose = first[0].pose.as_ref().unwrap();
    assert_eq!(pose.depth(), 3.05);
    assert_eq!(pose.euler_angles().yaw, 0.0);

    // Blank line: a frame without detections
    assert!(detector.detect(&blank_frame())?.is_empty());

    let third = detector.detect(&blank_frame())?;
    assert_eq!(third[0].tag_id, 4);
    assert!(third[0].pose.is_none());

    // Exhausted recording keeps answering with nothing
    assert_eq!(detector.remaining(), 0);
    assert!(detector.detect(&blank_frame())?.is_empty());
    Ok(())
}

#[test]
fn recorded_objects_are_replayed() -> Result<(), Error> {
    let recording = r#"[{"class_id":43,"score":0.8,"bbox":{"xmin":255.0,"ymin":190.0,"xmax":385.0,"ymax":290.0}}]"#;
    let mut detector = ReplayDetector::<ObjectDetection>::from_reader(Cursor::new(recording))?;

    let objects = detector.detect(&blank_frame())?;
    assert_eq!(objects[0].class_id, 43);
    assert_eq!(objects[0].bbox.width(), 130.0);
    Ok(())
}

#[test]
fn corrupt_recording_names_the_line() {
    let recording = "[]\n[{\"tag_id\":\n";
    match ReplayDetector::<TagDetection>::from_reader(Cursor::new(recording)) {
        Err(Error::DecodeError(reason)) => assert!(reason.starts_with("line 2"), "{}", reason),
        Err(e) => panic!("expected a decode error, got {:?}", e),
        Ok(_) => panic!("expected a decode error"),
    }
}

#[test]
fn directory_frames_come_in_name_order() -> Result<(), Error> {
    let dir = scratch_dir("frames");
    for (name, shade) in [("frame_002.png", 2u8), ("frame_000.png", 0), ("frame_001.jpg", 1)].iter() {
        RgbImage::from_pixel(8, 6, Rgb([*shade, *shade, *shade]))
            .save(dir.join(name))
            .unwrap();
    }
    std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

    let mut source = ImageDirectory::open(&dir)?;
    assert_eq!(source.len(), 3);

    for sequence in 0..3 {
        let frame = source.next_frame()?.unwrap();
        assert_eq!(frame.sequence, sequence);
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.to_gray().dimensions(), (8, 6));
    }
    assert!(source.next_frame()?.is_none());
    Ok(())
}

#[test]
fn missing_or_empty_directory_is_an_unavailable_camera() {
    assert!(matches!(
        ImageDirectory::open("/nonexistent/frames"),
        Err(Error::CameraUnavailable(_))
    ));

    let dir = scratch_dir("no-frames");
    assert!(matches!(ImageDirectory::open(&dir), Err(Error::CameraUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn camera_is_not_retried_by_default() {
    let attempts = Arc::new(Mutex::new(0));
    let counter = attempts.clone();

    let result = open_with_retry(&CameraConfig::default(), || -> Result<(), Error> {
        *counter.lock().unwrap() += 1;
        Err(Error::CameraUnavailable("unplugged".to_owned()))
    })
    .await;

    assert!(matches!(result, Err(Error::CameraUnavailable(_))));
    assert_eq!(*attempts.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn camera_retries_until_it_opens() -> Result<(), Error> {
    let config = CameraConfig {
        open_retries: 3,
        retry_delay: 0.5,
        ..CameraConfig::default()
    };
    let mut attempts = 0;
    let start = tokio::time::Instant::now();

    let opened = open_with_retry(&config, || {
        attempts += 1;
        if attempts < 3 {
            Err(Error::CameraUnavailable("warming up".to_owned()))
        } else {
            Ok(attempts)
        }
    })
    .await?;

    assert_eq!(opened, 3);
    assert!(start.elapsed() >= Duration::from_secs(1));
    Ok(())
}
