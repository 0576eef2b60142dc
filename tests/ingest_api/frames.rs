//! Frame index tests
//!
//! - frame durations and inter-frame gaps
//! - lookup of the frame containing a timestamp
//! - frames spanning batch boundaries

use crate::*;
use tracedb::prelude::*;

fn frame_start(db: &TraceDb, time: TimeMicros, number: i64) -> Event {
    event(db, names::FRAME_START, time, vec![Value::Int(number)])
}

fn frame_end(db: &TraceDb, time: TimeMicros, number: i64) -> Event {
    event(db, names::FRAME_END, time, vec![Value::Int(number)])
}

#[test]
fn test_frame_durations_and_gaps() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        frame_start(&db, 0, 1),
        frame_end(&db, 16_000, 1),
        frame_start(&db, 16_500, 2),
        frame_end(&db, 33_000, 2),
    ];
    ingest(&mut db, batch);

    let frames = db.first_frame_index().unwrap();
    assert_eq!(frames.count(), 2);
    assert_eq!(frames.frames()[0].duration(), Some(16_000));
    assert_eq!(frames.frames()[1].duration(), Some(16_500));
    assert_eq!(frames.gap_to_previous(1), Some(500));
    assert_eq!(frames.average_duration(), Some(16_250));
}

#[test]
fn test_frame_in_range() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        frame_start(&db, 100, 1),
        frame_end(&db, 200, 1),
        frame_start(&db, 300, 2),
        frame_end(&db, 400, 2),
    ];
    ingest(&mut db, batch);

    let frames = db.first_frame_index().unwrap();
    assert_eq!(frames.frame_in_range(150).unwrap().number(), 1);
    assert_eq!(frames.frame_in_range(200).unwrap().number(), 1);
    assert!(frames.frame_in_range(250).is_none());
    assert_eq!(frames.frame_in_range(350).unwrap().number(), 2);
}

/// A frame whose end arrives in a later batch completes then
#[test]
fn test_frame_completes_across_batches() {
    let mut db = create_db();
    let batch = vec![zone_create(&db, "Z"), frame_start(&db, 0, 1)];
    ingest(&mut db, batch);
    assert_eq!(db.first_frame_index().unwrap().frames()[0].duration(), None);

    let batch = vec![frame_end(&db, 16_000, 1)];
    ingest(&mut db, batch);
    assert_eq!(
        db.first_frame_index().unwrap().frames()[0].duration(),
        Some(16_000)
    );
}

/// Frame markers count as zone events and are visible to `for_each`
#[test]
fn test_frames_are_zone_events() {
    let mut db = create_db();
    let batch = vec![
        zone_create(&db, "Z"),
        frame_start(&db, 100, 1),
        frame_end(&db, 200, 1),
    ];
    ingest(&mut db, batch);

    let mut seen = Vec::new();
    db.zone_by_name("Z")
        .unwrap()
        .for_each(100, 201, |e| seen.push(e.time()));
    assert_eq!(seen, vec![100, 200]);
}
