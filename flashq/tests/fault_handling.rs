//! Fault handling tests for flashq
//!
//! These tests cover:
//! - Status writes that do not read back
//! - Device failures during compaction
//! - Corrupted status bytes under both corruption policies
//! - Geometry checks under both geometry policies

mod common;

use common::*;
use flashq::{
    CorruptionPolicy, GeometryPolicy, NorFlashDevice, QueueConfig, QueueError, RamFlash,
    SectorIndex, SectorQueue, SectorStatus,
};

const SECTORS: u32 = 5;

fn faulty_queue(flash: FaultyFlash) -> SectorQueue<NorFlashDevice<FaultyFlash>, SECTOR, EventLog> {
    let config = QueueConfig::with_sector_count(0, SECTOR as u32, SECTORS).expect("valid config");
    SectorQueue::new(NorFlashDevice::new(flash), config)
        .expect("matching sector size")
        .with_observer(EventLog::default())
}

#[test]
fn test_push_verify_failure_keeps_sector_empty() {
    init_logger();
    let mut queue = faulty_queue(FaultyFlash::new(SECTORS as usize));
    queue.initialize().unwrap();

    // Status byte of index 1 stops accepting writes
    queue.device_mut().flash_mut().stuck_address = Some(1);

    let err = queue.push(&payload(7)).unwrap_err();
    assert!(matches!(
        err,
        QueueError::VerifyFailed {
            expected: 0x5E,
            found: 0x5F,
            ..
        }
    ));
    assert_eq!(
        queue.status_of(SectorIndex::new(1)),
        Some(SectorStatus::Empty)
    );
    assert!(queue.observer().events.contains(&Event::VerifyFailed {
        index: 1,
        expected: 0x5E,
        found: 0x5F,
    }));

    // Nothing was recorded as pushed
    let mut buf = empty_buffer();
    assert!(queue.pop(&mut buf).unwrap_err().is_no_data());

    // The orphaned payload is overwritten by the next push to that sector
    queue.device_mut().flash_mut().stuck_address = None;
    let data_sector = SECTOR;
    assert_eq!(queue.device().flash().inner.as_bytes()[data_sector], 7);
    assert_eq!(queue.device().flash().inner.erase_count(1), 0);

    assert_eq!(queue.push(&payload(8)).unwrap(), SectorIndex::new(1));
    assert_eq!(queue.device().flash().inner.erase_count(1), 1);
    assert_eq!(queue.device().flash().inner.as_bytes()[data_sector], 8);

    queue.pop(&mut buf).unwrap();
    assert_eq!(buf[0], 8);
}

#[test]
fn test_pop_verify_failure_redelivers() {
    let mut queue = faulty_queue(FaultyFlash::new(SECTORS as usize));
    queue.initialize().unwrap();
    queue.push(&payload(3)).unwrap();

    queue.device_mut().flash_mut().stuck_address = Some(1);

    let mut buf = empty_buffer();
    let err = queue.pop(&mut buf).unwrap_err();
    assert!(matches!(err, QueueError::VerifyFailed { .. }));
    assert_eq!(buf[0], 3);

    queue.device_mut().flash_mut().stuck_address = None;
    let mut again = empty_buffer();
    queue.pop(&mut again).unwrap();
    assert_eq!(again[0], 3);
}

#[test]
fn test_failed_compaction_requires_reinitialize() {
    let mut queue = faulty_queue(FaultyFlash::new(SECTORS as usize));
    queue.initialize().unwrap();

    let mut buf = empty_buffer();
    for tag in 0..4 {
        queue.push(&payload(tag)).unwrap();
    }
    queue.pop(&mut buf).unwrap();

    queue.device_mut().flash_mut().fail_erase = true;
    let err = queue.push(&payload(9)).unwrap_err();
    assert!(matches!(err, QueueError::Device(_)));
    assert!(!queue.is_initialized());
    assert!(matches!(
        queue.pop(&mut buf),
        Err(QueueError::NotInitialized)
    ));

    // The map sector was never touched, so a reload sees the old state
    queue.device_mut().flash_mut().fail_erase = false;
    queue.initialize().unwrap();
    assert_eq!(queue.summary().read, 1);
    assert_eq!(queue.len(), 3);
}

fn corrupted_flash(byte: u8) -> RamFlash<SECTOR> {
    let mut queue = ram_queue(0, SECTORS);
    queue.initialize().unwrap();
    queue.push(&payload(1)).unwrap();

    let mut flash = into_flash(queue);
    flash.as_bytes_mut()[2] = byte;
    flash
}

#[test]
fn test_corruption_fails_initialize_by_default() {
    let config = QueueConfig::with_sector_count(0, SECTOR as u32, SECTORS).unwrap();
    let mut queue = reopen(corrupted_flash(0x12), config).with_observer(EventLog::default());

    let err = queue.initialize().unwrap_err();
    assert!(matches!(
        err,
        QueueError::CorruptedStatus { byte: 0x12, .. }
    ));
    assert!(!queue.is_initialized());
    assert_eq!(
        queue.observer().events,
        vec![Event::CorruptionDetected {
            index: 2,
            byte: 0x12
        }]
    );
}

#[test]
fn test_format_recovers_from_corruption() {
    let config = QueueConfig::with_sector_count(0, SECTOR as u32, SECTORS).unwrap();
    let mut queue = reopen(corrupted_flash(0x12), config);

    assert!(matches!(
        queue.initialize(),
        Err(QueueError::CorruptedStatus { byte: 0x12, .. })
    ));

    queue.format().unwrap();
    assert!(queue.is_initialized());
    assert_eq!(queue.summary().corrupted, 0);

    let mut buf = empty_buffer();
    assert!(queue.pop(&mut buf).unwrap_err().is_no_data());
    assert_eq!(queue.push(&payload(2)).unwrap(), SectorIndex::new(1));

    // The next open finds a clean table
    let mut queue = reopen(into_flash(queue), config);
    queue.initialize().unwrap();
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_format_needs_a_loaded_table() {
    let mut queue = faulty_queue(FaultyFlash::new(SECTORS as usize));
    assert!(matches!(queue.format(), Err(QueueError::NotInitialized)));

    // Geometry fails before the table is read
    let flash = RamFlash::<SECTOR>::new(2);
    let config = QueueConfig::with_sector_count(0, SECTOR as u32, 4).unwrap();
    let mut queue = reopen(flash, config);
    assert!(queue.initialize().is_err());
    assert!(matches!(queue.format(), Err(QueueError::NotInitialized)));
}

#[test]
fn test_corruption_reclaimed_at_compaction() {
    let config = QueueConfig::with_sector_count(0, SECTOR as u32, SECTORS)
        .unwrap()
        .with_corruption_policy(CorruptionPolicy::Reclaim);
    let mut queue = reopen(corrupted_flash(0x12), config).with_observer(EventLog::default());
    queue.initialize().unwrap();

    assert_eq!(queue.summary().corrupted, 1);
    assert_eq!(
        queue.status_of(SectorIndex::new(2)),
        Some(SectorStatus::Corrupted(0x12))
    );

    // Index 1 is unread, 2 is corrupted, 3 and 4 are empty
    assert_eq!(queue.push(&payload(3)).unwrap(), SectorIndex::new(3));
    assert_eq!(queue.push(&payload(4)).unwrap(), SectorIndex::new(4));
    assert_eq!(queue.push(&payload(5)).unwrap(), SectorIndex::new(2));
    assert_eq!(queue.observer().compactions(), vec![1]);
    assert_eq!(queue.summary().corrupted, 0);
}

#[test]
fn test_device_too_small() {
    let flash = RamFlash::<SECTOR>::new(4);
    let config = QueueConfig::with_sector_count(SECTOR as u32, SECTOR as u32, 4).unwrap();
    let mut queue = SectorQueue::<_, SECTOR>::new(NorFlashDevice::new(flash), config).unwrap();

    let err = queue.initialize().unwrap_err();
    assert!(matches!(
        err,
        QueueError::GeometryTooSmall {
            required: 1280,
            available: 1024
        }
    ));
}

#[test]
fn test_larger_device_warns_by_default() {
    let flash = RamFlash::<SECTOR>::new(16);
    let config = QueueConfig::with_sector_count(0, SECTOR as u32, 4).unwrap();
    let mut queue = SectorQueue::<_, SECTOR>::new(NorFlashDevice::new(flash), config)
        .unwrap()
        .with_observer(EventLog::default());

    queue.initialize().unwrap();

    let mismatches = queue
        .observer()
        .events
        .iter()
        .filter(|e| matches!(e, Event::GeometryMismatch { .. }))
        .count();
    assert_eq!(mismatches, 1);
    assert_eq!(queue.capacity(), 3);
}

#[test]
fn test_strict_geometry_rejects_mismatch() {
    let flash = RamFlash::<SECTOR>::new(16);
    let config = QueueConfig::with_sector_count(0, SECTOR as u32, 4)
        .unwrap()
        .with_geometry_policy(GeometryPolicy::Strict);
    let mut queue = SectorQueue::<_, SECTOR>::new(NorFlashDevice::new(flash), config).unwrap();

    let err = queue.initialize().unwrap_err();
    match err {
        QueueError::GeometryMismatch {
            configured,
            detected,
        } => {
            assert_eq!(configured.sector_count, 4);
            assert_eq!(detected.sector_count, 16);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing was written
    let flash = queue.into_inner().into_inner();
    assert!(flash.as_bytes().iter().all(|&b| b == 0xFF));
}
