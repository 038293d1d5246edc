use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use nativemem_common::error::ErrorKind;

use super::*;
use crate::AllocationOptions;

#[test]
fn test_typed_pointer_get_set() {
    let pointer = TypedPointer::<u32>::allocate(16).unwrap();
    assert_eq!(pointer.count(), 16);
    assert_eq!(pointer.size_in_bytes(), 64);
    assert_eq!(pointer.alignment(), Some(16));
    assert_eq!(pointer.address() % 16, 0);

    for i in 0..16 {
        pointer.set(i, (i * i) as u32).unwrap();
    }
    for i in 0..16 {
        assert_eq!(pointer.get(i).unwrap(), (i * i) as u32);
    }
    let err = pointer.get(16).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::IndexOutOfRange { .. }));
    assert!(pointer.dispose());
}

#[test]
fn test_typed_pointer_alignment_option() {
    let pointer =
        TypedPointer::<u8>::allocate_with(100, AllocationOptions::default().alignment(4096))
            .unwrap();
    assert_eq!(pointer.address() % 4096, 0);
    assert_eq!(pointer.alignment(), Some(4096));
    pointer.dispose();
    assert_eq!(pointer.alignment(), None);
}

#[test]
fn test_read_write_at_byte_offsets() {
    let pointer = TypedPointer::<u8>::allocate(16).unwrap();
    pointer.write::<u32>(1, 0xDEAD_BEEF).unwrap();
    assert_eq!(pointer.read::<u32>(1).unwrap(), 0xDEAD_BEEF);
    pointer.write::<u64>(8, u64::MAX).unwrap();
    assert_eq!(pointer.read::<u64>(8).unwrap(), u64::MAX);
    assert_eq!(unsafe { pointer.read_unchecked::<u64>(8) }, u64::MAX);
    unsafe { pointer.write_unchecked::<u16>(0, 7) };
    assert_eq!(pointer.read::<u16>(0).unwrap(), 7);

    let err = pointer.read::<u64>(9).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));
    let err = pointer.write::<u8>(usize::MAX, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));
    pointer.dispose();
}

#[test]
fn test_read_write_range() {
    let pointer = TypedPointer::<u8>::allocate(32).unwrap();
    let values = [1u16, 2, 3, 4];
    pointer.write_range(4, &values).unwrap();
    let mut out = [0u16; 4];
    pointer.read_range(4, &mut out).unwrap();
    assert_eq!(out, values);
    assert!(pointer.write_range(26, &values).is_err());
    assert!(pointer.read_range(30, &mut out).is_err());
    pointer.dispose();
}

#[test]
fn test_fill_and_zero() {
    let pointer = TypedPointer::<u8>::allocate(10).unwrap();
    pointer.fill(0x7F).unwrap();
    assert_eq!(pointer.to_vec().unwrap(), vec![0x7F; 10]);
    pointer.zero_range(4, 3).unwrap();
    assert_eq!(
        pointer.to_vec().unwrap(),
        vec![0x7F, 0x7F, 0x7F, 0, 0, 0, 0, 0x7F, 0x7F, 0x7F]
    );
    assert!(pointer.fill_range(1, 4, 7).is_err());
    pointer.zero().unwrap();
    assert_eq!(pointer.to_vec().unwrap(), vec![0; 10]);
    pointer.dispose();
}

#[test]
fn test_copy_from() {
    let source = TypedPointer::from_slice(&[1u8, 2, 3, 4, 5, 6]).unwrap();
    let dest = TypedPointer::<u8>::allocate(6).unwrap();
    dest.copy_from(&source, 2, 3, 1).unwrap();
    assert_eq!(dest.to_vec().unwrap(), vec![0, 3, 4, 5, 0, 0]);

    let err = dest.copy_from(&source, 4, 3, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));
    let err = dest.copy_from(&source, 0, 3, 4).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));

    // Overlapping copy within a single pointer.
    source.copy_from(&source, 0, 4, 2).unwrap();
    assert_eq!(source.to_vec().unwrap(), vec![1, 2, 1, 2, 3, 4]);

    source.dispose();
    dest.dispose();
}

#[test]
fn test_copy_memory() {
    let pointer = TypedPointer::<u8>::allocate(4).unwrap();
    let data = [9u8, 8];
    unsafe { pointer.copy_memory(data.as_ptr(), 2, 2) }.unwrap();
    assert_eq!(pointer.to_vec().unwrap(), vec![0, 0, 9, 8]);
    let err = unsafe { pointer.copy_memory(std::ptr::null(), 2, 0) }.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NullRegion { .. }));
    pointer.dispose();
}

#[test]
fn test_copy_to_writer_in_chunks() {
    let size = STREAM_CHUNK_SIZE * 2 + 17;
    let data: Vec<u8> = (0..size).map(|_| fastrand::u8(..)).collect();
    let pointer = TypedPointer::from_slice(&data).unwrap();
    let mut out = Vec::new();
    pointer.copy_to_writer(&mut out).unwrap();
    assert_eq!(out, data);
    pointer.dispose();
}

#[test]
fn test_dispose_twice() {
    let pointer = TypedPointer::<u64>::allocate(4).unwrap();
    assert!(pointer.dispose());
    assert!(!pointer.dispose());
    assert!(pointer.is_disposed());
    assert_eq!(pointer.address(), 0);
    assert_eq!(pointer.size_in_bytes(), 0);
    let err = pointer.read::<u8>(0).unwrap_err();
    assert!(err.is_disposed());
    let err = pointer.get(0).unwrap_err();
    assert!(err.is_disposed());
    assert!(pointer.fill(0).is_err());
}

#[test]
fn test_dispose_on_worker_threads_releases_once() {
    const THREADS: usize = 8;
    let winners = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let pointer = TypedPointer::<u8>::allocate(256 + i).unwrap();
            pointer.fill(i as u8).unwrap();
            let winners = Arc::clone(&winners);
            std::thread::spawn(move || {
                assert_eq!(pointer.read::<u8>(255).unwrap(), i as u8);
                for _ in 0..20 {
                    if pointer.dispose() {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                }
                assert!(pointer.is_disposed());
                assert!(pointer.read::<u8>(0).unwrap_err().is_disposed());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(winners.load(Ordering::Relaxed), THREADS);
}

#[test]
fn test_reads_stop_after_dispose_on_same_thread() {
    let pointer = TypedPointer::<u8>::allocate(1 << 20).unwrap();
    let mut chunk = vec![0u8; 4096];
    let mut reads = 0;
    while pointer.read_range(0, &mut chunk).is_ok() {
        reads += 1;
        if reads == 3 {
            assert!(pointer.dispose());
        }
    }
    assert_eq!(reads, 3);
    assert!(!pointer.dispose());
}

#[test]
fn test_alias_pointer_does_not_free() {
    let mut data = vec![0u8; 8];
    let pointer = unsafe { AliasPointer::new(data.as_mut_ptr(), data.len()) }.unwrap();
    pointer.write::<u16>(6, 0x0101).unwrap();
    assert!(pointer.dispose());
    assert_eq!(data, [0, 0, 0, 0, 0, 0, 1, 1]);

    let err = unsafe { AliasPointer::new(std::ptr::null_mut(), 4) }.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NullRegion { .. }));
    let err = unsafe { AliasPointer::new(data.as_mut_ptr(), 0) }.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::SizeTooSmall { .. }));
}

#[test]
fn test_alias_typed_pointer() {
    let mut data = [1.5f32, 2.5, 3.5];
    let pointer = unsafe { AliasTypedPointer::new(data.as_mut_ptr(), 3) }.unwrap();
    assert_eq!(pointer.size_in_bytes(), 12);
    assert_eq!(pointer.get(1).unwrap(), 2.5);
    pointer.set(2, -1.0).unwrap();
    assert_eq!(pointer.to_element_vec().unwrap(), vec![1.5, 2.5, -1.0]);
    drop(pointer);
    assert_eq!(data[2], -1.0);
}

#[test]
fn test_pinned_pointer_round_trip() {
    let data: Box<[i64]> = (0..10).collect();
    let address = data.as_ptr() as usize;
    let pointer = PinnedPointer::pin_range(data, 2, Some(5)).unwrap();
    assert_eq!(pointer.address(), address + 2 * 8);
    assert_eq!(pointer.count(), 5);
    assert_eq!(pointer.get(0).unwrap(), 2);
    pointer.set(4, 600).unwrap();
    assert!(pointer.get(5).is_err());

    let data = pointer.into_data().unwrap();
    assert_eq!(data.as_ptr() as usize, address);
    assert_eq!(data[6], 600);
}

#[test]
fn test_pinned_pointer_after_dispose() {
    let pointer = PinnedPointer::pin(vec![1u8, 2, 3]).unwrap();
    assert!(pointer.dispose());
    assert!(pointer.into_data().is_none());

    let err = PinnedPointer::pin_range(vec![1u8, 2, 3], 2, Some(2)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));
}

#[test]
fn test_pinned_value() {
    let pointer = PinnedPointer::pin_value(Box::new(0x0102_0304_0506_0708u64)).unwrap();
    assert_eq!(pointer.size_in_bytes(), 8);
    assert_eq!(pointer.read::<u8>(0).unwrap(), 0x0102_0304_0506_0708u64.to_ne_bytes()[0]);
    pointer.set(0, 42).unwrap();
    assert_eq!(*pointer.into_value().unwrap(), 42);
}

#[test]
fn test_pointers_are_send() {
    fn assert_send<T: Send>() {}
    assert_send::<PointerBase>();
    assert_send::<TypedPointer<u32>>();
    assert_send::<PinnedPointer<u8>>();
    assert_send::<AliasPointer>();

    let pointer = TypedPointer::<u32>::from_slice(&[7, 8, 9]).unwrap();
    let pointer = std::thread::spawn(move || {
        pointer.set(1, 80).unwrap();
        pointer
    })
    .join()
    .unwrap();
    assert_eq!(pointer.to_element_vec().unwrap(), vec![7, 80, 9]);
    assert!(pointer.dispose());
}
