use crate::{compute_next_block_window, BlockProtocol, BlockWindow, ALIGNMENT, MAX_BLOCK_SIZE};

const KB: u64 = 1024;

fn walk(protocol: &BlockProtocol, start: u64, end: u64, size: u64) -> Vec<BlockWindow> {
    let mut windows = Vec::new();
    let mut offset = start;
    while let Some(w) = compute_next_block_window(protocol, offset, end, size) {
        windows.push(w);
        offset = w.offset + w.limit;
    }
    windows
}

#[test]
fn full_block_when_plenty_remains() {
    let p = BlockProtocol::default();
    let w = compute_next_block_window(&p, 0, 10 * MAX_BLOCK_SIZE, 10 * MAX_BLOCK_SIZE).unwrap();
    assert_eq!(
        w,
        BlockWindow {
            offset: 0,
            limit: 512 * KB
        }
    );
}

#[test]
fn offset_is_aligned_down() {
    let p = BlockProtocol::default();
    let w = compute_next_block_window(&p, 1000, 1999, 50_000).unwrap();
    assert_eq!(w.offset, 0);
    assert_eq!(w.limit, 4096);
}

#[test]
fn small_need_rounds_up_to_next_step() {
    let p = BlockProtocol::default();

    // 5000 bytes needed from an aligned offset: 8192 is the smallest step covering them.
    let w = compute_next_block_window(&p, 8192, 8192 + 4999, 1_000_000).unwrap();
    assert_eq!(w.offset, 8192);
    assert_eq!(w.limit, 8192);
}

#[test]
fn tail_of_blob_caps_the_need() {
    let p = BlockProtocol::default();
    let w = compute_next_block_window(&p, 9990, 9999, 10_000).unwrap();
    assert_eq!(w.offset, 8192);
    assert_eq!(w.limit, 4096);
}

#[test]
fn block_never_straddles_a_segment() {
    let p = BlockProtocol::default();

    // 12 KiB before the first segment boundary.
    let offset = MAX_BLOCK_SIZE - 12 * KB;
    let w = compute_next_block_window(&p, offset, 4 * MAX_BLOCK_SIZE, 4 * MAX_BLOCK_SIZE).unwrap();
    assert_eq!(w.offset, offset);
    assert_eq!(w.limit, 8 * KB);
    assert!(p.validate_read(w.offset, w.limit).is_ok());
}

#[test]
fn none_when_past_range_or_blob() {
    let p = BlockProtocol::default();
    assert_eq!(compute_next_block_window(&p, 2000, 1999, 50_000), None);
    assert_eq!(compute_next_block_window(&p, 12_288, 20_000, 12_288), None);
}

#[test]
fn every_window_is_legal_and_covers_the_range() {
    let sizes = [
        1,
        100,
        4095,
        4096,
        4097,
        10_000,
        524_288,
        524_289,
        MAX_BLOCK_SIZE - 1,
        MAX_BLOCK_SIZE,
        MAX_BLOCK_SIZE + 1,
        3 * MAX_BLOCK_SIZE + 12_345,
    ];

    for read_block_size in [4096, 65_536, 512 * KB, MAX_BLOCK_SIZE] {
        let p = BlockProtocol::new(512 * 1024, read_block_size).unwrap();

        for &size in sizes.iter() {
            let mut points = vec![0, 1, size / 3, size / 2, size - 1];
            points.extend([4095, 4096, 4097, MAX_BLOCK_SIZE - 1, MAX_BLOCK_SIZE + 1]);
            points.retain(|point| *point < size);

            for &start in points.iter() {
                for &end in points.iter().filter(|e| **e >= start) {
                    let windows = walk(&p, start, end, size);
                    assert!(!windows.is_empty(), "no window for {}-{} of {}", start, end, size);

                    let first = windows.first().unwrap();
                    assert!(first.offset <= start);
                    assert!(start - first.offset < ALIGNMENT);

                    let last = windows.last().unwrap();
                    assert!(last.offset + last.limit > end.min(size - 1));

                    let mut expected = first.offset;
                    for w in windows.iter() {
                        assert_eq!(w.offset, expected, "gap in windows for {}-{} of {}", start, end, size);
                        assert!(
                            p.validate_read(w.offset, w.limit).is_ok(),
                            "illegal window {:?} for {}-{} of {}",
                            w,
                            start,
                            end,
                            size
                        );
                        assert!(w.limit <= read_block_size.max(ALIGNMENT));
                        expected = w.offset + w.limit;
                    }
                }
            }
        }
    }
}
