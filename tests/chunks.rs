mod common;

use common::{e01_encase6, new_writer, options};
use ewf_writer::{ChunkSource, MediaValues};

use anyhow::Result;
use itertools::Itertools;

// S1 — exactly one full segment: ten chunks, one segment, one chunks section, `amount_of_chunks`
// and `write_count` land exactly where the spec predicts.
#[test]
fn s1_exactly_one_full_segment() {
    let mut w = new_writer(
        e01_encase6(MediaValues {
            chunk_size: 32_768,
            amount_of_chunks: 10,
            media_size: 327_680,
        })
        .segment_file_size(10 * 1024 * 1024),
    );

    for i in 0..10u32 {
        let data = vec![i as u8; 32_768];
        w.write_new_chunk(i, &data, ChunkSource::Borrowed).unwrap();
    }
    w.finalize().unwrap();

    assert_eq!(w.state().amount_of_chunks, 10);
    assert_eq!(w.state().chunks_section_number, 1);
    assert!(w.state().write_finalized);
    for i in 0..10u32 {
        assert!(w.offsets().is_set(i));
    }
}

// S2 — a small segment_file_size forces the image to span multiple segment files.
#[test]
fn s2_span_multiple_segments_by_size() {
    let mut w = new_writer(
        options(MediaValues {
            chunk_size: 32_768,
            amount_of_chunks: 0,
            media_size: 0,
        })
        .segment_file_size(100_000),
    );

    for i in 0..5u32 {
        let data = vec![i as u8; 32_768];
        w.write_new_chunk(i, &data, ChunkSource::Borrowed).unwrap();
    }
    w.finalize().unwrap();

    assert!(w.segments_mut().primary_count() >= 2);
    assert_eq!(w.state().amount_of_chunks, 5);
}

// S3 — a tiny chunks-section cap forces several chunks sections within one oversized segment:
// sizes 3, 3, 3, 1 for ten chunks with `maximum_section_amount_of_chunks = 3`.
#[test]
fn s3_section_cap_enforced() {
    let mut w = new_writer(
        options(MediaValues {
            chunk_size: 1024,
            amount_of_chunks: 10,
            media_size: 10 * 1024,
        })
        .maximum_section_amount_of_chunks(3)
        .segment_file_size(10 * 1024 * 1024),
    );

    for i in 0..10u32 {
        let data = vec![i as u8; 1024];
        w.write_new_chunk(i, &data, ChunkSource::Borrowed).unwrap();
    }
    w.finalize().unwrap();

    assert_eq!(w.state().chunks_section_number, 4);
    for i in 0..10u32 {
        assert!(w.offsets().is_set(i));
    }
}

// S4 — same as S3 but unrestricted: everything fits in one chunks section.
#[test]
fn s4_unrestricted_offsets_single_section() {
    let mut w = new_writer(
        options(MediaValues {
            chunk_size: 1024,
            amount_of_chunks: 10,
            media_size: 10 * 1024,
        })
        .maximum_section_amount_of_chunks(3)
        .unrestrict_offset_amount(true)
        .segment_file_size(10 * 1024 * 1024),
    );

    for i in 0..10u32 {
        let data = vec![i as u8; 1024];
        w.write_new_chunk(i, &data, ChunkSource::Borrowed).unwrap();
    }
    w.finalize().unwrap();

    assert_eq!(w.state().chunks_section_number, 1);
}

// Chunk-count conservation (universal property #1): writing N chunks leaves exactly N set
// offsets and `amount_of_chunks == N`, regardless of how many sections/segments it took.
#[test]
fn chunk_count_is_conserved_across_sections_and_segments() {
    let mut w = new_writer(
        options(MediaValues {
            chunk_size: 512,
            amount_of_chunks: 37,
            media_size: 37 * 512,
        })
        .maximum_section_amount_of_chunks(4)
        .segment_file_size(8192),
    );

    for i in 0..37u32 {
        let data = vec![(i % 251) as u8; 512];
        w.write_new_chunk(i, &data, ChunkSource::Borrowed).unwrap();
    }
    w.finalize().unwrap();

    assert_eq!(w.state().amount_of_chunks, 37);
    for i in 0..37u32 {
        assert!(w.offsets().is_set(i));
    }
}

// Writing past the declared media size is a documented no-op, not an error.
#[test]
fn writing_past_declared_media_size_is_a_no_op() {
    let mut w = new_writer(options(MediaValues {
        chunk_size: 1024,
        amount_of_chunks: 1,
        media_size: 1024,
    }));

    let data = vec![1u8; 1024];
    assert_eq!(w.write_new_chunk(0, &data, ChunkSource::Borrowed).unwrap(), 1024);
    assert_eq!(w.write_new_chunk(1, &data, ChunkSource::Borrowed).unwrap(), 0);
    assert!(!w.offsets().is_set(1));
}

/// Checks that chunk indices recorded across a multi-segment, multi-section image form one
/// contiguous run with no gaps or repeats, however many sections/segments it took to write them.
#[test]
fn chunk_indices_form_one_contiguous_run() -> Result<()> {
    let mut w = new_writer(
        options(MediaValues {
            chunk_size: 512,
            amount_of_chunks: 21,
            media_size: 21 * 512,
        })
        .maximum_section_amount_of_chunks(4)
        .segment_file_size(6144),
    );

    for i in 0..21u32 {
        let data = vec![(i % 200) as u8; 512];
        w.write_new_chunk(i, &data, ChunkSource::Borrowed)?;
    }
    w.finalize()?;

    let written: Vec<u32> = (0..21u32).filter(|i| w.offsets().is_set(*i)).collect();
    assert!(
        written.into_iter().tuple_windows().all(|(a, b)| b == a + 1),
        "chunk indices must be contiguous with no gaps"
    );
    Ok(())
}
