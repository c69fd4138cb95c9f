// tests/output_decoding.rs

use scriptd::exec::output::Utf8ChunkDecoder;

#[test]
fn multibyte_char_split_across_chunks_is_reassembled() {
    let bytes = "已经运行".as_bytes();
    let mut decoder = Utf8ChunkDecoder::new();

    // Cut in the middle of the second character.
    let first = decoder.decode(&bytes[..4]);
    let second = decoder.decode(&bytes[4..]);

    assert_eq!(first, "已");
    assert_eq!(format!("{first}{second}"), "已经运行");
    assert_eq!(decoder.finish(), "");
}

#[test]
fn invalid_bytes_are_replaced_not_rejected() {
    let mut decoder = Utf8ChunkDecoder::new();
    let text = decoder.decode(b"ok\xffstill ok\n");
    assert_eq!(text, "ok\u{FFFD}still ok\n");
}

#[test]
fn truncated_tail_is_flushed_on_finish() {
    let mut decoder = Utf8ChunkDecoder::new();
    let text = decoder.decode(b"abc\xe5\xb7");
    assert_eq!(text, "abc");
    assert_eq!(decoder.finish(), "\u{FFFD}");
}

#[test]
fn carriage_returns_pass_through_untouched() {
    let mut decoder = Utf8ChunkDecoder::new();
    assert_eq!(decoder.decode(b"\rB  \n"), "\rB  \n");
}
