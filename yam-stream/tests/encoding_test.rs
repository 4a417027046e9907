mod common;

use std::io::{self, Cursor, Read};

use common::{assert_well_formed, Call, Recorder};
use pretty_assertions::assert_eq;
use rstest::rstest;
use yam_stream::{parse, EncodingKind, Input, ParseError};

const TEXT: &str = "name: Zoë\nlist: [€, 😀]\n";

fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn utf16be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

fn with_bom(bom: &[u8], body: Vec<u8>) -> Vec<u8> {
    let mut out = bom.to_vec();
    out.extend(body);
    out
}

fn stream_encoding(recorder: &Recorder) -> Option<EncodingKind> {
    match recorder.calls.first() {
        Some(Call::StartStream(kind)) => Some(*kind),
        _ => None,
    }
}

#[rstest]
#[case::utf8("utf-8", TEXT.as_bytes().to_vec(), EncodingKind::Utf8)]
#[case::utf8_bom("utf-8", with_bom(&[0xEF, 0xBB, 0xBF], TEXT.as_bytes().to_vec()), EncodingKind::Utf8)]
#[case::utf16le("utf-16le", utf16le(TEXT), EncodingKind::Utf16Le)]
#[case::utf16le_bom("utf-16le", with_bom(&[0xFF, 0xFE], utf16le(TEXT)), EncodingKind::Utf16Le)]
#[case::utf16be("utf-16be", utf16be(TEXT), EncodingKind::Utf16Be)]
#[case::utf16be_bom("UTF-16BE", with_bom(&[0xFE, 0xFF], utf16be(TEXT)), EncodingKind::Utf16Be)]
fn declared_unicode(#[case] label: &str, #[case] bytes: Vec<u8>, #[case] kind: EncodingKind) {
    let mut recorder = Recorder::default();
    parse(&mut recorder, Input::bytes(&bytes).with_encoding(label), None).unwrap();
    assert_eq!(stream_encoding(&recorder), Some(kind));
    assert_eq!(recorder.scalars(), vec!["name", "Zoë", "list", "€", "😀"]);
    assert_well_formed(&recorder);
}

#[rstest]
#[case::none(TEXT.as_bytes().to_vec())]
#[case::utf8_bom(with_bom(&[0xEF, 0xBB, 0xBF], TEXT.as_bytes().to_vec()))]
#[case::utf16le_bom(with_bom(&[0xFF, 0xFE], utf16le(TEXT)))]
#[case::utf16be_bom(with_bom(&[0xFE, 0xFF], utf16be(TEXT)))]
fn sniffed(#[case] bytes: Vec<u8>) {
    let mut recorder = Recorder::default();
    parse(&mut recorder, bytes.as_slice(), None).unwrap();
    assert_eq!(stream_encoding(&recorder), Some(EncodingKind::Any));
    assert_eq!(recorder.scalars(), vec!["name", "Zoë", "list", "€", "😀"]);
}

#[test]
fn str_input_reports_any() {
    let mut recorder = Recorder::default();
    parse(&mut recorder, "\u{FEFF}a", None).unwrap();
    assert_eq!(stream_encoding(&recorder), Some(EncodingKind::Any));
    assert_eq!(recorder.scalars(), vec!["a"]);
}

#[test]
fn legacy_transcoded() {
    let mut recorder = Recorder::default();
    let bytes = b"caf\xE9: \x80 \xBD\n";
    parse(
        &mut recorder,
        Input::bytes(bytes).with_encoding("windows-1252"),
        None,
    )
    .unwrap();
    assert_eq!(stream_encoding(&recorder), Some(EncodingKind::Utf8));
    assert_eq!(recorder.scalars(), vec!["café", "€ ½"]);
}

#[test]
fn shift_jis_transcoded() {
    let mut recorder = Recorder::default();
    // "日本: 語" in Shift_JIS
    let bytes = b"\x93\xFA\x96\x7B: \x8C\xEA";
    parse(&mut recorder, Input::bytes(bytes).with_encoding("shift_jis"), None).unwrap();
    assert_eq!(stream_encoding(&recorder), Some(EncodingKind::Utf8));
    assert_eq!(recorder.scalars(), vec!["日本", "語"]);
}

#[test]
fn unknown_label() {
    let mut recorder = Recorder::default();
    let error = parse(
        &mut recorder,
        Input::bytes(b"a").with_encoding("klingon"),
        None,
    )
    .unwrap_err();
    assert!(matches!(error, ParseError::Encoding(_)));
    assert!(error.to_string().contains("klingon"));
    assert!(recorder.calls.is_empty());
}

#[rstest]
#[case::truncated_sequence(&b"a: b\n\xE2\x82"[..], 5)]
#[case::invalid_lead(&b"- x\n- \xFF\n"[..], 6)]
#[case::after_bom(&b"\xEF\xBB\xBFok: \xC0\xAF"[..], 7)]
fn malformed_utf8(#[case] bytes: &[u8], #[case] offset: usize) {
    let mut recorder = Recorder::default();
    let error = parse(&mut recorder, bytes, Some("bad.yaml")).unwrap_err();
    let failure = error.failure().unwrap();
    assert_eq!((failure.line, failure.column), (-1, -1));
    assert_eq!(failure.offset, offset);
    assert_eq!(failure.problem, None);
    assert_eq!(failure.context, None);
    assert_eq!(failure.path.as_deref(), Some("bad.yaml"));
    assert!(matches!(recorder.calls.first(), Some(Call::StartStream(_))));
    assert!(!recorder.calls.contains(&Call::EndStream));
}

#[test]
fn malformed_utf16() {
    let mut bytes = utf16le("ab");
    // Unpaired lead surrogate.
    bytes.extend([0x00, 0xD8, 0x63, 0x00]);
    let mut recorder = Recorder::default();
    let error = parse(
        &mut recorder,
        Input::bytes(&bytes).with_encoding("utf-16le"),
        None,
    )
    .unwrap_err();
    let failure = error.failure().unwrap();
    assert_eq!((failure.line, failure.column), (-1, -1));
    assert!(failure.offset >= 4);
}

/// Hands out its data a few bytes at a time, then fails if asked to.
struct Trickle {
    data: Cursor<Vec<u8>>,
    step: usize,
    fail_at_end: bool,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.step);
        let read = self.data.read(&mut buf[..len])?;
        if read == 0 && self.fail_at_end {
            return Err(io::Error::new(io::ErrorKind::Other, "connection reset"));
        }
        Ok(read)
    }
}

#[test]
fn reader_in_small_pieces() {
    let reader = Trickle {
        data: Cursor::new(utf16be(TEXT)),
        step: 3,
        fail_at_end: false,
    };
    let mut recorder = Recorder::default();
    parse(
        &mut recorder,
        Input::reader(reader).with_encoding("utf-16be"),
        None,
    )
    .unwrap();
    assert_eq!(stream_encoding(&recorder), Some(EncodingKind::Utf16Be));
    assert_eq!(recorder.scalars(), vec!["name", "Zoë", "list", "€", "😀"]);
    assert_well_formed(&recorder);
}

#[test]
fn reader_without_hint_sniffs_bom() {
    let reader = Cursor::new(with_bom(&[0xEF, 0xBB, 0xBF], b"- a\n".to_vec()));
    let mut recorder = Recorder::default();
    parse(&mut recorder, Input::reader(reader), None).unwrap();
    assert_eq!(stream_encoding(&recorder), Some(EncodingKind::Any));
    assert_eq!(recorder.scalars(), vec!["a"]);
}

#[test]
fn reader_with_legacy_hint_reads_utf8() {
    let reader = Cursor::new("k: ü\n".as_bytes().to_vec());
    let mut recorder = Recorder::default();
    parse(
        &mut recorder,
        Input::reader(reader).with_encoding("iso-8859-1"),
        None,
    )
    .unwrap();
    assert_eq!(stream_encoding(&recorder), Some(EncodingKind::Utf8));
    assert_eq!(recorder.scalars(), vec!["k", "ü"]);
}

#[test]
fn reader_io_failure() {
    let reader = Trickle {
        data: Cursor::new(b"- a\n- b\n".to_vec()),
        step: 64,
        fail_at_end: true,
    };
    let mut recorder = Recorder::default();
    let error = parse(&mut recorder, Input::reader(reader).with_path("net.yaml"), None)
        .unwrap_err();
    let failure = error.failure().unwrap();
    assert_eq!((failure.line, failure.column), (0, 0));
    assert_eq!(failure.offset, 8);
    assert_eq!(failure.problem.as_deref(), Some("io_error"));
    assert!(failure.context.as_deref().unwrap().contains("connection reset"));
    assert_eq!(failure.path.as_deref(), Some("net.yaml"));
}

#[test]
fn reader_malformed() {
    let reader = Cursor::new(b"k: v\n\xF0\x28".to_vec());
    let mut recorder = Recorder::default();
    let error = parse(&mut recorder, Input::reader(reader), None).unwrap_err();
    let failure = error.failure().unwrap();
    assert_eq!((failure.line, failure.column, failure.offset), (-1, -1, 5));
}

#[test]
fn non_printable() {
    let mut recorder = Recorder::default();
    let error = parse(&mut recorder, "key: va\u{1}lue", None).unwrap_err();
    let failure = error.failure().unwrap();
    assert_eq!((failure.line, failure.column, failure.offset), (0, 0, 7));
    assert_eq!(failure.problem.as_deref(), Some("unacceptable_code_point"));
    assert!(failure.context.is_some());
}

#[test]
fn opened_file_names_failures() {
    let path = std::env::temp_dir().join(format!("yam-stream-open-{}.yaml", std::process::id()));
    std::fs::write(&path, "a: [1, 2\n").unwrap();
    let input = Input::open(&path).unwrap();
    assert_eq!(input.path(), Some(path.display().to_string().as_str()));

    let mut recorder = Recorder::default();
    let error = parse(&mut recorder, input, None).unwrap_err();
    std::fs::remove_file(&path).unwrap();

    let failure = error.failure().unwrap();
    assert_eq!(failure.path, Some(path.display().to_string()));
    assert!(failure.line >= 1);
}
