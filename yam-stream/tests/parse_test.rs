mod common;

use common::{
    assert_eq_events, assert_eq_events_with, assert_well_formed, double_quoted, record, Call,
    Recorder,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use yam_stream::{
    parse, CollectionStyle, EncodingKind, Mark, ParseOptions, Parser, ScalarStyle,
};

const BLOCK_SEQ_INPUT: &str = "- 1\n- 2\n";
const BLOCK_SEQ_EVENTS: &str = r"
+STR
+SEQ
=VAL :1
=VAL :2
-SEQ
-STR";

const ANCHOR_INPUT: &str = "- &a foo\n- *a\n";
const ANCHOR_EVENTS: &str = r"
+STR
+SEQ
=VAL &a :foo
=ALI *a
-SEQ
-STR";

const EXPLICIT_DOC_INPUT: &str = "--- a\n...\n";
const EXPLICIT_DOC_EVENTS: &str = r"
+STR
+DOC ---
=VAL :a
-DOC ...
-STR";

const MULTI_DOC_INPUT: &str = r"
key: value
--- [x, {y: z}]
";
const MULTI_DOC_EVENTS: &str = r"
+STR
+MAP
=VAL :key
=VAL :value
-MAP
+DOC ---
+SEQ []
=VAL :x
+MAP {}
=VAL :y
=VAL :z
-MAP
-SEQ
-DOC
-STR";

const STYLES_INPUT: &str = r#"
- plain
- 'single'
- "double"
- |
  literal
- >
  folded
"#;
const STYLES_EVENTS: &str = r#"
+STR
+SEQ
=VAL :plain
=VAL 'single
=VAL "double
=VAL |literal\n
=VAL >folded\n
-SEQ
-STR"#;

const NESTED_INPUT: &str = r"
a:
  - b
  - c: d
e: &m {f: g}
";
const NESTED_EVENTS: &str = r"
+STR
+MAP
=VAL :a
+SEQ
=VAL :b
+MAP
=VAL :c
=VAL :d
-MAP
-SEQ
=VAL :e
+MAP {} &m
=VAL :f
=VAL :g
-MAP
-MAP
-STR";

const FLOW_ERR_INPUT: &str = "{a: 1";
const FLOW_ERR_EVENTS: &str = r"
+STR
+MAP {}
=VAL :a
=VAL :1
ERR";

#[test]
fn block_sequence() {
    assert_eq_events(BLOCK_SEQ_INPUT, BLOCK_SEQ_EVENTS);
}

#[test]
fn block_sequence_calls() {
    let mut recorder = Recorder::default();
    parse(&mut recorder, BLOCK_SEQ_INPUT, None).unwrap();
    let scalar = |value: &str| Call::Scalar {
        value: value.to_string(),
        anchor: None,
        tag: None,
        plain_implicit: true,
        quoted_implicit: false,
        style: ScalarStyle::Plain,
    };
    assert_eq!(
        recorder.calls,
        vec![
            Call::StartStream(EncodingKind::Any),
            Call::StartSequence {
                anchor: None,
                tag: None,
                implicit: true,
                style: CollectionStyle::Block,
            },
            scalar("1"),
            scalar("2"),
            Call::EndSequence,
            Call::EndStream,
        ]
    );
}

#[test]
fn anchor_and_alias() {
    assert_eq_events(ANCHOR_INPUT, ANCHOR_EVENTS);
    let mut recorder = Recorder::default();
    parse(&mut recorder, ANCHOR_INPUT, None).unwrap();
    assert_eq!(
        recorder.calls[2],
        Call::Scalar {
            value: "foo".to_string(),
            anchor: Some("a".to_string()),
            tag: None,
            plain_implicit: true,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        }
    );
    assert_eq!(recorder.calls[3], Call::Alias("a".to_string()));
}

#[test]
fn documents() {
    assert_eq_events(EXPLICIT_DOC_INPUT, EXPLICIT_DOC_EVENTS);
    assert_eq_events(MULTI_DOC_INPUT, MULTI_DOC_EVENTS);
}

#[test]
fn implicit_documents_option() {
    let options = ParseOptions {
        implicit_documents: true,
    };
    assert_eq_events_with(
        BLOCK_SEQ_INPUT,
        options,
        r"
+STR
+DOC
+SEQ
=VAL :1
=VAL :2
-SEQ
-DOC
-STR",
    );
    let (recorder, result) = record("a", options);
    result.unwrap();
    assert_eq!(
        recorder.calls[1],
        Call::StartDocument {
            version: None,
            tags: Vec::new(),
            implicit: true,
        }
    );
    assert_eq!(recorder.calls[3], Call::EndDocument(true));
}

#[test]
fn directives_reach_start_document() {
    let input = "%YAML 1.1\n%TAG !e! tag:example.com,2000:\n%TAG !f! tag:f.org:\n--- !e!foo bar\n";
    let mut recorder = Recorder::default();
    parse(&mut recorder, input, None).unwrap();
    assert_eq!(
        recorder.calls[1],
        Call::StartDocument {
            version: Some((1, 1)),
            tags: vec![
                ("!e!".to_string(), "tag:example.com,2000:".to_string()),
                ("!f!".to_string(), "tag:f.org:".to_string()),
            ],
            implicit: false,
        }
    );
    assert_eq!(
        recorder.calls[2],
        Call::Scalar {
            value: "bar".to_string(),
            anchor: None,
            tag: Some("tag:example.com,2000:foo".to_string()),
            plain_implicit: false,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        }
    );
    assert_eq!(recorder.calls[3], Call::EndDocument(true));
}

#[test]
fn scalar_styles() {
    assert_eq_events(STYLES_INPUT, STYLES_EVENTS);
    let mut recorder = Recorder::default();
    parse(&mut recorder, STYLES_INPUT, None).unwrap();
    let flags: Vec<(bool, bool)> = recorder
        .calls
        .iter()
        .filter_map(|call| match call {
            Call::Scalar {
                plain_implicit,
                quoted_implicit,
                ..
            } => Some((*plain_implicit, *quoted_implicit)),
            _ => None,
        })
        .collect();
    assert_eq!(
        flags,
        vec![
            (true, false),
            (false, true),
            (false, true),
            (false, true),
            (false, true)
        ]
    );
}

#[test]
fn nested_collections() {
    assert_eq_events(NESTED_INPUT, NESTED_EVENTS);
}

#[test]
fn tagged_collection_is_explicit() {
    let mut recorder = Recorder::default();
    parse(&mut recorder, "!!map {a: !!seq [b]}", None).unwrap();
    assert_eq!(
        recorder.calls[1],
        Call::StartMapping {
            anchor: None,
            tag: Some("tag:yaml.org,2002:map".to_string()),
            implicit: false,
            style: CollectionStyle::Flow,
        }
    );
    assert_eq!(
        recorder.calls[3],
        Call::StartSequence {
            anchor: None,
            tag: Some("tag:yaml.org,2002:seq".to_string()),
            implicit: false,
            style: CollectionStyle::Flow,
        }
    );
}

#[test]
fn unterminated_flow_mapping() {
    assert_eq_events(FLOW_ERR_INPUT, FLOW_ERR_EVENTS);
    let mut recorder = Recorder::default();
    let error = parse(&mut recorder, FLOW_ERR_INPUT, Some("flow.yaml")).unwrap_err();
    let failure = error.failure().unwrap();
    assert!(failure.line >= 1);
    assert!(failure.column >= 1);
    assert!(failure.problem.is_some());
    assert_eq!(failure.path.as_deref(), Some("flow.yaml"));
    assert!(error.to_string().starts_with("(flow.yaml): "));
}

#[test]
fn locations() {
    let mut recorder = Recorder::default();
    parse(&mut recorder, "a: bc\n", None).unwrap();
    // +STR +MAP =VAL a =VAL bc -MAP -STR
    assert_eq!(recorder.locations[2], (Mark::new(0, 0, 0), Mark::new(0, 1, 1)));
    assert_eq!(recorder.locations[3], (Mark::new(0, 3, 3), Mark::new(0, 5, 5)));
    assert_eq!(recorder.unlocated, 0);
}

#[rstest]
#[case::block_sequence(BLOCK_SEQ_INPUT)]
#[case::anchors(ANCHOR_INPUT)]
#[case::documents(MULTI_DOC_INPUT)]
#[case::styles(STYLES_INPUT)]
#[case::nested(NESTED_INPUT)]
#[case::explicit_keys("? a\n: b\n? [c]\n: {d: e}\n")]
#[case::empty("")]
#[case::comments_only("# nothing here\n")]
fn well_formed(#[case] input: &str) {
    let mut recorder = Recorder::default();
    parse(&mut recorder, input, None).unwrap();
    assert_well_formed(&recorder);
}

#[rstest]
#[case::empty("")]
#[case::spaces("  leading and trailing  ")]
#[case::quotes("it's \"quoted\"")]
#[case::backslash("C:\\path\\to")]
#[case::control("bell\x07 escape\x1b nul\0 del\x7f")]
#[case::lines("one\ntwo\r\nthree\u{2028}four")]
#[case::indicators("- ? : , [ ] { } # & * ! | > % @ `")]
#[case::unicode("naïve café ✓ 😀")]
#[case::special_spaces("\u{85}\u{A0}\u{2029}\u{FFFE}")]
fn scalar_round_trip(#[case] value: &str) {
    let serialized = double_quoted(value);
    let mut recorder = Recorder::default();
    parse(&mut recorder, serialized.as_str(), None).unwrap();
    assert_eq!(recorder.scalars(), vec![value]);
}

#[test]
fn empty_stream() {
    assert_eq_events("", "\n+STR\n-STR");
}

#[test]
fn parser_is_reusable() {
    let parser = Parser::new();
    for input in ["a", "[b]", "{c: d}"] {
        let mut recorder = Recorder::default();
        parser.parse(&mut recorder, input, None).unwrap();
        assert_well_formed(&recorder);
    }
}
