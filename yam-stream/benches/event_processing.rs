extern crate yam_stream;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use yam_stream::{parse, CollectionStyle, Handler, Input, Mark, ScalarStyle};

const IN1: &str = r#"
[{:}]
"#;

const RECORD: &str = r#"
- name: Mark McGwire
  hr: 65
  avg: 0.278
  teams: [St Louis Cardinals, Oakland Athletics]
  note: |
    Hit 70 home runs
    in 1998.
- name: "Sammy Sosa"
  hr: 63
  avg: 0.288
  teams: {first: Texas Rangers, last: Chicago Cubs}
"#;

/// Counts events so the dispatch cannot be optimized away.
#[derive(Default)]
struct Counter {
    events: usize,
    furthest: usize,
}

impl Handler for Counter {
    fn event_location(&mut self, _start: Mark, end: Mark) {
        self.events += 1;
        self.furthest = self.furthest.max(end.index);
    }

    fn scalar(
        &mut self,
        value: &str,
        _anchor: Option<&str>,
        _tag: Option<&str>,
        _plain_implicit: bool,
        _quoted_implicit: bool,
        _style: ScalarStyle,
    ) {
        self.events += usize::from(value.is_empty());
    }

    fn start_mapping(
        &mut self,
        _anchor: Option<&str>,
        _tag: Option<&str>,
        _implicit: bool,
        _style: CollectionStyle,
    ) {
        self.events += 1;
    }
}

fn count(input: Input<'_>) -> usize {
    let mut counter = Counter::default();
    let _ = parse(&mut counter, input, None);
    counter.events + counter.furthest
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("bench-yaml");
    group.significance_level(0.1).sample_size(50);
    group.bench_function("bench_yaml", |b| {
        b.iter(|| count(Input::str(black_box(IN1))))
    });

    let document = RECORD.repeat(200);
    group.throughput(Throughput::Bytes(document.len() as u64));
    group.bench_function("str_input", |b| {
        b.iter(|| count(Input::str(black_box(&document))))
    });
    group.bench_function("byte_input", |b| {
        b.iter(|| count(Input::bytes(black_box(document.as_bytes()))))
    });
    let utf16: Vec<u8> = document
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    group.bench_function("utf16_input", |b| {
        b.iter(|| count(Input::bytes(black_box(&utf16)).with_encoding("utf-16le")))
    });
    group.bench_function("reader_input", |b| {
        b.iter(|| count(Input::reader(black_box(document.as_bytes()))))
    });
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
