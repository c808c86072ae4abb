//! Benchmark encode/decode of a representative message schema.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use protoflex::schema::{self, message, repeated};
use protoflex::value::{MessageValue, Value};
use protoflex::MessageCodec;

fn person_codec() -> MessageCodec {
    let phone = message([
        ("number", schema::string(1)),
        ("phone_type", schema::int32(2)),
    ])
    .unwrap();
    message([
        ("name", schema::string(1)),
        ("id", schema::int32(2)),
        ("email", schema::string(3)),
        ("phones", repeated::submessage(4, phone)),
        ("scores", repeated::int32(5)),
    ])
    .unwrap()
}

fn person_value() -> Value {
    let phone = |number: &str, kind: i32| {
        Value::Message(
            MessageValue::new()
                .with("number", number)
                .with("phone_type", kind),
        )
    };
    MessageValue::new()
        .with("name", "Alice Example")
        .with("id", 1234)
        .with("email", "alice@example.com")
        .with(
            "phones",
            Value::List(vec![phone("555-1234", 1), phone("555-5678", 2)]),
        )
        .with("scores", Value::list([3, 141, 59, 26, 535]))
        .into()
}

fn bench_codec(c: &mut Criterion) {
    let codec = person_codec();
    let value = person_value();
    let wire = codec.encode(&value).unwrap();
    let payload_len = u64::try_from(wire.written_len()).unwrap();

    let mut group = c.benchmark_group("person");
    group.throughput(Throughput::Bytes(payload_len));

    group.bench_function("encode", |b| {
        b.iter(|| black_box(codec.encode(black_box(&value)).unwrap()))
    });

    group.bench_function("encoded_len", |b| {
        b.iter(|| black_box(codec.encoded_message_len(black_box(&value)).unwrap()))
    });

    group.bench_function("decode", |b| {
        b.iter(|| black_box(codec.decode(black_box(wire.written_bytes())).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
