use criterion::{Criterion, criterion_group, criterion_main};
use domain::{LibraryEvent, SchemaRegistry};
use serde_json::json;

fn note_payload() -> serde_json::Value {
    json!({
        "id": "6c5f1a3e-3c1b-4d0e-9a57-1f7c1c0b9f11",
        "bookId": "0d3a4d9e-2c4b-4a8b-8f0e-8e6c2f9a7b12",
        "type": "character",
        "title": "Duncan Idaho",
        "content": "Swordmaster of the Ginaz",
        "pageNumber": 57,
        "metadata": { "house": "Atreides" },
        "createdAt": 1_700_000_000_000i64,
        "updatedAt": 1_700_000_000_000i64
    })
}

fn bench_validate(c: &mut Criterion) {
    let registry = SchemaRegistry::v1();
    let payload = note_payload();

    c.bench_function("domain/validate_note_created", |b| {
        b.iter(|| registry.validate("v1.NoteCreated", &payload).unwrap());
    });
}

fn bench_decode(c: &mut Criterion) {
    let payload = note_payload();

    c.bench_function("domain/decode_note_created", |b| {
        b.iter(|| LibraryEvent::from_parts("v1.NoteCreated", payload.clone()).unwrap());
    });
}

criterion_group!(benches, bench_validate, bench_decode);
criterion_main!(benches);
