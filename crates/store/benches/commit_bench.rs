use criterion::{Criterion, criterion_group, criterion_main};
use domain::{NoteType, RelationshipType};
use store::{CreateBook, CreateNote, CreateRelationship, Store};

fn bench_create_note(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, book) = rt.block_on(async {
        let store = Store::in_memory().await.unwrap();
        let book = store.create_book(CreateBook::new("Dune")).await.unwrap();
        (store, book)
    });

    c.bench_function("store/create_note", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .create_note(CreateNote::new(book, NoteType::Character, "Paul", 1))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_delete_book_cascade(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/delete_book_50_notes", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = Store::in_memory().await.unwrap();
                let book = store.create_book(CreateBook::new("Dune")).await.unwrap();
                let mut previous = None;
                for n in 0..50u32 {
                    let note = store
                        .create_note(CreateNote::new(book, NoteType::Character, "Fremen", n + 1))
                        .await
                        .unwrap();
                    if let Some(prev) = previous {
                        store
                            .create_relationship(CreateRelationship::new(
                                prev,
                                note,
                                RelationshipType::Ally,
                                n + 1,
                            ))
                            .await
                            .unwrap();
                    }
                    previous = Some(note);
                }

                let report = store.delete_book(book).await.unwrap();
                assert_eq!(report.deleted.len(), 100);
            });
        });
    });
}

fn bench_book_view(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, book) = rt.block_on(async {
        let store = Store::in_memory().await.unwrap();
        let book = store.create_book(CreateBook::new("Dune")).await.unwrap();
        for n in 0..200u32 {
            store
                .create_note(CreateNote::new(book, NoteType::Character, "Fremen", n + 1))
                .await
                .unwrap();
        }
        (store, book)
    });

    c.bench_function("store/book_view_200_notes", |b| {
        b.iter(|| {
            rt.block_on(async {
                let view = store.book_view(book, Some(100)).await.unwrap();
                assert_eq!(view.notes.len(), 100);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_note,
    bench_delete_book_cascade,
    bench_book_view
);
criterion_main!(benches);
