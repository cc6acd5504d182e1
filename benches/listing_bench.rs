use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use drivedesk::directory::DirectoryState;
use drivedesk::filter::{apply, DateRange, FilterValue};
use drivedesk::types::{Item, ItemKind, ItemType, Page, ViewMode};

fn make_item(id: i64) -> Item {
    Item {
        id,
        name: format!("document_{}.docx", id),
        kind: ItemKind::Document { version: Some(1), doc_type: Some("docx".into()) },
        parent_id: Some(1),
        size: Some(4096),
        owner_email: "owner@example.com".into(),
        owner_name: "Owner".into(),
        created_at: Some("2024-01-01T10:00:00".into()),
        updated_at: Some("2024-01-02T10:00:00".into()),
        deleted_at: None,
        saved: false,
    }
}

/// Page `n` of `page_size` items; consecutive pages overlap by one item.
fn make_page(n: u32, page_size: u32, pages: u32) -> Page<Item> {
    let start = (n * page_size) as i64;
    let items = ((start - 1).max(0)..start + page_size as i64).map(make_item).collect();
    Page {
        page_no: n,
        page_size,
        total_page: pages,
        has_next: n + 1 < pages,
        total_items: (pages * page_size) as u64,
        items,
    }
}

fn benchmark_filter_encoding(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let selections = vec![
        FilterValue::Parent(Some(42)),
        FilterValue::ItemType(Some(ItemType::Document)),
        FilterValue::CreatedBy(Some("ada@example.com".into())),
        FilterValue::UpdatedAt(Some(DateRange::since(from))),
        FilterValue::ItemType(None),
        FilterValue::CreatedBy(Some("bob@example.com".into())),
        FilterValue::Parent(Some(7)),
        FilterValue::UpdatedAt(None),
    ];

    c.bench_function("filter_apply_sequence", |b| {
        b.iter(|| {
            let mut tokens: Vec<String> = Vec::new();
            for value in &selections {
                tokens = apply(&tokens, black_box(value), today);
            }
            black_box(tokens)
        })
    });
}

fn benchmark_page_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_more_accumulation");

    for pages in [5u32, 25, 100] {
        let fixtures: Vec<Page<Item>> = (0..pages).map(|n| make_page(n, 20, pages)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(pages), &fixtures, |b, fixtures| {
            b.iter(|| {
                let mut state = DirectoryState::new(ViewMode::MyDrive, 20);
                let first = state.set_folder(Some(1));
                state.apply_page(&first, fixtures[0].clone());
                for page in &fixtures[1..] {
                    match state.load_more() {
                        Some(ticket) => {
                            state.apply_page(&ticket, page.clone());
                        }
                        None => break,
                    }
                }
                black_box(state.items().len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_filter_encoding, benchmark_page_accumulation);
criterion_main!(benches);
