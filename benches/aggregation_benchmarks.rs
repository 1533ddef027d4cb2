use std::time::Duration;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use news_station::aggregator::merge_and_paginate;
use news_station::feed::{Article, Source};
use news_station::storage::{ArticleCache, FeedCache, FeedKey};

fn make_batches(sources: usize, per_source: usize) -> Vec<Vec<Article>> {
    let base = Utc.with_ymd_and_hms(2024, 3, 16, 12, 0, 0).unwrap();

    (0..sources)
        .map(|s| {
            let source = Source::new(format!("source{}", s), "Bench", "https://example.com", "technology");
            (0..per_source)
                .map(|i| {
                    // Interleave sources so the sort has real work to do.
                    let minutes = (i * sources + s) as i64;
                    Article::new(
                        &source,
                        format!("Article {} from {}", i, s),
                        format!("https://example.com/{}/{}", s, i),
                        base - chrono::Duration::minutes(minutes),
                    )
                })
                .collect()
        })
        .collect()
}

fn bench_merge_and_paginate(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_and_paginate");

    for (sources, per_source) in [(2, 25), (8, 50), (16, 100)] {
        let batches = make_batches(sources, per_source);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", sources, per_source)),
            &batches,
            |b, batches| {
                b.iter(|| merge_and_paginate(black_box(batches.clone()), 1, 20));
            },
        );
    }

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let articles: Vec<Article> = make_batches(1, 1000).remove(0);

    c.bench_function("article_cache_insert_1000", |b| {
        b.iter(|| {
            let cache = ArticleCache::new(1000, Duration::from_secs(1800));
            for article in &articles {
                cache.insert(article.id.clone(), article.clone());
            }
            black_box(cache.len())
        });
    });

    let feeds = FeedCache::new(100, Duration::from_secs(1800));
    for page in 1..=100 {
        feeds.insert(FeedKey::category("all", page, 20), news_station::Feed::empty("all", page, 20));
    }
    c.bench_function("feed_cache_hit", |b| {
        let key = FeedKey::category("all", 50, 20);
        b.iter(|| black_box(feeds.get(&key)));
    });
}

criterion_group!(benches, bench_merge_and_paginate, bench_cache);
criterion_main!(benches);
