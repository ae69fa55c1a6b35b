//! # Classification Benchmarks
//!
//! Run with: `cargo bench -p coursetrack-core`

use coursetrack_core::{
    Catalog, CategoryId, Course, CourseId, CourseStatusClassifier, CriterionId, Timestamp, UserId,
    enrolled_courses_report,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const USER: UserId = UserId(1);

/// A catalog where the user is enrolled in `size` courses; every other course
/// has a criterion and every fourth one is completed.
fn create_catalog(size: u64) -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_category(CategoryId(1), "Bench");
    for i in 0..size {
        let id = CourseId(i);
        catalog.add_course(Course::new(id, CategoryId(1), format!("Course {i}")));
        catalog.enroll(USER, id, Timestamp(1_000));
        if i % 2 == 0 {
            catalog.add_criterion(CriterionId(i), id);
        }
        if i % 4 == 0 {
            catalog.record_criterion_completion(USER, id, CriterionId(i), Timestamp(2_000));
        } else {
            catalog.start_tracking(USER, id, Timestamp(1_000));
        }
    }
    catalog
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for size in [10u64, 100, 1000] {
        let catalog = create_catalog(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            let classifier = CourseStatusClassifier::new(catalog);
            b.iter(|| black_box(classifier.classify(USER)));
        });
    }

    group.finish();
}

fn bench_enrolled_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("enrolled_report");

    for size in [10u64, 100, 1000] {
        let catalog = create_catalog(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            b.iter(|| black_box(enrolled_courses_report(catalog, USER)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify, bench_enrolled_report);
criterion_main!(benches);
