//! # Detail Benchmarks
//!
//! Performance benchmarks for quire-core read models and snapshots.
//!
//! Run with: `cargo bench -p quire-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quire_core::{
    JournalId, MemoryBlobStore, Session, SubmissionDraft, SubmissionFilter, SubmissionId,
    Timestamp, UploadRequest, UploadedFile, UserId, snapshot_to_bytes,
};
use std::hint::black_box;

const AUTHOR: UserId = UserId(1);

fn secs(i: usize) -> u64 {
    u64::try_from(i).expect("fits")
}

/// Create a session with `submissions` submissions, each carrying `files` files.
fn create_session(submissions: usize, files: usize) -> Session {
    let mut session = Session::new();
    let mut blobs = MemoryBlobStore::new();

    for i in 0..submissions {
        let submission = session
            .create_submission(
                &SubmissionDraft {
                    journal_id: JournalId(1),
                    title: format!("Submission {i}"),
                    author_id: AUTHOR,
                },
                Timestamp(secs(i)),
            )
            .expect("create");
        for f in 0..files {
            session
                .upload(
                    submission.id,
                    UploadRequest {
                        file: Some(UploadedFile {
                            name: format!("file-{f}.pdf"),
                            mime_type: "application/pdf".into(),
                            bytes: vec![0u8; 64],
                        }),
                        label: format!("File {f}"),
                        stage: "submission".into(),
                        uploaded_by: Some(AUTHOR),
                        ..UploadRequest::default()
                    },
                    &mut blobs,
                    Timestamp(secs(i).saturating_add(secs(f))),
                )
                .expect("upload");
        }
    }

    session
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_detail(c: &mut Criterion) {
    let mut group = c.benchmark_group("detail");

    for files in [10, 50, 200].iter() {
        let session = create_session(1, *files);

        group.bench_with_input(BenchmarkId::from_parameter(files), files, |b, _| {
            b.iter(|| black_box(session.detail(SubmissionId(1))));
        });
    }

    group.finish();
}

fn bench_workflow_view(c: &mut Criterion) {
    let session = create_session(1, 50);

    c.bench_function("workflow_view", |b| {
        b.iter(|| {
            black_box(session.workflow_view(
                SubmissionId(1),
                Some("workflow"),
                Some("submission"),
            ))
        });
    });
}

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("listing");
    let filter = SubmissionFilter {
        search: Some("submission 1".into()),
        ..SubmissionFilter::default()
    };

    for size in [100, 1000].iter() {
        let session = create_session(*size, 0);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(session.list(&filter)));
        });
    }

    group.finish();
}

fn bench_snapshot_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_export");

    for size in [10, 100].iter() {
        let session = create_session(*size, 5);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let snapshot = session.export_snapshot().expect("export");
                black_box(snapshot_to_bytes(&snapshot))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_detail,
    bench_workflow_view,
    bench_listing,
    bench_snapshot_export
);
criterion_main!(benches);
