//! Benchmarks for the hot path of a turn
//!
//! Frame parsing plus interpretation per SSE body size, and projection of
//! long sessions at each verbosity.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hostchat::render::{project, Verbosity};
use hostchat::session::{StreamingSession, TurnId};
use hostchat::sse::{interpret, parse_frames, DomainEvent, FinalEvent, ProgressEvent, ToolStartEvent};
use std::time::{Duration, Instant};

/// An SSE body with `steps` progress/tool rounds and a final answer.
fn generate_sse_body(steps: usize) -> String {
    let mut body = String::from("event: connected\ndata: {\"sessionId\":\"bench\"}\n\n");
    for i in 0..steps {
        body.push_str(&format!(
            "event: progress\ndata: {{\"details\":{{\"phase\":\"execution\",\"currentStep\":{},\"totalSteps\":{}}},\"message\":\"Working on step {}\"}}\n\n",
            i + 1,
            steps,
            i + 1
        ));
        body.push_str("event: tool_call_start\ndata: {\"tool\":\"oracle__run_sql\"}\n\n");
        body.push_str(
            "event: tool_call_complete\ndata: {\"tool\":\"oracle__run_sql\",\"success\":true}\n\n",
        );
    }
    body.push_str("event: final\ndata: {\"content\":\"Done\",\"sql\":\"SELECT 1 FROM dual\"}\n\n");
    body
}

fn generate_session(events: usize) -> (StreamingSession, Instant) {
    let start = Instant::now();
    let mut session = StreamingSession::started_at(TurnId::new(), start);
    for i in 0..events {
        let event = if i % 2 == 0 {
            DomainEvent::Progress(ProgressEvent {
                phase: "execution".to_string(),
                message: format!("step {}", i),
                ..Default::default()
            })
        } else {
            DomainEvent::ToolStart(ToolStartEvent {
                tool: "oracle__run_sql".to_string(),
                description: String::new(),
            })
        };
        session.ingest_at(event, start + Duration::from_millis(i as u64));
    }
    session.ingest_at(
        DomainEvent::Final(FinalEvent {
            content: "Done".to_string(),
            ..Default::default()
        }),
        start + Duration::from_millis(events as u64),
    );
    (session, start)
}

fn bench_parse_and_interpret(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_and_interpret");

    for steps in [1, 10, 100, 1000].iter() {
        let body = generate_sse_body(*steps);
        group.throughput(Throughput::Bytes(body.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_steps", steps)),
            &body,
            |b, body| {
                b.iter(|| {
                    let events: Vec<_> = parse_frames(black_box(body).lines())
                        .filter_map(|frame| interpret(&frame).ok())
                        .collect();
                    black_box(events)
                });
            },
        );
    }

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    for count in [10, 100, 1000].iter() {
        let (session, start) = generate_session(*count);
        group.throughput(Throughput::Elements(*count as u64));

        for verbosity in [Verbosity::Minimal, Verbosity::Normal, Verbosity::Detailed] {
            group.bench_with_input(
                BenchmarkId::new(verbosity.to_string(), count),
                &session,
                |b, session| {
                    b.iter(|| black_box(project(black_box(session), verbosity, start)));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_parse_and_interpret, bench_projection);
criterion_main!(benches);
