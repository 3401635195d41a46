//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reqflow::events::NoOpEventSink;
use reqflow::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn nested_pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::new().with_title("bench"), status_responder())
        .with_event_sink(Arc::new(NoOpEventSink))
        .with_handler(handler(|p, _| {
            p.set("user", json!({"id": 1}));
        }))
        .with_handler(handler(|p, _| {
            let mut group = GroupProcessor::new(p);
            group.append((0..8).map(|i| {
                handler(move |g, _| {
                    g.set_local("step", json!(i));
                })
            }));
            group.then(handler(|g, _| {
                let mut cond = ConditionalProcessor::new(
                    g,
                    branch(|c, _| {
                        if c.has("user") {
                            c.continue_true();
                        } else {
                            c.continue_false();
                        }
                    }),
                    branch(|c, _| c.set_response_payload_value("ok", json!(true))),
                    branch(|c, _| c.abort(401, None)),
                );
                cond.run();
            }));
            group.run();
        }))
}

fn pipeline_benchmark(c: &mut Criterion) {
    let pipeline = nested_pipeline();

    c.bench_function("nested_pipeline_process", |b| {
        b.iter(|| {
            let ctx = RequestContext::new(InboundRequest::new("GET", "/bench"));
            black_box(pipeline.process(ctx))
        });
    });

    c.bench_function("global_lookup_depth_3", |b| {
        let ctx = RequestContext::new(InboundRequest::new("GET", "/bench"));
        let mut root = RootProcessor::new("lookup", ctx, 200, status_responder());
        root.set("key", json!("value"));
        let mut g1 = GroupProcessor::new(&mut root);
        let mut g2 = GroupProcessor::new(&mut g1);
        let g3 = GroupProcessor::new(&mut g2);
        b.iter(|| black_box(g3.get("key").is_some()));
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
