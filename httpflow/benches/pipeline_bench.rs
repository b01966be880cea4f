//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use httpflow::client::Client;
use httpflow::core::{Body, Method, Response};
use httpflow::events::NoOpEventSink;
use httpflow::testing::{json_response, MockAdapter};
use std::sync::Arc;

fn client(adapter: Arc<MockAdapter>) -> Client {
    Client::builder(adapter)
        .with_base_url("http://bench.local/")
        .with_default_header("user agent", "httpflow-bench")
        .with_event_sink(Arc::new(NoOpEventSink))
        .build()
        .expect("client builds")
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime builds");

    let plain = Arc::new(MockAdapter::new());
    plain.push_response(Response::new(204));
    let plain_client = client(plain);

    c.bench_function("get_no_body", |b| {
        b.iter(|| runtime.block_on(async { black_box(plain_client.get("ping").await) }))
    });

    let json = Arc::new(MockAdapter::new());
    json.push_response(json_response(200, &serde_json::json!({"items": [1, 2, 3]})));
    let json_client = client(json);

    c.bench_function("post_json_decode", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let options = json_client.options().bearer_auth("token").with_param("page", "1");
                black_box(
                    json_client
                        .request(
                            Method::Post,
                            "items",
                            options,
                            Body::Json(serde_json::json!({"name": "x"})),
                        )
                        .await,
                )
            })
        })
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
