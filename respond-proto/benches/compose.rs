use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BatchSize;
use criterion::Criterion;
use respond_proto::context::ConnectionContext;
use respond_proto::context::ConnectionDirective;
use respond_proto::context::RequestId;
use respond_proto::context::RequestMeta;
use respond_proto::pool::BufferPool;
use respond_proto::response::Response;
use respond_proto::response::Step;

struct NullContext {
    written: usize,
}

impl ConnectionContext for NullContext {
    fn is_closing(&self) -> bool {
        false
    }

    fn keep_alive_timeout(&self) -> u64 {
        5_000
    }

    fn set_keep_alive_timeout(&mut self, _millis: u64) {}

    fn max_requests(&self) -> u32 {
        100
    }

    fn start_send_response(&mut self, _request_id: RequestId) {}

    fn send_async_start(&mut self, chunk: &[u8]) -> bool {
        self.written += chunk.len();
        true
    }

    fn continue_send_response(&mut self) {}

    fn end_send_response(&mut self, _request_id: RequestId, _directive: ConnectionDirective) {}
}

fn drive(mut response: Response, budget: usize) -> usize {
    let mut ctx = NullContext { written: 0 };
    let _ = response.send(&mut ctx);

    loop {
        match response.step(&mut ctx, budget) {
            Step::Continue if response.is_head_in_flight() => {
                if let Step::Done = response.complete_head(&mut ctx) {
                    break;
                }
            }
            Step::Continue => {}
            Step::Done | Step::Aborted => break,
        }
    }

    ctx.written
}

fn send(c: &mut Criterion) {
    let mut send = c.benchmark_group("send");
    let pool = BufferPool::new(1024, 16);
    let meta = RequestMeta::new(RequestId::new(0));
    let large = vec![0u8; 64 * 1024];

    send.bench_function("coalesced", |b| {
        b.iter_batched(
            || {
                let mut response = Response::with_pool(&meta, pool.clone());
                let _ = response.add_header("Cache-Control", "no-cache");
                let _ = response.set_raw(&b"OK"[..], 0, None);
                response
            },
            |response| drive(response, 16 * 1024),
            BatchSize::SmallInput,
        )
    });

    send.bench_function("body_64k", |b| {
        b.iter_batched(
            || {
                let mut response = Response::with_pool(&meta, pool.clone());
                let _ = response.write_body(&large);
                response
            },
            |response| drive(response, 16 * 1024),
            BatchSize::SmallInput,
        )
    });

    send.finish();
}

criterion_group!(compose, send);
criterion_main!(compose);
