use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pipesim::config::{BufferConfig, EngineConfig, LatencyConfig};
use pipesim::engine::simulate;
use pipesim::trace::parse_trace;

fn config() -> EngineConfig {
    EngineConfig::new(
        BufferConfig { eff_addr_stations: 4, fp_add_stations: 4, fp_mul_stations: 4, int_stations: 4, reorder_buffer_size: 16 },
        LatencyConfig { fp_add: 2, fp_sub: 2, fp_mul: 10, fp_div: 40 },
    )
}

fn alternating_trace(n: usize) -> String {
    let mut text = String::new();
    for i in 0..n {
        let a = i % 4;
        let b = (i + 1) % 4;
        let c = (i + 2) % 4;
        text.push_str(&format!("add r{},r{},r{}:0\n", a, b, c));
    }
    text
}

fn pipeline_engine_benchmark(c: &mut Criterion) {
    let trace = alternating_trace(200);

    c.bench_function("pipeline_engine_200_instructions", |b| {
        b.iter(|| {
            let instructions = parse_trace(trace.as_bytes()).unwrap();
            let (timing, stalls) = simulate(config(), instructions).unwrap();
            black_box((timing.records().len(), stalls.total()));
        });
    });
}

fn trace_parsing_benchmark(c: &mut Criterion) {
    let trace = alternating_trace(1000);

    c.bench_function("trace_parsing_1000_lines", |b| {
        b.iter(|| {
            let instructions = parse_trace(trace.as_bytes()).unwrap();
            black_box(instructions.len());
        });
    });
}

criterion_group!(benches, pipeline_engine_benchmark, trace_parsing_benchmark);
criterion_main!(benches);
