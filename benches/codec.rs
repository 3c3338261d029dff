/// Benchmarks for the bin codec.
use binning::bins::{MultiRegionBin, SpatialBin, TemporalBin};
use binning::codec::BinCodec;
use binning::types::byte_order::{NATIVE_BYTE_ORDER, NON_NATIVE_BYTE_ORDER};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn spatial_bins(count: usize, features: usize) -> Vec<SpatialBin> {
    (0..count)
        .map(|i| SpatialBin {
            index: i as i64 * 7,
            num_obs: (i % 13) as i32 + 1,
            features: (0..features).map(|f| (i * features + f) as f32).collect(),
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    for byte_order in [NATIVE_BYTE_ORDER, NON_NATIVE_BYTE_ORDER] {
        for features in [2, 8, 32] {
            let codec = BinCodec::new(byte_order, features);
            let bins = spatial_bins(64 * 1024, features);
            let encoded = codec.encode_spatial_bins(&bins).unwrap();

            let name = format!("encode_spatial({}, {})", byte_order, features);
            c.bench_function(&name, |b| {
                b.iter(|| codec.encode_spatial_bins(black_box(&bins)).unwrap())
            });
            let name = format!("decode_spatial({}, {})", byte_order, features);
            c.bench_function(&name, |b| {
                b.iter(|| codec.decode_spatial_bins(black_box(encoded.clone())).unwrap())
            });

            let region_bins: Vec<MultiRegionBin> = bins
                .iter()
                .map(|bin| {
                    let mut temporal = TemporalBin::new(bin.index, features);
                    temporal.features.copy_from_slice(&bin.features);
                    MultiRegionBin::new((bin.index % 5) as i32, temporal)
                })
                .collect();
            let name = format!("encode_multi_region({}, {})", byte_order, features);
            c.bench_function(&name, |b| {
                b.iter(|| codec.encode_multi_region_bins(black_box(&region_bins)).unwrap())
            });
        }
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
