use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polyform::{from_slice, read, to_vec, write, Format, Matrix, StructMap, Value};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
struct User {
    id: u32,
    name: String,
    email: String,
    active: bool,
}

#[derive(Serialize, Deserialize, Clone)]
struct Product {
    sku: String,
    name: String,
    price: f64,
    quantity: u32,
}

fn products(count: usize) -> Vec<Product> {
    (0..count)
        .map(|i| Product {
            sku: format!("SKU-{:04}", i),
            name: format!("Product {}", i),
            price: 10.0 + (i as f64) * 0.25,
            quantity: (i % 17) as u32,
        })
        .collect()
}

fn document() -> Value {
    let mut root = StructMap::new();
    root.set("service", Value::from("inventory"));
    root.set("replicas", Value::Int(3));
    root.set(
        "hosts",
        Value::List((0..8).map(|i| Value::from(format!("node-{}.example", i))).collect()),
    );
    let mut limits = StructMap::new();
    limits.set("cpu", Value::Float(0.5));
    limits.set("memory", Value::UInt(512));
    limits.set("burst", Value::Bool(false));
    root.set("limits", Value::Struct(limits));
    let grid = Matrix::from_data(&[4, 4], (0..16).map(f64::from).collect()).unwrap_or_default();
    root.set("grid", Value::Matrix(grid));
    Value::Struct(root)
}

fn benchmark_write_each_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_value");
    let doc = document();

    for format in Format::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(format), &doc, |b, doc| {
            b.iter(|| write(format, black_box(doc)))
        });
    }

    group.finish();
}

fn benchmark_read_each_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_value");
    let doc = document();

    for format in Format::ALL {
        let bytes = write(format, &doc).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(format), &bytes, |b, bytes| {
            b.iter(|| read(format, black_box(bytes)))
        });
    }

    group.finish();
}

fn benchmark_typed_simple(c: &mut Criterion) {
    let user = User {
        id: 123,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        active: true,
    };
    let json = to_vec(Format::Json, &user).unwrap();

    c.bench_function("serialize_simple_struct_json", |b| {
        b.iter(|| to_vec(Format::Json, black_box(&user)))
    });
    c.bench_function("deserialize_simple_struct_json", |b| {
        b.iter(|| from_slice::<User>(Format::Json, black_box(&json)))
    });
}

fn benchmark_typed_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize_products");

    for size in [10, 100, 500] {
        let items = products(size);
        for format in [Format::Binary, Format::Json, Format::Yaml] {
            group.bench_with_input(
                BenchmarkId::new(format.to_string(), size),
                &items,
                |b, items| b.iter(|| to_vec(format, black_box(items))),
            );
        }
    }

    group.finish();
}

fn benchmark_convert(c: &mut Criterion) {
    let json = write(Format::Json, &document()).unwrap();

    c.bench_function("convert_json_to_yaml", |b| {
        b.iter(|| polyform::convert(Format::Json, black_box(&json), Format::Yaml))
    });
}

criterion_group!(
    benches,
    benchmark_write_each_format,
    benchmark_read_each_format,
    benchmark_typed_simple,
    benchmark_typed_arrays,
    benchmark_convert
);
criterion_main!(benches);
