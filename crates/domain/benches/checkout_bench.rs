use criterion::{Criterion, criterion_group, criterion_main};
use domain::{LineItemRequest, Money, PricingPolicy, Product, validate_cart};

fn catalog(size: usize) -> Vec<Product> {
    (0..size)
        .map(|i| {
            Product::new(
                format!("SKU-{i:04}"),
                format!("Product {i}"),
                Money::from_cents(199 + i as i64 * 37),
            )
            .with_stock(1_000)
        })
        .collect()
}

fn requests(size: usize) -> Vec<LineItemRequest> {
    (0..size)
        .map(|i| LineItemRequest::new(format!("SKU-{i:04}"), (i % 5 + 1) as u32))
        .collect()
}

fn bench_validate_cart_10(c: &mut Criterion) {
    let products = catalog(10);
    let reqs = requests(10);

    c.bench_function("domain/validate_cart_10", |b| {
        b.iter(|| validate_cart(&reqs, &products).unwrap());
    });
}

fn bench_validate_cart_100(c: &mut Criterion) {
    let products = catalog(100);
    let reqs = requests(100);

    c.bench_function("domain/validate_cart_100", |b| {
        b.iter(|| validate_cart(&reqs, &products).unwrap());
    });
}

fn bench_price_100(c: &mut Criterion) {
    let products = catalog(100);
    let cart = validate_cart(&requests(100), &products).unwrap();
    let policy = PricingPolicy::default();

    c.bench_function("domain/price_100", |b| {
        b.iter(|| policy.price(cart.items()));
    });
}

criterion_group!(
    benches,
    bench_validate_cart_10,
    bench_validate_cart_100,
    bench_price_100
);
criterion_main!(benches);
