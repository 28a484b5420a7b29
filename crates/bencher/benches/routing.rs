use std::hint::black_box;

use bencher::{TestCase, TestRequest};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use http::header::ACCEPT;
use http::{HeaderMap, HeaderValue, Method};
use weft_web::negotiation::{negotiate, AcceptRanges};
use weft_web::router::{get, post, put, Router};
use weft_web::{handler_fn, MediaType, ResourceHandler};

static BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

fn noop() -> impl ResourceHandler {
    handler_fn(|_, _, _| Ok(()))
}

fn router() -> Router {
    let mut builder = Router::builder()
        .route("/", get(noop()).produces("text/html"))
        .route("/images/{name}", get(noop()).produces("image/jpeg, image/gif, image/png"))
        .route("/images/{name}", get(noop()).produces("application/json"))
        .route("/images/{name}", put(noop()).consumes("image/*"))
        .route("/static/{path:*}", get(noop()));

    for index in 0..50 {
        builder = builder.route(format!("/api/v1/resource{index}/{{id}}"), get(noop()).produces("application/json"));
        builder = builder.route(format!("/api/v1/resource{index}"), post(noop()).consumes("application/json"));
    }

    builder.build().expect("benchmark routes should be valid")
}

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("root", TestRequest::new("GET", "/")),
        TestCase::normal("image_png", TestRequest::new("GET", "/images/cat").accept("image/png")),
        TestCase::normal("image_browser", TestRequest::new("GET", "/images/cat").accept(BROWSER_ACCEPT)),
        TestCase::normal("static_deep", TestRequest::new("GET", "/static/css/vendor/site.css")),
        TestCase::large("api_last", TestRequest::new("GET", "/api/v1/resource49/7").accept("application/json")),
        TestCase::small("not_found", TestRequest::new("GET", "/missing/path")),
    ]
}

fn headers(request: &TestRequest) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(accept) = request.accept_header() {
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
    }
    headers
}

fn benchmark_router(criterion: &mut Criterion) {
    let router = router();
    let mut group = criterion.benchmark_group("router");

    for case in create_test_cases() {
        let method: Method = case.request().method().parse().expect("valid method");
        let headers = headers(case.request());
        let path = case.request().path();

        group.bench_with_input(BenchmarkId::new(format!("{:?}", case.group()), case.name()), &case, |b, _| {
            b.iter(|| {
                let result = router.at(black_box(&method), black_box(path), black_box(&headers));
                black_box(result.is_ok());
            });
        });
    }

    group.finish();
}

fn benchmark_negotiation(criterion: &mut Criterion) {
    let candidates = [
        MediaType::parse_list("image/jpeg, image/gif, image/png").expect("valid media types"),
        MediaType::parse_list("application/json").expect("valid media types"),
        MediaType::parse_list("text/*").expect("valid media types"),
    ];
    let mut group = criterion.benchmark_group("negotiation");

    group.bench_function(BenchmarkId::from_parameter("parse_accept"), |b| {
        b.iter(|| black_box(AcceptRanges::parse([black_box(BROWSER_ACCEPT)])));
    });

    let accept = AcceptRanges::parse([BROWSER_ACCEPT]);
    group.bench_function(BenchmarkId::from_parameter("select"), |b| {
        b.iter(|| black_box(negotiate(black_box(&accept), candidates.iter().map(Vec::as_slice))));
    });

    group.bench_function(BenchmarkId::from_parameter("parse_and_select"), |b| {
        b.iter(|| {
            let accept = AcceptRanges::parse([black_box("application/json;q=0.5, image/*")]);
            black_box(negotiate(&accept, candidates.iter().map(Vec::as_slice)))
        });
    });

    group.finish();
}

criterion_group!(routing, benchmark_router, benchmark_negotiation);
criterion_main!(routing);
