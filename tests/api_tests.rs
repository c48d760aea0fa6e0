use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use async_trait::async_trait;
use product_catalog::{
    app::router::{create_router, AppState},
    config::Config,
    datasource::InMemoryStore,
    DataSource, DataSourceError, NewProduct, Product, ProductPatch, ProductStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----catalog-test-boundary";

struct TestApp {
    router: Router,
    uploads: TempDir,
}

fn create_test_app() -> TestApp {
    create_test_app_with(DataSource::in_memory())
}

fn create_test_app_with(data_source: DataSource) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.uploads.dir = uploads.path().to_path_buf();

    let data_source = Arc::new(data_source);
    let state = AppState::new(data_source, &config);
    TestApp {
        router: create_router(state, &config),
        uploads,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart_request(method: Method, uri: &str, fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Request<Body> {
    let file = file.map(|(file_name, content_type, data)| (file_name, Some(content_type), data));
    multipart_request_raw(method, uri, fields, file)
}

/// 文件部分的 content type 为 `None` 时不写 `Content-Type` 头
fn multipart_request_raw(
    method: Method,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, Option<&str>, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"imageFile\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create(app: &TestApp, name: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/products",
            json!({ "name": name, "price": 10, "color": "blue" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

#[tokio::test]
async fn test_create_get_update_delete() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/products",
            json!({ "name": "Chair", "price": 49.99, "color": "red" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let product = body["data"].clone();
    assert_eq!(product["id"], "1");
    assert_eq!(product["description"], "");
    assert_eq!(product["image"], "");

    let (status, body) = send(&app, get("/products/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], product);

    let (status, body) = send(
        &app,
        json_request(Method::PATCH, "/products/1", json!({ "price": "39.99" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 39.99);
    assert_eq!(body["data"]["name"], "Chair");

    let (status, body) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri("/products/1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, body) = send(&app, get("/products/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_id_returns_not_found() {
    let app = create_test_app();
    create(&app, "Lamp").await;

    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            "/products/nonexistent-id",
            json!({ "name": "Desk" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri("/products/nonexistent-id")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, get("/products")).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["products"][0]["name"], "Lamp");
}

#[tokio::test]
async fn test_validation_errors_are_per_field() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/products",
            json!({ "name": "  ", "price": "abc" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["color", "name", "price"]);
    assert!(body["errors"][0]["msg"].is_string());

    let (_, body) = send(&app, get("/products")).await;
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/products")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_index_paginates_five_per_page() {
    let app = create_test_app();
    for i in 1..=12 {
        create(&app, &format!("Product {}", i)).await;
    }

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["source"], "in-memory");
    assert_eq!(page["products"].as_array().unwrap().len(), 5);
    assert_eq!(page["products"][0]["name"], "Product 1");
    assert_eq!(page["pagination"]["totalPages"], 3);
    assert_eq!(page["pagination"]["hasNext"], true);
    assert_eq!(page["pagination"]["hasPrev"], false);

    let (_, body) = send(&app, get("/?page=2")).await;
    assert_eq!(body["data"]["products"][0]["name"], "Product 6");
    assert_eq!(body["data"]["pagination"]["hasNext"], true);

    let (_, body) = send(&app, get("/?page=3")).await;
    let names: Vec<&str> = body["data"]["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Product 11", "Product 12"]);
    assert_eq!(body["data"]["pagination"]["hasNext"], false);
    assert_eq!(body["data"]["pagination"]["hasPrev"], true);

    // 无法解析的页码按第一页处理
    let (_, body) = send(&app, get("/?page=abc")).await;
    assert_eq!(body["data"]["pagination"]["page"], 1);
}

#[tokio::test]
async fn test_list_products_respects_limit() {
    let app = create_test_app();
    for i in 1..=4 {
        create(&app, &format!("P{}", i)).await;
    }

    let (status, body) = send(&app, get("/products?page=2&limit=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["products"][0]["name"], "P4");
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);
}

#[tokio::test]
async fn test_multipart_create_with_data_url() {
    let app = create_test_app();
    let data_url = "data:image/png;base64,iVBORw0KGgo=";

    let (status, body) = send(
        &app,
        multipart_request(
            Method::POST,
            "/products",
            &[
                ("name", "Sofa"),
                ("price", "299"),
                ("color", "green"),
                ("description", "three seats"),
                ("imageUrl", data_url),
            ],
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["price"], 299.0);
    assert_eq!(body["data"]["description"], "three seats");
    assert_eq!(body["data"]["image"], data_url);
}

#[tokio::test]
async fn test_multipart_update_with_file_upload() {
    let app = create_test_app();
    let product = create(&app, "Table").await;
    let id = product["id"].as_str().unwrap();

    let png = [0x89, b'P', b'N', b'G', b'\r', b'\n'];
    let (status, body) = send(
        &app,
        multipart_request(
            Method::PATCH,
            &format!("/products/{}", id),
            &[("color", "oak")],
            Some(("table.png", "image/png", &png[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["color"], "oak");
    assert_eq!(body["data"]["name"], "Table");

    let image = body["data"]["image"].as_str().unwrap().to_string();
    assert!(image.starts_with("/uploads/"));
    assert!(image.ends_with(".png"));

    let stored = app.uploads.path().join(image.trim_start_matches("/uploads/"));
    assert_eq!(std::fs::read(stored).unwrap(), png.to_vec());

    let response = app.router.clone().oneshot(get(&image)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_multipart_rejects_non_image_upload() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        multipart_request(
            Method::POST,
            "/products",
            &[("name", "Rug"), ("price", "15"), ("color", "grey")],
            Some(("rug.txt", "text/plain", &b"not an image"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "imageFile");

    let (_, body) = send(&app, get("/products")).await;
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_health_reports_data_source() {
    let app = create_test_app();
    create(&app, "Stool").await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["data_source"], "in-memory");
    assert_eq!(body["products_count"], 1);
}

#[tokio::test]
async fn test_upload_without_content_type_is_rejected() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        multipart_request_raw(
            Method::POST,
            "/products",
            &[("name", "Rug"), ("price", "15"), ("color", "grey")],
            Some(("evil.html", None, &b"<script>alert(1)</script>"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "imageFile");
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_svg_upload_is_rejected() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        multipart_request(
            Method::POST,
            "/products",
            &[("name", "Logo"), ("price", "1"), ("color", "black")],
            Some(("logo.svg", "image/svg+xml", &b"<svg onload=\"alert(1)\"/>"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_image_path_outside_uploads_is_rejected() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/products",
            json!({ "name": "Lamp", "price": 3, "color": "white", "image": "/uploads/../config.toml" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "image");
}

/// 读取正常、写入时后端不可用的存储
struct ReadOnlyStore(InMemoryStore);

#[async_trait]
impl ProductStore for ReadOnlyStore {
    async fn get_all(&self) -> Result<Vec<Product>, DataSourceError> {
        self.0.get_all().await
    }

    async fn get_by_id(&self, id: &str) -> Result<Product, DataSourceError> {
        self.0.get_by_id(id).await
    }

    async fn create(&self, _fields: NewProduct) -> Result<Product, DataSourceError> {
        Err(DataSourceError::BackendUnavailable("read only".to_string()))
    }

    async fn update(&self, _id: &str, _patch: ProductPatch) -> Result<Product, DataSourceError> {
        Err(DataSourceError::BackendUnavailable("read only".to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<(), DataSourceError> {
        Err(DataSourceError::BackendUnavailable("read only".to_string()))
    }
}

#[tokio::test]
async fn test_failed_write_removes_stored_upload() {
    let inner = InMemoryStore::new();
    let existing = inner
        .create(NewProduct {
            name: "Table".to_string(),
            price: 10.0,
            color: "oak".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let app = create_test_app_with(DataSource::with_store(Arc::new(ReadOnlyStore(inner)), true));
    let png = [0x89, b'P', b'N', b'G'];

    let (status, _) = send(
        &app,
        multipart_request(
            Method::PATCH,
            &format!("/products/{}", existing.id),
            &[],
            Some(("table.png", "image/png", &png[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);

    let (status, _) = send(
        &app,
        multipart_request(
            Method::POST,
            "/products",
            &[("name", "Chair"), ("price", "5"), ("color", "red")],
            Some(("chair.png", "image/png", &png[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);
}
