use super::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMAGE_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn credential() -> Credential {
    Credential {
        token: "test-token".into(),
        valid_for: Duration::from_secs(3600),
    }
}

async fn cache_backed_by(server: &MockServer, dir: &TempDir) -> AssetCache {
    let gateway = Arc::new(CatalogGateway::new(server.uri()));
    AssetCache::new(dir.path(), gateway).unwrap()
}

async fn mount_image(server: &MockServer, image_id: &str, expected_downloads: u64) {
    let href = format!("{}/downloads/{image_id}.jpg", server.uri());
    Mock::given(method("GET"))
        .and(path(format!("/v2/files/{image_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "link": { "href": href } }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/downloads/{image_id}.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES))
        .expect(expected_downloads)
        .mount(server)
        .await;
}

#[tokio::test]
async fn second_call_is_a_cache_hit() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_image(&server, "img-1", 1).await;
    let cache = cache_backed_by(&server, &dir).await;

    let first = cache.ensure_local(&credential(), "img-1").await.unwrap();
    let second = cache.ensure_local(&credential(), "img-1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, dir.path().join("img-1.jpg"));
    assert_eq!(std::fs::read(&first).unwrap(), IMAGE_BYTES);
    // expect(1) on the download mock verifies exactly one fetch on drop
}

#[tokio::test]
async fn concurrent_calls_download_once_and_file_is_intact() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_image(&server, "img-2", 1).await;
    let cache = Arc::new(cache_backed_by(&server, &dir).await);

    let a = Arc::clone(&cache);
    let b = Arc::clone(&cache);
    let cred = credential();
    let cred2 = credential();
    let (ra, rb) = tokio::join!(
        async move { a.ensure_local(&cred, "img-2").await },
        async move { b.ensure_local(&cred2, "img-2").await },
    );

    let pa = ra.unwrap();
    let pb = rb.unwrap();
    assert_eq!(pa, pb);
    assert_eq!(std::fs::read(&pa).unwrap(), IMAGE_BYTES);
}

#[tokio::test]
async fn preexisting_file_short_circuits_remote_calls() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("img-3.png"), b"already here").unwrap();
    // no mocks mounted: any remote call would 404 and fail the test
    let cache = cache_backed_by(&server, &dir).await;

    let path = cache.ensure_local(&credential(), "img-3").await.unwrap();
    assert_eq!(path, dir.path().join("img-3.png"));
}

#[tokio::test]
async fn failed_download_surfaces_status() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/v2/files/img-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "link": { "href": format!("{}/downloads/img-4.jpg", server.uri()) } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/downloads/img-4.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let cache = cache_backed_by(&server, &dir).await;

    let err = cache.ensure_local(&credential(), "img-4").await.unwrap_err();
    assert!(matches!(err, CacheError::Download(503)));
    assert!(cache.lookup("img-4").unwrap().is_none());
}

#[test]
fn extension_from_url_takes_last_path_segment() {
    assert_eq!(
        extension_from_url("https://cdn.example.com/files/abc/fish.jpg"),
        "jpg"
    );
    assert_eq!(
        extension_from_url("https://cdn.example.com/fish.PNG?token=xyz"),
        "PNG"
    );
}

#[test]
fn extension_from_url_falls_back_to_bin() {
    assert_eq!(extension_from_url("https://cdn.example.com/noext"), "bin");
    assert_eq!(extension_from_url("https://cdn.example.com/"), "bin");
    assert_eq!(extension_from_url("not a url"), "bin");
    assert_eq!(
        extension_from_url("https://cdn.example.com/weird.%2e%2e"),
        "bin"
    );
}
