//! End-to-end tests of the image endpoint against a stubbed directions API.
//!
//! The snapshotter here does not launch a browser: it loads the render URL
//! over real HTTP, like Chrome would, and returns the page it received behind
//! a PNG signature so tests can see which scene was rendered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use routeshot::directions::{DirectionsClient, DirectionsConfig};
use routeshot::scene::SceneOptions;
use routeshot::{api, Error, Pipeline, Snapshotter};
use serde_json::{json, Value};
use tiny_http::{Response, Server};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const TOKEN: &str = "test-token";
const GEOMETRY: &str = r#"{"coordinates":[[-46.6891,-23.4875],[-46.7088,-23.4768]],"type":"LineString"}"#;

static INIT: Once = Once::new();

/// Directions API stub.
///
/// Origin longitude 0 yields `NoRoute`, origin longitude 1 yields a 502 HTML
/// page, a wrong token yields 401; anything else gets a two-point route.
fn start_directions_stub() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            for request in server.incoming_requests() {
                let url = request.url().to_string();
                let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
                let coords = path.rsplit('/').next().unwrap_or("");

                let json_header = "Content-Type: application/json".parse::<tiny_http::Header>().unwrap();
                let response = if !query.contains(&format!("access_token={TOKEN}")) {
                    Response::from_string(r#"{"message":"Not Authorized - Invalid Token"}"#)
                        .with_status_code(401)
                        .with_header(json_header)
                } else if !query.contains("geometries=geojson") {
                    Response::from_string(r#"{"code":"InvalidInput","message":"geometries missing"}"#)
                        .with_status_code(422)
                        .with_header(json_header)
                } else if coords.starts_with("0,") {
                    Response::from_string(r#"{"code":"NoRoute"}"#).with_header(json_header)
                } else if coords.starts_with("1,") {
                    Response::from_string("<html>bad gateway</html>").with_status_code(502)
                } else {
                    Response::from_string(format!(
                        r#"{{"code":"Ok","routes":[{{"geometry":{GEOMETRY},"distance":2841.5,"duration":412.1}}],"waypoints":[]}}"#
                    ))
                    .with_header(json_header)
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18090/directions".to_string()
}

/// Loads the page the way the browser would and echoes it back
#[derive(Default)]
struct PageEcho {
    launches: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl Snapshotter for PageEcho {
    fn capture(&self, url: &str) -> routeshot::Result<Vec<u8>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        let response = reqwest::blocking::get(url).map_err(|e| Error::LoadError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::ElementNotFound(format!("#map ({})", response.status())));
        }
        let html = response.text().map_err(|e| Error::LoadError(e.to_string()))?;

        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(html.as_bytes());
        Ok(png)
    }
}

struct TimesOut;

impl Snapshotter for TimesOut {
    fn capture(&self, _url: &str) -> routeshot::Result<Vec<u8>> {
        Err(Error::RenderTimeout(10_000))
    }
}

async fn start_app(token: Option<&str>, directions_base: &str, snapshotter: Arc<dyn Snapshotter>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let directions = DirectionsClient::new(DirectionsConfig {
        base_url: directions_base.to_string(),
        access_token: token.map(str::to_string),
        ..Default::default()
    })
    .unwrap();
    let pipeline = Pipeline::new(directions, SceneOptions::default(), snapshotter, base.parse().unwrap());
    let router = api::router::router(api::AppState::new(pipeline), None);

    tokio::spawn(async move {
        api::serve(listener, router).await.unwrap();
    });

    base
}

fn flat_request(origin: (f64, f64), destination: (f64, f64)) -> Value {
    json!({
        "origem_latitude": origin.0,
        "origem_longitude": origin.1,
        "destino_latitude": destination.0,
        "destino_longitude": destination.1,
    })
}

async fn post_route(base: &str, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/api/gerar-imagem-rota"))
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn image_request_returns_png_of_composed_scene() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), &directions, echo.clone()).await;

    let res = post_route(&base, &flat_request((-23.4875, -46.6891), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.headers()["x-route-distance"], "2842");
    assert_eq!(res.headers()["x-route-duration"], "412");

    let body = res.bytes().await.unwrap();
    assert!(body.starts_with(PNG_SIGNATURE));
    let page = String::from_utf8_lossy(&body[PNG_SIGNATURE.len()..]).to_string();

    assert!(page.contains("L.marker([-23.4875, -46.6891], { icon: blueIcon })"));
    assert!(page.contains("L.marker([-23.4768, -46.7088], { icon: greenIcon })"));
    assert!(page.contains(&format!("const routeGeoJson = {GEOMETRY};")));
    assert_eq!(echo.launches.load(Ordering::SeqCst), 1);

    let urls = echo.urls.lock().unwrap().clone();
    assert!(urls[0].starts_with(&format!("{base}/render-map/")));
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_payload_is_accepted() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), &directions, echo.clone()).await;

    let body = json!({
        "origem": { "lat": -23.4875, "lng": -46.6891 },
        "destino": { "lat": -23.4768, "lng": -46.7088 }
    });
    let res = post_route(&base, &body).await;
    assert_eq!(res.status(), 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn no_route_returns_500_without_launching_browser() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), &directions, echo.clone()).await;

    let res = post_route(&base, &flat_request((-23.4875, 0.0), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 500);

    let err: Value = res.json().await.unwrap();
    assert!(err["error"].as_str().unwrap().contains("Failed"));
    assert!(err["details"].as_str().unwrap().contains("NoRoute"));
    assert_eq!(err["kind"], "upstream_route");
    assert_eq!(echo.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_directions_returns_500_without_launching_browser() {
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), "http://127.0.0.1:1/directions", echo.clone()).await;

    let res = post_route(&base, &flat_request((-23.4875, -46.6891), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 500);

    let err: Value = res.json().await.unwrap();
    assert_eq!(err["kind"], "network");
    assert!(!err["details"].as_str().unwrap().contains(TOKEN));
    assert_eq!(echo.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_gateway_page_is_reported() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), &directions, echo.clone()).await;

    let res = post_route(&base, &flat_request((-23.4875, 1.0), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 500);

    let err: Value = res.json().await.unwrap();
    assert_eq!(err["kind"], "network");
    assert!(err["details"].as_str().unwrap().contains("502"));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_token_surfaces_upstream_message() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some("wrong"), &directions, echo.clone()).await;

    let res = post_route(&base, &flat_request((-23.4875, -46.6891), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 500);

    let err: Value = res.json().await.unwrap();
    assert_eq!(err["kind"], "upstream_route");
    assert!(err["details"].as_str().unwrap().contains("Not Authorized"));
    assert_eq!(echo.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_token_is_a_config_error() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(None, &directions, echo.clone()).await;

    let res = post_route(&base, &flat_request((-23.4875, -46.6891), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 500);

    let err: Value = res.json().await.unwrap();
    assert_eq!(err["kind"], "config");
    assert_eq!(echo.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn render_failure_is_tagged() {
    let directions = start_directions_stub();
    let base = start_app(Some(TOKEN), &directions, Arc::new(TimesOut)).await;

    let res = post_route(&base, &flat_request((-23.4875, -46.6891), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 500);

    let err: Value = res.json().await.unwrap();
    assert_eq!(err["kind"], "render_timeout");
    assert!(err["details"].as_str().unwrap().contains("10000ms"));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_a_500() {
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), "http://127.0.0.1:1/directions", echo.clone()).await;

    for body in [json!({ "origem_latitude": "north" }), json!({})] {
        let res = post_route(&base, &body).await;
        assert_eq!(res.status(), 500);

        let err: Value = res.json().await.unwrap();
        assert_eq!(err["kind"], "invalid_request");
        assert!(err["error"].is_string());
        assert!(err["details"].is_string());
    }
    assert_eq!(echo.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn body_without_json_content_type_is_a_500() {
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), "http://127.0.0.1:1/directions", echo.clone()).await;

    let body = flat_request((-23.4875, -46.6891), (-23.4768, -46.7088)).to_string();
    let res = reqwest::Client::new()
        .post(format!("{base}/api/gerar-imagem-rota"))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);

    let err: Value = res.json().await.unwrap();
    assert_eq!(err["kind"], "invalid_request");
    assert_eq!(echo.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn render_map_reflects_latest_scene() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), &directions, echo.clone()).await;

    let client = reqwest::Client::new();
    let empty = client.get(format!("{base}/render-map")).send().await.unwrap();
    assert_eq!(empty.status(), 200);
    assert_eq!(empty.text().await.unwrap(), "");

    let a = post_route(&base, &flat_request((-10.5, -40.25), (-10.75, -40.5))).await;
    assert_eq!(a.status(), 200);
    let b = post_route(&base, &flat_request((-20.5, -50.25), (-20.75, -50.5))).await;
    assert_eq!(b.status(), 200);

    let latest = client.get(format!("{base}/render-map")).send().await.unwrap().text().await.unwrap();
    assert!(latest.contains("L.marker([-20.5, -50.25]"));
    assert!(!latest.contains("L.marker([-10.5, -40.25]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scene_token_expires_with_request() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), &directions, echo.clone()).await;

    let res = post_route(&base, &flat_request((-23.4875, -46.6891), (-23.4768, -46.7088))).await;
    assert_eq!(res.status(), 200);

    let url = echo.urls.lock().unwrap()[0].clone();
    let again = reqwest::get(&url).await.unwrap();
    assert_eq!(again.status(), 404);

    let bogus = reqwest::get(format!("{base}/render-map/not-a-token")).await.unwrap();
    assert_eq!(bogus.status(), 404);

    let unknown = reqwest::get(format!("{base}/render-map/{}", uuid::Uuid::new_v4())).await.unwrap();
    assert_eq!(unknown.status(), 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_get_their_own_scene() {
    let directions = start_directions_stub();
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), &directions, echo.clone()).await;

    let origins = [(-21.5, -41.5), (-22.5, -42.5), (-23.5, -43.5), (-24.5, -44.5)];
    let tasks: Vec<_> = origins
        .iter()
        .map(|&origin| {
            let base = base.clone();
            tokio::spawn(async move {
                let res = post_route(&base, &flat_request(origin, (-23.4768, -46.7088))).await;
                assert_eq!(res.status(), 200);
                (origin, res.bytes().await.unwrap())
            })
        })
        .collect();

    for task in tasks {
        let (origin, body) = task.await.unwrap();
        let page = String::from_utf8_lossy(&body[PNG_SIGNATURE.len()..]).to_string();
        assert!(page.contains(&format!("L.marker([{}, {}], {{ icon: blueIcon }})", origin.0, origin.1)));
        assert_eq!(page.matches("icon: blueIcon }").count(), 1);
    }
    assert_eq!(echo.launches.load(Ordering::SeqCst), origins.len());
}

#[tokio::test(flavor = "multi_thread")]
async fn interactive_page_defaults_to_demo_route() {
    let echo = Arc::new(PageEcho::default());
    let base = start_app(Some(TOKEN), "http://127.0.0.1:1/directions", echo).await;

    let page = reqwest::get(format!("{base}/mapa")).await.unwrap().text().await.unwrap();
    assert!(page.contains("L.Routing.control"));
    assert!(page.contains("L.latLng(-23.4875, -46.6891)"));
    assert!(page.contains("L.latLng(-23.4768, -46.7088)"));

    let page = reqwest::get(format!("{base}/mapa?origem_lat=-22.9&origem_lng=-43.2"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("L.latLng(-22.9, -43.2)"));
    assert!(page.contains("L.latLng(-23.4768, -46.7088)"));

    let health = reqwest::get(format!("{base}/healthz")).await.unwrap().text().await.unwrap();
    assert_eq!(health, "ok");
}
