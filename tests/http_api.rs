use std::net::SocketAddr;
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::level_filters::LevelFilter;
use url::Url;

use vitrina::cache::WarmupReport;
use vitrina::config::{
    AuthSettings, LogFormat, LoggingSettings, NotifySettings, ServerSettings, Settings,
    StorageSettings, SweeperSettings, UploadSettings,
};
use vitrina::domain::types::Collection;
use vitrina::infra::bootstrap;

const BOUNDARY: &str = "vitrina-test-boundary";
const PASS_KEY: &str = "confirm-me";

struct TestSite {
    dir: TempDir,
    router: Router,
}

fn settings_for(root: &Path) -> Settings {
    Settings {
        server: ServerSettings {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            graceful_shutdown: Duration::from_secs(1),
        },
        logging: LoggingSettings {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        },
        storage: StorageSettings {
            data_dir: root.join("data"),
            config_file: root.join("config.json"),
        },
        uploads: UploadSettings {
            public_dir: root.join("public"),
            gallery_dir: root.join("public/uploads"),
            hero_dir: root.join("uploads2"),
            max_request_bytes: NonZeroU64::new(1024 * 1024).expect("non-zero"),
        },
        auth: AuthSettings {
            default_password: "admin123".to_string(),
            confirmation_key: Some(PASS_KEY.to_string()),
            login_failure_delay: Duration::ZERO,
            session_ttl: Duration::from_secs(3600),
            cookie_name: "vitrina_session".to_string(),
        },
        sweeper: SweeperSettings {
            interval: Duration::from_secs(3600),
        },
        notify: NotifySettings {
            api_base: Url::parse("https://api.telegram.org").expect("url"),
            bot_token: None,
            chat_id: None,
        },
    }
}

async fn site() -> TestSite {
    site_with(|_| {}).await
}

async fn site_with(seed: impl FnOnce(&Path)) -> TestSite {
    let (site, report) = warmed_site(seed).await;
    assert!(report.is_clean(), "warmup failed: {:?}", report.failed);
    site
}

async fn warmed_site(seed: impl FnOnce(&Path)) -> (TestSite, WarmupReport) {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("public")).expect("public dir");
    std::fs::create_dir_all(dir.path().join("data")).expect("data dir");
    std::fs::write(dir.path().join("public/index.html"), "<h1>home</h1>").expect("index");
    std::fs::write(dir.path().join("public/admin.html"), "<h1>admin</h1>").expect("admin");
    seed(dir.path());

    let app = bootstrap::assemble(&settings_for(dir.path())).expect("assemble");
    let report = app.cache.warmup().await;

    let site = TestSite {
        router: app.router(),
        dir,
    };
    (site, report)
}

impl TestSite {
    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec();
        (status, headers, body)
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self.send(get(uri)).await;
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    async fn post_json(&self, uri: &str, payload: Value, cookie: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(Body::from(payload.to_string()))
            .expect("request");
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    async fn login(&self, password: &str) -> Result<String, StatusCode> {
        let request = Request::post("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "password": password }).to_string()))
            .expect("request");
        let (status, headers, _) = self.send(request).await;
        if status != StatusCode::OK {
            return Err(status);
        }
        let set_cookie = headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .expect("session cookie");
        Ok(set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .to_string())
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn missing_collections_serve_empty_defaults() {
    let site = site().await;

    let (status, gallery) = site.get_json("/gallery").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gallery, json!([]));

    let (status, materials) = site.get_json("/materials").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(materials, json!([]));

    let (status, config) = site.get_json("/main").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        config,
        json!([{ "sitename": "", "description": "", "slogan": "", "image": "" }])
    );
}

#[tokio::test]
async fn gallery_upload_list_and_delete_round_trip() {
    let site = site().await;

    let (status, _, body) = site
        .send(multipart(
            "/upload",
            &[
                Part::Text("title", "Sunset"),
                Part::File("image", "Sunset.JPG", b"jpeg-bytes"),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));

    let (_, gallery) = site.get_json("/gallery").await;
    let items = gallery.as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Sunset");
    let filename = items[0]["filename"].as_str().expect("filename").to_string();
    assert!(filename.ends_with(".jpg"));
    assert!(site.dir.path().join("public/uploads").join(&filename).is_file());

    let (status, served, _) = site.send(get(&format!("/uploads/{filename}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(served.contains_key(header::CACHE_CONTROL));

    let (status, reply) = site
        .post_json("/delete", json!({ "filename": filename }), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["success"], true);
    assert!(!site.dir.path().join("public/uploads").join(&filename).exists());

    let (status, reply) = site
        .post_json("/delete", json!({ "filename": filename }), None)
        .await;
    assert_eq!(status, StatusCode::OK, "deleting twice stays successful");
    assert_eq!(reply["success"], true);

    let (_, gallery) = site.get_json("/gallery").await;
    assert_eq!(gallery, json!([]));
}

#[tokio::test]
async fn gallery_upload_without_file_is_rejected() {
    let site = site().await;

    let (status, _, body) = site
        .send(multipart("/upload", &[Part::Text("title", "Nothing")]))
        .await;
    let reply: Value = serde_json::from_slice(&body).expect("json");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["success"], false);
    assert_eq!(reply["message"], "No file uploaded");
}

#[tokio::test]
async fn materials_are_listed_newest_first_and_deleted_by_string_id() {
    let site = site_with(|root| {
        std::fs::write(
            root.join("data/materials.json"),
            json!([
                { "id": 1, "title": "old", "content": "", "image": "",
                  "date": "2024-01-01T00:00:00Z", "status": "published" },
                { "id": 2, "title": "new", "content": "", "image": "",
                  "date": "2024-06-01T00:00:00Z", "status": "published" }
            ])
            .to_string(),
        )
        .expect("seed materials");
    })
    .await;

    let (status, materials) = site.get_json("/materials").await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = materials
        .as_array()
        .expect("array")
        .iter()
        .map(|item| item["title"].as_str().expect("title").to_string())
        .collect();
    assert_eq!(titles, vec!["new", "old"]);

    let (status, _) = site
        .post_json("/materials/delete", json!({ "id": "1" }), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, materials) = site.get_json("/materials").await;
    assert_eq!(materials.as_array().expect("array").len(), 1);
    assert_eq!(materials[0]["id"], 2);

    let on_disk: Value = serde_json::from_str(
        &std::fs::read_to_string(site.dir.path().join("data/materials.json")).expect("read"),
    )
    .expect("json");
    assert_eq!(on_disk.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn material_create_stores_image_and_reports_success() {
    let site = site().await;

    let (status, _, _) = site
        .send(multipart(
            "/materials",
            &[
                Part::Text("title", "Launch"),
                Part::Text("content", "We are live."),
                Part::File("image", "cover.png", b"png-bytes"),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, materials) = site.get_json("/materials").await;
    let item = &materials[0];
    assert_eq!(item["title"], "Launch");
    assert_eq!(item["status"], "published");
    let image = item["image"].as_str().expect("image");
    assert!(image.ends_with(".png"));
    assert!(site.dir.path().join("public/uploads").join(image).is_file());
}

#[tokio::test]
async fn settings_save_keeps_current_image_and_never_exposes_password() {
    let site = site_with(|root| {
        std::fs::write(
            root.join("config.json"),
            json!({
                "sitename": "Old",
                "description": "",
                "slogan": "",
                "image": "/uploads2/1-hero.png",
                "password": "secret"
            })
            .to_string(),
        )
        .expect("seed config");
    })
    .await;

    let (status, _, body) = site
        .send(multipart(
            "/main",
            &[
                Part::Text("sitename", "Vitrina"),
                Part::Text("description", "Showcase"),
                Part::Text("slogan", "Look closer"),
                Part::Text("currentImage", "/uploads2/1-hero.png"),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(reply["message"], "Settings saved");

    let (_, config) = site.get_json("/main").await;
    assert_eq!(config[0]["sitename"], "Vitrina");
    assert_eq!(config[0]["image"], "/uploads2/1-hero.png");
    assert!(config[0].get("password").is_none());

    let stored: Value = serde_json::from_str(
        &std::fs::read_to_string(site.dir.path().join("config.json")).expect("read"),
    )
    .expect("json");
    assert_eq!(stored["password"], "secret");
}

#[tokio::test]
async fn admin_settings_upload_serves_new_hero_image() {
    let site = site().await;

    let (status, _, body) = site
        .send(multipart(
            "/admin/save-settings",
            &[
                Part::Text("sitename", "Vitrina"),
                Part::File("image", "Hero Banner.png", b"hero-bytes"),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(reply["success"], true);

    let (_, config) = site.get_json("/main").await;
    let image = config[0]["image"].as_str().expect("image").to_string();
    assert!(image.starts_with("/uploads2/"));
    assert!(image.ends_with("-hero-banner.png"));

    let (status, _, served) = site.send(get(&image)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, b"hero-bytes");
}

#[tokio::test]
async fn login_with_default_password_unlocks_admin_page() {
    let site = site().await;

    let (status, headers, _) = site.send(get("/admin.html")).await;
    assert!(status.is_redirection());
    assert_eq!(headers[header::LOCATION], "/login.html");

    assert_eq!(site.login("wrong").await, Err(StatusCode::UNAUTHORIZED));
    let cookie = site.login("admin123").await.expect("login");

    let request = Request::get("/admin.html")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = site.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>admin</h1>");

    let request = Request::get("/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let (status, headers, _) = site.send(request).await;
    assert!(status.is_redirection());
    assert_eq!(headers[header::LOCATION], "/login.html");

    let request = Request::get("/admin.html")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let (status, _, _) = site.send(request).await;
    assert!(status.is_redirection(), "revoked session must not pass");
}

#[tokio::test]
async fn password_change_requires_session_and_confirmation_key() {
    let site = site().await;

    let (status, _) = site
        .post_json(
            "/change-password",
            json!({ "oldPass": "admin123", "newPass": "n3w", "passKey": PASS_KEY }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = site.login("admin123").await.expect("login");

    let (status, reply) = site
        .post_json(
            "/change-password",
            json!({ "oldPass": "admin123", "newPass": "n3w", "passKey": "nope" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(reply["success"], false);

    let (status, reply) = site
        .post_json(
            "/change-password",
            json!({ "oldPass": "admin123", "newPass": "n3w", "passKey": PASS_KEY }),
            Some(&cookie),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["success"], true);

    assert_eq!(site.login("admin123").await, Err(StatusCode::UNAUTHORIZED));
    site.login("n3w").await.expect("new password works");
}

#[tokio::test]
async fn contact_request_without_notifier_reports_unavailable() {
    let site = site().await;

    let (status, reply) = site
        .post_json(
            "/request",
            json!({ "phone": "+1 555 0100", "email": "a@b.c", "message": "hi" }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply["success"], false);
}

#[tokio::test]
async fn static_files_are_served_and_traversal_is_refused() {
    let site = site().await;

    let (status, _, body) = site.send(get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>home</h1>");

    let (status, _, _) = site.send(get("/missing.css")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = site.send(get("/..%2F..%2Fetc%2Fpasswd")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_page_is_gated_under_every_spelling() {
    let site = site().await;

    for uri in [
        "/admin.html",
        "//admin.html",
        "/%61dmin.html",
        "/./admin.html",
        "/admin.html/",
        "/ADMIN.html",
    ] {
        let (status, headers, body) = site.send(get(uri)).await;
        assert!(status.is_redirection(), "{uri} answered {status}");
        assert_eq!(headers[header::LOCATION], "/login.html", "{uri}");
        assert_ne!(body, b"<h1>admin</h1>", "{uri}");
    }

    let cookie = site.login("admin123").await.expect("login");
    let request = Request::get("//admin.html")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let (status, _, body) = site.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>admin</h1>");
}

#[tokio::test]
async fn file_path_with_trailing_segment_is_not_found() {
    let site = site().await;

    let (status, _, _) = site.send(get("/index.html/style.css")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn corrupt_collection_fails_requests_and_stays_on_disk() {
    let corrupt = r#"[{ "id": 1, "title": "precious", "#;
    let (site, report) = warmed_site(|root| {
        std::fs::write(root.join("data/materials.json"), corrupt).expect("seed materials");
    })
    .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, Collection::Materials);

    let (status, _, _) = site.send(get("/materials")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _, body) = site
        .send(multipart(
            "/materials",
            &[
                Part::Text("title", "Overwrite"),
                Part::Text("content", "should not land"),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let reply: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(reply["success"], false);

    let (status, _) = site
        .post_json("/materials/delete", json!({ "id": 1 }), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let on_disk =
        std::fs::read_to_string(site.dir.path().join("data/materials.json")).expect("read");
    assert_eq!(on_disk, corrupt);

    let (status, gallery) = site.get_json("/gallery").await;
    assert_eq!(status, StatusCode::OK, "other collections keep working");
    assert_eq!(gallery, json!([]));
}
