//! In-memory WordPress site served through wiremock.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use wpbm_client::{ClientOptions, RetryPolicy, WpClient};
use wpbm_core::Site;

const API_PREFIX: &str = "/wp-json/wpbm/v1/";

#[derive(Default)]
pub struct SiteState {
    pub posts: BTreeMap<u64, Value>,
    pub media: BTreeMap<u64, Value>,
    pub files: HashMap<String, Vec<u8>>,
    pub plugins: Vec<Value>,
    /// Content ids whose updates answer 500.
    pub failing_updates: HashSet<u64>,
    /// Post types whose listing answers 500.
    pub failing_listings: HashSet<String>,
    /// Plugin files whose update reports `success: false`.
    pub refused_updates: HashSet<String>,
    /// `METHOD path` of every request, in order.
    pub requests: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeSite {
    pub state: Arc<Mutex<SiteState>>,
}

fn wp_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "code": code, "message": message, "data": {"status": status}
    }))
}

fn query(request: &Request, name: &str) -> Option<String> {
    request.url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}

fn page_of<T: Clone>(items: &[T], request: &Request) -> Vec<T> {
    let limit: usize = query(request, "limit").and_then(|v| v.parse().ok()).unwrap_or(100);
    let page: usize = query(request, "page").and_then(|v| v.parse().ok()).unwrap_or(1);
    items.iter().skip((page - 1) * limit).take(limit).cloned().collect()
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any()).respond_with(self.clone()).mount(&server).await;
        server
    }

    /// Client with caching off and no retries.
    pub fn client(server: &MockServer) -> WpClient {
        let options = ClientOptions { cache_enabled: false, request_interval_ms: 0, ..Default::default() };
        WpClient::new(Site::new("acme", server.uri(), "test-key"), options)
            .unwrap()
            .with_retry_policy(RetryPolicy::none())
    }

    pub fn add_post(&self, id: u64, kind: &str, title: &str, content: &str) {
        self.add_post_with(id, kind, title, content, 0);
    }

    pub fn add_post_with(&self, id: u64, kind: &str, title: &str, content: &str, featured_media: u64) {
        let post = json!({
            "id": id, "type": kind, "status": "publish",
            "title": {"rendered": title}, "content": {"rendered": content},
            "link": format!("https://acme.example/?p={id}"),
            "featured_media": featured_media,
            "modified": "2024-05-01T10:00:00"
        });
        self.state.lock().unwrap().posts.insert(id, post);
    }

    pub fn add_media(&self, server_uri: &str, id: u64, filename: &str, bytes: &[u8]) {
        self.add_media_at(server_uri, id, &format!("/wp-content/uploads/2024/05/{filename}"), bytes);
    }

    /// Attachment served from an explicit upload path.
    pub fn add_media_at(&self, server_uri: &str, id: u64, path: &str, bytes: &[u8]) {
        let filename = path.rsplit('/').next().unwrap_or(path);
        let mut state = self.state.lock().unwrap();
        state.media.insert(
            id,
            json!({
                "id": id, "title": filename, "filename": filename,
                "url": format!("{server_uri}{path}"), "mime_type": "image/jpeg",
                "file_size": bytes.len()
            }),
        );
        state.files.insert(path.to_string(), bytes.to_vec());
    }

    pub fn add_plugin(&self, file: &str, version: &str, active: bool, update_to: Option<&str>) {
        self.state.lock().unwrap().plugins.push(json!({
            "plugin_file": file, "name": file.split('/').next().unwrap_or(file),
            "version": version, "active": active,
            "update_available": update_to.is_some(), "update_version": update_to
        }));
    }

    pub fn post(&self, id: u64) -> Value {
        self.state.lock().unwrap().posts[&id].clone()
    }

    pub fn post_content(&self, id: u64) -> String {
        self.post(id)["content"]["rendered"].as_str().unwrap_or_default().to_string()
    }

    pub fn requests(&self, prefix: &str) -> Vec<String> {
        self.state.lock().unwrap().requests.iter().filter(|r| r.starts_with(prefix)).cloned().collect()
    }

    pub fn plugin(&self, file: &str) -> Option<Value> {
        self.state.lock().unwrap().plugins.iter().find(|p| p["plugin_file"] == file).cloned()
    }

    fn handle(&self, request: &Request) -> ResponseTemplate {
        let method = request.method.as_str().to_string();
        let full_path = request.url.path().to_string();
        let mut state = self.state.lock().unwrap();
        state.requests.push(format!("{method} {full_path}"));

        let Some(route) = full_path.strip_prefix(API_PREFIX) else {
            return match state.files.get(&full_path) {
                Some(bytes) if method == "GET" => ResponseTemplate::new(200).set_body_bytes(bytes.clone()),
                _ => ResponseTemplate::new(404),
            };
        };
        let segments: Vec<&str> = route.split('/').collect();
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);

        match (method.as_str(), segments.as_slice()) {
            ("GET", ["content"]) => {
                let kind = query(request, "type").unwrap_or_else(|| "post".into());
                if state.failing_listings.contains(&kind) {
                    return wp_error(500, "internal_error", "database went away");
                }
                let all: Vec<Value> = state.posts.values().filter(|p| p["type"] == kind.as_str()).cloned().collect();
                let page = page_of(&all, request);
                ResponseTemplate::new(200).set_body_json(json!({"posts": page, "total": all.len()}))
            }
            ("GET", ["content", id]) => match id.parse().ok().and_then(|id: u64| state.posts.get(&id)) {
                Some(post) => ResponseTemplate::new(200).set_body_json(json!({"post": post})),
                None => wp_error(404, "not_found", "Post not found"),
            },
            ("PUT", ["content", id]) => {
                let Some(id) = id.parse::<u64>().ok().filter(|id| state.posts.contains_key(id)) else {
                    return wp_error(404, "not_found", "Post not found");
                };
                if state.failing_updates.contains(&id) {
                    return wp_error(500, "internal_error", "update failed");
                }
                let Some(post) = state.posts.get_mut(&id) else {
                    return wp_error(404, "not_found", "Post not found");
                };
                for field in ["title", "content"] {
                    if let Some(v) = body.get(field) {
                        post[field] = json!({"rendered": v});
                    }
                }
                if let Some(v) = body.get("status") {
                    post["status"] = v.clone();
                }
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "post": post}))
            }
            ("GET", ["media"]) => {
                let all: Vec<Value> = state.media.values().cloned().collect();
                ResponseTemplate::new(200).set_body_json(json!({"media": page_of(&all, request)}))
            }
            ("GET", ["media", id]) => match id.parse().ok().and_then(|id: u64| state.media.get(&id)) {
                Some(m) => ResponseTemplate::new(200).set_body_json(json!({"media": m})),
                None => wp_error(404, "not_found", "Media not found"),
            },
            ("PUT", ["media", id]) => match id.parse().ok().and_then(|id: u64| state.media.get_mut(&id)) {
                Some(m) => {
                    if let Some(t) = body.get("title") {
                        m["title"] = t.clone();
                    }
                    ResponseTemplate::new(200).set_body_json(json!({"success": true}))
                }
                None => wp_error(404, "not_found", "Media not found"),
            },
            ("GET", ["plugins"]) => {
                let active = state.plugins.iter().filter(|p| p["active"] == true).count();
                ResponseTemplate::new(200).set_body_json(json!({
                    "plugins": state.plugins, "total": state.plugins.len(), "active_count": active
                }))
            }
            ("POST", ["plugins", "install-url"]) => {
                let url = body["url"].as_str().unwrap_or_default();
                let slug = url.rsplit('/').next().unwrap_or("plugin").trim_end_matches(".zip").to_string();
                let file = format!("{slug}/{slug}.php");
                state.plugins.push(json!({
                    "plugin_file": file, "name": slug, "version": "1.0.0", "active": false, "update_available": false
                }));
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "plugin_file": file}))
            }
            ("POST", ["plugins", "upload"]) => {
                state.plugins.push(json!({
                    "plugin_file": "uploaded/uploaded.php", "name": "uploaded", "version": "1.0.0",
                    "active": false, "update_available": false
                }));
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "plugin_file": "uploaded/uploaded.php"}))
            }
            ("POST", ["plugins", action]) => {
                let file = body["plugin_file"].as_str().unwrap_or_default().to_string();
                let refused = state.refused_updates.contains(&file);
                let Some(idx) = state.plugins.iter().position(|p| p["plugin_file"] == file.as_str()) else {
                    return wp_error(404, "plugin_not_found", "Plugin not found");
                };
                match *action {
                    "activate" => state.plugins[idx]["active"] = json!(true),
                    "deactivate" => state.plugins[idx]["active"] = json!(false),
                    "delete" => {
                        state.plugins.remove(idx);
                    }
                    "update" if refused => {
                        return ResponseTemplate::new(200)
                            .set_body_json(json!({"success": false, "error": "Download failed."}));
                    }
                    "update" => {
                        let plugin = &mut state.plugins[idx];
                        plugin["version"] = plugin["update_version"].clone();
                        plugin["update_available"] = json!(false);
                    }
                    _ => return wp_error(400, "invalid_action", "Unknown action"),
                }
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "plugin_file": file}))
            }
            _ => wp_error(404, "rest_no_route", "No route was found matching the URL and request method"),
        }
    }
}

impl Respond for FakeSite {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.handle(request)
    }
}
