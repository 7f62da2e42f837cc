use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{StatusCode, Url};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{DocumentSink, DocumentSource, PostSummary, PostsLayout, WriteReceipt};
use crate::config::{Identity, Settings};
use crate::document::Draft;
use crate::error::{StoreError, StoreResult};
use crate::slug::{check_slug, to_slug};

/// Entry of a directory listing from the contents API.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Single file from the contents API.
#[derive(Debug, Deserialize)]
struct ContentFile {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: String,
    content: String,
    committer: &'a Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Posts stored through the forge's REST contents API.
///
/// Every request carries the bearer token. Writes are a single create-or-replace
/// commit; the current blob sha is looked up first because the API refuses to
/// replace an existing file without it.
#[derive(Debug, Clone)]
pub struct ContentsGateway {
    client: Client,
    contents_url: Url,
    layout: PostsLayout,
    committer: Identity,
    branch: Option<String>,
}

fn gh_client(token: &str, timeout: Duration) -> StoreResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static("gitpost"));
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        StoreError::ConfigurationMissing(vec![
            "access token usable in an HTTP header".to_string(),
        ])
    })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

impl ContentsGateway {
    pub fn new(settings: &Settings) -> StoreResult<Self> {
        let mut contents_url = Url::parse(&settings.api_base).map_err(|e| {
            StoreError::ConfigurationMissing(vec![format!(
                "valid api_base ({}: {})",
                settings.api_base, e
            )])
        })?;
        contents_url
            .path_segments_mut()
            .map_err(|_| {
                StoreError::ConfigurationMissing(vec![format!(
                    "http(s) api_base ({})",
                    settings.api_base
                )])
            })?
            .pop_if_empty()
            .extend(["repos", settings.owner.as_str(), settings.repo.as_str(), "contents"]);

        Ok(ContentsGateway {
            client: gh_client(&settings.token, settings.timeout)?,
            contents_url,
            layout: PostsLayout::new(&settings.posts_dir, &settings.extension),
            committer: settings.author.clone(),
            branch: settings.branch.clone(),
        })
    }

    /// `path` split on `/`, each segment percent-encoded, so names holding
    /// `#`, `?` or `%` address the file and not a fragment or query.
    fn url(&self, path: &str) -> Url {
        let mut url = self.contents_url.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    fn get(&self, path: &str) -> StoreResult<Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(b) = &self.branch {
            req = req.query(&[("ref", b.as_str())]);
        }
        send("GET", path, req)
    }

    /// Blob sha of the file at `path`, `None` when it does not exist yet.
    fn current_sha(&self, path: &str) -> StoreResult<Option<String>> {
        let resp = self.get(path)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let file: ContentFile = resp.json()?;
                Ok(Some(file.sha))
            }
            _ => Err(upstream_error(resp)),
        }
    }
}

fn send(method: &str, path: &str, req: RequestBuilder) -> StoreResult<Response> {
    let resp = req.send()?;
    debug!(method, path, status = resp.status().as_u16(), "github contents api");
    Ok(resp)
}

/// Build an upstream failure from a non-success response, keeping GitHub's `message`.
fn upstream_error(resp: Response) -> StoreError {
    let status = resp.status();
    let message = resp
        .json::<ApiError>()
        .map(|e| e.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
    StoreError::upstream(Some(status.as_u16()), message)
}

fn decode_content(file: &ContentFile) -> StoreResult<String> {
    if file.encoding.as_deref() == Some("none") {
        return Err(StoreError::upstream(
            None,
            "file is too large to be served by the contents API",
        ));
    }
    // GitHub wraps base64 at 60 columns
    let compact: String = file
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| StoreError::upstream(None, format!("invalid base64 content: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl DocumentSource for ContentsGateway {
    fn list(&self) -> StoreResult<Vec<PostSummary>> {
        let resp = self.get(&self.layout.dir)?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(dir = %self.layout.dir, "posts directory does not exist yet");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(upstream_error(resp));
        }

        match resp.json::<Value>()? {
            Value::Array(entries) => Ok(entries
                .into_iter()
                .filter_map(|e| serde_json::from_value::<ContentEntry>(e).ok())
                .filter(|e| e.kind == "file")
                .filter_map(|e| self.layout.summary(&e.name))
                .collect()),
            Value::Object(obj) if obj.get("message").and_then(Value::as_str) == Some("Not Found") => {
                Ok(Vec::new())
            }
            _ => Err(StoreError::upstream(
                Some(status.as_u16()),
                "Unexpected response from GitHub API.",
            )),
        }
    }

    fn read(&self, slug: &str) -> StoreResult<String> {
        check_slug(slug)?;
        let path = self.layout.path(slug);
        let resp = self.get(&path)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(StoreError::not_found(slug)),
            s if s.is_success() => {
                let file: ContentFile = resp.json()?;
                decode_content(&file)
            }
            _ => Err(upstream_error(resp)),
        }
    }
}

impl DocumentSink for ContentsGateway {
    fn write(&self, draft: &Draft) -> StoreResult<WriteReceipt> {
        let slug = to_slug(&draft.title);
        let path = self.layout.path(&slug);
        let sha = self.current_sha(&path)?;

        let verb = if sha.is_some() { "update" } else { "add new" };
        let body = PutContents {
            message: format!("docs: {} post \"{}\"", verb, draft.title),
            content: BASE64.encode(draft.encode()),
            committer: &self.committer,
            sha,
            branch: self.branch.as_deref(),
        };

        let resp = send("PUT", &path, self.client.put(self.url(&path)).json(&body))?;
        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => {
                info!(%slug, path = %path, "post written via contents api");
                Ok(WriteReceipt {
                    file_name: self.layout.file_name(&slug),
                    slug,
                })
            }
            _ => Err(upstream_error(resp)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteVia;
    use crate::error::ErrorKind;
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;
    use regex::Regex;
    use serde_json::json;
    use std::path::PathBuf;

    fn settings(api_base: String) -> Settings {
        Settings {
            owner: "octocat".into(),
            repo: "notes".into(),
            token: "t0k".into(),
            api_base,
            posts_dir: "_posts".into(),
            extension: "md".into(),
            write_via: WriteVia::Api,
            branch: None,
            remote_url: String::new(),
            author: Identity::default(),
            scratch_dir: PathBuf::from("/tmp/unused"),
            timeout: Duration::from_secs(5),
        }
    }

    fn gateway(server: &MockServer) -> ContentsGateway {
        ContentsGateway::new(&settings(server.base_url())).unwrap()
    }

    fn at_noon() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    /// `"content":"<base64>"` as it appears in the PUT body for `raw`.
    fn content_field(raw: &str) -> String {
        format!(r#""content":"{}""#, BASE64.encode(raw))
    }

    #[test]
    fn list_keeps_only_markdown_files() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/octocat/notes/contents/_posts")
                .header("authorization", "Bearer t0k");
            then.status(200).json_body(json!([
                {"name": "my-first-post.md", "type": "file"},
                {"name": "hello-world.md", "type": "file"},
                {"name": "drafts", "type": "dir"},
                {"name": "cover.png", "type": "file"}
            ]));
        });

        let posts = gateway(&server).list().unwrap();
        m.assert();
        assert_eq!(
            posts,
            vec![
                PostSummary {
                    slug: "my-first-post".into(),
                    title: "my first post".into()
                },
                PostSummary {
                    slug: "hello-world".into(),
                    title: "hello world".into()
                },
            ]
        );
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });
        assert!(gateway(&server).list().unwrap().is_empty());
    }

    #[test]
    fn list_failure_keeps_status_and_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts");
            then.status(401).json_body(json!({"message": "Bad credentials"}));
        });
        match gateway(&server).list().unwrap_err() {
            StoreError::Upstream { status, message } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn list_rejects_non_directory_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts");
            then.status(200)
                .json_body(json!({"name": "_posts", "type": "file", "sha": "abc"}));
        });
        let err = gateway(&server).list().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
    }

    #[test]
    fn read_decodes_wrapped_base64() {
        let raw = "---\ntitle: \"Draft\"\ndate: 2026-10-16T12:00:00.000Z\n---\n\nbody";
        let encoded = BASE64.encode(raw);
        let wrapped = format!("{}\n{}\n", &encoded[..20], &encoded[20..]);

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts/draft.md");
            then.status(200).json_body(json!({
                "name": "draft.md",
                "sha": "abc123",
                "encoding": "base64",
                "content": wrapped
            }));
        });
        assert_eq!(gateway(&server).read("draft").unwrap(), raw);
    }

    #[test]
    fn read_missing_post_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/repos/octocat/notes/contents/_posts/does-not-exist.md");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });
        let err = gateway(&server).read("does-not-exist").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn read_server_error_is_upstream() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts/x.md");
            then.status(500).body("oops");
        });
        match gateway(&server).read("x").unwrap_err() {
            StoreError::Upstream { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn read_with_unsafe_slug_makes_no_request() {
        let server = MockServer::start();
        let any = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });
        let err = gateway(&server).read("../secrets").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        any.assert_hits(0);
    }

    #[test]
    fn read_uses_configured_branch() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/octocat/notes/contents/_posts/a.md")
                .query_param("ref", "pages");
            then.status(200)
                .json_body(json!({"sha": "s", "content": BASE64.encode("hi")}));
        });
        let mut s = settings(server.base_url());
        s.branch = Some("pages".into());
        let gw = ContentsGateway::new(&s).unwrap();
        assert_eq!(gw.read("a").unwrap(), "hi");
        m.assert();
    }

    #[test]
    fn listed_names_with_url_metacharacters_read_back() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts");
            then.status(200)
                .json_body(json!([{"name": "c#-notes.md", "type": "file"}]));
        });
        let file = server.mock(|when, then| {
            when.method(GET)
                .path_matches(Regex::new(r"/contents/_posts/c(%23|#)-notes\.md$").unwrap());
            then.status(200)
                .json_body(json!({"sha": "s", "content": BASE64.encode("sharp")}));
        });

        let gw = gateway(&server);
        let listed = gw.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "c#-notes");
        assert_eq!(gw.read(&listed[0].slug).unwrap(), "sharp");
        file.assert();
    }

    #[test]
    fn url_segments_are_percent_encoded() {
        let server = MockServer::start();
        let gw = gateway(&server);
        let url = gw.url("_posts/c#-notes?.md");
        assert!(url.path().ends_with("/contents/_posts/c%23-notes%3F.md"));
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn malformed_api_base_is_a_configuration_error() {
        let err = ContentsGateway::new(&settings("not a url".into())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationMissing);
    }

    #[test]
    fn write_creates_new_post() {
        let server = MockServer::start();
        let lookup = server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts/draft.md");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/repos/octocat/notes/contents/_posts/draft.md")
                .header("authorization", "Bearer t0k")
                .body_contains(r#""message":"docs: add new post \"Draft\"""#)
                .body_contains(r#""committer":{"name":"gitpost","email":"gitpost@users.noreply.github.com"}"#)
                .body_contains(content_field(
                    "---\ntitle: \"Draft\"\ndate: 2026-10-16T12:00:00.000Z\n---\n\nbody",
                ));
            then.status(201).json_body(json!({"content": {"name": "draft.md"}}));
        });

        let receipt = gateway(&server)
            .write(&Draft::new("Draft", "body", at_noon()))
            .unwrap();
        lookup.assert();
        put.assert();
        assert_eq!(receipt.slug, "draft");
        assert_eq!(receipt.file_name, "draft.md");
    }

    #[test]
    fn write_replaces_existing_post_with_its_sha() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts/hello-world.md");
            then.status(200).json_body(json!({"sha": "abc123", "content": ""}));
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/repos/octocat/notes/contents/_posts/hello-world.md")
                .body_contains(r#""sha":"abc123""#)
                .body_contains("docs: update post")
                .body_contains(content_field(
                    "---\ntitle: \"Hello, World!\"\ndate: 2026-10-16T12:00:00.000Z\n---\n\nsecond\n  kept as is\n",
                ));
            then.status(200).json_body(json!({}));
        });

        gateway(&server)
            .write(&Draft::new("Hello, World!", "second\n  kept as is\n", at_noon()))
            .unwrap();
        put.assert();
    }

    #[test]
    fn write_conflict_surfaces_as_upstream() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/notes/contents/_posts/race.md");
            then.status(200).json_body(json!({"sha": "old", "content": ""}));
        });
        server.mock(|when, then| {
            when.method(PUT).path("/repos/octocat/notes/contents/_posts/race.md");
            then.status(409)
                .json_body(json!({"message": "_posts/race.md does not match old"}));
        });
        match gateway(&server)
            .write(&Draft::new("Race", "b", Utc::now()))
            .unwrap_err()
        {
            StoreError::Upstream { status, message } => {
                assert_eq!(status, Some(409));
                assert!(message.contains("does not match"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unreachable_forge_is_upstream() {
        let gw = ContentsGateway::new(&settings("http://127.0.0.1:9".into())).unwrap();
        assert_eq!(gw.list().unwrap_err().kind(), ErrorKind::UpstreamFailure);
    }
}
