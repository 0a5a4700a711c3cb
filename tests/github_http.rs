//! HTTP-level tests for the GitHub forge.
//!
//! A wiremock server stands in for the GitHub REST API so the exact
//! requests (paths, headers, JSON bodies) and the status mapping can be
//! checked without network access.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sitepush::auth::StaticTokenProvider;
use sitepush::core::types::{BranchName, CommitAuthor, ObjectId};
use sitepush::forge::github::GitHubForge;
use sitepush::forge::{
    ArchiveFormat, CreateBlobRequest, CreateCommitRequest, EntryMode, Forge, ForgeError,
    ObjectKind, TreeEntryRequest, UpdateRefRequest,
};
use sitepush::publish::{PublishOptions, PublishRequest, Publisher};

const BLOB_SHA: &str = "ce013625030ba8dba906f756967f9e9ca394464a";
const TREE_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
const COMMIT_SHA: &str = "0123456789abcdef0123456789abcdef01234567";

fn forge(server: &MockServer) -> GitHubForge {
    GitHubForge::with_api_base(
        Arc::new(StaticTokenProvider::new("ghp_test_token", "github.com")),
        "octocat",
        "site",
        server.uri(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn id(sha: &str) -> ObjectId {
    ObjectId::new(sha).unwrap()
}

fn object(sha: &str, kind: &str) -> serde_json::Value {
    json!({
        "sha": sha,
        "url": format!("https://api.github.com/repos/octocat/site/git/{}/{}", kind, sha),
    })
}

// =============================================================================
// Individual endpoints
// =============================================================================

mod endpoints {
    use super::*;

    #[tokio::test]
    async fn create_blob_posts_base64_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/site/git/blobs"))
            .and(header("authorization", "Bearer ghp_test_token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(body_partial_json(json!({
                "content": "aGVsbG8K",
                "encoding": "base64",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(object(BLOB_SHA, "blobs")))
            .expect(1)
            .mount(&server)
            .await;

        let blob = forge(&server)
            .create_blob(CreateBlobRequest::base64(b"hello\n"))
            .await
            .unwrap();

        assert_eq!(blob, id(BLOB_SHA));
    }

    #[tokio::test]
    async fn create_tree_sends_typed_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/site/git/trees"))
            .and(body_partial_json(json!({
                "tree": [
                    {"path": "index.html", "mode": "100644", "type": "blob", "sha": BLOB_SHA},
                    {"path": "css", "mode": "040000", "type": "tree", "sha": TREE_SHA},
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(object(TREE_SHA, "trees")))
            .expect(1)
            .mount(&server)
            .await;

        let tree = forge(&server)
            .create_tree(vec![
                TreeEntryRequest {
                    name: "index.html".into(),
                    mode: EntryMode::File,
                    kind: ObjectKind::Blob,
                    id: id(BLOB_SHA),
                },
                TreeEntryRequest {
                    name: "css".into(),
                    mode: EntryMode::Directory,
                    kind: ObjectKind::Tree,
                    id: id(TREE_SHA),
                },
            ])
            .await
            .unwrap();

        assert_eq!(tree, id(TREE_SHA));
    }

    #[tokio::test]
    async fn create_commit_has_no_parents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/site/git/commits"))
            .and(body_partial_json(json!({
                "message": "Published with sitepush.",
                "tree": TREE_SHA,
                "parents": [],
                "author": {"name": "Mona", "email": "mona@example.com"},
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(object(COMMIT_SHA, "commits")))
            .expect(1)
            .mount(&server)
            .await;

        let author = CommitAuthor::now("Mona", "mona@example.com", None);
        let created = forge(&server)
            .create_commit(CreateCommitRequest {
                message: "Published with sitepush.".into(),
                tree: id(TREE_SHA),
                author: author.clone(),
                committer: author,
            })
            .await
            .unwrap();

        assert_eq!(created.id, id(COMMIT_SHA));
        assert!(created.url.ends_with(COMMIT_SHA));
    }

    #[tokio::test]
    async fn update_ref_patches_with_force() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/site/git/refs/heads/gh-pages"))
            .and(body_partial_json(json!({"sha": COMMIT_SHA, "force": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/gh-pages",
                "object": {"sha": COMMIT_SHA, "type": "commit"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        forge(&server)
            .update_ref(UpdateRefRequest {
                branch: BranchName::new("gh-pages").unwrap(),
                commit: id(COMMIT_SHA),
                commit_url: String::new(),
                force: true,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn archive_link_reads_redirect_location() {
        let server = MockServer::start().await;
        let download = "https://codeload.github.com/octocat/site/legacy.tar.gz/refs/heads/source";
        Mock::given(method("GET"))
            .and(path("/repos/octocat/site/tarball/source"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", download))
            .expect(1)
            .mount(&server)
            .await;

        let link = forge(&server)
            .archive_link(&BranchName::new("source").unwrap(), ArchiveFormat::Tarball)
            .await
            .unwrap();

        assert_eq!(link, download);
    }

    #[tokio::test]
    async fn current_user_reads_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "octocat",
                "name": "The Octocat",
                "email": null,
            })))
            .mount(&server)
            .await;

        let user = forge(&server).current_user().await.unwrap();

        assert_eq!(user.login, "octocat");
        assert_eq!(user.name.as_deref(), Some("The Octocat"));
        assert_eq!(user.email, None);
    }
}

// =============================================================================
// Status mapping
// =============================================================================

mod errors {
    use super::*;

    async fn blob_error(status: u16, body: serde_json::Value, headers: &[(&str, &str)]) -> ForgeError {
        let server = MockServer::start().await;
        let mut response = ResponseTemplate::new(status).set_body_json(body);
        for (name, value) in headers {
            response = response.insert_header(*name, *value);
        }
        Mock::given(method("POST"))
            .and(path("/repos/octocat/site/git/blobs"))
            .respond_with(response)
            .mount(&server)
            .await;

        forge(&server)
            .create_blob(CreateBlobRequest::base64(b"x"))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn unauthorized_is_auth_failed() {
        let err = blob_error(401, json!({"message": "Bad credentials"}), &[]).await;
        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn forbidden_with_exhausted_quota_is_rate_limited() {
        let err = blob_error(
            403,
            json!({"message": "API rate limit exceeded"}),
            &[("X-RateLimit-Remaining", "0")],
        )
        .await;
        assert_eq!(err, ForgeError::RateLimited);
    }

    #[tokio::test]
    async fn forbidden_is_permission_error() {
        let err = blob_error(
            403,
            json!({"message": "Resource not accessible by integration"}),
            &[("X-Accepted-GitHub-Permissions", "contents=write")],
        )
        .await;
        match err {
            ForgeError::AuthFailed(msg) => assert!(msg.contains("contents=write")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_carries_message() {
        let err = blob_error(404, json!({"message": "Not Found"}), &[]).await;
        assert_eq!(err, ForgeError::NotFound("Not Found".into()));
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let err = blob_error(429, json!({"message": "slow down"}), &[]).await;
        assert_eq!(err, ForgeError::RateLimited);
    }

    #[tokio::test]
    async fn validation_failure_is_api_error() {
        let err = blob_error(422, json!({"message": "Validation Failed"}), &[]).await;
        assert_eq!(
            err,
            ForgeError::ApiError {
                status: 422,
                message: "Validation Failed".into()
            }
        );
    }

    #[tokio::test]
    async fn server_error_is_api_error() {
        let err = blob_error(502, json!({"message": "Bad Gateway"}), &[]).await;
        assert!(matches!(err, ForgeError::ApiError { status: 502, .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let forge = GitHubForge::with_api_base(
            Arc::new(StaticTokenProvider::new("ghp_test_token", "github.com")),
            "octocat",
            "site",
            uri,
            Duration::from_secs(2),
        )
        .unwrap();

        let err = forge
            .create_blob(CreateBlobRequest::base64(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::NetworkError(_)));
    }
}

// =============================================================================
// Full publish over HTTP
// =============================================================================

#[tokio::test]
async fn publish_single_file_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/site/git/blobs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(object(BLOB_SHA, "blobs")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/site/git/trees"))
        .and(body_partial_json(json!({
            "tree": [{"path": "index.html", "mode": "100644", "type": "blob", "sha": BLOB_SHA}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(object(TREE_SHA, "trees")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/site/git/commits"))
        .and(body_partial_json(json!({"tree": TREE_SHA, "parents": []})))
        .respond_with(ResponseTemplate::new(201).set_body_json(object(COMMIT_SHA, "commits")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/octocat/site/git/refs/heads/gh-pages"))
        .and(body_partial_json(json!({"sha": COMMIT_SHA, "force": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ref": "refs/heads/gh-pages"})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("index.html"), "hello\n").unwrap();
    let forge = forge(&server);
    let request = PublishRequest {
        owner: "octocat".into(),
        repo: "site".into(),
        source_dir: temp.path().to_path_buf(),
        branch: BranchName::new("gh-pages").unwrap(),
        author: CommitAuthor::now("Mona", "mona@example.com", None),
        message: "Published with sitepush.".into(),
    };

    let outcome = Publisher::new(&forge, PublishOptions::default())
        .publish(&request)
        .await
        .unwrap();

    assert_eq!(outcome.commit, id(COMMIT_SHA));
    assert_eq!(outcome.root_tree, id(TREE_SHA));

    // Requests arrive strictly in stage order.
    let requests = server.received_requests().await.unwrap();
    let paths: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "/repos/octocat/site/git/blobs",
            "/repos/octocat/site/git/trees",
            "/repos/octocat/site/git/commits",
            "/repos/octocat/site/git/refs/heads/gh-pages",
        ]
    );
}
