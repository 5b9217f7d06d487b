//! End-to-end download runs against a local HTTP server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use civitdl_api::{CatalogClientConfig, DefaultCatalogClient};
use civitdl_core::{
    CatalogError, DownloadConfig, EntryStatus, EntryStore, MemoryKvStore, ModelQuery, RetryPolicy,
    SidecarOptions,
};
use civitdl_download::{CandidateSource, DownloadPipeline, PipelineError, RunProgress};
use serde_json::json;
use sha2::{Digest, Sha256};

const BODY: &[u8] = b"pretend these are safetensors weights";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR fake image";

fn sha256(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

fn crc32(bytes: &[u8]) -> String {
    format!("{:08X}", crc32fast::hash(bytes))
}

struct Harness {
    server: mockito::ServerGuard,
    dir: tempfile::TempDir,
    store: EntryStore,
}

impl Harness {
    async fn new() -> Self {
        Self {
            server: mockito::Server::new_async().await,
            dir: tempfile::tempdir().unwrap(),
            store: EntryStore::new(Arc::new(MemoryKvStore::new())),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn pipeline(&self, sidecars: SidecarOptions) -> DownloadPipeline {
        self.pipeline_limited(sidecars, 0)
    }

    fn pipeline_limited(&self, sidecars: SidecarOptions, user_limit: usize) -> DownloadPipeline {
        let client_config = CatalogClientConfig::new()
            .with_base_url(format!("{}/api/v1", self.server.url()))
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::new(0, 10));
        let client = DefaultCatalogClient::new(&client_config).unwrap();
        let fetcher = client.fetcher().clone();

        let config = DownloadConfig {
            save_root: self.root().to_path_buf(),
            concurrency: 2,
            api_delay: Duration::ZERO,
            sidecars,
            user_limit,
            ..Default::default()
        };
        DownloadPipeline::new(config, Arc::new(client), self.store.clone(), fetcher).unwrap()
    }

    /// Model 10 / version 100 / file 1000 served from `/files/1000`.
    fn model_json(&self, file_name: &str, sha: &str, crc: &str) -> String {
        json!({
            "id": 10,
            "name": "toon",
            "type": "CKPT",
            "modelVersions": [{
                "id": 100,
                "modelId": 10,
                "name": "v1",
                "baseModel": "SD1.5",
                "files": [{
                    "id": 1000,
                    "name": file_name,
                    "sizeKB": 1.0,
                    "primary": true,
                    "metadata": {"format": "SafeTensor", "fp": "fp16", "size": "pruned"},
                    "hashes": {"SHA256": sha, "CRC32": crc},
                    "downloadUrl": format!("{}/files/1000", self.server.url()),
                }],
                "images": [{"id": 55, "url": format!("{}/img/55.jpg", self.server.url())}],
            }],
        })
        .to_string()
    }

    async fn serve_model(&mut self, body: String) -> mockito::Mock {
        self.server
            .mock("GET", "/api/v1/models/10")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    fn target_dir(&self) -> PathBuf {
        self.root().join("CKPT").join("toon").join("SD1.5")
    }
}

fn source() -> CandidateSource {
    CandidateSource::ModelId {
        id: 10,
        all_versions: false,
    }
}

fn tmp_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|x| x == "tmp"))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn fresh_download_then_rerun_is_a_no_op() {
    let mut h = Harness::new().await;
    let body = h.model_json("toon.safetensors", &sha256(BODY), &crc32(BODY));
    let _model = h.serve_model(body).await;
    let file = h
        .server
        .mock("GET", "/files/1000")
        .with_status(200)
        .with_body(BODY)
        .expect(1)
        .create_async()
        .await;

    let pipeline = h.pipeline(SidecarOptions::default());
    let plan = pipeline.plan(source()).await.unwrap();
    assert_eq!(plan.jobs.len(), 1);
    assert_eq!(plan.total_bytes, 1024);

    let report = pipeline.run(plan.jobs, RunProgress::quiet()).await;
    assert_eq!(report.summary.downloaded, 1);
    assert!(report.fatal.is_none());

    let path = h.target_dir().join("100_toon.safetensors");
    assert_eq!(std::fs::read(&path).unwrap(), BODY);
    assert!(tmp_files(&h.target_dir()).is_empty());

    let entry = h.store.get("v_100").await.unwrap();
    assert_eq!(entry.status, EntryStatus::Downloaded);
    assert_eq!(entry.folder, "CKPT/toon/SD1.5");
    assert_eq!(entry.filename, "100_toon.safetensors");
    assert!(entry.error_details.is_empty());

    // Second run over the same catalog state does nothing.
    let plan = h.pipeline(SidecarOptions::default()).plan(source()).await.unwrap();
    assert!(plan.jobs.is_empty());
    assert_eq!(h.store.get("v_100").await.unwrap(), entry);

    file.assert_async().await;
}

#[tokio::test]
async fn hash_mismatch_marks_error_and_leaves_nothing() {
    let mut h = Harness::new().await;
    let body = h.model_json("toon.safetensors", &"AB".repeat(32), &crc32(BODY));
    let _model = h.serve_model(body).await;
    let _file = h
        .server
        .mock("GET", "/files/1000")
        .with_status(200)
        .with_body(BODY)
        .create_async()
        .await;

    let pipeline = h.pipeline(SidecarOptions::default());
    let plan = pipeline.plan(source()).await.unwrap();
    let report = pipeline.run(plan.jobs, RunProgress::quiet()).await;
    assert_eq!(report.summary.failed, 1);
    assert!(report.summary.all_failed());

    assert!(!h.target_dir().join("100_toon.safetensors").exists());
    assert!(tmp_files(&h.target_dir()).is_empty());

    let entry = h.store.get("v_100").await.unwrap();
    assert_eq!(entry.status, EntryStatus::Error);
    assert_eq!(entry.error_details, "downloaded file hash mismatch");
}

#[tokio::test]
async fn content_type_corrects_extension() {
    let mut h = Harness::new().await;
    let body = h.model_json("preview.jpg", &sha256(PNG), &crc32(PNG));
    let _model = h.serve_model(body).await;
    let _file = h
        .server
        .mock("GET", "/files/1000")
        .with_status(200)
        .with_body(PNG)
        .create_async()
        .await;

    let pipeline = h.pipeline(SidecarOptions::default());
    let plan = pipeline.plan(source()).await.unwrap();
    let report = pipeline.run(plan.jobs, RunProgress::quiet()).await;
    assert_eq!(report.summary.downloaded, 1);

    assert!(h.target_dir().join("100_preview.png").exists());
    assert!(!h.target_dir().join("100_preview.jpg").exists());
    let entry = h.store.get("v_100").await.unwrap();
    assert_eq!(entry.filename, "100_preview.png");
}

#[tokio::test]
async fn content_disposition_names_the_file() {
    let mut h = Harness::new().await;
    let body = h.model_json("toon.safetensors", &sha256(BODY), &crc32(BODY));
    let _model = h.serve_model(body).await;
    let _file = h
        .server
        .mock("GET", "/files/1000")
        .with_status(200)
        .with_header(
            "content-disposition",
            r#"attachment; filename="toonMix v2.safetensors""#,
        )
        .with_body(BODY)
        .create_async()
        .await;

    let pipeline = h.pipeline(SidecarOptions::default());
    let plan = pipeline.plan(source()).await.unwrap();
    pipeline.run(plan.jobs, RunProgress::quiet()).await;

    let entry = h.store.get("v_100").await.unwrap();
    assert_eq!(entry.filename, "100_toonMix_v2.safetensors");
    assert!(h.target_dir().join(&entry.filename).exists());
}

#[tokio::test]
async fn sidecars_and_images_are_written() {
    let mut h = Harness::new().await;
    let body = h.model_json("toon.safetensors", &sha256(BODY), &crc32(BODY));
    let _model = h.serve_model(body).await;
    let _file = h
        .server
        .mock("GET", "/files/1000")
        .with_status(200)
        .with_body(BODY)
        .create_async()
        .await;
    let image = h
        .server
        .mock("GET", "/img/55.jpg")
        .with_status(200)
        .with_body(PNG)
        .expect(1)
        .create_async()
        .await;

    let sidecars = SidecarOptions {
        metadata: true,
        model_info: true,
        version_images: true,
        model_images: false,
    };
    let pipeline = h.pipeline(sidecars);
    let plan = pipeline.plan(source()).await.unwrap();
    let report = pipeline.run(plan.jobs, RunProgress::quiet()).await;
    assert_eq!(report.summary.images_downloaded, 1);

    let dir = h.target_dir();
    let metadata: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.join("100_toon.json")).unwrap()).unwrap();
    assert_eq!(metadata["id"], 100);
    assert_eq!(metadata["files"][0]["id"], 1000);

    let info = h.root().join("CKPT").join("toon").join("10-toon.json");
    assert!(info.exists());

    // Served as PNG despite the .jpg URL.
    assert!(dir.join("images").join("55.png").exists());

    // With image flags set, a downloaded version is revisited, but the
    // image already on disk (under another extension) is not fetched again.
    let plan = h.pipeline(sidecars).plan(source()).await.unwrap();
    assert_eq!(plan.jobs.len(), 1);
    let report = h
        .pipeline(sidecars)
        .run(plan.jobs, RunProgress::quiet())
        .await;
    assert_eq!(report.summary.already_present, 1);
    assert_eq!(report.summary.images_skipped, 1);

    image.assert_async().await;
}

#[tokio::test]
async fn unauthorized_catalog_aborts_the_plan() {
    let mut h = Harness::new().await;
    let _models = h
        .server
        .mock("GET", "/api/v1/models")
        .match_query(mockito::Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let err = h
        .pipeline(SidecarOptions::default())
        .plan(CandidateSource::Query(ModelQuery::default()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Catalog(CatalogError::Unauthorized { status: 401 })
    ));
    assert!(h.store.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_first_page_yields_no_jobs() {
    let mut h = Harness::new().await;
    let _models = h
        .server
        .mock("GET", "/api/v1/models")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items":[],"metadata":{"nextCursor":"x"}}"#)
        .create_async()
        .await;

    let plan = h
        .pipeline(SidecarOptions::default())
        .plan(CandidateSource::Query(ModelQuery::default()))
        .await
        .unwrap();
    assert!(plan.jobs.is_empty());
    assert!(plan.aborted.is_none());
}

/// Page 1 holds model 10 and points at a cursor page that is rate limited.
async fn serve_two_pages(h: &mut Harness) -> (mockito::Mock, mockito::Mock) {
    let model = h.model_json("toon.safetensors", &sha256(BODY), &crc32(BODY));
    let first = h
        .server
        .mock("GET", "/api/v1/models")
        .match_query(mockito::Matcher::Regex("period=[A-Za-z]+$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"items":[{model}],"metadata":{{"nextCursor":"p2"}}}}"#))
        .expect(1)
        .create_async()
        .await;
    let second = h
        .server
        .mock("GET", "/api/v1/models")
        .match_query(mockito::Matcher::UrlEncoded("cursor".into(), "p2".into()))
        .with_status(429)
        .expect(0)
        .create_async()
        .await;
    (first, second)
}

#[tokio::test]
async fn limit_filled_at_page_end_stops_before_next_page() {
    let mut h = Harness::new().await;
    let (first, second) = serve_two_pages(&mut h).await;

    let plan = h
        .pipeline_limited(SidecarOptions::default(), 1)
        .plan(CandidateSource::Query(ModelQuery::default()))
        .await
        .unwrap();
    assert_eq!(plan.jobs.len(), 1);
    assert!(plan.aborted.is_none());

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn meta_only_limit_stops_before_next_page() {
    let mut h = Harness::new().await;
    let (first, second) = serve_two_pages(&mut h).await;

    let written = h
        .pipeline_limited(SidecarOptions::default(), 1)
        .write_metadata_only(CandidateSource::Query(ModelQuery::default()))
        .await
        .unwrap();
    assert_eq!(written, 1);
    assert!(h.target_dir().join("100_toon.json").exists());

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn meta_only_writes_json_without_store_or_files() {
    let mut h = Harness::new().await;
    let body = h.model_json("toon.safetensors", &sha256(BODY), &crc32(BODY));
    let _model = h.serve_model(body).await;
    let file = h
        .server
        .mock("GET", "/files/1000")
        .expect(0)
        .create_async()
        .await;

    let sidecars = SidecarOptions {
        model_info: true,
        ..Default::default()
    };
    let written = h
        .pipeline(sidecars)
        .write_metadata_only(source())
        .await
        .unwrap();
    assert_eq!(written, 2);
    assert!(h.target_dir().join("100_toon.json").exists());
    assert!(h.store.scan().await.unwrap().is_empty());

    file.assert_async().await;
}

#[tokio::test]
async fn redownload_replaces_the_installed_file() {
    let mut h = Harness::new().await;
    let _version = h
        .server
        .mock("GET", "/api/v1/model-versions/100")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 100, "modelId": 10, "baseModel": "SD1.5",
                "files": [{
                    "id": 1000, "name": "toon.safetensors", "sizeKB": 1.0,
                    "metadata": {"format": "SafeTensor"},
                    "hashes": {"SHA256": sha256(BODY), "CRC32": crc32(BODY)},
                    "downloadUrl": format!("{}/files/1000", h.server.url()),
                }],
            })
            .to_string(),
        )
        .create_async()
        .await;
    let body = h.model_json("toon.safetensors", &sha256(BODY), &crc32(BODY));
    let _model = h.serve_model(body).await;
    let file = h
        .server
        .mock("GET", "/files/1000")
        .with_status(200)
        .with_body(BODY)
        .expect(2)
        .create_async()
        .await;

    let pipeline = h.pipeline(SidecarOptions::default());
    let plan = pipeline.plan(source()).await.unwrap();
    pipeline.run(plan.jobs, RunProgress::quiet()).await;

    let report = pipeline.redownload(100, RunProgress::quiet()).await.unwrap();
    assert_eq!(report.summary.downloaded, 1);
    assert_eq!(
        h.store.get("v_100").await.unwrap().status,
        EntryStatus::Downloaded
    );

    assert!(matches!(
        pipeline.redownload(999, RunProgress::quiet()).await,
        Err(PipelineError::UnknownVersion(999))
    ));

    file.assert_async().await;
}
