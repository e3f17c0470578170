use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use merico_agent::models::ErrorKind;
use merico_agent::{AnalysisKind, AnalysisPipeline, Config, DatasetStore};

fn records(items: &[(&str, &str)]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|(severity, kind)| json!({ "severity": severity, "type": kind, "ruleId": "no-doc" }))
            .collect(),
    )
}

async fn page(server: &MockServer, repo: &str, page: u32, data: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "id": repo, "page": page })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data, "totalPages": 2 })))
        .mount(server)
        .await;
}

fn config(server: &MockServer, output_dir: &std::path::Path) -> Config {
    let mut config = Config {
        api_url: format!("{}/uncommented", server.uri()),
        token: "secret".to_string(),
        ..Default::default()
    };
    config.request_settings.page_size = 2;
    config.request_settings.retry_delay = 0.0;
    config.request_settings.batch_delay = 0.0;
    config.request_settings.timeout = 5.0;
    config.output_settings.output_dir = output_dir.to_path_buf();
    config
}

#[tokio::test]
async fn mixed_batch_end_to_end() {
    let server = MockServer::start().await;
    page(&server, "A", 1, records(&[("high", "method"), ("low", "method")])).await;
    page(&server, "A", 2, records(&[("high", "function")])).await;
    page(&server, "C", 1, records(&[("medium", "method")])).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "id": "B" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());
    let pipeline = AnalysisPipeline::from_config(&config, AnalysisKind::Uncommented, false).unwrap();

    let ids = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let run = pipeline.run(&ids, &CancellationToken::new()).await.unwrap();
    let dataset = &run.dataset;

    assert_eq!(dataset.summary().total_projects, 3);
    assert_eq!(dataset.summary().successful_projects, 2);
    assert_eq!(dataset.summary().failed_projects, 1);
    assert_eq!(dataset.summary().total_function_count, 4);
    assert_eq!(dataset.by_severity()["high"], 2);
    assert_eq!(dataset.by_type()["method"], 3);
    assert_eq!(dataset.by_rule()["no-doc"], 4);
    assert_eq!(dataset.by_project()["A"], 3);
    assert_eq!(dataset.by_project()["C"], 1);
    assert!(!dataset.by_project().contains_key("B"));

    assert_eq!(dataset.errors().len(), 1);
    assert_eq!(dataset.errors()[0].repo_id, "B");
    assert_eq!(dataset.errors()[0].error_kind, ErrorKind::Http(500));
    assert_eq!(dataset.errors()[0].attempts_made, 3);

    let latest = DatasetStore::from_settings(&config.output_settings)
        .load_latest(AnalysisKind::Uncommented)
        .unwrap();
    assert_eq!(&latest, dataset);
    assert!(run.dataset_path.unwrap().exists());

    for name in [
        "classified_uncommented_report.md",
        "classified_uncommented_export.csv",
        "classified_uncommented_report.txt",
    ] {
        assert!(dir.path().join(name).exists(), "{} missing", name);
    }
}

#[tokio::test]
async fn cancelled_run_still_persists() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());
    let pipeline = AnalysisPipeline::from_config(&config, AnalysisKind::Uncommented, false).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let run = pipeline.run(&["A".to_string(), "B".to_string()], &cancel).await.unwrap();

    assert!(run.is_degraded());
    assert!(run
        .dataset
        .errors()
        .iter()
        .all(|e| e.error_kind == ErrorKind::Cancelled));
    assert!(dir.path().join("classified_uncommented_latest.json").exists());
}
