use std::sync::Arc;

use chrono::Utc;
use paperlens_ai::{EnrichmentClient, fallback};
use paperlens_core::{IngestionResult, PaperId, PaperStore, PipelineConfig, PipelineStage, RelatedWork};
use serde::Serialize;

use crate::clock::{Sleeper, TokioSleeper};
use crate::enrichment::merge::{MergedMetadata, merge_refined};
use crate::error::IngestError;
use crate::extract::{ExtractedDocument, PageSource, extract_pages, extract_text};
use crate::sources::SemanticScholarExplorer;

/// An optional stage that fell back to its documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedStage {
    pub stage: PipelineStage,
    pub reason: String,
}

/// What happened during one ingestion, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub stages: Vec<PipelineStage>,
    pub degraded: Vec<DegradedStage>,
    pub fields_refined: Vec<String>,
}

impl IngestionReport {
    fn enter(&mut self, stage: PipelineStage) {
        tracing::info!(%stage, "stage started");
        self.stages.push(stage);
    }

    fn degrade(&mut self, stage: PipelineStage, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(%stage, %reason, "stage degraded");
        self.degraded.push(DegradedStage { stage, reason });
    }

    fn add_fields<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = &'static str>,
    {
        for field in fields {
            if !self.fields_refined.iter().any(|f| f == field) {
                self.fields_refined.push(field.to_string());
            }
        }
    }

    pub fn is_degraded(&self, stage: PipelineStage) -> bool {
        self.degraded.iter().any(|d| d.stage == stage)
    }
}

/// A persisted upload.
#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub id: PaperId,
    pub record: IngestionResult,
    pub report: IngestionReport,
}

/// Runs one upload through extraction, enrichment and persistence.
///
/// Stages run strictly in sequence. Only extraction and the final store write
/// can abort; every enrichment stage degrades to a fallback instead. The
/// pipeline holds no per-upload state, so one instance can serve concurrent
/// uploads.
pub struct IngestionPipeline {
    client: EnrichmentClient,
    explorer: Arc<SemanticScholarExplorer>,
    store: Arc<dyn PaperStore>,
    sleeper: Arc<dyn Sleeper>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(
        client: EnrichmentClient,
        explorer: Arc<SemanticScholarExplorer>,
        store: Arc<dyn PaperStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            explorer,
            store,
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Ingests an in-memory PDF.
    pub async fn ingest(&self, bytes: &[u8]) -> Result<IngestionOutcome, IngestError> {
        let mut report = IngestionReport::default();
        report.enter(PipelineStage::Extracting);
        let full_text = extract_text(bytes).map_err(|err| {
            tracing::error!(error = %err, "extraction failed, aborting upload");
            IngestError::Extraction(err)
        })?;
        self.pause_after(PipelineStage::Extracting).await;

        self.enrich_and_store(full_text, report).await
    }

    /// Ingests an already-opened document.
    pub async fn ingest_pages<P: PageSource + ?Sized>(
        &self,
        source: &P,
    ) -> Result<IngestionOutcome, IngestError> {
        let mut report = IngestionReport::default();
        report.enter(PipelineStage::Extracting);
        let full_text = extract_pages(source);
        self.pause_after(PipelineStage::Extracting).await;

        self.enrich_and_store(full_text, report).await
    }

    async fn enrich_and_store(
        &self,
        full_text: String,
        mut report: IngestionReport,
    ) -> Result<IngestionOutcome, IngestError> {
        report.enter(PipelineStage::MetadataHeuristics);
        let document = ExtractedDocument::from_text(full_text);
        self.pause_after(PipelineStage::MetadataHeuristics).await;

        let metadata = self.run_refining_stage(&document, &mut report).await;
        let summary = self.run_summary_stage(&document.full_text, &mut report).await;
        let keywords = self.run_keyword_stage(&document.full_text, &mut report).await;
        let related_work = self.run_related_work_stage(&metadata.title, &mut report).await;

        report.enter(PipelineStage::Merging);
        let record = IngestionResult {
            title: metadata.title,
            authors: metadata.authors,
            abstract_text: document.metadata.abstract_text,
            full_text: document.full_text,
            summary,
            keywords,
            year: metadata.year,
            upload_timestamp: Utc::now(),
            related_work,
        };
        self.pause_after(PipelineStage::Merging).await;

        let id = self.store.create(&record).map_err(|err| {
            tracing::error!(error = %err, "failed to save paper, aborting upload");
            IngestError::Persistence(err)
        })?;
        report.enter(PipelineStage::Persisted);
        tracing::info!(%id, title = %record.title, degraded = report.degraded.len(), "paper saved");

        Ok(IngestionOutcome { id, record, report })
    }

    async fn run_refining_stage(
        &self,
        document: &ExtractedDocument,
        report: &mut IngestionReport,
    ) -> MergedMetadata {
        report.enter(PipelineStage::MetadataRefining);
        let refined = match self.client.refine_metadata(&document.full_text).await {
            Ok(refined) => Some(refined),
            Err(failure) => {
                report.degrade(PipelineStage::MetadataRefining, failure.to_string());
                None
            }
        };

        let merged = merge_refined(&document.metadata, refined);
        report.add_fields(merged.fields_from_overlay.iter().copied());
        tracing::info!(title = %merged.title, "metadata resolved");
        self.pause_after(PipelineStage::MetadataRefining).await;
        merged
    }

    async fn run_summary_stage(&self, text: &str, report: &mut IngestionReport) -> String {
        report.enter(PipelineStage::Summarizing);
        let summary = match self.client.try_summarize(text).await {
            Ok(summary) => summary,
            Err(failure) => {
                report.degrade(PipelineStage::Summarizing, failure.to_string());
                fallback::summary_for(&failure)
            }
        };
        self.pause_after(PipelineStage::Summarizing).await;
        summary
    }

    async fn run_keyword_stage(&self, text: &str, report: &mut IngestionReport) -> Vec<String> {
        report.enter(PipelineStage::KeywordExtracting);
        let keywords = match self.client.try_extract_keywords(text).await {
            Ok(keywords) => keywords,
            Err(failure) => {
                report.degrade(PipelineStage::KeywordExtracting, failure.to_string());
                fallback::pipeline_keywords()
            }
        };
        self.pause_after(PipelineStage::KeywordExtracting).await;
        keywords
    }

    async fn run_related_work_stage(
        &self,
        title: &str,
        report: &mut IngestionReport,
    ) -> Vec<RelatedWork> {
        report.enter(PipelineStage::RelatedWorkSearching);
        let related = match self
            .explorer
            .try_find_related(title, self.config.related_work_limit)
            .await
        {
            Ok(related) => related,
            Err(err) => {
                report.degrade(PipelineStage::RelatedWorkSearching, err.to_string());
                Vec::new()
            }
        };
        self.pause_after(PipelineStage::RelatedWorkSearching).await;
        related
    }

    async fn pause_after(&self, stage: PipelineStage) {
        let gap = self.config.gap_after(stage);
        if !gap.is_zero() {
            tracing::debug!(%stage, gap_ms = gap.as_millis() as u64, "pacing before next stage");
            self.sleeper.sleep(gap).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use mockito::{Matcher, Server, ServerGuard};
    use paperlens_ai::{GenerativeModel, ModelError};
    use paperlens_core::text::SCANNED_DOCUMENT_PLACEHOLDER;
    use paperlens_core::{CoreError, ExplorerConfig, PaperSummaryView, SqlitePaperStore, StoredPaper};
    use serde_json::json;

    use super::*;
    use crate::clock::RecordingSleeper;
    use crate::extract::pdf::tests::FakePages;

    /// Answers each prompt kind with a fixed reply; `None` fails with
    /// `failure_status`.
    struct ScriptedModel {
        metadata: Option<String>,
        summary: Option<String>,
        keywords: Option<String>,
        failure_status: u16,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(metadata: Option<&str>, summary: Option<&str>, keywords: Option<&str>) -> Self {
            Self {
                metadata: metadata.map(ToOwned::to_owned),
                summary: summary.map(ToOwned::to_owned),
                keywords: keywords.map(ToOwned::to_owned),
                failure_status: 500,
                prompts: Mutex::default(),
            }
        }

        fn failing_with(mut self, status: u16) -> Self {
            self.failure_status = status;
            self
        }

        fn summary_calls(&self) -> usize {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.contains("Main Research Question"))
                .count()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let reply = if prompt.contains("Main Research Question") {
                &self.summary
            } else if prompt.contains("technical keywords") {
                &self.keywords
            } else {
                &self.metadata
            };
            reply.clone().ok_or_else(|| ModelError::Api {
                status: self.failure_status,
                message: "scripted failure".to_string(),
            })
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    struct BrokenStore;

    impl PaperStore for BrokenStore {
        fn create(&self, _record: &IngestionResult) -> paperlens_core::Result<PaperId> {
            Err(CoreError::ConfigError("disk full".to_string()))
        }

        fn find_by_id(&self, _id: &PaperId) -> paperlens_core::Result<Option<StoredPaper>> {
            Ok(None)
        }

        fn list(&self, _limit: usize, _offset: usize) -> paperlens_core::Result<Vec<PaperSummaryView>> {
            Ok(Vec::new())
        }

        fn count(&self) -> paperlens_core::Result<usize> {
            Ok(0)
        }
    }

    fn paper_pages() -> FakePages {
        let body = "Deep residual networks ease the training of very deep models. ".repeat(20);
        FakePages(vec![
            Some(format!(
                "Deep Residual Learning for Image Recognition\nKaiming He\n\nAbstract: {body}\n\n1 Introduction\nPublished 2016."
            )),
            Some("Results on ImageNet and CIFAR-10 show consistent gains.".to_string()),
        ])
    }

    fn explorer(server: &ServerGuard) -> Arc<SemanticScholarExplorer> {
        let config = ExplorerConfig {
            base_url: server.url(),
            api_key_env: "PAPERLENS_TEST_UNSET_S2_KEY".to_string(),
            ..ExplorerConfig::default()
        };
        Arc::new(
            SemanticScholarExplorer::new(&config)
                .unwrap()
                .with_sleeper(Arc::new(RecordingSleeper::new())),
        )
    }

    fn pipeline(
        model: Arc<ScriptedModel>,
        server: &ServerGuard,
        store: Arc<dyn PaperStore>,
        sleeper: Arc<RecordingSleeper>,
    ) -> IngestionPipeline {
        IngestionPipeline::new(
            EnrichmentClient::new(model),
            explorer(server),
            store,
            PipelineConfig::default(),
        )
        .with_sleeper(sleeper)
    }

    async fn search_ok(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "data": [
                        {"paperId": "a", "title": "Identity Mappings in Deep Residual Networks", "authors": [{"name": "Kaiming He"}], "citationCount": 9000, "year": 2016},
                        {"paperId": "b", "title": "Wide Residual Networks", "authors": [{"name": "Sergey Zagoruyko"}], "citationCount": 7000, "year": 2016}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn full_run_visits_every_stage_and_persists() {
        let mut server = Server::new_async().await;
        let search = search_ok(&mut server).await;
        let model = Arc::new(ScriptedModel::new(
            Some(r#"{"title": "Deep Residual Learning for Image Recognition", "authors": ["Kaiming He", "Xiangyu Zhang"], "year": 2016}"#),
            Some("## 1. Main Research Question\nCan depth be trained?"),
            Some("residual learning, image recognition, deep networks"),
        ));
        let store = Arc::new(SqlitePaperStore::open_in_memory().unwrap());
        let sleeper = Arc::new(RecordingSleeper::new());

        let outcome = pipeline(model, &server, store.clone(), sleeper.clone())
            .ingest_pages(&paper_pages())
            .await
            .unwrap();

        search.assert_async().await;
        assert_eq!(outcome.report.stages, PipelineStage::ALL.to_vec());
        assert!(outcome.report.degraded.is_empty());
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(2000), Duration::from_millis(1000)]
        );

        let record = &outcome.record;
        assert_eq!(record.title, "Deep Residual Learning for Image Recognition");
        assert_eq!(record.authors, vec!["Kaiming He", "Xiangyu Zhang"]);
        assert_eq!(record.year, Some(2016));
        assert!(record.abstract_text.starts_with("Deep residual networks ease"));
        assert_eq!(record.keywords.len(), 3);
        assert_eq!(record.related_work.len(), 2);
        assert_eq!(record.related_work[0].title, "Identity Mappings in Deep Residual Networks");

        let stored = store.find_by_id(&outcome.id).unwrap().unwrap();
        assert_eq!(stored.record.title, record.title);
        assert_eq!(stored.record.summary, record.summary);
        assert_eq!(stored.record.related_work, record.related_work);
    }

    #[tokio::test]
    async fn enrichment_failures_degrade_to_fallbacks() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;
        let model = Arc::new(ScriptedModel::new(None, None, None));
        let store = Arc::new(SqlitePaperStore::open_in_memory().unwrap());

        let outcome = pipeline(model, &server, store.clone(), Arc::new(RecordingSleeper::new()))
            .ingest_pages(&paper_pages())
            .await
            .unwrap();

        search.assert_async().await;
        let report = &outcome.report;
        assert_eq!(report.stages, PipelineStage::ALL.to_vec());
        for stage in [
            PipelineStage::MetadataRefining,
            PipelineStage::Summarizing,
            PipelineStage::KeywordExtracting,
            PipelineStage::RelatedWorkSearching,
        ] {
            assert!(report.is_degraded(stage), "{stage} should be degraded");
        }

        let record = &outcome.record;
        assert_eq!(record.title, "Deep Residual Learning for Image Recognition");
        assert_eq!(record.authors, vec!["Unknown Author"]);
        assert_eq!(record.year, Some(2016));
        assert!(record.summary.starts_with("**Summary Generation Failed**"));
        assert_eq!(record.keywords, vec!["Research", "Analysis"]);
        assert!(record.related_work.is_empty());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn rate_limited_summary_reports_system_busy() {
        let mut server = Server::new_async().await;
        let _search = search_ok(&mut server).await;
        let model = Arc::new(ScriptedModel::new(None, None, Some("a, b")).failing_with(429));

        let outcome = pipeline(
            model,
            &server,
            Arc::new(SqlitePaperStore::open_in_memory().unwrap()),
            Arc::new(RecordingSleeper::new()),
        )
        .ingest_pages(&paper_pages())
        .await
        .unwrap();

        assert_eq!(outcome.record.summary, fallback::SYSTEM_BUSY);
        assert_eq!(outcome.record.keywords, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn scanned_document_skips_summary_call() {
        let mut server = Server::new_async().await;
        let _search = search_ok(&mut server).await;
        let model = Arc::new(ScriptedModel::new(None, Some("never used"), None));

        let outcome = pipeline(
            model.clone(),
            &server,
            Arc::new(SqlitePaperStore::open_in_memory().unwrap()),
            Arc::new(RecordingSleeper::new()),
        )
        .ingest_pages(&FakePages(vec![Some("30 characters of scanned text".to_string())]))
        .await
        .unwrap();

        assert_eq!(outcome.record.full_text, SCANNED_DOCUMENT_PLACEHOLDER);
        assert_eq!(outcome.record.summary, fallback::SUMMARY_UNAVAILABLE);
        assert_eq!(model.summary_calls(), 0);
        assert!(outcome.report.is_degraded(PipelineStage::Summarizing));
    }

    #[tokio::test]
    async fn implausible_model_year_is_ignored() {
        let mut server = Server::new_async().await;
        let _search = search_ok(&mut server).await;
        let model = Arc::new(ScriptedModel::new(
            Some(r#"{"title": "Notes on the Analytical Engine", "authors": ["Ada Lovelace"], "year": 1843}"#),
            Some("summary"),
            Some("engines"),
        ));

        let outcome = pipeline(
            model,
            &server,
            Arc::new(SqlitePaperStore::open_in_memory().unwrap()),
            Arc::new(RecordingSleeper::new()),
        )
        .ingest_pages(&paper_pages())
        .await
        .unwrap();

        assert_eq!(outcome.record.title, "Notes on the Analytical Engine");
        assert_eq!(outcome.record.year, Some(2016));
        assert_eq!(outcome.report.fields_refined, vec!["title", "authors"]);
    }

    #[tokio::test]
    async fn unreadable_document_aborts_before_enrichment() {
        let server = Server::new_async().await;
        let model = Arc::new(ScriptedModel::new(None, None, None));
        let store = Arc::new(SqlitePaperStore::open_in_memory().unwrap());
        let sleeper = Arc::new(RecordingSleeper::new());

        let err = pipeline(model.clone(), &server, store.clone(), sleeper.clone())
            .ingest(b"this is not a pdf at all")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Extraction(_)));
        assert!(model.prompts.lock().unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_fatal() {
        let mut server = Server::new_async().await;
        let _search = search_ok(&mut server).await;
        let model = Arc::new(ScriptedModel::new(None, Some("summary"), Some("k")));

        let err = pipeline(model, &server, Arc::new(BrokenStore), Arc::new(RecordingSleeper::new()))
            .ingest_pages(&paper_pages())
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Persistence(_)));
    }
}
