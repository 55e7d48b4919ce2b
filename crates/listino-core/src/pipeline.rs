//! End-to-end reconciliation run.
//!
//! A run validates the reference sheet, then processes every document
//! concurrently (identify, parse, reconcile, report) and finally asks the
//! narrative service for a summary. Reports come back in input order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::error::{ExtractionError, GenerationError, Result, ValidationError};
use crate::extraction::{self, FieldParser, IdentifierExtractor};
use crate::matching::Reconciler;
use crate::models::config::ListinoConfig;
use crate::models::document::RawDocument;
use crate::models::report::{DocumentReport, Narrative, RunOutput};
use crate::narrative::{build_prompt, Summarizer};
use crate::reference::{self, ReferenceIndex};
use crate::render::{DocumentRenderer, FileRenderer};
use crate::report::{render_markdown, ReportBuilder};
use crate::storage::RunWorkspace;

/// Processes already-rendered text into a report.
///
/// Immutable once built and shared by all documents of a run.
pub struct DocumentProcessor {
    parser: FieldParser,
    identifiers: IdentifierExtractor,
    reconciler: Reconciler,
    builder: ReportBuilder,
}

impl DocumentProcessor {
    /// Build a processor from configuration.
    pub fn from_config(config: &ListinoConfig) -> Result<Self> {
        config.matching.validate()?;
        let (parser, identifiers) = extraction::from_config(&config.extraction)?;

        Ok(Self {
            parser,
            identifiers,
            reconciler: Reconciler::from_config(&config.matching),
            builder: ReportBuilder::new(),
        })
    }

    /// Identify, parse, reconcile and report one document.
    pub fn process(&self, document: &RawDocument, index: &ReferenceIndex) -> DocumentReport {
        let identifiers = self.identifiers.extract(&document.lines);
        let fields = self.parser.parse(&document.lines);

        let candidates = index.candidates(identifiers.listing_code.as_deref());
        if let Some(code) = &identifiers.listing_code {
            if candidates.is_empty() {
                warn!("Listing code {} of {} is not in the reference sheet", code, document.name);
            }
        }

        let rows = self.reconciler.reconcile(&fields, candidates);
        self.builder.build(&document.name, identifiers, fields, rows)
    }

    /// Process a rendered text blob.
    pub fn process_text(&self, name: &str, text: &str, index: &ReferenceIndex) -> DocumentReport {
        self.process(&RawDocument::from_text(name, text), index)
    }

    /// Report for a document that could not be rendered.
    pub fn failed(&self, name: &str, error: &ExtractionError) -> DocumentReport {
        self.builder.failed(name, error)
    }
}

/// Reconciliation pipeline with its external collaborators.
///
/// Create once per process; `run` may be called repeatedly and
/// concurrently. OCR and generation calls are capped across all runs.
pub struct Pipeline {
    config: ListinoConfig,
    renderer: Arc<dyn DocumentRenderer>,
    summarizer: Option<Arc<dyn Summarizer>>,
    render_slots: Arc<Semaphore>,
    generation_slots: Arc<Semaphore>,
}

impl Pipeline {
    /// Create a pipeline with the file renderer (no OCR) and no narrative
    /// service.
    pub fn new(config: ListinoConfig) -> Self {
        let renderer = Arc::new(FileRenderer::new(config.pdf.clone()));
        let render_slots = Arc::new(Semaphore::new(config.ocr.max_concurrent.max(1)));
        let generation_slots = Arc::new(Semaphore::new(config.narrative.max_concurrent.max(1)));

        Self {
            config,
            renderer,
            summarizer: None,
            render_slots,
            generation_slots,
        }
    }

    /// Set the document renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Set the narrative service.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &ListinoConfig {
        &self.config
    }

    /// Reconcile already-rendered text without the concurrent machinery.
    pub fn process_text(&self, name: &str, text: &str, index: &ReferenceIndex) -> Result<DocumentReport> {
        let processor = DocumentProcessor::from_config(&self.config)?;
        Ok(processor.process_text(name, text, index))
    }

    /// Reconcile documents against a reference sheet.
    ///
    /// Returns [`crate::ListinoError::Validation`] without processing any document
    /// when the sheet is unusable. Document failures do not fail the run;
    /// they are recorded in the document's report.
    pub async fn run(&self, documents: &[PathBuf], reference: &Path) -> Result<RunOutput> {
        let start = Instant::now();
        let mut workspace = RunWorkspace::create()?;

        let reference_copy = workspace
            .materialize(reference)
            .map_err(|e| ValidationError::Unreadable(format!("{}: {}", reference.display(), e)))?;
        let index = Arc::new(reference::load_index(&reference_copy)?);

        let processor = Arc::new(DocumentProcessor::from_config(&self.config)?);
        info!("Processing {} documents", documents.len());

        let sources: Vec<std::io::Result<PathBuf>> =
            documents.iter().map(|path| workspace.materialize(path)).collect();
        // Shared with blocking renders so the directory outlives any render
        // that is still running after a timeout.
        let workspace = Arc::new(workspace);

        let workers = Arc::new(Semaphore::new(self.config.pipeline.workers.max(1)));
        let mut names = Vec::with_capacity(documents.len());
        let mut handles = Vec::with_capacity(documents.len());

        for (path, source) in documents.iter().zip(sources) {
            let name = document_name(path);

            let task = DocumentTask {
                name: name.clone(),
                source,
                page: self.config.pdf.page,
                timeout: Duration::from_secs(self.config.ocr.timeout_secs),
                renderer: Arc::clone(&self.renderer),
                render_slots: Arc::clone(&self.render_slots),
                workers: Arc::clone(&workers),
                workspace: Arc::clone(&workspace),
                processor: Arc::clone(&processor),
                index: Arc::clone(&index),
            };

            names.push(name);
            handles.push(tokio::spawn(task.run()));
        }

        let reports: Vec<DocumentReport> = join_all(handles)
            .await
            .into_iter()
            .zip(&names)
            .map(|(joined, name)| {
                joined.unwrap_or_else(|e| {
                    error!("Task for {} did not complete: {}", name, e);
                    processor.failed(name, &ExtractionError::Task(e.to_string()))
                })
            })
            .collect();

        let failed = reports.iter().filter(|r| r.is_failed()).count();
        info!(
            "Processed {} documents ({} failed) in {:?}",
            reports.len(),
            failed,
            start.elapsed()
        );

        let narrative = self.narrate(&reports).await;
        Ok(RunOutput { narrative, reports })
    }

    /// Ask the narrative service for a summary, degrading to a plain
    /// rendering of the tables when it is unavailable.
    pub async fn narrate(&self, reports: &[DocumentReport]) -> Narrative {
        match self.generate(reports).await {
            Ok(text) => Narrative::Generated { text },
            Err(e) => {
                match e {
                    GenerationError::NotConfigured => debug!("No narrative service configured"),
                    _ => warn!("Narrative generation unavailable: {}", e),
                }
                Narrative::Unavailable {
                    reason: e.to_string(),
                    fallback: render_markdown(reports),
                }
            }
        }
    }

    async fn generate(&self, reports: &[DocumentReport]) -> std::result::Result<String, GenerationError> {
        let summarizer = self.summarizer.clone().ok_or(GenerationError::NotConfigured)?;
        let narrative = &self.config.narrative;
        let prompt = build_prompt(&narrative.instruction, reports, narrative.max_prompt_chars)?;

        let slot = Arc::clone(&self.generation_slots)
            .acquire_owned()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        // The slot is held until the call returns, even past the timeout.
        let call = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            summarizer.summarize(&prompt)
        });
        match tokio::time::timeout(Duration::from_secs(narrative.timeout_secs), call).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(GenerationError::Request(e.to_string())),
            Err(_) => Err(GenerationError::Timeout(narrative.timeout_secs)),
        }
    }
}

/// Everything one document needs, owned so it can run on its own task.
struct DocumentTask {
    name: String,
    source: std::io::Result<PathBuf>,
    page: u32,
    timeout: Duration,
    renderer: Arc<dyn DocumentRenderer>,
    render_slots: Arc<Semaphore>,
    workers: Arc<Semaphore>,
    workspace: Arc<RunWorkspace>,
    processor: Arc<DocumentProcessor>,
    index: Arc<ReferenceIndex>,
}

impl DocumentTask {
    async fn run(self) -> DocumentReport {
        let _worker = self.workers.acquire().await;

        let rendered = match &self.source {
            Ok(path) => self.render(path.clone()).await,
            Err(e) => Err(ExtractionError::Task(format!("cannot stage document: {}", e))),
        };

        match rendered {
            Ok(text) => {
                debug!("Rendered {} ({} chars)", self.name, text.len());
                self.processor.process_text(&self.name, &text, &self.index)
            }
            Err(e) => {
                warn!("Failed to process {}: {}", self.name, e);
                self.processor.failed(&self.name, &e)
            }
        }
    }

    async fn render(&self, path: PathBuf) -> std::result::Result<String, ExtractionError> {
        let slot = Arc::clone(&self.render_slots)
            .acquire_owned()
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))?;

        let renderer = Arc::clone(&self.renderer);
        let workspace = Arc::clone(&self.workspace);
        let page = self.page;
        // Slot and workspace are released when the render returns, even
        // after a timeout.
        let call = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            let _workspace = workspace;
            renderer.render(&path, page)
        });

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ExtractionError::Task(e.to_string())),
            Err(_) => Err(ExtractionError::Timeout(self.timeout.as_secs())),
        }
    }
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListinoError;
    use crate::models::report::{DocumentStatus, MatchStatus};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const REFERENCE: &str = "Codice Item,Codice Listino,Prezzo Unitario\n\
                             Prezzo Luce,LST00123,0.12\n\
                             Prezzo gas,LST00123,0.45\n\
                             Prezzo Luce,LST00999,0.15\n";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    struct FixedSummarizer(&'static str);

    impl Summarizer for FixedSummarizer {
        fn summarize(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
            assert!(prompt.contains("document_name"));
            Ok(self.0.to_string())
        }
    }

    struct FailingSummarizer;

    impl Summarizer for FailingSummarizer {
        fn summarize(&self, _prompt: &str) -> std::result::Result<String, GenerationError> {
            Err(GenerationError::Request("connection refused".to_string()))
        }
    }

    /// Renders from text files but sleeps on names containing "slow".
    struct SlowRenderer {
        calls: AtomicUsize,
    }

    impl DocumentRenderer for SlowRenderer {
        fn render(&self, path: &Path, _page: u32) -> std::result::Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if path.to_string_lossy().contains("slow") {
                std::thread::sleep(Duration::from_millis(1500));
            }
            Ok(std::fs::read_to_string(path)?)
        }
    }

    #[test]
    fn test_process_text_scenario_a() {
        let index = ReferenceIndex::from_sheet(
            &crate::reference::ReferenceSheet::from_csv_str(REFERENCE).unwrap(),
        )
        .unwrap();
        let processor = DocumentProcessor::from_config(&ListinoConfig::default()).unwrap();

        let report = processor.process_text(
            "offerta.pdf",
            "Offerta Luce Casa\nLST00123\nPrezzo Luce   0.12 €/kWh\nPrezzo gas: 0.45\n",
            &index,
        );

        assert_eq!(report.identifiers.listing_code.as_deref(), Some("LST00123"));
        assert_eq!(report.identifiers.product_code.as_deref(), Some("Offerta Luce Casa"));

        let row = &report.comparison_rows[0];
        assert_eq!(row.field, "Prezzo Luce");
        assert_eq!(row.extracted_value.as_deref(), Some("0.12 €/kWh"));
        assert_eq!(row.expected_value.as_deref(), Some("0.12"));
        assert_eq!(row.status, MatchStatus::Different);
        assert_eq!(report.comparison_rows[1].status, MatchStatus::Ok);
    }

    #[test]
    fn test_process_text_without_listing_code() {
        let index = ReferenceIndex::from_sheet(
            &crate::reference::ReferenceSheet::from_csv_str(REFERENCE).unwrap(),
        )
        .unwrap();
        let processor = DocumentProcessor::from_config(&ListinoConfig::default()).unwrap();

        let report = processor.process_text("offerta.pdf", "Offerta\nPrezzo Luce  0.12\n", &index);

        assert_eq!(report.identifiers.listing_code, None);
        assert_eq!(report.comparison_rows.len(), 1);
        assert!(report
            .comparison_rows
            .iter()
            .all(|r| r.status == MatchStatus::NotFound && r.expected_value.is_none()));
    }

    #[tokio::test]
    async fn test_run_keeps_input_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write(dir.path(), "listino.csv", REFERENCE);
        let docs = vec![
            write(dir.path(), "a.txt", "Offerta A\nLST00123\nPrezzo Luce  0.12\n"),
            write(dir.path(), "b.docx", "whatever"),
            write(dir.path(), "c.txt", "Offerta C\nLST00999\nPrezzo Luce  0.12\n"),
            dir.path().join("missing.txt"),
        ];

        let output = Pipeline::new(ListinoConfig::default())
            .run(&docs, &reference)
            .await
            .unwrap();

        let names: Vec<&str> = output.reports.iter().map(|r| r.document_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.docx", "c.txt", "missing.txt"]);

        assert_eq!(output.reports[0].comparison_rows[0].status, MatchStatus::Ok);
        assert_eq!(output.reports[1].status, DocumentStatus::Failed);
        assert!(output.reports[1].error.as_deref().unwrap().contains("docx"));
        assert_eq!(output.reports[2].comparison_rows[0].status, MatchStatus::Different);
        assert_eq!(output.reports[2].comparison_rows[0].expected_value.as_deref(), Some("0.15"));
        assert_eq!(output.reports[3].status, DocumentStatus::Failed);

        assert!(output.narrative.is_degraded());
        assert!(output.narrative.text().contains("## a.txt"));
    }

    #[tokio::test]
    async fn test_missing_column_aborts_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write(dir.path(), "listino.csv", "codice item,codice listino\nA,LST00123\n");
        let docs = vec![write(dir.path(), "a.txt", "Offerta\nLST00123\n")];

        let renderer = Arc::new(SlowRenderer { calls: AtomicUsize::new(0) });
        let pipeline = Pipeline::new(ListinoConfig::default()).with_renderer(renderer.clone());

        let err = pipeline.run(&docs, &reference).await.unwrap_err();
        assert!(matches!(
            err,
            ListinoError::Validation(ValidationError::MissingColumn(ref c)) if c == "prezzo unitario"
        ));
        assert_eq!(err.to_string(), "missing column 'prezzo unitario' in the reference sheet");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_render_timeout_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write(dir.path(), "listino.csv", REFERENCE);
        let docs = vec![
            write(dir.path(), "slow.txt", "Offerta\nLST00123\nPrezzo Luce  0.12\n"),
            write(dir.path(), "fast.txt", "Offerta\nLST00123\nPrezzo Luce  0.12\n"),
        ];

        let mut config = ListinoConfig::default();
        config.ocr.timeout_secs = 1;
        let renderer = Arc::new(SlowRenderer { calls: AtomicUsize::new(0) });
        let output = Pipeline::new(config)
            .with_renderer(renderer)
            .run(&docs, &reference)
            .await
            .unwrap();

        assert_eq!(output.reports[0].status, DocumentStatus::Failed);
        assert_eq!(output.reports[0].error.as_deref(), Some("rendering timed out after 1s"));
        assert_eq!(output.reports[1].status, DocumentStatus::Processed);
    }

    /// Tracks how many renders run at once.
    struct CountingRenderer {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl DocumentRenderer for CountingRenderer {
        fn render(&self, path: &Path, _page: u32) -> std::result::Result<String, ExtractionError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1200));
            let text = std::fs::read_to_string(path);
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(text?)
        }
    }

    #[tokio::test]
    async fn test_timed_out_renders_keep_their_slot() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write(dir.path(), "listino.csv", REFERENCE);
        let docs: Vec<PathBuf> = (0..3)
            .map(|i| write(dir.path(), &format!("doc{i}.txt"), "Offerta\nLST00123\nPrezzo Luce  0.12\n"))
            .collect();

        let mut config = ListinoConfig::default();
        config.ocr.max_concurrent = 1;
        config.ocr.timeout_secs = 1;
        config.pipeline.workers = 4;
        let renderer = Arc::new(CountingRenderer {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let output = Pipeline::new(config)
            .with_renderer(renderer.clone())
            .run(&docs, &reference)
            .await
            .unwrap();

        assert_eq!(renderer.peak.load(Ordering::SeqCst), 1);
        assert_eq!(output.reports[0].error.as_deref(), Some("rendering timed out after 1s"));
        assert!(output.reports.iter().all(|r| r.status == DocumentStatus::Failed));
    }

    #[tokio::test]
    async fn test_threshold_above_scale_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write(dir.path(), "listino.csv", REFERENCE);
        let docs = vec![write(dir.path(), "a.txt", "Offerta\nLST00123\nPrezzo Luce  0.12\n")];

        let mut config = ListinoConfig::default();
        config.matching.threshold = 101;
        assert!(matches!(
            DocumentProcessor::from_config(&config).err(),
            Some(ListinoError::Config(_))
        ));

        let result = Pipeline::new(config).run(&docs, &reference).await;
        match result {
            Err(ListinoError::Config(message)) => assert!(message.contains("matching.threshold")),
            other => panic!("unexpected result {:?}", other.map(|o| o.reports.len())),
        }
    }

    #[tokio::test]
    async fn test_narrative_generated_and_degraded() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write(dir.path(), "listino.csv", REFERENCE);
        let docs = vec![write(dir.path(), "a.txt", "Offerta\nLST00123\nPrezzo Luce  0.12\n")];

        let output = Pipeline::new(ListinoConfig::default())
            .with_summarizer(Arc::new(FixedSummarizer("# Report")))
            .run(&docs, &reference)
            .await
            .unwrap();
        assert_eq!(output.narrative, Narrative::Generated { text: "# Report".to_string() });

        let output = Pipeline::new(ListinoConfig::default())
            .with_summarizer(Arc::new(FailingSummarizer))
            .run(&docs, &reference)
            .await
            .unwrap();
        assert!(output.narrative.is_degraded());
        assert_eq!(output.reports.len(), 1);
        match output.narrative {
            Narrative::Unavailable { reason, .. } => assert!(reason.contains("connection refused")),
            other => panic!("unexpected narrative {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identical_runs_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write(
            dir.path(),
            "listino.csv",
            "codice item,codice listino,prezzo unitario\n\
             Prezzo Luce,LST00123,0.12\n\
             prezzo luce,LST00123,0.13\n\
             Fee Primo Anno,LST00123,5\n",
        );
        let docs: Vec<PathBuf> = (0..6)
            .map(|i| {
                write(
                    dir.path(),
                    &format!("doc{i}.txt"),
                    "Offerta\nLST00123\nPrezzo Luce  0.13\nFee Primo Anno: 5\nIndice GO\n",
                )
            })
            .collect();

        let pipeline = Pipeline::new(ListinoConfig::default());
        let first = pipeline.run(&docs, &reference).await.unwrap();
        let second = pipeline.run(&docs, &reference).await.unwrap();

        let a = crate::report::to_json(&first.reports).unwrap();
        let b = crate::report::to_json(&second.reports).unwrap();
        assert_eq!(a, b);

        // Tie between "Prezzo Luce" and "prezzo luce" goes to the first row.
        let row = &first.reports[0].comparison_rows[0];
        assert_eq!(row.expected_value.as_deref(), Some("0.12"));
        assert_eq!(row.status, MatchStatus::Different);
    }
}
