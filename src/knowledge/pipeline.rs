//! 문서 파이프라인 - 수집/질의 경계 오케스트레이션
//!
//! 업로드 경계(원시 추출 텍스트 → 정규화 → 청킹 → 저장)와
//! 질의 경계(질문 → 청크 선별 → 컨텍스트 조립)를 하나로 묶습니다.
//! 이 모듈의 연산은 전부 동기 CPU 작업이며 네트워크 호출을 하지 않습니다.
//! 추출기와 LLM 같은 외부 협력자는 호출 측에서 주입합니다.

use serde::Serialize;
use thiserror::Error;

use super::chunker::{default_chunker, Chunk, Chunker};
use super::context;
use super::normalize::normalize;
use super::retriever::{retrieve, RetrieveConfig};
use super::store::{DocumentRecord, DocumentStore, StoreError, UploadMeta};

/// 청크 미리보기 길이 (문자 수)
const PREVIEW_CHARS: usize = 160;

// ============================================================================
// Types
// ============================================================================

/// 질의 응답에 내보내는 청크 요약
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedChunk {
    pub id: String,
    pub text_preview: String,
}

/// 질의 경계 출력
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    /// 선별된 청크 (id + 미리보기)
    pub selected: Vec<SelectedChunk>,
    /// LLM 프롬프트에 넣을 조립된 컨텍스트 블록
    pub context: String,
}

// ============================================================================
// Errors
// ============================================================================

/// 질의 에러
///
/// "문서 없음"과 "문서에 내용 없음"을 구분해서 보고합니다.
#[derive(Debug, Error)]
pub enum QueryError {
    /// 알 수 없는 문서 키 (클라이언트 에러)
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// 청크가 0개인 문서 - 추출이 아무것도 만들지 못한 업로드
    #[error("document has no extractable content: {0}")]
    NoExtractableContent(String),

    /// 질문 또는 키 누락 (클라이언트 에러)
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for QueryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => QueryError::DocumentNotFound(key),
            other => QueryError::Store(other),
        }
    }
}

// ============================================================================
// DocumentPipeline
// ============================================================================

/// 문서 파이프라인
///
/// 저장소와 청커를 주입받아 수집과 질의를 수행합니다.
pub struct DocumentPipeline {
    store: Box<dyn DocumentStore>,
    chunker: Box<dyn Chunker>,
    retrieve_config: RetrieveConfig,
}

impl DocumentPipeline {
    /// 기본 청커로 생성
    pub fn new(store: Box<dyn DocumentStore>) -> Self {
        Self::with_chunker(store, default_chunker())
    }

    /// 청커를 지정하여 생성
    pub fn with_chunker(store: Box<dyn DocumentStore>, chunker: Box<dyn Chunker>) -> Self {
        Self {
            store,
            chunker,
            retrieve_config: RetrieveConfig::default(),
        }
    }

    /// 수집 경계 - 원시 추출 텍스트를 레코드로 저장
    ///
    /// 추출 협력자가 빈 텍스트를 넘겨도 실패하지 않고 청크 0개 레코드를
    /// 만듭니다. 수집 실패와 조회 실패를 구분하기 위한 동작입니다.
    pub fn ingest(&self, raw_text: &str, meta: UploadMeta) -> Result<DocumentRecord, StoreError> {
        let text = normalize(raw_text);
        let chunks = self.chunker.chunk(&text);

        if chunks.is_empty() {
            tracing::warn!("No chunks generated for upload: {}", meta.storage_key);
        }

        let record = DocumentRecord::new(meta, chunks);
        self.store.save(&record)?;

        tracing::info!(
            "Ingested document: {} (id={}, chunks={})",
            record.storage_key,
            record.document_id,
            record.chunks.len()
        );

        Ok(record)
    }

    /// 질의 경계 - 질문과 관련된 청크를 선별해 컨텍스트로 조립
    pub fn ask(
        &self,
        storage_key: &str,
        question: &str,
        limit: usize,
    ) -> Result<QueryOutput, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::InvalidQuery("question is required".to_string()));
        }

        let record = self.load_nonempty(storage_key)?;

        let config = RetrieveConfig {
            limit,
            ..self.retrieve_config.clone()
        };
        let selected = retrieve(&record.chunks, question, &config);

        Ok(to_output(selected))
    }

    /// 벌크 변형 - 질문 없이 문서 선두 N개 청크 (요약/퀴즈 생성용)
    pub fn first_chunks(&self, storage_key: &str, count: usize) -> Result<QueryOutput, QueryError> {
        let record = self.load_nonempty(storage_key)?;

        let selected: Vec<Chunk> = record.chunks.into_iter().take(count).collect();
        Ok(to_output(selected))
    }

    /// 내부 저장소 접근
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    fn load_nonempty(&self, storage_key: &str) -> Result<DocumentRecord, QueryError> {
        if storage_key.trim().is_empty() {
            return Err(QueryError::InvalidQuery(
                "storage key is required".to_string(),
            ));
        }

        let record = self.store.load(storage_key)?;
        if record.chunks.is_empty() {
            return Err(QueryError::NoExtractableContent(storage_key.to_string()));
        }
        Ok(record)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn to_output(selected: Vec<Chunk>) -> QueryOutput {
    let context = context::assemble(&selected);
    let selected = selected
        .into_iter()
        .map(|c| SelectedChunk {
            text_preview: preview_text(&c.text, PREVIEW_CHARS),
            id: c.id,
        })
        .collect();

    QueryOutput { selected, context }
}

/// 미리보기 텍스트 (UTF-8 안전 잘라내기)
fn preview_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace(['\n', '\r'], " ");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::MemoryDocumentStore;

    fn test_pipeline() -> DocumentPipeline {
        DocumentPipeline::new(Box::new(MemoryDocumentStore::new()))
    }

    fn test_meta(key: &str) -> UploadMeta {
        UploadMeta {
            original_name: "biology.txt".to_string(),
            storage_key: key.to_string(),
            size_bytes: 100,
            mime_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn test_ingest_then_ask() {
        let pipeline = test_pipeline();
        let text = "The mitochondria is the powerhouse of the cell.\n\n\
                    Photosynthesis occurs in chloroplasts.";

        let record = pipeline.ingest(text, test_meta("bio.txt")).unwrap();
        assert_eq!(record.chunks.len(), 2);

        let output = pipeline
            .ask("bio.txt", "What is the powerhouse of the cell?", 5)
            .unwrap();

        assert_eq!(output.selected.len(), 1);
        assert_eq!(output.selected[0].id, "chunk-0");
        assert!(output.context.starts_with("Context 1: The mitochondria"));
    }

    #[test]
    fn test_ingest_empty_extraction_is_tolerated() {
        let pipeline = test_pipeline();

        // 추출 실패(빈 텍스트)는 수집을 실패시키지 않는다
        let record = pipeline.ingest("", test_meta("scan.pdf")).unwrap();
        assert!(record.chunks.is_empty());

        // 조회 시에는 "내용 없음"으로 구분해 보고
        let err = pipeline.ask("scan.pdf", "anything here?", 5).unwrap_err();
        assert!(matches!(err, QueryError::NoExtractableContent(_)));
    }

    #[test]
    fn test_ask_unknown_key() {
        let pipeline = test_pipeline();

        let err = pipeline.ask("nonexistent-key", "question", 5).unwrap_err();
        assert!(matches!(err, QueryError::DocumentNotFound(_)));
    }

    #[test]
    fn test_ask_rejects_blank_question() {
        let pipeline = test_pipeline();
        pipeline.ingest("content", test_meta("doc.txt")).unwrap();

        let err = pipeline.ask("doc.txt", "   ", 5).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));

        let err = pipeline.ask("", "valid question", 5).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
    }

    #[test]
    fn test_ask_fallback_never_empty() {
        let pipeline = test_pipeline();
        pipeline
            .ingest("some study notes about history", test_meta("doc.txt"))
            .unwrap();

        let output = pipeline
            .ask("doc.txt", "unrelated quantum gravity topic", 5)
            .unwrap();
        assert!(!output.selected.is_empty());
    }

    #[test]
    fn test_first_chunks_bulk_variant() {
        let pipeline = test_pipeline();
        let text = "one\n\ntwo\n\nthree\n\nfour\n\nfive";
        pipeline.ingest(text, test_meta("doc.txt")).unwrap();

        let output = pipeline.first_chunks("doc.txt", 3).unwrap();
        assert_eq!(output.selected.len(), 3);
        assert_eq!(output.selected[0].id, "chunk-0");
        assert_eq!(output.context, "Context 1: one\n\nContext 2: two\n\nContext 3: three");
    }

    #[test]
    fn test_first_chunks_on_empty_document() {
        let pipeline = test_pipeline();
        pipeline.ingest("   ", test_meta("blank.txt")).unwrap();

        let err = pipeline.first_chunks("blank.txt", 3).unwrap_err();
        assert!(matches!(err, QueryError::NoExtractableContent(_)));
    }

    #[test]
    fn test_preview_text() {
        assert_eq!(preview_text("hello", 10), "hello");
        assert_eq!(preview_text("hello world", 5), "hello...");
        assert_eq!(preview_text("line\nbreak", 20), "line break");
    }

    #[test]
    fn test_preview_is_bounded() {
        let long = "가".repeat(500);
        let preview = preview_text(&long, PREVIEW_CHARS);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }
}
