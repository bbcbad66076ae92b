//! Knowledge 모듈 - 문서 수집/청킹/키워드 검색 파이프라인
//!
//! - Normalize: 추출된 원시 텍스트 정규화
//! - Chunker: 문단 기반 고정 보폭 분할
//! - Store: 업로드 파일당 JSON 레코드 하나를 두는 문서 저장소
//! - Retriever: 질문 토큰 일치 스코어링 + 선두 청크 폴백
//! - Context: 프롬프트 컨텍스트 블록 조립
//! - Pipeline: 수집/질의 경계 오케스트레이션

mod chunker;
mod context;
mod normalize;
mod pipeline;
mod retriever;
mod store;

// Re-exports
pub use chunker::{
    default_chunker, paragraph_chunker, Chunk, ChunkConfig, Chunker, ParagraphChunker,
};
pub use context::assemble;
pub use normalize::normalize;
pub use pipeline::{DocumentPipeline, QueryError, QueryOutput, SelectedChunk};
pub use retriever::{retrieve, tokenize_question, RetrieveConfig};
pub use store::{
    get_data_dir, new_storage_key, sanitize_storage_key, DocumentRecord, DocumentStore,
    FsDocumentStore, MemoryDocumentStore, StoreError, UploadMeta,
};
