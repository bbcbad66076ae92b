//! studymate-rag - 학습 도우미 문서 QA 백엔드 코어
//!
//! 업로드된 문서(텍스트/PDF/이미지)를 청킹해 파일 단위 레코드로 저장하고,
//! 질문과의 키워드 일치로 관련 청크를 선별해 LLM 호출용 컨텍스트 블록을
//! 만드는 파이프라인입니다.

pub mod cli;
pub mod extractor;
pub mod knowledge;
pub mod llm;

// Re-exports
pub use extractor::{ContentExtractor, ExtractedContent, FileType};
pub use knowledge::{
    assemble, default_chunker, get_data_dir, new_storage_key, normalize, paragraph_chunker,
    retrieve, sanitize_storage_key, tokenize_question, Chunk, ChunkConfig, Chunker,
    DocumentPipeline, DocumentRecord, DocumentStore, FsDocumentStore, MemoryDocumentStore,
    ParagraphChunker, QueryError, QueryOutput, RetrieveConfig, SelectedChunk, StoreError,
    UploadMeta,
};
pub use llm::{
    build_answer_prompt, build_quiz_prompt, get_api_key, has_api_key, CompletionProvider,
    GeminiCompletion,
};
