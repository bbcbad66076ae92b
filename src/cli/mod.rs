//! CLI 모듈
//!
//! studymate-rag 명령어 정의 및 구현.
//! 업로드 경계와 질의 경계를 구동하고, LLM 협력자를 생성해 주입하는
//! 유일한 계층입니다.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::extractor::{mime_type_for, ContentExtractor, FileType};
use crate::knowledge::{
    get_data_dir, new_storage_key, DocumentPipeline, DocumentStore, FsDocumentStore, QueryError,
    QueryOutput, UploadMeta,
};
use crate::llm::{
    build_answer_prompt, build_quiz_prompt, has_api_key, CompletionProvider, GeminiCompletion,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "studymate-rag")]
#[command(version, about = "학습 도우미 문서 QA 백엔드", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일 업로드 (텍스트 추출 + 청킹 + 저장)
    Upload {
        /// 업로드할 파일 경로
        file: PathBuf,
    },

    /// 업로드한 문서에 질문
    Ask {
        /// 문서 저장 키 (upload 출력 참고)
        key: String,

        /// 질문
        question: String,

        /// 선별할 최대 청크 수
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// LLM 호출 없이 선별된 컨텍스트만 출력
        #[arg(long)]
        context_only: bool,
    },

    /// 문서 앞부분으로 퀴즈 생성
    Quiz {
        /// 문서 저장 키
        key: String,

        /// 출제할 문제 수
        #[arg(short, long, default_value = "5")]
        questions: usize,

        /// 사용할 선두 청크 수
        #[arg(short, long, default_value = "8")]
        chunks: usize,
    },

    /// 저장된 문서 목록
    List {
        /// 결과 개수 제한
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// 문서 삭제 (레코드 + 원본 바이트)
    Delete {
        /// 삭제할 문서 저장 키
        key: String,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Upload { file } => cmd_upload(file).await,
        Commands::Ask {
            key,
            question,
            limit,
            context_only,
        } => cmd_ask(&key, &question, limit, context_only).await,
        Commands::Quiz {
            key,
            questions,
            chunks,
        } => cmd_quiz(&key, questions, chunks).await,
        Commands::List { limit } => cmd_list(limit),
        Commands::Delete { key } => cmd_delete(&key),
        Commands::Status => cmd_status(),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 업로드 명령어 (upload)
///
/// 원본 바이트를 데이터 디렉토리에 복사하고, 텍스트를 추출해
/// 청킹 후 레코드로 저장합니다. 추출 실패는 업로드를 실패시키지 않습니다.
async fn cmd_upload(file: PathBuf) -> Result<()> {
    if !file.is_file() {
        bail!("파일을 찾을 수 없습니다: {:?}", file);
    }

    let file_type = match FileType::from_path(&file) {
        Some(ft) => ft,
        None => bail!("지원하지 않는 파일 형식입니다: {:?}", file),
    };

    // 이미지 OCR은 API 키가 필요
    if file_type == FileType::Image && !has_api_key() {
        bail!(
            "이미지 OCR에는 API 키가 필요합니다.\n\
             설정: export GEMINI_API_KEY=your-api-key\n\
             API 키 발급: https://aistudio.google.com/app/apikey"
        );
    }

    let original_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let store = FsDocumentStore::open_default().context("문서 저장소 열기 실패")?;

    // 원본 바이트를 저장 키 이름으로 복사
    let storage_key = new_storage_key(&original_name);
    let stored_path = store.uploads_dir().join(&storage_key);
    let size_bytes =
        std::fs::copy(&file, &stored_path).context("원본 파일 복사 실패")?;

    // 텍스트 추출 - 실패해도 청크 0개로 진행
    let type_str = match file_type {
        FileType::Text => "TXT",
        FileType::Image => "IMG",
        FileType::Pdf => "PDF",
    };
    println!("[*] [{}] 텍스트 추출 중: {}", type_str, original_name);

    let extractor = ContentExtractor::from_env();
    let raw_text = match extractor.extract(&file, file_type).await {
        Ok(content) => {
            if let Some(pages) = content.total_pages {
                println!("    {} 페이지 추출됨", pages);
            }
            content.text
        }
        Err(e) => {
            tracing::warn!("Extraction failed for {:?}: {}", file, e);
            println!("[!] 추출 실패 (빈 문서로 저장됩니다): {}", e);
            String::new()
        }
    };

    let meta = UploadMeta {
        original_name,
        storage_key: storage_key.clone(),
        size_bytes,
        mime_type: mime_type_for(&file).to_string(),
    };

    let pipeline = DocumentPipeline::new(Box::new(store));
    let record = pipeline.ingest(&raw_text, meta).context("문서 저장 실패")?;

    println!("[OK] 업로드 완료");
    println!("     저장 키: {}", record.storage_key);
    println!("     청크: {} 개", record.chunks.len());

    if record.chunks.is_empty() {
        println!("[!] 추출된 텍스트가 없어 질문/퀴즈 기능을 쓸 수 없습니다.");
    }

    Ok(())
}

/// 질문 명령어 (ask)
///
/// 키워드 일치로 청크를 선별해 컨텍스트를 만들고 LLM에 답변을 위임합니다.
async fn cmd_ask(key: &str, question: &str, limit: usize, context_only: bool) -> Result<()> {
    let store = FsDocumentStore::open_default().context("문서 저장소 열기 실패")?;
    let pipeline = DocumentPipeline::new(Box::new(store));

    let output = run_query(|| pipeline.ask(key, question, limit))?;

    println!("[*] 선별된 컨텍스트 ({} 청크):", output.selected.len());
    for chunk in &output.selected {
        println!("  [{}] {}", chunk.id, chunk.text_preview);
    }
    println!();

    if context_only {
        println!("{}", output.context);
        return Ok(());
    }

    if !has_api_key() {
        bail!(
            "답변 생성에는 API 키가 필요합니다.\n\
             설정: export GEMINI_API_KEY=your-key\n\
             컨텍스트만 보려면 --context-only 를 사용하세요."
        );
    }

    println!("[*] 답변 생성 중...");

    let provider = GeminiCompletion::from_env().context("LLM 프로바이더 생성 실패")?;
    let prompt = build_answer_prompt(&output.context, question);
    let answer = provider.complete(&prompt).await.context("답변 생성 실패")?;

    println!();
    println!("{}", answer.trim());

    Ok(())
}

/// 퀴즈 명령어 (quiz)
///
/// 문서 선두 청크로 컨텍스트를 만들어 객관식 퀴즈 생성을 위임합니다.
async fn cmd_quiz(key: &str, questions: usize, chunks: usize) -> Result<()> {
    if !has_api_key() {
        bail!(
            "퀴즈 생성에는 API 키가 필요합니다.\n\
             설정: export GEMINI_API_KEY=your-key"
        );
    }

    let store = FsDocumentStore::open_default().context("문서 저장소 열기 실패")?;
    let pipeline = DocumentPipeline::new(Box::new(store));

    let output = run_query(|| pipeline.first_chunks(key, chunks))?;

    println!(
        "[*] 청크 {} 개로 퀴즈 {} 문제 생성 중...",
        output.selected.len(),
        questions
    );

    let provider = GeminiCompletion::from_env().context("LLM 프로바이더 생성 실패")?;
    let prompt = build_quiz_prompt(&output.context, questions);
    let quiz = provider.complete(&prompt).await.context("퀴즈 생성 실패")?;

    println!();
    println!("{}", quiz.trim());

    Ok(())
}

/// 목록 명령어 (list)
fn cmd_list(limit: usize) -> Result<()> {
    let store = FsDocumentStore::open_default().context("문서 저장소 열기 실패")?;
    let records = store.list().context("문서 목록 조회 실패")?;

    if records.is_empty() {
        println!("[!] 저장된 문서가 없습니다.");
        return Ok(());
    }

    println!("[OK] 저장된 문서 ({} 건):\n", records.len().min(limit));

    for record in records.iter().take(limit) {
        println!("  {} ({})", record.storage_key, record.original_name);
        println!(
            "        {} | {} | 청크 {} 개 | {}",
            record.uploaded_at.format("%Y-%m-%d %H:%M"),
            record.mime_type,
            record.chunks.len(),
            format_bytes(record.size_bytes as usize)
        );
        println!();
    }

    Ok(())
}

/// 삭제 명령어 (delete)
fn cmd_delete(key: &str) -> Result<()> {
    let store = FsDocumentStore::open_default().context("문서 저장소 열기 실패")?;

    let deleted = store.delete(key).context("문서 삭제 실패")?;

    if deleted {
        println!("[OK] 문서 '{}' 삭제됨", key);
    } else {
        println!("[!] 삭제할 문서를 찾을 수 없습니다: {}", key);
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status() -> Result<()> {
    println!("studymate-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let data_dir = get_data_dir();
    println!("[*] 데이터 디렉토리: {}", data_dir.display());

    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정 (업로드/검색은 가능, 답변/퀴즈/OCR 불가)");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    match FsDocumentStore::open_default() {
        Ok(store) => match store.list() {
            Ok(records) => {
                let total_chunks: usize = records.iter().map(|r| r.chunks.len()).sum();
                let total_bytes: u64 = records.iter().map(|r| r.size_bytes).sum();

                println!("[OK] 저장된 문서: {} 건", records.len());
                println!("     총 청크: {} 개", total_chunks);
                println!("     총 원본 크기: {}", format_bytes(total_bytes as usize));
            }
            Err(e) => println!("[!] 문서 목록 조회 실패: {}", e),
        },
        Err(e) => println!("[!] 문서 저장소 열기 실패: {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 질의 에러를 사용자 메시지로 변환
fn run_query<F>(query: F) -> Result<QueryOutput>
where
    F: FnOnce() -> Result<QueryOutput, QueryError>,
{
    match query() {
        Ok(output) => Ok(output),
        Err(QueryError::DocumentNotFound(key)) => {
            bail!("'{}' 문서를 찾을 수 없습니다. `list`로 저장 키를 확인하세요.", key)
        }
        Err(QueryError::NoExtractableContent(key)) => {
            bail!("'{}' 문서에 추출된 내용이 없습니다 (빈 파일 또는 추출 실패).", key)
        }
        Err(QueryError::InvalidQuery(msg)) => bail!("잘못된 요청입니다: {}", msg),
        Err(e) => Err(e.into()),
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
