//! 콘텐츠 추출 모듈
//!
//! 업로드 파일 형식별로 텍스트를 추출하는 수집 경계의 협력자입니다.
//! - 텍스트 파일: 직접 읽기
//! - PDF 파일: pdf-extract로 텍스트 추출
//! - 이미지 파일: Gemini Vision API로 OCR
//!
//! 어떤 추출기든 빈 문자열을 돌려줄 수 있습니다 (스캔 PDF, 텍스트 없는
//! 이미지 등). 수집 경계는 빈 추출을 실패로 취급하지 않습니다.

pub mod image;
pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};

// ============================================================================
// File Types
// ============================================================================

/// 지원하는 업로드 파일 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// 텍스트 파일 (필기, 마크다운 등)
    Text,
    /// 이미지 파일 (Gemini Vision OCR로 처리)
    Image,
    /// PDF 파일
    Pdf,
}

impl FileType {
    /// 확장자로 파일 타입 결정
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        match ext.as_str() {
            // 텍스트 파일
            "txt" | "md" | "markdown" | "csv" | "json" | "html" => Some(FileType::Text),

            // 이미지 파일
            "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" => Some(FileType::Image),

            // PDF 파일
            "pdf" => Some(FileType::Pdf),

            _ => None,
        }
    }

    /// 파일 경로에서 타입 결정
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// 레코드에 기록할 MIME 타입 결정
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" => "text/html",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Extracted Content
// ============================================================================

/// 추출된 콘텐츠
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// 추출된 전체 텍스트
    pub text: String,
    /// 원본 파일 타입
    pub source_type: FileType,
    /// 총 페이지 수 (PDF)
    pub total_pages: Option<usize>,
}

// ============================================================================
// Content Extractor
// ============================================================================

/// 콘텐츠 추출기
pub struct ContentExtractor {
    /// Gemini API 키 (이미지 OCR에만 필요)
    api_key: Option<String>,
}

impl ContentExtractor {
    /// API 키로 추출기 생성
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// 환경변수에서 API 키 로드
    pub fn from_env() -> Self {
        Self::new(crate::llm::get_api_key().ok())
    }

    /// 파일에서 텍스트 추출
    pub async fn extract(&self, path: &Path, file_type: FileType) -> Result<ExtractedContent> {
        match file_type {
            FileType::Text => self.extract_text(path).await,
            FileType::Pdf => self.extract_pdf(path).await,
            FileType::Image => self.extract_image(path).await,
        }
    }

    /// 텍스트 파일에서 추출
    async fn extract_text(&self, path: &Path) -> Result<ExtractedContent> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read text file: {:?}", path))?;

        Ok(ExtractedContent {
            text,
            source_type: FileType::Text,
            total_pages: None,
        })
    }

    /// PDF 파일에서 추출
    async fn extract_pdf(&self, path: &Path) -> Result<ExtractedContent> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let path_buf = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || pdf::extract_pdf_pages(&path_buf))
            .await
            .context("PDF extraction task failed")??;

        let total_pages = pages.len();
        let text = pages.join("\n\n");

        Ok(ExtractedContent {
            text,
            source_type: FileType::Pdf,
            total_pages: Some(total_pages),
        })
    }

    /// 이미지 파일에서 추출 (OCR)
    async fn extract_image(&self, path: &Path) -> Result<ExtractedContent> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("API key required for image OCR"))?;

        let text = image::ocr_image(path, api_key).await?;

        Ok(ExtractedContent {
            text,
            source_type: FileType::Image,
            total_pages: None,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
