//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트로 PDF에서 텍스트를 뽑아 페이지 목록으로 돌려줍니다.
//! 스캔 문서처럼 텍스트 레이어가 없는 PDF는 빈 페이지 하나가 됩니다.

use std::path::Path;

use anyhow::{Context, Result};

/// PDF에서 페이지별 텍스트 추출
pub fn extract_pdf_pages(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![String::new()]);
    }

    Ok(split_pages(&text))
}

/// 추출된 텍스트를 페이지 단위로 분리
///
/// pdf-extract는 페이지 경계를 폼피드 문자(\x0c)로 표시합니다.
/// 폼피드가 없으면 전체를 한 페이지로 취급합니다.
fn split_pages(text: &str) -> Vec<String> {
    let pages: Vec<String> = text
        .split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pages.is_empty() {
        vec![text.trim().to_string()]
    } else {
        pages
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_with_formfeed() {
        let text = "1장 내용\x0c2장 내용\x0c3장 내용";
        let pages = split_pages(text);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], "1장 내용");
        assert_eq!(pages[2], "3장 내용");
    }

    #[test]
    fn test_split_pages_no_separator() {
        let pages = split_pages("페이지 구분 없는 본문");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0], "페이지 구분 없는 본문");
    }

    #[test]
    fn test_split_pages_drops_blank_pages() {
        let text = "앞 페이지\x0c   \x0c뒤 페이지";
        let pages = split_pages(text);

        assert_eq!(pages.len(), 2);
    }
}
