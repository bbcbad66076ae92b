//! 텍스트 청킹 모듈
//!
//! 정규화된 문서 텍스트를 검색 단위가 되는 청크 시퀀스로 분할합니다.
//! 문단 경계를 우선 존중하고, 너무 긴 문단은 고정 보폭으로 잘라
//! 인접 청크가 일부 겹치도록 합니다.

use serde::{Deserialize, Serialize};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수, 하드 상한)
    pub max_characters: usize,
    /// 긴 문단 분할 보폭 (문자 수, 최대 크기보다 작음)
    pub stride_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_characters: 1000,
            stride_characters: 800,
        }
    }
}

// ============================================================================
// Chunk
// ============================================================================

/// 청크 - 문서에서 잘라낸 검색 단위 텍스트 조각
///
/// `id`는 생성 시 한 번 부여되며 문서 내에서 재사용되지 않습니다.
/// `ordinal`은 생성 당시의 순서로, 동점 시 결정적 재선택에 쓰입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// 문서 내 고유 식별자
    pub id: String,
    /// 청크 본문 (trim 후 비어있지 않음)
    pub text: String,
    /// 생성 순서 (0부터)
    pub ordinal: usize,
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크 시퀀스로 분할
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// ParagraphChunker
// ============================================================================

/// 문단 기반 청커
///
/// 1. 연속된 줄바꿈으로 문단을 나누고, trim 후 빈 문단은 버립니다.
/// 2. 최대 크기 이하의 문단은 그대로 청크 하나가 됩니다.
/// 3. 초과하는 문단은 고정 보폭으로 잘라 인접 조각이
///    (max_characters - stride_characters)만큼 겹치게 합니다.
///    이 중첩은 경계에서 잘린 문장이 양쪽 조각에 모두 담기게 하는
///    의도된 동작입니다.
pub struct ParagraphChunker {
    config: ChunkConfig,
}

impl ParagraphChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// 문단을 최대 크기 이하의 조각으로 분할
    ///
    /// 정확히 최대 크기인 문단은 조각 하나가 됩니다.
    fn split_paragraph(&self, para: &str) -> Vec<String> {
        if para.chars().count() <= self.config.max_characters {
            return vec![para.to_string()];
        }

        // char 단위 슬라이싱 (UTF-8 바이트 경계 문제 회피)
        let chars: Vec<char> = para.chars().collect();
        let stride = self.config.stride_characters.max(1);

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.config.max_characters).min(chars.len());
            pieces.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        pieces
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();

        for para in text.split('\n') {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }

            for piece in self.split_paragraph(para) {
                // 공백만 남은 조각은 버린다
                if piece.trim().is_empty() {
                    continue;
                }

                let ordinal = chunks.len();
                chunks.push(Chunk {
                    id: format!("chunk-{}", ordinal),
                    text: piece,
                    ordinal,
                });
            }
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "ParagraphChunker"
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(ParagraphChunker::with_defaults())
}

/// 문단 청커 생성 (설정 지정)
pub fn paragraph_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(ParagraphChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_empty() {
        let chunker = ParagraphChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("  \n\n  ").is_empty());
    }

    #[test]
    fn test_chunk_short_paragraph() {
        let chunker = ParagraphChunker::with_defaults();
        let chunks = chunker.chunk("short paragraph");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "chunk-0");
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].text, "short paragraph");
    }

    #[test]
    fn test_chunk_at_threshold() {
        // 정확히 최대 크기인 문단은 청크 하나 (off-by-one 중복 없음)
        let chunker = ParagraphChunker::with_defaults();
        let para = "a".repeat(1000);

        let chunks = chunker.chunk(&para);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.len(), 1000);
    }

    #[test]
    fn test_chunk_over_threshold_splits() {
        let chunker = ParagraphChunker::with_defaults();
        let para = "a".repeat(1001);

        let chunks = chunker.chunk(&para);
        assert!(chunks.len() > 1);

        // 모든 청크는 최대 크기 이하
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 1000);
        }

        // 첫 조각은 최대 크기, 둘째 조각은 보폭 지점부터 끝까지
        assert_eq!(chunks[0].text.len(), 1000);
        assert_eq!(chunks[1].text.len(), 201);
    }

    #[test]
    fn test_chunk_overlap_preserves_boundary() {
        let config = ChunkConfig {
            max_characters: 10,
            stride_characters: 8,
        };
        let chunker = ParagraphChunker::new(config);

        let para = "abcdefghijklmnop"; // 16 chars
        let chunks = chunker.chunk(para);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "abcdefghij");
        // 둘째 조각은 보폭 지점(8)에서 시작해 앞 조각의 끝부분을 다시 포함
        assert_eq!(chunks[1].text, "ijklmnop");
    }

    #[test]
    fn test_chunk_multiple_paragraphs_ordered() {
        let chunker = ParagraphChunker::with_defaults();
        let text = "첫 번째 문단\n\n두 번째 문단\n세 번째 문단";

        let chunks = chunker.chunk(text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "첫 번째 문단");
        assert_eq!(chunks[1].text, "두 번째 문단");
        assert_eq!(chunks[2].text, "세 번째 문단");

        // ordinal은 생성 순서와 일치, id는 단조 증가
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i);
            assert_eq!(chunk.id, format!("chunk-{}", i));
        }
    }

    #[test]
    fn test_chunk_unicode_paragraph() {
        let chunker = ParagraphChunker::with_defaults();
        // 다중 바이트 문자로만 이루어진 긴 문단
        let para = "가".repeat(1100);

        let chunks = chunker.chunk(&para);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_chunk_discards_blank_lines() {
        let chunker = ParagraphChunker::with_defaults();
        let text = "\n\n  \nalpha\n   \nbeta\n\n";

        let chunks = chunker.chunk(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "alpha");
        assert_eq!(chunks[1].text, "beta");
    }

    #[test]
    fn test_config_default() {
        let config = ChunkConfig::default();
        assert_eq!(config.max_characters, 1000);
        assert_eq!(config.stride_characters, 800);
        assert!(config.stride_characters < config.max_characters);
    }
}
