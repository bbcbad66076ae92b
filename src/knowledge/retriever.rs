//! 키워드 검색 모듈 - 질문 토큰 일치 기반 청크 선별
//!
//! 임베딩이나 벡터 인덱스 없이, 질문 토큰의 리터럴 출현 횟수로
//! 청크를 점수화합니다. 일치하는 청크가 하나도 없어도 문서 선두
//! 청크를 폴백으로 돌려주어 후속 LLM 호출이 항상 컨텍스트를 받습니다.

use regex::Regex;

use super::chunker::Chunk;

// ============================================================================
// Configuration
// ============================================================================

/// 검색 설정
#[derive(Debug, Clone)]
pub struct RetrieveConfig {
    /// 반환할 최대 청크 수
    pub limit: usize,
    /// 점수가 전부 0일 때 돌려줄 선두 청크 수
    pub fallback_count: usize,
    /// 이 길이 미만의 토큰은 버림 (사전 없이 길이로 거르는 불용어 필터)
    pub min_token_chars: usize,
}

impl Default for RetrieveConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            fallback_count: 4,
            min_token_chars: 4,
        }
    }
}

// ============================================================================
// Tokenization
// ============================================================================

/// 질문을 검색 토큰으로 분해
///
/// 소문자화 후 영숫자 이외의 문자에서 끊고, 짧은 토큰("is", "the" 등)은
/// 버립니다.
pub fn tokenize_question(question: &str, min_token_chars: usize) -> Vec<String> {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= min_token_chars)
        .map(|t| t.to_string())
        .collect()
}

// ============================================================================
// Retrieval
// ============================================================================

/// 청크 점수 계산
///
/// 각 토큰의 대소문자 무시 리터럴 출현 횟수 합계입니다.
fn score_chunk(text: &str, patterns: &[Regex]) -> usize {
    patterns.iter().map(|p| p.find_iter(text).count()).sum()
}

/// 질문과의 토큰 일치로 청크 선별
///
/// 점수 내림차순으로 정렬하고, 동점은 ordinal 오름차순으로 깨서
/// 같은 입력에 항상 같은 출력을 냅니다. 양수 점수 청크가 하나도 없으면
/// 원래 순서의 선두 `fallback_count`개를 돌려줍니다.
/// 청크가 하나라도 있으면 결과는 비지 않습니다.
pub fn retrieve(chunks: &[Chunk], question: &str, config: &RetrieveConfig) -> Vec<Chunk> {
    if chunks.is_empty() {
        return vec![];
    }

    let tokens = tokenize_question(question, config.min_token_chars);

    // 토큰을 이스케이프한 리터럴 패턴으로 컴파일 (퍼지 매칭 아님)
    let patterns: Vec<Regex> = tokens
        .iter()
        .filter_map(|t| Regex::new(&format!("(?i){}", regex::escape(t))).ok())
        .collect();

    let mut scored: Vec<(usize, &Chunk)> = chunks
        .iter()
        .map(|c| (score_chunk(&c.text, &patterns), c))
        .collect();

    // 점수 내림차순, 동점은 ordinal 오름차순
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.ordinal.cmp(&b.1.ordinal)));

    let selected: Vec<Chunk> = scored
        .iter()
        .filter(|(score, _)| *score > 0)
        .take(config.limit)
        .map(|(_, c)| (*c).clone())
        .collect();

    if !selected.is_empty() {
        return selected;
    }

    // 폴백 - 토큰 일치가 없어도 빈 결과 대신 문서 선두를 돌려준다
    chunks
        .iter()
        .take(config.fallback_count)
        .cloned()
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
