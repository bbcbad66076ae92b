//! 이미지 OCR 모듈
//!
//! Gemini Vision API로 필기 사진, 교재 스캔 등 이미지 업로드에서
//! 텍스트를 추출합니다. 텍스트가 없는 이미지는 빈 문자열이 될 수 있으며
//! 수집 경계가 이를 허용합니다.

use std::path::Path;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Gemini Vision API 엔드포인트
const GEMINI_VISION_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// OCR 프롬프트
const OCR_PROMPT: &str = r#"이 이미지에 보이는 모든 텍스트를 추출해주세요.

지시사항:
1. 필기, 인쇄물, 표, 수식 등 보이는 텍스트를 전부 포함합니다
2. 원본의 문단 구조를 최대한 유지합니다
3. 해설이나 요약을 덧붙이지 않습니다
4. 텍스트가 전혀 없으면 빈 응답을 돌려줍니다

추출된 텍스트:"#;

/// 이미지에서 텍스트 추출 (OCR)
pub async fn ocr_image(path: &Path, api_key: &str) -> Result<String> {
    // 1. 이미지 파일 읽기
    let image_data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image: {:?}", path))?;

    // 2. MIME 타입 결정
    let mime_type = image_mime_type(path)?;

    // 3. Base64 인코딩 후 요청 구성
    let request = OcrRequest {
        contents: vec![OcrContent {
            parts: vec![
                OcrPart::Text {
                    text: OCR_PROMPT.to_string(),
                },
                OcrPart::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.to_string(),
                        data: STANDARD.encode(&image_data),
                    },
                },
            ],
        }],
        generation_config: OcrGenerationConfig {
            temperature: 0.1,
            max_output_tokens: 8192,
        },
    };

    // 4. API 호출
    let client = reqwest::Client::new();
    let response = client
        .post(GEMINI_VISION_URL)
        .header("x-goog-api-key", api_key)
        .json(&request)
        .send()
        .await
        .context("Failed to send OCR request")?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        anyhow::bail!("Vision API error ({}): {}", status, body);
    }

    // 5. 응답에서 텍스트 추출
    let parsed: OcrResponse = serde_json::from_str(&body).context("Failed to parse OCR response")?;

    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .unwrap_or_default();

    if text.trim().is_empty() {
        tracing::warn!("No text recognized in image: {:?}", path);
    }

    Ok(text)
}

/// 이미지 파일의 MIME 타입 결정
fn image_mime_type(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        "bmp" => Ok("image/bmp"),
        _ => anyhow::bail!("Unsupported image format: {}", ext),
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OcrRequest {
    contents: Vec<OcrContent>,
    #[serde(rename = "generationConfig")]
    generation_config: OcrGenerationConfig,
}

#[derive(Debug, Serialize)]
struct OcrContent {
    parts: Vec<OcrPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OcrPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct OcrGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    candidates: Vec<OcrCandidate>,
}

#[derive(Debug, Deserialize)]
struct OcrCandidate {
    content: OcrCandidateContent,
}

#[derive(Debug, Deserialize)]
struct OcrCandidateContent {
    parts: Vec<OcrTextPart>,
}

#[derive(Debug, Deserialize)]
struct OcrTextPart {
    text: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(Path::new("note.png")).unwrap(), "image/png");
        assert_eq!(
            image_mime_type(Path::new("scan.JPEG")).unwrap(),
            "image/jpeg"
        );
        assert!(image_mime_type(Path::new("note.txt")).is_err());
        assert!(image_mime_type(Path::new("noextension")).is_err());
    }
}
