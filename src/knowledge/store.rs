//! 문서 저장소 - 업로드 파일당 JSON 레코드 하나
//!
//! 업로드된 파일 하나당 메타데이터 + 청크 시퀀스를 담은 레코드 하나를
//! JSON 사이드카 파일로 보관합니다. 원본 바이트와 같은 데이터 디렉토리에
//! 나란히 저장됩니다.
//! 저장 위치: ~/.studymate-rag/ (uploads/ + meta/)

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::chunker::Chunk;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.studymate-rag/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".studymate-rag")
}

// ============================================================================
// Types
// ============================================================================

/// 업로드 메타데이터 (수집 경계로 들어오는 값)
#[derive(Debug, Clone)]
pub struct UploadMeta {
    /// 사용자가 올린 원래 파일명
    pub original_name: String,
    /// 파일시스템 안전 저장 키
    pub storage_key: String,
    /// 원본 크기 (바이트)
    pub size_bytes: u64,
    /// MIME 타입
    pub mime_type: String,
}

/// 문서 레코드 - 업로드 메타데이터 + 파생 청크 시퀀스
///
/// 업로드 시점에 한 번 생성되며 부분 수정 없이 통째로 기록됩니다.
/// 청크가 0개인 레코드도 유효합니다 (추출 실패, 빈 파일 등).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub document_id: String,
    pub original_name: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub chunks: Vec<Chunk>,
}

impl DocumentRecord {
    /// 업로드 메타데이터와 청크로 새 레코드 생성
    pub fn new(meta: UploadMeta, chunks: Vec<Chunk>) -> Self {
        Self {
            document_id: uuid::Uuid::new_v4().to_string(),
            original_name: meta.original_name,
            storage_key: meta.storage_key,
            size_bytes: meta.size_bytes,
            mime_type: meta.mime_type,
            uploaded_at: Utc::now(),
            chunks,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    /// 키에 해당하는 레코드 없음
    #[error("record not found: {0}")]
    NotFound(String),

    /// 파일시스템 안전 조건을 어기는 저장 키
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serde(#[from] serde_json::Error),
}

// ============================================================================
// DocumentStore Trait
// ============================================================================

/// 문서 저장소 인터페이스
///
/// 테스트에서 인메모리 구현으로 대체할 수 있도록
/// 작은 키-값 인터페이스로 추상화합니다.
pub trait DocumentStore: Send + Sync {
    /// 레코드 전체 저장 (같은 키는 통째로 덮어쓰기, 부분 병합 없음)
    fn save(&self, record: &DocumentRecord) -> Result<(), StoreError>;

    /// 저장 키로 레코드 조회
    fn load(&self, storage_key: &str) -> Result<DocumentRecord, StoreError>;

    /// 전체 레코드 목록 (업로드 시간 내림차순)
    fn list(&self) -> Result<Vec<DocumentRecord>, StoreError>;

    /// 레코드 삭제 (존재했으면 true)
    fn delete(&self, storage_key: &str) -> Result<bool, StoreError>;
}

// ============================================================================
// FsDocumentStore
// ============================================================================

/// 파일시스템 문서 저장소
///
/// meta/<storage_key>.json 에 레코드를, uploads/<storage_key> 에 원본
/// 바이트를 둡니다. 쓰기는 임시 파일에 기록한 뒤 rename 하므로 읽는 쪽이
/// 반쯤 쓰인 레코드를 관찰할 수 없습니다. 같은 키에 대한 동시 업로드는
/// 마지막 쓰기가 이깁니다 (직렬화하지 않음).
pub struct FsDocumentStore {
    meta_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl FsDocumentStore {
    /// 저장소 열기 (디렉토리 없으면 생성)
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let meta_dir = data_dir.join("meta");
        let uploads_dir = data_dir.join("uploads");
        fs::create_dir_all(&meta_dir)?;
        fs::create_dir_all(&uploads_dir)?;

        tracing::debug!("Document store opened at {:?}", data_dir);

        Ok(Self {
            meta_dir,
            uploads_dir,
        })
    }

    /// 기본 위치에서 열기 (~/.studymate-rag/)
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&get_data_dir())
    }

    /// 원본 바이트 저장 디렉토리
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    fn record_path(&self, storage_key: &str) -> Result<PathBuf, StoreError> {
        if !is_safe_key(storage_key) {
            return Err(StoreError::InvalidKey(storage_key.to_string()));
        }
        Ok(self.meta_dir.join(format!("{}.json", storage_key)))
    }
}

impl DocumentStore for FsDocumentStore {
    fn save(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.storage_key)?;
        let json = serde_json::to_vec_pretty(record)?;

        // 임시 파일에 쓴 뒤 rename - 레코드 단위 원자적 쓰기
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &path)?;

        tracing::debug!(
            "Saved record: {} ({} chunks)",
            record.storage_key,
            record.chunks.len()
        );
        Ok(())
    }

    fn load(&self, storage_key: &str) -> Result<DocumentRecord, StoreError> {
        let path = self.record_path(storage_key)?;

        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(storage_key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn list(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.meta_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match fs::read(&path) {
                Ok(bytes) => match serde_json::from_slice::<DocumentRecord>(&bytes) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!("Skipping malformed record {:?}: {}", path, e),
                },
                Err(e) => tracing::warn!("Skipping unreadable record {:?}: {}", path, e),
            }
        }

        records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(records)
    }

    fn delete(&self, storage_key: &str) -> Result<bool, StoreError> {
        let path = self.record_path(storage_key)?;

        let existed = match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        // 원본 바이트도 함께 제거
        let upload_path = self.uploads_dir.join(storage_key);
        if let Err(e) = fs::remove_file(&upload_path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove upload bytes {:?}: {}", upload_path, e);
            }
        }

        Ok(existed)
    }
}

// ============================================================================
// MemoryDocumentStore
// ============================================================================

/// 인메모리 문서 저장소
///
/// 파이프라인 테스트에서 파일시스템 없이 사용합니다.
#[derive(Default)]
pub struct MemoryDocumentStore {
    records: Mutex<HashMap<String, DocumentRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn save(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records.insert(record.storage_key.clone(), record.clone());
        Ok(())
    }

    fn load(&self, storage_key: &str) -> Result<DocumentRecord, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(storage_key.to_string()))
    }

    fn list(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let mut all: Vec<DocumentRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(all)
    }

    fn delete(&self, storage_key: &str) -> Result<bool, StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.remove(storage_key).is_some())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 파일명을 파일시스템 안전 문자열로 정리
///
/// 영숫자와 `.`, `-`, `_` 외의 문자는 `_`로 바꿉니다.
pub fn sanitize_storage_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 새 저장 키 생성 (고유 접두어 + 정리된 파일명)
pub fn new_storage_key(original_name: &str) -> String {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", &unique[..8], sanitize_storage_key(original_name))
}

/// 경로 탈출이 불가능한 키인지 확인
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_meta(key: &str) -> UploadMeta {
        UploadMeta {
            original_name: "notes.txt".to_string(),
            storage_key: key.to_string(),
            size_bytes: 42,
            mime_type: "text/plain".to_string(),
        }
    }

    fn test_record(key: &str) -> DocumentRecord {
        let chunks = vec![
            Chunk {
                id: "chunk-0".to_string(),
                text: "first chunk".to_string(),
                ordinal: 0,
            },
            Chunk {
                id: "chunk-1".to_string(),
                text: "second chunk".to_string(),
                ordinal: 1,
            },
        ];
        DocumentRecord::new(test_meta(key), chunks)
    }

    fn create_fs_store() -> (TempDir, FsDocumentStore) {
        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (_dir, store) = create_fs_store();
        let record = test_record("abc-notes.txt");

        store.save(&record).unwrap();
        let loaded = store.load("abc-notes.txt").unwrap();

        assert_eq!(loaded, record);
        // 청크 순서 보존
        assert_eq!(loaded.chunks[0].ordinal, 0);
        assert_eq!(loaded.chunks[1].ordinal, 1);
    }

    #[test]
    fn test_load_nonexistent_key() {
        let (_dir, store) = create_fs_store();

        let err = store.load("nonexistent-key").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_save_overwrites_whole_record() {
        let (_dir, store) = create_fs_store();

        let first = test_record("same-key.txt");
        store.save(&first).unwrap();

        let mut second = test_record("same-key.txt");
        second.chunks.clear();
        store.save(&second).unwrap();

        // 부분 병합 없이 마지막 쓰기가 통째로 남는다
        let loaded = store.load("same-key.txt").unwrap();
        assert_eq!(loaded.document_id, second.document_id);
        assert!(loaded.chunks.is_empty());
    }

    #[test]
    fn test_zero_chunk_record_is_valid() {
        let (_dir, store) = create_fs_store();

        let record = DocumentRecord::new(test_meta("empty.pdf"), vec![]);
        store.save(&record).unwrap();

        let loaded = store.load("empty.pdf").unwrap();
        assert!(loaded.chunks.is_empty());
    }

    #[test]
    fn test_list_sorted_by_upload_time() {
        let (_dir, store) = create_fs_store();

        for i in 0..3i64 {
            let mut record = test_record(&format!("doc-{}.txt", i));
            record.uploaded_at = Utc::now() + chrono::Duration::seconds(i);
            store.save(&record).unwrap();
        }

        let list = store.list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].storage_key, "doc-2.txt");
        assert_eq!(list[2].storage_key, "doc-0.txt");
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = create_fs_store();

        store.save(&test_record("to-delete.txt")).unwrap();
        assert!(store.delete("to-delete.txt").unwrap());
        assert!(!store.delete("to-delete.txt").unwrap());

        let err = store.load("to-delete.txt").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_unsafe_key_rejected() {
        let (_dir, store) = create_fs_store();

        let err = store.load("../escape").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));

        let err = store.load("").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn test_no_partial_record_on_disk() {
        let (dir, store) = create_fs_store();
        store.save(&test_record("atomic.txt")).unwrap();

        // 임시 파일이 남아있지 않아야 한다
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("meta"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryDocumentStore::new();
        let record = test_record("mem-key.txt");

        store.save(&record).unwrap();
        assert_eq!(store.load("mem-key.txt").unwrap(), record);

        let err = store.load("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        assert!(store.delete("mem-key.txt").unwrap());
        assert!(!store.delete("mem-key.txt").unwrap());
    }

    #[test]
    fn test_sanitize_storage_key() {
        assert_eq!(sanitize_storage_key("notes.txt"), "notes.txt");
        assert_eq!(sanitize_storage_key("내 필기 1.pdf"), "_____1.pdf");
        assert_eq!(sanitize_storage_key("a/b\\c:d.txt"), "a_b_c_d.txt");
    }

    #[test]
    fn test_new_storage_key_unique() {
        let a = new_storage_key("notes.txt");
        let b = new_storage_key("notes.txt");

        assert_ne!(a, b);
        assert!(a.ends_with("-notes.txt"));
        assert!(is_safe_key(&a));
    }
}
