//! Tests for the persisted session slots.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use tempfile::TempDir;

use pzstore::session::{Language, Session};
use pzstore::storage::{FileStorage, StorageAdapter, keys};

fn jwt_expiring_at(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"id":"user-1","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}

#[test]
fn test_session_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let token = jwt_expiring_at(chrono::Utc::now().timestamp() + 3600);

    {
        let session = Session::new(Arc::new(FileStorage::in_dir(dir.path()).unwrap()));
        session.store_token(&token);
        session.set_language(Language::Es);
    }

    let session = Session::new(Arc::new(FileStorage::in_dir(dir.path()).unwrap()));
    assert_eq!(session.token(), Some(token));
    assert_eq!(session.language(), Language::Es);
}

#[test]
fn test_expired_token_is_removed_from_disk() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(FileStorage::in_dir(dir.path()).unwrap());
    storage.set(keys::TOKEN, &jwt_expiring_at(1_000));

    let session = Session::new(storage.clone());
    assert!(!session.is_authenticated());

    let reopened = FileStorage::in_dir(dir.path()).unwrap();
    assert_eq!(reopened.get(keys::TOKEN), None);
}

#[test]
fn test_corrupt_session_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").unwrap();

    let storage = FileStorage::at(path.clone());
    assert_eq!(storage.get(keys::TOKEN), None);

    storage.set(keys::TOKEN, "opaque-token");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("opaque-token"));
}

#[test]
fn test_logout_clears_only_token() {
    let dir = TempDir::new().unwrap();
    let session = Session::new(Arc::new(FileStorage::in_dir(dir.path()).unwrap()));
    session.store_token("opaque-token");
    session.set_language(Language::En);

    session.clear_token();

    assert_eq!(session.token(), None);
    assert_eq!(session.language(), Language::En);
}
