//! Archive export round-trip: exporting a commit then re-importing its
//! objects into an empty store yields exactly the commit's transitive
//! closure (§8 round-trip law).

use std::io::Cursor;

use codex_core::config::CodexConfig;
use codex_core::export::export_zip;
use codex_core::repository::Repository;

async fn put(repo: &Repository, payload: &[u8], content_type: &str) -> String {
    repo.objects
        .put_object_stream(Cursor::new(payload.to_vec()), content_type)
        .await
        .unwrap()
        .as_hex()
}

#[tokio::test]
async fn export_then_reimport_yields_exact_closure() {
    let source_dir = tempfile::tempdir().unwrap();
    let source_config = CodexConfig::new(source_dir.path());
    let source_repo = Repository::new(&source_config);

    let o1 = put(&source_repo, br#"{"urn":"urn:x:1","title":"X"}"#, "application/json").await;
    let o2 = put(&source_repo, b"binary-blob", "application/octet-stream").await;
    let commit = source_repo
        .create_commit(vec![], "author", "msg", vec![o1.clone(), o2.clone()])
        .await
        .unwrap();

    let archive = export_zip(&source_repo, &commit, Cursor::new(Vec::new())).await.unwrap();

    let dest_dir = tempfile::tempdir().unwrap();
    let dest_config = CodexConfig::new(dest_dir.path());
    let dest_repo = Repository::new(&dest_config);

    let mut zip = zip::ZipArchive::new(Cursor::new(archive.into_inner())).unwrap();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let name = entry.name().to_string();
        if let Some(hash) = name.strip_prefix("objects/") {
            if hash.ends_with(".meta.json") {
                continue;
            }
            let mut bytes = Vec::new();
            std::io::copy(&mut entry, &mut bytes).unwrap();
            let object_hash: codex_core::hash::ObjectHash = hash.parse().unwrap();
            dest_repo.objects.put_object(&object_hash, &bytes).await.unwrap();
        }
    }

    let mut listed = dest_repo.objects.list_objects("").await.unwrap();
    listed.sort();
    let mut expected = vec![o1, o2];
    expected.sort();
    assert_eq!(listed, expected);
}
