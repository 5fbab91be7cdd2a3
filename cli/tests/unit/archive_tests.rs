//! Packager behavior: relative entries, content fidelity, idempotence.

use std::collections::BTreeMap;
use std::io::Read;

use loom_cli::archive;
use tempfile::TempDir;
use zip::ZipArchive;

/// Entry name → byte content for every entry in the archive at `path`.
fn entries(path: &std::path::Path) -> BTreeMap<String, Vec<u8>> {
    let file = std::fs::File::open(path).expect("open archive");
    let mut zip = ZipArchive::new(file).expect("read archive");
    let mut map = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).expect("entry");
        let mut content = Vec::new();
        entry.read_to_end(&mut content).expect("entry content");
        map.insert(entry.name().to_string(), content);
    }
    map
}

#[test]
fn round_trip_preserves_relative_paths_and_content() {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::create_dir(tmp.path().join("a")).expect("mkdir a");
    std::fs::write(tmp.path().join("a").join("b.txt"), b"nested").expect("write a/b.txt");
    std::fs::write(tmp.path().join("c.txt"), b"top-level").expect("write c.txt");

    let dest = archive::pack(tmp.path()).expect("pack");
    assert_eq!(dest, tmp.path().join("upload.zip"));

    let map = entries(&dest);
    assert_eq!(
        map.keys().cloned().collect::<Vec<_>>(),
        vec!["a/b.txt".to_string(), "c.txt".to_string()]
    );
    assert_eq!(map["a/b.txt"], b"nested");
    assert_eq!(map["c.txt"], b"top-level");
}

#[test]
fn directories_are_not_entries() {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::create_dir_all(tmp.path().join("src").join("empty")).expect("mkdirs");
    std::fs::write(tmp.path().join("src").join("app.py"), b"pass").expect("write");

    let dest = archive::pack(tmp.path()).expect("pack");
    let map = entries(&dest);
    assert_eq!(map.keys().cloned().collect::<Vec<_>>(), vec!["src/app.py"]);
}

#[test]
fn repacking_is_idempotent_and_excludes_the_archive_itself() {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::write(tmp.path().join("c.txt"), b"same").expect("write");

    let first = entries(&archive::pack(tmp.path()).expect("first pack"));
    // upload.zip now sits inside the tree being walked.
    let second = entries(&archive::pack(tmp.path()).expect("second pack"));

    assert_eq!(first, second);
    assert!(!second.contains_key("upload.zip"));
}

#[test]
fn missing_root_is_an_error() {
    let err = archive::pack(std::path::Path::new("/definitely/not/here"));
    assert!(err.is_err());
}
