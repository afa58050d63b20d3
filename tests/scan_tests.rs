use photo_slideshow::error::Error;
use photo_slideshow::scan::{PlaybackOrder, ScanOptions, arrange, scan_images};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn touch(path: &std::path::Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"x").unwrap();
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn flat_scan_is_filtered_and_sorted() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("c.png"));
    touch(&root.join("a.jpg"));
    touch(&root.join("B.JPEG"));
    touch(&root.join("notes.txt"));
    touch(&root.join("nested").join("d.gif"));
    fs::create_dir_all(root.join("folder.jpg")).unwrap();

    let images = scan_images(&ScanOptions::new(root)).unwrap();
    assert_eq!(images, paths(&["B.JPEG", "a.jpg", "c.png"]));
}

#[test]
fn recursive_scan_returns_relative_paths() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("a.jpg"));
    touch(&root.join("nested").join("b.jpeg"));
    touch(&root.join("nested").join("deeper").join("c.gif"));

    let mut opts = ScanOptions::new(root);
    opts.recursive = true;
    let images = scan_images(&opts).unwrap();
    assert_eq!(
        images,
        paths(&["a.jpg", "nested/b.jpeg", "nested/deeper/c.gif"])
    );

    opts.max_depth = Some(2);
    let images = scan_images(&opts).unwrap();
    assert_eq!(images, paths(&["a.jpg", "nested/b.jpeg"]));
}

#[test]
fn hidden_entries_are_skipped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("visible.jpg"));
    touch(&root.join("._visible.jpg"));
    touch(&root.join(".thumbnails").join("t.jpg"));

    let mut opts = ScanOptions::new(root);
    opts.recursive = true;
    assert_eq!(scan_images(&opts).unwrap(), paths(&["visible.jpg"]));
}

#[test]
fn custom_extensions_replace_defaults() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("a.jpg"));
    touch(&root.join("b.webp"));

    let mut opts = ScanOptions::new(root);
    opts.extensions = vec!["webp".to_string()];
    assert_eq!(scan_images(&opts).unwrap(), paths(&["b.webp"]));
}

#[test]
fn missing_root_is_bad_dir() {
    let tmp = tempdir().unwrap();
    let err = scan_images(&ScanOptions::new(tmp.path().join("missing"))).unwrap_err();
    assert!(matches!(err, Error::BadDir(_)));

    let file = tmp.path().join("file.jpg");
    touch(&file);
    let err = scan_images(&ScanOptions::new(&file)).unwrap_err();
    assert!(matches!(err, Error::BadDir(_)));
}

#[test]
fn empty_directory_scans_to_empty_list() {
    let tmp = tempdir().unwrap();
    assert!(scan_images(&ScanOptions::new(tmp.path())).unwrap().is_empty());
}

#[test]
fn shuffle_is_a_seeded_permutation() {
    let sorted: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i:02}.jpg"))).collect();

    let mut first = sorted.clone();
    arrange(&mut first, PlaybackOrder::Shuffled, 99);
    let mut second = sorted.clone();
    arrange(&mut second, PlaybackOrder::Shuffled, 99);
    assert_eq!(first, second, "same seed must give the same order");
    assert_ne!(first, sorted, "twenty items should not shuffle back to sorted");

    let mut restored = first.clone();
    restored.sort();
    assert_eq!(restored, sorted);
}

#[test]
fn zero_max_depth_means_unlimited() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("ok.jpg"));
    touch(&root.join("a").join("b").join("c").join("deep.jpg"));

    let mut opts = ScanOptions::new(root);
    opts.recursive = true;
    opts.max_depth = Some(0);
    assert_eq!(
        scan_images(&opts).unwrap(),
        paths(&["a/b/c/deep.jpg", "ok.jpg"])
    );
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_names_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("ok.jpg"));
    touch(&root.join(OsStr::from_bytes(b"bad\xff.jpg")));

    let images = scan_images(&ScanOptions::new(root)).unwrap();
    assert_eq!(images, paths(&["ok.jpg"]));
}
