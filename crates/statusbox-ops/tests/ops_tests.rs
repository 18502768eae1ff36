use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use statusbox_core::{
    AccessMode, BoxFuture, DirectFs, DirectoryChooser, FsEntry, IdTag, MediaKind, MediaLocation,
    MediaRecord, PermissionGate, ScannerConfig, ScopedHandle,
};
use statusbox_ops::{OpsError, SaveTarget, StatusLibrary, save_record};
use statusbox_scan::{Capabilities, LocalFs, LocalTreeAccess, MemoryStore};
use tempfile::TempDir;

/// Local filesystem whose writes stop halfway and fail.
#[derive(Default)]
struct TornWriteFs {
    inner: LocalFs,
}

impl DirectFs for TornWriteFs {
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
        self.inner.exists(path)
    }

    fn list<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<FsEntry>>> {
        self.inner.list(path)
    }

    fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<u8>>> {
        self.inner.read(path)
    }

    fn write<'a>(&'a self, path: &'a Path, contents: &'a [u8]) -> BoxFuture<'a, io::Result<()>> {
        self.inner.write(path, contents)
    }

    fn write_new<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a [u8],
    ) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let half = &contents[..contents.len() / 2];
            self.inner.write_new(path, half).await?;
            Err(io::Error::other("device unplugged"))
        })
    }

    fn copy_new<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<u64>> {
        self.inner.copy_new(from, to)
    }

    fn rename<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        self.inner.rename(from, to)
    }

    fn create_dir_all<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        self.inner.create_dir_all(path)
    }

    fn remove_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        self.inner.remove_file(path)
    }
}

struct Granted;

impl PermissionGate for Granted {
    fn check_and_request(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }
}

struct Chooser(Option<ScopedHandle>);

impl DirectoryChooser for Chooser {
    fn choose(&self) -> BoxFuture<'_, io::Result<Option<ScopedHandle>>> {
        let picked = self.0.clone();
        Box::pin(async move { Ok(picked) })
    }
}

fn save_dir(temp: &TempDir) -> PathBuf {
    temp.path().join("Pictures").join("StatusBox")
}

fn target(temp: &TempDir) -> SaveTarget {
    SaveTarget::new(save_dir(temp), "StatusBox")
}

fn scoped_record(handle: ScopedHandle, name: &str) -> MediaRecord {
    MediaRecord::scoped(
        handle.clone(),
        MediaLocation::Scoped(handle),
        name,
        MediaKind::Video,
        5,
        1_700,
    )
}

fn saved_files(temp: &TempDir) -> Vec<PathBuf> {
    match fs::read_dir(save_dir(temp)) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_save_direct_record_copies_file() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("img1.jpg");
    fs::write(&source, "jpeg-bytes").unwrap();
    let record = MediaRecord::direct(IdTag::Raw, source.clone(), "img1.jpg", MediaKind::Image, 10, 1);

    let dest = save_record(&LocalFs::new(), &LocalTreeAccess::new(), &target(&temp), &record)
        .await
        .unwrap();

    let name = dest.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("StatusBox_"));
    assert!(name.ends_with(".jpg"));
    assert_ne!(name, "img1.jpg");
    assert_eq!(fs::read(&dest).unwrap(), b"jpeg-bytes");
    assert!(source.exists());
}

#[tokio::test]
async fn test_save_scoped_record_reads_through_handle() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("granted").join("clip.mp4");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, "video").unwrap();
    let record = scoped_record(LocalTreeAccess::handle_for(&source), "clip.mp4");

    let dest = save_record(&LocalFs::new(), &LocalTreeAccess::new(), &target(&temp), &record)
        .await
        .unwrap();

    assert_eq!(dest.extension().unwrap(), "mp4");
    assert_eq!(fs::read(&dest).unwrap(), b"video");
}

#[tokio::test]
async fn test_save_scoped_read_fault_is_reported() {
    let temp = TempDir::new().unwrap();
    let record = scoped_record(
        LocalTreeAccess::handle_for(temp.path().join("revoked.mp4")),
        "revoked.mp4",
    );

    let err = save_record(&LocalFs::new(), &LocalTreeAccess::new(), &target(&temp), &record)
        .await
        .unwrap_err();

    assert!(matches!(err, OpsError::ReadSource { .. }));
    assert!(saved_files(&temp).is_empty());
}

#[tokio::test]
async fn test_save_torn_write_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("clip.mp4");
    fs::write(&source, "0123456789").unwrap();
    let record = scoped_record(LocalTreeAccess::handle_for(&source), "clip.mp4");

    let err = save_record(&TornWriteFs::default(), &LocalTreeAccess::new(), &target(&temp), &record)
        .await
        .unwrap_err();

    assert!(matches!(err, OpsError::WriteDestination { .. }));
    assert!(saved_files(&temp).is_empty());
}

#[tokio::test]
async fn test_simultaneous_saves_keep_both_copies() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first.jpg");
    let second = temp.path().join("second.jpg");
    fs::write(&first, "first").unwrap();
    fs::write(&second, "second").unwrap();
    let a = MediaRecord::direct(IdTag::Raw, first, "first.jpg", MediaKind::Image, 5, 1);
    let b = MediaRecord::direct(IdTag::Raw, second, "second.jpg", MediaKind::Image, 6, 2);

    let fs_cap = LocalFs::new();
    let scoped = LocalTreeAccess::new();
    let target = target(&temp);

    for _ in 0..20 {
        let (saved_a, saved_b) = tokio::join!(
            save_record(&fs_cap, &scoped, &target, &a),
            save_record(&fs_cap, &scoped, &target, &b),
        );
        let (saved_a, saved_b) = (saved_a.unwrap(), saved_b.unwrap());

        assert_ne!(saved_a, saved_b);
        assert_eq!(fs::read(&saved_a).unwrap(), b"first");
        assert_eq!(fs::read(&saved_b).unwrap(), b"second");
    }
    assert_eq!(saved_files(&temp).len(), 40);
}

#[tokio::test]
async fn test_save_never_overwrites_existing_copy() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("clip.mp4");
    fs::write(&source, "new").unwrap();
    let record = scoped_record(LocalTreeAccess::handle_for(&source), "clip.mp4");

    // Fill every name a save in the next few seconds could pick
    let now = chrono::Utc::now().timestamp_millis();
    fs::create_dir_all(save_dir(&temp)).unwrap();
    for ts in now..now + 3_000 {
        fs::write(save_dir(&temp).join(format!("StatusBox_{ts}.mp4")), "old").unwrap();
    }

    let dest = save_record(&LocalFs::new(), &LocalTreeAccess::new(), &target(&temp), &record)
        .await
        .unwrap();

    assert!(dest.file_stem().unwrap().to_str().unwrap().ends_with("_1"));
    assert_eq!(fs::read(&dest).unwrap(), b"new");
}

#[tokio::test]
async fn test_save_direct_missing_source_fails() {
    let temp = TempDir::new().unwrap();
    let record = MediaRecord::direct(
        IdTag::Raw,
        temp.path().join("gone.jpg"),
        "gone.jpg",
        MediaKind::Image,
        0,
        1,
    );

    let err = save_record(&LocalFs::new(), &LocalTreeAccess::new(), &target(&temp), &record)
        .await
        .unwrap_err();

    assert!(matches!(err, OpsError::Copy { .. }));
    assert!(saved_files(&temp).is_empty());
}

#[tokio::test]
async fn test_save_rejects_mismatched_source() {
    let temp = TempDir::new().unwrap();
    let mut record = scoped_record(ScopedHandle::new("tree:///x.mp4"), "x.mp4");
    record.access_mode = AccessMode::Direct;

    let err = save_record(&LocalFs::new(), &LocalTreeAccess::new(), &target(&temp), &record)
        .await
        .unwrap_err();

    assert!(matches!(err, OpsError::InvalidSource { .. }));
}

#[tokio::test]
async fn test_library_scan_save_list_delete() {
    let temp = TempDir::new().unwrap();
    let granted = temp.path().join("granted");
    let statuses = granted.join("com.whatsapp/WhatsApp/Media/.Statuses");
    fs::create_dir_all(&statuses).unwrap();
    fs::write(statuses.join("clip.mp4"), "video").unwrap();
    fs::write(statuses.join("pic.jpg"), "image").unwrap();

    let config = ScannerConfig::builder()
        .candidate_dirs(vec![temp.path().join("no-direct-access")])
        .cache_dir(temp.path().join("cache"))
        .save_dir(save_dir(&temp))
        .state_file(temp.path().join("state.toml"))
        .build()
        .unwrap();
    let caps = Capabilities {
        fs: Arc::new(LocalFs::new()),
        scoped: Arc::new(LocalTreeAccess::new()),
        store: Arc::new(MemoryStore::new()),
        chooser: Arc::new(Chooser(Some(LocalTreeAccess::handle_for(&granted)))),
        permissions: Arc::new(Granted),
    };
    let library = StatusLibrary::new(config, caps);

    // Nothing remembered yet
    assert!(library.scan().await.unwrap().is_empty());

    let records = library.trigger_chooser_and_scan().await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.access_mode == AccessMode::Scoped));
    assert!(records.iter().all(|r| r.display.is_local()));

    assert!(library.list_saved().await.is_empty());
    let video = records.iter().find(|r| r.is_video()).unwrap();
    let saved_path = library.save(video).await.unwrap();

    let saved = library.list_saved().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].kind, MediaKind::Video);
    assert_eq!(saved[0].source, MediaLocation::Path(saved_path.clone()));

    library.delete(&saved[0].source.to_uri()).await.unwrap();
    assert!(!saved_path.exists());
    assert!(library.list_saved().await.is_empty());
}
