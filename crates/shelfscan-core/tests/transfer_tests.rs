use std::collections::BTreeSet;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

use shelfscan_core::storage::{Database, FileRecord};
use shelfscan_core::transfer::{
    CatalogExporter, CatalogImporter, FileRow, PageWriter, TAGS_FILE, TAG_LINKS_FILE,
};
use shelfscan_core::{Error, ProgressReporter, SilentReporter};

fn record_with_id(id: i64, hash: &str, directory: &str, filename: &str) -> FileRecord {
    let mut record = FileRecord::candidate(hash, directory, filename);
    record.id = id;
    record
}

fn populate(db: &Database, count: usize) {
    for i in 0..count {
        db.insert_file(&FileRecord::candidate(
            &format!("hash{:04}", i),
            "shelf",
            &format!("file{:04}.pdf", i),
        ))
        .unwrap();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageEvent {
    Open(usize),
    Row(i64),
    Close(bool),
}

#[derive(Default)]
struct RecordingWriter {
    events: Vec<PageEvent>,
}

impl RecordingWriter {
    /// Row count of each page, in page order.
    fn page_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        for event in &self.events {
            match event {
                PageEvent::Open(_) => sizes.push(0),
                PageEvent::Row(_) => *sizes.last_mut().unwrap() += 1,
                PageEvent::Close(_) => {}
            }
        }
        sizes
    }

    fn closes(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PageEvent::Close(last) => Some(*last),
                _ => None,
            })
            .collect()
    }
}

impl PageWriter for RecordingWriter {
    fn open_new_page(&mut self, page: usize) -> Result<(), Error> {
        self.events.push(PageEvent::Open(page));
        Ok(())
    }

    fn write_row(&mut self, row: &FileRow) -> Result<(), Error> {
        self.events.push(PageEvent::Row(row.id));
        Ok(())
    }

    fn close(&mut self, is_last_page: bool) -> Result<(), Error> {
        self.events.push(PageEvent::Close(is_last_page));
        Ok(())
    }
}

#[test]
fn test_pagination_page_counts() {
    for (rows, expected) in [
        (0usize, vec![]),
        (1, vec![1]),
        (100, vec![100]),
        (101, vec![100, 1]),
        (250, vec![100, 100, 50]),
    ] {
        let db = Database::open_in_memory().unwrap();
        populate(&db, rows);
        let notes = tempdir().unwrap();
        let mut writer = RecordingWriter::default();

        let summary = CatalogExporter::new(notes.path(), 100)
            .export_with(&db, &mut writer, &SilentReporter)
            .unwrap();

        assert_eq!(writer.page_sizes(), expected, "rows = {}", rows);
        assert_eq!(summary.pages, expected.len());
        assert_eq!(summary.rows, rows);

        let closes = writer.closes();
        assert_eq!(closes.len(), expected.len());
        assert_eq!(closes.iter().filter(|last| **last).count(), usize::from(rows > 0));
        if let Some(last) = closes.last() {
            assert!(*last);
        }

        let opened: Vec<usize> = writer
            .events
            .iter()
            .filter_map(|e| match e {
                PageEvent::Open(page) => Some(*page),
                _ => None,
            })
            .collect();
        assert_eq!(opened, (1..=expected.len()).collect::<Vec<_>>());
    }
}

#[test]
fn test_export_rows_ordered_by_id_and_skip_deleted() {
    let db = Database::open_in_memory().unwrap();
    db.insert_file_with_id(&record_with_id(30, "c", "", "c.pdf")).unwrap();
    db.insert_file_with_id(&record_with_id(10, "a", "", "a.pdf")).unwrap();
    db.insert_file_with_id(&record_with_id(20, "b", "", "b.pdf")).unwrap();
    db.mark_all_deleted().unwrap();
    db.connection()
        .execute("UPDATE any_file SET is_deleted = 0 WHERE id IN (10, 30)", [])
        .unwrap();

    let notes = tempdir().unwrap();
    let mut writer = RecordingWriter::default();
    CatalogExporter::new(notes.path(), 100)
        .export_with(&db, &mut writer, &SilentReporter)
        .unwrap();

    let rows: Vec<i64> = writer
        .events
        .iter()
        .filter_map(|e| match e {
            PageEvent::Row(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(rows, vec![10, 30]);
}

#[test]
fn test_export_writes_csv_files() {
    let db = Database::open_in_memory().unwrap();
    db.insert_file_with_id(&record_with_id(1, "abc", "sci", "dune.epub")).unwrap();
    let root = db.insert_tag("fiction", None).unwrap();
    let child = db.insert_tag("sf", Some(root.id)).unwrap();
    db.assign_tag(child.id, 1).unwrap();

    let notes = tempdir().unwrap();
    let summary = CatalogExporter::new(notes.path(), 100)
        .export(&db, &SilentReporter)
        .unwrap();
    assert_eq!(summary.pages, 1);

    assert_eq!(
        fs::read_to_string(notes.path().join("files-00001.csv")).unwrap(),
        "abc,1,sci,dune.epub\n"
    );
    assert_eq!(
        fs::read_to_string(notes.path().join(TAGS_FILE)).unwrap(),
        format!("{},fiction,\n{},sf,{}\n", root.id, child.id, root.id)
    );
    assert_eq!(
        fs::read_to_string(notes.path().join(TAG_LINKS_FILE)).unwrap(),
        format!("1,{}\n", child.id)
    );
}

#[test]
fn test_re_export_removes_stale_pages() {
    let notes = tempdir().unwrap();
    let big = Database::open_in_memory().unwrap();
    populate(&big, 5);
    CatalogExporter::new(notes.path(), 2).export(&big, &SilentReporter).unwrap();
    assert!(notes.path().join("files-00003.csv").exists());

    let small = Database::open_in_memory().unwrap();
    populate(&small, 1);
    CatalogExporter::new(notes.path(), 2).export(&small, &SilentReporter).unwrap();
    assert!(notes.path().join("files-00001.csv").exists());
    assert!(!notes.path().join("files-00002.csv").exists());
    assert!(!notes.path().join("files-00003.csv").exists());
}

type Snapshot = (
    BTreeSet<(i64, String, String, String)>,
    BTreeSet<(i64, String, Option<i64>)>,
    BTreeSet<(i64, i64)>,
);

fn snapshot(db: &Database) -> Snapshot {
    let mut files = BTreeSet::new();
    db.for_each_live_file(|r| {
        files.insert((r.id, r.hash.clone(), r.directory.clone(), r.filename.clone()));
        Ok(())
    })
    .unwrap();
    let tags = db
        .select_all_tags()
        .unwrap()
        .into_iter()
        .map(|t| (t.id, t.name, t.parent_id))
        .collect();
    let links = db.select_all_tag_links().unwrap().into_iter().collect();
    (files, tags, links)
}

#[test]
fn test_export_import_round_trip() {
    let source = Database::open_in_memory().unwrap();
    source.insert_file_with_id(&record_with_id(3, "h3", "", "root.pdf")).unwrap();
    source.insert_file_with_id(&record_with_id(17, "h17", "a, b", "quoted \"name\".pdf")).unwrap();
    source.insert_file_with_id(&record_with_id(42, "h42", "deep/er", "книга.fb2")).unwrap();
    let fiction = source.insert_tag("fiction", None).unwrap();
    let sf = source.insert_tag("sf", Some(fiction.id)).unwrap();
    let space = source.insert_tag("space opera", Some(sf.id)).unwrap();
    let other = source.insert_tag("other", None).unwrap();
    source.assign_tag(space.id, 17).unwrap();
    source.assign_tag(fiction.id, 17).unwrap();
    source.assign_tag(other.id, 42).unwrap();

    let notes = tempdir().unwrap();
    CatalogExporter::new(notes.path(), 2)
        .export(&source, &SilentReporter)
        .unwrap();

    let target = Database::open_in_memory().unwrap();
    let summary = CatalogImporter::new(notes.path())
        .import(&target, &SilentReporter)
        .unwrap();

    assert_eq!(summary.rows, 3);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.tags, 4);
    assert_eq!(summary.links, 3);
    assert_eq!(snapshot(&target), snapshot(&source));

    // ids keep working for new inserts after import
    let new_id = target
        .insert_file(&FileRecord::candidate("fresh", "", "fresh.pdf"))
        .unwrap();
    assert!(new_id > 42);
}

#[derive(Default)]
struct CountingReporter {
    exported: Mutex<Vec<(usize, usize, usize)>>,
    imported: Mutex<Vec<usize>>,
}

impl ProgressReporter for CountingReporter {
    fn on_exported(&self, rows_exported: usize, total_rows: usize, page: usize) {
        self.exported
            .lock()
            .unwrap()
            .push((rows_exported, total_rows, page));
    }

    fn on_imported(&self, rows_imported: usize) {
        self.imported.lock().unwrap().push(rows_imported);
    }
}

#[test]
fn test_transfer_progress_callbacks() {
    let source = Database::open_in_memory().unwrap();
    populate(&source, 5);
    let notes = tempdir().unwrap();
    let reporter = CountingReporter::default();

    CatalogExporter::new(notes.path(), 2)
        .export(&source, &reporter)
        .unwrap();
    assert_eq!(
        *reporter.exported.lock().unwrap(),
        vec![(2, 5, 2), (4, 5, 3), (5, 5, 3)]
    );

    let target = Database::open_in_memory().unwrap();
    CatalogImporter::new(notes.path())
        .import(&target, &reporter)
        .unwrap();
    assert_eq!(*reporter.imported.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_import_fails_fast_on_unknown_tag() {
    let notes = tempdir().unwrap();
    fs::write(notes.path().join("files-00001.csv"), "h1,1,,a.pdf\n").unwrap();
    fs::write(notes.path().join(TAGS_FILE), "1,fiction,\n").unwrap();
    fs::write(notes.path().join(TAG_LINKS_FILE), "1,1\n1,7\n").unwrap();

    let db = Database::open_in_memory().unwrap();
    let err = CatalogImporter::new(notes.path())
        .import(&db, &SilentReporter)
        .unwrap_err();
    match err {
        Error::Import { file, line, .. } => {
            assert_eq!(file, TAG_LINKS_FILE);
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {}", other),
    }

    // nothing kept
    assert_eq!(db.count_files().unwrap(), 0);
    assert!(db.select_all_tags().unwrap().is_empty());
}

#[test]
fn test_import_fails_on_unknown_parent_and_malformed_rows() {
    let notes = tempdir().unwrap();
    fs::write(notes.path().join("files-00001.csv"), "h1,1,,a.pdf\n").unwrap();
    fs::write(notes.path().join(TAGS_FILE), "1,fiction,\n2,sf,9\n").unwrap();
    fs::write(notes.path().join(TAG_LINKS_FILE), "").unwrap();

    let db = Database::open_in_memory().unwrap();
    let err = CatalogImporter::new(notes.path())
        .import(&db, &SilentReporter)
        .unwrap_err();
    assert!(matches!(err, Error::Import { line: 2, .. }));

    fs::write(notes.path().join(TAGS_FILE), "").unwrap();
    fs::write(notes.path().join("files-00001.csv"), "h1,not-a-number,,a.pdf\n").unwrap();
    let err = CatalogImporter::new(notes.path())
        .import(&db, &SilentReporter)
        .unwrap_err();
    assert!(matches!(err, Error::Import { line: 1, .. }));
    assert_eq!(db.count_files().unwrap(), 0);
}

#[test]
fn test_import_parent_listed_after_child() {
    let notes = tempdir().unwrap();
    fs::write(notes.path().join(TAGS_FILE), "1,child,5\n5,parent,\n").unwrap();
    fs::write(notes.path().join(TAG_LINKS_FILE), "").unwrap();

    let db = Database::open_in_memory().unwrap();
    CatalogImporter::new(notes.path())
        .import(&db, &SilentReporter)
        .unwrap();
    assert_eq!(db.select_tags(Some(5)).unwrap()[0].name, "child");
}
