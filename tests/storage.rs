use bookstation::model::types::BookDraft;
use bookstation::storage::sqlite::SqliteStore;
use bookstation::storage::Catalog;

fn draft(title: &str, author: &str, genre: &str) -> BookDraft {
    BookDraft {
        title: title.into(),
        author: author.into(),
        genre: genre.into(),
        publication_date: "1999-12-31".into(),
        isbn: "9780441172719".into(),
        stock: 1,
    }
}

fn seeded() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open");
    store.insert(&draft("Dune", "Frank Herbert", "Fiction")).unwrap();
    store.insert(&draft("Dracula", "Bram Stoker", "Horror")).unwrap();
    store
        .insert(&draft("Frankenstein", "Mary Shelley", "Horror"))
        .unwrap();
    store
}

#[test]
fn schema_version_created_on_open() {
    let tmp = tempfile::TempDir::new().unwrap();
    let db_path = tmp.path().join("store.db");
    let store = SqliteStore::open(&db_path).expect("open");

    assert_eq!(store.schema_version().unwrap(), 1);

    // If the meta row is removed, the getter surfaces an error.
    store.raw().execute("DELETE FROM meta", []).unwrap();
    assert!(store.schema_version().is_err());
}

#[test]
fn insert_assigns_sequential_ids_and_list_preserves_order() {
    let store = seeded();
    let books = store.list_all().unwrap();
    assert_eq!(books.len(), 3);
    assert_eq!(books[0].id, 1);
    assert_eq!(books[0].title, "Dune");
    assert_eq!(books[2].title, "Frankenstein");
}

#[test]
fn search_is_prefix_only() {
    let store = seeded();
    // "Fran" prefixes both the author Frank Herbert and the title
    // Frankenstein.
    let hits = store.search_by_prefix("Fran").unwrap();
    assert_eq!(hits.len(), 2);

    // "rank" appears inside both but prefixes neither.
    let hits = store.search_by_prefix("rank").unwrap();
    assert!(hits.is_empty());
}

#[test]
fn search_is_case_insensitive_across_fields() {
    let store = seeded();
    let hits = store.search_by_prefix("dRaC").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Dracula");

    // Genre prefix matches too.
    let hits = store.search_by_prefix("horr").unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn search_escapes_like_wildcards() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .insert(&draft("Percent Signs", "A. Writer", "Essays"))
        .unwrap();
    // A bare "%" would match everything if passed through unescaped.
    assert!(store.search_by_prefix("%").unwrap().is_empty());
    assert!(store.search_by_prefix("_").unwrap().is_empty());
    assert_eq!(store.search_by_prefix("Per").unwrap().len(), 1);
}

#[test]
fn distinct_lists_deduplicate() {
    let store = seeded();
    store
        .insert(&draft("Dune Messiah", "Frank Herbert", "Fiction"))
        .unwrap();
    let authors = store.distinct_authors().unwrap();
    assert_eq!(authors.len(), 3);
    assert!(authors.contains(&"Frank Herbert".to_string()));
    let genres = store.distinct_genres().unwrap();
    assert_eq!(genres, ["Fiction", "Horror"]);
}

#[test]
fn update_replaces_all_fields_but_id() {
    let store = seeded();
    let replacement = draft("Dune Messiah", "Frank Herbert", "Fiction");
    store.update(1, &replacement).unwrap();
    let book = store.get(1).unwrap().expect("book exists");
    assert_eq!(book.id, 1);
    assert_eq!(book.title, "Dune Messiah");
}

#[test]
fn update_and_delete_of_missing_id_fail() {
    let store = seeded();
    assert!(store.update(99, &draft("X", "Y", "Z")).is_err());
    assert!(store.delete(99).is_err());
}

#[test]
fn delete_removes_the_record() {
    let store = seeded();
    store.delete(2).unwrap();
    assert!(store.get(2).unwrap().is_none());
    assert_eq!(store.count().unwrap(), 2);
}
