//! Algebraic properties of the facet filter.

use bookstation::model::types::Book;
use bookstation::session::facet;
use proptest::prelude::*;

const GENRES: &[&str] = &["Fiction", "Horror", "Sci-Fi", "Essays"];
const AUTHORS: &[&str] = &["A", "B", "C"];

fn arb_book() -> impl Strategy<Value = Book> {
    (
        0i64..1000,
        proptest::sample::select(GENRES),
        proptest::sample::select(AUTHORS),
    )
        .prop_map(|(id, genre, author)| Book {
            id,
            title: format!("Title {id}"),
            author: author.to_string(),
            genre: genre.to_string(),
            publication_date: "2000-01-01".to_string(),
            isbn: "1234567890".to_string(),
            stock: 0,
        })
}

fn arb_facet(values: &'static [&'static str]) -> impl Strategy<Value = Vec<String>> {
    proptest::sample::subsequence(values.to_vec(), 0..=values.len())
        .prop_map(|vals| vals.into_iter().map(str::to_string).collect())
}

proptest! {
    #[test]
    fn empty_facets_are_identity(records in proptest::collection::vec(arb_book(), 0..20)) {
        prop_assert_eq!(facet::filter(&records, &[], &[]), records);
    }

    #[test]
    fn output_is_a_subsequence(
        records in proptest::collection::vec(arb_book(), 0..20),
        genres in arb_facet(GENRES),
        authors in arb_facet(AUTHORS),
    ) {
        let out = facet::filter(&records, &genres, &authors);
        // Every output record appears in the input, in the same relative
        // order.
        let mut cursor = 0;
        for kept in &out {
            let pos = records[cursor..]
                .iter()
                .position(|r| r == kept)
                .expect("output record comes from the input");
            cursor += pos + 1;
        }
    }

    #[test]
    fn filter_is_idempotent(
        records in proptest::collection::vec(arb_book(), 0..20),
        genres in arb_facet(GENRES),
        authors in arb_facet(AUTHORS),
    ) {
        let once = facet::filter(&records, &genres, &authors);
        let twice = facet::filter(&once, &genres, &authors);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn kept_records_satisfy_both_facets(
        records in proptest::collection::vec(arb_book(), 0..20),
        genres in arb_facet(GENRES),
        authors in arb_facet(AUTHORS),
    ) {
        for kept in facet::filter(&records, &genres, &authors) {
            prop_assert!(genres.is_empty() || genres.contains(&kept.genre));
            prop_assert!(authors.is_empty() || authors.contains(&kept.author));
        }
    }
}
