//! Integration tests for joinbench against SQLite fixtures.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use tempfile::TempDir;

use joinbench::llm::ManualClock;
use joinbench::metrics::EdgeCounts;
use joinbench::scoring::build_scorer;
use joinbench::{
    CandidateEdge, ClientConfig, ColumnRef, ErrorKind, JoinPairPredictor, LlmPairPredictor,
    Method, MockProvider, OverlapQueryPredictor, PairPredictor, QueryJoinPredictor, QueryPredictor,
    RateLimitedClient, ScoringConfig, SpiderLayout,
};
use joinbench::source::{Catalog, MetadataSource, ValueLoader};

const CONCERT_SINGER: &str = "
    CREATE TABLE singer (Singer_ID INTEGER PRIMARY KEY, Name TEXT, Country TEXT);
    CREATE TABLE concert (concert_ID INTEGER PRIMARY KEY, concert_Name TEXT, Stadium_ID TEXT);
    CREATE TABLE singer_in_concert (
        concert_ID INTEGER,
        Singer_ID TEXT,
        PRIMARY KEY (concert_ID, Singer_ID),
        FOREIGN KEY (concert_ID) REFERENCES concert(concert_ID),
        FOREIGN KEY (Singer_ID) REFERENCES singer
    );
    INSERT INTO singer VALUES (1, 'Joe Sharp', 'Netherlands'), (2, 'Timbaland', 'United States'),
                              (3, 'Justin Brown', 'France'), (4, 'Rose White', 'France');
    INSERT INTO concert VALUES (1, 'Auditions', '1'), (2, 'Super bootcamp', '2'), (3, 'Home Visits', '2');
    INSERT INTO singer_in_concert VALUES (1, '2'), (1, '3'), (2, '4'), (3, '2');
";

const SCHOLAR: &str = "
    CREATE TABLE publication (pid INTEGER PRIMARY KEY, title TEXT);
    CREATE TABLE cite (citing INTEGER, cited INTEGER);
    INSERT INTO publication VALUES (10, 'A'), (11, 'B'), (12, 'C'), (13, 'D');
    INSERT INTO cite VALUES (10, 11), (99, 12);
";

/// Helper to build a Spider-style dataset root with the given databases.
fn spider_root(dbs: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (db_id, sql) in dbs {
        let db_dir = dir.path().join("database").join(db_id);
        std::fs::create_dir_all(&db_dir).expect("Failed to create db dir");
        let conn = Connection::open(db_dir.join(format!("{}.sqlite", db_id)))
            .expect("Failed to create database");
        conn.execute_batch(sql).expect("Failed to load fixture");
    }
    dir
}

fn layout(root: &Path) -> SpiderLayout {
    SpiderLayout::new(root)
}

fn mock_client(mock: Arc<MockProvider>, rpm: usize) -> (Arc<RateLimitedClient>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let config = ClientConfig::default().with_rpm(rpm);
    (
        Arc::new(RateLimitedClient::with_clock(mock, &config, clock.clone())),
        clock,
    )
}

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Value Loading
// =============================================================================

#[test]
fn test_missing_database_fails_fast() {
    let root = spider_root(&[]);
    let err = layout(root.path()).open("concert_singer").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::MissingSource);
}

#[test]
fn test_values_are_distinct_and_normalized() {
    let root = spider_root(&[("concert_singer", CONCERT_SINGER)]);
    let db = layout(root.path()).open("concert_singer").unwrap();

    let countries = db.load_values("singer", "Country", None).unwrap();
    assert_eq!(countries.len(), 3);
    assert!(countries.contains("france"));

    // TEXT '2' and INTEGER 2 normalize to the same value.
    let sic = db.load_values("singer_in_concert", "Singer_ID", None).unwrap();
    let singers = db.load_values("singer", "Singer_ID", None).unwrap();
    assert_eq!(sic.intersection_len(&singers), 3);

    let limited = db.load_values("singer", "Name", Some(2)).unwrap();
    assert_eq!(limited.len(), 2);
}

#[test]
fn test_metadata_and_implicit_fk_target() {
    let root = spider_root(&[("concert_singer", CONCERT_SINGER)]);
    let db = layout(root.path()).open("concert_singer").unwrap();

    assert_eq!(db.table_names().unwrap(), vec!["singer", "concert", "singer_in_concert"]);

    let meta = db.table_meta("singer_in_concert").unwrap();
    assert_eq!(meta.primary_keys().count(), 2);
    assert_eq!(meta.columns[1].data_type, "TEXT");
    assert_eq!(meta.foreign_keys.len(), 2);
    assert!(meta
        .foreign_keys
        .iter()
        .any(|fk| fk.from_column == "Singer_ID" && fk.to_table == "singer" && fk.to_column == "Singer_ID"));
}

// =============================================================================
// Pair Prediction
// =============================================================================

#[test]
fn test_pair_prediction_with_identifier_drift() {
    let root = spider_root(&[("concert_singer", CONCERT_SINGER)]);
    let db = layout(root.path()).open("concert_singer").unwrap();

    let jaccard = PairPredictor::new(build_scorer(Method::Jaccard, &ScoringConfig::default()));
    let result = jaccard
        .predict(
            &db,
            &ColumnRef::new("Singer", "singer id"),
            &ColumnRef::new("singer in concert", "SINGER_ID"),
        )
        .unwrap();
    assert!(result.label);
    assert_eq!(result.score, 0.75);
    assert_eq!(result.explanation, "J=0.750 (|∩|=3, |∪|=4)");

    let containment = PairPredictor::new(build_scorer(Method::Containment, &ScoringConfig::default()));
    let result = containment
        .predict(
            &db,
            &ColumnRef::new("singer", "Singer_ID"),
            &ColumnRef::new("singer_in_concert", "Singer_ID"),
        )
        .unwrap();
    assert_eq!(result.score, 1.0);
}

#[test]
fn test_sparse_pair_falls_back_to_names() {
    let root = spider_root(&[("scholar", SCHOLAR)]);
    let db = layout(root.path()).open("scholar").unwrap();
    let predictor = PairPredictor::new(build_scorer(Method::Jaccard, &ScoringConfig::default()));

    let result = predictor
        .predict(&db, &ColumnRef::new("cite", "citing"), &ColumnRef::new("publication", "pid"))
        .unwrap();
    assert!(result.label);
    assert_eq!(result.score, 0.95);
    assert!(result.explanation.contains("acronym_id=0.95"));
}

#[test]
fn test_shared_client_bounds_rate_across_threads() {
    let root = spider_root(&[("concert_singer", CONCERT_SINGER)]);
    let db = layout(root.path()).open("concert_singer").unwrap();

    let mock = Arc::new(
        MockProvider::new().with_fallback(|_| Ok(r#"{"label": 1, "score": 0.9, "reason": "ids"}"#.to_string())),
    );
    let (client, clock) = mock_client(mock.clone(), 2);
    let predictor = LlmPairPredictor::new(client);
    let (l, r) = (
        ColumnRef::new("singer", "Singer_ID"),
        ColumnRef::new("singer_in_concert", "Singer_ID"),
    );

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let result = predictor.predict(&db, &l, &r).unwrap();
                assert!(result.label);
            });
        }
    });

    assert_eq!(mock.call_count(), 8);
    // Two admissions per minute: the seventh cannot start before three minutes.
    assert!(clock.elapsed() >= Duration::from_secs(180));
}

// =============================================================================
// Query Prediction
// =============================================================================

#[test]
fn test_query_join_prediction_selects_fk_edges() {
    let root = spider_root(&[("concert_singer", CONCERT_SINGER)]);
    let db = layout(root.path()).open("concert_singer").unwrap();

    let mock = Arc::new(MockProvider::new().with_reply(
        "```json\n{\"chosen\": [1, 0], \"reason\": \"both links through singer_in_concert\"}\n```",
    ));
    let (client, _clock) = mock_client(mock.clone(), 15);
    let predictor = QueryJoinPredictor::new(client);

    let query_tables = tables(&["singer", "concert", "singer_in_concert"]);
    let candidates = predictor.candidates(&db, &query_tables).unwrap();
    assert!(candidates.len() <= joinbench::DEFAULT_MAX_CANDIDATES);

    let out = predictor
        .predict(&db, "Show singer names for each concert.", &query_tables)
        .unwrap();
    assert_eq!(
        out.pred_joins,
        vec![
            CandidateEdge::from_parts("concert", "concert_ID", "singer_in_concert", "concert_ID"),
            CandidateEdge::from_parts("singer", "Singer_ID", "singer_in_concert", "Singer_ID"),
        ]
    );
    assert_eq!(out.explain, "both links through singer_in_concert");
    assert!(mock.prompts()[0].contains("Database: concert_singer"));
}

#[test]
fn test_overlap_baseline_recovers_gold_edges() {
    let root = spider_root(&[("concert_singer", CONCERT_SINGER)]);
    let db = layout(root.path()).open("concert_singer").unwrap();

    let scorer = build_scorer(Method::Containment, &ScoringConfig::default().with_threshold(0.9));
    let out = OverlapQueryPredictor::new(scorer)
        .predict(&db, "q", &tables(&["singer", "singer_in_concert"]))
        .unwrap();

    let gold = vec![CandidateEdge::from_parts("singer", "Singer_ID", "singer_in_concert", "Singer_ID")];
    let mut counts = EdgeCounts::default();
    counts.record(&gold, &out.pred_joins);
    assert_eq!(counts.tp, 1);
    assert_eq!(counts.fn_, 0);
}
