// Composition tests — verifying that the stages chain together correctly.
//
// These tests exercise the data flow between modules:
//   CSV export -> Comments -> Features -> Cluster model -> Labels -> Summary
//   Classifications + coherence sweep -> SQLite -> Dashboard export
// against an in-memory database, writing only the export file to the temp dir.

use rusqlite::Connection;

use sieve::classifier::summary::{label_distribution, review_candidates};
use sieve::classifier::{ClassifierConfig, ComponentSummary, Label};
use sieve::comments::loader::read_csv;
use sieve::comments::Comment;
use sieve::db::{queries, schema};
use sieve::output::export;
use sieve::pipeline::classify;
use sieve::topics::{select_optimal_k, CoherenceRecord, SelectorConfig};

fn csv_export() -> String {
    let mut csv = String::from("commentId,textOriginal,likeCount,parentCommentId\n");
    for i in 0..24 {
        csv.push_str(&format!(
            "q{i},\"Loved how the chef explains why the dough rests, step {} finally made sense to me after years of flat bread.\",{},\n",
            i % 6,
            25 + i % 11
        ));
        let spam = ["OMG", "LOL!!!!", "first 😍😍😍", "WOW", "NICE 🔥🔥", "SUBSCRIBE"];
        let parent = if i % 4 == 0 { "q0" } else { "" };
        csv.push_str(&format!("s{i},{},0,{parent}\n", spam[i % spam.len()]));
    }
    csv
}

fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    schema::create_tables(&conn).unwrap();
    conn
}

// ============================================================
// Chain: CSV -> Features -> Cluster model -> Summary
// ============================================================

#[tokio::test]
async fn csv_export_classifies_end_to_end() {
    let comments = read_csv(csv_export().as_bytes()).unwrap();
    assert_eq!(comments.len(), 48);
    assert!(comments.iter().any(|c| c.is_reply()));

    let run = classify::run(comments, ClassifierConfig::default(), 3, false)
        .await
        .unwrap();
    assert_eq!(run.classified.len(), 48);

    let results = run.results();
    let dist = label_distribution(&results);
    assert_eq!(dist.total, 48);
    assert_eq!(dist.count(Label::Spam), 24);
    assert_eq!(dist.count(Label::Quality), 24);
    assert_eq!(dist.uncertainty_rate, 0.0);

    for c in &run.classified {
        let expected = if c.comment.id.starts_with('s') {
            Label::Spam
        } else {
            Label::Quality
        };
        assert_eq!(c.result.label, expected, "comment {}", c.comment.id);
    }

    let review = review_candidates(&results, 3);
    assert_eq!(review.len(), 3);
}

#[tokio::test]
async fn rescoring_uses_training_normalization() {
    let comments = read_csv(csv_export().as_bytes()).unwrap();
    let run = classify::run(comments, ClassifierConfig::default(), 2, false)
        .await
        .unwrap();

    let fresh = vec![Comment::new("fresh", "LOL!!!!", 0)];
    let rescored = classify::rescore(fresh, &run.saved, 1, false).await.unwrap();
    assert_eq!(rescored[0].result.label, Label::Spam);
    // Same likes scale as the training corpus
    assert_eq!(
        run.saved.extractor,
        sieve::features::FeatureExtractor::for_corpus(&read_csv(csv_export().as_bytes()).unwrap())
    );
}

// ============================================================
// Chain: Store -> Dashboard export
// ============================================================

#[tokio::test]
async fn export_reflects_stored_state() {
    let conn = test_db();
    let comments = read_csv(csv_export().as_bytes()).unwrap();
    let run = classify::run(comments, ClassifierConfig::default(), 2, false)
        .await
        .unwrap();
    let model_id = queries::save_model(&conn, &run.saved).unwrap();
    queries::save_classifications(&conn, &run.classified, Some(model_id)).unwrap();

    let sweep: Vec<CoherenceRecord> = [(4, 0.415), (6, 0.471), (8, 0.478), (10, 0.483)]
        .iter()
        .map(|&(k, s)| CoherenceRecord::new(k, s).unwrap())
        .collect();
    queries::replace_coherence_sweep(&conn, &sweep).unwrap();

    let dashboard = export::build(&conn, 3, &SelectorConfig::default()).unwrap();
    assert_eq!(dashboard.distribution.total, 48);
    assert_eq!(dashboard.distribution.count(Label::Spam), 24);
    assert_eq!(dashboard.samples["spam"].len(), 3);
    assert!(dashboard.samples["uncertain"].is_empty());
    assert_eq!(dashboard.review_candidates.len(), 3);
    assert_eq!(dashboard.clusters.len(), 2);

    let selected = dashboard.selected_k.unwrap();
    assert_eq!(selected, select_optimal_k(&sweep, &SelectorConfig::default()).unwrap());
    assert_eq!(selected.k, 10);
    let optimal: Vec<u32> = dashboard
        .coherence
        .iter()
        .filter(|p| p.is_optimal)
        .map(|p| p.k)
        .collect();
    assert_eq!(optimal, vec![10]);

    let path = std::env::temp_dir().join(format!("sieve-export-{}.json", std::process::id()));
    export::write(&dashboard, &path).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["selected_k"]["k"], 10);
    assert_eq!(written["distribution"]["total"], 48);
    assert_eq!(written["coherence"][0]["coherence_score"], 0.415);
    std::fs::remove_file(&path).ok();
}

#[test]
fn export_keeps_the_selection_made_by_select_k() {
    let conn = test_db();
    let sweep: Vec<CoherenceRecord> = [(4, 0.415), (6, 0.471), (8, 0.478), (10, 0.483)]
        .iter()
        .map(|&(k, s)| CoherenceRecord::new(k, s).unwrap())
        .collect();
    // A wide tolerance ties 8 with 10, and ties go to the smaller K
    let wide = SelectorConfig {
        tie_tolerance: 0.01,
        ..SelectorConfig::default()
    };
    let selection = select_optimal_k(&sweep, &wide).unwrap();
    assert_eq!(selection.k, 8);
    queries::save_topic_selection(&conn, &sweep, &selection).unwrap();

    // Export runs with default settings, which alone would pick 10
    let dashboard = export::build(&conn, 3, &SelectorConfig::default()).unwrap();
    assert_eq!(dashboard.selected_k, Some(selection));
    let optimal: Vec<u32> = dashboard
        .coherence
        .iter()
        .filter(|p| p.is_optimal)
        .map(|p| p.k)
        .collect();
    assert_eq!(optimal, vec![8]);
    assert_eq!(
        queries::get_run_state(&conn, "selected_k").unwrap().as_deref(),
        Some("8")
    );
}

#[tokio::test]
async fn reclassifying_replaces_the_stored_results() {
    let conn = test_db();
    let comments = read_csv(csv_export().as_bytes()).unwrap();
    let first = classify::run(comments.clone(), ClassifierConfig::default(), 2, false)
        .await
        .unwrap();
    queries::replace_fitted_run(&conn, &first.saved, &first.classified).unwrap();

    // Second corpus: only the quality half under new ids
    let fresh: Vec<Comment> = comments
        .iter()
        .filter(|c| c.id.starts_with('q'))
        .map(|c| Comment::new(format!("new-{}", c.id), c.text.clone(), c.like_count))
        .chain([
            Comment::new("new-s1", "OMG", 0),
            Comment::new("new-s2", "LOL!!!!", 0),
            Comment::new("new-s3", "WOW", 0),
            Comment::new("new-s4", "NICE 🔥🔥", 0),
        ])
        .collect();
    let second = classify::run(fresh, ClassifierConfig::default(), 2, false)
        .await
        .unwrap();
    let model_id = queries::replace_fitted_run(&conn, &second.saved, &second.classified).unwrap();

    let dashboard = export::build(&conn, 50, &SelectorConfig::default()).unwrap();
    assert_eq!(dashboard.distribution.total, 28);
    let sizes = |cs: &[ComponentSummary]| cs.iter().map(|c| c.size).collect::<Vec<_>>();
    assert_eq!(sizes(&dashboard.clusters), sizes(&second.saved.model.components));
    assert_eq!(sizes(&dashboard.clusters).iter().sum::<usize>(), 28);
    let ids: Vec<&str> = dashboard
        .samples
        .values()
        .flatten()
        .map(|s| s.comment_id.as_str())
        .collect();
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| id.starts_with("new-")));
    assert_eq!(
        queries::latest_model(&conn).unwrap().unwrap().id,
        model_id
    );
}

#[test]
fn export_of_empty_store_is_well_formed() {
    let conn = test_db();
    let dashboard = export::build(&conn, 5, &SelectorConfig::default()).unwrap();
    assert_eq!(dashboard.distribution.total, 0);
    assert_eq!(dashboard.distribution.counts.len(), 3);
    assert!(dashboard.clusters.is_empty());
    assert!(dashboard.coherence.is_empty());
    assert!(dashboard.selected_k.is_none());
}
