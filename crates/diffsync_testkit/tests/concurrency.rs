//! Concurrent attach, registry churn and multi-threaded load.

use diffsync_protocol::{Synchronizer, SEED_CLIENT_VERSION};
use diffsync_server::Subscriber;
use diffsync_synchronizer::TextDiff;
use diffsync_testkit::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn concurrent_first_add_has_one_winner() {
    init_tracing();
    for round in 0..20 {
        let server = text_server();
        let document_id = format!("race-{round}");
        let contents = vec!["X".to_string(); 4];

        let replies = first_add_race(&server, &document_id, contents);

        let (created, seeded): (Vec<_>, Vec<_>) = replies
            .iter()
            .map(|reply| &reply.edits[0])
            .partition(|edit| edit.client_version == 0);
        assert_eq!(created.len(), 1, "round {round}");
        assert_eq!(seeded.len(), 3, "round {round}");
        assert_eq!(created[0].server_version, 1);
        assert!(TextSynchronizer.is_unchanged(&created[0].diff));
        for edit in seeded {
            assert_eq!(edit.client_version, SEED_CLIENT_VERSION);
            assert_eq!(edit.server_version, 1);
        }
        assert_eq!(server.subscribers(&document_id).len(), 4);
        assert_eq!(server_content(&server, &document_id), "X");
    }
}

#[test]
fn race_losers_are_seeded_with_the_winners_content() {
    let server = text_server();
    let contents: Vec<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();

    let replies = first_add_race(&server, "contested", contents.clone());

    let stored = server_content(&server, "contested");
    assert!(contents.contains(&stored));
    for (reply, content) in replies.iter().zip(&contents) {
        let edit = &reply.edits[0];
        if edit.is_seed() {
            let seeded = TextSynchronizer.patch_content(&edit.diff, content).unwrap();
            assert_eq!(seeded, stored);
        } else {
            assert_eq!(content, &stored);
        }
    }
    for client_id in ["racer-0", "racer-1", "racer-2"] {
        let shadow = server.shadow("contested", client_id).unwrap().unwrap();
        assert_eq!(shadow.content(), &stored);
    }
}

#[test]
fn concurrent_connect_and_disconnect() {
    let server = text_server();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let server = Arc::clone(&server);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let keeper: Arc<dyn Subscriber<TextDiff>> =
                    RecordingSubscriber::<TextDiff>::new(format!("keeper-{t}"));
                let leaver: Arc<dyn Subscriber<TextDiff>> =
                    RecordingSubscriber::<TextDiff>::new(format!("leaver-{t}"));
                barrier.wait();
                server.connect_subscriber(keeper, "shared");
                for _ in 0..50 {
                    server.connect_subscriber(Arc::clone(&leaver), "shared");
                    assert!(server.remove_subscriber(&leaver, "shared"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let mut remaining: Vec<String> = server
        .subscribers("shared")
        .iter()
        .map(|s| s.client_id().to_string())
        .collect();
    remaining.sort();
    let mut expected: Vec<String> = (0..threads).map(|t| format!("keeper-{t}")).collect();
    expected.sort();
    assert_eq!(remaining, expected);
}

#[test]
fn stress_runs_complete() {
    let config = StressConfig {
        edits: 100,
        threads: 4,
    };

    let independent = stress_independent_documents(&config);
    assert_eq!(independent.failed_ops, 0);
    assert_eq!(independent.successful_ops, 400);

    let churn = stress_subscriber_churn(&config);
    assert_eq!(churn.failed_ops, 0);
    assert_eq!(churn.total_ops, 400);
}
