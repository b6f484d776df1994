//! Property tests for convergence, idempotence and version monotonicity.

use diffsync_server::ServerConfig;
use diffsync_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Client messages may be lost; every delivered message carries all
    /// unacknowledged edits, so one final send catches the server up.
    #[test]
    fn converges_despite_lost_client_messages(
        script in edit_script_strategy(12),
        delivery in delivery_strategy(12),
    ) {
        let server = text_server();
        let document_id = unique_id("doc");
        let (writer, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());
        let (reader, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());

        for (content, delivered) in script.iter().zip(delivery.iter().cycle()) {
            let message = writer.edit(content.clone());
            if *delivered {
                writer.send(message).unwrap();
            }
            reader.deliver();
        }
        let last = script.last().cloned().unwrap_or_default();
        writer.change(last.clone());
        reader.deliver();

        prop_assert_eq!(server_content(&server, &document_id), last.clone());
        prop_assert_eq!(reader.content(), last.clone());
        writer.pull();
        prop_assert_eq!(writer.content(), last);
        prop_assert!(writer.pending().is_empty());
    }

    /// Two writers take turns; each turn the writer either applies or drops
    /// everything the server pushed since its last turn, then edits.
    #[test]
    fn writers_converge_despite_dropped_pushes(
        changes in prop::collection::vec((any::<bool>(), text_change_strategy(), any::<bool>()), 1..16),
    ) {
        let server = text_server();
        let document_id = unique_id("doc");
        let (alice, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, "start".to_string());
        let (bob, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, "start".to_string());

        let mut versions = [(0, 0), (0, 0)];
        for (turn, change, deliver) in changes {
            let index = usize::from(turn);
            let writer = if turn { &bob } else { &alice };
            if deliver {
                writer.deliver();
            } else {
                writer.drop_inbox();
            }

            let content = change.apply(&writer.content());
            writer.change(content);
            prop_assert!(writer.inbox.is_empty());

            let shadow = writer.shadow();
            let (server_version, client_version) = versions[index];
            prop_assert!(shadow.server_version >= server_version);
            prop_assert!(shadow.client_version > client_version);
            prop_assert_eq!(writer.server_shadow().client_version, shadow.client_version);
            versions[index] = (shadow.server_version, shadow.client_version);
        }

        alice.drop_inbox();
        bob.drop_inbox();
        alice.pull();
        bob.pull();

        let expected = server_content(&server, &document_id);
        prop_assert_eq!(alice.content(), expected.clone());
        prop_assert_eq!(bob.content(), expected);
        prop_assert_eq!(server.stats().held, 0);
    }

    /// Redelivering a message the server already applied leaves its shadow,
    /// backup and document untouched.
    #[test]
    fn redelivery_is_idempotent(script in edit_script_strategy(8)) {
        let server = text_server();
        let document_id = unique_id("doc");
        let (session, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());

        for content in script {
            let message = session.edit(content.clone());
            session.send(message.clone()).unwrap();

            let shadow = session.server_shadow();
            let backup = server.backup(&document_id, &session.client_id).unwrap();
            let remaining = session.send(message).unwrap();

            prop_assert!(remaining.is_empty());
            prop_assert_eq!(session.server_shadow(), shadow);
            prop_assert_eq!(server.backup(&document_id, &session.client_id).unwrap(), backup);
            prop_assert_eq!(server_content(&server, &document_id), content);
        }
    }

    /// Replaying old messages after the server has diffed other clients'
    /// changes into this client's shadow leaves everything as it was.
    #[test]
    fn late_redelivery_is_idempotent(script in edit_script_strategy(8)) {
        let server = text_server();
        let document_id = unique_id("doc");
        let (writer, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());
        let (other, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());

        let mut sent = Vec::new();
        for content in script {
            let message = writer.edit(content.clone());
            writer.send(message.clone()).unwrap();
            sent.push(message);
            other.deliver();
            other.change(format!("{content}!"));
        }

        let shadow = writer.server_shadow();
        let backup = server.backup(&document_id, &writer.client_id).unwrap();
        let pending = server.pending_edits(&document_id, &writer.client_id).unwrap();
        let content = server_content(&server, &document_id);

        for message in sent {
            let remaining = writer.send(message).unwrap();
            prop_assert!(remaining.is_empty());
        }

        prop_assert_eq!(writer.server_shadow(), shadow);
        prop_assert_eq!(server.backup(&document_id, &writer.client_id).unwrap(), backup);
        prop_assert_eq!(server.pending_edits(&document_id, &writer.client_id).unwrap(), pending);
        prop_assert_eq!(server_content(&server, &document_id), content);
    }

    /// A client redelivering the server's pushes in order ends where a
    /// single delivery would.
    #[test]
    fn client_redelivery_is_idempotent(script in edit_script_strategy(8)) {
        let server = text_server();
        let document_id = unique_id("doc");
        let (writer, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());
        let (reader, _) = ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());

        for content in script {
            writer.change(content);
            for message in reader.deliver() {
                let shadow = reader.shadow();
                reader.engine.patch(&message).unwrap();
                prop_assert_eq!(reader.shadow(), shadow);
            }
            prop_assert_eq!(reader.content(), server_content(&server, &document_id));
        }
    }

    /// JSON objects without nulls round-trip exactly through merge patches.
    #[test]
    fn json_objects_converge(values in prop::collection::vec(json_object_strategy(), 1..8)) {
        let server = memory_server(JsonMergeSynchronizer, ServerConfig::default());
        let document_id = unique_id("doc");
        let start = serde_json::json!({});
        let (writer, _) = ClientSession::attach(&server, JsonMergeSynchronizer, &document_id, start.clone());
        let (reader, _) = ClientSession::attach(&server, JsonMergeSynchronizer, &document_id, start);

        for value in values {
            writer.change(value.clone());
            reader.deliver();
            prop_assert_eq!(reader.content(), value.clone());
            prop_assert_eq!(server_content(&server, &document_id), value);
        }
    }
}
