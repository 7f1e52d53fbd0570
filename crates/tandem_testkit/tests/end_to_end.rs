//! End-to-end tests: sessions over the loopback sequencer.

use serde_json::json;
use tandem_client::{ClientError, CloseReason};
use tandem_protocol::{Change, EditorEvent};
use tandem_testkit::prelude::*;
use tokio::sync::mpsc;

#[tokio::test]
async fn two_editors_converge() {
    let sequencer = LoopbackSequencer::with_document("hello");

    let (mut ann, document) = sequencer
        .session(ClientConfig::new().with_client_id("ann"))
        .init()
        .await
        .unwrap();
    let mut ann_doc = ann.replica(document);

    let (mut bob, document) = sequencer
        .session(ClientConfig::new().with_client_id("bob"))
        .init()
        .await
        .unwrap();
    let mut bob_doc = bob.replica(document);

    ann_doc.insert(5, " world").unwrap();
    bob_doc.delete(0, 1).unwrap();
    bob_doc.insert(0, "J").unwrap();

    let round = ann.sync(&mut ann_doc).await.unwrap();
    assert!(round.applied.is_empty());
    assert_eq!(round.pushed, 1);
    assert_eq!(sequencer.document(), "hello world");

    let round = bob.sync(&mut bob_doc).await.unwrap();
    assert_eq!(round.applied, vec![Change::insert(5, " world", "ann")]);
    assert_eq!(round.pushed, 2);
    assert_eq!(bob_doc.text(), "Jello world");

    let round = ann.sync(&mut ann_doc).await.unwrap();
    assert_eq!(round.applied.len(), 2);
    assert_eq!(ann_doc.text(), "Jello world");

    // Bob's next pull only returns his own echoes.
    let round = bob.sync(&mut bob_doc).await.unwrap();
    assert!(round.applied.is_empty());

    assert_eq!(sequencer.document(), "Jello world");
    assert_eq!(ann.last_pulled(), sequencer.current_id());
    assert_eq!(bob.last_pulled(), sequencer.current_id());
}

#[tokio::test]
async fn same_position_inserts_order_by_text() {
    let sequencer = LoopbackSequencer::with_document("abc");

    let (mut x, document) = sequencer
        .session(ClientConfig::new().with_client_id("X"))
        .init()
        .await
        .unwrap();
    let mut x_doc = x.replica(document);
    let (mut y, document) = sequencer
        .session(ClientConfig::new().with_client_id("Y"))
        .init()
        .await
        .unwrap();
    let mut y_doc = y.replica(document);

    x_doc.insert(0, "Z").unwrap();
    y_doc.insert(0, "Q").unwrap();

    x.sync(&mut x_doc).await.unwrap();
    y.sync(&mut y_doc).await.unwrap();
    x.sync(&mut x_doc).await.unwrap();

    assert_eq!(x_doc.text(), "QZabc");
    assert_eq!(y_doc.text(), "QZabc");
    assert_eq!(sequencer.document(), "QZabc");
}

#[tokio::test]
async fn many_rounds_converge() {
    let sequencer = LoopbackSequencer::with_document("");
    let mut editors = Vec::new();
    for name in ["ann", "bob", "cy"] {
        let (session, document) = sequencer
            .session(ClientConfig::new().with_client_id(name))
            .init()
            .await
            .unwrap();
        let replica = session.replica(document);
        editors.push((session, replica));
    }

    for round in 0..4 {
        for (index, (_, replica)) in editors.iter_mut().enumerate() {
            let len = replica.text().chars().count();
            replica.insert(len / 2, format!("{index}")).unwrap();
            if round % 2 == 1 && len > 2 {
                replica.delete(0, 1).unwrap();
            }
        }
        for (session, replica) in editors.iter_mut() {
            session.sync(replica).await.unwrap();
        }
    }
    // One more pass so everybody has seen the last pushes.
    for (session, replica) in editors.iter_mut() {
        session.sync(replica).await.unwrap();
    }

    let expected = sequencer.document();
    for (_, replica) in &editors {
        assert_eq!(replica.text(), expected);
        assert!(!replica.has_outgoing());
    }
}

#[tokio::test]
async fn editor_presence_reaches_sessions() {
    let sequencer = LoopbackSequencer::new().with_title("Notes");
    let (session, _) = sequencer
        .session(ClientConfig::new())
        .init()
        .await
        .unwrap();
    assert_eq!(session.title(), Some("Notes"));

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .on_editors(move |event| {
            let _ = tx.send(event);
        })
        .unwrap();

    let event = EditorEvent {
        editors: json!({"ann": {"cursor": 3}}),
    };
    sequencer.broadcast_event(&event.to_body());

    assert_eq!(rx.recv().await.unwrap(), event);
}

#[tokio::test]
async fn calls_after_close_fail() {
    let sequencer = LoopbackSequencer::with_document("abc");
    let (mut session, _) = sequencer
        .session(ClientConfig::new())
        .init()
        .await
        .unwrap();

    session.close();
    let err = session.pull().await.unwrap_err();
    assert!(matches!(err, ClientError::Closed(CloseReason::ClosedByClient)));
    assert!(err.is_disconnected());
}
