mod common;

use std::sync::Arc;

use campus_core::config::zone_from_minutes;
use campus_core::{
    BackendError, ConversationView, DayLabel, DeleteError, EditError, Locale, ReadOutcome,
    ReadSync, SendError,
};
use campus_events::EventDispatcher;
use campus_types::events::Topic;
use campus_types::models::ConversationId;

use common::{Calls, FakeCampus, at, message};

fn view(fake: &Arc<FakeCampus>, dispatcher: &EventDispatcher) -> (Arc<ReadSync>, ConversationView) {
    let read_sync = Arc::new(ReadSync::new(fake.clone()));
    let view = ConversationView::new(
        fake.viewer.clone(),
        fake.clone(),
        read_sync.clone(),
        dispatcher.clone(),
        zone_from_minutes(-240).unwrap(),
        Locale::English,
    );
    (read_sync, view)
}

#[tokio::test]
async fn opening_marks_read_once_and_loads_sorted_history() {
    let fake = FakeCampus::new("luis");
    fake.with_message(message("late", "c1", "ana", at(2025, 3, 5, 9, 0)));
    fake.with_message(message("early", "c1", "ana", at(2025, 3, 5, 8, 0)));
    fake.with_message(message("other", "c2", "ana", at(2025, 3, 5, 8, 30)));
    let (read_sync, mut view) = view(&fake, &EventDispatcher::default());
    let cid = ConversationId::from("c1");
    read_sync.set_unread(&cid, 2);

    assert_eq!(view.open(&cid).await.unwrap(), ReadOutcome::Marked);
    assert_eq!(read_sync.mark_opened_once(&cid).await, ReadOutcome::AlreadyMarked);

    assert_eq!(Calls::get(&fake.calls.mark_conversation_read), 1);
    assert_eq!(read_sync.unread(&cid), 0);
    let ids: Vec<_> = view.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["early", "late"]);
}

#[tokio::test]
async fn navigating_away_and_back_marks_again() {
    let fake = FakeCampus::new("luis");
    let (_read_sync, mut view) = view(&fake, &EventDispatcher::default());

    view.open(&"c1".into()).await.unwrap();
    view.open(&"c2".into()).await.unwrap();
    view.close();
    view.open(&"c1".into()).await.unwrap();

    assert_eq!(Calls::get(&fake.calls.mark_conversation_read), 3);
    assert_eq!(view.conversation_id(), Some(&ConversationId::from("c1")));
}

#[tokio::test]
async fn mark_read_failure_does_not_block_loading() {
    let fake = FakeCampus::failing_read_marks("luis");
    fake.with_message(message("m1", "c1", "ana", at(2025, 3, 5, 9, 0)));
    let (_read_sync, mut view) = view(&fake, &EventDispatcher::default());

    assert_eq!(view.open(&"c1".into()).await.unwrap(), ReadOutcome::Failed);
    assert_eq!(view.messages().len(), 1);
}

#[tokio::test]
async fn sending_trims_appends_and_signals() {
    let fake = FakeCampus::new("luis");
    let dispatcher = EventDispatcher::default();
    let mut sub = dispatcher.subscribe_to([Topic::ConversationUpdated]);
    let (_read_sync, mut view) = view(&fake, &dispatcher);

    assert_eq!(view.send("hola").await, Err(SendError::NotOpen));
    view.open(&"c1".into()).await.unwrap();
    assert_eq!(view.send("   ").await, Err(SendError::EmptyBody));
    assert_eq!(Calls::get(&fake.calls.send), 0);

    let sent = view.send("  hola  ").await.unwrap();

    assert_eq!(sent.body, "hola");
    assert_eq!(view.messages(), [sent]);
    assert_eq!(sub.try_recv(), Some(Topic::ConversationUpdated));
}

#[tokio::test]
async fn only_the_author_edits() {
    let fake = FakeCampus::new("luis");
    fake.with_message(message("theirs", "c1", "ana", at(2025, 3, 5, 9, 0)));
    fake.with_message(message("mine", "c1", "luis", at(2025, 3, 5, 9, 5)));
    let (_read_sync, mut view) = view(&fake, &EventDispatcher::default());
    view.open(&"c1".into()).await.unwrap();

    assert_eq!(
        view.edit(&"theirs".into(), "changed").await,
        Err(EditError::NotAuthor("theirs".into()))
    );
    assert_eq!(view.edit(&"mine".into(), " ").await, Err(EditError::EmptyBody));
    assert_eq!(Calls::get(&fake.calls.edit), 0);

    view.edit(&"mine".into(), "fixed").await.unwrap();
    let mine = &view.messages()[1];
    assert_eq!((mine.body.as_str(), mine.edited), ("fixed", true));

    assert_eq!(
        view.edit(&"ghost".into(), "x").await,
        Err(EditError::Missing("ghost".into()))
    );
}

#[tokio::test]
async fn delete_tolerates_already_deleted_messages() {
    let fake = FakeCampus::new("luis");
    fake.with_message(message("m1", "c1", "luis", at(2025, 3, 5, 9, 0)));
    fake.with_message(message("m2", "c1", "ana", at(2025, 3, 5, 9, 1)));
    let (_read_sync, mut view) = view(&fake, &EventDispatcher::default());
    assert_eq!(view.delete(&"m1".into()).await, Err(DeleteError::NotOpen));
    view.open(&"c1".into()).await.unwrap();

    fake.fail_next_delete(BackendError::NotFound("m1".into()));
    view.delete(&"m1".into()).await.unwrap();
    assert_eq!(view.messages().len(), 1);

    // Gone locally: no call at all.
    view.delete(&"m1".into()).await.unwrap();
    assert_eq!(Calls::get(&fake.calls.delete), 1);

    assert_eq!(
        view.delete(&"m2".into()).await,
        Err(DeleteError::NotAuthor("m2".into()))
    );
}

#[tokio::test]
async fn delete_surfaces_network_errors() {
    let fake = FakeCampus::new("luis");
    fake.with_message(message("m1", "c1", "luis", at(2025, 3, 5, 9, 0)));
    let (_read_sync, mut view) = view(&fake, &EventDispatcher::default());
    view.open(&"c1".into()).await.unwrap();

    fake.fail_next_delete(BackendError::Network("timeout".into()));
    let err = view.delete(&"m1".into()).await.unwrap_err();

    assert!(matches!(err, DeleteError::Backend(BackendError::Network(_))));
    assert_eq!(view.messages().len(), 1);
}

#[tokio::test]
async fn live_stream_entry_points_and_day_groups() {
    let fake = FakeCampus::new("luis");
    let (_read_sync, mut view) = view(&fake, &EventDispatcher::default());
    view.open(&"c1".into()).await.unwrap();

    assert!(view.append_local_message(message("m9", "c1", "ana", at(2025, 3, 5, 9, 0))));
    assert!(view.append_local_message(message("m8", "c1", "ana", at(2025, 3, 5, 8, 0))));
    assert!(view.append_local_message(message("m23", "c1", "ana", at(2025, 3, 4, 23, 0))));
    assert!(!view.append_local_message(message("m9", "c1", "ana", at(2025, 3, 5, 9, 0))));

    let groups = view.grouped(at(2025, 3, 5, 12, 0));
    let summary: Vec<(DayLabel, Vec<&str>)> = groups
        .iter()
        .map(|g| (g.label, g.messages.iter().map(|m| m.id.as_str()).collect()))
        .collect();
    assert_eq!(
        summary,
        [
            (DayLabel::Yesterday, vec!["m23"]),
            (DayLabel::Today, vec!["m8", "m9"]),
        ]
    );
    assert_eq!(groups[0].title(view.locale()), "Yesterday");

    view.edit_local_message(&"m8".into(), "edited").unwrap();
    assert!(view.remove_local_message(&"m8".into()));
    assert!(!view.remove_local_message(&"m8".into()));
    assert_eq!(
        view.edit_local_message(&"m8".into(), "again"),
        Err(EditError::Missing("m8".into()))
    );
    assert_eq!(view.messages().len(), 2);

    view.close();
    assert!(view.messages().is_empty());
    assert!(!view.append_local_message(message("m1", "c1", "ana", at(2025, 3, 5, 9, 0))));
}
