use super::*;
use crate::buffer::PendingSave;
use crate::error::StoreError;
use crate::model::{Annotation, Document, EntityClass};
use crate::offset::{ViewPoint, ViewSelection};

const TEXT: &str = "Barack Obama met Angela Merkel in Berlin.";

fn project() -> Project {
    Project::new(
        "p".into(),
        "News",
        vec![
            EntityClass::new("PERSON", "#ff0000"),
            EntityClass::new("CITY", "#0000ff"),
        ],
    )
}

fn loaded(id: &str, annotations: Vec<Annotation>) -> Box<LoadedDocument> {
    let mut document = Document::new(id.into(), "p".into(), TEXT);
    document.annotations = annotations;
    Box::new(LoadedDocument {
        document,
        project: project(),
        documents: ["a", "b", "c"]
            .into_iter()
            .map(|id| DocumentSummary {
                id: id.into(),
                name: None,
            })
            .collect(),
    })
}

fn ready(id: &str) -> Session {
    let mut session = Session::default();
    session.handle(Event::Open(id.into()));
    session.handle(Event::Loaded(loaded(id, Vec::new())));
    session
}

fn select(session: &mut Session, start: usize, end: usize) -> Vec<Effect> {
    session.handle(Event::SelectRange(TextRange::new(start, end)))
}

fn labels(session: &Session) -> Vec<String> {
    session
        .entities()
        .unwrap()
        .iter()
        .map(|e| e.label.clone())
        .collect()
}

fn persisted(effects: &[Effect]) -> PendingSave {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Persist(save) => Some(save.clone()),
            _ => None,
        })
        .unwrap()
}

#[test]
fn test_load_seeds_clean_buffer() {
    let mut session = Session::default();
    assert_eq!(session.handle(Event::Open("a".into())), vec![Effect::Load("a".into())]);

    let annotations = vec![Annotation {
        start_index: 34,
        end_index: 40,
        entity: "CITY".to_string(),
        text: "Berlin".to_string(),
    }];
    session.handle(Event::Loaded(loaded("a", annotations)));

    assert_eq!(session.phase(), &Phase::Ready);
    assert_eq!(session.entities().unwrap().get(0).unwrap().color, "#0000ff");
    assert!(!session.is_dirty());
    assert!(session.buffer().snapshot(&"a".into()).is_some());
}

#[test]
fn test_stale_load_is_ignored() {
    let mut session = Session::default();
    session.handle(Event::Open("a".into()));
    session.handle(Event::Open("b".into()));

    session.handle(Event::Loaded(loaded("a", Vec::new())));
    assert_eq!(session.phase(), &Phase::Loading("b".into()));

    session.handle(Event::Loaded(loaded("b", Vec::new())));
    assert_eq!(session.document_id(), Some(&"b".into()));
}

#[test]
fn test_load_failure_redirects() {
    let mut session = Session::default();
    session.handle(Event::Open("a".into()));

    let effects = session.handle(Event::LoadFailed {
        document_id: "a".into(),
        error: StoreError::NotFound("document a".to_string()),
    });

    assert_eq!(session.phase(), &Phase::Failed);
    assert!(session.document_id().is_none());
    assert!(matches!(&effects[0], Effect::Notify(Notice::Failure(Failure::Load(_)))));
    assert_eq!(effects[1], Effect::Navigate(Route::Projects));
}

#[test]
fn test_load_failure_keeps_other_edits_guarded() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);
    session.handle(Event::Navigate(Direction::Next));

    session.handle(Event::LoadFailed {
        document_id: "b".into(),
        error: StoreError::Rejected("corrupt".to_string()),
    });

    assert!(session.document_id().is_none());
    assert!(session.buffer().is_dirty(&"a".into()));
    assert!(session.confirm_unload());

    let effects = session.handle(Event::RequestLeave(Route::Exit));
    assert_eq!(effects, vec![Effect::PromptLeave]);
    assert_eq!(session.mode(), Mode::ConfirmLeave);
}

#[test]
fn test_selection_requires_active_class() {
    let mut session = ready("a");

    assert!(select(&mut session, 0, 12).is_empty());
    assert!(session.entities().unwrap().is_empty());

    session.handle(Event::Key('1'));
    assert_eq!(select(&mut session, 0, 12), vec![Effect::ClearSelection]);
    assert_eq!(labels(&session), vec!["PERSON"]);
    assert!(session.is_dirty());
}

#[test]
fn test_view_selection_adds_entity() {
    let mut session = ready("a");
    session.handle(Event::ChooseClass(1));

    let selection = ViewSelection::new(ViewPoint::new(0, 34), ViewPoint::new(0, 40));
    let effects = session.handle(Event::SelectText(selection));

    assert_eq!(effects, vec![Effect::ClearSelection]);
    let entity = session.entities().unwrap().get(0).unwrap().clone();
    assert_eq!((entity.start, entity.end, entity.text.as_str()), (34, 40, "Berlin"));
    assert_eq!(entity.label, "CITY");
}

#[test]
fn test_out_of_range_digit_keeps_active_class() {
    let mut session = ready("a");
    session.handle(Event::Key('2'));

    session.handle(Event::Key('3'));
    session.handle(Event::Key('0'));
    session.handle(Event::Key('x'));

    assert_eq!(session.active_class().unwrap().name, "CITY");
}

#[test]
fn test_digit_without_prior_class() {
    let mut session = ready("a");
    session.handle(Event::Key('3'));
    assert!(session.active_class().is_none());
}

#[test]
fn test_dismiss_targets_sorted_index() {
    let mut session = ready("a");
    session.handle(Event::Key('2'));
    select(&mut session, 34, 40);
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);

    // Sorted order: PERSON (inserted second), CITY (inserted first).
    session.handle(Event::Dismiss(0));

    assert_eq!(labels(&session), vec!["CITY"]);
    let segments = session.segments();
    assert!(segments
        .iter()
        .all(|s| s.sorted_index().is_none() || s.text() == "Berlin"));
}

#[test]
fn test_popover_filters_and_reclassifies() {
    let mut session = ready("a");
    session.handle(Event::Key('2'));
    select(&mut session, 34, 40);
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);

    session.handle(Event::OpenPopover(1));
    assert_eq!(session.mode(), Mode::Popover);

    session.handle(Event::FilterClasses("pErS".to_string()));
    let names: Vec<_> = session.filtered_classes().iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["PERSON"]);

    session.handle(Event::PickClass(0));

    assert_eq!(session.mode(), Mode::Normal);
    assert!(session.popover().is_none());
    let berlin = session.entities().unwrap().get(0).unwrap().clone();
    assert_eq!(berlin.label, "PERSON");
    assert_eq!(berlin.color, "#ff0000");
    assert_eq!((berlin.start, berlin.end, berlin.text.as_str()), (34, 40, "Berlin"));

    let snapshot = session.buffer().snapshot(&"a".into()).unwrap();
    assert_eq!(snapshot.annotations()[0].entity, "PERSON");
}

#[test]
fn test_popover_blocks_editing() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);
    session.handle(Event::OpenPopover(0));

    assert!(select(&mut session, 17, 30).is_empty());
    session.handle(Event::ClosePopover);
    assert_eq!(select(&mut session, 17, 30), vec![Effect::ClearSelection]);
}

#[test]
fn test_toggle_commits_on_success() {
    let mut session = ready("a");

    let effects = session.handle(Event::ToggleComplete);
    assert_eq!(
        effects,
        vec![Effect::PersistStatus {
            document_id: "a".into(),
            status: DocumentStatus::Completed,
        }]
    );
    assert_eq!(session.displayed_status(), Some(DocumentStatus::Completed));
    assert_eq!(session.committed_status(), Some(DocumentStatus::InProgress));

    session.handle(Event::StatusSaved {
        document_id: "a".into(),
        status: DocumentStatus::Completed,
        result: Ok(()),
    });
    assert_eq!(session.committed_status(), Some(DocumentStatus::Completed));
    assert!(!session.is_dirty());
}

#[test]
fn test_toggle_rolls_back_on_failure() {
    let mut session = ready("a");
    session.handle(Event::ToggleComplete);

    let effects = session.handle(Event::StatusSaved {
        document_id: "a".into(),
        status: DocumentStatus::Completed,
        result: Err(StoreError::Rejected("offline".to_string())),
    });

    assert_eq!(session.displayed_status(), Some(DocumentStatus::InProgress));
    assert!(matches!(&effects[0], Effect::Notify(Notice::Failure(Failure::Status(_)))));
}

#[test]
fn test_save_twice_is_noop() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);

    let save = persisted(&session.handle(Event::Save));
    session.handle(Event::Saved {
        document_id: save.document_id,
        revision: save.revision,
        result: Ok(()),
    });

    assert!(!session.is_dirty());
    assert!(session.handle(Event::Save).is_empty());
}

#[test]
fn test_save_completing_after_new_edit_keeps_it() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);
    let save = persisted(&session.handle(Event::Save));

    select(&mut session, 17, 30);
    session.handle(Event::Saved {
        document_id: save.document_id,
        revision: save.revision,
        result: Ok(()),
    });

    assert!(session.is_dirty());
    assert_eq!(session.buffer().snapshot(&"a".into()).unwrap().entities().len(), 2);
}

#[test]
fn test_navigation_without_autosave_keeps_buffer() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);

    let effects = session.handle(Event::Navigate(Direction::Next));

    assert_eq!(
        effects,
        vec![Effect::Navigate(Route::Document("b".into())), Effect::Load("b".into())]
    );
    assert!(session.buffer().is_dirty(&"a".into()));
}

#[test]
fn test_navigation_stops_at_boundaries() {
    let mut session = ready("a");
    assert!(session.handle(Event::Navigate(Direction::Previous)).is_empty());
    assert!(!session.can_navigate(Direction::Previous));

    let mut last = ready("c");
    assert!(last.handle(Event::Navigate(Direction::Next)).is_empty());
}

#[test]
fn test_autosave_gates_navigation() {
    let mut session = Session::new(SessionConfig {
        autosave: true,
        ..SessionConfig::default()
    });
    session.handle(Event::Open("a".into()));
    session.handle(Event::Loaded(loaded("a", Vec::new())));
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);

    let save = persisted(&session.handle(Event::Navigate(Direction::Next)));
    assert_eq!(save.document_id, "a".into());
    assert!(session.handle(Event::Navigate(Direction::Next)).is_empty());

    let effects = session.handle(Event::Saved {
        document_id: "a".into(),
        revision: save.revision,
        result: Ok(()),
    });

    assert!(effects.contains(&Effect::Load("b".into())));
    assert!(!session.buffer().is_dirty(&"a".into()));
}

#[test]
fn test_returning_to_document_shows_buffered_edits() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);
    session.handle(Event::Navigate(Direction::Next));
    session.handle(Event::Loaded(loaded("b", Vec::new())));

    session.handle(Event::Navigate(Direction::Previous));
    session.handle(Event::Loaded(loaded("a", Vec::new())));

    assert_eq!(labels(&session), vec!["PERSON"]);
    assert!(session.is_dirty());
}

#[test]
fn test_leave_without_changes_proceeds() {
    let mut session = ready("a");
    let effects = session.handle(Event::RequestLeave(project_route(&session)));

    assert_eq!(effects, vec![Effect::Navigate(Route::Project("p".into()))]);
    assert_eq!(session.phase(), &Phase::Idle);
}

#[test]
fn test_leave_with_changes_prompts_and_cancel_stays() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);
    assert!(session.confirm_unload());

    let effects = session.handle(Event::RequestLeave(Route::Exit));
    assert_eq!(effects, vec![Effect::PromptLeave]);
    assert_eq!(session.mode(), Mode::ConfirmLeave);

    assert!(session.handle(Event::Decide(LeaveDecision::Cancel)).is_empty());
    assert_eq!(session.mode(), Mode::Normal);
    assert!(session.pending_route().is_none());
    assert!(session.is_dirty());
}

#[test]
fn test_discard_and_leave() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);
    session.handle(Event::RequestLeave(Route::Projects));

    let effects = session.handle(Event::Decide(LeaveDecision::DiscardAndLeave));

    assert_eq!(effects, vec![Effect::Navigate(Route::Projects)]);
    assert_eq!(session.dirty_count(), 0);
}

#[test]
fn test_save_and_leave_stays_on_failure() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);
    session.handle(Event::RequestLeave(Route::Exit));

    let effects = session.handle(Event::Decide(LeaveDecision::SaveAndLeave));
    let Effect::PersistMany(saves) = &effects[0] else {
        panic!("expected batched save, got {effects:?}");
    };

    let results = saves
        .iter()
        .map(|save| crate::store::SaveResult {
            document_id: save.document_id.clone(),
            revision: save.revision,
            result: Err(StoreError::Rejected("offline".to_string())),
        })
        .collect();
    let effects = session.handle(Event::SavedAll(results));

    assert_eq!(effects.len(), 1);
    assert!(matches!(&effects[0], Effect::Notify(Notice::Failure(Failure::SaveAll { saved: 0, .. }))));
    assert_eq!(session.phase(), &Phase::Ready);
    assert!(session.is_dirty());
}

#[test]
fn test_close_discards_session_state() {
    let mut session = ready("a");
    session.handle(Event::Key('1'));
    select(&mut session, 0, 12);

    assert_eq!(session.close(), 1);
    assert_eq!(session.phase(), &Phase::Idle);
    assert!(!session.confirm_unload());
}
