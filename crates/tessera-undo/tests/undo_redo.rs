//! Undo/redo tests for tessera-undo

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tessera_undo::{ActionType, HistoryConfig, UndoDocument, UndoEntry, UndoStackObserver};
use tessera_xml::writer::to_xml_string;
use tessera_xml::{Document, Node, NodeObserver, Quark};

const EDIT: ActionType = ActionType(1);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Empty `<a>` under the document root, wrapped in a fresh history
fn setup() -> (UndoDocument, Node) {
    setup_with(HistoryConfig::default())
}

fn setup_with(config: HistoryConfig) -> (UndoDocument, Node) {
    let document = Document::new();
    let a = document.create_element("a");
    document.root().append_child(&a);
    (UndoDocument::with_config(document, config), a)
}

fn xml(history: &UndoDocument) -> String {
    to_xml_string(&history.document().root())
}

/// Writes one line per stack notification
#[derive(Default)]
struct StackRecorder {
    lines: RefCell<Vec<String>>,
}

impl StackRecorder {
    fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl UndoStackObserver for StackRecorder {
    fn notify_undo_event(&self, entry: &UndoEntry) {
        self.lines.borrow_mut().push(format!("undo {}", entry.description()));
    }

    fn notify_redo_event(&self, entry: &UndoEntry) {
        self.lines.borrow_mut().push(format!("redo {}", entry.description()));
    }

    fn notify_undo_commit_event(&self, entry: &UndoEntry) {
        self.lines.borrow_mut().push(format!("commit {}", entry.description()));
    }

    fn notify_clear_undo_event(&self) {
        self.lines.borrow_mut().push("clear undo".to_string());
    }

    fn notify_clear_redo_event(&self) {
        self.lines.borrow_mut().push("clear redo".to_string());
    }

    fn notify_undo_expired(&self, entry: &UndoEntry) {
        self.lines.borrow_mut().push(format!("expired {}", entry.description()));
    }
}

// ============================================================================
// Basic undo/redo
// ============================================================================

#[test]
fn test_add_children_undo_redo() {
    init_tracing();
    let (mut history, a) = setup();
    let document = history.document().clone();

    let b = document.create_element("b");
    a.append_child(&b);
    b.set_attribute("id", Some("x"));
    history.done(EDIT, "edit1");

    a.add_child(&document.create_element("c"), Some(&b));
    history.done(EDIT, "edit2");
    assert_eq!(xml(&history), r#"<a><b id="x"/><c/></a>"#);

    assert!(history.undo());
    assert_eq!(xml(&history), r#"<a><b id="x"/></a>"#);

    assert!(history.undo());
    assert_eq!(xml(&history), "<a/>");
    assert!(!history.undo());

    assert!(history.redo());
    assert!(history.redo());
    assert_eq!(xml(&history), r#"<a><b id="x"/><c/></a>"#);
    assert!(!history.redo());
}

#[test]
fn test_three_actions_walk_back_and_forth() {
    let (mut history, a) = setup();
    let document = history.document().clone();
    let mut states = vec![xml(&history)];

    a.set_attribute("fill", Some("red"));
    history.done(EDIT, "A");
    states.push(xml(&history));

    let rect = document.create_element("rect");
    a.append_child(&rect);
    history.done(EDIT, "B");
    states.push(xml(&history));

    a.set_attribute("fill", Some("blue"));
    rect.set_content(Some("r"));
    history.done(EDIT, "C");
    states.push(xml(&history));

    for expected in states.iter().rev().skip(1) {
        assert!(history.undo());
        assert_eq!(&xml(&history), expected);
    }
    for expected in states.iter().skip(1) {
        assert!(history.redo());
        assert_eq!(&xml(&history), expected);
    }
}

#[test]
fn test_undo_notifies_tree_observers() {
    #[derive(Default)]
    struct Count(Cell<u32>);

    impl NodeObserver for Count {
        fn notify_attribute_changed(&self, _: &Node, _: Quark, _: Option<&str>, _: Option<&str>) {
            self.0.set(self.0.get() + 1);
        }
    }

    let (mut history, a) = setup();
    let count = Rc::new(Count::default());
    a.add_observer(count.clone());

    a.set_attribute("x", Some("1"));
    history.done(EDIT, "set");
    history.undo();
    history.redo();

    assert_eq!(count.0.get(), 3);
}

#[test]
fn test_document_reports_seeking_during_replay() {
    #[derive(Default)]
    struct SeekingLog(RefCell<Vec<bool>>);

    impl NodeObserver for SeekingLog {
        fn notify_attribute_changed(&self, node: &Node, _: Quark, _: Option<&str>, _: Option<&str>) {
            let seeking = node.document().is_some_and(|document| document.is_seeking());
            self.0.borrow_mut().push(seeking);
        }
    }

    let (mut history, a) = setup();
    let log = Rc::new(SeekingLog::default());
    a.add_observer(log.clone());

    let hook_states = Rc::new(RefCell::new(Vec::new()));
    let states = Rc::clone(&hook_states);
    history.set_update_hook(move |document| states.borrow_mut().push(document.is_seeking()));

    a.set_attribute("x", Some("1"));
    history.done(EDIT, "set");
    assert!(!history.document().is_seeking());

    history.undo();
    assert!(!history.document().is_seeking());
    assert!(!history.is_seeking());
    history.redo();
    assert!(!history.document().is_seeking());

    assert_eq!(*log.0.borrow(), [false, true, true]);
    assert_eq!(*hook_states.borrow(), [false, true, true]);
}

#[test]
fn test_empty_action_is_not_pushed() {
    let (mut history, a) = setup();
    history.done(EDIT, "nothing");
    assert!(!history.can_undo());

    a.set_attribute("x", Some("1"));
    a.set_attribute("x", None);
    history.done(EDIT, "net nothing");
    assert!(!history.can_undo());
    assert!(history.document().in_transaction());
}

#[test]
fn test_new_action_clears_redo() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.done(EDIT, "first");
    history.undo();
    assert!(history.can_redo());

    a.set_attribute("y", Some("1"));
    history.done(EDIT, "second");
    assert!(!history.can_redo());
    assert_eq!(history.history_size(), 1);
}

#[test]
fn test_entries_keep_descriptions() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.done(ActionType(7), "Move");
    a.set_attribute("x", Some("2"));
    history.done(EDIT, "Move again");
    history.undo();

    let undo: Vec<&str> = history.undo_entries().iter().map(|e| e.description()).collect();
    let redo: Vec<&str> = history.redo_entries().iter().map(|e| e.description()).collect();
    assert_eq!(undo, ["Move"]);
    assert_eq!(redo, ["Move again"]);
    assert_eq!(history.undo_entries()[0].action_type(), ActionType(7));
    assert_eq!(history.undo_entries()[0].log().len(), 1);
}

// ============================================================================
// Merge keys
// ============================================================================

#[test]
fn test_same_key_merges_steps() {
    let (mut history, a) = setup();
    let before = xml(&history);

    a.set_attribute("x", Some("1"));
    history.maybe_done(Some("drag"), EDIT, "Drag");
    a.set_attribute("x", Some("2"));
    history.maybe_done(Some("drag"), EDIT, "Drag");
    assert_eq!(history.undo_entries().len(), 1);
    assert_eq!(history.undo_entries()[0].log().len(), 1);

    a.set_attribute("y", Some("1"));
    history.maybe_done(Some("other"), EDIT, "Other");
    assert_eq!(history.undo_entries().len(), 2);

    history.undo();
    history.undo();
    assert_eq!(xml(&history), before);
}

#[test]
fn test_absent_key_never_merges() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.maybe_done(Some("k"), EDIT, "keyed");
    a.set_attribute("x", Some("2"));
    history.maybe_done(None, EDIT, "plain");
    a.set_attribute("x", Some("3"));
    history.maybe_done(None, EDIT, "plain");
    assert_eq!(history.undo_entries().len(), 3);
}

#[test]
fn test_blank_key_is_treated_as_absent() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.maybe_done(Some(""), EDIT, "blank");
    a.set_attribute("x", Some("2"));
    history.maybe_done(Some(""), EDIT, "blank");
    assert_eq!(history.undo_entries().len(), 2);
}

#[test]
fn test_reset_key_and_undo_break_merging() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.maybe_done(Some("k"), EDIT, "k");
    history.reset_key();
    a.set_attribute("x", Some("2"));
    history.maybe_done(Some("k"), EDIT, "k");
    assert_eq!(history.undo_entries().len(), 2);

    history.undo();
    history.redo();
    a.set_attribute("x", Some("3"));
    history.maybe_done(Some("k"), EDIT, "k");
    assert_eq!(history.undo_entries().len(), 3);
}

#[test]
fn test_merge_that_cancels_out_drops_step() {
    init_tracing();
    let (mut history, a) = setup();
    a.set_attribute("y", Some("1"));
    history.done(EDIT, "first");
    history.mark_saved();
    let saved = xml(&history);

    a.set_attribute("x", Some("1"));
    history.maybe_done(Some("drag"), EDIT, "Drag");
    assert_eq!(history.undo_entries().len(), 2);
    assert!(history.is_modified_since_save());

    a.set_attribute("x", None);
    history.maybe_done(Some("drag"), EDIT, "Drag");
    assert_eq!(history.undo_entries().len(), 1);
    assert_eq!(history.undo_entries()[0].description(), "first");
    assert!(!history.is_modified_since_save());
    assert_eq!(xml(&history), saved);

    // The key was forgotten along with the step
    a.set_attribute("x", Some("2"));
    history.maybe_done(Some("drag"), EDIT, "Drag");
    assert_eq!(history.undo_entries().len(), 2);

    assert!(history.undo());
    assert_eq!(xml(&history), saved);
    assert!(history.undo());
    assert_eq!(xml(&history), "<a/>");
    assert!(!history.undo());
}

#[test]
fn test_cancelled_merge_past_save_point_loses_it() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.maybe_done(Some("drag"), EDIT, "Drag");
    history.mark_saved();

    a.set_attribute("x", None);
    history.maybe_done(Some("drag"), EDIT, "Drag");
    assert!(!history.can_undo());
    assert!(history.is_modified_since_save());
}

// ============================================================================
// Stack observers
// ============================================================================

#[test]
fn test_stack_observer_sequence() {
    let (mut history, a) = setup();
    let recorder = Rc::new(StackRecorder::default());
    history.add_undo_observer(recorder.clone());

    history.clear_undo();
    history.clear_redo();

    a.set_attribute("x", Some("1"));
    history.done(EDIT, "one");
    a.set_attribute("x", Some("2"));
    history.done(EDIT, "two");
    history.undo();
    history.redo();
    history.undo();

    a.set_attribute("y", Some("1"));
    history.done(EDIT, "three");
    history.clear_undo();

    assert_eq!(
        recorder.lines(),
        [
            "commit one",
            "commit two",
            "undo two",
            "redo two",
            "undo two",
            "clear redo",
            "commit three",
            "clear undo",
        ]
    );
    assert_eq!(history.history_size(), 0);
}

#[test]
fn test_removed_stack_observer_is_silent() {
    let (mut history, a) = setup();
    let recorder = Rc::new(StackRecorder::default());
    let handle: Rc<dyn UndoStackObserver> = recorder.clone();
    history.add_undo_observer(Rc::clone(&handle));
    assert!(history.remove_undo_observer(&handle));

    a.set_attribute("x", Some("1"));
    history.done(EDIT, "one");
    assert!(recorder.lines().is_empty());
}

#[test]
fn test_bounded_history_expires_oldest() {
    let (mut history, a) = setup_with(HistoryConfig::default().with_max_depth(2));
    let recorder = Rc::new(StackRecorder::default());
    history.add_undo_observer(recorder.clone());

    for (i, name) in ["first", "second", "third"].into_iter().enumerate() {
        a.set_attribute("x", Some(&i.to_string()));
        history.done(EDIT, name);
    }

    assert_eq!(history.undo_entries().len(), 2);
    assert!(recorder.lines().contains(&"expired first".to_string()));

    assert!(history.undo());
    assert!(history.undo());
    assert!(!history.undo());
    assert_eq!(a.attribute("x").as_deref(), Some("0"));
}

// ============================================================================
// Incomplete transactions and document updates
// ============================================================================

#[test]
fn test_stray_changes_fold_into_latest_step() {
    init_tracing();
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.done(EDIT, "x");

    // Never closed with done
    a.set_attribute("y", Some("1"));

    assert!(history.undo());
    assert_eq!(xml(&history), "<a/>");

    assert!(history.redo());
    assert_eq!(a.attribute("x").as_deref(), Some("1"));
    assert_eq!(a.attribute("y").as_deref(), Some("1"));
}

#[test]
fn test_stray_changes_without_history_are_dropped() {
    let (mut history, a) = setup();
    a.set_attribute("y", Some("1"));

    assert!(!history.undo());
    assert_eq!(a.attribute("y").as_deref(), Some("1"));
    assert!(!history.can_undo());
    assert!(history.document().in_transaction());
}

#[test]
#[should_panic(expected = "incomplete undo transaction")]
fn test_strict_history_rejects_stray_changes() {
    let (mut history, a) = setup_with(HistoryConfig::default().strict());
    a.set_attribute("x", Some("1"));
    history.done(EDIT, "x");
    a.set_attribute("y", Some("1"));
    history.undo();
}

#[test]
fn test_update_hook_changes_join_steps() {
    init_tracing();
    let (mut history, a) = setup();
    let document = history.document().clone();

    let counted = a.clone();
    history.set_update_hook(move |_| {
        let count = counted.child_count().to_string();
        counted.set_attribute("count", Some(&count));
    });

    a.append_child(&document.create_element("b"));
    history.done(EDIT, "add");
    assert_eq!(xml(&history), r#"<a count="1"><b/></a>"#);

    // The hook reacts to the undo; its change stays in the step
    assert!(history.undo());
    assert_eq!(xml(&history), r#"<a count="0"/>"#);

    assert!(history.redo());
    assert_eq!(xml(&history), r#"<a count="1"><b/></a>"#);

    assert!(history.undo());
    assert_eq!(xml(&history), r#"<a count="0"/>"#);
    assert_eq!(history.redo_entries().len(), 1);
}

// ============================================================================
// Sensitivity and cancel
// ============================================================================

#[test]
fn test_insensitive_changes_are_not_undoable() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.done(EDIT, "x");

    {
        let guard = history.insensitive();
        assert!(!guard.undo_sensitive());
        a.set_attribute("z", Some("1"));
    }
    assert!(history.undo_sensitive());

    assert!(history.undo());
    assert_eq!(a.attribute("x"), None);
    assert_eq!(a.attribute("z").as_deref(), Some("1"));
}

#[test]
fn test_changes_before_insensitive_join_next_step() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.set_undo_sensitive(false);
    a.set_attribute("z", Some("1"));
    history.set_undo_sensitive(true);
    a.set_attribute("y", Some("1"));
    history.done(EDIT, "x and y");

    assert_eq!(history.undo_entries()[0].log().len(), 2);
    history.undo();
    assert_eq!(xml(&history), r#"<a z="1"/>"#);
}

#[test]
#[should_panic(expected = "insensitive")]
fn test_done_while_insensitive_panics() {
    let (mut history, _a) = setup();
    history.set_undo_sensitive(false);
    history.done(EDIT, "oops");
}

#[test]
fn test_cancel_reverts_open_action() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.done(EDIT, "x");

    a.set_attribute("x", Some("2"));
    a.append_child(&history.document().create_element("b"));
    history.cancel();

    assert_eq!(xml(&history), r#"<a x="1"/>"#);
    assert_eq!(history.undo_entries().len(), 1);
    assert!(history.document().in_transaction());
}

#[test]
fn test_cancel_reverts_parked_changes() {
    let (mut history, a) = setup();
    a.set_attribute("x", Some("1"));
    history.set_undo_sensitive(false);
    a.set_attribute("z", Some("1"));
    history.set_undo_sensitive(true);

    history.cancel();
    assert_eq!(a.attribute("x"), None);
    assert_eq!(a.attribute("z").as_deref(), Some("1"));
}
