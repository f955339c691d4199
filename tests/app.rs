use taskmaster::app::App;
use taskmaster::config::Config;
use taskmaster::filter::{SortKey, SortOrder, TaskFilters};
use taskmaster::manager::TaskUpdate;
use taskmaster::storage::{ExportBundle, FileStore, MemoryStore, Persistence};
use taskmaster::task::{Priority, Status};
use taskmaster::Error;

fn memory_app() -> App<MemoryStore> {
    App::open(Persistence::new(MemoryStore::new()), Config::default())
}

#[test]
fn removing_a_user_cascades_to_their_tasks_only() {
    let mut app = memory_app();
    app.add_user("Ala").expect("add Ala");
    app.add_user("Ola").expect("add Ola");
    for content in ["Wash car", "Pay rent", "Call bank"] {
        app.add_task("Ala", content, None, None).expect("add task");
    }
    app.add_task("Ola", "Learn Rust", None, None).expect("add task");
    app.set_current_user("Ala").expect("use");

    let saved = app.remove_user("Ala").expect("remove");
    assert_eq!(saved.value, 3);
    assert!(saved.durable);
    assert_eq!(app.tasks().len(), 1);
    assert_eq!(app.tasks().get_user_tasks("Ola").len(), 1);
    assert!(app.current_user().is_none());
    assert!(matches!(app.remove_user("Ala"), Err(Error::UserNotFound(_))));
}

#[test]
fn state_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let id = {
        let mut app = App::open(Persistence::new(FileStore::new(dir.path())), Config::default());
        app.add_user("Kasia")?;
        app.set_current_user("Kasia")?;
        let task = app.add_task("Kasia", "Book dentist", Some(Priority::High), None)?.value;
        app.toggle_task(task.id())?;
        task.id().to_string()
    };

    let app = App::open(Persistence::new(FileStore::new(dir.path())), Config::default());
    assert_eq!(app.current_user().map(|user| user.name()), Some("Kasia"));
    let task = app.tasks().get_task_by_id(&id).expect("task");
    assert_eq!(task.status(), Status::Done);
    assert_eq!(task.priority(), Priority::High);
    let user = app.user("Kasia").expect("user");
    assert_eq!(user.task_count(), 1);
    assert_eq!(user.completed_task_count(), 1);
    Ok(())
}

#[test]
fn view_filters_then_sorts_owner_tasks() {
    let mut app = memory_app();
    app.add_user("Ala").expect("add");
    app.add_user("Ola").expect("add");
    app.add_task("Ala", "Low one", Some(Priority::Low), None).expect("task");
    app.add_task("Ala", "High one", Some(Priority::High), None).expect("task");
    app.add_task("Ala", "Medium one", Some(Priority::Medium), None).expect("task");
    app.add_task("Ola", "High other", Some(Priority::High), None).expect("task");

    let view = app.view("Ala", &TaskFilters::default(), SortKey::Priority, SortOrder::Desc);
    let contents: Vec<_> = view.iter().map(|task| task.content().to_string()).collect();
    assert_eq!(contents, vec!["High one", "Medium one", "Low one"]);

    let filters = TaskFilters {
        search_term: Some("one".to_string()),
        priority: "high".parse().expect("priority"),
        ..TaskFilters::default()
    };
    assert_eq!(app.view("Ala", &filters, SortKey::Date, SortOrder::Asc).len(), 1);
}

#[test]
fn edit_errors_leave_task_untouched() {
    let mut app = memory_app();
    app.add_user("Ala").expect("add");
    let task = app.add_task("Ala", "Plan week", None, None).expect("task").value;

    let err = app
        .edit_task(task.id(), &TaskUpdate::new().priority("asap"))
        .unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(
        app.edit_task("task_missing", &TaskUpdate::new().content("Anything")),
        Err(Error::TaskNotFound(_))
    ));
    assert_eq!(app.tasks().get_task_by_id(task.id()), Some(&task));
}

#[test]
fn tasks_need_a_known_owner() {
    let mut app = memory_app();
    assert!(matches!(
        app.add_task("Ghost", "Haunt house", None, None),
        Err(Error::UserNotFound(_))
    ));
    assert!(app.tasks().is_empty());
}

#[test]
fn stats_scope_by_owner() {
    let mut app = memory_app();
    app.add_user("Ala").expect("add");
    app.add_user("Ola").expect("add");
    let task = app.add_task("Ala", "Read book", None, None).expect("task").value;
    app.toggle_task(task.id()).expect("toggle");
    app.add_task("Ola", "Go running", None, None).expect("task");

    assert_eq!(app.stats(Some("Ala")).completion_rate, 100);
    assert_eq!(app.stats(None).completion_rate, 50);
    assert_eq!(app.stats(Some("Nobody")).total, 0);
}

#[test]
fn import_replaces_state_and_settings_update() {
    let mut source = memory_app();
    source.add_user("Ala").expect("add");
    source.add_task("Ala", "Exported task", None, None).expect("task");
    let bundle = source.export();

    let mut target = memory_app();
    assert!(target.import(&bundle).expect("import").durable);
    assert_eq!(target.users().len(), 1);
    assert_eq!(target.tasks().len(), 1);
    assert_eq!(target.user("Ala").expect("user").task_count(), 1);

    let saved = target.update_settings("theme", "dark").expect("settings");
    assert_eq!(saved.value.theme, "dark");
    assert_eq!(target.settings().theme, "dark");
    assert!(target.storage_size() > 0);
}

#[test]
fn invalid_stored_task_does_not_discard_the_rest() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = MemoryStore::new();
    store.insert_raw("taskmaster_users", r#"["Ala"]"#);
    store.insert_raw(
        "taskmaster_tasks",
        &serde_json::json!([
            {
                "id": "t1",
                "content": "Keep this task",
                "user": "Ala",
                "status": "pending",
                "priority": "high",
                "category": "work",
                "createdAt": "2024-05-01T10:00:00.000Z"
            },
            {
                "id": "t2",
                "content": "Ownerless task",
                "user": "  ",
                "status": "pending",
                "priority": "low",
                "category": "other",
                "createdAt": "2024-05-01T11:00:00.000Z"
            }
        ])
        .to_string(),
    );

    let mut app = App::open(Persistence::new(store), Config::default());
    assert_eq!(app.tasks().len(), 1);
    assert!(app.tasks().get_task_by_id("t1").is_some());
    assert_eq!(app.user("Ala").expect("user").task_count(), 1);

    app.add_task("Ala", "New task", None, None)?;
    let stored: serde_json::Value = serde_json::from_str(
        app.persistence()
            .store()
            .raw("taskmaster_tasks")
            .expect("tasks key"),
    )?;
    let stored_ids: Vec<_> = stored
        .as_array()
        .expect("task list")
        .iter()
        .filter_map(|task| task["id"].as_str())
        .collect();
    assert_eq!(stored_ids.len(), 2);
    assert!(stored_ids.contains(&"t1"));
    Ok(())
}

#[test]
fn import_on_failing_store_keeps_imported_state_in_memory() {
    let mut source = memory_app();
    source.add_user("Ola").expect("add");
    source.add_task("Ola", "Imported task", None, None).expect("task");
    let bundle = source.export();

    let mut app = App::open(
        Persistence::new(MemoryStore::unavailable()),
        Config::default(),
    );
    app.add_user("Ala").expect("add");
    app.add_task("Ala", "Local task", None, None).expect("task");

    let saved = app.import(&bundle).expect("import");
    assert!(!saved.durable);
    assert_eq!(app.users().len(), 1);
    assert!(app.user("Ola").is_some());
    assert_eq!(app.tasks().len(), 1);
    assert_eq!(app.user("Ola").expect("user").task_count(), 1);
}

#[test]
fn partial_import_keeps_missing_sections() {
    let mut app = memory_app();
    app.add_user("Ala").expect("add");
    app.set_current_user("Ala").expect("use");
    app.add_task("Ala", "Existing task", None, None).expect("task");

    let bundle = ExportBundle {
        users: Some(serde_json::json!(["Ala", "Ola"])),
        ..ExportBundle::default()
    };
    assert!(app.import(&bundle).expect("import").durable);
    assert_eq!(app.users().len(), 2);
    assert_eq!(app.tasks().len(), 1);
    assert_eq!(app.current_user().map(|user| user.name()), Some("Ala"));
}
