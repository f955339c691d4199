mod support;

use predicates::str::contains;
use serde_json::Value;
use support::{run_json, taskmaster_cmd, TestEnv};

fn setup() -> TestEnv {
    let env = TestEnv::new();
    taskmaster_cmd(&env)
        .args(["user", "add", "Ala", "--use"])
        .assert()
        .success();
    env
}

fn add(env: &TestEnv, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
    let mut full = vec!["task", "add"];
    full.extend_from_slice(args);
    let value = run_json(env, &full)?;
    Ok(value["data"]["id"].as_str().unwrap_or_default().to_string())
}

fn contents(value: &Value) -> Vec<String> {
    value["data"]["tasks"]
        .as_array()
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|task| task["content"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn add_list_and_sort() -> Result<(), Box<dyn std::error::Error>> {
    let env = setup();
    add(&env, &["Low", "task", "--priority", "low", "--category", "work"])?;
    add(&env, &["High task", "-p", "high", "-c", "nauka"])?;
    add(&env, &["Medium task"])?;

    let by_priority = run_json(&env, &["task", "list", "--sort", "priority"])?;
    assert_eq!(by_priority["data"]["owner"], "Ala");
    assert_eq!(by_priority["data"]["total"], 3);
    assert_eq!(contents(&by_priority), vec!["High task", "Medium task", "Low task"]);

    let by_content = run_json(&env, &["task", "list", "--sort", "content", "--order", "asc"])?;
    assert_eq!(contents(&by_content), vec!["High task", "Low task", "Medium task"]);

    let study = run_json(&env, &["task", "list", "--category", "study"])?;
    assert_eq!(contents(&study), vec!["High task"]);
    assert_eq!(study["data"]["tasks"][0]["category"], "study");

    taskmaster_cmd(&env)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(contains("Tasks for Ala"))
        .stdout(contains("- Total: 3"))
        .stdout(contains("[ ] Low task (low, work)"));
    Ok(())
}

#[test]
fn toggle_edit_show_and_rm() -> Result<(), Box<dyn std::error::Error>> {
    let env = setup();
    let id = add(&env, &["Walk the dog"])?;

    let toggled = run_json(&env, &["task", "toggle", &id])?;
    assert_eq!(toggled["data"]["status"], "done");

    let edited = run_json(
        &env,
        &["task", "edit", &id, "--content", "Walk both dogs", "--priority", "high"],
    )?;
    assert_eq!(edited["data"]["content"], "Walk both dogs");
    assert_eq!(edited["data"]["priority"], "high");
    assert_eq!(edited["data"]["status"], "done");

    taskmaster_cmd(&env)
        .args(["task", "show", &id])
        .assert()
        .success()
        .stdout(contains("- content: Walk both dogs"))
        .stdout(contains("- status: done"));

    let done = run_json(&env, &["task", "list", "--status", "done"])?;
    assert_eq!(done["data"]["total"], 1);

    run_json(&env, &["task", "rm", &id])?;
    taskmaster_cmd(&env)
        .args(["task", "show", &id])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));
    Ok(())
}

#[test]
fn invalid_input_is_rejected_without_changes() -> Result<(), Box<dyn std::error::Error>> {
    let env = setup();
    let id = add(&env, &["Pay bills"])?;

    taskmaster_cmd(&env)
        .args(["task", "edit", &id, "--priority", "urgent"])
        .assert()
        .code(2)
        .stderr(contains("Validation failed"));

    taskmaster_cmd(&env)
        .args(["task", "add", "  "])
        .assert()
        .code(2);

    taskmaster_cmd(&env)
        .args(["task", "edit", &id])
        .assert()
        .code(2)
        .stderr(contains("nothing to change"));

    taskmaster_cmd(&env)
        .args(["task", "list", "--sort", "colour"])
        .assert()
        .code(2)
        .stderr(contains("unknown sort key"));

    let listed = run_json(&env, &["task", "list"])?;
    assert_eq!(listed["data"]["total"], 1);
    assert_eq!(listed["data"]["tasks"][0]["priority"], "medium");
    Ok(())
}

#[test]
fn ignore_policy_from_config_skips_bad_enum() -> Result<(), Box<dyn std::error::Error>> {
    let env = setup();
    env.write_config("[tasks]\ninvalid_enum_updates = \"ignore\"\n")?;
    let id = add(&env, &["Tidy desk"])?;

    let edited = run_json(
        &env,
        &["task", "edit", &id, "--priority", "urgent", "--category", "home"],
    )?;
    assert_eq!(edited["data"]["priority"], "medium");
    assert_eq!(edited["data"]["category"], "home");
    Ok(())
}

#[test]
fn search_group_and_clear() -> Result<(), Box<dyn std::error::Error>> {
    let env = setup();
    add(&env, &["Buy milk", "-c", "home"])?;
    add(&env, &["Buy stamps", "-c", "other"])?;
    let id = add(&env, &["Milk review", "-c", "work"])?;
    run_json(&env, &["task", "toggle", &id])?;

    let found = run_json(&env, &["task", "search", "MILK"])?;
    assert_eq!(found["data"]["total"], 2);

    let grouped = run_json(&env, &["task", "group", "status"])?;
    let groups = grouped["data"]["groups"].as_array().expect("groups");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["key"], "done");
    assert_eq!(groups[1]["tasks"].as_array().map(Vec::len), Some(2));

    taskmaster_cmd(&env)
        .args(["task", "group", "colour"])
        .assert()
        .code(2);

    let cleared = run_json(&env, &["task", "clear"])?;
    assert_eq!(cleared["data"]["removed"], 3);
    let listed = run_json(&env, &["task", "list"])?;
    assert_eq!(listed["data"]["total"], 0);
    Ok(())
}

#[test]
fn stats_report() -> Result<(), Box<dyn std::error::Error>> {
    let env = setup();
    add(&env, &["One", "-p", "high"])?;
    add(&env, &["Two", "-p", "high"])?;
    let id = add(&env, &["Three", "-p", "low"])?;
    run_json(&env, &["task", "toggle", &id])?;

    let stats = run_json(&env, &["stats"])?;
    let data = &stats["data"];
    assert_eq!(data["scope"], "Ala");
    assert_eq!(data["total"], 3);
    assert_eq!(data["completed"], 1);
    assert_eq!(data["completionRate"], 33);
    assert_eq!(data["byPriority"], serde_json::json!({"high": 2, "medium": 0, "low": 1}));
    assert_eq!(data["createdToday"], 3);

    taskmaster_cmd(&env)
        .args(["stats", "--all"])
        .assert()
        .success()
        .stdout(contains("Statistics for all users"))
        .stdout(contains("- Completion: 33%"));
    Ok(())
}
