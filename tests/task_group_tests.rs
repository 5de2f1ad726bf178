//! Task group tests through the MCP handlers
mod common;

use chrono::NaiveDate;
use common::*;
use mjop_mcp::plan::Task;
use std::collections::BTreeMap;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// (due date, cost in cents) pairs of a group, sorted
fn occurrence_multiset(handler: &mjop_mcp::MjopServerHandler, group_id: &str) -> Vec<(String, NaiveDate, i64)> {
    let state = handler.snapshot();
    let mut pairs: Vec<_> = state
        .tasks_of_group(group_id)
        .map(|t| (t.element_id.clone(), t.due_date, (t.cost * 100.0).round() as i64))
        .collect();
    pairs.sort();
    pairs
}

fn all_tasks(handler: &mjop_mcp::MjopServerHandler) -> Vec<Task> {
    handler.snapshot().all_tasks().cloned().collect()
}

#[tokio::test]
async fn test_yearly_indexed_group_expands_per_element() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 1).await;

    let group_id = add_yearly_paint_group(&handler, &["frame-1"], 3).await;
    assert_eq!(group_id, "tg-1");

    let occurrences = occurrence_multiset(&handler, &group_id);
    assert_eq!(
        occurrences,
        vec![
            ("frame-1".to_string(), date(2024, 1, 15), 100000),
            ("frame-1".to_string(), date(2025, 1, 15), 105000),
            ("frame-1".to_string(), date(2026, 1, 15), 110250),
        ]
    );
}

#[tokio::test]
async fn test_occurrence_count_for_uneven_interval() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 2).await;

    handler
        .handle_add_task_group(
            "Inspect".to_string(),
            "woodwork".to_string(),
            vec!["frame-1".to_string(), "frame-2".to_string()],
            "2024-01-31".to_string(),
            Some(80.0),
            None,
            Some(7),
            Some(5),
            None,
        )
        .await
        .unwrap();

    let state = handler.snapshot();
    // floor(5 * 12 / 7) = 8 per element
    assert_eq!(state.tasks_of_group("tg-1").count(), 16);
    let frame_1: Vec<NaiveDate> = state
        .find_element("frame-1")
        .unwrap()
        .tasks
        .iter()
        .map(|t| t.due_date)
        .collect();
    assert_eq!(frame_1[0], date(2024, 1, 31));
    assert_eq!(frame_1[1], date(2024, 8, 31));
    assert_eq!(frame_1[7], date(2028, 2, 29));
    assert!(state.tasks_of_group("tg-1").all(|t| t.cost == 80.0));
}

#[tokio::test]
async fn test_one_off_group_creates_single_task_per_element() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 3).await;

    let response = handler
        .handle_add_task_group(
            "Replace putty".to_string(),
            "woodwork".to_string(),
            vec!["frame-1".to_string(), "frame-2".to_string(), "frame-3".to_string()],
            "2025-06-01".to_string(),
            None,
            Some(vec![
                "frame-1=100".to_string(),
                "frame-2=150".to_string(),
                "frame-3=175.5".to_string(),
            ]),
            None,
            None,
            None,
        )
        .await
        .unwrap();
    assert!(response.contains("Task group created with ID: tg-1"));

    let occurrences = occurrence_multiset(&handler, "tg-1");
    assert_eq!(
        occurrences,
        vec![
            ("frame-1".to_string(), date(2025, 6, 1), 10000),
            ("frame-2".to_string(), date(2025, 6, 1), 15000),
            ("frame-3".to_string(), date(2025, 6, 1), 17550),
        ]
    );
}

#[tokio::test]
async fn test_missing_total_years_leaves_tasks_unchanged() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 2).await;
    add_yearly_paint_group(&handler, &["frame-1"], 2).await;
    let before = handler.snapshot();

    let result = handler
        .handle_add_task_group(
            "Repaint".to_string(),
            "painting".to_string(),
            vec!["frame-2".to_string()],
            "2024-05-01".to_string(),
            Some(500.0),
            None,
            Some(12),
            None,
            None,
        )
        .await;

    let err = result.unwrap_err();
    assert!(format!("{:?}", err).contains("total_years"));
    assert_eq!(handler.snapshot(), before);
}

#[tokio::test]
async fn test_missing_individual_cost_is_rejected() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 2).await;
    let before = handler.snapshot();

    let result = handler
        .handle_add_task_group(
            "Replace putty".to_string(),
            "woodwork".to_string(),
            vec!["frame-1".to_string(), "frame-2".to_string()],
            "2025-06-01".to_string(),
            None,
            Some(vec!["frame-1=100".to_string()]),
            None,
            None,
            None,
        )
        .await;

    assert!(format!("{:?}", result.unwrap_err()).contains("frame-2"));
    assert_eq!(handler.snapshot(), before);
}

#[tokio::test]
async fn test_open_add_requires_selection() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 1).await;

    assert!(
        handler
            .handle_open_add_task_group("painting".to_string(), vec![])
            .await
            .is_err()
    );

    let preview = handler
        .handle_open_add_task_group("painting".to_string(), vec!["frame-1".to_string()])
        .await
        .unwrap();
    assert!(preview.contains("Window frame 1"));
    assert!(preview.contains("Front facade"));
}

#[tokio::test]
async fn test_edit_without_changes_is_idempotent() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 2).await;
    let group_id = add_yearly_paint_group(&handler, &["frame-1", "frame-2"], 4).await;
    let before = occurrence_multiset(&handler, &group_id);

    handler
        .handle_edit_task_group(
            group_id.clone(),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(occurrence_multiset(&handler, &group_id), before);
    let state = handler.snapshot();
    assert_eq!(state.mjop.task_groups.len(), 1);
    assert_eq!(state.mjop.task_groups[0].id, group_id);
}

#[tokio::test]
async fn test_edit_regenerates_occurrences() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 2).await;
    let group_id = add_yearly_paint_group(&handler, &["frame-1", "frame-2"], 4).await;
    assert_eq!(handler.snapshot().tasks_of_group(&group_id).count(), 8);

    handler
        .handle_edit_task_group(
            group_id.clone(),
            Some("Repaint north frames".to_string()),
            Some(vec!["frame-2".to_string()]),
            None,
            Some(400.0),
            None,
            Some(false),
            None,
            None,
            Some(false),
            None,
        )
        .await
        .unwrap();

    let state = handler.snapshot();
    let tasks: Vec<&Task> = state.tasks_of_group(&group_id).collect();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].element_id, "frame-2");
    assert_eq!(tasks[0].due_date, date(2024, 1, 15));
    assert_eq!(tasks[0].cost, 400.0);
    assert!(state.find_element("frame-1").unwrap().tasks.is_empty());
    assert_eq!(state.find_task_group(&group_id).unwrap().name, "Repaint north frames");
}

#[tokio::test]
async fn test_failed_edit_keeps_previous_occurrences() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 1).await;
    let group_id = add_yearly_paint_group(&handler, &["frame-1"], 3).await;
    let before = handler.snapshot();

    let result = handler
        .handle_edit_task_group(
            group_id, None, None, None, None, None, None, Some(0), None, None, None,
        )
        .await;

    assert!(result.is_err());
    assert_eq!(handler.snapshot(), before);
}

#[tokio::test]
async fn test_delete_restores_previous_tasks() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 2).await;
    handler
        .handle_add_task("frame-1".to_string(), "2024-09-01".to_string(), 75.0)
        .await
        .unwrap();
    handler
        .handle_add_task_group(
            "Inspect frames".to_string(),
            "woodwork".to_string(),
            vec!["frame-1".to_string(), "frame-2".to_string()],
            "2024-01-15".to_string(),
            Some(60.0),
            None,
            Some(6),
            Some(2),
            None,
        )
        .await
        .unwrap();
    let before = all_tasks(&handler);
    let other_group = occurrence_multiset(&handler, "tg-1");
    assert_eq!(other_group.len(), 8);

    let group_id = add_yearly_paint_group(&handler, &["frame-1", "frame-2"], 3).await;
    assert_eq!(all_tasks(&handler).len(), before.len() + 6);

    let response = handler.handle_delete_task_group(group_id.clone()).await.unwrap();
    assert!(response.contains("6 task(s) removed"));
    assert_eq!(all_tasks(&handler), before);
    assert_eq!(occurrence_multiset(&handler, "tg-1"), other_group);
    assert!(handler.snapshot().find_task_group(&group_id).is_none());
    assert!(handler.snapshot().find_task_group("tg-1").is_some());
}

#[tokio::test]
async fn test_delete_unknown_group_fails() {
    let (handler, _temp_file) = get_test_handler();
    assert!(
        handler
            .handle_delete_task_group("tg-404".to_string())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_element_in_use_cannot_be_removed() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 1).await;
    let group_id = add_yearly_paint_group(&handler, &["frame-1"], 2).await;

    assert!(
        handler
            .handle_remove_element("frame-1".to_string())
            .await
            .is_err()
    );

    handler.handle_delete_task_group(group_id).await.unwrap();
    handler
        .handle_remove_element("frame-1".to_string())
        .await
        .unwrap();
    assert!(handler.snapshot().find_element("frame-1").is_none());
}

#[tokio::test]
async fn test_yearly_totals_match_element_tasks() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 3).await;
    add_yearly_paint_group(&handler, &["frame-1", "frame-2"], 5).await;
    handler
        .handle_add_task_group(
            "Gutters".to_string(),
            "woodwork".to_string(),
            vec!["frame-3".to_string()],
            "2024-07-31".to_string(),
            Some(120.0),
            None,
            Some(6),
            Some(3),
            Some(0.02),
        )
        .await
        .unwrap();
    handler
        .handle_add_task("frame-2".to_string(), "2026-02-01".to_string(), 40.0)
        .await
        .unwrap();

    let check = |handler: &mjop_mcp::MjopServerHandler| {
        let state = handler.snapshot();
        let mut expected: BTreeMap<i32, f64> = BTreeMap::new();
        for element in &state.global_elements {
            for task in &element.tasks {
                *expected
                    .entry(chrono::Datelike::year(&task.due_date))
                    .or_default() += task.cost;
            }
        }
        let totals = state.total_cost_per_year();
        assert_eq!(totals.len(), expected.len());
        for (year, cost) in expected {
            assert!(approx_eq(totals[&year], cost), "year {}", year);
        }
        let timeline = state.timeline();
        for year in &timeline.years {
            let total = totals.get(&year.year).copied().unwrap_or(0.0);
            assert!(approx_eq(year.total_cost, total));
        }
    };

    check(&handler);
    handler
        .handle_edit_task_group(
            "tg-2".to_string(),
            None,
            None,
            None,
            Some(90.0),
            None,
            None,
            Some(4),
            None,
            None,
            None,
        )
        .await
        .unwrap();
    check(&handler);
    handler
        .handle_delete_task_group("tg-1".to_string())
        .await
        .unwrap();
    check(&handler);
}

#[tokio::test]
async fn test_show_task_group_lists_occurrences() {
    let (handler, _temp_file) = get_test_handler();
    seed_frames(&handler, 1).await;
    let group_id = add_yearly_paint_group(&handler, &["frame-1"], 3).await;

    let task_id = handler
        .snapshot()
        .tasks_of_group(&group_id)
        .next()
        .unwrap()
        .id
        .clone();
    handler
        .handle_complete_task(
            task_id.clone(),
            Some("2024-01-20".to_string()),
            Some("INV-001".to_string()),
        )
        .await
        .unwrap();

    let text = handler.handle_show_task_group(group_id).await.unwrap();
    assert!(text.contains("Occurrences (3):"));
    assert!(text.contains("2026-01-15 frame-1: 1102.50"));
    assert!(text.contains(&format!("[{}] 2024-01-15 frame-1: 1000.00 [done]", task_id)));

    let task = handler.snapshot().find_task(&task_id).cloned().unwrap();
    assert_eq!(task.completed_on, Some(date(2024, 1, 20)));
    assert_eq!(task.invoice_ref.as_deref(), Some("INV-001"));
}
