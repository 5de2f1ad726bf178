//! Common test utilities for integration tests
#![allow(dead_code)]

use mjop_mcp::{MjopServerHandler, ServerOptions};
use tempfile::NamedTempFile;

/// Create a test handler with temporary storage
pub fn get_test_handler() -> (MjopServerHandler, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let handler =
        MjopServerHandler::new(temp_file.path().to_str().unwrap(), ServerOptions::default())
            .unwrap();
    (handler, temp_file)
}

/// Extract the ID from a creation response
/// Response format: "... created with ID: <id>" followed by a space, newline or end
pub fn extract_id_from_response(response: &str) -> String {
    let start = response.find("ID: ").map(|i| i + 4).unwrap_or(0);
    response[start..]
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_string()
}

/// Add a space and painted window frames `frame-1..=frame-<count>` to it
pub async fn seed_frames(handler: &MjopServerHandler, count: usize) {
    handler
        .handle_add_space("facade".to_string(), "Front facade".to_string())
        .await
        .unwrap();
    for i in 1..=count {
        handler
            .handle_add_element(
                format!("frame-{}", i),
                format!("Window frame {}", i),
                Some("facade".to_string()),
                Some(vec!["painting".to_string(), "woodwork".to_string()]),
            )
            .await
            .unwrap();
    }
}

/// Add a yearly, 5% indexed painting group over all given frames
pub async fn add_yearly_paint_group(
    handler: &MjopServerHandler,
    element_ids: &[&str],
    years: u32,
) -> String {
    let response = handler
        .handle_add_task_group(
            "Repaint frames".to_string(),
            "painting".to_string(),
            element_ids.iter().map(|s| s.to_string()).collect(),
            "2024-01-15".to_string(),
            Some(1000.0),
            None,
            Some(12),
            Some(years),
            Some(0.05),
        )
        .await
        .unwrap();
    extract_id_from_response(&response)
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
