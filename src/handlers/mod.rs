//! MCP tool handlers for the maintenance plan server
//!
//! Each file groups the handlers of one area of the plan.

pub mod cash;
pub mod inventory;
pub mod save;
pub mod task_group;
pub mod timeline;
