//! Timeline handler

use crate::MjopServerHandler;
use crate::formatting::format_timeline;
use mcp_attr::Result as McpResult;

impl MjopServerHandler {
    pub async fn handle_timeline(&self) -> McpResult<String> {
        let timeline = self.lock_state().timeline();
        Ok(format_timeline(&timeline))
    }
}
