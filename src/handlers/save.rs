//! Save handler

use crate::MjopServerHandler;
use crate::validation::to_mcp_error;
use mcp_attr::Result as McpResult;

impl MjopServerHandler {
    pub async fn handle_save_plan(&self) -> McpResult<String> {
        self.save_data()
            .await
            .map_err(|e| to_mcp_error(e.into()))?;
        Ok(format!(
            "Plan saved to {}",
            self.storage.file_path().display()
        ))
    }
}
