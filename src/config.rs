//! Runtime options for the MCP server

use crate::plan::SaldoPolicy;

/// Options that shape how the server persists and classifies the plan
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Commit the plan file to git after every save
    pub sync_git: bool,
    pub saldo_policy: SaldoPolicy,
}

impl ServerOptions {
    pub fn with_sync_git(mut self, sync_git: bool) -> Self {
        self.sync_git = sync_git;
        self
    }

    pub fn with_saldo_policy(mut self, saldo_policy: SaldoPolicy) -> Self {
        self.saldo_policy = saldo_policy;
        self
    }
}
