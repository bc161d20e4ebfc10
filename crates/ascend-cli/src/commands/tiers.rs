//! Tiers command implementation.

use super::App;
use crate::error::Result;

/// Execute the tiers command.
pub fn execute_tiers(app: &App) -> Result<String> {
    app.formatter.format_tiers(app.service.engine().catalog())
}
