use pricesync_core::read::InfoError;
use pricesync_core::{statistics_response, StatisticsParams, Warehouse};

use crate::cli::StatsArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &StatsArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let params = StatisticsParams {
        symbol: args.symbol.clone(),
        start_date: args.start_date.clone(),
        end_date: args.end_date.clone(),
    };

    let response = statistics_response(warehouse, &params)?;
    if let InfoError::Fields(errors) = &response.info.error {
        return Err(CliError::InvalidParameters(errors.clone()));
    }

    let mut result = CommandResult::ok(serde_json::to_value(&response)?);
    if let Some(note) = &response.info.note {
        result = result.with_warning(note.clone());
    }
    Ok(result)
}
