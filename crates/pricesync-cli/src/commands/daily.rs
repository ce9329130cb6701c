use pricesync_core::read::InfoError;
use pricesync_core::{raw_data_response, RawDataParams, Warehouse};

use crate::cli::DailyArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &DailyArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let params = RawDataParams {
        symbol: args.symbol.clone(),
        start_date: args.start_date.clone(),
        end_date: args.end_date.clone(),
        limit: args.limit.clone(),
        page: args.page.clone(),
    };

    let response = raw_data_response(warehouse, &params)?;
    if let InfoError::Fields(errors) = &response.info.error {
        return Err(CliError::InvalidParameters(errors.clone()));
    }

    Ok(CommandResult::ok(serde_json::to_value(&response)?))
}
