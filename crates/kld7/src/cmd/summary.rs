use crate::cmd::SummaryArgs;
use crate::exit::{persist_error, CliResult, SUCCESS};
use crate::output::{print_summary, OutputFormat, Summary};
use crate::persist::load_captures;

pub fn run(args: SummaryArgs, format: OutputFormat) -> CliResult<i32> {
    let captures = load_captures(&args.path)
        .map_err(|err| persist_error("loading captures failed", err))?;
    print_summary(&Summary::from_captures(&captures), format);
    Ok(SUCCESS)
}
