//! Output formatting for CLI results

use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use k3sync::Result;

pub mod display;
pub mod formatters;
pub mod json;
pub mod table;

/// Render `items` as a table of `D` rows, or as JSON of the items themselves.
pub fn render<T, D>(items: &[T], format: OutputFormat) -> Result<String>
where
    T: Serialize,
    D: Tabled + for<'a> From<&'a T>,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<D> = items.iter().map(D::from).collect();
            Ok(table::format_table(&rows))
        }
        OutputFormat::Json => Ok(json::format_json(items)?),
    }
}

/// Format and print data to stdout
pub fn print<T, D>(items: &[T], format: OutputFormat) -> Result<()>
where
    T: Serialize,
    D: Tabled + for<'a> From<&'a T>,
{
    println!("{}", render::<T, D>(items, format)?);
    Ok(())
}
