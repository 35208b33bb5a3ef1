use std::path::Path;

use crate::dash::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The content of one numeric cell.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Number(f64),
    Missing,
    Invalid(String),
}

/// Parses the text of a numeric cell. Percent signs and thousands separators
/// are accepted: `12.5%`, `1,234`.
pub fn parse_cell(content: &str, cfs: &FileSource) -> Cell {
    if cfs.is_missing_label(content) {
        return Cell::Missing;
    }
    let c = content.trim();
    let c = c.strip_suffix('%').unwrap_or(c).trim();
    let cleaned: String = c.chars().filter(|ch| *ch != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(x) => Cell::Number(x),
        Err(_) => Cell::Invalid(content.to_string()),
    }
}

/// The positions of the declared columns, resolved from the header of a file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnLayout {
    pub state_idx: usize,
    /// (metric, column header, position)
    pub metrics: Vec<(String, String, usize)>,
    /// (dimension, category, column header, position)
    pub breakdowns: Vec<(String, String, String, usize)>,
}

impl ColumnLayout {
    /// Fails if one of the declared columns is not in the header.
    /// `header_line` is the line number of the header in the file.
    pub fn resolve(
        path: &str,
        header_line: u64,
        header: &[String],
        cfs: &FileSource,
    ) -> LoadResult<ColumnLayout> {
        let find = |column: &str| -> LoadResult<usize> {
            header
                .iter()
                .position(|h| h.trim() == column)
                .context(MissingColumnSnafu {
                    path,
                    lineno: header_line,
                    column,
                })
        };
        let state_idx = find(cfs.state_column.as_str())?;
        let mut metrics = Vec::new();
        for mc in cfs.metrics.iter() {
            let column = mc.column_name();
            metrics.push((mc.metric.clone(), column.to_string(), find(column)?));
        }
        let mut breakdowns = Vec::new();
        for bc in cfs.breakdowns.iter() {
            breakdowns.push((
                bc.dimension.clone(),
                bc.category.clone(),
                bc.column.clone(),
                find(bc.column.as_str())?,
            ));
        }
        debug!(
            "ColumnLayout::resolve: {}: state column {}, metrics {:?}, breakdowns {:?}",
            path, state_idx, metrics, breakdowns
        );
        Ok(ColumnLayout {
            state_idx,
            metrics,
            breakdowns,
        })
    }

    /// Assembles a row from the cells of a line.
    ///
    /// `read_cell` converts the cell at a position, given the header of its column.
    pub fn assemble<F>(
        &self,
        source: &str,
        lineno: u64,
        state: String,
        mut read_cell: F,
    ) -> LoadResult<ParsedRow>
    where
        F: FnMut(usize, &str) -> LoadResult<Option<f64>>,
    {
        let mut values = Vec::with_capacity(self.metrics.len());
        for (metric, column, idx) in self.metrics.iter() {
            values.push((metric.clone(), read_cell(*idx, column)?));
        }
        let mut breakdowns = Vec::with_capacity(self.breakdowns.len());
        for (dimension, category, column, idx) in self.breakdowns.iter() {
            breakdowns.push((dimension.clone(), category.clone(), read_cell(*idx, column)?));
        }
        Ok(ParsedRow {
            source: source.to_string(),
            line: lineno,
            state,
            values,
            breakdowns,
        })
    }
}
