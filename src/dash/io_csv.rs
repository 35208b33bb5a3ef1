// Primitives for reading CSV files.

use std::io;

use crate::dash::{
    io_common::{parse_cell, simplify_file_name, Cell, ColumnLayout},
    *,
};

pub fn read_csv_source(path: &str, cfs: &FileSource) -> LoadResult<Vec<ParsedRow>> {
    let delimiter = get_delimiter(path, cfs)?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_path(path)
        .context(OpenCsvSnafu { path })?;
    read_csv_records(path, rdr, cfs)
}

/// Reads all the records of a CSV reader. The first record is the header.
pub fn read_csv_records<R: io::Read>(
    path: &str,
    rdr: csv::Reader<R>,
    cfs: &FileSource,
) -> LoadResult<Vec<ParsedRow>> {
    let source = simplify_file_name(path);
    let mut records = rdr.into_records();
    let header: Vec<String> = match records.next() {
        Some(r) => r
            .context(CsvRecordSnafu { path, lineno: 1u64 })?
            .iter()
            .map(|s| s.trim().trim_start_matches('\u{feff}').to_string())
            .collect(),
        None => return EmptyFileSnafu { path }.fail(),
    };
    debug!("read_csv_records: {}: header: {:?}", path, header);
    let layout = ColumnLayout::resolve(path, 1, &header, cfs)?;

    let mut res: Vec<ParsedRow> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // Records may span several lines when fields are quoted.
        let fallback_lineno = idx as u64 + 2;
        let line = line_r.context(CsvRecordSnafu {
            path,
            lineno: fallback_lineno,
        })?;
        let lineno = line
            .position()
            .map(|p| p.line())
            .unwrap_or(fallback_lineno);
        let state = line.get(layout.state_idx).unwrap_or("").trim().to_string();
        let row = layout.assemble(&source, lineno, state, |col_idx, column| {
            let content = line.get(col_idx).unwrap_or("");
            match parse_cell(content, cfs) {
                Cell::Number(x) => Ok(Some(x)),
                Cell::Missing => Ok(None),
                Cell::Invalid(content) => UnparseableNumberSnafu {
                    path,
                    lineno,
                    column,
                    content,
                }
                .fail(),
            }
        })?;
        debug!("read_csv_records: lineno: {:?} row: {:?}", lineno, &row);
        res.push(row);
    }
    info!("Read {} rows from {}", res.len(), path);
    Ok(res)
}

fn get_delimiter(path: &str, cfs: &FileSource) -> LoadResult<u8> {
    match cfs.delimiter.as_deref() {
        None => Ok(b','),
        Some("\\t") | Some("tab") => Ok(b'\t'),
        Some(d) if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
        Some(d) => InvalidDelimiterSnafu {
            path,
            delimiter: d,
        }
        .fail(),
    }
}
