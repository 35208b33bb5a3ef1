// Primitives for reading Excel worksheets.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::dash::{
    io_common::{parse_cell, simplify_file_name, Cell, ColumnLayout},
    *,
};

pub fn read_excel_source(path: &str, cfs: &FileSource) -> LoadResult<Vec<ParsedRow>> {
    let wrange = get_range(path, cfs)?;
    read_range(path, &wrange, cfs)
}

pub fn read_range(path: &str, wrange: &Range<DataType>, cfs: &FileSource) -> LoadResult<Vec<ParsedRow>> {
    let source = simplify_file_name(path);
    // Line numbers follow the spreadsheet numbering, starting at 1.
    let first_line = wrange.start().map(|(r, _)| r as u64 + 1).unwrap_or(1);

    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyFileSnafu { path })?
        .iter()
        .map(header_cell)
        .collect();
    debug!("read_range: {}: header: {:?}", path, header);
    let layout = ColumnLayout::resolve(path, first_line, &header, cfs)?;

    let mut res: Vec<ParsedRow> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = first_line + idx as u64 + 1;
        if row.iter().all(|c| matches!(c, DataType::Empty)) {
            debug!("read_range: {}: skipping empty line {}", path, lineno);
            continue;
        }
        let state = row.get(layout.state_idx).map(state_cell).unwrap_or_default();
        let parsed = layout.assemble(&source, lineno, state, |col_idx, column| {
            match row.get(col_idx).unwrap_or(&DataType::Empty) {
                DataType::Float(f) => Ok(Some(*f)),
                DataType::Int(i) => Ok(Some(*i as f64)),
                DataType::Empty => Ok(None),
                // Formula errors such as #N/A mark unpublished values.
                DataType::Error(e) => {
                    debug!(
                        "read_range: {}:{}: cell error {:?} in column {}",
                        path, lineno, e, column
                    );
                    Ok(None)
                }
                DataType::String(s) => match parse_cell(s, cfs) {
                    Cell::Number(x) => Ok(Some(x)),
                    Cell::Missing => Ok(None),
                    Cell::Invalid(content) => UnparseableNumberSnafu {
                        path,
                        lineno,
                        column,
                        content,
                    }
                    .fail(),
                },
                other => ExcelWrongCellTypeSnafu {
                    path,
                    lineno,
                    content: format!("{:?} in column {}", other, column),
                }
                .fail(),
            }
        })?;
        res.push(parsed);
    }
    info!("Read {} rows from {}", res.len(), path);
    Ok(res)
}

fn get_range(path: &str, cfs: &FileSource) -> LoadResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyFileSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    Ok(wrange)
}

fn header_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

// State columns sometimes hold FIPS codes stored as numbers.
fn state_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    fn source() -> FileSource {
        FileSource {
            provider: "xlsx".to_string(),
            file_path: "food.xlsx".to_string(),
            state_column: "State".to_string(),
            delimiter: None,
            worksheet_name: None,
            missing_labels: None,
            metrics: vec![MetricColumn {
                metric: "PCT_LACCESS_POP15".to_string(),
                column: None,
            }],
            breakdowns: vec![],
        }
    }

    fn range(cells: &[&[DataType]]) -> Range<DataType> {
        let width = cells.iter().map(|r| r.len()).max().unwrap_or(1);
        let mut r = Range::new((0, 0), (cells.len() as u32 - 1, width as u32 - 1));
        for (i, row) in cells.iter().enumerate() {
            for (j, c) in row.iter().enumerate() {
                r.set_value((i as u32, j as u32), c.clone());
            }
        }
        r
    }

    fn s(x: &str) -> DataType {
        DataType::String(x.to_string())
    }

    #[test]
    fn read_cells() {
        let r = range(&[
            &[s("State"), s("PCT_LACCESS_POP15")],
            &[s("Mississippi"), DataType::Float(24.6)],
            &[DataType::Float(28.0), DataType::Int(24)],
            &[DataType::Empty, DataType::Empty],
            &[s("WV"), s("")],
        ]);
        let rows = read_range("/data/food.xlsx", &r, &source()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].state, "Mississippi");
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].source, "food.xlsx");
        assert_eq!(rows[0].values[0].1, Some(24.6));
        assert_eq!(rows[1].state, "28");
        assert_eq!(rows[1].values[0].1, Some(24.0));
        assert_eq!(rows[2].line, 5);
        assert_eq!(rows[2].values[0].1, None);
    }

    #[test]
    fn error_cells_are_missing() {
        let r = range(&[
            &[s("State"), s("PCT_LACCESS_POP15")],
            &[s("MS"), DataType::Error(CellErrorType::NA)],
            &[s("WV"), DataType::Error(CellErrorType::Div0)],
            &[s("AL"), DataType::Float(22.1)],
        ]);
        let rows = read_range("food.xlsx", &r, &source()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].values[0].1, None);
        assert_eq!(rows[1].values[0].1, None);
        assert_eq!(rows[2].values[0].1, Some(22.1));
    }

    #[test]
    fn wrong_cell_type() {
        let r = range(&[
            &[s("State"), s("PCT_LACCESS_POP15")],
            &[s("MS"), DataType::Bool(true)],
        ]);
        assert!(matches!(
            read_range("food.xlsx", &r, &source()),
            Err(LoadError::ExcelWrongCellType { lineno: 2, .. })
        ));
    }
}
