//! The one codec allowed to know what a workbook actually is. Translates
//! the concrete `.xlsx` file named on the CLI to and from the
//! format-agnostic [`Sheets`]/[`ScheduleOutput`] shapes that the rest of
//! the crate consumes.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use crate::error::{Error, Result};
use crate::io::{AbstractRow, RoomRow, ScheduleOutput, Sheets, SessionRow, StreamRow};

fn worksheet(workbook: &mut Xlsx<std::io::BufReader<std::fs::File>>, name: &str) -> Result<Range<Data>> {
    workbook
        .worksheet_range(name)
        .map_err(|_| Error::MissingSheet(name.to_string()))
}

fn header_index(range: &Range<Data>) -> HashMap<String, usize> {
    match range.rows().next() {
        Some(row) => row.iter().enumerate().map(|(i, cell)| (cell.to_string(), i)).collect(),
        None => HashMap::new(),
    }
}

fn string_cell(row: &[Data], header: &HashMap<String, usize>, column: &str) -> String {
    header.get(column).and_then(|&i| row.get(i)).map(|c| c.to_string()).unwrap_or_default()
}

fn optional_string_cell(row: &[Data], header: &HashMap<String, usize>, column: &str) -> Option<String> {
    let value = string_cell(row, header, column);
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn f64_cell(row: &[Data], header: &HashMap<String, usize>, column: &str) -> f64 {
    header
        .get(column)
        .and_then(|&i| row.get(i))
        .and_then(|c| c.get_float().or_else(|| c.get_int().map(|v| v as f64)))
        .unwrap_or(0.0)
}

fn usize_cell(row: &[Data], header: &HashMap<String, usize>, column: &str) -> usize {
    f64_cell(row, header, column) as usize
}

fn u32_cell(row: &[Data], header: &HashMap<String, usize>, column: &str) -> u32 {
    f64_cell(row, header, column) as u32
}

fn optional_u32_cell(row: &[Data], header: &HashMap<String, usize>, column: &str) -> Option<u32> {
    header
        .get(column)
        .and_then(|&i| row.get(i))
        .filter(|c| !c.is_empty())
        .and_then(|c| c.get_float().or_else(|| c.get_int().map(|v| v as f64)))
        .map(|v| v as u32)
}

fn parse_entity_sheet<T>(
    workbook: &mut Xlsx<std::io::BufReader<std::fs::File>>,
    name: &str,
    parse_row: impl Fn(&[Data], &HashMap<String, usize>) -> T,
) -> Result<Vec<T>> {
    let range = worksheet(workbook, name)?;
    let header = header_index(&range);
    Ok(range.rows().skip(1).map(|row| parse_row(row, &header)).collect())
}

/// The four `*|penalty` sheets are cross-tabs: the header row names the
/// columns, the first cell of each data row names that row, and the
/// interior cells hold the penalty between that row's and column's entity.
/// A blank cell is treated as 0 and simply omitted from the map.
fn parse_penalty_sheet(workbook: &mut Xlsx<std::io::BufReader<std::fs::File>>, name: &str) -> Result<HashMap<(String, String), f64>> {
    let range = worksheet(workbook, name)?;
    let mut rows = range.rows();
    let column_names: Vec<String> = match rows.next() {
        Some(header) => header.iter().skip(1).map(|c| c.to_string()).collect(),
        None => return Ok(HashMap::new()),
    };

    let mut penalties = HashMap::new();
    for row in rows {
        let row_name = row.first().map(|c| c.to_string()).unwrap_or_default();
        for (i, column_name) in column_names.iter().enumerate() {
            let Some(cell) = row.get(i + 1) else { continue };
            let value = cell.get_float().or_else(|| cell.get_int().map(|v| v as f64));
            if let Some(penalty) = value.filter(|v| *v != 0.0) {
                penalties.insert((row_name.clone(), column_name.clone()), penalty);
            }
        }
    }
    Ok(penalties)
}

/// Read a previously-written solution sheet (§6's `-s, --saved` resume
/// file) back into a [`crate::grid::Grid`]. Solution sheets have no header
/// row, unlike the entity sheets; a blank cell means `EMPTY`, and `resolve`
/// turns a cell's name/reference back into the id the grid stores.
pub fn read_grid(path: &Path, sheet: &str, rows: usize, cols: usize, resolve: impl Fn(&str) -> Option<i32>) -> Result<crate::grid::Grid> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = worksheet(&mut workbook, sheet)?;
    let mut grid = crate::grid::Grid::new(rows, cols);
    for (r, row) in range.rows().enumerate().take(rows) {
        for (c, cell) in row.iter().enumerate().take(cols) {
            let text = cell.to_string();
            if text.trim().is_empty() {
                continue;
            }
            if let Some(id) = resolve(&text) {
                grid.set(r, c, id);
            }
        }
    }
    Ok(grid)
}

pub fn read(path: &Path) -> Result<Sheets> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let streams = parse_entity_sheet(&mut workbook, "streams", |row, header| StreamRow {
        name: string_cell(row, header, "Streams"),
    })?;
    let rooms = parse_entity_sheet(&mut workbook, "rooms", |row, header| RoomRow {
        name: string_cell(row, header, "Rooms"),
    })?;
    let sessions = parse_entity_sheet(&mut workbook, "sessions", |row, header| SessionRow {
        name: string_cell(row, header, "Sessions"),
        day: u32_cell(row, header, "Day"),
        num_timeslots: usize_cell(row, header, "Max number of talks"),
    })?;
    let abstracts = parse_entity_sheet(&mut workbook, "abstracts", |row, header| AbstractRow {
        reference: string_cell(row, header, "Reference"),
        stream: string_cell(row, header, "Stream"),
        required_timeslots: usize_cell(row, header, "Required Timeslots").max(1),
        order: optional_u32_cell(row, header, "Order"),
        clash: optional_string_cell(row, header, "Clash"),
        speaker_clash: optional_string_cell(row, header, "Clash (Speaker)"),
    })?;

    let streams_sessions_penalty = parse_penalty_sheet(&mut workbook, "streams_sessions|penalty")?;
    let streams_rooms_penalty = parse_penalty_sheet(&mut workbook, "streams_rooms|penalty")?;
    let sessions_rooms_penalty = parse_penalty_sheet(&mut workbook, "sessions_rooms|penalty")?;
    let streams_streams_penalty = parse_penalty_sheet(&mut workbook, "streams_streams|penalty")?;

    Ok(Sheets {
        streams,
        rooms,
        sessions,
        abstracts,
        streams_sessions_penalty,
        streams_rooms_penalty,
        sessions_rooms_penalty,
        streams_streams_penalty,
    })
}

fn write_grid_sheet(workbook: &mut Workbook, name: &str, grid: &[Vec<String>]) -> Result<()> {
    let sheet = workbook.add_worksheet().set_name(name)?;
    for (row, values) in grid.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            sheet.write_string(row as u32, col as u16, value)?;
        }
    }
    Ok(())
}

fn write_report_sheet(workbook: &mut Workbook, name: &str, lines: &[String]) -> Result<()> {
    let sheet = workbook.add_worksheet().set_name(name)?;
    for (row, line) in lines.iter().enumerate() {
        sheet.write_string(row as u32, 0, line)?;
    }
    Ok(())
}

pub fn write(path: &Path, schedule: &ScheduleOutput) -> Result<()> {
    let mut workbook = Workbook::new();
    write_grid_sheet(&mut workbook, "streams_solution", &schedule.streams_solution)?;
    write_grid_sheet(&mut workbook, "abstracts_solution", &schedule.abstracts_solution)?;
    write_report_sheet(&mut workbook, "streams_violations", &schedule.streams_violations)?;
    write_report_sheet(&mut workbook, "abstracts_violations", &schedule.abstracts_violations)?;
    workbook.save(path)?;
    Ok(())
}
