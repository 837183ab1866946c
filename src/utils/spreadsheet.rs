//! Excel export for reports.

use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<Option<String>> for Cell {
    fn from(v: Option<String>) -> Self {
        Cell::Text(v.unwrap_or_default())
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Number(v as f64)
    }
}

/// Title row, subtitle rows, one bold header row, then data.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub subtitles: Vec<String>,
    pub column_headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Report {
    /// Renders the report as an xlsx document in memory.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Report")?;

        let bold_center = Format::new().set_bold().set_align(FormatAlign::Center);
        let last_col = self.column_headers.len().saturating_sub(1) as u16;

        // Title and subtitles span the header width
        let mut row: u32 = 0;
        let banners = std::iter::once(&self.title).chain(self.subtitles.iter());
        for (i, text) in banners.enumerate() {
            let format = if i == 0 { bold_center.clone() } else { Format::new() };
            if last_col > 0 {
                worksheet.merge_range(row, 0, row, last_col, text, &format)?;
            } else {
                worksheet.write_string_with_format(row, 0, text, &format)?;
            }
            row += 1;
        }

        for (col, header) in self.column_headers.iter().enumerate() {
            worksheet.write_string_with_format(row, col as u16, header, &bold_center)?;
        }
        row += 1;

        for cells in &self.rows {
            for (col, cell) in cells.iter().enumerate() {
                match cell {
                    Cell::Text(v) => worksheet.write_string(row, col as u16, v)?,
                    Cell::Number(v) => worksheet.write_number(row, col as u16, *v)?,
                };
            }
            row += 1;
        }

        worksheet.autofit();

        workbook.save_to_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(headers: &[&str]) -> Report {
        Report {
            title: "Attendance report".into(),
            subtitles: vec!["Department: All departments".into()],
            column_headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: vec![vec!["Aruzhan".into(), Cell::from(3i64)]],
        }
    }

    #[test]
    fn writes_a_zip_container() {
        let bytes = report(&["Employee", "Late arrivals"]).to_xlsx().unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn single_column_report_does_not_merge() {
        let bytes = report(&["Employee"]).to_xlsx().unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn missing_text_becomes_empty_cell() {
        assert_eq!(Cell::from(None::<String>), Cell::Text(String::new()));
    }
}
