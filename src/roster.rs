use crate::error::{CertError, RosterField, RowError};
use crate::types::TemplateVariant;

/// A validated roster entry. All fields are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    name: String,
    rank: String,
    institution: String,
}

impl RosterRow {
    pub fn new(
        name: impl AsRef<str>,
        rank: impl AsRef<str>,
        institution: impl AsRef<str>,
    ) -> Result<Self, RowError> {
        RosterRecord::new(1, name.as_ref(), rank.as_ref(), institution.as_ref()).validate()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> &str {
        &self.rank
    }

    pub fn institution(&self) -> &str {
        &self.institution
    }

    pub fn is_participation(&self, sentinel: &str) -> bool {
        self.rank.eq_ignore_ascii_case(sentinel.trim())
    }

    pub fn variant(&self, sentinel: &str) -> TemplateVariant {
        if self.is_participation(sentinel) {
            TemplateVariant::Participation
        } else {
            TemplateVariant::Excellence
        }
    }
}

/// A roster line as read from the table, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRecord {
    pub row_number: usize,
    pub name: String,
    pub rank: String,
    pub institution: String,
}

impl RosterRecord {
    pub fn new(row_number: usize, name: &str, rank: &str, institution: &str) -> Self {
        Self {
            row_number,
            name: name.to_string(),
            rank: rank.to_string(),
            institution: institution.to_string(),
        }
    }

    pub fn validate(&self) -> Result<RosterRow, RowError> {
        let name = self.name.trim();
        let rank = self.rank.trim();
        let institution = self.institution.trim();
        let known_name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };
        let missing = if name.is_empty() {
            Some(RosterField::StudentName)
        } else if rank.is_empty() {
            Some(RosterField::Rank)
        } else if institution.is_empty() {
            Some(RosterField::CollegeName)
        } else {
            None
        };
        if let Some(field) = missing {
            return Err(RowError {
                row_number: self.row_number,
                name: known_name,
                field,
            });
        }
        Ok(RosterRow {
            name: name.to_string(),
            rank: rank.to_string(),
            institution: institution.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Fail the whole batch on the first invalid record.
    #[default]
    Abort,
    /// Drop invalid records and keep going.
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct ValidatedRoster {
    /// Valid rows paired with their 1-based roster row number.
    pub rows: Vec<(usize, RosterRow)>,
    pub skipped: Vec<RowError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub records: Vec<RosterRecord>,
}

impl Roster {
    pub fn from_records(records: Vec<RosterRecord>) -> Self {
        Self { records }
    }

    /// Maps table columns by header name. Header matching trims and ignores case;
    /// extra columns are ignored and short records read missing cells as empty.
    pub fn from_table<S: AsRef<str>>(
        headers: &[S],
        records: &[Vec<String>],
    ) -> Result<Self, CertError> {
        let column = |field: RosterField| -> Result<usize, CertError> {
            headers
                .iter()
                .position(|h| h.as_ref().trim().eq_ignore_ascii_case(field.column_name()))
                .ok_or_else(|| {
                    CertError::InvalidRoster(format!(
                        "missing required column '{}'",
                        field.column_name()
                    ))
                })
        };
        let name_col = column(RosterField::StudentName)?;
        let rank_col = column(RosterField::Rank)?;
        let college_col = column(RosterField::CollegeName)?;

        let cell = |record: &Vec<String>, idx: usize| -> String {
            record.get(idx).cloned().unwrap_or_default()
        };
        let records = records
            .iter()
            .enumerate()
            .map(|(idx, record)| RosterRecord {
                row_number: idx + 1,
                name: cell(record, name_col),
                rank: cell(record, rank_col),
                institution: cell(record, college_col),
            })
            .collect();
        Ok(Self { records })
    }

    pub fn from_csv_str(text: &str) -> Result<Self, CertError> {
        let mut rows = parse_csv(text)?.into_iter();
        let Some(headers) = rows.next() else {
            return Err(CertError::InvalidRoster("roster is empty".to_string()));
        };
        let records: Vec<Vec<String>> = rows.collect();
        Self::from_table(&headers, &records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn validate(&self, policy: ValidationPolicy) -> Result<ValidatedRoster, CertError> {
        let mut out = ValidatedRoster::default();
        for record in &self.records {
            match record.validate() {
                Ok(row) => out.rows.push((record.row_number, row)),
                Err(err) => match policy {
                    ValidationPolicy::Abort => return Err(CertError::Validation(err)),
                    ValidationPolicy::Skip => out.skipped.push(err),
                },
            }
        }
        Ok(out)
    }
}

// Quoted fields, doubled quotes and CRLF are handled; blank lines are skipped.
fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, CertError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                line += 1;
                row.push(std::mem::take(&mut field));
                finish_row(&mut row, &mut rows);
            }
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return Err(CertError::InvalidRoster(format!(
            "unterminated quoted field at line {line}"
        )));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        finish_row(&mut row, &mut rows);
    }
    Ok(rows)
}

fn finish_row(row: &mut Vec<String>, rows: &mut Vec<Vec<String>>) {
    let taken = std::mem::take(row);
    if !(taken.len() == 1 && taken[0].trim().is_empty()) {
        rows.push(taken);
    }
}
