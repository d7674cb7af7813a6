use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterField {
    StudentName,
    Rank,
    CollegeName,
}

impl RosterField {
    pub fn column_name(&self) -> &'static str {
        match self {
            RosterField::StudentName => "StudentName",
            RosterField::Rank => "Rank",
            RosterField::CollegeName => "CollegeName",
        }
    }
}

/// A roster record that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based data row number (the header is not counted).
    pub row_number: usize,
    pub name: Option<String>,
    pub field: RosterField,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "row {} ({}): missing or empty {}",
                self.row_number,
                name,
                self.field.column_name()
            ),
            None => write!(
                f,
                "row {}: missing or empty {}",
                self.row_number,
                self.field.column_name()
            ),
        }
    }
}

#[derive(Debug)]
pub enum CertError {
    Validation(RowError),
    InvalidRoster(String),
    Asset(String),
    InvalidConfiguration(String),
    Render {
        row_number: usize,
        name: String,
        message: String,
    },
    Document(String),
    EmptyBatch,
    Io(std::io::Error),
}

impl fmt::Display for CertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertError::Validation(err) => write!(f, "validation error: {}", err),
            CertError::InvalidRoster(message) => write!(f, "invalid roster: {}", message),
            CertError::Asset(message) => write!(f, "assets unavailable: {}", message),
            CertError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            CertError::Render {
                row_number,
                name,
                message,
            } => write!(f, "render failed for row {} ({}): {}", row_number, name, message),
            CertError::Document(message) => write!(f, "document error: {}", message),
            CertError::EmptyBatch => write!(f, "no certificates to assemble"),
            CertError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for CertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CertError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CertError {
    fn from(value: std::io::Error) -> Self {
        CertError::Io(value)
    }
}

impl From<RowError> for CertError {
    fn from(value: RowError) -> Self {
        CertError::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_error_display_names_row_and_field() {
        let err = RowError {
            row_number: 3,
            name: None,
            field: RosterField::StudentName,
        };
        assert_eq!(err.to_string(), "row 3: missing or empty StudentName");

        let err = CertError::from(RowError {
            row_number: 2,
            name: Some("Ada".to_string()),
            field: RosterField::Rank,
        });
        assert_eq!(
            err.to_string(),
            "validation error: row 2 (Ada): missing or empty Rank"
        );
    }
}
