#[derive(Debug, Clone, Default)]
pub struct RowMetrics {
    pub row_number: usize,
    pub render_ms: f64,
    pub line_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BatchMetrics {
    pub rows: Vec<RowMetrics>,
    pub skipped_rows: usize,
    pub total_render_ms: f64,
    pub document_bytes: usize,
}

impl BatchMetrics {
    pub(crate) fn from_rows(rows: Vec<RowMetrics>, skipped_rows: usize) -> Self {
        let total_render_ms = rows.iter().map(|row| row.render_ms).sum();
        Self {
            rows,
            skipped_rows,
            total_render_ms,
            document_bytes: 0,
        }
    }

    pub fn rendered_rows(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_row_render_time() {
        let metrics = BatchMetrics::from_rows(
            vec![
                RowMetrics {
                    row_number: 1,
                    render_ms: 1.25,
                    line_count: 2,
                },
                RowMetrics {
                    row_number: 3,
                    render_ms: 0.75,
                    line_count: 3,
                },
            ],
            1,
        );
        assert_eq!(metrics.rendered_rows(), 2);
        assert_eq!(metrics.skipped_rows, 1);
        assert!((metrics.total_render_ms - 2.0).abs() < 1e-9);
        assert_eq!(metrics.document_bytes, 0);
    }
}
