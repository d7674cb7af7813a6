use crate::message::StyledRun;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredRun {
    pub run: StyledRun,
    pub width: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    runs: Vec<MeasuredRun>,
    width: i32,
}

impl Line {
    pub fn runs(&self) -> &[MeasuredRun] {
        &self.runs
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Left edge of the line when centered on `center` (floor of half the width).
    pub fn start_x(&self, center: i32) -> i32 {
        centered_start(center, self.width)
    }

    fn push(&mut self, run: MeasuredRun) {
        self.width = self.width.saturating_add(run.width);
        self.runs.push(run);
    }
}

pub fn centered_start(center: i32, width: i32) -> i32 {
    center - width.div_euclid(2)
}

/// Greedy single-pass wrap. Runs are never split: a run that alone exceeds
/// `max_width` gets a line of its own. A run that exactly fills the remaining
/// budget stays on the current line.
pub fn wrap<F>(runs: &[StyledRun], mut measure: F, max_width: i32) -> Vec<Line>
where
    F: FnMut(&str, bool) -> i32,
{
    let mut lines = Vec::new();
    let mut current = Line::default();
    for run in runs {
        let width = measure(run.text(), run.is_emphasized()).max(0);
        if current.width.saturating_add(width) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current.push(MeasuredRun {
            run: run.clone(),
            width,
        });
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs_of(widths: &[i32]) -> Vec<StyledRun> {
        widths
            .iter()
            .map(|w| StyledRun::plain("x".repeat(*w as usize)))
            .collect()
    }

    fn by_len(text: &str, _emphasized: bool) -> i32 {
        text.chars().count() as i32
    }

    fn widths(lines: &[Line]) -> Vec<Vec<i32>> {
        lines
            .iter()
            .map(|line| line.runs().iter().map(|r| r.width).collect())
            .collect()
    }

    #[test]
    fn packs_greedily_under_budget() {
        let lines = wrap(&runs_of(&[100, 100, 100]), by_len, 250);
        assert_eq!(widths(&lines), vec![vec![100, 100], vec![100]]);
        assert_eq!(lines[0].width(), 200);
    }

    #[test]
    fn oversized_run_sits_alone() {
        let lines = wrap(&runs_of(&[2000]), by_len, 1600);
        assert_eq!(widths(&lines), vec![vec![2000]]);

        let lines = wrap(&runs_of(&[10, 2000, 10]), by_len, 1600);
        assert_eq!(widths(&lines), vec![vec![10], vec![2000], vec![10]]);
    }

    #[test]
    fn exact_fit_stays_on_line() {
        let lines = wrap(&runs_of(&[150, 100, 1]), by_len, 250);
        assert_eq!(widths(&lines), vec![vec![150, 100], vec![1]]);
    }

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(wrap(&[], by_len, 250).is_empty());
    }

    #[test]
    fn lines_respect_budget_unless_single_run() {
        let sizes = [30, 700, 5, 900, 900, 1601, 40, 40, 1200, 399, 1];
        let lines = wrap(&runs_of(&sizes), by_len, 1600);
        for line in &lines {
            assert!(line.width() <= 1600 || line.runs().len() == 1);
        }
        let total: usize = lines.iter().map(|line| line.runs().len()).sum();
        assert_eq!(total, sizes.len());
    }

    #[test]
    fn rewrapping_reproduces_boundaries() {
        let sizes = [120, 80, 300, 45, 45, 600, 10, 250, 250];
        let first = wrap(&runs_of(&sizes), by_len, 400);
        let flattened: Vec<StyledRun> = first
            .iter()
            .flat_map(|line| line.runs().iter().map(|r| r.run.clone()))
            .collect();
        let second = wrap(&flattened, by_len, 400);
        assert_eq!(first, second);
    }

    #[test]
    fn measure_sees_emphasis_flag() {
        let runs = vec![StyledRun::plain("aa"), StyledRun::emphasized("aa")];
        let lines = wrap(
            &runs,
            |text, emphasized| text.len() as i32 * if emphasized { 20 } else { 10 },
            1000,
        );
        assert_eq!(widths(&lines), vec![vec![20, 40]]);
    }

    #[test]
    fn start_x_floors_half_width() {
        let even = wrap(&runs_of(&[200]), by_len, 1600);
        assert_eq!(even[0].start_x(1000), 900);
        let odd = wrap(&runs_of(&[201]), by_len, 1600);
        assert_eq!(odd[0].start_x(1000), 900);
        assert_eq!(centered_start(550, 7), 547);
    }
}
