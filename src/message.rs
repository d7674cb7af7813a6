use crate::roster::RosterRow;

/// A span of certificate text sharing one emphasis style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StyledRun {
    text: String,
    emphasized: bool,
}

impl StyledRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: false,
        }
    }

    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_emphasized(&self) -> bool {
        self.emphasized
    }
}

/// Builds the certificate sentence for one row.
///
/// Participants get the participation wording (name, institution, event);
/// every other rank gets the excellence wording, which also names the rank.
/// Variable segments are emphasized, literal segments are plain.
pub fn build_runs(row: &RosterRow, event_name: &str, sentinel: &str) -> Vec<StyledRun> {
    let mut runs = vec![
        StyledRun::plain("This is to certify that "),
        StyledRun::emphasized(row.name()),
        StyledRun::plain(" of "),
        StyledRun::emphasized(row.institution()),
    ];
    if row.is_participation(sentinel) {
        runs.push(StyledRun::plain(" has successfully participated in "));
    } else {
        runs.push(StyledRun::plain(" has secured "));
        runs.push(StyledRun::emphasized(row.rank()));
        runs.push(StyledRun::plain(" in "));
    }
    runs.push(StyledRun::emphasized(event_name));
    runs.push(StyledRun::plain("."));
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(runs: &[StyledRun]) -> String {
        runs.iter().map(StyledRun::text).collect()
    }

    fn emphasized_texts(runs: &[StyledRun]) -> Vec<&str> {
        runs.iter()
            .filter(|run| run.is_emphasized())
            .map(StyledRun::text)
            .collect()
    }

    #[test]
    fn participation_wording_has_three_variable_segments() {
        let row = RosterRow::new("Ada", "participation", "Analytical College").unwrap();
        let runs = build_runs(&row, "Hackfest", "participation");
        assert_eq!(
            emphasized_texts(&runs),
            vec!["Ada", "Analytical College", "Hackfest"]
        );
        assert_eq!(
            sentence(&runs),
            "This is to certify that Ada of Analytical College has successfully participated in Hackfest."
        );
    }

    #[test]
    fn excellence_wording_includes_rank() {
        let row = RosterRow::new("Grace", "Second", "Navy School").unwrap();
        let runs = build_runs(&row, "Hackfest", "participation");
        assert_eq!(
            emphasized_texts(&runs),
            vec!["Grace", "Navy School", "Second", "Hackfest"]
        );
        assert_eq!(
            sentence(&runs),
            "This is to certify that Grace of Navy School has secured Second in Hackfest."
        );
    }

    #[test]
    fn literal_segments_are_plain() {
        let row = RosterRow::new("Grace", "Participation", "Navy School").unwrap();
        let runs = build_runs(&row, "Hackfest", "participation");
        assert!(!runs[0].is_emphasized());
        assert!(runs.last().is_some_and(|run| !run.is_emphasized()));
        assert!(runs.iter().all(|run| !run.text().is_empty()));
    }
}
