//! Vacancy side of the matcher: structuring posting text and flattening it
//! into the items the scoring engine compares against candidate fragments.

pub mod handlers;
pub mod structurer;

pub use structurer::VacancyRecord;

/// Which part of the posting an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacancySection {
    Responsibilities,
    Requirements,
    Preferred,
}

/// One responsibility/requirement/preferred-skill string. Regenerated per analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct VacancyItem {
    pub text: String,
    pub section: VacancySection,
}

impl VacancyRecord {
    /// Flattens the list fields in posting order, skipping blank entries.
    pub fn items(&self) -> Vec<VacancyItem> {
        let sections = [
            (VacancySection::Responsibilities, &self.responsibilities),
            (VacancySection::Requirements, &self.requirements),
            (VacancySection::Preferred, &self.preferred),
        ];

        sections
            .into_iter()
            .flat_map(|(section, texts)| {
                texts
                    .iter()
                    .filter(|t| !t.trim().is_empty())
                    .map(move |t| VacancyItem {
                        text: t.clone(),
                        section,
                    })
            })
            .collect()
    }
}
