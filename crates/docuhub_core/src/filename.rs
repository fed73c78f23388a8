//! crates/docuhub_core/src/filename.rs
//!
//! The upload naming convention `<owner>_<category…>_<period>.pdf`.
//!
//! The first underscore-delimited segment is the owner id, the last one is the
//! period, and everything in between (rejoined with `_`) is the category. This lets
//! categories such as `Human_Resources` keep their underscores, at the cost of
//! owner ids and periods never being allowed to contain one.

use std::fmt;

const PDF_EXTENSION: &str = ".pdf";
const DELIMITER: char = '_';

/// The three fields encoded in a conforming filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub owner_id: String,
    pub category: String,
    pub period: String,
}

/// Names the field that came out empty, for rejection messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameField {
    OwnerId,
    Category,
    Period,
}

impl fmt::Display for FilenameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilenameField::OwnerId => "owner id",
            FilenameField::Category => "category",
            FilenameField::Period => "period",
        };
        f.write_str(name)
    }
}

/// Why a filename does not follow the convention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilenameError {
    #[error("Filename is empty")]
    Empty,
    #[error("Only .pdf files are accepted")]
    NotPdf,
    #[error("Expected ID_Category_Period.pdf, found {found} segment(s)")]
    TooFewSegments { found: usize },
    #[error("The {0} segment is empty")]
    EmptyField(FilenameField),
}

/// Parses an uploaded file's name into its owner, category and period.
///
/// The name must end in `.pdf` (any case). Fields are returned exactly as
/// segmented; the emptiness check trims whitespace but the stored values do not.
pub fn parse_filename(filename: &str) -> Result<ParsedFilename, FilenameError> {
    if filename.trim().is_empty() {
        return Err(FilenameError::Empty);
    }
    let stem = strip_pdf_extension(filename).ok_or(FilenameError::NotPdf)?;
    if stem.is_empty() {
        return Err(FilenameError::Empty);
    }

    let segments: Vec<&str> = stem.split(DELIMITER).collect();
    if segments.len() < 3 {
        return Err(FilenameError::TooFewSegments {
            found: segments.len(),
        });
    }

    let owner_id = segments[0];
    let period = segments[segments.len() - 1];
    let category = segments[1..segments.len() - 1].join("_");

    for (value, field) in [
        (owner_id, FilenameField::OwnerId),
        (category.as_str(), FilenameField::Category),
        (period, FilenameField::Period),
    ] {
        if value.trim().is_empty() {
            return Err(FilenameError::EmptyField(field));
        }
    }

    Ok(ParsedFilename {
        owner_id: owner_id.to_string(),
        category,
        period: period.to_string(),
    })
}

fn strip_pdf_extension(filename: &str) -> Option<&str> {
    let split = filename.len().checked_sub(PDF_EXTENSION.len())?;
    match (filename.get(..split), filename.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(PDF_EXTENSION) => Some(stem),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(owner_id: &str, category: &str, period: &str) -> ParsedFilename {
        ParsedFilename {
            owner_id: owner_id.to_string(),
            category: category.to_string(),
            period: period.to_string(),
        }
    }

    #[test]
    fn test_minimal_valid_name() {
        assert_eq!(
            parse_filename("1023_Finance_January.pdf"),
            Ok(parsed("1023", "Finance", "January"))
        );
    }

    #[test]
    fn test_category_keeps_inner_underscores() {
        assert_eq!(
            parse_filename("1023_Human_Resources_March.pdf"),
            Ok(parsed("1023", "Human_Resources", "March"))
        );
        assert_eq!(
            parse_filename("7_a_b_c_d_2024-05.pdf"),
            Ok(parsed("7", "a_b_c_d", "2024-05"))
        );
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(
            parse_filename("1023_Finance_January.PDF"),
            Ok(parsed("1023", "Finance", "January"))
        );
        assert_eq!(
            parse_filename("1023_Finance_January.Pdf"),
            Ok(parsed("1023", "Finance", "January"))
        );
    }

    #[test]
    fn test_missing_extension_is_rejected() {
        assert_eq!(
            parse_filename("1023_Finance_January"),
            Err(FilenameError::NotPdf)
        );
        assert_eq!(parse_filename("pdf"), Err(FilenameError::NotPdf));
    }

    #[test]
    fn test_other_extensions_are_rejected() {
        assert_eq!(
            parse_filename("1023_Finance_January.docx"),
            Err(FilenameError::NotPdf)
        );
        assert_eq!(parse_filename("notes_for_you.txt"), Err(FilenameError::NotPdf));
        assert_eq!(
            parse_filename("1023_Finance_January.pdf.txt"),
            Err(FilenameError::NotPdf)
        );
    }

    #[test]
    fn test_too_few_segments() {
        assert_eq!(
            parse_filename("invalidname.pdf"),
            Err(FilenameError::TooFewSegments { found: 1 })
        );
        assert_eq!(
            parse_filename("1023_Finance.pdf"),
            Err(FilenameError::TooFewSegments { found: 2 })
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_filename(""), Err(FilenameError::Empty));
        assert_eq!(parse_filename("   "), Err(FilenameError::Empty));
        assert_eq!(parse_filename(".pdf"), Err(FilenameError::Empty));
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        assert_eq!(
            parse_filename("_Finance_January.pdf"),
            Err(FilenameError::EmptyField(FilenameField::OwnerId))
        );
        assert_eq!(
            parse_filename("1023__January.pdf"),
            Err(FilenameError::EmptyField(FilenameField::Category))
        );
        assert_eq!(
            parse_filename("1023_Finance_ .pdf"),
            Err(FilenameError::EmptyField(FilenameField::Period))
        );
        assert_eq!(
            parse_filename("  _Finance_January.pdf"),
            Err(FilenameError::EmptyField(FilenameField::OwnerId))
        );
    }

    #[test]
    fn test_multibyte_names_do_not_panic() {
        assert_eq!(
            parse_filename("ល_ខ_គ.pdf"),
            Ok(parsed("ល", "ខ", "គ"))
        );
        assert_eq!(parse_filename("ល"), Err(FilenameError::NotPdf));
        assert_eq!(parse_filename("ល_ខ_គ.ピdf"), Err(FilenameError::NotPdf));
    }

    #[test]
    fn test_round_trips_segments_for_generated_names() {
        let owners = ["1", "1023", "emp-77"];
        let categories = ["Finance", "Human_Resources", "a_b_c"];
        let periods = ["January", "2024-03", "Q1"];
        for owner in owners {
            for category in categories {
                for period in periods {
                    let name = format!("{owner}_{category}_{period}.pdf");
                    assert_eq!(
                        parse_filename(&name),
                        Ok(parsed(owner, category, period)),
                        "{name}"
                    );
                }
            }
        }
    }
}
