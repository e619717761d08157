//! Cover letter assembly: salutation, date, closing, the variables handed to the
//! companion template, and the deterministic artifact names.

use chrono::{Datelike, NaiveDate};

use crate::config::AuthorInfo;
use crate::models::{path_component, JobRecord, Language};
use crate::render::sanitize_for_latex;

const GERMAN_MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactNames {
    pub primary: String,
    pub companion: String,
}

pub fn artifact_names(record: &JobRecord, language: Language, author_name: &str) -> ArtifactNames {
    let author = path_component(&author_name.replace(' ', ""));
    let company = record.company_slug();
    let (primary, companion) = match language {
        Language::En => ("CV", "CoverLetter"),
        Language::De => ("Lebenslauf", "Anschreiben"),
    };
    ArtifactNames {
        primary: format!("{primary}_{author}_{company}.pdf"),
        companion: format!("{companion}_{author}_{company}.pdf"),
    }
}

/// Ledger status written after a successful run.
pub fn status_label(date: NaiveDate) -> String {
    format!("Generated on {}", date.format("%Y-%m-%d"))
}

pub fn letter_date(language: Language, date: NaiveDate) -> String {
    match language {
        Language::En => date.format("%B %d, %Y").to_string(),
        Language::De => format!(
            "{:02}. {} {}",
            date.day(),
            GERMAN_MONTHS[date.month0() as usize],
            date.year()
        ),
    }
}

/// Personal salutation when both the HR contact's name and gender (`F`/`M`) are
/// known, the neutral form otherwise. `hr_name` must already be sanitized.
pub fn salutation(language: Language, hr_name: &str, gender: &str) -> String {
    let gender = gender.trim().to_uppercase();
    match (language, hr_name.is_empty(), gender.as_str()) {
        (Language::En, false, "F") => format!("Dear Ms. {hr_name},"),
        (Language::En, false, "M") => format!("Dear Mr. {hr_name},"),
        (Language::En, _, _) => "Dear Hiring Team,".to_string(),
        (Language::De, false, "F") => format!("Sehr geehrte Frau {hr_name},"),
        (Language::De, false, "M") => format!("Sehr geehrter Herr {hr_name},"),
        (Language::De, _, _) => "Sehr geehrte Damen und Herren,".to_string(),
    }
}

/// Appends the closing and signature to an already sanitized letter body.
pub fn letter_body(language: Language, body: &str, author_name: &str) -> String {
    let closing = match language {
        Language::En => "Sincerely,",
        Language::De => "Mit freundlichen Grüßen,",
    };
    format!("{body}\n\n{closing}\n\n{author_name}")
}

/// Variables exposed to the companion template. Record fields are sanitized
/// here; author fields are passed as configured.
pub fn companion_metadata(
    record: &JobRecord,
    language: Language,
    author: &AuthorInfo,
    date: NaiveDate,
) -> Vec<(String, String)> {
    let company = sanitize_for_latex(&record.company);
    let title = sanitize_for_latex(&record.title);
    let hr_name = sanitize_for_latex(record.hr_name.trim());
    let street = sanitize_for_latex(record.company_street.trim());
    let city = sanitize_for_latex(record.company_city.trim());

    let company_block = [&company, &hr_name, &street, &city]
        .into_iter()
        .filter(|line| !line.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(r" \\ ");

    let subject = match language {
        Language::En => format!("Application for the position of {title}"),
        Language::De => format!("Bewerbung um die Stelle als {title}"),
    };

    vec![
        ("title".to_string(), format!("Cover Letter for {title}")),
        ("author-name".to_string(), author.name.clone()),
        ("author-street".to_string(), author.street.clone()),
        ("author-city".to_string(), author.city.clone()),
        ("author-phone".to_string(), author.phone.clone()),
        ("author-email".to_string(), author.email.clone()),
        ("company-block".to_string(), company_block),
        ("date".to_string(), letter_date(language, date)),
        ("application-subject".to_string(), subject),
        (
            "salutation".to_string(),
            salutation(language, &hr_name, &record.hr_gender),
        ),
    ]
}
